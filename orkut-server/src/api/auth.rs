use axum::{extract::State, http::StatusCode, Json};

use crate::{
    api::{
        extract::{ApiJson, AuthUser},
        ApiError, ApiResult,
    },
    db::repositories::UserRepository,
    password::{hash_password, verify_password},
    state::AppState,
    validation,
};
use orkut_types::{AuthResponse, LoginRequest, RegisterRequest, User};

const BAD_CREDENTIALS: &str = "Invalid login or password";

/// POST /api/register - Create an account and sign in
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let username = payload.username.trim();
    let email = payload.email.trim();
    let display_name = payload
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    validation::validate_username(username).map_err(ApiError::BadRequest)?;
    validation::validate_email(email).map_err(ApiError::BadRequest)?;
    validation::validate_password(&payload.password).map_err(ApiError::BadRequest)?;
    if let Some(name) = display_name {
        validation::validate_content("Display name", name, validation::MAX_DISPLAY_NAME_CHARS)
            .map_err(ApiError::BadRequest)?;
    }

    let user_repo = UserRepository::new(state.db.pool.clone());

    if user_repo.get_by_username(username)?.is_some() {
        return Err(ApiError::Conflict("Username already taken".to_string()));
    }
    if user_repo.get_by_email(email)?.is_some() {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = user_repo.create(username, email, &password_hash, display_name)?;
    let token = state.session_manager.create_session(user.id)?;

    tracing::info!("Registered user {}", user.username);
    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

/// POST /api/login - Sign in with email or username
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let user_repo = UserRepository::new(state.db.pool.clone());

    let (user, password_hash) = user_repo
        .get_credentials(payload.login.trim())?
        .ok_or_else(|| ApiError::Unauthorized(BAD_CREDENTIALS.to_string()))?;

    if !verify_password(&payload.password, &password_hash) {
        tracing::warn!("Failed login for {}", user.username);
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
    }

    let token = state.session_manager.create_session(user.id)?;
    Ok(Json(AuthResponse { user, token }))
}

/// POST /api/logout - Revoke the current token
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> ApiResult<StatusCode> {
    state.session_manager.delete_session(&auth.token)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/me - The signed-in account
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<User>> {
    let user = UserRepository::new(state.db.pool.clone())
        .get_by_id(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}
