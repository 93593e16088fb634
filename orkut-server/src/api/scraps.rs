use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::{
        extract::{parse_id, ApiJson, AuthUser, OptionalAuthUser},
        ApiError, ApiResult,
    },
    db::{
        page,
        repositories::{ScrapRepository, UserRepository},
    },
    state::AppState,
    validation::{self, MAX_SCRAP_CHARS},
};
use orkut_types::{CreateScrapRequest, Scrap};

#[derive(Debug, Deserialize)]
pub struct GetScrapsQuery {
    pub user_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/scraps?user_id= - A user's scrapbook, newest first
pub async fn get_scraps(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Query(query): Query<GetScrapsQuery>,
) -> ApiResult<Json<Vec<Scrap>>> {
    let user_id = match (query.user_id.as_deref(), viewer) {
        (Some(raw), _) => parse_id(raw, "user")?,
        (None, Some(viewer_id)) => viewer_id,
        (None, None) => {
            return Err(ApiError::BadRequest(
                "user_id is required when not signed in".to_string(),
            ))
        }
    };
    let (limit, offset) = page(query.limit, query.offset, 20);

    let scraps = ScrapRepository::new(state.db.pool.clone()).list_for_user(&user_id, limit, offset)?;
    Ok(Json(scraps))
}

/// POST /api/scraps - Leave a scrap on someone's wall (own wall included)
pub async fn create_scrap(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<CreateScrapRequest>,
) -> ApiResult<(StatusCode, Json<Scrap>)> {
    let content = payload.content.trim();
    validation::validate_content("Scrap", content, MAX_SCRAP_CHARS).map_err(ApiError::BadRequest)?;

    let pool = state.db.pool.clone();
    let user_repo = UserRepository::new(pool.clone());

    user_repo
        .get_by_id(&payload.to_user_id)?
        .ok_or_else(|| ApiError::NotFound("Recipient not found".to_string()))?;
    let sender = user_repo
        .get_by_id(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let scrap = Scrap {
        id: Uuid::new_v4(),
        from_user_id: sender.id,
        from_username: sender.username,
        to_user_id: payload.to_user_id,
        content: content.to_string(),
        created_at: Utc::now(),
    };
    ScrapRepository::new(pool).create(&scrap)?;

    Ok((StatusCode::CREATED, Json(scrap)))
}

/// DELETE /api/scraps/:id - Sender or wall owner
pub async fn delete_scrap(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(scrap_id): Path<String>,
) -> ApiResult<StatusCode> {
    let scrap_id = parse_id(&scrap_id, "scrap")?;
    let scrap_repo = ScrapRepository::new(state.db.pool.clone());

    let scrap = scrap_repo
        .get_by_id(&scrap_id)?
        .ok_or_else(|| ApiError::NotFound("Scrap not found".to_string()))?;

    if scrap.from_user_id != auth.user_id && scrap.to_user_id != auth.user_id {
        return Err(ApiError::Forbidden(
            "Only the sender or the wall owner can delete a scrap".to_string(),
        ));
    }

    scrap_repo.delete(&scrap_id)?;
    Ok(StatusCode::NO_CONTENT)
}
