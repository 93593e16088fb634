use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::{
        extract::{parse_id, AuthUser, OptionalAuthUser},
        ApiError, ApiResult,
    },
    db::repositories::{FriendshipRepository, UserRepository},
    state::AppState,
};
use orkut_types::{FriendInfo, Friendship, FriendshipStatus};

#[derive(Debug, Deserialize)]
pub struct FriendsQuery {
    pub user_id: Option<String>,
}

/// POST /api/friends/:user_id - Send a friend request.
/// If the other user already asked us, this accepts their request instead.
pub async fn send_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(target_id): Path<String>,
) -> ApiResult<(StatusCode, Json<Friendship>)> {
    let target_id = parse_id(&target_id, "user")?;

    if target_id == auth.user_id {
        return Err(ApiError::BadRequest("You cannot befriend yourself".to_string()));
    }
    ensure_user_exists(&state, &target_id)?;

    let friendship_repo = FriendshipRepository::new(state.db.pool.clone());

    let status = match friendship_repo.find_between(&auth.user_id, &target_id)? {
        Some(f) if f.status == FriendshipStatus::Accepted => {
            return Err(ApiError::Conflict("You are already friends".to_string()));
        }
        Some(f) if f.status == FriendshipStatus::Pending && f.requester_id == auth.user_id => {
            return Err(ApiError::Conflict("Friend request already sent".to_string()));
        }
        Some(f) if f.status == FriendshipStatus::Pending => {
            friendship_repo.respond(&target_id, &auth.user_id, FriendshipStatus::Accepted)?;
            tracing::info!("{} accepted a pending request from {}", auth.user_id, target_id);
            StatusCode::OK
        }
        _ => {
            friendship_repo.create_request(&auth.user_id, &target_id)?;
            StatusCode::CREATED
        }
    };

    let friendship = friendship_repo
        .find_between(&auth.user_id, &target_id)?
        .ok_or_else(|| ApiError::InternalError("Friendship vanished after write".to_string()))?;
    Ok((status, Json(friendship)))
}

/// POST /api/friends/:user_id/accept
pub async fn accept_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(requester_id): Path<String>,
) -> ApiResult<Json<Friendship>> {
    let requester_id = parse_id(&requester_id, "user")?;
    answer_request(&state, &requester_id, &auth.user_id, FriendshipStatus::Accepted)
}

/// POST /api/friends/:user_id/decline
pub async fn decline_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(requester_id): Path<String>,
) -> ApiResult<Json<Friendship>> {
    let requester_id = parse_id(&requester_id, "user")?;
    answer_request(&state, &requester_id, &auth.user_id, FriendshipStatus::Declined)
}

fn answer_request(
    state: &AppState,
    requester_id: &Uuid,
    addressee_id: &Uuid,
    status: FriendshipStatus,
) -> ApiResult<Json<Friendship>> {
    let friendship_repo = FriendshipRepository::new(state.db.pool.clone());

    if !friendship_repo.respond(requester_id, addressee_id, status)? {
        return Err(ApiError::NotFound(
            "No pending friend request from this user".to_string(),
        ));
    }

    let friendship = friendship_repo
        .find_between(requester_id, addressee_id)?
        .ok_or_else(|| ApiError::InternalError("Friendship vanished after write".to_string()))?;
    Ok(Json(friendship))
}

/// DELETE /api/friends/:user_id - Unfriend, or cancel a pending request
pub async fn remove_friend(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(other_id): Path<String>,
) -> ApiResult<StatusCode> {
    let other_id = parse_id(&other_id, "user")?;

    let removed = FriendshipRepository::new(state.db.pool.clone()).remove(&auth.user_id, &other_id)?;
    if removed == 0 {
        return Err(ApiError::NotFound("No friendship with this user".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/friends?user_id= - Accepted friends of a user, or of the caller
pub async fn list_friends(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Query(query): Query<FriendsQuery>,
) -> ApiResult<Json<Vec<FriendInfo>>> {
    let user_id = match (query.user_id.as_deref(), viewer) {
        (Some(raw), _) => parse_id(raw, "user")?,
        (None, Some(viewer_id)) => viewer_id,
        (None, None) => {
            return Err(ApiError::BadRequest(
                "user_id is required when not signed in".to_string(),
            ))
        }
    };
    ensure_user_exists(&state, &user_id)?;

    let friends = FriendshipRepository::new(state.db.pool.clone()).list_friends(&user_id)?;
    Ok(Json(friends))
}

/// GET /api/friends/requests - Requests waiting on the caller
pub async fn list_requests(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<FriendInfo>>> {
    let requests =
        FriendshipRepository::new(state.db.pool.clone()).list_incoming_requests(&auth.user_id)?;
    Ok(Json(requests))
}

fn ensure_user_exists(state: &AppState, user_id: &Uuid) -> ApiResult<()> {
    UserRepository::new(state.db.pool.clone())
        .get_by_id(user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(())
}
