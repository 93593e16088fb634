use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::{
        extract::{parse_id, ApiJson, AuthUser, OptionalAuthUser},
        ApiError, ApiResult,
    },
    db::repositories::{FriendshipRepository, PostRepository, ProfileRepository, ScrapRepository},
    state::AppState,
    validation,
};
use orkut_types::{Friendship, FriendshipStatus, ProfileView, Relationship, UpdateProfileRequest};

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub user_id: Option<String>,
}

/// GET /api/profile?user_id= - Profile page of a user, or of the caller
pub async fn get_profile(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Query(query): Query<ProfileQuery>,
) -> ApiResult<Json<ProfileView>> {
    let user_id = match (query.user_id.as_deref(), viewer) {
        (Some(raw), _) => parse_id(raw, "user")?,
        (None, Some(viewer_id)) => viewer_id,
        (None, None) => {
            return Err(ApiError::BadRequest(
                "user_id is required when not signed in".to_string(),
            ))
        }
    };

    Ok(Json(load_profile_view(&state, &user_id, viewer.as_ref())?))
}

/// POST /api/profile - Replace the caller's profile fields
pub async fn replace_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> ApiResult<Json<ProfileView>> {
    let fields = normalize(payload);
    validation::validate_profile(&fields).map_err(ApiError::BadRequest)?;

    ProfileRepository::new(state.db.pool.clone()).replace(&auth.user_id, &fields)?;
    tracing::debug!("Replaced profile of {}", auth.user_id);

    Ok(Json(load_profile_view(&state, &auth.user_id, Some(&auth.user_id))?))
}

/// PUT /api/profile - Update only the provided fields
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> ApiResult<Json<ProfileView>> {
    let fields = normalize(payload);
    validation::validate_profile(&fields).map_err(ApiError::BadRequest)?;

    ProfileRepository::new(state.db.pool.clone()).update(&auth.user_id, &fields)?;

    Ok(Json(load_profile_view(&state, &auth.user_id, Some(&auth.user_id))?))
}

/// Trim text fields and lowercase the relationship status
fn normalize(mut fields: UpdateProfileRequest) -> UpdateProfileRequest {
    let trim = |value: &mut Option<String>| {
        if let Some(v) = value.as_mut() {
            *v = v.trim().to_string();
        }
    };
    trim(&mut fields.display_name);
    trim(&mut fields.birthday);
    trim(&mut fields.city);
    trim(&mut fields.country);
    trim(&mut fields.interests);
    if let Some(status) = fields.relationship_status.as_mut() {
        *status = status.trim().to_lowercase();
    }
    fields
}

pub(crate) fn load_profile_view(
    state: &AppState,
    user_id: &Uuid,
    viewer: Option<&Uuid>,
) -> ApiResult<ProfileView> {
    let pool = state.db.pool.clone();
    let friendship_repo = FriendshipRepository::new(pool.clone());

    let profile = ProfileRepository::new(pool.clone())
        .get(user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let relationship = match viewer {
        None => Relationship::None,
        Some(viewer_id) if viewer_id == user_id => Relationship::Self_,
        Some(viewer_id) => relationship_between(friendship_repo.find_between(viewer_id, user_id)?, viewer_id),
    };

    Ok(ProfileView {
        profile,
        friend_count: friendship_repo.friend_count(user_id)?,
        scrap_count: ScrapRepository::new(pool.clone()).count_for_user(user_id)?,
        post_count: PostRepository::new(pool).count_by_author(user_id)?,
        relationship,
    })
}

/// The viewer's side of a friendship row
fn relationship_between(friendship: Option<Friendship>, viewer_id: &Uuid) -> Relationship {
    match friendship {
        Some(f) if f.status == FriendshipStatus::Accepted => Relationship::Friends,
        Some(f) if f.status == FriendshipStatus::Pending => {
            if f.requester_id == *viewer_id {
                Relationship::RequestSent
            } else {
                Relationship::RequestReceived
            }
        }
        _ => Relationship::None,
    }
}
