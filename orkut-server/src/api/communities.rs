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
        extract::{parse_id, ApiJson, AuthUser},
        ApiError, ApiResult,
    },
    db::{page, repositories::CommunityRepository},
    state::AppState,
    validation::{self, MAX_COMMUNITY_DESCRIPTION_CHARS, MAX_COMMUNITY_NAME_CHARS},
};
use orkut_types::{
    Community, CommunityMember, CommunityRole, CreateCommunityRequest, UpdateMemberRoleRequest,
};

#[derive(Debug, Deserialize)]
pub struct ListCommunitiesQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/communities - Largest first
pub async fn list_communities(
    State(state): State<AppState>,
    Query(query): Query<ListCommunitiesQuery>,
) -> ApiResult<Json<Vec<Community>>> {
    let (limit, offset) = page(query.limit, query.offset, 20);
    let communities = CommunityRepository::new(state.db.pool.clone()).list(limit, offset)?;
    Ok(Json(communities))
}

/// GET /api/communities/:id
pub async fn get_community(
    State(state): State<AppState>,
    Path(community_id): Path<String>,
) -> ApiResult<Json<Community>> {
    let community_id = parse_id(&community_id, "community")?;
    Ok(Json(find_community(&state, &community_id)?))
}

/// POST /api/communities - The creator becomes its first admin
pub async fn create_community(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<CreateCommunityRequest>,
) -> ApiResult<(StatusCode, Json<Community>)> {
    let name = payload.name.trim();
    validation::validate_content("Community name", name, MAX_COMMUNITY_NAME_CHARS)
        .map_err(ApiError::BadRequest)?;

    let description = payload
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());
    if let Some(description) = description {
        validation::validate_content("Description", description, MAX_COMMUNITY_DESCRIPTION_CHARS)
            .map_err(ApiError::BadRequest)?;
    }
    let category = payload
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let community_repo = CommunityRepository::new(state.db.pool.clone());
    if community_repo.get_by_name(name)?.is_some() {
        return Err(ApiError::Conflict(
            "A community with this name already exists".to_string(),
        ));
    }

    let community = Community {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: description.map(str::to_string),
        category: category.map(str::to_string),
        owner_id: auth.user_id,
        member_count: 1,
        created_at: Utc::now(),
    };
    community_repo.create(&community)?;
    tracing::info!("Community '{}' created by {}", community.name, auth.user_id);

    Ok((StatusCode::CREATED, Json(community)))
}

/// DELETE /api/communities/:id - Admins only
pub async fn delete_community(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(community_id): Path<String>,
) -> ApiResult<StatusCode> {
    let community_id = parse_id(&community_id, "community")?;
    find_community(&state, &community_id)?;
    require_admin(&state, &community_id, &auth.user_id)?;

    CommunityRepository::new(state.db.pool.clone()).delete(&community_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/communities/:id/join - Joining twice is a no-op
pub async fn join_community(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(community_id): Path<String>,
) -> ApiResult<Json<Community>> {
    let community_id = parse_id(&community_id, "community")?;
    find_community(&state, &community_id)?;

    CommunityRepository::new(state.db.pool.clone()).join(&community_id, &auth.user_id)?;
    Ok(Json(find_community(&state, &community_id)?))
}

/// DELETE /api/communities/:id/join - Leave. The last admin must stay.
pub async fn leave_community(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(community_id): Path<String>,
) -> ApiResult<StatusCode> {
    let community_id = parse_id(&community_id, "community")?;
    find_community(&state, &community_id)?;

    let community_repo = CommunityRepository::new(state.db.pool.clone());
    let role = community_repo
        .get_role(&community_id, &auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("You are not a member of this community".to_string()))?;

    if role == CommunityRole::Admin && community_repo.admin_count(&community_id)? <= 1 {
        return Err(ApiError::Conflict(
            "The last admin cannot leave the community".to_string(),
        ));
    }

    community_repo.leave(&community_id, &auth.user_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/communities/:id/members
pub async fn list_members(
    State(state): State<AppState>,
    Path(community_id): Path<String>,
) -> ApiResult<Json<Vec<CommunityMember>>> {
    let community_id = parse_id(&community_id, "community")?;
    find_community(&state, &community_id)?;

    let members = CommunityRepository::new(state.db.pool.clone()).members(&community_id)?;
    Ok(Json(members))
}

/// PUT /api/communities/:id/members/:user_id - Change a member's role (admins only)
pub async fn update_member_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((community_id, member_id)): Path<(String, String)>,
    ApiJson(payload): ApiJson<UpdateMemberRoleRequest>,
) -> ApiResult<StatusCode> {
    let community_id = parse_id(&community_id, "community")?;
    let member_id = parse_id(&member_id, "user")?;
    let new_role = CommunityRole::parse(&payload.role).ok_or_else(|| {
        ApiError::BadRequest("Role must be one of: member, moderator, admin".to_string())
    })?;

    find_community(&state, &community_id)?;
    require_admin(&state, &community_id, &auth.user_id)?;

    let community_repo = CommunityRepository::new(state.db.pool.clone());
    let current_role = community_repo
        .get_role(&community_id, &member_id)?
        .ok_or_else(|| ApiError::NotFound("User is not a member of this community".to_string()))?;

    if current_role == CommunityRole::Admin
        && new_role != CommunityRole::Admin
        && community_repo.admin_count(&community_id)? <= 1
    {
        return Err(ApiError::Conflict(
            "A community must keep at least one admin".to_string(),
        ));
    }

    community_repo.set_role(&community_id, &member_id, new_role)?;
    Ok(StatusCode::NO_CONTENT)
}

fn find_community(state: &AppState, community_id: &Uuid) -> ApiResult<Community> {
    CommunityRepository::new(state.db.pool.clone())
        .get_by_id(community_id)?
        .ok_or_else(|| ApiError::NotFound("Community not found".to_string()))
}

fn require_admin(state: &AppState, community_id: &Uuid, user_id: &Uuid) -> ApiResult<()> {
    let role = CommunityRepository::new(state.db.pool.clone()).get_role(community_id, user_id)?;
    if role != Some(CommunityRole::Admin) {
        return Err(ApiError::Forbidden(
            "Only community admins can do this".to_string(),
        ));
    }
    Ok(())
}
