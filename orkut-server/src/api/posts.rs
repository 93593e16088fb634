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
        repositories::{PostFilter, PostRepository, UserRepository},
    },
    state::AppState,
    validation::{self, MAX_POST_CHARS},
};
use orkut_types::{CreatePostRequest, Post, UpdatePostRequest};

#[derive(Debug, Deserialize)]
pub struct GetPostsQuery {
    pub user_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/posts - Newest first. Signed-in callers without `user_id` get their feed.
pub async fn get_posts(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Query(query): Query<GetPostsQuery>,
) -> ApiResult<Json<Vec<Post>>> {
    let (limit, offset) = page(query.limit, query.offset, 20);
    let post_repo = PostRepository::new(state.db.pool.clone());

    let author_id = query
        .user_id
        .as_deref()
        .map(|raw| parse_id(raw, "user"))
        .transpose()?;

    let filter = match (&author_id, &viewer) {
        (Some(author_id), _) => PostFilter::Author(author_id),
        (None, Some(viewer_id)) => PostFilter::FeedOf(viewer_id),
        (None, None) => PostFilter::All,
    };

    let posts = post_repo.list(filter, viewer.as_ref(), limit, offset)?;
    Ok(Json(posts))
}

/// GET /api/posts/:id
pub async fn get_post(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Path(post_id): Path<String>,
) -> ApiResult<Json<Post>> {
    let post_id = parse_id(&post_id, "post")?;
    let post = find_post(&state, &post_id, viewer.as_ref())?;
    Ok(Json(post))
}

/// POST /api/posts - Publish a status update
pub async fn create_post(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<Post>)> {
    let content = payload.content.trim();
    validation::validate_content("Post", content, MAX_POST_CHARS).map_err(ApiError::BadRequest)?;

    let pool = state.db.pool.clone();
    let author = UserRepository::new(pool.clone())
        .get_by_id(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let now = Utc::now();
    let post = Post {
        id: Uuid::new_v4(),
        author_id: author.id,
        author_username: author.username,
        content: content.to_string(),
        created_at: now,
        updated_at: now,
        like_count: 0,
        comment_count: 0,
        liked_by_me: false,
    };
    PostRepository::new(pool).create(&post)?;

    Ok((StatusCode::CREATED, Json(post)))
}

/// PUT /api/posts/:id - Edit content (author only)
pub async fn update_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<String>,
    ApiJson(payload): ApiJson<UpdatePostRequest>,
) -> ApiResult<Json<Post>> {
    let post_id = parse_id(&post_id, "post")?;
    let content = payload.content.trim();
    validation::validate_content("Post", content, MAX_POST_CHARS).map_err(ApiError::BadRequest)?;

    let post = find_post(&state, &post_id, Some(&auth.user_id))?;
    if post.author_id != auth.user_id {
        return Err(ApiError::Forbidden("You can only edit your own posts".to_string()));
    }

    PostRepository::new(state.db.pool.clone()).update_content(&post_id, content)?;
    Ok(Json(find_post(&state, &post_id, Some(&auth.user_id))?))
}

/// DELETE /api/posts/:id - Remove a post with its likes and comments (author only)
pub async fn delete_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<String>,
) -> ApiResult<StatusCode> {
    let post_id = parse_id(&post_id, "post")?;

    let post = find_post(&state, &post_id, None)?;
    if post.author_id != auth.user_id {
        return Err(ApiError::Forbidden("You can only delete your own posts".to_string()));
    }

    PostRepository::new(state.db.pool.clone()).delete(&post_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/posts/:id/like
pub async fn like_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<String>,
) -> ApiResult<Json<Post>> {
    let post_id = parse_id(&post_id, "post")?;
    find_post(&state, &post_id, None)?;

    PostRepository::new(state.db.pool.clone()).like(&post_id, &auth.user_id)?;
    Ok(Json(find_post(&state, &post_id, Some(&auth.user_id))?))
}

/// DELETE /api/posts/:id/like
pub async fn unlike_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<String>,
) -> ApiResult<Json<Post>> {
    let post_id = parse_id(&post_id, "post")?;
    find_post(&state, &post_id, None)?;

    PostRepository::new(state.db.pool.clone()).unlike(&post_id, &auth.user_id)?;
    Ok(Json(find_post(&state, &post_id, Some(&auth.user_id))?))
}

pub(crate) fn find_post(state: &AppState, post_id: &Uuid, viewer: Option<&Uuid>) -> ApiResult<Post> {
    PostRepository::new(state.db.pool.clone())
        .get_by_id(post_id, viewer)?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))
}
