use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    api::{
        extract::{parse_id, ApiJson, AuthUser},
        posts::find_post,
        ApiError, ApiResult,
    },
    db::repositories::{CommentRepository, UserRepository},
    state::AppState,
    validation::{self, MAX_COMMENT_CHARS},
};
use orkut_types::{Comment, CreateCommentRequest};

/// GET /api/posts/:id/comments - Oldest first
pub async fn get_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<Json<Vec<Comment>>> {
    let post_id = parse_id(&post_id, "post")?;
    find_post(&state, &post_id, None)?;

    let comments = CommentRepository::new(state.db.pool.clone()).list_for_post(&post_id)?;
    Ok(Json(comments))
}

/// POST /api/posts/:id/comments
pub async fn create_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<String>,
    ApiJson(payload): ApiJson<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let post_id = parse_id(&post_id, "post")?;
    let content = payload.content.trim();
    validation::validate_content("Comment", content, MAX_COMMENT_CHARS)
        .map_err(ApiError::BadRequest)?;

    find_post(&state, &post_id, None)?;

    let pool = state.db.pool.clone();
    let author = UserRepository::new(pool.clone())
        .get_by_id(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let comment = Comment {
        id: Uuid::new_v4(),
        post_id,
        author_id: author.id,
        author_username: author.username,
        content: content.to_string(),
        created_at: Utc::now(),
    };
    CommentRepository::new(pool).create(&comment)?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// DELETE /api/comments/:id - Comment author or post author
pub async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(comment_id): Path<String>,
) -> ApiResult<StatusCode> {
    let comment_id = parse_id(&comment_id, "comment")?;
    let comment_repo = CommentRepository::new(state.db.pool.clone());

    let comment = comment_repo
        .get_by_id(&comment_id)?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    if comment.author_id != auth.user_id {
        let post = find_post(&state, &comment.post_id, None)?;
        if post.author_id != auth.user_id {
            return Err(ApiError::Forbidden(
                "Only the comment author or the post author can delete this comment".to_string(),
            ));
        }
    }

    comment_repo.delete(&comment_id)?;
    Ok(StatusCode::NO_CONTENT)
}
