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
        ApiError, ApiResult,
    },
    db::repositories::{MessageRepository, UserRepository},
    state::AppState,
    validation::{self, MAX_MESSAGE_CHARS},
};
use orkut_types::{ConversationSummary, Message, SendMessageRequest};

/// GET /api/messages - Conversations of the caller, most recent first
pub async fn get_conversations(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<ConversationSummary>>> {
    let summaries = MessageRepository::new(state.db.pool.clone()).conversation_summaries(&auth.user_id)?;
    Ok(Json(summaries))
}

/// GET /api/messages/:user_id - Thread with one user, oldest first. Marks it read.
pub async fn get_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(other_user_id): Path<String>,
) -> ApiResult<Json<Vec<Message>>> {
    let other_user_id = parse_id(&other_user_id, "user")?;

    let pool = state.db.pool.clone();
    UserRepository::new(pool.clone())
        .get_by_id(&other_user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let message_repo = MessageRepository::new(pool);
    let messages = message_repo.conversation(&auth.user_id, &other_user_id)?;
    message_repo.mark_as_read(&auth.user_id, &other_user_id)?;

    Ok(Json(messages))
}

/// POST /api/messages - Send a private message
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    if payload.to_user_id == auth.user_id {
        return Err(ApiError::BadRequest("You cannot message yourself".to_string()));
    }
    let content = payload.content.trim();
    validation::validate_content("Message", content, MAX_MESSAGE_CHARS)
        .map_err(ApiError::BadRequest)?;

    let pool = state.db.pool.clone();
    let user_repo = UserRepository::new(pool.clone());
    let recipient = user_repo
        .get_by_id(&payload.to_user_id)?
        .ok_or_else(|| ApiError::NotFound("Recipient not found".to_string()))?;
    let sender = user_repo
        .get_by_id(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let message = Message {
        id: Uuid::new_v4(),
        from_user_id: sender.id,
        to_user_id: recipient.id,
        from_username: sender.username,
        to_username: recipient.username,
        content: content.to_string(),
        created_at: Utc::now(),
        is_read: false,
    };
    MessageRepository::new(pool).create(&message)?;

    Ok((StatusCode::CREATED, Json(message)))
}

/// POST /api/messages/:user_id/read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(other_user_id): Path<String>,
) -> ApiResult<StatusCode> {
    let other_user_id = parse_id(&other_user_id, "user")?;
    MessageRepository::new(state.db.pool.clone()).mark_as_read(&auth.user_id, &other_user_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/messages/:user_id - Hide the thread for the caller only
pub async fn delete_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(other_user_id): Path<String>,
) -> ApiResult<StatusCode> {
    let other_user_id = parse_id(&other_user_id, "user")?;
    MessageRepository::new(state.db.pool.clone())
        .delete_conversation(&auth.user_id, &other_user_id)?;
    Ok(StatusCode::NO_CONTENT)
}
