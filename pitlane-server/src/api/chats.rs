//! Chat CRUD handlers.
//!
//! Every query is scoped to the caller: a chat that exists but belongs to
//! someone else is a plain 404.

use axum::extract::{Path, State};
use axum::response::Json;
use axum::Extension;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use pitlane_core::pipeline::TraceId;
use pitlane_core::{validate, ApiError};
use pitlane_types::{AppError, Chat, ChatWithMessages, ErrorKind, Identity, Message, MessageRole};

use crate::state::AppState;

fn traced(err: impl Into<AppError>, trace: &TraceId, identity: &Identity) -> ApiError {
    ApiError(err.into().with_trace(trace.0.clone()).with_user(identity.user_id.to_string()))
}

/// Validate and parse a path chat id.
fn parse_chat_id(raw: &str) -> Result<Uuid, AppError> {
    validate::uuid("chat_id", raw)?;
    Uuid::parse_str(raw)
        .map_err(|_| AppError::new(ErrorKind::InvalidInput, "chat_id: must be a valid UUID"))
}

pub async fn list_chats(
    State(state): State<AppState>,
    Extension(trace): Extension<TraceId>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<Chat>>, ApiError> {
    let chats = state
        .repo()
        .list_chats(identity.user_id)
        .await
        .map_err(|e| traced(e, &trace, &identity))?;
    Ok(Json(chats))
}

#[derive(Deserialize)]
pub struct CreateChatRequest {
    pub title: Option<String>,
}

pub async fn create_chat(
    State(state): State<AppState>,
    Extension(trace): Extension<TraceId>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CreateChatRequest>,
) -> Result<Json<Chat>, ApiError> {
    let traced = |err: AppError| traced(err, &trace, &identity);

    validate::required("title", payload.title.as_deref()).map_err(traced)?;
    let title = payload.title.unwrap_or_default();
    validate::string("title", &title, Some(1), Some(100)).map_err(traced)?;

    let chat = state
        .repo()
        .create_chat(identity.user_id, title.trim())
        .await
        .map_err(|e| traced(e.into()))?;
    Ok(Json(chat))
}

pub async fn get_chat(
    State(state): State<AppState>,
    Extension(trace): Extension<TraceId>,
    Extension(identity): Extension<Identity>,
    Path(chat_id): Path<String>,
) -> Result<Json<ChatWithMessages>, ApiError> {
    let chat_id = parse_chat_id(&chat_id).map_err(|e| traced(e, &trace, &identity))?;
    let chat = state
        .repo()
        .get_chat_with_messages(identity.user_id, chat_id)
        .await
        .map_err(|e| traced(e, &trace, &identity))?;
    Ok(Json(chat))
}

pub async fn delete_chat(
    State(state): State<AppState>,
    Extension(trace): Extension<TraceId>,
    Extension(identity): Extension<Identity>,
    Path(chat_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let chat_id = parse_chat_id(&chat_id).map_err(|e| traced(e, &trace, &identity))?;
    state
        .repo()
        .delete_chat(identity.user_id, chat_id)
        .await
        .map_err(|e| traced(e, &trace, &identity))?;

    tracing::info!("[{}] chat {} deleted", trace.0, chat_id);
    Ok(Json(serde_json::json!({"success": true})))
}

#[derive(Deserialize)]
pub struct AppendMessageRequest {
    pub role: Option<String>,
    pub content: Option<String>,
    pub tool_results: Option<Value>,
}

pub async fn append_message(
    State(state): State<AppState>,
    Extension(trace): Extension<TraceId>,
    Extension(identity): Extension<Identity>,
    Path(chat_id): Path<String>,
    Json(payload): Json<AppendMessageRequest>,
) -> Result<Json<Message>, ApiError> {
    let traced = |err: AppError| traced(err, &trace, &identity);

    let chat_id = parse_chat_id(&chat_id).map_err(traced)?;

    validate::required("role", payload.role.as_deref()).map_err(traced)?;
    let role = payload
        .role
        .as_deref()
        .and_then(MessageRole::parse)
        .ok_or_else(|| {
            traced(AppError::new(
                ErrorKind::InvalidInput,
                "role: must be \"user\" or \"assistant\"",
            ))
        })?;

    validate::required("content", payload.content.as_deref()).map_err(traced)?;
    let content = payload.content.unwrap_or_default();
    validate::string("content", &content, Some(1), Some(4000)).map_err(traced)?;

    let message = state
        .repo()
        .append_message(identity.user_id, chat_id, role, &content, payload.tool_results)
        .await
        .map_err(|e| traced(e.into()))?;
    Ok(Json(message))
}
