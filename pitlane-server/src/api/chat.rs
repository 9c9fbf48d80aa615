//! Streaming chat handler.
//!
//! Persists the user message (with any tool output), streams the model's
//! reply as a plain-text body, and persists the full reply once the
//! stream finishes. If the client disconnects mid-stream the body is
//! dropped, which cancels the upstream model read; no partial assistant
//! message is persisted.

use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{Json, Response};
use axum::Extension;
use bytes::Bytes;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use pitlane_core::llm::PromptMessage;
use pitlane_core::pipeline::TraceId;
use pitlane_core::tools::{detect_tool, ToolRequest};
use pitlane_core::{validate, ApiError};
use pitlane_types::{AppError, Chat, ErrorKind, Identity, MessageRole};

use crate::state::AppState;

const SYSTEM_PROMPT: &str = "You are Pitlane, a concise assistant. When tool data is provided, \
    ground your answer in it and say so; otherwise answer from general knowledge.";

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub chat_id: Option<String>,
}

pub async fn chat(
    State(state): State<AppState>,
    Extension(trace): Extension<TraceId>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let traced = |err: AppError| {
        ApiError(err.with_trace(trace.0.clone()).with_user(identity.user_id.to_string()))
    };

    validate::required("message", payload.message.as_deref()).map_err(traced)?;
    let message = payload.message.unwrap_or_default();
    validate::string("message", &message, Some(1), Some(4000)).map_err(traced)?;

    let chat = resolve_chat(&state, &identity, payload.chat_id.as_deref(), &message)
        .await
        .map_err(traced)?;

    let tool_results = fetch_tool_context(&state, &trace, &identity, &message).await;

    state
        .repo()
        .append_message(
            identity.user_id,
            chat.id,
            MessageRole::User,
            &message,
            tool_results.clone(),
        )
        .await
        .map_err(|e| traced(e.into()))?;

    let prompt = build_prompt(&state, &identity, chat.id, &tool_results).await.map_err(traced)?;
    let deltas = state.llm().stream_chat(&trace.0, prompt).await.map_err(traced)?;

    // tee the stream: forward bytes to the client while accumulating the
    // full reply for persistence after the final delta
    let owner = identity.user_id;
    let chat_id = chat.id;
    let trace_id = trace.0.clone();
    let body_stream = async_stream::stream! {
        futures::pin_mut!(deltas);
        let mut full = String::new();
        let mut failed = false;
        while let Some(item) = deltas.next().await {
            match item {
                Ok(bytes) => {
                    full.push_str(&String::from_utf8_lossy(&bytes));
                    yield Ok::<Bytes, std::io::Error>(bytes);
                }
                Err(err) => {
                    tracing::error!("[{}] stream aborted: {}", trace_id, err);
                    failed = true;
                    yield Err(std::io::Error::other(err.message));
                    break;
                }
            }
        }
        if !failed && !full.is_empty() {
            if let Err(err) = state
                .repo()
                .append_message(owner, chat_id, MessageRole::Assistant, &full, None)
                .await
            {
                tracing::error!("[{}] failed to persist assistant reply: {}", trace_id, err);
            }
        }
    };

    let response = Response::builder()
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header("x-chat-id", chat.id.to_string())
        .body(Body::from_stream(body_stream))
        .map_err(|e| traced(AppError::internal(format!("response build: {e}"))))?;
    Ok(response)
}

/// Load the addressed chat, or open a new one titled from the message.
async fn resolve_chat(
    state: &AppState,
    identity: &Identity,
    chat_id: Option<&str>,
    message: &str,
) -> Result<Chat, AppError> {
    match chat_id {
        Some(raw) => {
            validate::uuid("chat_id", raw)?;
            let id = Uuid::parse_str(raw).map_err(|_| {
                AppError::new(ErrorKind::InvalidInput, "chat_id: must be a valid UUID")
            })?;
            Ok(state.repo().get_chat(identity.user_id, id).await?)
        }
        None => {
            let title = title_from(message);
            Ok(state.repo().create_chat(identity.user_id, &title).await?)
        }
    }
}

/// First line of the message, clipped to a presentable length.
fn title_from(message: &str) -> String {
    let line = message.lines().next().unwrap_or("").trim();
    let title: String = line.chars().take(60).collect();
    if title.is_empty() {
        "New chat".to_string()
    } else {
        title
    }
}

/// Run tool detection and, budget permitting, the tool itself.
///
/// Failures degrade the chat (answer without context) instead of failing
/// the request.
async fn fetch_tool_context(
    state: &AppState,
    trace: &TraceId,
    identity: &Identity,
    message: &str,
) -> Option<Value> {
    let request: ToolRequest = detect_tool(message)?;

    let decision = state.limiters().tools.check(&identity.user_id.to_string());
    if !decision.allowed {
        tracing::warn!(
            "[{}] tool budget exhausted for user {}, skipping {}",
            trace.0,
            identity.user_id,
            request.tool_name()
        );
        return None;
    }

    match state.tools().invoke(&trace.0, &request).await {
        Ok(value) => Some(serde_json::json!({
            "tool": request.tool_name(),
            "data": value,
        })),
        Err(err) => {
            tracing::warn!(
                "[{}] tool {} failed, answering without context: {}",
                trace.0,
                request.tool_name(),
                err
            );
            None
        }
    }
}

/// Conversation history plus system framing and tool context.
async fn build_prompt(
    state: &AppState,
    identity: &Identity,
    chat_id: Uuid,
    tool_results: &Option<Value>,
) -> Result<Vec<PromptMessage>, AppError> {
    let history = state.repo().get_chat_with_messages(identity.user_id, chat_id).await?;

    let mut prompt = vec![PromptMessage::system(SYSTEM_PROMPT)];
    if let Some(results) = tool_results {
        prompt.push(PromptMessage::system(format!("Tool data: {results}")));
    }
    for message in history.messages {
        prompt.push(match message.role {
            MessageRole::User => PromptMessage::user(message.content),
            MessageRole::Assistant => PromptMessage::assistant(message.content),
        });
    }
    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::title_from;

    #[test]
    fn test_title_from_message() {
        assert_eq!(title_from("Plan my trip to Spa\nwith stops"), "Plan my trip to Spa");
        assert_eq!(title_from("   "), "New chat");
        let long = "x".repeat(200);
        assert_eq!(title_from(&long).chars().count(), 60);
    }
}
