//! Streaming inference client.
//!
//! Talks to a chat-completions endpoint, treats it as an opaque
//! collaborator, and exposes the assistant's output as a stream of text
//! deltas. Dropping the stream drops the upstream response with it, so a
//! client disconnect cancels the in-flight model read.

mod sse;

pub use sse::{parse_sse_line, SseLineBuffer};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;

use pitlane_types::models::AppConfig;
use pitlane_types::{AppError, ErrorKind};

use crate::util::map_http_err;

/// One turn of conversation context sent upstream.
#[derive(Debug, Clone, Serialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl LlmClient {
    pub fn new(config: &AppConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: config.llm_url.trim_end_matches('/').to_string(),
            model: config.llm_model.clone(),
        }
    }

    /// Stream assistant text deltas for the given conversation.
    pub async fn stream_chat(
        &self,
        trace_id: &str,
        messages: Vec<PromptMessage>,
    ) -> Result<impl Stream<Item = Result<Bytes, AppError>> + Send + 'static, AppError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| map_http_err("llm request", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::error!("[{}] llm upstream returned {}: {}", trace_id, status, text);
            return Err(AppError::new(
                ErrorKind::AiError,
                format!("inference endpoint returned {status}"),
            ));
        }

        let trace_id = trace_id.to_string();
        let mut upstream = response.bytes_stream();

        Ok(async_stream::try_stream! {
            let mut buffer = SseLineBuffer::new();
            let mut done = false;
            while !done {
                let Some(chunk) = upstream.next().await else { break };
                let chunk = chunk.map_err(|e| map_http_err("llm stream", e))?;
                for payload in buffer.push(&chunk) {
                    if payload == "[DONE]" {
                        done = true;
                        break;
                    }
                    if let Some(delta) = extract_delta(&payload) {
                        if !delta.is_empty() {
                            yield Bytes::from(delta);
                        }
                    }
                }
            }
            tracing::debug!("[{}] llm stream finished", trace_id);
        })
    }

    /// Collect a whole completion. Used for tool-augmented second passes
    /// where the caller needs the full text before responding.
    pub async fn complete(
        &self,
        trace_id: &str,
        messages: Vec<PromptMessage>,
    ) -> Result<String, AppError> {
        let stream = self.stream_chat(trace_id, messages).await?;
        futures::pin_mut!(stream);

        let mut out = String::new();
        while let Some(delta) = stream.next().await {
            out.push_str(&String::from_utf8_lossy(&delta?));
        }
        Ok(out)
    }
}

/// Pull the delta text out of one chat-completions chunk.
fn extract_delta(payload: &str) -> Option<String> {
    let value: Value = serde_json::from_str(payload).ok()?;
    value["choices"][0]["delta"]["content"].as_str().map(str::to_string)
}
