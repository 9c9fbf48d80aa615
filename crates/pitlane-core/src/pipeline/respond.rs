//! Error responder.
//!
//! The single place where an [`AppError`] becomes a transport response.
//! Every error is logged with full context before conversion; the body
//! carries the uniform envelope only, never internal diagnostics.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde_json::{json, Value};

use pitlane_types::AppError;

use crate::rate_limit::RateLimitDecision;

/// Convert an error into the uniform envelope
/// `{"error": {"code", "message", "details"?, "timestamp"}}`.
pub fn error_response(err: &AppError) -> Response {
    log_error(err);

    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut body = json!({
        "code": err.kind.code(),
        "message": err.message,
        "timestamp": err.timestamp.to_rfc3339(),
    });
    if let Some(details) = merged_details(err) {
        body["details"] = details;
    }

    (status, Json(json!({ "error": body }))).into_response()
}

/// Details payload with the trace id folded in.
fn merged_details(err: &AppError) -> Option<Value> {
    match (&err.details, &err.trace_id) {
        (None, None) => None,
        (Some(details), None) => Some(details.clone()),
        (None, Some(trace)) => Some(json!({ "trace_id": trace })),
        (Some(details), Some(trace)) => {
            let mut details = details.clone();
            if let Some(obj) = details.as_object_mut() {
                obj.insert("trace_id".to_string(), json!(trace));
            }
            Some(details)
        }
    }
}

fn log_error(err: &AppError) {
    let trace = err.trace_id.as_deref().unwrap_or("-");
    if err.kind.is_client_error() {
        tracing::warn!(
            "[{}] {} {} user={:?} details={:?}",
            trace,
            err.kind.code(),
            err.message,
            err.user_id,
            err.details
        );
    } else {
        tracing::error!(
            "[{}] {} {} user={:?} details={:?}",
            trace,
            err.kind.code(),
            err.message,
            err.user_id,
            err.details
        );
    }
}

/// Handler-facing wrapper so `?` works in axum handlers.
///
/// Anything convertible into [`AppError`] converts into this; the
/// responder runs at `into_response` time.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error_response(&self.0)
    }
}

impl<E> From<E> for ApiError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// Attach `X-RateLimit-*` headers to an admitted response.
pub fn attach_rate_limit_headers(
    response: &mut Response,
    decision: &RateLimitDecision,
    window: std::time::Duration,
) {
    let reset_unix = chrono::Utc::now().timestamp().saturating_add(
        i64::try_from(decision.retry_after_secs()).unwrap_or(i64::MAX),
    );
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", header_value(decision.limit.to_string()));
    headers.insert("x-ratelimit-remaining", header_value(decision.remaining.to_string()));
    headers.insert("x-ratelimit-reset", header_value(reset_unix.to_string()));
    headers.insert("x-ratelimit-window", header_value(window.as_secs().to_string()));
}

/// Full 429 response: envelope plus `Retry-After` and `X-RateLimit-*`.
pub fn too_many_requests(
    decision: &RateLimitDecision,
    message: Option<&str>,
    window: std::time::Duration,
    trace_id: &str,
) -> Response {
    let retry_after = decision.retry_after_secs();
    let err = AppError::new(
        pitlane_types::ErrorKind::RateLimited,
        message.unwrap_or("Too many requests"),
    )
    .with_details(json!({ "retry_after_secs": retry_after }))
    .with_trace(trace_id);

    let mut response = error_response(&err);
    response.headers_mut().insert("retry-after", header_value(retry_after.to_string()));
    attach_rate_limit_headers(&mut response, decision, window);
    response
}

fn header_value(value: String) -> HeaderValue {
    HeaderValue::from_str(&value).unwrap_or(HeaderValue::from_static("0"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pitlane_types::ErrorKind;
    use std::time::{Duration, Instant};

    #[test]
    fn test_envelope_shape() {
        let err = AppError::new(ErrorKind::RecordNotFound, "chat missing").with_trace("tr4ce001");
        let response = error_response(&err);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_too_many_requests_headers() {
        let decision = RateLimitDecision {
            allowed: false,
            remaining: 0,
            reset_at: Instant::now() + Duration::from_secs(30),
            limit: 60,
        };
        let response = too_many_requests(&decision, Some("slow down"), Duration::from_secs(60), "t");
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));
        assert_eq!(response.headers()["x-ratelimit-limit"], "60");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
        assert_eq!(response.headers()["x-ratelimit-window"], "60");
    }
}
