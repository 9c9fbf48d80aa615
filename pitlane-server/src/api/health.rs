//! Liveness and schema probes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

/// Verify the expected relations exist.
pub async fn check_db(State(state): State<AppState>) -> impl IntoResponse {
    match state.repo().schema_check().await {
        Ok(tables) => {
            let expected = ["chats", "messages", "users"];
            let missing: Vec<&str> = expected
                .iter()
                .filter(|t| !tables.iter().any(|have| have == *t))
                .copied()
                .collect();

            if missing.is_empty() {
                (StatusCode::OK, Json(json!({"status": "ok", "tables": tables})))
            } else {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"status": "degraded", "missing": missing})),
                )
            }
        }
        Err(err) => {
            tracing::error!("check-db probe failed: {}", err);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "unreachable", "error": err.to_string()})),
            )
        }
    }
}
