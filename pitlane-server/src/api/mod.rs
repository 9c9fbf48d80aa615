//! API Routes
//!
//! Route groups differ only in their pipeline policy: which methods are
//! allowed, which limiter counts them, and whether a session is required.

pub mod auth;
pub mod chat;
pub mod chats;
pub mod health;

#[cfg(test)]
mod chat_tests;

use axum::http::{Method, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;

use pitlane_core::pipeline::{run_policy, RoutePolicy};

use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let sessions = state.sessions();
    let limiters = state.limiters();

    // canonical stage order everywhere: method check, rate limit, auth
    let api_policy = RoutePolicy::builder()
        .rate_limit(limiters.api.clone())
        .require_auth(sessions.clone())
        .build();

    let chat_policy = RoutePolicy::builder()
        .allow_methods(&[Method::POST])
        .rate_limit(limiters.chat.clone())
        .require_auth(sessions.clone())
        .build();

    let auth_flow_policy = RoutePolicy::builder()
        .allow_methods(&[Method::GET])
        .rate_limit(limiters.auth.clone())
        .build();

    let protected = Router::new()
        // Chats
        .route("/api/chats", get(chats::list_chats).post(chats::create_chat))
        .route(
            "/api/chats/:chat_id",
            get(chats::get_chat).delete(chats::delete_chat),
        )
        .route("/api/chats/:chat_id/messages", post(chats::append_message))
        // Session introspection / teardown
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
        .layer(middleware::from_fn_with_state(api_policy, run_policy));

    let chat_routes = Router::new()
        .route("/api/chat", post(chat::chat))
        .layer(middleware::from_fn_with_state(chat_policy, run_policy));

    // OAuth flow (no session yet; the auth limiter counts failures only)
    let auth_flow = Router::new()
        .route("/api/auth/login", get(auth::login))
        .route("/api/auth/callback", get(auth::callback))
        .layer(middleware::from_fn_with_state(auth_flow_policy, run_policy));

    // Liveness probes stay outside every policy
    let public = Router::new()
        .route("/api/health", get(health::health))
        .route("/api/check-db", get(health::check_db));

    protected
        .merge(chat_routes)
        .merge(auth_flow)
        .merge(public)
        .fallback(api_not_found)
}

async fn api_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({"error": "Not found"})))
}
