//! OAuth sign-in flow and session handlers.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum::Extension;
use serde::{Deserialize, Serialize};

use pitlane_core::pipeline::TraceId;
use pitlane_core::{validate, ApiError};
use pitlane_types::{AppError, ErrorKind, Identity};

use crate::state::AppState;

#[derive(Serialize)]
pub struct LoginResponse {
    pub url: String,
    pub state: String,
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Start the sign-in flow: hand the browser the provider URL.
pub async fn login(
    State(state): State<AppState>,
    Extension(trace): Extension<TraceId>,
) -> Result<Json<LoginResponse>, ApiError> {
    let csrf = state.sessions().issue_state();
    let url = state
        .oauth()
        .authorize_url(&csrf)
        .map_err(|e| ApiError(e.with_trace(trace.0.clone())))?;
    Ok(Json(LoginResponse { url, state: csrf }))
}

/// Provider redirect target: validate state, exchange the code, create a
/// session, and send the browser home with the cookie set.
pub async fn callback(
    State(state): State<AppState>,
    Extension(trace): Extension<TraceId>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ApiError> {
    let traced = |err: AppError| ApiError(err.with_trace(trace.0.clone()));

    let csrf = query.state.as_deref().unwrap_or("");
    if !state.sessions().consume_state(csrf) {
        return Err(traced(AppError::new(
            ErrorKind::Unauthorized,
            "state token is missing or invalid",
        )));
    }

    if let Some(error) = query.error {
        return Err(traced(AppError::unauthorized(format!(
            "provider rejected the sign-in: {error}"
        ))));
    }

    let code = query.code.as_deref().unwrap_or("");
    validate::required("code", Some(code).filter(|c| !c.is_empty())).map_err(traced)?;

    let token = state.oauth().exchange_code(code).await.map_err(traced)?;
    let info = state.oauth().fetch_userinfo(&token.access_token).await.map_err(traced)?;
    validate::email("email", &info.email).map_err(traced)?;

    let user = state
        .repo()
        .upsert_user(&info.email, info.name.as_deref())
        .await
        .map_err(|e| traced(e.into()))?;

    let session_token = state.sessions().create(user.id, &user.email);
    tracing::info!("[{}] user {} signed in", trace.0, user.email);

    let mut response = Redirect::to("/").into_response();
    if let Ok(cookie) = state.sessions().cookie_for(&session_token).parse() {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    Ok(response)
}

/// Who am I.
pub async fn me(Extension(identity): Extension<Identity>) -> Json<Identity> {
    Json(identity)
}

/// Revoke the current session and clear the cookie.
pub async fn logout(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> Response {
    let cookie_header = headers.get(header::COOKIE).and_then(|h| h.to_str().ok());
    state.sessions().revoke_header(cookie_header);

    let mut response = Json(serde_json::json!({"success": true})).into_response();
    if let Ok(cookie) = state.sessions().clear_cookie().parse() {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}
