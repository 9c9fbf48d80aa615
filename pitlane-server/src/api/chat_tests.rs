//! End-to-end chat streaming tests against a mocked inference endpoint.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use http_body_util::BodyExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pitlane_types::models::{AppConfig, ToolEndpoints};
use pitlane_types::MessageRole;
use tower::ServiceExt;

use crate::router::build_router;
use crate::state::{AppState, Limiters};
use crate::test_helpers::{signed_in, test_app_state_with};

const SSE_REPLY: &str = concat!(
    "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"Box \"}}]}\n\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"box!\"}}]}\n\n",
    "data: [DONE]\n\n",
);

async fn llm_backed_state(server: &MockServer) -> AppState {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_raw(SSE_REPLY, "text/event-stream"),
        )
        .mount(server)
        .await;

    let config = AppConfig {
        llm_url: server.uri(),
        tools: ToolEndpoints {
            weather_url: server.uri(),
            motorsport_url: server.uri(),
            stocks_url: server.uri(),
        },
        ..AppConfig::default()
    };
    test_app_state_with(config, Limiters::default())
}

fn chat_request(cookie: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/chat")
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "203.0.113.20")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn test_chat_streams_reply_and_persists_both_sides() {
    let server = MockServer::start().await;
    let state = llm_backed_state(&server).await;
    let (identity, cookie) = signed_in(&state).await;
    let app = build_router(state.clone());

    let response = app
        .oneshot(chat_request(&cookie, r#"{"message":"radio check"}"#))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let chat_id: uuid::Uuid = response.headers()["x-chat-id"]
        .to_str()
        .expect("chat id header")
        .parse()
        .expect("uuid");

    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    assert_eq!(&bytes[..], b"Box box!");

    // both turns are on record once the stream has drained
    let history = state
        .repo()
        .get_chat_with_messages(identity.user_id, chat_id)
        .await
        .expect("history");
    assert_eq!(history.chat.title, "radio check");
    assert_eq!(history.messages.len(), 2);
    assert_eq!(history.messages[0].role, MessageRole::User);
    assert_eq!(history.messages[0].content, "radio check");
    assert_eq!(history.messages[1].role, MessageRole::Assistant);
    assert_eq!(history.messages[1].content, "Box box!");
}

#[tokio::test]
async fn test_chat_attaches_weather_tool_context() {
    let server = MockServer::start().await;
    let state = llm_backed_state(&server).await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .and(query_param("location", "spa"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "conditions": "wet", "temperature_c": 9.0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (identity, cookie) = signed_in(&state).await;
    let app = build_router(state.clone());

    let response = app
        .oneshot(chat_request(&cookie, r#"{"message":"what's the weather in spa?"}"#))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let chat_id: uuid::Uuid =
        response.headers()["x-chat-id"].to_str().expect("header").parse().expect("uuid");
    let _ = response.into_body().collect().await.expect("drain");

    let history = state
        .repo()
        .get_chat_with_messages(identity.user_id, chat_id)
        .await
        .expect("history");
    let tool_results = history.messages[0].tool_results.as_ref().expect("tool context");
    assert_eq!(tool_results["tool"], "weather");
    assert_eq!(tool_results["data"]["conditions"], "wet");
}

#[tokio::test]
async fn test_chat_survives_tool_failure() {
    let server = MockServer::start().await;
    let state = llm_backed_state(&server).await;
    // no /forecast mock mounted: the tool 404s and the chat degrades

    let (identity, cookie) = signed_in(&state).await;
    let app = build_router(state.clone());

    let response = app
        .oneshot(chat_request(&cookie, r#"{"message":"weather in monza?"}"#))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let chat_id: uuid::Uuid =
        response.headers()["x-chat-id"].to_str().expect("header").parse().expect("uuid");
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    assert_eq!(&bytes[..], b"Box box!");

    let history = state
        .repo()
        .get_chat_with_messages(identity.user_id, chat_id)
        .await
        .expect("history");
    assert!(history.messages[0].tool_results.is_none());
}

#[tokio::test]
async fn test_chat_validates_message_bounds() {
    let server = MockServer::start().await;
    let state = llm_backed_state(&server).await;
    let (_, cookie) = signed_in(&state).await;
    let app = build_router(state);

    let long = format!(r#"{{"message":"{}"}}"#, "x".repeat(4001));
    let response = app.clone().oneshot(chat_request(&cookie, &long)).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response =
        app.oneshot(chat_request(&cookie, r#"{"message":""}"#)).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_with_unknown_chat_id_is_404() {
    let server = MockServer::start().await;
    let state = llm_backed_state(&server).await;
    let (_, cookie) = signed_in(&state).await;
    let app = build_router(state);

    let body = format!(
        r#"{{"message":"hello","chat_id":"{}"}}"#,
        uuid::Uuid::new_v4()
    );
    let response = app.oneshot(chat_request(&cookie, &body)).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
