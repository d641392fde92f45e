//! HTTP layer: route handlers, DTOs, and router composition.
//!
//! `POST /v1/callback` receives platform callbacks; `GET /health` is the
//! liveness probe.

pub mod dto;
pub mod handlers;

use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::{BoxError, Router};
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::error::RsvpError;
use crate::persistence::Store;

/// Builds the complete router with tracing and a per-request deadline.
pub fn build_router<S: Store>(state: AppState<S>, request_timeout: Duration) -> Router {
    handlers::routes()
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_timeout_error(err: BoxError) -> RsvpError {
    if err.is::<tower::timeout::error::Elapsed>() {
        tracing::warn!("request deadline exceeded");
        RsvpError::Timeout
    } else {
        RsvpError::Internal(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::api::dto::CallbackResponse;
    use crate::persistence::memory::MemoryStore;

    fn app() -> Router {
        build_router(AppState::new(MemoryStore::new()), Duration::from_secs(5))
    }

    async fn post_callback(app: Router, body: Value) -> (StatusCode, Vec<u8>) {
        let Ok(request) = Request::builder()
            .method("POST")
            .uri("/v1/callback")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
        else {
            panic!("request should build");
        };
        let Ok(response) = app.oneshot(request).await else {
            panic!("router is infallible");
        };
        let status = response.status();
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body should be readable");
        };
        (status, bytes.to_vec())
    }

    async fn texts(app: Router, events: Value) -> Vec<String> {
        let (status, body) = post_callback(app, json!({ "events": events })).await;
        assert_eq!(status, StatusCode::OK);
        let Ok(parsed) = serde_json::from_slice::<CallbackResponse>(&body) else {
            panic!("response should parse");
        };
        parsed.replies.into_iter().map(|r| r.text).collect()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let Ok(request) = Request::builder().uri("/health").body(Body::empty()) else {
            panic!("request should build");
        };
        let Ok(response) = app().oneshot(request).await else {
            panic!("router is infallible");
        };
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn one_reply_per_callback_in_order() {
        let replies = texts(
            app(),
            json!([
                {"type": "follow", "user_id": "O1"},
                {"type": "message", "user_id": "O1", "text": "help"},
                {"type": "message", "user_id": "O1", "text": "hello there"},
            ]),
        )
        .await;
        assert_eq!(replies.len(), 3);
        assert!(replies.first().is_some_and(|t| t.starts_with("Thanks for following")));
        assert_eq!(replies.get(2).map(String::as_str), Some("hello there"));
    }

    #[tokio::test]
    async fn state_persists_across_requests() {
        let app = app();
        let replies = texts(
            app.clone(),
            json!([
                {"type": "message", "user_id": "O1", "text": "open"},
                {"type": "message", "user_id": "O1", "text": "start"},
            ]),
        )
        .await;
        let Some(started) = replies.get(1) else {
            panic!("missing start reply");
        };
        let Some(event_id) = started.lines().last() else {
            panic!("start reply should end with the event id");
        };

        let replies = texts(
            app,
            json!([
                {"type": "message", "user_id": "U1", "text": format!("join {event_id}")},
                {"type": "message", "user_id": "U1", "text": "voted 1"},
            ]),
        )
        .await;
        assert_eq!(
            replies,
            vec![
                format!("You joined event {event_id}."),
                "You voted \"great\".".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn blank_user_is_rejected_with_error_body() {
        let (status, body) = post_callback(
            app(),
            json!({"events": [{"type": "follow", "user_id": ""}]}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let Ok(parsed) = serde_json::from_slice::<Value>(&body) else {
            panic!("error body should be JSON");
        };
        assert_eq!(parsed.pointer("/error/code"), Some(&json!(1001)));
    }

    #[tokio::test]
    async fn empty_batch_yields_no_replies() {
        assert!(texts(app(), json!([])).await.is_empty());
    }
}
