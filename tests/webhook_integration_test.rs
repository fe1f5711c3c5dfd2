//! Webhook HTTP integration tests
//!
//! Drives the axum app directly with tower's `oneshot`; the messenger is a
//! recording mock, so nothing leaves the process.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use tutor_relay::server;
use tutor_relay::{Messenger, ParseMode, Relay, SendError};

#[derive(Default)]
struct RecordingMessenger {
    sent: Mutex<Vec<(i64, String)>>,
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(
        &self,
        chat_id: i64,
        text: &str,
        _parse_mode: ParseMode,
    ) -> Result<(), SendError> {
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }
}

fn test_app() -> (Router, Arc<RecordingMessenger>) {
    let messenger = Arc::new(RecordingMessenger::default());
    let relay = Arc::new(Relay::new(None, messenger.clone(), None, None));
    (server::build_router(relay), messenger)
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

#[tokio::test]
async fn malformed_json_is_acknowledged_with_200() {
    let (app, messenger) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/webhook")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{{{ definitely not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(messenger.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_body_is_acknowledged_with_200() {
    let (app, _) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/webhook")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "no chat id");
}

#[tokio::test]
async fn update_without_chat_id_sends_nothing() {
    let (app, messenger) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/webhook")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"message":{"text":"/myid"}}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(messenger.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn myid_round_trip_through_http() {
    let (app, messenger) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/webhook")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"message":{"chat":{"id":555},"text":"/myid"}}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");

    let sent = messenger.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, 555);
    assert!(sent[0].1.contains("555"));
}

#[tokio::test]
async fn options_preflight_is_empty_and_permissive() {
    let (app, _) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/webhook")
                .header(header::ORIGIN, "https://example.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let (app, _) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}
