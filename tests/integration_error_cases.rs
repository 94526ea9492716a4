#![allow(clippy::unwrap_used, clippy::panic, clippy::missing_panics_doc, unreachable_pub)]
use axum::http::StatusCode;
use herald_server::config::FailurePolicy;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
mod common;

async fn error_of(resp: reqwest::Response) -> (StatusCode, Value) {
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn test_missing_text_is_rejected() {
    let app = common::TestApp::spawn().await;

    let resp = app.client.post(format!("{}/messages", app.server_url)).json(&json!({})).send().await.unwrap();
    let (status, body) = error_of(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Text is required" }));
}

#[tokio::test]
async fn test_blank_text_is_rejected() {
    let app = common::TestApp::spawn().await;

    for text in ["", "   ", "\n\t"] {
        let (status, body) = error_of(app.submit(text).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Text is required");
    }

    let body: Value = app.list(None).await.json().await.unwrap();
    assert!(body["messages"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_text_over_limit_is_rejected() {
    let app = common::TestApp::spawn().await;

    let (status, body) = error_of(app.submit(&"a".repeat(256)).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("255"));

    assert_eq!(app.submit(&"é".repeat(255)).await.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_text_with_nul_character_is_rejected() {
    let app = common::TestApp::spawn().await;

    let (status, body) = error_of(app.submit("hello\u{0}world").await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Text must not contain NUL characters" }));

    assert_eq!(app.submit("hello world").await.status(), StatusCode::ACCEPTED);
    let messages = app.wait_for_messages(1).await;
    assert_eq!(messages[0]["text"], "hello world");
    assert!(app.dead_letters.is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let app = common::TestApp::spawn().await;

    let resp = app
        .client
        .post(format!("{}/messages", app.server_url))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    let (status, body) = error_of(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));

    let resp = app.client.post(format!("{}/messages", app.server_url)).json(&json!({ "text": 42 })).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_status_filter_skips_storage() {
    let repository = Arc::new(common::CountingRepository::default());
    let app = common::TestApp::spawn_with_repository(common::get_test_config(), repository.clone()).await;

    for status in ["unread", "SENT", ""] {
        let (status_code, body) = error_of(app.list(Some(status)).await).await;
        assert_eq!(status_code, StatusCode::BAD_REQUEST, "status filter {status:?}");
        assert_eq!(body, json!({ "error": "Invalid status" }));
    }
    assert_eq!(repository.queries.load(Ordering::SeqCst), 0);

    assert_eq!(app.list(Some("sent")).await.status(), StatusCode::OK);
    assert_eq!(repository.queries.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_storage_failure_on_list_is_generic() {
    let app = common::TestApp::spawn_with_repository(
        common::get_test_config(),
        Arc::new(common::FailingRepository::default()),
    )
    .await;

    let (status, body) = error_of(app.list(None).await).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "An unexpected error has occurred" }));
}

#[tokio::test]
async fn test_storage_failure_after_acceptance_is_dead_lettered() {
    let mut config = common::get_test_config();
    config.dispatch.failure_policy = FailurePolicy::DeadLetter;
    let repository = Arc::new(common::FailingRepository::default());
    let app = common::TestApp::spawn_with_repository(config, repository.clone()).await;

    let resp = app.submit("doomed").await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body: Value = resp.json().await.unwrap();
    let submission_id: uuid::Uuid = body["submissionId"].as_str().unwrap().parse().unwrap();

    let deadline = tokio::time::Instant::now() + common::POLL_TIMEOUT;
    while app.dead_letters.is_empty() {
        assert!(tokio::time::Instant::now() < deadline, "submission was never dead-lettered");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let letters = app.dead_letters.snapshot();
    assert_eq!(letters.len(), 1);
    assert_eq!(letters[0].submission_id, submission_id);
    assert_eq!(letters[0].command.text.as_str(), "doomed");
    assert_eq!(repository.saves.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_full_backlog_returns_service_unavailable() {
    let mut config = common::get_test_config();
    config.dispatch.capacity = 2;
    let app = common::TestApp::spawn_paused(config).await;

    assert_eq!(app.submit("one").await.status(), StatusCode::ACCEPTED);
    assert_eq!(app.submit("two").await.status(), StatusCode::ACCEPTED);

    let (status, body) = error_of(app.submit("three").await).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({ "error": "Service temporarily unavailable" }));
}

#[tokio::test]
async fn test_unknown_route_is_json_not_found() {
    let app = common::TestApp::spawn().await;

    let resp = app.client.get(format!("{}/nope", app.server_url)).send().await.unwrap();
    let (status, body) = error_of(resp).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_wrong_method_is_json_method_not_allowed() {
    let app = common::TestApp::spawn().await;

    let resp = app.client.delete(format!("{}/messages", app.server_url)).send().await.unwrap();
    let (status, body) = error_of(resp).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, json!({ "error": "The requested method is not supported for this endpoint" }));
}

#[tokio::test]
async fn test_mark_read_rejects_bad_and_unknown_uuids() {
    let app = common::TestApp::spawn().await;

    let resp = app.client.put(format!("{}/messages/not-a-uuid/read", app.server_url)).send().await.unwrap();
    let (status, body) = error_of(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid message uuid");

    let resp = app
        .client
        .put(format!("{}/messages/{}/read", app.server_url, uuid::Uuid::new_v4()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
