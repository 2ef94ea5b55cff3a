//! Integration tests for the HTTP remediator client against a mock server.

use std::time::Duration;

use chrono::Utc;
use mockito::Matcher;
use serde_json::Map;

use warden::adapters::http::HttpRemediator;
use warden::domain::models::{ActionIntent, ActionKind, Severity, TaskEnvelope};
use warden::domain::ports::{RemediationOutcome, Remediator};

fn envelope() -> TaskEnvelope {
    let intent = ActionIntent {
        action: ActionKind::Restart,
        target: "web-1".to_string(),
        severity: Severity::Critical,
        params: Map::new(),
    };
    TaskEnvelope::first_attempt(42, &intent, Utc::now())
}

fn client(server: &mockito::ServerGuard) -> HttpRemediator {
    HttpRemediator::new(format!("{}/remediate", server.url()), Duration::from_secs(2))
        .expect("client")
}

#[tokio::test]
async fn success_response_with_identifying_headers() {
    let mut server = mockito::Server::new_async().await;
    let env = envelope();
    let mock = server
        .mock("POST", "/remediate")
        .match_header("user-agent", Matcher::Regex("^warden/".to_string()))
        .match_header("idempotency-key", env.idempotency_key().as_str())
        .match_body(Matcher::PartialJson(serde_json::json!({
            "task_id": env.task_id,
            "action_id": 42,
            "target": "web-1",
            "action": "restart",
            "severity": "critical",
            "attempt": 1,
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":"success","detail":"restarted"}"#)
        .create_async()
        .await;

    let outcome = client(&server).dispatch(&env).await;
    mock.assert_async().await;
    assert_eq!(
        outcome,
        RemediationOutcome::Success {
            detail: Some("restarted".to_string())
        }
    );
}

#[tokio::test]
async fn failed_body_on_2xx_is_permanent() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/remediate")
        .with_status(200)
        .with_body(r#"{"status":"failed","detail":"no such unit"}"#)
        .create_async()
        .await;

    let outcome = client(&server).dispatch(&envelope()).await;
    match outcome {
        RemediationOutcome::Permanent { reason } => assert!(reason.contains("no such unit")),
        other => panic!("expected permanent, got {other:?}"),
    }
}

#[tokio::test]
async fn unparseable_2xx_body_is_permanent() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/remediate")
        .with_status(200)
        .with_body("not json at all")
        .create_async()
        .await;

    let outcome = client(&server).dispatch(&envelope()).await;
    assert!(matches!(outcome, RemediationOutcome::Permanent { .. }));
}

#[tokio::test]
async fn server_errors_are_transient() {
    for status in [500, 502, 503, 429] {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/remediate")
            .with_status(status)
            .create_async()
            .await;

        let outcome = client(&server).dispatch(&envelope()).await;
        assert!(
            matches!(outcome, RemediationOutcome::Transient { .. }),
            "status {status} should be transient"
        );
    }
}

#[tokio::test]
async fn client_errors_are_permanent() {
    for status in [400, 404, 422, 501] {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/remediate")
            .with_status(status)
            .create_async()
            .await;

        let outcome = client(&server).dispatch(&envelope()).await;
        assert!(
            matches!(outcome, RemediationOutcome::Permanent { .. }),
            "status {status} should be permanent"
        );
    }
}

#[tokio::test]
async fn unreachable_endpoint_is_transient() {
    // Nothing listens on this port.
    let remediator =
        HttpRemediator::new("http://127.0.0.1:9", Duration::from_millis(500)).expect("client");
    let outcome = remediator.dispatch(&envelope()).await;
    assert!(matches!(outcome, RemediationOutcome::Transient { .. }));
}
