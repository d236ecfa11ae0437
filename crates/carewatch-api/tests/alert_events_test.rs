#![allow(clippy::unwrap_used)]
// Integration tests for `CareClient` using wiremock.

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use std::time::Duration;

use carewatch_api::{CareClient, Error, HandlingRequest, ResolveRequest, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, CareClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = CareClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

fn handling() -> HandlingRequest {
    HandlingRequest {
        handling_by: "u-1".into(),
        handling_by_name: "Alice".into(),
        handling_by_initials: "A".into(),
    }
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_login_stores_token() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/auth/token"))
        .and(body_json(json!({"email": "alice@care.example", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "tok-123",
            "refreshToken": "ref-456",
            "user": {"id": "u-1", "name": "Alice"}
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/alert-events"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let secret: secrecy::SecretString = "pw".to_string().into();
    let tokens = client.login("alice@care.example", &secret).await.unwrap();
    assert!(tokens.refresh_token.is_some());
    assert!(client.has_token());

    client.list_unresolved_alert_events(10).await.unwrap();
}

#[tokio::test]
async fn test_login_failure() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/auth/token"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid credentials"})),
        )
        .mount(&server)
        .await;

    let secret: secrecy::SecretString = "wrong".to_string().into();
    let result = client.login("alice@care.example", &secret).await;

    match result {
        Err(Error::Authentication { message }) => assert_eq!(message, "Invalid credentials"),
        other => panic!("expected Authentication error, got: {other:?}"),
    }
    assert!(!client.has_token());
}

#[tokio::test]
async fn test_unauthorized_clears_token() {
    let (server, client) = setup().await;
    client.set_token("stale".to_string().into());

    Mock::given(method("GET"))
        .and(path("/api/v2/alert-events"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.list_unresolved_alert_events(10).await.unwrap_err();
    assert!(err.is_auth_expired(), "got: {err:?}");
    assert!(!client.has_token());
}

// ── Listing tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_list_unresolved_sends_filter() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/alert-events"))
        .and(query_param("status", "unresolved"))
        .and(query_param("limit", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "a1",
            "patientId": "p1",
            "patientName": "Jenny Wilson",
            "type": "HR",
            "value": 89,
            "triggeredAt": "2024-11-07T20:24:00Z",
            "isHandling": false,
            "isResolved": false
        }])))
        .mount(&server)
        .await;

    let events = client.list_unresolved_alert_events(1000).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, "a1");
    assert_eq!(events[0].patient_name.as_deref(), Some("Jenny Wilson"));
}

#[tokio::test]
async fn test_list_accepts_wrapped_payloads() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/alert-events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [{"id": 1}, {"id": 2}]
        })))
        .mount(&server)
        .await;

    let ids: Vec<String> = client
        .list_unresolved_alert_events(5)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec!["1".to_owned(), "2".to_owned()]);
}

#[tokio::test]
async fn test_list_server_error_uses_body_message() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/alert-events"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({"message": "database unavailable"})),
        )
        .mount(&server)
        .await;

    let err = client.list_unresolved_alert_events(5).await.unwrap_err();
    assert!(err.is_transient());
    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "database unavailable");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_slow_backend_reports_configured_timeout() {
    let server = MockServer::start().await;
    let transport = TransportConfig {
        timeout: Duration::from_secs(1),
        ..TransportConfig::default()
    };
    let client = CareClient::new(Url::parse(&server.uri()).unwrap(), &transport).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/v2/alert-events"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = client.list_unresolved_alert_events(5).await.unwrap_err();
    assert!(matches!(err, Error::Timeout { timeout_secs: 1 }), "{err:?}");
    assert!(err.is_transient());
    assert_eq!(err.to_string(), "Request timed out after 1s");
}

#[tokio::test]
async fn test_list_garbage_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/alert-events"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let err = client.list_unresolved_alert_events(5).await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { .. }), "got: {err:?}");
}

// ── Mutation tests ──────────────────────────────────────────────────

#[tokio::test]
async fn test_mark_in_progress_posts_identity() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/alert-events/a1/in-progress"))
        .and(body_json(json!({
            "handling_by": "u-1",
            "handling_by_name": "Alice",
            "handling_by_initials": "A"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    client
        .mark_alert_event_in_progress("a1", &handling())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_mark_in_progress_missing_endpoint() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/alert-events/a1/in-progress"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client
        .mark_alert_event_in_progress("a1", &handling())
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "got: {err:?}");
}

#[tokio::test]
async fn test_release_accepts_empty_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/alert-events/a1/release"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.release_alert_event("a1").await.unwrap();
}

#[tokio::test]
async fn test_resolve_posts_reasons_and_notes() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/alert-events/a1/resolve"))
        .and(body_json(json!({
            "resolution_options": ["Contacted patient"],
            "resolution_notes": "Fine"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    client
        .resolve_alert_event(
            "a1",
            &ResolveRequest {
                resolution_options: vec!["Contacted patient".into()],
                resolution_notes: "Fine".into(),
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_ids_are_percent_encoded() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/alert-events/a%2Fb/release"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.release_alert_event("a/b").await.unwrap();
}

#[tokio::test]
async fn test_api_prefix_in_base_url() {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/api", server.uri())).unwrap();
    let client = CareClient::with_client(reqwest::Client::new(), base_url);

    Mock::given(method("GET"))
        .and(path("/api/v2/alert-events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.list_unresolved_alert_events(1).await.unwrap().is_empty());
}
