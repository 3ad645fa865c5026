//! Client behavior against a simulated workspace

use std::time::{Duration, Instant};

use docpress_client::{ClientConfig, WorkspaceClient};
use docpress_domain::{Error, WorkspaceApi};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> WorkspaceClient {
    let config = ClientConfig {
        base_url: server.uri(),
        token: "secret-token".to_owned(),
        req_per_sec: 50,
        max_retries: 5,
        attempt_timeout: Duration::from_secs(5),
        op_timeout: Duration::from_secs(30),
        ..ClientConfig::default()
    };
    WorkspaceClient::new(config).expect("client builds")
}

fn append_ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "results": [{
            "object": "block",
            "id": "b-1",
            "has_children": false,
            "type": "paragraph",
            "paragraph": { "rich_text": [] }
        }]
    }))
}

#[tokio::test]
async fn rate_limit_hint_is_honored_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/blocks/page-1/children"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "1"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/blocks/page-1/children"))
        .respond_with(append_ok())
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let start = Instant::now();
    let blocks = client
        .append_children("page-1", vec![json!({"object": "block"})])
        .await
        .expect("append succeeds after backoff");
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].id, "b-1");
    // Two 1-second hints were honored.
    assert!(start.elapsed() >= Duration::from_secs(2));
}

#[tokio::test]
async fn transient_errors_retry_up_to_the_bound() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pages/p-1"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let config = ClientConfig {
        base_url: server.uri(),
        token: "secret-token".to_owned(),
        req_per_sec: 50,
        max_retries: 3,
        attempt_timeout: Duration::from_secs(5),
        op_timeout: Duration::from_secs(60),
        ..ClientConfig::default()
    };
    let client = WorkspaceClient::new(config).expect("client builds");
    let error = client.retrieve_page("p-1").await.expect_err("must fail");
    assert!(matches!(error, Error::Transient { .. }));
    // wiremock verifies exactly 3 attempts on drop.
}

#[tokio::test]
async fn not_found_fails_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pages/gone"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"code": "object_not_found", "message": "gone"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = client.retrieve_page("gone").await.expect_err("must fail");
    assert!(matches!(error, Error::NotFound { .. }));
}

#[tokio::test]
async fn validation_failure_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/blocks/p-1/children"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "validation_error",
            "message": "body.children[0].type should be defined"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = client
        .append_children("p-1", vec![json!({})])
        .await
        .expect_err("must fail");
    assert!(matches!(error, Error::Validation { .. }));
}

#[tokio::test]
async fn conflict_retries_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/blocks/p-2/children"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "conflict_error",
            "message": "transaction conflict, retry"
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/blocks/p-2/children"))
        .respond_with(append_ok())
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let blocks = client
        .append_children("p-2", vec![json!({"object": "block"})])
        .await
        .expect("append succeeds after conflict retry");
    assert_eq!(blocks.len(), 1);
}

#[tokio::test]
async fn oversized_append_is_rejected_locally() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    let children = vec![json!({}); 101];
    let error = client
        .append_children("p-3", children)
        .await
        .expect_err("local limit check");
    assert!(matches!(error, Error::InvalidInput { .. }));
    // No request must have reached the server.
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn pagination_cursor_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blocks/parent/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{
                "object": "block",
                "id": "b-9",
                "has_children": false,
                "type": "divider",
                "divider": {}
            }],
            "next_cursor": "cur-2",
            "has_more": true
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let page = client
        .list_children("parent", None)
        .await
        .expect("list succeeds");
    assert!(page.has_more);
    assert_eq!(page.next_cursor.as_deref(), Some("cur-2"));
    assert_eq!(page.results.len(), 1);
}
