//! HTTP surface tests over the in-memory workspace

use std::net::SocketAddr;
use std::sync::Arc;

use docpress_application::testing::FakeWorkspace;
use docpress_infrastructure::config::{AppConfig, ConfigHandle, WorkspaceConfig};
use docpress_server::{AppState, build_router};
use serde_json::{Value, json};

fn test_config() -> AppConfig {
    AppConfig {
        workspace: WorkspaceConfig {
            token: "test-token-1234".to_owned(),
            ..WorkspaceConfig::default()
        },
        log_level: "warn".to_owned(),
        ..AppConfig::default()
    }
}

async fn spawn_app(fake: Arc<FakeWorkspace>) -> SocketAddr {
    let state = AppState::new(ConfigHandle::new(test_config()), fake);
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral listener");
    let addr = listener.local_addr().expect("read listener addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

#[tokio::test]
async fn health_answers_ok() {
    let addr = spawn_app(Arc::new(FakeWorkspace::new())).await;
    let body: Value = reqwest::get(format!("http://{addr}/api/health"))
        .await
        .expect("request succeeds")
        .json()
        .await
        .expect("json body");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn status_redacts_the_token() {
    let addr = spawn_app(Arc::new(FakeWorkspace::new())).await;
    let body: Value = reqwest::get(format!("http://{addr}/api/status"))
        .await
        .expect("request succeeds")
        .json()
        .await
        .expect("json body");
    let token = body["data"]["env"]["WORKSPACE_TOKEN"]
        .as_str()
        .expect("token present");
    assert!(token.ends_with("****"));
    assert!(!token.contains("1234"), "raw token leaked: {token}");
}

#[tokio::test]
async fn dry_run_returns_tree_and_report_without_remote_calls() {
    let fake = Arc::new(FakeWorkspace::new());
    let addr = spawn_app(Arc::clone(&fake)).await;
    let client = reqwest::Client::new();
    let body: Value = client
        .post(format!("http://{addr}/api/pages"))
        .json(&json!({
            "databaseId": "db-1",
            "contentHtml": "<h1>Hello</h1><p>World.</p>",
            "dryRun": true
        }))
        .send()
        .await
        .expect("request succeeds")
        .json()
        .await
        .expect("json body");

    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["report"]["hasErrors"], false);
    assert_eq!(body["data"]["report"]["coverage"], 1.0);
    let blocks = body["data"]["blocks"].as_array().expect("tree returned");
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0]["type"], "heading_1");
    assert!(fake.log().is_empty(), "dry run must not touch the workspace");
}

#[tokio::test]
async fn create_page_end_to_end() {
    let fake = Arc::new(FakeWorkspace::new());
    let addr = spawn_app(Arc::clone(&fake)).await;
    let client = reqwest::Client::new();
    let body: Value = client
        .post(format!("http://{addr}/api/pages"))
        .json(&json!({
            "title": "Guide",
            "databaseId": "db-1",
            "contentHtml": "<h1>Guide</h1><p>Welcome aboard.</p>"
        }))
        .send()
        .await
        .expect("request succeeds")
        .json()
        .await
        .expect("json body");

    assert_eq!(body["success"], true, "body: {body}");
    let page_id = body["data"]["pageId"].as_str().expect("page id");
    assert_eq!(body["data"]["stats"]["appended"], 2);
    assert_eq!(fake.children_of(page_id).len(), 2);

    // The finished job is observable until TTL eviction.
    let request_id = body["data"]["requestId"].as_str().expect("request id");
    let job: Value = reqwest::get(format!("http://{addr}/api/jobs/{request_id}"))
        .await
        .expect("request succeeds")
        .json()
        .await
        .expect("json body");
    assert_eq!(job["data"]["phase"], "done");
}

#[tokio::test]
async fn replace_missing_page_maps_to_not_found() {
    let addr = spawn_app(Arc::new(FakeWorkspace::new())).await;
    let client = reqwest::Client::new();
    let response = client
        .patch(format!(
            "http://{addr}/api/pages/00000000-0000-0000-0000-00000000dead"
        ))
        .json(&json!({ "contentHtml": "<p>content</p>" }))
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn append_children_assigns_ids() {
    let fake = Arc::new(FakeWorkspace::new());
    fake.seed_page("11111111-1111-1111-1111-111111111111");
    let addr = spawn_app(Arc::clone(&fake)).await;
    let client = reqwest::Client::new();
    let body: Value = client
        .post(format!(
            "http://{addr}/api/pages/11111111-1111-1111-1111-111111111111:appendChildren"
        ))
        .json(&json!({
            "children": [{
                "object": "block",
                "type": "paragraph",
                "paragraph": { "rich_text": [{
                    "type": "text", "text": { "content": "appended" }
                }]}
            }]
        }))
        .send()
        .await
        .expect("request succeeds")
        .json()
        .await
        .expect("json body");

    assert_eq!(body["success"], true, "body: {body}");
    assert_eq!(body["data"]["appended"], 1);
    assert_eq!(
        body["data"]["blockIds"].as_array().map(Vec::len),
        Some(1)
    );
}

#[tokio::test]
async fn invalid_append_payload_is_400() {
    let fake = Arc::new(FakeWorkspace::new());
    fake.seed_page("22222222-2222-2222-2222-222222222222");
    let addr = spawn_app(fake).await;
    let client = reqwest::Client::new();
    let response = client
        .post(format!(
            "http://{addr}/api/pages/22222222-2222-2222-2222-222222222222:appendChildren"
        ))
        .json(&json!({ "children": [{ "object": "block", "type": "mystery", "mystery": {} }] }))
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["error"]["code"], "invalid_input");
}

#[tokio::test]
async fn unknown_job_is_not_found_and_cancel_flags_jobs() {
    let addr = spawn_app(Arc::new(FakeWorkspace::new())).await;
    let client = reqwest::Client::new();

    let response = reqwest::get(format!("http://{addr}/api/jobs/nope"))
        .await
        .expect("request succeeds");
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    let response = client
        .post(format!("http://{addr}/api/jobs/nope:cancel"))
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn compare_page_reports_coverage() {
    let fake = Arc::new(FakeWorkspace::new());
    fake.seed_page("33333333-3333-3333-3333-333333333333");
    fake.seed_child(
        "33333333-3333-3333-3333-333333333333",
        json!({
            "object": "block",
            "type": "paragraph",
            "paragraph": { "rich_text": [{
                "type": "text", "text": { "content": "the quick brown fox" }
            }]}
        }),
    );
    let addr = spawn_app(fake).await;
    let client = reqwest::Client::new();
    let body: Value = client
        .post(format!("http://{addr}/api/compare/notion-page"))
        .json(&json!({
            "pageId": "33333333-3333-3333-3333-333333333333",
            "srcText": "The quick brown fox"
        }))
        .send()
        .await
        .expect("request succeeds")
        .json()
        .await
        .expect("json body");

    assert_eq!(body["success"], true, "body: {body}");
    assert_eq!(body["data"]["coverage"], 1.0);
    assert_eq!(body["data"]["hasErrors"], false);
}

#[tokio::test]
async fn database_schema_snapshot() {
    let addr = spawn_app(Arc::new(FakeWorkspace::new())).await;
    let body: Value = reqwest::get(format!("http://{addr}/api/databases/db-7"))
        .await
        .expect("request succeeds")
        .json()
        .await
        .expect("json body");
    assert_eq!(body["success"], true);
    assert!(body["data"]["properties"]["title"].is_object());
}

#[tokio::test]
async fn compare_health_reports_version() {
    let addr = spawn_app(Arc::new(FakeWorkspace::new())).await;
    let body: Value = reqwest::get(format!("http://{addr}/api/compare/health"))
        .await
        .expect("request succeeds")
        .json()
        .await
        .expect("json body");
    assert_eq!(body["data"]["status"], "ok");
    assert!(body["data"]["version"].is_string());
}
