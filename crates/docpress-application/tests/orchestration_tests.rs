//! Orchestration flows against the in-memory workspace

use std::sync::Arc;
use std::time::Duration;

use docpress_application::registry::JobRegistry;
use docpress_application::service::{
    CreatePageParams, PageService, ReplaceContentParams, ServiceConfig,
};
use docpress_application::testing::FakeWorkspace;
use docpress_domain::{Block, Error, JobPhase, marker};
use docpress_validate::Validator;

fn service_over(fake: Arc<FakeWorkspace>) -> PageService {
    PageService::new(
        fake,
        Arc::new(JobRegistry::default()),
        Validator::default(),
        ServiceConfig::default(),
    )
}

fn list_html(items: usize) -> String {
    let mut html = String::from("<ul>");
    for index in 0..items {
        html.push_str(&format!("<li>entry number {index}</li>"));
    }
    html.push_str("</ul>");
    html
}

#[tokio::test]
async fn oversized_list_chunks_and_preserves_order() {
    let fake = Arc::new(FakeWorkspace::new());
    fake.seed_page("page-1");
    let service = service_over(Arc::clone(&fake));

    let result = service
        .replace_content(
            "page-1",
            ReplaceContentParams {
                content_html: list_html(250),
                ..ReplaceContentParams::default()
            },
        )
        .await
        .expect("replace succeeds");

    assert_eq!(result.appended, 250);
    let stored = fake.children_of("page-1");
    assert_eq!(stored.len(), 250);
    // Order: assigned ids are monotonically increasing in source order.
    let texts: Vec<String> = fake
        .tree_of("page-1")
        .iter()
        .map(Block::own_text)
        .collect();
    for (index, text) in texts.iter().enumerate() {
        assert!(
            text.starts_with(&format!("entry number {index}")),
            "position {index} holds {text:?}"
        );
    }
}

#[tokio::test]
async fn markers_are_swept_from_remote_content() {
    let fake = Arc::new(FakeWorkspace::new());
    fake.seed_page("page-2");
    let service = service_over(Arc::clone(&fake));

    let result = service
        .replace_content(
            "page-2",
            ReplaceContentParams {
                content_html: "<h1>Title</h1><p>Body text.</p><ul><li>item</li></ul>".to_owned(),
                ..ReplaceContentParams::default()
            },
        )
        .await
        .expect("replace succeeds");

    for block in fake.tree_of("page-2") {
        assert!(
            !marker::contains_marker(&block.own_text()),
            "marker survived in {:?}",
            block.own_text()
        );
    }
    assert!(!result.report.has_errors, "errors: {:?}", result.report.errors);
    assert!((result.report.coverage - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn replace_purges_existing_children() {
    let fake = Arc::new(FakeWorkspace::new());
    fake.seed_page("page-3");
    for index in 0..7 {
        fake.seed_child(
            "page-3",
            serde_json::json!({
                "object": "block",
                "type": "paragraph",
                "paragraph": { "rich_text": [{
                    "type": "text", "text": { "content": format!("old {index}") }
                }]}
            }),
        );
    }
    let service = service_over(Arc::clone(&fake));

    service
        .replace_content(
            "page-3",
            ReplaceContentParams {
                content_html: "<p>fresh content</p>".to_owned(),
                ..ReplaceContentParams::default()
            },
        )
        .await
        .expect("replace succeeds");

    let texts: Vec<String> = fake.tree_of("page-3").iter().map(Block::own_text).collect();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].starts_with("fresh content"));
}

#[tokio::test]
async fn deleted_page_maps_to_not_found() {
    let fake = Arc::new(FakeWorkspace::new());
    let service = service_over(Arc::clone(&fake));

    let error = service
        .replace_content(
            "00000000-0000-0000-0000-000000000001",
            ReplaceContentParams {
                content_html: "<p>content</p>".to_owned(),
                ..ReplaceContentParams::default()
            },
        )
        .await
        .expect_err("must fail");
    assert!(matches!(error, Error::NotFound { .. }), "got {error:?}");
}

#[tokio::test]
async fn create_page_uploads_and_reports() {
    let fake = Arc::new(FakeWorkspace::new());
    let service = service_over(Arc::clone(&fake));

    let result = service
        .create_page(CreatePageParams {
            title: Some("Install Guide".to_owned()),
            database_id: "db-1".to_owned(),
            content_html: "<h1>Install</h1><p>Steps follow.</p>".to_owned(),
            ..CreatePageParams::default()
        })
        .await
        .expect("create succeeds");

    let page_id = result.page_id.expect("page id assigned");
    assert!(result.page_url.is_some());
    assert_eq!(fake.tree_of(&page_id).len(), 2);
    assert!(!result.report.has_errors, "errors: {:?}", result.report.errors);
}

#[tokio::test]
async fn dry_run_touches_nothing_remote() {
    let fake = Arc::new(FakeWorkspace::new());
    let service = service_over(Arc::clone(&fake));

    let result = service
        .create_page(CreatePageParams {
            database_id: "db-1".to_owned(),
            content_html: "<h1>Hello</h1><p>World.</p>".to_owned(),
            dry_run: true,
            ..CreatePageParams::default()
        })
        .await
        .expect("dry run succeeds");

    assert!(result.page_id.is_none());
    assert!((result.report.coverage - 1.0).abs() < f64::EPSILON);
    assert!(!result.report.has_errors);
    let blocks = result.blocks.expect("dry run returns the tree");
    assert_eq!(blocks.len(), 2);
    assert!(fake.log().is_empty(), "no workspace calls on dry run");
}

#[tokio::test]
async fn cancelled_job_unwinds_at_the_first_suspension_point() {
    use docpress_application::orchestrator::{Orchestrator, OrchestratorConfig};
    use docpress_domain::{RichText, UploadJob};

    let fake = Arc::new(FakeWorkspace::new());
    fake.seed_page("page-4");
    let orchestrator = Orchestrator::new(
        Arc::clone(&fake) as Arc<dyn docpress_domain::WorkspaceApi>,
        OrchestratorConfig::default(),
    );
    let job = UploadJob::new(
        "req-cancel".to_owned(),
        Some("page-4".to_owned()),
        Duration::from_secs(60),
    );
    job.request_cancel();
    let blocks = vec![Block::Paragraph {
        rich_text: vec![RichText::plain("never lands")],
        children: Vec::new(),
    }];
    let error = orchestrator
        .run(&job, "page-4", &blocks, true)
        .await
        .expect_err("cancelled job must unwind");
    assert!(matches!(error, Error::Cancelled { .. }), "got {error:?}");
    assert!(fake.children_of("page-4").is_empty(), "nothing uploaded");
}

#[tokio::test]
async fn expired_deadline_maps_to_timeout() {
    use docpress_application::orchestrator::{Orchestrator, OrchestratorConfig};
    use docpress_domain::{RichText, UploadJob};

    let fake = Arc::new(FakeWorkspace::new());
    fake.seed_page("page-4b");
    let orchestrator = Orchestrator::new(
        Arc::clone(&fake) as Arc<dyn docpress_domain::WorkspaceApi>,
        OrchestratorConfig::default(),
    );
    let job = UploadJob::new(
        "req-deadline".to_owned(),
        Some("page-4b".to_owned()),
        Duration::ZERO,
    );
    let blocks = vec![Block::Paragraph {
        rich_text: vec![RichText::plain("too late")],
        children: Vec::new(),
    }];
    let error = orchestrator
        .run(&job, "page-4b", &blocks, false)
        .await
        .expect_err("expired job must unwind");
    assert!(matches!(error, Error::Timeout { .. }), "got {error:?}");
}

#[tokio::test]
async fn append_blocks_validates_then_splits() {
    let fake = Arc::new(FakeWorkspace::new());
    fake.seed_page("page-5");
    let service = service_over(Arc::clone(&fake));

    let child = serde_json::json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": { "rich_text": [{ "type": "text", "text": { "content": "hi" } }] }
    });
    let children = vec![child; 150];
    let (_, count, ids) = service
        .append_blocks("page-5", children)
        .await
        .expect("append succeeds");
    assert_eq!(count, 150);
    assert_eq!(ids.len(), 150);
    assert_eq!(fake.children_of("page-5").len(), 150);

    let bad = serde_json::json!({ "object": "block", "type": "mystery", "mystery": {} });
    let error = service
        .append_blocks("page-5", vec![bad])
        .await
        .expect_err("unknown kind rejected");
    assert!(matches!(error, Error::InvalidInput { .. }));
}

#[tokio::test]
async fn terminal_jobs_reach_done_phase() {
    let fake = Arc::new(FakeWorkspace::new());
    fake.seed_page("page-6");
    let registry = Arc::new(JobRegistry::default());
    let service = PageService::new(
        Arc::clone(&fake) as Arc<dyn docpress_domain::WorkspaceApi>,
        Arc::clone(&registry),
        Validator::default(),
        ServiceConfig::default(),
    );

    let result = service
        .replace_content(
            "page-6",
            ReplaceContentParams {
                content_html: "<p>done marker</p>".to_owned(),
                ..ReplaceContentParams::default()
            },
        )
        .await
        .expect("replace succeeds");

    let progress = registry
        .progress(&result.request_id)
        .expect("job still registered");
    assert_eq!(progress.phase, JobPhase::Done);
}
