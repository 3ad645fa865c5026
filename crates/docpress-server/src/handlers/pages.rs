//! Page endpoints: create, replace-content, append, validate

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use docpress_application::service::{CreatePageParams, PageOperationResult, ReplaceContentParams};
use docpress_domain::Error;
use docpress_domain::report::ValidationReport;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::{ApiResult, ok};
use crate::transport::axum_http::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePageBody {
    pub title: Option<String>,
    pub database_id: String,
    pub content_html: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub report: ValidationReport,
    pub warnings: Vec<String>,
    pub stats: PageStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageStats {
    pub appended: usize,
}

impl From<PageOperationResult> for PageResponse {
    fn from(result: PageOperationResult) -> Self {
        Self {
            request_id: result.request_id,
            page_id: result.page_id,
            url: result.page_url,
            report: result.report,
            warnings: result.warnings,
            stats: PageStats {
                appended: result.appended,
            },
            blocks: result.blocks,
        }
    }
}

/// POST /api/pages
pub async fn create_page(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreatePageBody>,
) -> ApiResult<PageResponse> {
    let _permit = acquire_job_permit(&state).await?;
    let result = state
        .service()
        .create_page(CreatePageParams {
            title: body.title,
            database_id: body.database_id,
            content_html: body.content_html,
            url: body.url,
            icon: body.icon,
            cover: body.cover,
            dry_run: body.dry_run,
        })
        .await?;
    Ok(ok(result.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceContentBody {
    #[serde(default)]
    pub title: Option<String>,
    pub content_html: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

/// PATCH /api/pages/{id}
pub async fn replace_content(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ReplaceContentBody>,
) -> ApiResult<PageResponse> {
    let _permit = acquire_job_permit(&state).await?;
    let result = state
        .service()
        .replace_content(
            &id,
            ReplaceContentParams {
                title: body.title,
                content_html: body.content_html,
                url: body.url,
                dry_run: body.dry_run,
            },
        )
        .await?;
    Ok(ok(result.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendChildrenBody {
    pub children: Vec<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendChildrenResponse {
    pub request_id: String,
    pub appended: usize,
    pub block_ids: Vec<String>,
}

/// POST /api/pages/{id}:appendChildren
///
/// The router matches the whole `{id}:appendChildren` segment as the path
/// parameter; the action suffix is peeled off here.
pub async fn append_children(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
    Json(body): Json<AppendChildrenBody>,
) -> ApiResult<AppendChildrenResponse> {
    let Some(id) = raw.strip_suffix(":appendChildren") else {
        return Err(Error::invalid_input(format!("unknown page action '{raw}'")).into());
    };
    if body.children.is_empty() {
        return Err(Error::invalid_input("children must not be empty").into());
    }
    let _permit = acquire_job_permit(&state).await?;
    let (request_id, appended, block_ids) =
        state.service().append_blocks(id, body.children).await?;
    Ok(ok(AppendChildrenResponse {
        request_id,
        appended,
        block_ids,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePagesBody {
    pub page_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePagesResponse {
    pub results: Vec<docpress_application::service::PageValidationSummary>,
}

/// POST /api/validate
pub async fn validate_pages(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ValidatePagesBody>,
) -> ApiResult<ValidatePagesResponse> {
    if body.page_ids.is_empty() {
        return Err(Error::invalid_input("pageIds must not be empty").into());
    }
    let results = state.service().validate_pages(&body.page_ids).await;
    Ok(ok(ValidatePagesResponse { results }))
}

/// Bound job-creating endpoints by the worker-pool cap
async fn acquire_job_permit(
    state: &Arc<AppState>,
) -> Result<tokio::sync::OwnedSemaphorePermit, crate::envelope::ApiError> {
    Arc::clone(&state.job_permits)
        .acquire_owned()
        .await
        .map_err(|_| Error::internal("job pool closed").into())
}
