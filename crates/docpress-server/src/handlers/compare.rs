//! Compare endpoints: text coverage against existing pages

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use docpress_domain::Error;
use docpress_domain::report::{CoverageMethod, MissingSpan, ValidationReport};
use serde::{Deserialize, Serialize};

use crate::envelope::{ApiResult, ok};
use crate::transport::axum_http::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparePageBody {
    pub page_id: String,
    pub src_text: String,
    #[serde(default)]
    pub options: CompareOptions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareOptions {
    #[serde(default)]
    pub min_missing_span_tokens: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareResponse {
    pub coverage: f64,
    pub adjusted_coverage: f64,
    pub missing_spans: Vec<MissingSpan>,
    pub method: CoverageMethod,
    pub inversions: usize,
    pub has_errors: bool,
}

impl From<ValidationReport> for CompareResponse {
    fn from(report: ValidationReport) -> Self {
        Self {
            coverage: report.coverage,
            adjusted_coverage: report.adjusted_coverage,
            missing_spans: report.missing_spans,
            method: report.method,
            inversions: report.inversions,
            has_errors: report.has_errors,
        }
    }
}

/// POST /api/compare/notion-page
pub async fn compare_page(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ComparePageBody>,
) -> ApiResult<CompareResponse> {
    if body.src_text.trim().is_empty() {
        return Err(Error::invalid_input("srcText must not be empty").into());
    }
    let report = state
        .service()
        .compare_page(
            &body.page_id,
            &body.src_text,
            body.options.min_missing_span_tokens,
        )
        .await?;
    Ok(ok(report.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareDbRowBody {
    pub page_id: String,
    pub src_text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareDbRowResponse {
    pub updated: bool,
    pub coverage: f64,
    pub adjusted_coverage: f64,
}

/// POST /api/compare/notion-db-row
pub async fn compare_db_row(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CompareDbRowBody>,
) -> ApiResult<CompareDbRowResponse> {
    if body.src_text.trim().is_empty() {
        return Err(Error::invalid_input("srcText must not be empty").into());
    }
    let (report, updated) = state
        .service()
        .compare_and_record(&body.page_id, &body.src_text)
        .await?;
    Ok(ok(CompareDbRowResponse {
        updated,
        coverage: report.coverage,
        adjusted_coverage: report.adjusted_coverage,
    }))
}
