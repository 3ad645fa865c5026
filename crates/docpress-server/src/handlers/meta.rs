//! Liveness, status, and validator readiness

use std::sync::Arc;

use axum::extract::State;
use chrono::{DateTime, Utc};
use docpress_infrastructure::config::redact;
use serde::Serialize;
use serde_json::{Value, json};

use crate::envelope::{ApiResult, ok};
use crate::transport::axum_http::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /api/health
pub async fn health() -> ApiResult<HealthResponse> {
    Ok(ok(HealthResponse { status: "ok" }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: &'static str,
    pub started_at: DateTime<Utc>,
    pub jobs_registered: usize,
    pub env: Value,
}

/// GET /api/status
pub async fn status(State(state): State<Arc<AppState>>) -> ApiResult<StatusResponse> {
    let snapshot = state.config.snapshot();
    Ok(ok(StatusResponse {
        status: "ok",
        started_at: state.started_at,
        jobs_registered: state.registry.len(),
        env: json!({
            "LISTEN_ADDR": snapshot.server.listen_addr,
            "MAX_CONCURRENT_JOBS": snapshot.server.max_concurrent_jobs,
            "REQ_PER_SEC": snapshot.workspace.req_per_sec,
            "WORKSPACE_TOKEN": redact(&snapshot.workspace.token),
            "WORKSPACE_API_VERSION": snapshot.workspace.api_version,
            "COVERAGE_THRESHOLD": snapshot.validator.coverage_threshold,
            "MAX_MISSING_SPANS": snapshot.validator.max_missing_spans,
            "GROUP_MAX": snapshot.validator.group_max,
            "LEV_RATIO": snapshot.validator.lev_ratio,
            "TOKEN_OVERLAP": snapshot.validator.token_overlap,
            "FUZZY_THRESHOLD": snapshot.validator.fuzzy_threshold,
            "STRICT_MARKER_SWEEP": snapshot.jobs.strict_marker_sweep,
            "LOG_LEVEL": snapshot.log_level,
        }),
    }))
}

#[derive(Debug, Serialize)]
pub struct CompareHealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /api/compare/health
pub async fn compare_health() -> ApiResult<CompareHealthResponse> {
    Ok(ok(CompareHealthResponse {
        status: "ok",
        version: docpress_validate::VALIDATOR_VERSION,
    }))
}
