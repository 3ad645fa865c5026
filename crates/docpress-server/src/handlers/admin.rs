//! Admin endpoints

use std::sync::Arc;

use axum::extract::State;
use serde::Serialize;

use crate::envelope::{ApiResult, ok};
use crate::transport::axum_http::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadResponse {
    pub reloaded: bool,
    pub log_level: String,
}

/// POST /api/admin/config/reload
///
/// Re-reads the environment into a fresh snapshot. Validator and job
/// settings apply to subsequent requests immediately; workspace client
/// settings need a restart.
pub async fn reload_config(State(state): State<Arc<AppState>>) -> ApiResult<ReloadResponse> {
    let fresh = state.config.reload()?;
    Ok(ok(ReloadResponse {
        reloaded: true,
        log_level: fresh.log_level.clone(),
    }))
}
