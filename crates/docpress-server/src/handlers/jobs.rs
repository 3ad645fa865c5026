//! Job endpoints: progress and cancellation

use std::sync::Arc;

use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use docpress_domain::{Error, JobPhase};
use serde::Serialize;

use crate::envelope::{ApiResult, ok};
use crate::transport::axum_http::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressResponse {
    pub request_id: String,
    pub phase: JobPhase,
    pub completed_units: usize,
    pub total_units: usize,
    pub last_activity_at: DateTime<Utc>,
    pub cancelled: bool,
}

/// GET /api/jobs/{id}
pub async fn progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<JobProgressResponse> {
    let job = state
        .registry
        .get(&id)
        .ok_or_else(|| Error::not_found(format!("job {id}")))?;
    let snapshot = job.progress();
    Ok(ok(JobProgressResponse {
        request_id: id,
        phase: snapshot.phase,
        completed_units: snapshot.completed_units,
        total_units: snapshot.total_units,
        last_activity_at: snapshot.last_activity_at,
        cancelled: job.is_cancelled(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub request_id: String,
    pub cancelled: bool,
}

/// POST /api/jobs/{id}:cancel
///
/// The router matches the whole `{id}:cancel` segment as the path
/// parameter; the action suffix is peeled off here.
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> ApiResult<CancelResponse> {
    let Some(id) = raw.strip_suffix(":cancel") else {
        return Err(Error::invalid_input(format!("unknown job action '{raw}'")).into());
    };
    if !state.registry.cancel(id) {
        return Err(Error::not_found(format!("job {id}")).into());
    }
    Ok(ok(CancelResponse {
        request_id: id.to_owned(),
        cancelled: true,
    }))
}
