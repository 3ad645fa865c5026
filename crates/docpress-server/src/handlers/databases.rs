//! Database endpoints: schema snapshot and query proxy

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::{ApiResult, ok};
use crate::transport::axum_http::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaResponse {
    pub properties: Value,
}

/// GET /api/databases/{id}
pub async fn schema(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<SchemaResponse> {
    let properties = state.service().database_schema(&id).await?;
    Ok(ok(SchemaResponse { properties }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QueryBody {
    #[serde(default)]
    pub filter: Option<Value>,
    #[serde(default)]
    pub sorts: Option<Value>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub results: Vec<Value>,
}

/// POST /api/databases/{id}/query
pub async fn query(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<QueryBody>,
) -> ApiResult<QueryResponse> {
    let results = state
        .service()
        .query_database(&id, body.filter, body.sorts, body.page_size)
        .await?;
    Ok(ok(QueryResponse { results }))
}
