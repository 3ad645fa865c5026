//! Axum transport
//!
//! Builds the router over the shared application state and runs the
//! listener with graceful shutdown. Handlers live in [`crate::handlers`];
//! this module only wires them together.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use chrono::{DateTime, Utc};
use docpress_application::orchestrator::OrchestratorConfig;
use docpress_application::registry::JobRegistry;
use docpress_application::service::{PageService, ServiceConfig};
use docpress_application::chunk::ChunkLimits;
use docpress_domain::{PassthroughUploader, Result, WorkspaceApi};
use docpress_infrastructure::config::{AppConfig, ConfigHandle};
use docpress_validate::{FuzzyConfig, Validator, ValidatorConfig};
use tokio::sync::Semaphore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;

/// Shared state behind every handler
pub struct AppState {
    /// Reloadable configuration snapshot
    pub config: Arc<ConfigHandle>,
    /// Shared workspace client
    pub api: Arc<dyn WorkspaceApi>,
    /// Process-wide job registry
    pub registry: Arc<JobRegistry>,
    /// Worker-pool cap for job-creating requests
    pub job_permits: Arc<Semaphore>,
    /// Process start time, for the status endpoint
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Assemble state from resolved configuration and a client
    #[must_use]
    pub fn new(config: ConfigHandle, api: Arc<dyn WorkspaceApi>) -> Arc<Self> {
        let snapshot = config.snapshot();
        Arc::new(Self {
            config: Arc::new(config),
            api,
            registry: Arc::new(JobRegistry::new(std::time::Duration::from_secs(
                snapshot.jobs.ttl_secs,
            ))),
            job_permits: Arc::new(Semaphore::new(snapshot.server.max_concurrent_jobs)),
            started_at: Utc::now(),
        })
    }

    /// Build a page service from the current configuration snapshot
    ///
    /// Constructed per request so validator and job settings picked up by a
    /// config reload apply immediately; the workspace client itself is
    /// pinned until restart.
    #[must_use]
    pub fn service(&self) -> PageService {
        let snapshot = self.config.snapshot();
        PageService::new(
            Arc::clone(&self.api),
            Arc::clone(&self.registry),
            Validator::new(validator_config(&snapshot)),
            ServiceConfig {
                max_source_bytes: snapshot.jobs.max_source_bytes,
                orchestrator: OrchestratorConfig {
                    strict_marker_sweep: snapshot.jobs.strict_marker_sweep,
                    limits: ChunkLimits {
                        table_row_batch: snapshot.jobs.table_row_batch,
                        ..ChunkLimits::default()
                    },
                    ..OrchestratorConfig::default()
                },
                uploader: Arc::new(PassthroughUploader),
            },
        )
    }
}

fn validator_config(snapshot: &AppConfig) -> ValidatorConfig {
    ValidatorConfig {
        coverage_threshold: snapshot.validator.coverage_threshold,
        max_missing_spans: snapshot.validator.max_missing_spans,
        fuzzy: FuzzyConfig {
            group_max: snapshot.validator.group_max,
            lev_ratio: snapshot.validator.lev_ratio,
            token_overlap: snapshot.validator.token_overlap,
            fuzzy_threshold: snapshot.validator.fuzzy_threshold,
        },
        ..ValidatorConfig::default()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

/// Assemble the full route table
#[must_use]
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/pages", post(handlers::pages::create_page))
        .route(
            // POST carries the `{id}:appendChildren` action; the handler
            // peels the action suffix off the path parameter.
            "/api/pages/{id}",
            patch(handlers::pages::replace_content).post(handlers::pages::append_children),
        )
        .route("/api/validate", post(handlers::pages::validate_pages))
        .route(
            "/api/compare/notion-page",
            post(handlers::compare::compare_page),
        )
        .route(
            "/api/compare/notion-db-row",
            post(handlers::compare::compare_db_row),
        )
        .route("/api/compare/health", get(handlers::meta::compare_health))
        .route("/api/databases/{id}", get(handlers::databases::schema))
        .route(
            "/api/databases/{id}/query",
            post(handlers::databases::query),
        )
        .route(
            // POST carries the `{id}:cancel` action.
            "/api/jobs/{id}",
            get(handlers::jobs::progress).post(handlers::jobs::cancel),
        )
        .route(
            "/api/admin/config/reload",
            post(handlers::admin::reload_config),
        )
        .route("/api/health", get(handlers::meta::health))
        .route("/api/status", get(handlers::meta::status))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until shutdown
///
/// # Errors
///
/// Returns an error when the listener cannot bind.
pub async fn run_axum_server(addr: SocketAddr, state: Arc<AppState>) -> Result<()> {
    let router = build_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(docpress_domain::Error::from)?;
    info!(%addr, "listening");
    let _sweeper = state
        .registry
        .spawn_sweeper(std::time::Duration::from_secs(60));
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(docpress_domain::Error::from)?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
