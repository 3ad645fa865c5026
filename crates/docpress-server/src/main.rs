//! docpress service binary
//!
//! Loads configuration from the environment, wires the workspace client and
//! application state, and serves the HTTP surface until a shutdown signal.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use docpress_client::{ClientConfig, WorkspaceClient};
use docpress_infrastructure::config::ConfigHandle;
use docpress_server::{AppState, run_axum_server};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = docpress_infrastructure::load_config().context("configuration")?;
    docpress_infrastructure::logging::init(&config.log_level);

    let addr: SocketAddr = config
        .server
        .listen_addr
        .parse()
        .context("parsing LISTEN_ADDR")?;

    let client = WorkspaceClient::new(ClientConfig {
        base_url: config.workspace.base_url.clone(),
        token: config.workspace.token.clone(),
        api_version: config.workspace.api_version.clone(),
        req_per_sec: config.workspace.req_per_sec,
        max_retries: config.workspace.max_retries,
        attempt_timeout: Duration::from_secs(config.workspace.attempt_timeout_secs),
        op_timeout: Duration::from_secs(config.workspace.op_timeout_secs),
    })
    .context("workspace client")?;

    info!(version = env!("CARGO_PKG_VERSION"), %addr, "docpress starting");
    let state = AppState::new(ConfigHandle::new(config), Arc::new(client));
    run_axum_server(addr, state).await.context("server")?;
    Ok(())
}
