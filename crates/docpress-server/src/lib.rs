//! # Request Coordinator
//!
//! HTTP surface of docpress: routes inbound operations to the builder,
//! orchestrator, and validator, enforces per-request bounds, and serializes
//! every outcome into the `{success, data, error}` envelope. Handlers never
//! panic on expected error kinds; every request produces exactly one
//! response.
#![allow(missing_docs)]

/// Response envelope and error mapping
pub mod envelope;
/// Request handlers
pub mod handlers;
/// HTTP transport
pub mod transport;

pub use transport::axum_http::{AppState, build_router, run_axum_server};
