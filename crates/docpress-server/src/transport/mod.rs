//! Transport layer

/// Axum HTTP transport
pub mod axum_http;
