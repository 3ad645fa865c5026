//! # Infrastructure Layer
//!
//! Cross-cutting technical concerns: environment-driven configuration with
//! an atomically reloadable snapshot, and the tracing bootstrap.

/// Configuration loading, validation, and snapshots
pub mod config;
/// Logging bootstrap
pub mod logging;

pub use config::{AppConfig, ConfigHandle, load as load_config, redact};
