//! # Workspace Client
//!
//! Token-aware HTTP client for the workspace API. Owns one bearer token,
//! one pooled connection set, request-level retry with jittered exponential
//! backoff, and global token-bucket pacing shared across every concurrent
//! job. All failures are mapped into the domain error taxonomy before they
//! cross this crate's boundary.

/// HTTP outcome classification
pub mod classify;
/// The client and its typed operations
pub mod client;
/// Global request pacing
pub mod limiter;
/// Retry policy and backoff
pub mod retry;

pub use client::{ClientConfig, WorkspaceClient};
pub use limiter::RequestPacer;
pub use retry::RetryPolicy;
