//! # Application Layer
//!
//! Stateful orchestration above the pure builder and validator: the chunk
//! planner, the upload orchestrator's phase machine, the process-wide job
//! registry, and the page services the HTTP surface delegates to.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`chunk`] | Submission planning under workspace size limits |
//! | [`orchestrator`] | Purge, upload, sweep phase machine |
//! | [`registry`] | Request-id keyed job table with TTL eviction |
//! | [`service`] | Create/replace/append/validate/compare flows |
//! | [`testing`] | In-memory workspace for tests |

/// Chunk planning
pub mod chunk;
/// Upload orchestration
pub mod orchestrator;
/// Job registry
pub mod registry;
/// Page-level services
pub mod service;
/// Test support
pub mod testing;

pub use chunk::{ChunkLimits, UploadPlan};
pub use orchestrator::{Orchestrator, OrchestratorConfig, UploadOutcome};
pub use registry::JobRegistry;
pub use service::{
    CreatePageParams, PageOperationResult, PageService, PageValidationSummary,
    ReplaceContentParams, ServiceConfig,
};
