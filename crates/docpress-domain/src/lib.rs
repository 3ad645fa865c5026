//! # Domain Layer
//!
//! Core types for docpress: the workspace block model, rich text, source
//! documents, upload jobs, validation reports, the error taxonomy, and the
//! port traits behind which external collaborators live.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`block`] | Tagged block sum with wire conversion |
//! | [`rich_text`] | Rich-text runs and annotations |
//! | [`marker`] | Source-correlation marker tokens |
//! | [`page`] | Source documents and page-id metadata |
//! | [`job`] | Upload jobs, phases, and progress |
//! | [`report`] | Validation report types |
//! | [`ports`] | Workspace API and image-uploader ports |
//! | [`constants`] | Workspace limits and defaults |
//! | [`error`] | Error taxonomy |
//!
//! The layer has no HTTP, HTML, or runtime concerns beyond the tokio
//! primitives jobs are built from; everything here is shared by every other
//! crate.

/// Workspace block model
pub mod block;
/// Domain-level constants
pub mod constants;
/// Domain error types
pub mod error;
/// Upload jobs and progress
pub mod job;
/// Source-correlation markers
pub mod marker;
/// Source documents and page metadata
pub mod page;
/// External collaborator ports
pub mod ports;
/// Validation report types
pub mod report;
/// Rich-text runs and annotations
pub mod rich_text;

pub use block::{Block, BlockKind, CalloutStyle, RemoteBlock};
pub use error::{Error, ErrorKind, Result};
pub use job::{JobPhase, JobProgress, UploadJob, deadline_for};
pub use page::{SourceDocument, extract_page_id, normalize_page_id};
pub use ports::{
    BlockPage, CreatePageRequest, CreatedPage, ImageSource, ImageUploader, PassthroughUploader,
    QueryPage, WorkspaceApi,
};
pub use report::{CoverageMethod, ElementCounts, MissingSpan, ValidationReport};
pub use rich_text::{Annotations, RichText, plain_text};
