//! # Block-Tree Builder
//!
//! Pure transformation from captured HTML to a tree of workspace blocks.
//! The pipeline runs in five phases:
//!
//! 1. locate the content root and drop page chrome ([`root`])
//! 2. sanitize: skip scripts, styles, hidden frames, collapse whitespace
//!    ([`sanitize`])
//! 3. mark: append a correlation marker run to every element that becomes
//!    its own block
//! 4. walk and emit: depth-first element-to-block mapping ([`builder`])
//! 5. normalize the tree: depth, arity, and adjacency rules ([`tree`])
//!
//! The builder is stateless across calls and never touches the network; the
//! only collaborator is the [`ImageUploader`] port for oversized inline
//! images.

use std::sync::Arc;

use docpress_domain::report::ElementCounts;
use docpress_domain::{Block, ImageUploader, PassthroughUploader, Result};

/// Element-to-block walker
pub mod builder;
/// Code-language inference
pub mod code;
/// Image source policy
pub mod images;
/// Inline rich-text extraction
pub mod rich;
/// Content-root location and chrome stripping
pub mod root;
/// Node-level sanitation rules
pub mod sanitize;
/// Tree normalization passes
pub mod tree;

/// Options controlling one build
#[derive(Clone)]
pub struct BuildOptions {
    /// Insert correlation markers (disabled for dry runs and compares)
    pub insert_markers: bool,
    /// Image re-hosting collaborator
    pub uploader: Arc<dyn ImageUploader>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            insert_markers: true,
            uploader: Arc::new(PassthroughUploader),
        }
    }
}

impl std::fmt::Debug for BuildOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildOptions")
            .field("insert_markers", &self.insert_markers)
            .finish_non_exhaustive()
    }
}

/// Counters accumulated while emitting blocks
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildStats {
    /// Total blocks in the emitted tree
    pub blocks: usize,
    /// Element counts for the validator
    pub counts: ElementCounts,
    /// Markers inserted
    pub markers: usize,
}

/// Result of one build
#[derive(Debug, Default)]
pub struct BuildOutcome {
    /// Top-level blocks in source order
    pub blocks: Vec<Block>,
    /// Non-fatal findings surfaced to the validation report
    pub warnings: Vec<String>,
    /// Counters for deadline selection and validation
    pub stats: BuildStats,
}

/// Convert captured HTML into a workspace block tree
///
/// # Errors
///
/// Returns [`docpress_domain::Error::InvalidInput`] when the document has no
/// usable content root.
pub fn convert(html: &str, options: &BuildOptions) -> Result<BuildOutcome> {
    builder::build(html, options)
}
