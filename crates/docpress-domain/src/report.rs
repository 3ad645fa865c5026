//! Validation report types
//!
//! Derived per request by the validator and serialized into responses. A
//! report never causes an HTTP error by itself; `has_errors` travels inside
//! the payload.

use serde::Serialize;

/// Element-category occurrence counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ElementCounts {
    /// Tables
    pub tables: usize,
    /// Images
    pub images: usize,
    /// Lists (logical lists, not items)
    pub lists: usize,
    /// Callouts
    pub callouts: usize,
    /// Code blocks
    pub code_blocks: usize,
    /// Headings
    pub headings: usize,
}

/// How a coverage score was established
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageMethod {
    /// Pure LCS over normalized segments
    Exact,
    /// Fuzzy reconciliation contributed to the adjusted score
    Fuzzy,
}

/// A normalized source segment with no counterpart in the workspace
#[derive(Debug, Clone, Serialize)]
pub struct MissingSpan {
    /// Normalized segment text
    pub text: String,
    /// Ordinal position among the source segments
    pub index: usize,
}

/// Outcome of validating a block tree (or remote page) against its source
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// Element counts observed in the source HTML
    pub source_counts: ElementCounts,
    /// Element counts observed in the block tree
    pub notion_counts: ElementCounts,
    /// Whether any error-level finding exists
    pub has_errors: bool,
    /// Error-level findings
    pub errors: Vec<String>,
    /// Warning-level findings
    pub warnings: Vec<String>,
    /// Raw LCS coverage in [0, 1]; authoritative for `has_errors`
    pub coverage: f64,
    /// Coverage after crediting confident fuzzy matches, in [0, 1]
    pub adjusted_coverage: f64,
    /// Source segments still missing after reconciliation
    pub missing_spans: Vec<MissingSpan>,
    /// Common segments appearing in different relative order
    pub inversions: usize,
    /// How the reported coverage was established
    pub method: CoverageMethod,
}

impl ValidationReport {
    /// An empty passing report (used by dry runs on empty documents)
    #[must_use]
    pub fn passing() -> Self {
        Self {
            source_counts: ElementCounts::default(),
            notion_counts: ElementCounts::default(),
            has_errors: false,
            errors: Vec::new(),
            warnings: Vec::new(),
            coverage: 1.0,
            adjusted_coverage: 1.0,
            missing_spans: Vec::new(),
            inversions: 0,
            method: CoverageMethod::Exact,
        }
    }

    /// Append a warning
    pub fn warn<S: Into<String>>(&mut self, message: S) {
        self.warnings.push(message.into());
    }

    /// Append an error and flip `has_errors`
    pub fn error<S: Into<String>>(&mut self, message: S) {
        self.errors.push(message.into());
        self.has_errors = true;
    }
}
