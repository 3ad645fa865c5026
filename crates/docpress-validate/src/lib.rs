//! # Validator
//!
//! Pure analysis of content fidelity: given source HTML and a block tree
//! (local, pre-upload) or remote blocks (post-upload), computes element-count
//! comparisons and a text-coverage score, and assembles the
//! [`ValidationReport`] surfaced in every response.

use docpress_domain::constants as c;
use docpress_domain::report::{CoverageMethod, MissingSpan, ValidationReport};
use docpress_domain::Block;
use tracing::debug;

/// Coverage scoring and reconciliation
pub mod coverage;
/// Element counting and tolerances
pub mod counts;
/// Text normalization
pub mod normalize;
/// Segment extraction
pub mod segments;

pub use coverage::FuzzyConfig;
pub use counts::CountTolerances;

/// Validator version reported by the readiness endpoint
pub const VALIDATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Validator configuration
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Coverage below this is an error
    pub coverage_threshold: f64,
    /// Missing segments above this are an error
    pub max_missing_spans: usize,
    /// Inversions above this raise a loud warning
    pub inversion_warn: usize,
    /// Fuzzy-matching tuning
    pub fuzzy: FuzzyConfig,
    /// Element-count tolerances
    pub tolerances: CountTolerances,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            coverage_threshold: c::DEFAULT_COVERAGE_THRESHOLD,
            max_missing_spans: c::DEFAULT_MAX_MISSING_SPANS,
            inversion_warn: c::DEFAULT_INVERSION_WARN,
            fuzzy: FuzzyConfig::default(),
            tolerances: CountTolerances::default(),
        }
    }
}

/// Content-fidelity validator
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    /// Create a validator with the given configuration
    #[must_use]
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Validate a local block tree against its source HTML
    ///
    /// `extra_warnings` carries builder findings (flattening, dedup, image
    /// degradations) into the report.
    #[must_use]
    pub fn validate_blocks(
        &self,
        source_html: &str,
        blocks: &[Block],
        extra_warnings: &[String],
    ) -> ValidationReport {
        let source_segments = segments::from_html(source_html);
        let notion_segments = segments::from_blocks(blocks);
        let source_counts = counts::count_html(source_html);
        let notion_counts = counts::count_blocks(blocks);
        self.assemble(
            &source_segments,
            &notion_segments,
            source_counts,
            notion_counts,
            extra_warnings,
        )
    }

    /// Validate remote blocks (already fetched) against source HTML
    #[must_use]
    pub fn validate_remote(
        &self,
        source_html: &str,
        remote_blocks: &[Block],
        extra_warnings: &[String],
    ) -> ValidationReport {
        self.validate_blocks(source_html, remote_blocks, extra_warnings)
    }

    /// Compare pre-extracted plain text against block segments
    ///
    /// Used by the compare endpoints where the caller supplies raw source
    /// text rather than HTML: each non-empty line is one segment.
    #[must_use]
    pub fn compare_text(&self, source_text: &str, blocks: &[Block]) -> ValidationReport {
        let source_segments: Vec<String> = source_text
            .lines()
            .map(normalize::normalize)
            .filter(|s| !s.is_empty())
            .collect();
        let notion_segments = segments::from_blocks(blocks);
        self.assemble(
            &source_segments,
            &notion_segments,
            counts::count_blocks(blocks),
            counts::count_blocks(blocks),
            &[],
        )
    }

    fn assemble(
        &self,
        source_segments: &[String],
        notion_segments: &[String],
        source_counts: docpress_domain::report::ElementCounts,
        notion_counts: docpress_domain::report::ElementCounts,
        extra_warnings: &[String],
    ) -> ValidationReport {
        let comparison = coverage::compare(source_segments, notion_segments, &self.config.fuzzy);
        debug!(
            coverage = comparison.coverage,
            adjusted = comparison.adjusted_coverage,
            missing = comparison.missing.len(),
            extra = comparison.extra.len(),
            "segments compared"
        );

        let mut report = ValidationReport {
            source_counts,
            notion_counts,
            has_errors: false,
            errors: Vec::new(),
            warnings: extra_warnings.to_vec(),
            coverage: comparison.coverage,
            adjusted_coverage: comparison.adjusted_coverage,
            missing_spans: comparison
                .missing
                .iter()
                .map(|&index| MissingSpan {
                    text: source_segments[index].clone(),
                    index,
                })
                .collect(),
            inversions: comparison.inversions,
            method: if comparison.fuzzy_used {
                CoverageMethod::Fuzzy
            } else {
                CoverageMethod::Exact
            },
        };

        for error in counts::check(&source_counts, &notion_counts, &self.config.tolerances) {
            report.error(error);
        }
        if report.coverage < self.config.coverage_threshold {
            report.error(format!(
                "text coverage {:.4} below threshold {:.4}",
                report.coverage, self.config.coverage_threshold
            ));
        }
        if report.missing_spans.len() > self.config.max_missing_spans {
            report.error(format!(
                "{} source segments missing (allowed {})",
                report.missing_spans.len(),
                self.config.max_missing_spans
            ));
        }
        if report.inversions > 0 {
            let message = format!("{} segment order inversions", report.inversions);
            if report.inversions > self.config.inversion_warn {
                report.warn(format!("{message} (above warn threshold)"));
            } else {
                report.warn(message);
            }
        }
        report
    }
}
