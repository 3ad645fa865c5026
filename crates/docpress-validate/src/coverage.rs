//! Coverage scoring and segment reconciliation
//!
//! The primary score is `LCS(source, notion) / max(|source|, |notion|)` over
//! normalized segments. Segments left unmatched are reconciled through
//! exact consecutive-group matching and fuzzy matching; confident fuzzy
//! matches credit the adjusted score reported alongside the raw one.

use std::collections::BTreeSet;

use crate::normalize::tokens;

/// Tuning for fuzzy reconciliation
#[derive(Debug, Clone, Copy)]
pub struct FuzzyConfig {
    /// Maximum segments per fuzzy group
    pub group_max: usize,
    /// Accepted normalized Levenshtein ratio
    pub lev_ratio: f64,
    /// Accepted Jaccard token overlap
    pub token_overlap: f64,
    /// Confidence required to credit the adjusted score
    pub fuzzy_threshold: f64,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        use docpress_domain::constants as c;
        Self {
            group_max: c::DEFAULT_GROUP_MAX,
            lev_ratio: c::DEFAULT_LEV_RATIO,
            token_overlap: c::DEFAULT_TOKEN_OVERLAP,
            fuzzy_threshold: c::DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

/// Result of comparing two segment sequences
#[derive(Debug, Clone)]
pub struct Comparison {
    /// Raw LCS coverage in [0, 1]
    pub coverage: f64,
    /// Coverage after crediting confident fuzzy matches
    pub adjusted_coverage: f64,
    /// Source segment indexes with no counterpart
    pub missing: Vec<usize>,
    /// Notion segment indexes with no counterpart
    pub extra: Vec<usize>,
    /// Whether any fuzzy match contributed
    pub fuzzy_used: bool,
    /// Count of order inversions among common segments
    pub inversions: usize,
}

/// Compare source segments against workspace segments
#[must_use]
pub fn compare(source: &[String], notion: &[String], config: &FuzzyConfig) -> Comparison {
    let denominator = source.len().max(notion.len());
    if denominator == 0 {
        return Comparison {
            coverage: 1.0,
            adjusted_coverage: 1.0,
            missing: Vec::new(),
            extra: Vec::new(),
            fuzzy_used: false,
            inversions: 0,
        };
    }
    let lcs_len = lcs_length(source, notion);
    let coverage = lcs_len as f64 / denominator as f64;

    // Set-level missing and extra.
    let notion_set: BTreeSet<&str> = notion.iter().map(String::as_str).collect();
    let source_set: BTreeSet<&str> = source.iter().map(String::as_str).collect();
    let mut missing: Vec<usize> = source
        .iter()
        .enumerate()
        .filter(|(_, s)| !notion_set.contains(s.as_str()))
        .map(|(i, _)| i)
        .collect();
    let mut extra: Vec<usize> = notion
        .iter()
        .enumerate()
        .filter(|(_, s)| !source_set.contains(s.as_str()))
        .map(|(i, _)| i)
        .collect();

    let mut credited = 0usize;
    let mut fuzzy_used = false;

    // Exact consecutive-group matching, both directions.
    credited += group_exact(source, notion, &mut missing, &mut extra, 4);
    credited += group_exact_reverse(source, notion, &mut missing, &mut extra, 4);

    // Fuzzy group matching, then relaxed single-segment fuzzy.
    let fuzzy_group = group_fuzzy(source, notion, &mut missing, &mut extra, config);
    let fuzzy_single = single_fuzzy(source, notion, &mut missing, &mut extra, config);
    if fuzzy_group + fuzzy_single > 0 {
        fuzzy_used = true;
        credited += fuzzy_group + fuzzy_single;
    }

    let adjusted_coverage = ((lcs_len + credited) as f64 / denominator as f64).min(1.0);

    Comparison {
        coverage,
        adjusted_coverage,
        missing,
        extra,
        fuzzy_used,
        inversions: count_inversions(source, notion),
    }
}

/// Length of the longest common subsequence
fn lcs_length(a: &[String], b: &[String]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];
    for left in a {
        for (j, right) in b.iter().enumerate() {
            current[j + 1] = if left == right {
                prev[j] + 1
            } else {
                prev[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut prev, &mut current);
    }
    prev[b.len()]
}

/// Match 2..=max consecutive missing source segments against one extra
/// notion segment; returns the number of matched pairs removed.
fn group_exact(
    source: &[String],
    notion: &[String],
    missing: &mut Vec<usize>,
    extra: &mut Vec<usize>,
    max_group: usize,
) -> usize {
    let mut matched = 0usize;
    let mut extra_index = 0;
    while extra_index < extra.len() {
        let target = &notion[extra[extra_index]];
        let mut consumed = false;
        'windows: for size in 2..=max_group {
            for window_start in 0..missing.len().saturating_sub(size - 1) {
                let window = &missing[window_start..window_start + size];
                if !consecutive(window) {
                    continue;
                }
                let joined = window
                    .iter()
                    .map(|&i| source[i].as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                if joined == *target {
                    missing.drain(window_start..window_start + size);
                    extra.remove(extra_index);
                    matched += 1;
                    consumed = true;
                    break 'windows;
                }
            }
        }
        if !consumed {
            extra_index += 1;
        }
    }
    matched
}

/// Mirror of [`group_exact`]: consecutive extra notion segments equal one
/// missing source segment.
fn group_exact_reverse(
    source: &[String],
    notion: &[String],
    missing: &mut Vec<usize>,
    extra: &mut Vec<usize>,
    max_group: usize,
) -> usize {
    let mut matched = 0usize;
    let mut missing_index = 0;
    while missing_index < missing.len() {
        let target = &source[missing[missing_index]];
        let mut consumed = false;
        'windows: for size in 2..=max_group {
            for window_start in 0..extra.len().saturating_sub(size - 1) {
                let window = &extra[window_start..window_start + size];
                if !consecutive(window) {
                    continue;
                }
                let joined = window
                    .iter()
                    .map(|&i| notion[i].as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                if joined == *target {
                    extra.drain(window_start..window_start + size);
                    missing.remove(missing_index);
                    matched += 1;
                    consumed = true;
                    break 'windows;
                }
            }
        }
        if !consumed {
            missing_index += 1;
        }
    }
    matched
}

fn consecutive(indexes: &[usize]) -> bool {
    indexes.windows(2).all(|w| w[1] == w[0] + 1)
}

/// Similarity of two normalized segments: the greater of the Levenshtein
/// ratio and the Jaccard token overlap, or `None` when neither threshold is
/// met.
fn similarity(a: &str, b: &str, config: &FuzzyConfig) -> Option<f64> {
    let lev = strsim::normalized_levenshtein(a, b);
    let a_tokens: BTreeSet<&str> = tokens(a).into_iter().collect();
    let b_tokens: BTreeSet<&str> = tokens(b).into_iter().collect();
    let union = a_tokens.union(&b_tokens).count();
    let jaccard = if union == 0 {
        0.0
    } else {
        a_tokens.intersection(&b_tokens).count() as f64 / union as f64
    };
    if lev >= config.lev_ratio || jaccard >= config.token_overlap {
        Some(lev.max(jaccard))
    } else {
        None
    }
}

fn length_ratio_ok(a: &str, b: &str, low: f64, high: f64) -> bool {
    if b.is_empty() {
        return a.is_empty();
    }
    let ratio = a.chars().count() as f64 / b.chars().count() as f64;
    (low..=high).contains(&ratio)
}

/// Fuzzy group matching: consecutive missing groups against one extra, and
/// the reverse, under the strict length guard.
fn group_fuzzy(
    source: &[String],
    notion: &[String],
    missing: &mut Vec<usize>,
    extra: &mut Vec<usize>,
    config: &FuzzyConfig,
) -> usize {
    let mut credited = 0usize;
    let mut extra_index = 0;
    while extra_index < extra.len() {
        let target = &notion[extra[extra_index]];
        let mut consumed = false;
        'windows: for size in 2..=config.group_max {
            for window_start in 0..missing.len().saturating_sub(size - 1) {
                let window = &missing[window_start..window_start + size];
                if !consecutive(window) {
                    continue;
                }
                let joined = window
                    .iter()
                    .map(|&i| source[i].as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                if !length_ratio_ok(&joined, target, 0.75, 1.25) {
                    continue;
                }
                if let Some(score) = similarity(&joined, target, config) {
                    missing.drain(window_start..window_start + size);
                    extra.remove(extra_index);
                    if score >= config.fuzzy_threshold {
                        credited += 1;
                    }
                    consumed = true;
                    break 'windows;
                }
            }
        }
        if !consumed {
            extra_index += 1;
        }
    }
    credited
}

/// Relaxed single-segment fuzzy matching
fn single_fuzzy(
    source: &[String],
    notion: &[String],
    missing: &mut Vec<usize>,
    extra: &mut Vec<usize>,
    config: &FuzzyConfig,
) -> usize {
    let mut credited = 0usize;
    let mut missing_index = 0;
    while missing_index < missing.len() {
        let source_segment = &source[missing[missing_index]];
        let mut matched: Option<(usize, f64)> = None;
        for (slot, &extra_pos) in extra.iter().enumerate() {
            let candidate = &notion[extra_pos];
            if !length_ratio_ok(source_segment, candidate, 0.6, 1.4) {
                continue;
            }
            if let Some(score) = similarity(source_segment, candidate, config) {
                if matched.is_none_or(|(_, best)| score > best) {
                    matched = Some((slot, score));
                }
            }
        }
        if let Some((slot, score)) = matched {
            extra.remove(slot);
            missing.remove(missing_index);
            if score >= config.fuzzy_threshold {
                credited += 1;
            }
        } else {
            missing_index += 1;
        }
    }
    credited
}

/// Count adjacent order inversions among segments common to both sides
fn count_inversions(source: &[String], notion: &[String]) -> usize {
    // Map each notion segment to the first unused matching source position.
    let mut used = vec![false; source.len()];
    let mut positions = Vec::new();
    for segment in notion {
        if let Some(pos) = source
            .iter()
            .enumerate()
            .position(|(i, s)| !used[i] && s == segment)
        {
            used[pos] = true;
            positions.push(pos);
        }
    }
    positions.windows(2).filter(|w| w[1] < w[0]).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn identical_sides_are_full_coverage() {
        let side = seg(&["a", "b", "c"]);
        let result = compare(&side, &side, &FuzzyConfig::default());
        assert!((result.coverage - 1.0).abs() < f64::EPSILON);
        assert!(result.missing.is_empty());
        assert!(result.extra.is_empty());
        assert_eq!(result.inversions, 0);
    }

    #[test]
    fn empty_sides_are_full_coverage() {
        let result = compare(&[], &[], &FuzzyConfig::default());
        assert!((result.coverage - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn dropped_segment_lowers_coverage() {
        let source = seg(&["a", "b", "c", "d"]);
        let notion = seg(&["a", "b", "d"]);
        let result = compare(&source, &notion, &FuzzyConfig::default());
        assert!((result.coverage - 0.75).abs() < 1e-9);
        assert_eq!(result.missing.len(), 1);
    }

    #[test]
    fn split_segments_reconcile_exactly() {
        // One source segment arrived split into two notion segments.
        let source = seg(&["alpha beta gamma"]);
        let notion = seg(&["alpha beta", "gamma"]);
        let result = compare(&source, &notion, &FuzzyConfig::default());
        assert!(result.missing.is_empty(), "missing: {:?}", result.missing);
        assert!(result.extra.is_empty());
        assert!(result.adjusted_coverage > result.coverage);
    }

    #[test]
    fn merged_segments_reconcile_exactly() {
        let source = seg(&["alpha beta", "gamma"]);
        let notion = seg(&["alpha beta gamma"]);
        let result = compare(&source, &notion, &FuzzyConfig::default());
        assert!(result.missing.is_empty());
        assert!(result.extra.is_empty());
    }

    #[test]
    fn near_identical_segments_fuzzy_match() {
        let source = seg(&["the quick brown fox jumps over the lazy dog"]);
        let notion = seg(&["the quick brown fox jumps over the lazy dot"]);
        let result = compare(&source, &notion, &FuzzyConfig::default());
        assert!(result.fuzzy_used);
        assert!(result.missing.is_empty());
        assert!(result.adjusted_coverage > 0.9);
    }

    #[test]
    fn unrelated_segments_do_not_match() {
        let source = seg(&["completely different text here"]);
        let notion = seg(&["nothing alike whatsoever today"]);
        let result = compare(&source, &notion, &FuzzyConfig::default());
        assert_eq!(result.missing.len(), 1);
        assert_eq!(result.extra.len(), 1);
    }

    #[test]
    fn inversions_are_counted() {
        let source = seg(&["a", "b", "c"]);
        let notion = seg(&["a", "c", "b"]);
        let result = compare(&source, &notion, &FuzzyConfig::default());
        assert_eq!(result.inversions, 1);
    }
}
