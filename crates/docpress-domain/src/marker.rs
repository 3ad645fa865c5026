//! Source-correlation markers
//!
//! A marker is an opaque `(src:<token>)` string appended as the final run of
//! every element that becomes its own block. Markers let the post-upload
//! sweep correlate remote blocks back to source elements; they must never
//! survive into final workspace content.

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

/// Matches any marker token embedded in text
pub static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(src:[a-zA-Z0-9_-]{8,}\)").expect("marker regex is valid")
});

/// Mint a fresh marker token
#[must_use]
pub fn mint() -> String {
    format!("(src:{})", Uuid::new_v4().simple())
}

/// Whether the text contains at least one marker
#[must_use]
pub fn contains_marker(text: &str) -> bool {
    MARKER_RE.is_match(text)
}

/// Remove every marker from the text
///
/// Trailing whitespace left behind by a stripped marker is trimmed so swept
/// runs read naturally.
#[must_use]
pub fn strip(text: &str) -> String {
    let stripped = MARKER_RE.replace_all(text, "");
    stripped.trim_end().to_owned()
}

/// Count markers present in the text
#[must_use]
pub fn count(text: &str) -> usize {
    MARKER_RE.find_iter(text).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_markers_match_the_pattern() {
        let token = mint();
        assert!(contains_marker(&token));
        assert!(token.starts_with("(src:"));
        assert!(token.ends_with(')'));
    }

    #[test]
    fn strip_removes_all_markers() {
        let text = format!("hello {} world {}", mint(), mint());
        let stripped = strip(&text);
        assert!(!contains_marker(&stripped));
        assert!(stripped.starts_with("hello"));
    }

    #[test]
    fn short_tokens_are_not_markers() {
        assert!(!contains_marker("(src:ab)"));
        assert!(!contains_marker("(source:whatever)"));
    }

    #[test]
    fn count_finds_every_occurrence() {
        let text = format!("{}a{}b{}", mint(), mint(), mint());
        assert_eq!(count(&text), 3);
    }
}
