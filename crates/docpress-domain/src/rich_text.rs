//! Rich-text runs and annotations
//!
//! A block's textual payload is an ordered list of [`RichText`] runs. Each
//! run carries independent annotation bits and an optional absolute href.
//! Runs are capped at [`MAX_TEXT_RUN_LEN`] code points; longer text is split
//! on a grapheme boundary when one is available.

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::constants::MAX_TEXT_RUN_LEN;

/// Annotation bits for one rich-text run
///
/// Bits are independent; absent fields deserialize to `false`. Unknown
/// annotations on the wire are ignored rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    /// Bold
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
    /// Italic
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub italic: bool,
    /// Strikethrough
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub strikethrough: bool,
    /// Underline
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub underline: bool,
    /// Inline code
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub code: bool,
    /// Color tag from the workspace palette, "default" when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Annotations {
    /// True when no annotation bit is set and the color is default
    #[must_use]
    pub fn is_plain(&self) -> bool {
        !self.bold
            && !self.italic
            && !self.strikethrough
            && !self.underline
            && !self.code
            && self.color.is_none()
    }
}

/// One rich-text run: a text fragment with formatting and an optional link
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichText {
    /// Text fragment, at most [`MAX_TEXT_RUN_LEN`] code points
    pub text: String,
    /// Formatting applied to the whole fragment
    #[serde(default)]
    pub annotations: Annotations,
    /// Absolute URL this fragment links to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl RichText {
    /// Create a plain run with no annotations
    pub fn plain<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Create a run with the given annotations
    pub fn styled<S: Into<String>>(text: S, annotations: Annotations) -> Self {
        Self {
            text: text.into(),
            annotations,
            href: None,
        }
    }

    /// Create a linked run
    pub fn linked<S: Into<String>, U: Into<String>>(text: S, href: U) -> Self {
        Self {
            text: text.into(),
            annotations: Annotations::default(),
            href: Some(href.into()),
        }
    }

    /// Number of Unicode code points in the fragment
    #[must_use]
    pub fn len_code_points(&self) -> usize {
        self.text.chars().count()
    }

    /// Split this run into workspace-acceptable pieces
    ///
    /// Splits at [`MAX_TEXT_RUN_LEN`] code points, preferring the last
    /// grapheme boundary at or below the limit so combined characters are
    /// never torn apart. Annotations and href are carried onto every piece.
    #[must_use]
    pub fn split_to_limit(self) -> Vec<RichText> {
        if self.len_code_points() <= MAX_TEXT_RUN_LEN {
            return vec![self];
        }
        let mut out = Vec::new();
        let mut rest = self.text.as_str();
        while rest.chars().count() > MAX_TEXT_RUN_LEN {
            let cut = split_point(rest, MAX_TEXT_RUN_LEN);
            let (head, tail) = rest.split_at(cut);
            out.push(RichText {
                text: head.to_owned(),
                annotations: self.annotations.clone(),
                href: self.href.clone(),
            });
            rest = tail;
        }
        if !rest.is_empty() {
            out.push(RichText {
                text: rest.to_owned(),
                annotations: self.annotations.clone(),
                href: self.href.clone(),
            });
        }
        out
    }
}

/// Byte index at which to split `text` so the head holds at most `limit`
/// code points, preferring a grapheme boundary.
fn split_point(text: &str, limit: usize) -> usize {
    // Byte offset of the code-point limit.
    let hard = text
        .char_indices()
        .nth(limit)
        .map_or(text.len(), |(idx, _)| idx);
    // Last grapheme boundary at or below the hard cut.
    let mut best = 0usize;
    for (idx, grapheme) in text.grapheme_indices(true) {
        let end = idx + grapheme.len();
        if end <= hard {
            best = end;
        } else {
            break;
        }
    }
    if best == 0 { hard } else { best }
}

/// Concatenated plain text of a run sequence
#[must_use]
pub fn plain_text(runs: &[RichText]) -> String {
    runs.iter().map(|r| r.text.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_run_is_untouched() {
        let run = RichText::plain("hello");
        let parts = run.clone().split_to_limit();
        assert_eq!(parts, vec![run]);
    }

    #[test]
    fn long_run_splits_under_limit() {
        let run = RichText::plain("a".repeat(4_500));
        let parts = run.split_to_limit();
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| p.len_code_points() <= MAX_TEXT_RUN_LEN));
        assert_eq!(plain_text(&parts).len(), 4_500);
    }

    #[test]
    fn split_preserves_annotations() {
        let run = RichText {
            text: "b".repeat(2_001),
            annotations: Annotations {
                bold: true,
                ..Annotations::default()
            },
            href: Some("https://example.com/".to_owned()),
        };
        let parts = run.split_to_limit();
        assert_eq!(parts.len(), 2);
        for part in parts {
            assert!(part.annotations.bold);
            assert_eq!(part.href.as_deref(), Some("https://example.com/"));
        }
    }

    #[test]
    fn split_does_not_tear_graphemes() {
        // Family emoji is multiple code points joined by ZWJ.
        let family = "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}";
        let mut text = "x".repeat(MAX_TEXT_RUN_LEN - 2);
        text.push_str(family);
        text.push_str(&"y".repeat(10));
        let parts = RichText::plain(text).split_to_limit();
        for part in &parts {
            // No piece starts mid-grapheme with a bare ZWJ continuation.
            assert!(!part.text.starts_with('\u{200D}'));
        }
    }
}
