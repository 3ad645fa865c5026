//! Text normalization
//!
//! Segments are compared only after normalization: lowercase, NFKD with
//! combining marks dropped, non-word characters replaced by spaces, and
//! whitespace collapsed. The function is idempotent.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Normalize one text segment for comparison
#[must_use]
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.to_lowercase().nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        let keep = ch.is_alphanumeric();
        if keep {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        } else {
            pending_space = true;
        }
    }
    out
}

/// Tokenize a normalized segment into words
#[must_use]
pub fn tokens(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_strips_punctuation() {
        assert_eq!(normalize("Hello, World!"), "hello world");
        assert_eq!(normalize("a-b_c.d"), "a b c d");
    }

    #[test]
    fn combining_marks_drop() {
        assert_eq!(normalize("caf\u{00E9}"), "cafe");
        assert_eq!(normalize("cafe\u{0301}"), "cafe");
    }

    #[test]
    fn whitespace_collapses() {
        assert_eq!(normalize("  a \t b \n c  "), "a b c");
    }

    #[test]
    fn idempotent() {
        for sample in ["Hello, World!", "caf\u{00E9} ☕  break", "", "   ", "a1 b2"] {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once);
        }
    }
}
