//! Source documents and page metadata
//!
//! A [`SourceDocument`] wraps one captured HTML payload together with the
//! metadata the capture tool embeds in a leading comment block:
//!
//! ```text
//! <!--
//!   Page ID: 1f2e3d4c5b6a79880123456789abcdef
//!   URL: https://docs.example.com/some/article
//! -->
//! ```
//!
//! Page ids are accepted in both the bare 32-hex and the hyphenated form and
//! normalized to the hyphenated 36-character representation.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

static PAGE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)([0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}|[0-9a-f]{32})",
    )
    .expect("page id regex is valid")
});

static META_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\A\s*<!--(.*?)-->").expect("metadata comment regex is valid"));

/// One captured HTML document, owned by a single request
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Raw HTML, UTF-8
    pub html: String,
    /// Title, from the request or the metadata comment
    pub title: Option<String>,
    /// Source URL the document was captured from
    pub source_url: Option<String>,
    /// Target page id extracted from the metadata comment
    pub page_id: Option<String>,
}

impl SourceDocument {
    /// Wrap raw HTML, honoring a leading metadata comment when present
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when the document exceeds `max_bytes`.
    pub fn parse(html: String, max_bytes: usize) -> Result<Self> {
        if html.len() > max_bytes {
            return Err(Error::invalid_input(format!(
                "source document is {} bytes, limit is {max_bytes}",
                html.len()
            )));
        }
        let meta = leading_metadata(&html);
        Ok(Self {
            html,
            title: meta.title,
            source_url: meta.url,
            page_id: meta.page_id,
        })
    }
}

#[derive(Debug, Default)]
struct LeadingMetadata {
    title: Option<String>,
    url: Option<String>,
    page_id: Option<String>,
}

/// Parse the leading `<!-- … -->` metadata comment, if any
fn leading_metadata(html: &str) -> LeadingMetadata {
    let mut meta = LeadingMetadata::default();
    let Some(captures) = META_COMMENT_RE.captures(html) else {
        return meta;
    };
    let body = &captures[1];
    for line in body.lines() {
        let line = line.trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "page id" => meta.page_id = extract_page_id(value),
            "url" => {
                if !value.is_empty() {
                    // "URL: https://…" splits at the first colon; rejoin.
                    meta.url = Some(line[line.find(':').unwrap_or(0) + 1..].trim().to_owned());
                }
            }
            "title" => {
                if !value.is_empty() {
                    meta.title = Some(value.to_owned());
                }
            }
            _ => {}
        }
    }
    meta
}

/// Find and normalize the first page id in the text
///
/// Accepts the bare 32-hex and hyphenated forms; returns the hyphenated
/// 36-character form, lowercased.
#[must_use]
pub fn extract_page_id(text: &str) -> Option<String> {
    let raw = PAGE_ID_RE.find(text)?.as_str().to_ascii_lowercase();
    Some(normalize_page_id(&raw))
}

/// Normalize a page id to the hyphenated 36-character form
///
/// Input may be bare 32-hex or already hyphenated; anything else is returned
/// lowercased as-is (the workspace will reject it downstream).
#[must_use]
pub fn normalize_page_id(id: &str) -> String {
    let compact: String = id
        .chars()
        .filter(char::is_ascii_hexdigit)
        .collect::<String>()
        .to_ascii_lowercase();
    if compact.len() != 32 {
        return id.to_ascii_lowercase();
    }
    format!(
        "{}-{}-{}-{}-{}",
        &compact[0..8],
        &compact[8..12],
        &compact[12..16],
        &compact[16..20],
        &compact[20..32]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_hex_id_is_hyphenated() {
        let id = extract_page_id("Page ID: 1f2e3d4c5b6a79880123456789abcdef").unwrap();
        assert_eq!(id, "1f2e3d4c-5b6a-7988-0123-456789abcdef");
    }

    #[test]
    fn hyphenated_id_passes_through() {
        let id = extract_page_id("1F2E3D4C-5B6A-7988-0123-456789ABCDEF").unwrap();
        assert_eq!(id, "1f2e3d4c-5b6a-7988-0123-456789abcdef");
    }

    #[test]
    fn metadata_comment_is_honored() {
        let html = "<!--\n  Page ID: 1f2e3d4c5b6a79880123456789abcdef\n  URL: https://docs.example.com/a?b=c\n-->\n<h1>Doc</h1>";
        let doc = SourceDocument::parse(html.to_owned(), 1024).unwrap();
        assert_eq!(
            doc.page_id.as_deref(),
            Some("1f2e3d4c-5b6a-7988-0123-456789abcdef")
        );
        assert_eq!(doc.source_url.as_deref(), Some("https://docs.example.com/a?b=c"));
    }

    #[test]
    fn missing_comment_yields_no_metadata() {
        let doc = SourceDocument::parse("<p>no meta</p>".to_owned(), 1024).unwrap();
        assert!(doc.page_id.is_none());
        assert!(doc.source_url.is_none());
    }

    #[test]
    fn oversized_document_is_rejected() {
        let err = SourceDocument::parse("x".repeat(32), 16).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }
}
