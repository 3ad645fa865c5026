//! Node-level sanitation rules
//!
//! Decides which nodes the walker ignores outright and normalizes raw text
//! content. Entity decoding already happened in the HTML parser; the rules
//! here handle executable/presentation elements and whitespace.

use scraper::ElementRef;

/// Elements never converted to content
const DROPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg", "canvas"];

/// Embed hosts that survive sanitation and map to video blocks
pub const VIDEO_EMBED_HOSTS: &[&str] = &[
    "www.youtube.com",
    "youtube.com",
    "www.youtube-nocookie.com",
    "youtu.be",
    "player.vimeo.com",
    "vimeo.com",
    "fast.wistia.net",
];

/// Embed hosts that survive sanitation and map to bookmark blocks
pub const BOOKMARK_EMBED_HOSTS: &[&str] = &["codepen.io", "jsfiddle.net", "gist.github.com"];

/// Whether the walker must drop this element and its subtree
#[must_use]
pub fn is_dropped(element: ElementRef<'_>) -> bool {
    let name = element.value().name();
    if DROPPED_ELEMENTS.contains(&name) {
        return true;
    }
    if name == "iframe" {
        // Only allow-listed embeds survive; everything else is dropped.
        return embed_host(element).is_none();
    }
    if let Some(style) = element.value().attr("style") {
        let compact: String = style.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.contains("display:none") || compact.contains("visibility:hidden") {
            return true;
        }
    }
    element.value().attr("hidden").is_some()
}

/// Allow-listed embed host of an iframe, when present
#[must_use]
pub fn embed_host(element: ElementRef<'_>) -> Option<EmbedKind> {
    let src = element.value().attr("src")?;
    let parsed = url::Url::parse(src).ok()?;
    let host = parsed.host_str()?;
    if VIDEO_EMBED_HOSTS.contains(&host) {
        return Some(EmbedKind::Video);
    }
    if BOOKMARK_EMBED_HOSTS.contains(&host) {
        return Some(EmbedKind::Bookmark);
    }
    None
}

/// What an allow-listed embed becomes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedKind {
    /// Playable embed
    Video,
    /// Link preview card
    Bookmark,
}

/// Collapse whitespace runs outside preformatted regions
///
/// Newlines, tabs, and repeated spaces become a single space. The caller
/// decides contextually whether a leading/trailing space survives, so this
/// function keeps boundary spaces when the raw text had any.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            pending_space = true;
        } else {
            if pending_space {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        }
    }
    if pending_space {
        out.push(' ');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn first<'a>(document: &'a Html, css: &str) -> ElementRef<'a> {
        let sel = Selector::parse(css).expect("selector");
        document.select(&sel).next().expect("element")
    }

    #[test]
    fn scripts_and_styles_are_dropped() {
        let document =
            Html::parse_document("<body><script>x()</script><style>p{}</style><p>keep</p></body>");
        assert!(is_dropped(first(&document, "script")));
        assert!(is_dropped(first(&document, "style")));
        assert!(!is_dropped(first(&document, "p")));
    }

    #[test]
    fn unknown_iframes_are_dropped_allowlisted_survive() {
        let document = Html::parse_document(
            r#"<body><iframe id="a" src="https://ads.example.com/x"></iframe>
               <iframe id="v" src="https://www.youtube.com/embed/xyz"></iframe></body>"#,
        );
        assert!(is_dropped(first(&document, "#a")));
        assert!(!is_dropped(first(&document, "#v")));
        assert_eq!(embed_host(first(&document, "#v")), Some(EmbedKind::Video));
    }

    #[test]
    fn hidden_elements_are_dropped() {
        let document = Html::parse_document(
            r#"<body><div id="h" style="display: none">x</div><div id="v">y</div></body>"#,
        );
        assert!(is_dropped(first(&document, "#h")));
        assert!(!is_dropped(first(&document, "#v")));
    }

    #[test]
    fn whitespace_collapses() {
        assert_eq!(collapse_whitespace("a\n\t  b"), "a b");
        assert_eq!(collapse_whitespace("  a  "), " a ");
        assert_eq!(collapse_whitespace("\n\n"), " ");
    }
}
