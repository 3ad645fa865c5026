//! Content-root location and page-chrome stripping
//!
//! Captured pages carry navigation, breadcrumbs, mini-TOCs, and related-link
//! side panels around the article body. The root locator picks the tightest
//! container that holds the actual content, and the chrome predicate lets the
//! walker skip decorative subtrees wherever they survive inside it.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

/// Containers tried in priority order when locating the content root
static ROOT_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        // Vendor article body wrappers seen in captured pages.
        "div.zDocsTopicPageBody",
        "div.zDocsTopicPageBodyContent",
        // Schema-typed article bodies.
        ".dita",
        ".refbody",
        ".conbody",
        ".taskbody",
        // Generic landmarks.
        "main",
        "[role=main]",
        "article",
        "body",
    ]
    .iter()
    .filter_map(|css| Selector::parse(css).ok())
    .collect()
});

/// Classes that mark a subtree as page chrome rather than content
const CHROME_CLASS_FRAGMENTS: &[&str] = &[
    "breadcrumb",
    "zdocsbreadcrumb",
    "minitoc",
    "mini-toc",
    "on-this-page",
    "related-content",
    "related-links",
    "relatedlinks",
    "feedback",
    "zdocsfeedback",
    "topicrating",
    "navigation",
    "sidebar",
    "toolbar",
];

/// Element names that are chrome wherever they appear inside the root
const CHROME_ELEMENTS: &[&str] = &["nav", "aside", "footer", "header"];

/// Locate the content root for a parsed document
///
/// Tries each candidate container in priority order and falls back to the
/// document's root element so arbitrary fragments still convert.
#[must_use]
pub fn content_root(document: &Html) -> ElementRef<'_> {
    for selector in ROOT_SELECTORS.iter() {
        if let Some(found) = document.select(selector).next() {
            return found;
        }
    }
    document.root_element()
}

/// Whether an element is page chrome the walker must skip
#[must_use]
pub fn is_chrome(element: ElementRef<'_>) -> bool {
    let name = element.value().name();
    if CHROME_ELEMENTS.contains(&name) {
        return true;
    }
    if let Some(role) = element.value().attr("role") {
        if matches!(role, "navigation" | "banner" | "complementary") {
            return true;
        }
    }
    if let Some(classes) = element.value().attr("class") {
        let lower = classes.to_ascii_lowercase();
        for token in lower.split_whitespace() {
            if CHROME_CLASS_FRAGMENTS
                .iter()
                .any(|fragment| token.contains(fragment))
            {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_wrapper_wins_over_body() {
        let document = Html::parse_document(
            r#"<body><nav>menu</nav><div class="zDocsTopicPageBody"><p>content</p></div></body>"#,
        );
        let root = content_root(&document);
        assert_eq!(root.value().attr("class"), Some("zDocsTopicPageBody"));
    }

    #[test]
    fn main_beats_body() {
        let document =
            Html::parse_document("<body><div>x</div><main><p>content</p></main></body>");
        let root = content_root(&document);
        assert_eq!(root.value().name(), "main");
    }

    #[test]
    fn fragment_falls_back_to_document_root() {
        let document = Html::parse_document("<p>bare fragment</p>");
        // html5ever synthesizes <html><body>, so body is still found.
        let root = content_root(&document);
        assert_eq!(root.value().name(), "body");
    }

    #[test]
    fn chrome_detection() {
        let document = Html::parse_document(
            r#"<body><nav id="n"></nav><div class="zDocsBreadcrumbs" id="b"></div>
               <div class="content" id="c"></div></body>"#,
        );
        let by_id = |id: &str| {
            let sel = Selector::parse(&format!("#{id}")).expect("selector");
            document.select(&sel).next().expect("element")
        };
        assert!(is_chrome(by_id("n")));
        assert!(is_chrome(by_id("b")));
        assert!(!is_chrome(by_id("c")));
    }
}
