//! Inline rich-text extraction
//!
//! Walks the inline content of an element and produces annotated rich-text
//! runs. Block-level descendants are skipped; the tree walker handles those
//! separately so mixed containers (list items, callouts) can split inline
//! runs from block children.

use docpress_domain::rich_text::{Annotations, RichText};
use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::ElementRef;

use crate::sanitize::collapse_whitespace;

/// Elements treated as inline formatting rather than blocks
const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "br", "cite", "code", "data", "del", "dfn", "em", "i", "ins",
    "kbd", "mark", "q", "s", "samp", "small", "span", "strike", "strong", "sub", "sup", "time",
    "tt", "u", "var", "wbr",
];

/// Inline colors the workspace accepts
const COLOR_ALLOW_LIST: &[(&str, &str)] = &[
    ("red", "red"),
    ("#ff0000", "red"),
    ("#d32f2f", "red"),
    ("orange", "orange"),
    ("#ff9800", "orange"),
    ("yellow", "yellow"),
    ("green", "green"),
    ("#4caf50", "green"),
    ("#2e7d32", "green"),
    ("blue", "blue"),
    ("#1976d2", "blue"),
    ("#0000ff", "blue"),
    ("purple", "purple"),
    ("pink", "pink"),
    ("brown", "brown"),
    ("gray", "gray"),
    ("grey", "gray"),
    ("#757575", "gray"),
];

/// Whether an element participates in inline flow
#[must_use]
pub fn is_inline(name: &str) -> bool {
    INLINE_ELEMENTS.contains(&name)
}

/// Extract the inline runs of an element
///
/// `preformatted` preserves whitespace verbatim (code regions); otherwise
/// whitespace runs collapse to single spaces. Adjacent runs with identical
/// formatting merge.
#[must_use]
pub fn inline_runs(element: ElementRef<'_>, preformatted: bool) -> Vec<RichText> {
    let mut out = Vec::new();
    let state = InlineState::default();
    for child in element.children() {
        walk(child, &state, &mut out, preformatted);
    }
    trim_runs(&mut out);
    out
}

/// Extract runs from a single node with default formatting
///
/// Used by the tree walker to accumulate mixed inline content node by node;
/// no outer trimming is applied so adjacent nodes merge naturally.
#[must_use]
pub fn node_runs(node: NodeRef<'_, Node>, preformatted: bool) -> Vec<RichText> {
    let mut out = Vec::new();
    walk(node, &InlineState::default(), &mut out, preformatted);
    out
}

/// Extract every run beneath an element, descending into block children
///
/// Table cells hold only rich text, so nested block content is flattened
/// with newline separators between block boundaries.
#[must_use]
pub fn flatten_runs(element: ElementRef<'_>, preformatted: bool) -> Vec<RichText> {
    let mut out = Vec::new();
    let state = InlineState::default();
    for child in element.children() {
        flatten_walk(child, &state, &mut out, preformatted);
    }
    trim_runs(&mut out);
    out
}

fn flatten_walk(
    node: NodeRef<'_, Node>,
    state: &InlineState,
    out: &mut Vec<RichText>,
    preformatted: bool,
) {
    match node.value() {
        Node::Text(text) => {
            let raw: &str = text;
            let content = if preformatted {
                raw.to_owned()
            } else {
                collapse_whitespace(raw)
            };
            push_text(out, &content, state);
        }
        Node::Element(_) => {
            let Some(element) = ElementRef::wrap(node) else {
                return;
            };
            if crate::sanitize::is_dropped(element) {
                return;
            }
            let name = element.value().name();
            if name == "br" {
                push_text(out, "\n", state);
                return;
            }
            let block_boundary = !is_inline(name);
            if block_boundary && !out.is_empty() {
                push_text(out, "\n", state);
            }
            let next = advance_state(state, element);
            for child in node.children() {
                flatten_walk(child, &next, out, preformatted);
            }
        }
        _ => {}
    }
}

/// Merge a freshly extracted run list onto an accumulator
pub fn merge_runs(accumulator: &mut Vec<RichText>, runs: Vec<RichText>) {
    for run in runs {
        let state = InlineState {
            annotations: run.annotations.clone(),
            href: run.href.clone(),
        };
        push_text(accumulator, &run.text, &state);
    }
}

/// Trim outer whitespace and drop empty runs on a finished accumulator
pub fn finish_runs(runs: &mut Vec<RichText>) {
    trim_runs(runs);
}

#[derive(Debug, Clone, Default)]
struct InlineState {
    annotations: Annotations,
    href: Option<String>,
}

fn walk(
    node: NodeRef<'_, Node>,
    state: &InlineState,
    out: &mut Vec<RichText>,
    preformatted: bool,
) {
    match node.value() {
        Node::Text(text) => {
            let raw: &str = text;
            let content = if preformatted {
                raw.to_owned()
            } else {
                collapse_whitespace(raw)
            };
            push_text(out, &content, state);
        }
        Node::Element(_) => {
            let Some(element) = ElementRef::wrap(node) else {
                return;
            };
            if crate::sanitize::is_dropped(element) {
                return;
            }
            let name = element.value().name();
            if name == "br" {
                push_text(out, "\n", state);
                return;
            }
            if !is_inline(name) {
                // Block-level content inside an inline walk belongs to the
                // tree walker; skip it here.
                return;
            }
            let next = advance_state(state, element);
            for child in node.children() {
                walk(child, &next, out, preformatted);
            }
        }
        _ => {}
    }
}

/// Derive the child state entering an inline formatting element
fn advance_state(state: &InlineState, element: ElementRef<'_>) -> InlineState {
    let mut next = state.clone();
    match element.value().name() {
        "b" | "strong" => next.annotations.bold = true,
        "i" | "em" | "cite" | "dfn" | "var" => next.annotations.italic = true,
        "s" | "del" | "strike" => next.annotations.strikethrough = true,
        "u" | "ins" => next.annotations.underline = true,
        "code" | "tt" | "kbd" | "samp" => next.annotations.code = true,
        "a" => {
            if let Some(href) = element.value().attr("href") {
                if let Ok(parsed) = url::Url::parse(href) {
                    if matches!(parsed.scheme(), "http" | "https" | "mailto") {
                        next.href = Some(parsed.to_string());
                    }
                }
            }
        }
        _ => {}
    }
    if let Some(color) = style_color(element) {
        next.annotations.color = Some(color);
    }
    next
}

/// Allow-listed color from an inline `style` attribute
fn style_color(element: ElementRef<'_>) -> Option<String> {
    let style = element.value().attr("style")?;
    let lower = style.to_ascii_lowercase();
    for declaration in lower.split(';') {
        let Some((property, value)) = declaration.split_once(':') else {
            continue;
        };
        if property.trim() != "color" {
            continue;
        }
        let value = value.trim();
        for (css, workspace) in COLOR_ALLOW_LIST {
            if value == *css {
                return Some((*workspace).to_owned());
            }
        }
    }
    None
}

/// Append text, merging with the previous run when formatting matches
fn push_text(out: &mut Vec<RichText>, content: &str, state: &InlineState) {
    if content.is_empty() {
        return;
    }
    if let Some(last) = out.last_mut() {
        if last.annotations == state.annotations && last.href == state.href {
            // Avoid doubled spaces across merged text nodes.
            if last.text.ends_with(' ') && content.starts_with(' ') {
                last.text.push_str(content.trim_start_matches(' '));
            } else {
                last.text.push_str(content);
            }
            return;
        }
    }
    if content.trim().is_empty() && out.is_empty() {
        // Leading pure-whitespace run carries nothing.
        return;
    }
    out.push(RichText {
        text: content.to_owned(),
        annotations: state.annotations.clone(),
        href: state.href.clone(),
    });
}

/// Trim outer whitespace and drop runs that became empty
fn trim_runs(runs: &mut Vec<RichText>) {
    if let Some(first) = runs.first_mut() {
        first.text = first.text.trim_start().to_owned();
    }
    if let Some(last) = runs.last_mut() {
        last.text = last.text.trim_end().to_owned();
    }
    runs.retain(|run| !run.text.is_empty());
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn runs_of(html: &str) -> Vec<RichText> {
        let document = Html::parse_document(html);
        let sel = Selector::parse("p").expect("selector");
        let p = document.select(&sel).next().expect("paragraph");
        inline_runs(p, false)
    }

    #[test]
    fn plain_text_is_one_run() {
        let runs = runs_of("<p>hello   world</p>");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "hello world");
        assert!(runs[0].annotations.is_plain());
    }

    #[test]
    fn annotations_map() {
        let runs = runs_of("<p><b>bold</b><i>italic</i><s>gone</s><u>under</u><code>x</code></p>");
        assert_eq!(runs.len(), 5);
        assert!(runs[0].annotations.bold);
        assert!(runs[1].annotations.italic);
        assert!(runs[2].annotations.strikethrough);
        assert!(runs[3].annotations.underline);
        assert!(runs[4].annotations.code);
    }

    #[test]
    fn nested_annotations_compose() {
        let runs = runs_of("<p><b>bold <i>both</i></b></p>");
        assert_eq!(runs.len(), 2);
        assert!(runs[0].annotations.bold && !runs[0].annotations.italic);
        assert!(runs[1].annotations.bold && runs[1].annotations.italic);
    }

    #[test]
    fn absolute_links_carry_href() {
        let runs = runs_of(r#"<p><a href="https://example.com/a">link</a></p>"#);
        assert_eq!(runs[0].href.as_deref(), Some("https://example.com/a"));
    }

    #[test]
    fn relative_links_keep_text_only() {
        let runs = runs_of(r#"<p><a href="/relative/path">link</a></p>"#);
        assert_eq!(runs[0].text, "link");
        assert!(runs[0].href.is_none());
    }

    #[test]
    fn allowlisted_color_applies() {
        let runs = runs_of(r#"<p><span style="color: red">warn</span></p>"#);
        assert_eq!(runs[0].annotations.color.as_deref(), Some("red"));
        let runs = runs_of(r#"<p><span style="color: #bada55">odd</span></p>"#);
        assert!(runs[0].annotations.color.is_none());
    }

    #[test]
    fn adjacent_identical_runs_merge() {
        let runs = runs_of("<p>one <span>two</span> three</p>");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "one two three");
    }
}
