//! Element-count comparison
//!
//! Counts the element categories the validator compares (tables, images,
//! lists, callouts, code blocks, headings) on both sides and checks the
//! deltas against configured tolerances.

use docpress_convert::{root, sanitize};
use docpress_domain::report::ElementCounts;
use docpress_domain::{Block, BlockKind};
use scraper::{ElementRef, Html};

/// Per-category tolerance for count deltas
#[derive(Debug, Clone, Copy)]
pub struct CountTolerances {
    /// Tables (exact by default)
    pub tables: usize,
    /// Images (exact by default)
    pub images: usize,
    /// Lists
    pub lists: usize,
    /// Callouts
    pub callouts: usize,
    /// Code blocks (exact by default)
    pub code_blocks: usize,
    /// Headings
    pub headings: usize,
}

impl Default for CountTolerances {
    fn default() -> Self {
        Self {
            tables: 0,
            images: 0,
            lists: 1,
            callouts: 1,
            code_blocks: 0,
            headings: 1,
        }
    }
}

/// Classes that mark a container as a callout admonition
const CALLOUT_CLASSES: &[&str] = &["note", "info", "warning", "important", "caution", "tip"];

/// Count comparable elements in source HTML
#[must_use]
pub fn count_html(html: &str) -> ElementCounts {
    let document = Html::parse_document(html);
    let content = root::content_root(&document);
    let mut counts = ElementCounts::default();
    walk(content, &mut counts, false);
    counts
}

fn walk(element: ElementRef<'_>, counts: &mut ElementCounts, inside_pre: bool) {
    for child in element.child_elements() {
        if sanitize::is_dropped(child) || root::is_chrome(child) {
            continue;
        }
        let name = child.value().name();
        let mut descend_pre = inside_pre;
        match name {
            "table" => counts.tables += 1,
            "img" => counts.images += 1,
            "ul" | "ol" => counts.lists += 1,
            "pre" => {
                counts.code_blocks += 1;
                descend_pre = true;
            }
            "code" if !inside_pre && has_any_class(child, &["codeblock"]) => {
                counts.code_blocks += 1;
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => counts.headings += 1,
            "div" | "section" | "article" if has_any_class(child, CALLOUT_CLASSES) => {
                counts.callouts += 1;
            }
            _ => {}
        }
        walk(child, counts, descend_pre);
    }
}

fn has_any_class(element: ElementRef<'_>, classes: &[&str]) -> bool {
    element.value().attr("class").is_some_and(|attr| {
        attr.split_whitespace()
            .any(|token| classes.contains(&token.to_ascii_lowercase().as_str()))
    })
}

/// Count comparable elements in a block tree
#[must_use]
pub fn count_blocks(blocks: &[Block]) -> ElementCounts {
    let mut counts = ElementCounts::default();
    walk_blocks(blocks, &mut counts);
    counts
}

fn walk_blocks(blocks: &[Block], counts: &mut ElementCounts) {
    let mut previous_was_list_item = false;
    let mut previous_kind: Option<BlockKind> = None;
    for block in blocks {
        let kind = block.kind();
        match kind {
            BlockKind::Table => counts.tables += 1,
            BlockKind::Image => counts.images += 1,
            BlockKind::Callout => counts.callouts += 1,
            BlockKind::Code => counts.code_blocks += 1,
            BlockKind::Heading1 | BlockKind::Heading2 | BlockKind::Heading3 => {
                counts.headings += 1;
            }
            BlockKind::BulletedItem | BlockKind::NumberedItem | BlockKind::ToDo => {
                // A run of adjacent same-kind items is one logical list.
                if !(previous_was_list_item && previous_kind == Some(kind)) {
                    counts.lists += 1;
                }
            }
            _ => {}
        }
        previous_was_list_item = matches!(
            kind,
            BlockKind::BulletedItem | BlockKind::NumberedItem | BlockKind::ToDo
        );
        previous_kind = Some(kind);
        if let Some(children) = block.children() {
            walk_blocks(children, counts);
        }
    }
}

/// Check deltas against tolerances; returns error strings per violation
#[must_use]
pub fn check(
    source: &ElementCounts,
    notion: &ElementCounts,
    tolerances: &CountTolerances,
) -> Vec<String> {
    let mut errors = Vec::new();
    let mut check_one = |label: &str, left: usize, right: usize, tolerance: usize| {
        let delta = left.abs_diff(right);
        if delta > tolerance {
            errors.push(format!(
                "{label} count mismatch: source {left}, workspace {right} (tolerance {tolerance})"
            ));
        }
    };
    check_one("table", source.tables, notion.tables, tolerances.tables);
    check_one("image", source.images, notion.images, tolerances.images);
    check_one("list", source.lists, notion.lists, tolerances.lists);
    check_one(
        "callout",
        source.callouts,
        notion.callouts,
        tolerances.callouts,
    );
    check_one(
        "code block",
        source.code_blocks,
        notion.code_blocks,
        tolerances.code_blocks,
    );
    check_one(
        "heading",
        source.headings,
        notion.headings,
        tolerances.headings,
    );
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use docpress_domain::RichText;

    #[test]
    fn html_counting() {
        let counts = count_html(
            "<h1>t</h1><p>x</p><table><tr><td>c</td></tr></table>\
             <ul><li>a</li></ul><pre>code</pre><div class=\"note\">n</div><img src=\"x\">",
        );
        assert_eq!(counts.tables, 1);
        assert_eq!(counts.images, 1);
        assert_eq!(counts.lists, 1);
        assert_eq!(counts.callouts, 1);
        assert_eq!(counts.code_blocks, 1);
        assert_eq!(counts.headings, 1);
    }

    #[test]
    fn adjacent_items_count_as_one_list() {
        let item = |text: &str| Block::BulletedItem {
            rich_text: vec![RichText::plain(text)],
            children: Vec::new(),
        };
        let blocks = vec![
            item("a"),
            item("b"),
            Block::Divider,
            item("c"),
        ];
        let counts = count_blocks(&blocks);
        assert_eq!(counts.lists, 2);
    }

    #[test]
    fn tolerances_apply() {
        let source = ElementCounts {
            tables: 2,
            lists: 3,
            ..ElementCounts::default()
        };
        let notion = ElementCounts {
            tables: 1,
            lists: 2,
            ..ElementCounts::default()
        };
        let errors = check(&source, &notion, &CountTolerances::default());
        assert_eq!(errors.len(), 1, "only the table delta violates: {errors:?}");
        assert!(errors[0].contains("table"));
    }
}
