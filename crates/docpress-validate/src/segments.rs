//! Ordered segment extraction
//!
//! Both sides of a comparison are reduced to ordered lists of normalized
//! text segments: one per block-level region in the source HTML, one per
//! block (or table cell) in a block tree. Markers are stripped before
//! normalization so they never affect coverage.

use docpress_convert::{rich, root, sanitize};
use docpress_domain::{Block, marker};
use scraper::node::Node;
use scraper::{ElementRef, Html};

use crate::normalize::normalize;

/// Extract ordered normalized segments from source HTML
#[must_use]
pub fn from_html(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let content = root::content_root(&document);
    let mut out = Vec::new();
    walk_element(content, &mut out);
    out
}

fn walk_element(element: ElementRef<'_>, out: &mut Vec<String>) {
    let mut inline_buf = String::new();
    for node in element.children() {
        match node.value() {
            Node::Text(text) => {
                let raw: &str = text;
                inline_buf.push(' ');
                inline_buf.push_str(raw);
            }
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(node) else {
                    continue;
                };
                if sanitize::is_dropped(child) || root::is_chrome(child) {
                    continue;
                }
                let name = child.value().name();
                if name == "img" || name == "figcaption" || name == "caption" {
                    // Alt text and captions map to block captions (or are
                    // dropped), which are excluded on the block side too.
                    continue;
                }
                if rich::is_inline(name) {
                    inline_buf.push(' ');
                    inline_buf.extend(child.text().flat_map(|t| t.chars()));
                } else if name == "td" || name == "th" {
                    flush(&mut inline_buf, out);
                    push_segment(&child.text().collect::<String>(), out);
                } else {
                    flush(&mut inline_buf, out);
                    walk_element(child, out);
                }
            }
            _ => {}
        }
    }
    flush(&mut inline_buf, out);
}

fn flush(buf: &mut String, out: &mut Vec<String>) {
    if !buf.is_empty() {
        push_segment(buf, out);
        buf.clear();
    }
}

fn push_segment(raw: &str, out: &mut Vec<String>) {
    let normalized = normalize(&marker::strip(raw));
    if !normalized.is_empty() {
        out.push(normalized);
    }
}

/// Extract ordered normalized segments from a block tree
#[must_use]
pub fn from_blocks(blocks: &[Block]) -> Vec<String> {
    let mut out = Vec::new();
    walk_blocks(blocks, &mut out);
    out
}

fn walk_blocks(blocks: &[Block], out: &mut Vec<String>) {
    for block in blocks {
        match block {
            Block::TableRow { cells } => {
                for cell in cells {
                    push_segment(&docpress_domain::plain_text(cell), out);
                }
            }
            // Captions and URLs carry no source-comparable prose.
            Block::Image { .. } | Block::Video { .. } | Block::Bookmark { .. } => {}
            Block::Divider | Block::LinkToPage { .. } | Block::ChildPage { .. } => {}
            _ => {
                if let Some(runs) = block.rich_text() {
                    push_segment(&docpress_domain::plain_text(runs), out);
                }
            }
        }
        if let Some(children) = block.children() {
            walk_blocks(children, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docpress_domain::RichText;

    #[test]
    fn html_segments_in_document_order() {
        let segments = from_html(
            "<h1>Title</h1><p>First para.</p><ul><li>one</li><li>two</li></ul>",
        );
        assert_eq!(segments, vec!["title", "first para", "one", "two"]);
    }

    #[test]
    fn table_cells_are_individual_segments() {
        let segments =
            from_html("<table><tr><td>A1</td><td>B1</td></tr><tr><td>A2</td></tr></table>");
        assert_eq!(segments, vec!["a1", "b1", "a2"]);
    }

    #[test]
    fn chrome_and_scripts_are_excluded() {
        let segments = from_html(
            "<body><nav>menu</nav><script>x()</script><main><p>real</p></main></body>",
        );
        assert_eq!(segments, vec!["real"]);
    }

    #[test]
    fn block_segments_strip_markers() {
        let blocks = vec![Block::Paragraph {
            rich_text: vec![
                RichText::plain("body text "),
                RichText::plain(docpress_domain::marker::mint()),
            ],
            children: Vec::new(),
        }];
        assert_eq!(from_blocks(&blocks), vec!["body text"]);
    }

    #[test]
    fn nested_blocks_walk_in_order() {
        let blocks = vec![Block::BulletedItem {
            rich_text: vec![RichText::plain("outer")],
            children: vec![Block::Paragraph {
                rich_text: vec![RichText::plain("inner")],
                children: Vec::new(),
            }],
        }];
        assert_eq!(from_blocks(&blocks), vec!["outer", "inner"]);
    }
}
