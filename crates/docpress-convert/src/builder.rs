//! Element-to-block walker
//!
//! Depth-first traversal of the content root. Contiguous inline content
//! accumulates into paragraph runs; block-level elements map through the
//! element table. A visited set breaks pathological reference structures so
//! the emitted tree is always acyclic.

use std::collections::HashSet;

use docpress_domain::marker;
use docpress_domain::{Block, CalloutStyle, Error, Result, RichText};
use ego_tree::NodeId;
use scraper::node::Node;
use scraper::{ElementRef, Html};

use crate::images::{self, ResolvedImage};
use crate::rich;
use crate::root;
use crate::sanitize::{self, EmbedKind};
use crate::{BuildOptions, BuildOutcome, BuildStats, code, tree};

/// Run the full build pipeline over one HTML document
pub fn build(html: &str, options: &BuildOptions) -> Result<BuildOutcome> {
    let document = Html::parse_document(html);
    let content = root::content_root(&document);
    let mut walker = Walker {
        options,
        warnings: Vec::new(),
        stats: BuildStats::default(),
        visited: HashSet::new(),
    };
    let mut blocks = walker.walk_children(content);
    if blocks.is_empty() && !content.text().any(|t| !t.trim().is_empty()) {
        return Err(Error::invalid_input("document has no convertible content"));
    }
    tree::normalize(&mut blocks, &mut walker.warnings);
    walker.stats.blocks = blocks.iter().map(Block::subtree_size).sum();
    Ok(BuildOutcome {
        blocks,
        warnings: walker.warnings,
        stats: walker.stats,
    })
}

struct Walker<'a> {
    options: &'a BuildOptions,
    warnings: Vec<String>,
    stats: BuildStats,
    visited: HashSet<NodeId>,
}

impl Walker<'_> {
    /// Convert the children of a container into a block sequence
    fn walk_children(&mut self, parent: ElementRef<'_>) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut pending: Vec<RichText> = Vec::new();
        for node in parent.children() {
            match node.value() {
                Node::Text(_) => {
                    rich::merge_runs(&mut pending, rich::node_runs(node, false));
                }
                Node::Element(_) => {
                    let Some(element) = ElementRef::wrap(node) else {
                        continue;
                    };
                    if sanitize::is_dropped(element) || root::is_chrome(element) {
                        continue;
                    }
                    let name = element.value().name();
                    if rich::is_inline(name) {
                        rich::merge_runs(&mut pending, rich::node_runs(node, false));
                        continue;
                    }
                    self.flush_paragraph(&mut pending, &mut blocks);
                    let emitted = self.element_blocks(element);
                    blocks.extend(emitted);
                }
                _ => {}
            }
        }
        self.flush_paragraph(&mut pending, &mut blocks);
        blocks
    }

    /// Turn accumulated inline runs into a paragraph block
    fn flush_paragraph(&mut self, pending: &mut Vec<RichText>, blocks: &mut Vec<Block>) {
        rich::finish_runs(pending);
        if pending.is_empty() {
            return;
        }
        let mut rich_text = std::mem::take(pending);
        self.mark(&mut rich_text);
        blocks.push(Block::Paragraph {
            rich_text: split_runs(rich_text),
            children: Vec::new(),
        });
    }

    /// Map one block-level element to zero or more blocks
    fn element_blocks(&mut self, element: ElementRef<'_>) -> Vec<Block> {
        if !self.visited.insert(element.id()) {
            // Already emitted once; a cycle or re-entrant reference.
            return Vec::new();
        }
        match element.value().name() {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => self.heading(element),
            "p" => self.paragraph(element),
            "ul" => self.list(element, false),
            "ol" => self.list(element, true),
            "li" => {
                // Orphan list item outside any list context.
                self.list_item(element, false).into_iter().collect()
            }
            "table" => self.table(element),
            "pre" => self.code_block(element),
            "code" => {
                if has_class(element, "codeblock") {
                    self.code_block(element)
                } else {
                    // Inline code reaching here stands alone; treat as a
                    // one-run paragraph.
                    let mut runs = rich::node_runs(*element, false);
                    rich::finish_runs(&mut runs);
                    let mut blocks = Vec::new();
                    let mut pending = runs;
                    self.flush_paragraph(&mut pending, &mut blocks);
                    blocks
                }
            }
            "blockquote" => self.quote(element),
            "img" => self.image(element),
            "figure" => self.figure(element),
            "video" => self.video(element),
            "iframe" => self.embed(element),
            "hr" => vec![Block::Divider],
            "details" => self.toggle(element),
            "dt" | "dd" => self.paragraph(element),
            "div" | "section" | "article" => {
                if let Some(style) = callout_style(element) {
                    self.callout(element, style)
                } else if has_class(element, "codeblock") {
                    self.code_block(element)
                } else {
                    // Unknown container: inline its children at this position.
                    self.walk_children(element)
                }
            }
            _ => self.walk_children(element),
        }
    }

    fn heading(&mut self, element: ElementRef<'_>) -> Vec<Block> {
        let level: usize = element.value().name()[1..].parse().unwrap_or(1);
        let mut rich_text = rich::inline_runs(element, false);
        if rich_text.is_empty() {
            return Vec::new();
        }
        if level > 3 {
            let prefix = "\u{25B8} ".repeat(level - 3);
            if let Some(first) = rich_text.first_mut() {
                first.text = format!("{prefix}{}", first.text);
            }
        }
        self.mark(&mut rich_text);
        self.stats.counts.headings += 1;
        let rich_text = split_runs(rich_text);
        vec![match level {
            1 => Block::Heading1 { rich_text },
            2 => Block::Heading2 { rich_text },
            _ => Block::Heading3 { rich_text },
        }]
    }

    fn paragraph(&mut self, element: ElementRef<'_>) -> Vec<Block> {
        // Paragraphs may wrap a lone image; emit the image as its own block.
        let mut blocks = Vec::new();
        let mut rich_text = Vec::new();
        for node in element.children() {
            if let Some(child) = ElementRef::wrap(node) {
                if sanitize::is_dropped(child) {
                    continue;
                }
                if child.value().name() == "img" {
                    blocks.extend(self.image(child));
                    continue;
                }
            }
            rich::merge_runs(&mut rich_text, rich::node_runs(node, false));
        }
        rich::finish_runs(&mut rich_text);
        if !rich_text.is_empty() {
            self.mark(&mut rich_text);
            blocks.insert(
                0,
                Block::Paragraph {
                    rich_text: split_runs(rich_text),
                    children: Vec::new(),
                },
            );
        }
        blocks
    }

    fn list(&mut self, element: ElementRef<'_>, numbered: bool) -> Vec<Block> {
        let mut items = Vec::new();
        for child in element.child_elements() {
            if child.value().name() == "li" {
                items.extend(self.list_item(child, numbered));
            }
        }
        if !items.is_empty() {
            self.stats.counts.lists += 1;
        }
        items
    }

    fn list_item(&mut self, element: ElementRef<'_>, numbered: bool) -> Option<Block> {
        let mut rich_text = Vec::new();
        let mut children = Vec::new();
        let mut checkbox: Option<bool> = None;
        for node in element.children() {
            match node.value() {
                Node::Text(_) => rich::merge_runs(&mut rich_text, rich::node_runs(node, false)),
                Node::Element(_) => {
                    let Some(child) = ElementRef::wrap(node) else {
                        continue;
                    };
                    if sanitize::is_dropped(child) || root::is_chrome(child) {
                        continue;
                    }
                    let name = child.value().name();
                    if name == "input" {
                        if child.value().attr("type") == Some("checkbox") {
                            checkbox = Some(child.value().attr("checked").is_some());
                        }
                        continue;
                    }
                    if rich::is_inline(name) {
                        rich::merge_runs(&mut rich_text, rich::node_runs(node, false));
                    } else {
                        children.extend(self.element_blocks(child));
                    }
                }
                _ => {}
            }
        }
        rich::finish_runs(&mut rich_text);
        if rich_text.is_empty() && children.is_empty() {
            return None;
        }
        self.mark(&mut rich_text);
        let rich_text = split_runs(rich_text);
        Some(match checkbox {
            Some(checked) => Block::ToDo {
                rich_text,
                checked,
                children,
            },
            None if numbered => Block::NumberedItem {
                rich_text,
                children,
            },
            None => Block::BulletedItem {
                rich_text,
                children,
            },
        })
    }

    fn table(&mut self, element: ElementRef<'_>) -> Vec<Block> {
        let mut rows: Vec<Vec<Vec<RichText>>> = Vec::new();
        let mut has_column_header = false;
        for section in element.child_elements() {
            match section.value().name() {
                "thead" => {
                    for row in section.child_elements().filter(|e| e.value().name() == "tr") {
                        let cells = self.table_cells(row);
                        if !cells.is_empty() {
                            has_column_header = true;
                            rows.push(cells);
                        }
                    }
                }
                "tbody" | "tfoot" => {
                    for row in section.child_elements().filter(|e| e.value().name() == "tr") {
                        let cells = self.table_cells(row);
                        if !cells.is_empty() {
                            rows.push(cells);
                        }
                    }
                }
                "tr" => {
                    let cells = self.table_cells(section);
                    if !cells.is_empty() {
                        rows.push(cells);
                    }
                }
                "caption" => {}
                _ => {}
            }
        }
        // A header can also be an all-<th> first row.
        if !has_column_header {
            if let Some(first_tr) = element
                .select(&scraper::Selector::parse("tr").expect("selector"))
                .next()
            {
                let cells: Vec<_> = first_tr.child_elements().collect();
                if !cells.is_empty() && cells.iter().all(|c| c.value().name() == "th") {
                    has_column_header = true;
                }
            }
        }
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        if width == 0 {
            self.warnings.push("empty table dropped".to_owned());
            return Vec::new();
        }
        for row in &mut rows {
            while row.len() < width {
                row.push(Vec::new());
            }
        }
        self.stats.counts.tables += 1;
        vec![Block::Table {
            table_width: width,
            has_column_header,
            children: rows
                .into_iter()
                .map(|cells| Block::TableRow { cells })
                .collect(),
        }]
    }

    fn table_cells(&mut self, row: ElementRef<'_>) -> Vec<Vec<RichText>> {
        let mut cells = Vec::new();
        for cell in row.child_elements() {
            let name = cell.value().name();
            if name != "td" && name != "th" {
                continue;
            }
            let runs = split_runs(rich::flatten_runs(cell, false));
            let span: usize = cell
                .value()
                .attr("colspan")
                .and_then(|v| v.parse().ok())
                .unwrap_or(1);
            cells.push(runs);
            // Spanned columns become empty cells so every row keeps the
            // table's width.
            for _ in 1..span.max(1) {
                cells.push(Vec::new());
            }
        }
        cells
    }

    fn code_block(&mut self, element: ElementRef<'_>) -> Vec<Block> {
        let mut text: String = element.text().collect();
        // Trailing newline is an artifact of source formatting.
        while text.ends_with('\n') {
            text.pop();
        }
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.stats.counts.code_blocks += 1;
        vec![Block::Code {
            rich_text: RichText::plain(text).split_to_limit(),
            language: code::infer_language(element),
        }]
    }

    fn quote(&mut self, element: ElementRef<'_>) -> Vec<Block> {
        let (mut rich_text, children) = self.mixed_content(element);
        if rich_text.is_empty() && children.is_empty() {
            return Vec::new();
        }
        self.mark(&mut rich_text);
        vec![Block::Quote {
            rich_text: split_runs(rich_text),
            children,
        }]
    }

    fn callout(&mut self, element: ElementRef<'_>, style: CalloutStyle) -> Vec<Block> {
        let (mut rich_text, mut children) = self.mixed_content(element);
        if rich_text.is_empty() {
            // Promote a leading paragraph child to the callout body.
            if let Some(index) = children
                .iter()
                .position(|b| matches!(b, Block::Paragraph { .. }))
                .filter(|&i| i == 0)
            {
                if let Block::Paragraph {
                    rich_text: runs, ..
                } = children.remove(index)
                {
                    rich_text = runs;
                }
            }
        }
        if rich_text.is_empty() && children.is_empty() {
            return Vec::new();
        }
        if rich_text.is_empty() {
            rich_text = vec![RichText::plain("")];
        }
        self.mark(&mut rich_text);
        self.stats.counts.callouts += 1;
        vec![Block::Callout {
            rich_text: split_runs(rich_text),
            style,
            children,
        }]
    }

    fn toggle(&mut self, element: ElementRef<'_>) -> Vec<Block> {
        let mut summary = Vec::new();
        let mut children = Vec::new();
        for node in element.children() {
            if let Some(child) = ElementRef::wrap(node) {
                if sanitize::is_dropped(child) {
                    continue;
                }
                if child.value().name() == "summary" {
                    summary = rich::inline_runs(child, false);
                    continue;
                }
                children.extend(self.element_blocks(child));
            } else if matches!(node.value(), Node::Text(_)) {
                let runs = rich::node_runs(node, false);
                if !runs.iter().all(|r| r.text.trim().is_empty()) {
                    children.push(Block::Paragraph {
                        rich_text: runs,
                        children: Vec::new(),
                    });
                }
            }
        }
        if summary.is_empty() {
            summary = vec![RichText::plain("Details")];
        }
        self.mark(&mut summary);
        vec![Block::Toggle {
            rich_text: split_runs(summary),
            children,
        }]
    }

    fn image(&mut self, element: ElementRef<'_>) -> Vec<Block> {
        let Some(src) = element.value().attr("src") else {
            return Vec::new();
        };
        let alt = element.value().attr("alt").unwrap_or_default();
        match images::resolve(src, alt, self.options.uploader.as_ref()) {
            ResolvedImage::External(url) => {
                self.stats.counts.images += 1;
                let caption = if alt.is_empty() {
                    Vec::new()
                } else {
                    vec![RichText::plain(alt)]
                };
                vec![Block::Image { url, caption }]
            }
            ResolvedImage::Degraded(block, warning) => {
                self.warnings.push(warning);
                vec![block]
            }
        }
    }

    fn figure(&mut self, element: ElementRef<'_>) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut caption: Vec<RichText> = Vec::new();
        for child in element.child_elements() {
            match child.value().name() {
                "img" => blocks.extend(self.image(child)),
                "figcaption" => caption = rich::inline_runs(child, false),
                _ => blocks.extend(self.element_blocks(child)),
            }
        }
        if !caption.is_empty() {
            if let Some(Block::Image {
                caption: existing, ..
            }) = blocks.first_mut()
            {
                *existing = split_runs(caption);
            } else {
                blocks.push(Block::Paragraph {
                    rich_text: split_runs(caption),
                    children: Vec::new(),
                });
            }
        }
        blocks
    }

    fn video(&mut self, element: ElementRef<'_>) -> Vec<Block> {
        let src = element.value().attr("src").map(ToOwned::to_owned).or_else(|| {
            element
                .child_elements()
                .find(|c| c.value().name() == "source")
                .and_then(|s| s.value().attr("src").map(ToOwned::to_owned))
        });
        match src {
            Some(url) if url.starts_with("http") => vec![Block::Video { url }],
            _ => Vec::new(),
        }
    }

    fn embed(&mut self, element: ElementRef<'_>) -> Vec<Block> {
        let Some(kind) = sanitize::embed_host(element) else {
            return Vec::new();
        };
        let Some(src) = element.value().attr("src") else {
            return Vec::new();
        };
        match kind {
            EmbedKind::Video => vec![Block::Video {
                url: src.to_owned(),
            }],
            EmbedKind::Bookmark => vec![Block::Bookmark {
                url: src.to_owned(),
                caption: Vec::new(),
            }],
        }
    }

    /// Split an element into leading inline runs plus trailing block children
    fn mixed_content(&mut self, element: ElementRef<'_>) -> (Vec<RichText>, Vec<Block>) {
        let mut rich_text = Vec::new();
        let mut children = Vec::new();
        for node in element.children() {
            match node.value() {
                Node::Text(_) => rich::merge_runs(&mut rich_text, rich::node_runs(node, false)),
                Node::Element(_) => {
                    let Some(child) = ElementRef::wrap(node) else {
                        continue;
                    };
                    if sanitize::is_dropped(child) || root::is_chrome(child) {
                        continue;
                    }
                    if rich::is_inline(child.value().name()) {
                        rich::merge_runs(&mut rich_text, rich::node_runs(node, false));
                    } else {
                        children.extend(self.element_blocks(child));
                    }
                }
                _ => {}
            }
        }
        rich::finish_runs(&mut rich_text);
        (rich_text, children)
    }

    /// Append a correlation marker when marking is enabled
    fn mark(&mut self, runs: &mut Vec<RichText>) {
        if !self.options.insert_markers || runs.is_empty() {
            return;
        }
        self.stats.markers += 1;
        runs.push(RichText::plain(format!(" {}", marker::mint())));
    }
}

/// Enforce the per-run length limit across a run list
fn split_runs(runs: Vec<RichText>) -> Vec<RichText> {
    runs.into_iter()
        .flat_map(RichText::split_to_limit)
        .collect()
}

/// Whether the element carries the given class token
fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element
        .value()
        .attr("class")
        .is_some_and(|classes| classes.split_whitespace().any(|token| token == class))
}

/// Admonition class → callout style mapping
fn callout_style(element: ElementRef<'_>) -> Option<CalloutStyle> {
    let classes = element.value().attr("class")?;
    for token in classes.split_whitespace() {
        let style = match token.to_ascii_lowercase().as_str() {
            "note" | "info" => CalloutStyle {
                icon: "\u{24D8}".to_owned(),
                color: "blue_background".to_owned(),
            },
            "warning" | "caution" => CalloutStyle {
                icon: "\u{26A0}".to_owned(),
                color: "yellow_background".to_owned(),
            },
            "important" => CalloutStyle {
                icon: "\u{2757}".to_owned(),
                color: "red_background".to_owned(),
            },
            "tip" => CalloutStyle {
                icon: "\u{1F4A1}".to_owned(),
                color: "green_background".to_owned(),
            },
            _ => continue,
        };
        return Some(style);
    }
    None
}
