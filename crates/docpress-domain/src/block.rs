//! Workspace block model
//!
//! [`Block`] is a tagged sum over the workspace's block kinds with typed
//! payloads. The wire shape (`{"object":"block","type":"<kind>","<kind>":
//! {…}}`) is produced and consumed only here, so the rest of the system works
//! with validated, typed data.

use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::rich_text::{Annotations, RichText, plain_text};

/// Block kind discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum BlockKind {
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    BulletedItem,
    NumberedItem,
    ToDo,
    Toggle,
    Quote,
    Callout,
    Code,
    Image,
    Video,
    Divider,
    Table,
    TableRow,
    Bookmark,
    ChildPage,
    Synced,
    LinkToPage,
}

impl BlockKind {
    /// Wire tag for this kind
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Heading1 => "heading_1",
            Self::Heading2 => "heading_2",
            Self::Heading3 => "heading_3",
            Self::BulletedItem => "bulleted_item",
            Self::NumberedItem => "numbered_item",
            Self::ToDo => "to_do",
            Self::Toggle => "toggle",
            Self::Quote => "quote",
            Self::Callout => "callout",
            Self::Code => "code",
            Self::Image => "image",
            Self::Video => "video",
            Self::Divider => "divider",
            Self::Table => "table",
            Self::TableRow => "table_row",
            Self::Bookmark => "bookmark",
            Self::ChildPage => "child_page",
            Self::Synced => "synced",
            Self::LinkToPage => "link_to_page",
        }
    }

    /// Parse a wire tag
    #[must_use]
    pub fn from_str(tag: &str) -> Option<Self> {
        Some(match tag {
            "paragraph" => Self::Paragraph,
            "heading_1" => Self::Heading1,
            "heading_2" => Self::Heading2,
            "heading_3" => Self::Heading3,
            "bulleted_item" => Self::BulletedItem,
            "numbered_item" => Self::NumberedItem,
            "to_do" => Self::ToDo,
            "toggle" => Self::Toggle,
            "quote" => Self::Quote,
            "callout" => Self::Callout,
            "code" => Self::Code,
            "image" => Self::Image,
            "video" => Self::Video,
            "divider" => Self::Divider,
            "table" => Self::Table,
            "table_row" => Self::TableRow,
            "bookmark" => Self::Bookmark,
            "child_page" => Self::ChildPage,
            "synced" => Self::Synced,
            "link_to_page" => Self::LinkToPage,
            _ => return None,
        })
    }

    /// Whether the workspace schema permits children under this kind
    #[must_use]
    pub fn supports_children(self) -> bool {
        matches!(
            self,
            Self::Paragraph
                | Self::BulletedItem
                | Self::NumberedItem
                | Self::ToDo
                | Self::Toggle
                | Self::Quote
                | Self::Callout
                | Self::Table
                | Self::Synced
        )
    }
}

/// Callout icon and color, derived from the source admonition class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalloutStyle {
    /// Emoji icon shown in the callout gutter
    pub icon: String,
    /// Workspace color tag for the callout background
    pub color: String,
}

impl Default for CalloutStyle {
    fn default() -> Self {
        Self {
            icon: "\u{24D8}".to_owned(),
            color: "default".to_owned(),
        }
    }
}

/// One workspace block with its typed payload and optional children
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Plain paragraph
    Paragraph {
        /// Text runs
        rich_text: Vec<RichText>,
        /// Nested blocks
        children: Vec<Block>,
    },
    /// Top-level heading
    Heading1 {
        /// Text runs
        rich_text: Vec<RichText>,
    },
    /// Second-level heading
    Heading2 {
        /// Text runs
        rich_text: Vec<RichText>,
    },
    /// Third-level heading (deeper source headings are clamped here)
    Heading3 {
        /// Text runs
        rich_text: Vec<RichText>,
    },
    /// Bulleted list item
    BulletedItem {
        /// Text runs
        rich_text: Vec<RichText>,
        /// Nested blocks
        children: Vec<Block>,
    },
    /// Numbered list item
    NumberedItem {
        /// Text runs
        rich_text: Vec<RichText>,
        /// Nested blocks
        children: Vec<Block>,
    },
    /// Checkbox item
    ToDo {
        /// Text runs
        rich_text: Vec<RichText>,
        /// Checked state
        checked: bool,
        /// Nested blocks
        children: Vec<Block>,
    },
    /// Collapsible toggle
    Toggle {
        /// Text runs
        rich_text: Vec<RichText>,
        /// Nested blocks
        children: Vec<Block>,
    },
    /// Quotation
    Quote {
        /// Text runs
        rich_text: Vec<RichText>,
        /// Nested blocks
        children: Vec<Block>,
    },
    /// Admonition callout
    Callout {
        /// Text runs
        rich_text: Vec<RichText>,
        /// Icon and color
        style: CalloutStyle,
        /// Nested blocks
        children: Vec<Block>,
    },
    /// Fenced code block
    Code {
        /// Code text runs
        rich_text: Vec<RichText>,
        /// Workspace language tag
        language: String,
    },
    /// Externally hosted image
    Image {
        /// Image URL
        url: String,
        /// Caption runs
        caption: Vec<RichText>,
    },
    /// Embedded video
    Video {
        /// Video URL
        url: String,
    },
    /// Horizontal rule
    Divider,
    /// Table container; children are exclusively table rows
    Table {
        /// Column count shared by every row
        table_width: usize,
        /// Whether the first row renders as a header
        has_column_header: bool,
        /// Row blocks
        children: Vec<Block>,
    },
    /// One table row
    TableRow {
        /// One rich-run list per column
        cells: Vec<Vec<RichText>>,
    },
    /// Link preview card
    Bookmark {
        /// Target URL
        url: String,
        /// Caption runs
        caption: Vec<RichText>,
    },
    /// Reference to a child page
    ChildPage {
        /// Page title
        title: String,
    },
    /// Synced-content container
    Synced {
        /// Nested blocks
        children: Vec<Block>,
    },
    /// Link to another page
    LinkToPage {
        /// Target page id
        page_id: String,
    },
}

impl Block {
    /// Kind discriminant of this block
    #[must_use]
    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Paragraph { .. } => BlockKind::Paragraph,
            Self::Heading1 { .. } => BlockKind::Heading1,
            Self::Heading2 { .. } => BlockKind::Heading2,
            Self::Heading3 { .. } => BlockKind::Heading3,
            Self::BulletedItem { .. } => BlockKind::BulletedItem,
            Self::NumberedItem { .. } => BlockKind::NumberedItem,
            Self::ToDo { .. } => BlockKind::ToDo,
            Self::Toggle { .. } => BlockKind::Toggle,
            Self::Quote { .. } => BlockKind::Quote,
            Self::Callout { .. } => BlockKind::Callout,
            Self::Code { .. } => BlockKind::Code,
            Self::Image { .. } => BlockKind::Image,
            Self::Video { .. } => BlockKind::Video,
            Self::Divider => BlockKind::Divider,
            Self::Table { .. } => BlockKind::Table,
            Self::TableRow { .. } => BlockKind::TableRow,
            Self::Bookmark { .. } => BlockKind::Bookmark,
            Self::ChildPage { .. } => BlockKind::ChildPage,
            Self::Synced { .. } => BlockKind::Synced,
            Self::LinkToPage { .. } => BlockKind::LinkToPage,
        }
    }

    /// Nested children, when the kind carries them
    #[must_use]
    pub fn children(&self) -> Option<&Vec<Block>> {
        match self {
            Self::Paragraph { children, .. }
            | Self::BulletedItem { children, .. }
            | Self::NumberedItem { children, .. }
            | Self::ToDo { children, .. }
            | Self::Toggle { children, .. }
            | Self::Quote { children, .. }
            | Self::Callout { children, .. }
            | Self::Table { children, .. }
            | Self::Synced { children } => Some(children),
            _ => None,
        }
    }

    /// Mutable access to nested children
    pub fn children_mut(&mut self) -> Option<&mut Vec<Block>> {
        match self {
            Self::Paragraph { children, .. }
            | Self::BulletedItem { children, .. }
            | Self::NumberedItem { children, .. }
            | Self::ToDo { children, .. }
            | Self::Toggle { children, .. }
            | Self::Quote { children, .. }
            | Self::Callout { children, .. }
            | Self::Table { children, .. }
            | Self::Synced { children } => Some(children),
            _ => None,
        }
    }

    /// Detach and return this block's children, leaving it a leaf
    pub fn take_children(&mut self) -> Vec<Block> {
        self.children_mut().map(std::mem::take).unwrap_or_default()
    }

    /// Primary text runs, when the kind carries them
    #[must_use]
    pub fn rich_text(&self) -> Option<&Vec<RichText>> {
        match self {
            Self::Paragraph { rich_text, .. }
            | Self::Heading1 { rich_text }
            | Self::Heading2 { rich_text }
            | Self::Heading3 { rich_text }
            | Self::BulletedItem { rich_text, .. }
            | Self::NumberedItem { rich_text, .. }
            | Self::ToDo { rich_text, .. }
            | Self::Toggle { rich_text, .. }
            | Self::Quote { rich_text, .. }
            | Self::Callout { rich_text, .. }
            | Self::Code { rich_text, .. } => Some(rich_text),
            _ => None,
        }
    }

    /// Mutable access to the primary text runs
    pub fn rich_text_mut(&mut self) -> Option<&mut Vec<RichText>> {
        match self {
            Self::Paragraph { rich_text, .. }
            | Self::Heading1 { rich_text }
            | Self::Heading2 { rich_text }
            | Self::Heading3 { rich_text }
            | Self::BulletedItem { rich_text, .. }
            | Self::NumberedItem { rich_text, .. }
            | Self::ToDo { rich_text, .. }
            | Self::Toggle { rich_text, .. }
            | Self::Quote { rich_text, .. }
            | Self::Callout { rich_text, .. }
            | Self::Code { rich_text, .. } => Some(rich_text),
            _ => None,
        }
    }

    /// Concatenated plain text of this block's own runs
    #[must_use]
    pub fn own_text(&self) -> String {
        match self {
            Self::TableRow { cells } => cells
                .iter()
                .map(|c| plain_text(c))
                .collect::<Vec<_>>()
                .join(" "),
            Self::Image { caption, .. } | Self::Bookmark { caption, .. } => plain_text(caption),
            Self::ChildPage { title } => title.clone(),
            _ => self.rich_text().map(|r| plain_text(r)).unwrap_or_default(),
        }
    }

    /// Count of this block plus all nested descendants
    #[must_use]
    pub fn subtree_size(&self) -> usize {
        1 + self
            .children()
            .map(|c| c.iter().map(Block::subtree_size).sum::<usize>())
            .unwrap_or(0)
    }

    /// Serialize to the workspace wire shape, children included recursively
    #[must_use]
    pub fn to_wire(&self) -> Value {
        self.wire_value(true)
    }

    /// Serialize to the wire shape without nested children
    ///
    /// Used when a subtree is deferred to a follow-up append against the
    /// parent's assigned id.
    #[must_use]
    pub fn to_wire_shallow(&self) -> Value {
        self.wire_value(false)
    }

    fn wire_value(&self, with_children: bool) -> Value {
        let tag = self.kind().as_str();
        let mut payload = match self {
            Self::Paragraph { rich_text, .. }
            | Self::Heading1 { rich_text }
            | Self::Heading2 { rich_text }
            | Self::Heading3 { rich_text }
            | Self::BulletedItem { rich_text, .. }
            | Self::NumberedItem { rich_text, .. }
            | Self::Toggle { rich_text, .. }
            | Self::Quote { rich_text, .. } => json!({ "rich_text": wire_runs(rich_text) }),
            Self::ToDo {
                rich_text, checked, ..
            } => json!({ "rich_text": wire_runs(rich_text), "checked": checked }),
            Self::Callout {
                rich_text, style, ..
            } => json!({
                "rich_text": wire_runs(rich_text),
                "icon": { "type": "emoji", "emoji": style.icon },
                "color": style.color,
            }),
            Self::Code {
                rich_text,
                language,
            } => json!({ "rich_text": wire_runs(rich_text), "language": language }),
            Self::Image { url, caption } => json!({
                "type": "external",
                "external": { "url": url },
                "caption": wire_runs(caption),
            }),
            Self::Video { url } => json!({
                "type": "external",
                "external": { "url": url },
            }),
            Self::Divider => json!({}),
            Self::Table {
                table_width,
                has_column_header,
                ..
            } => json!({
                "table_width": table_width,
                "has_column_header": has_column_header,
                "has_row_header": false,
            }),
            Self::TableRow { cells } => json!({
                "cells": cells.iter().map(|c| wire_runs(c)).collect::<Vec<_>>(),
            }),
            Self::Bookmark { url, caption } => {
                json!({ "url": url, "caption": wire_runs(caption) })
            }
            Self::ChildPage { title } => json!({ "title": title }),
            Self::Synced { .. } => json!({ "synced_from": Value::Null }),
            Self::LinkToPage { page_id } => json!({ "type": "page_id", "page_id": page_id }),
        };
        if with_children {
            if let Some(children) = self.children().filter(|c| !c.is_empty()) {
                payload["children"] =
                    Value::Array(children.iter().map(Block::to_wire).collect());
            }
        }
        let mut wire = json!({ "object": "block", "type": tag });
        wire[tag] = payload;
        wire
    }

    /// Parse one block from the workspace wire shape
    ///
    /// Ignores unknown annotation fields and tolerates missing optional
    /// payload members. Unknown block types are rejected so callers can
    /// decide whether to skip or fail.
    pub fn from_wire(value: &Value) -> Result<Block> {
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::validation("block payload missing 'type'"))?;
        let kind = BlockKind::from_str(tag)
            .ok_or_else(|| Error::validation(format!("unknown block type '{tag}'")))?;
        let payload = value
            .get(tag)
            .ok_or_else(|| Error::validation(format!("block payload missing '{tag}' object")))?;

        let rich = |key: &str| -> Vec<RichText> {
            payload
                .get(key)
                .and_then(Value::as_array)
                .map(|runs| runs.iter().filter_map(run_from_wire).collect())
                .unwrap_or_default()
        };

        Ok(match kind {
            BlockKind::Paragraph => Block::Paragraph {
                rich_text: rich("rich_text"),
                children: Vec::new(),
            },
            BlockKind::Heading1 => Block::Heading1 {
                rich_text: rich("rich_text"),
            },
            BlockKind::Heading2 => Block::Heading2 {
                rich_text: rich("rich_text"),
            },
            BlockKind::Heading3 => Block::Heading3 {
                rich_text: rich("rich_text"),
            },
            BlockKind::BulletedItem => Block::BulletedItem {
                rich_text: rich("rich_text"),
                children: Vec::new(),
            },
            BlockKind::NumberedItem => Block::NumberedItem {
                rich_text: rich("rich_text"),
                children: Vec::new(),
            },
            BlockKind::ToDo => Block::ToDo {
                rich_text: rich("rich_text"),
                checked: payload
                    .get("checked")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                children: Vec::new(),
            },
            BlockKind::Toggle => Block::Toggle {
                rich_text: rich("rich_text"),
                children: Vec::new(),
            },
            BlockKind::Quote => Block::Quote {
                rich_text: rich("rich_text"),
                children: Vec::new(),
            },
            BlockKind::Callout => Block::Callout {
                rich_text: rich("rich_text"),
                style: CalloutStyle {
                    icon: payload
                        .pointer("/icon/emoji")
                        .and_then(Value::as_str)
                        .unwrap_or("\u{24D8}")
                        .to_owned(),
                    color: payload
                        .get("color")
                        .and_then(Value::as_str)
                        .unwrap_or("default")
                        .to_owned(),
                },
                children: Vec::new(),
            },
            BlockKind::Code => Block::Code {
                rich_text: rich("rich_text"),
                language: payload
                    .get("language")
                    .and_then(Value::as_str)
                    .unwrap_or("plain text")
                    .to_owned(),
            },
            BlockKind::Image => Block::Image {
                url: payload
                    .pointer("/external/url")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
                caption: rich("caption"),
            },
            BlockKind::Video => Block::Video {
                url: payload
                    .pointer("/external/url")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
            },
            BlockKind::Divider => Block::Divider,
            BlockKind::Table => Block::Table {
                table_width: payload
                    .get("table_width")
                    .and_then(Value::as_u64)
                    .unwrap_or(0) as usize,
                has_column_header: payload
                    .get("has_column_header")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                children: Vec::new(),
            },
            BlockKind::TableRow => Block::TableRow {
                cells: payload
                    .get("cells")
                    .and_then(Value::as_array)
                    .map(|cells| {
                        cells
                            .iter()
                            .map(|cell| {
                                cell.as_array()
                                    .map(|runs| runs.iter().filter_map(run_from_wire).collect())
                                    .unwrap_or_default()
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            BlockKind::Bookmark => Block::Bookmark {
                url: payload
                    .get("url")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
                caption: rich("caption"),
            },
            BlockKind::ChildPage => Block::ChildPage {
                title: payload
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
            },
            BlockKind::Synced => Block::Synced {
                children: Vec::new(),
            },
            BlockKind::LinkToPage => Block::LinkToPage {
                page_id: payload
                    .get("page_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
            },
        })
    }
}

/// Serialize a run sequence to the wire shape
fn wire_runs(runs: &[RichText]) -> Vec<Value> {
    runs.iter()
        .map(|run| {
            let mut text = json!({ "content": run.text });
            if let Some(href) = &run.href {
                text["link"] = json!({ "url": href });
            }
            let mut out = json!({ "type": "text", "text": text });
            if !run.annotations.is_plain() {
                let mut ann = serde_json::Map::new();
                if run.annotations.bold {
                    ann.insert("bold".to_owned(), Value::Bool(true));
                }
                if run.annotations.italic {
                    ann.insert("italic".to_owned(), Value::Bool(true));
                }
                if run.annotations.strikethrough {
                    ann.insert("strikethrough".to_owned(), Value::Bool(true));
                }
                if run.annotations.underline {
                    ann.insert("underline".to_owned(), Value::Bool(true));
                }
                if run.annotations.code {
                    ann.insert("code".to_owned(), Value::Bool(true));
                }
                if let Some(color) = &run.annotations.color {
                    ann.insert("color".to_owned(), Value::String(color.clone()));
                }
                out["annotations"] = Value::Object(ann);
            }
            out
        })
        .collect()
}

/// Parse one rich-text run from the wire, skipping non-text runs
fn run_from_wire(value: &Value) -> Option<RichText> {
    let text = value
        .pointer("/text/content")
        .or_else(|| value.get("plain_text"))
        .and_then(Value::as_str)?
        .to_owned();
    let ann = value.get("annotations");
    let get_bit = |key: &str| {
        ann.and_then(|a| a.get(key))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    };
    Some(RichText {
        text,
        annotations: Annotations {
            bold: get_bit("bold"),
            italic: get_bit("italic"),
            strikethrough: get_bit("strikethrough"),
            underline: get_bit("underline"),
            code: get_bit("code"),
            color: ann
                .and_then(|a| a.get("color"))
                .and_then(Value::as_str)
                .filter(|c| *c != "default")
                .map(ToOwned::to_owned),
        },
        href: value
            .pointer("/text/link/url")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned),
    })
}

/// A block as it exists in the workspace: payload plus assigned identity
#[derive(Debug, Clone)]
pub struct RemoteBlock {
    /// Workspace-assigned block id
    pub id: String,
    /// Whether the workspace reports nested children
    pub has_children: bool,
    /// Typed payload
    pub block: Block,
}

impl RemoteBlock {
    /// Parse a remote block from a list-children result entry
    pub fn from_wire(value: &Value) -> Result<Self> {
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::validation("remote block missing 'id'"))?
            .to_owned();
        Ok(Self {
            id,
            has_children: value
                .get("has_children")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            block: Block::from_wire(value)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_kinds_reject_children() {
        for kind in [
            BlockKind::Heading1,
            BlockKind::Heading2,
            BlockKind::Heading3,
            BlockKind::Code,
            BlockKind::Image,
            BlockKind::Video,
            BlockKind::Divider,
            BlockKind::TableRow,
            BlockKind::Bookmark,
            BlockKind::ChildPage,
            BlockKind::LinkToPage,
        ] {
            assert!(!kind.supports_children(), "{kind:?} must be a leaf");
        }
    }

    #[test]
    fn wire_round_trip_paragraph() {
        let block = Block::Paragraph {
            rich_text: vec![
                RichText::plain("plain "),
                RichText {
                    text: "bold".to_owned(),
                    annotations: Annotations {
                        bold: true,
                        ..Annotations::default()
                    },
                    href: None,
                },
            ],
            children: Vec::new(),
        };
        let wire = block.to_wire();
        assert_eq!(wire["type"], "paragraph");
        let parsed = Block::from_wire(&wire).unwrap();
        assert_eq!(parsed, block);
    }

    #[test]
    fn wire_table_shape() {
        let table = Block::Table {
            table_width: 2,
            has_column_header: true,
            children: vec![Block::TableRow {
                cells: vec![vec![RichText::plain("a")], vec![RichText::plain("b")]],
            }],
        };
        let wire = table.to_wire();
        assert_eq!(wire["table"]["table_width"], 2);
        assert_eq!(wire["table"]["has_column_header"], true);
        assert_eq!(wire["table"]["children"].as_array().map(Vec::len), Some(1));
        let shallow = table.to_wire_shallow();
        assert!(shallow["table"].get("children").is_none());
    }

    #[test]
    fn unknown_block_type_is_rejected() {
        let wire = json!({ "object": "block", "type": "hologram", "hologram": {} });
        assert!(Block::from_wire(&wire).is_err());
    }

    #[test]
    fn unknown_annotations_are_inert() {
        let wire = json!({
            "object": "block",
            "type": "paragraph",
            "paragraph": { "rich_text": [{
                "type": "text",
                "text": { "content": "hi" },
                "annotations": { "bold": true, "sparkle": true }
            }]}
        });
        let block = Block::from_wire(&wire).unwrap();
        let runs = block.rich_text().unwrap();
        assert!(runs[0].annotations.bold);
    }

    #[test]
    fn subtree_size_counts_descendants() {
        let block = Block::BulletedItem {
            rich_text: vec![RichText::plain("item")],
            children: vec![
                Block::Paragraph {
                    rich_text: vec![RichText::plain("nested")],
                    children: Vec::new(),
                },
                Block::Divider,
            ],
        };
        assert_eq!(block.subtree_size(), 3);
    }
}
