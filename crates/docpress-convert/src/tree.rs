//! Tree normalization passes
//!
//! Applied after emission, in order: single-paragraph list items are
//! inlined, nesting beyond the workspace's accepted depth is flattened,
//! adjacent duplicate callouts collapse, and empty paragraphs are dropped
//! unless they keep two joinable neighbors apart.

use docpress_domain::constants::MAX_NESTING_BEYOND_LIST;
use docpress_domain::marker;
use docpress_domain::{Block, BlockKind};

/// Run every normalization pass over a top-level block sequence
pub fn normalize(blocks: &mut Vec<Block>, warnings: &mut Vec<String>) {
    inline_single_paragraph_items(blocks);
    let mut flattened = false;
    enforce_depth(blocks, MAX_NESTING_BEYOND_LIST, &mut flattened);
    if flattened {
        warnings.push("[nesting flattened]".to_owned());
    }
    dedup_adjacent_callouts(blocks, warnings);
    drop_empty_paragraphs(blocks);
}

/// A list item whose only child is a single paragraph has it inlined
fn inline_single_paragraph_items(blocks: &mut [Block]) {
    for block in blocks.iter_mut() {
        if let Some(children) = block.children_mut() {
            inline_single_paragraph_items(children);
        }
        let is_item = matches!(
            block.kind(),
            BlockKind::BulletedItem | BlockKind::NumberedItem | BlockKind::ToDo
        );
        if !is_item {
            continue;
        }
        let Some(children) = block.children_mut() else {
            continue;
        };
        let lone_paragraph = children.len() == 1
            && matches!(
                children[0],
                Block::Paragraph {
                    ref children, ..
                } if children.is_empty()
            );
        if !lone_paragraph {
            continue;
        }
        let Some(Block::Paragraph { rich_text, .. }) = children.pop() else {
            continue;
        };
        if let Some(runs) = block.rich_text_mut() {
            if runs.is_empty() {
                *runs = rich_text;
            } else {
                let mut merged = rich_text;
                runs.append(&mut merged);
            }
        }
    }
}

/// Hoist children nested deeper than the budget up to the nearest permitted
/// parent, preserving relative order
fn enforce_depth(blocks: &mut Vec<Block>, budget: usize, flattened: &mut bool) {
    let mut index = 0;
    while index < blocks.len() {
        // Table rows are structural, not nesting; leave tables intact.
        if blocks[index].kind() == BlockKind::Table {
            index += 1;
            continue;
        }
        let hoisted = if budget == 0 {
            let extras = blocks[index].take_children();
            if !extras.is_empty() {
                *flattened = true;
            }
            extras
        } else {
            if let Some(children) = blocks[index].children_mut() {
                enforce_depth(children, budget - 1, flattened);
            }
            Vec::new()
        };
        let mut insert_at = index + 1;
        for mut extra in hoisted {
            // Hoisted blocks sit at the limit themselves now.
            let deeper = extra.take_children();
            if !deeper.is_empty() {
                *flattened = true;
            }
            blocks.insert(insert_at, extra);
            insert_at += 1;
            for grand in deeper {
                blocks.insert(insert_at, grand);
                insert_at += 1;
            }
        }
        index += 1;
    }
}

/// Collapse adjacent callouts with identical content into one
fn dedup_adjacent_callouts(blocks: &mut Vec<Block>, warnings: &mut Vec<String>) {
    let mut index = 0;
    while index + 1 < blocks.len() {
        let both_callouts = blocks[index].kind() == BlockKind::Callout
            && blocks[index + 1].kind() == BlockKind::Callout;
        if both_callouts {
            let left = marker::strip(&blocks[index].own_text());
            let right = marker::strip(&blocks[index + 1].own_text());
            let left_empty = blocks[index]
                .children()
                .map(Vec::is_empty)
                .unwrap_or(true);
            let right_empty = blocks[index + 1]
                .children()
                .map(Vec::is_empty)
                .unwrap_or(true);
            if left == right && left_empty && right_empty && !left.is_empty() {
                blocks.remove(index + 1);
                warnings.push("duplicate_callouts_collapsed".to_owned());
                continue;
            }
        }
        if let Some(children) = blocks[index].children_mut() {
            dedup_adjacent_callouts(children, warnings);
        }
        index += 1;
    }
    if let Some(last) = blocks.last_mut() {
        if let Some(children) = last.children_mut() {
            dedup_adjacent_callouts(children, warnings);
        }
    }
}

/// Drop empty paragraphs unless they keep two joinable neighbors separate
fn drop_empty_paragraphs(blocks: &mut Vec<Block>) {
    let mut index = 0;
    while index < blocks.len() {
        if let Some(children) = blocks[index].children_mut() {
            drop_empty_paragraphs(children);
        }
        let is_empty_paragraph = matches!(
            &blocks[index],
            Block::Paragraph { rich_text, children }
                if children.is_empty()
                    && rich_text.iter().all(|r| r.text.trim().is_empty())
        );
        if is_empty_paragraph {
            let separates = index > 0
                && index + 1 < blocks.len()
                && joinable(blocks[index - 1].kind())
                && blocks[index - 1].kind() == blocks[index + 1].kind();
            if !separates {
                blocks.remove(index);
                continue;
            }
        }
        index += 1;
    }
}

/// Kinds that visually merge when adjacent
fn joinable(kind: BlockKind) -> bool {
    matches!(
        kind,
        BlockKind::BulletedItem | BlockKind::NumberedItem | BlockKind::ToDo
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use docpress_domain::RichText;

    fn item(text: &str, children: Vec<Block>) -> Block {
        Block::BulletedItem {
            rich_text: vec![RichText::plain(text)],
            children,
        }
    }

    fn paragraph(text: &str) -> Block {
        Block::Paragraph {
            rich_text: if text.is_empty() {
                Vec::new()
            } else {
                vec![RichText::plain(text)]
            },
            children: Vec::new(),
        }
    }

    #[test]
    fn lone_paragraph_is_inlined() {
        let mut blocks = vec![Block::BulletedItem {
            rich_text: Vec::new(),
            children: vec![paragraph("inlined")],
        }];
        let mut warnings = Vec::new();
        normalize(&mut blocks, &mut warnings);
        assert_eq!(blocks[0].own_text(), "inlined");
        assert_eq!(blocks[0].children().map(Vec::len), Some(0));
    }

    #[test]
    fn deep_nesting_is_flattened() {
        // depth 0 -> 1 -> 2 -> 3; the depth-3 item must hoist to depth 2.
        let deep = item("d3", Vec::new());
        let level2 = item("d2", vec![deep]);
        let level1 = item("d1", vec![level2]);
        let mut blocks = vec![item("d0", vec![level1])];
        let mut warnings = Vec::new();
        normalize(&mut blocks, &mut warnings);
        assert!(warnings.iter().any(|w| w.contains("nesting flattened")));
        fn max_depth(block: &Block) -> usize {
            1 + block
                .children()
                .map(|c| c.iter().map(max_depth).max().unwrap_or(0))
                .unwrap_or(0)
        }
        assert!(max_depth(&blocks[0]) <= 1 + MAX_NESTING_BEYOND_LIST);
    }

    #[test]
    fn flatten_preserves_order() {
        let d3a = item("d3a", Vec::new());
        let d3b = item("d3b", Vec::new());
        let level2 = item("d2", vec![d3a, d3b]);
        let level1 = item("d1", vec![level2]);
        let mut blocks = vec![item("d0", vec![level1])];
        let mut warnings = Vec::new();
        normalize(&mut blocks, &mut warnings);
        fn texts(blocks: &[Block], out: &mut Vec<String>) {
            for b in blocks {
                out.push(b.own_text());
                if let Some(c) = b.children() {
                    texts(c, out);
                }
            }
        }
        let mut seen = Vec::new();
        texts(&blocks, &mut seen);
        let positions: Vec<_> = ["d0", "d1", "d2", "d3a", "d3b"]
            .iter()
            .map(|t| seen.iter().position(|s| s == t).expect("present"))
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted, "relative order preserved");
    }

    #[test]
    fn empty_paragraph_between_lists_survives() {
        let mut blocks = vec![item("a", Vec::new()), paragraph(""), item("b", Vec::new())];
        let mut warnings = Vec::new();
        normalize(&mut blocks, &mut warnings);
        assert_eq!(blocks.len(), 3, "separator paragraph must survive");

        let mut blocks = vec![paragraph("x"), paragraph(""), paragraph("y")];
        normalize(&mut blocks, &mut warnings);
        assert_eq!(blocks.len(), 2, "non-separating empty paragraph drops");
    }
}
