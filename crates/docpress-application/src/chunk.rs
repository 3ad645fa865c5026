//! Chunk planning
//!
//! Partitions a block tree into workspace-acceptable submissions: top-level
//! chunks of at most 100 blocks, with oversized subtrees deferred to
//! follow-up appends against their parent's assigned id. Ordering is
//! preserved everywhere.

use docpress_domain::Block;
use docpress_domain::constants::{DEFAULT_TABLE_ROW_BATCH, MAX_CHILDREN_PER_APPEND};
use serde_json::Value;

/// One block ready for submission, with any deferred descendants
#[derive(Debug)]
pub struct UploadNode {
    /// Wire payload, children embedded only when they fit inline
    pub wire: Value,
    /// Children appended to this block's assigned id in a second pass
    pub deferred: Vec<UploadNode>,
}

/// The full submission plan for one page
#[derive(Debug, Default)]
pub struct UploadPlan {
    /// Ordered top-level chunks, each at most 100 nodes
    pub chunks: Vec<Vec<UploadNode>>,
}

impl UploadPlan {
    /// Total number of `append_children` calls the plan will issue
    #[must_use]
    pub fn append_calls(&self) -> usize {
        self.chunks.len()
            + self
                .chunks
                .iter()
                .flatten()
                .map(UploadNode::deferred_calls)
                .sum::<usize>()
    }

    /// Total number of blocks across the plan
    #[must_use]
    pub fn block_count(&self) -> usize {
        fn count(node: &UploadNode) -> usize {
            1 + embedded(&node.wire) + node.deferred.iter().map(count).sum::<usize>()
        }
        fn embedded(wire: &Value) -> usize {
            wire.get(wire["type"].as_str().unwrap_or_default())
                .and_then(|payload| payload.get("children"))
                .and_then(Value::as_array)
                .map(|children| {
                    children.len() + children.iter().map(embedded).sum::<usize>()
                })
                .unwrap_or(0)
        }
        self.chunks.iter().flatten().map(count).sum()
    }
}

impl UploadNode {
    fn deferred_calls(&self) -> usize {
        if self.deferred.is_empty() {
            return 0;
        }
        self.deferred.len().div_ceil(MAX_CHILDREN_PER_APPEND)
            + self
                .deferred
                .iter()
                .map(UploadNode::deferred_calls)
                .sum::<usize>()
    }
}

/// Chunk-planner limits
#[derive(Debug, Clone, Copy)]
pub struct ChunkLimits {
    /// Subtrees larger than this are deferred rather than embedded
    pub inline_subtree: usize,
    /// Table rows sent with the initial table submission
    pub table_row_batch: usize,
}

impl Default for ChunkLimits {
    fn default() -> Self {
        Self {
            inline_subtree: MAX_CHILDREN_PER_APPEND,
            table_row_batch: DEFAULT_TABLE_ROW_BATCH,
        }
    }
}

/// Build the submission plan for a page's top-level blocks
#[must_use]
pub fn plan(blocks: &[Block], limits: &ChunkLimits) -> UploadPlan {
    let nodes: Vec<UploadNode> = blocks.iter().map(|b| plan_block(b, limits)).collect();
    let mut chunks = Vec::new();
    let mut current = Vec::new();
    for node in nodes {
        if current.len() == MAX_CHILDREN_PER_APPEND {
            chunks.push(std::mem::take(&mut current));
        }
        current.push(node);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    UploadPlan { chunks }
}

/// Plan one block: embed the subtree when it fits, defer otherwise
fn plan_block(block: &Block, limits: &ChunkLimits) -> UploadNode {
    let children = block.children().map(Vec::as_slice).unwrap_or(&[]);
    if children.is_empty() {
        return UploadNode {
            wire: block.to_wire(),
            deferred: Vec::new(),
        };
    }

    // Tables batch rows; the first batch rides along, later batches append.
    if let Block::Table { .. } = block {
        if children.len() > limits.table_row_batch {
            let (inline_rows, deferred_rows) = children.split_at(limits.table_row_batch);
            let mut trimmed = block.clone();
            if let Some(slot) = trimmed.children_mut() {
                *slot = inline_rows.to_vec();
            }
            return UploadNode {
                wire: trimmed.to_wire(),
                deferred: deferred_rows
                    .iter()
                    .map(|row| plan_block(row, limits))
                    .collect(),
            };
        }
        return UploadNode {
            wire: block.to_wire(),
            deferred: Vec::new(),
        };
    }

    let fits_inline = block.subtree_size() - 1 <= limits.inline_subtree
        && max_direct_children(block) <= MAX_CHILDREN_PER_APPEND;
    if fits_inline {
        UploadNode {
            wire: block.to_wire(),
            deferred: Vec::new(),
        }
    } else {
        UploadNode {
            wire: block.to_wire_shallow(),
            deferred: children.iter().map(|c| plan_block(c, limits)).collect(),
        }
    }
}

/// Largest direct-children count anywhere in the subtree
fn max_direct_children(block: &Block) -> usize {
    let children = block.children().map(Vec::as_slice).unwrap_or(&[]);
    children
        .len()
        .max(children.iter().map(max_direct_children).max().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docpress_domain::RichText;

    fn item(text: &str) -> Block {
        Block::BulletedItem {
            rich_text: vec![RichText::plain(text)],
            children: Vec::new(),
        }
    }

    #[test]
    fn oversized_list_chunks_100_100_50() {
        let blocks: Vec<Block> = (0..250).map(|i| item(&format!("item {i}"))).collect();
        let plan = plan(&blocks, &ChunkLimits::default());
        let sizes: Vec<usize> = plan.chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(plan.append_calls(), 3);
        assert_eq!(plan.block_count(), 250);
    }

    #[test]
    fn every_chunk_stays_under_the_append_limit() {
        for size in [1usize, 99, 100, 101, 199, 250, 333, 1000] {
            let blocks: Vec<Block> = (0..size).map(|i| item(&format!("b{i}"))).collect();
            let plan = plan(&blocks, &ChunkLimits::default());
            assert!(
                plan.chunks
                    .iter()
                    .all(|chunk| chunk.len() <= MAX_CHILDREN_PER_APPEND),
                "oversized chunk for input of {size}"
            );
            assert_eq!(
                plan.chunks.iter().map(Vec::len).sum::<usize>(),
                size,
                "blocks lost or duplicated for input of {size}"
            );
        }
    }

    #[test]
    fn chunk_order_preserves_source_order() {
        let blocks: Vec<Block> = (0..120).map(|i| item(&format!("item {i}"))).collect();
        let plan = plan(&blocks, &ChunkLimits::default());
        let first_of_second = &plan.chunks[1][0].wire;
        let text = first_of_second["bulleted_item"]["rich_text"][0]["text"]["content"]
            .as_str()
            .unwrap_or_default();
        assert_eq!(text, "item 100");
    }

    #[test]
    fn small_subtrees_embed_inline() {
        let block = Block::BulletedItem {
            rich_text: vec![RichText::plain("parent")],
            children: vec![item("child")],
        };
        let plan = plan(std::slice::from_ref(&block), &ChunkLimits::default());
        assert_eq!(plan.chunks.len(), 1);
        assert!(plan.chunks[0][0].deferred.is_empty());
        assert!(
            plan.chunks[0][0].wire["bulleted_item"]["children"].is_array(),
            "children embedded in wire"
        );
    }

    #[test]
    fn wide_tables_defer_row_batches() {
        let rows: Vec<Block> = (0..120)
            .map(|i| Block::TableRow {
                cells: vec![vec![RichText::plain(format!("r{i}"))]],
            })
            .collect();
        let table = Block::Table {
            table_width: 1,
            has_column_header: false,
            children: rows,
        };
        let limits = ChunkLimits::default();
        let plan = plan(std::slice::from_ref(&table), &limits);
        let node = &plan.chunks[0][0];
        assert_eq!(node.deferred.len(), 120 - limits.table_row_batch);
        let embedded = node.wire["table"]["children"]
            .as_array()
            .map(Vec::len)
            .unwrap_or(0);
        assert_eq!(embedded, limits.table_row_batch);
    }

    #[test]
    fn deep_subtree_defers_children() {
        let children: Vec<Block> = (0..150).map(|i| item(&format!("c{i}"))).collect();
        let block = Block::Toggle {
            rich_text: vec![RichText::plain("toggle")],
            children,
        };
        let plan = plan(std::slice::from_ref(&block), &ChunkLimits::default());
        let node = &plan.chunks[0][0];
        assert_eq!(node.deferred.len(), 150);
        assert!(node.wire["toggle"].get("children").is_none());
        // 150 deferred children need two append calls plus the chunk itself.
        assert_eq!(plan.append_calls(), 3);
    }
}
