use serde::{Deserialize, Serialize};

use crate::editing::{BlockKey, DocumentSnapshot, Interval};
use crate::error::{AnnotationError, Result};

/// A user-designated range, possibly spanning several blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub start_block: BlockKey,
    pub start_offset: usize,
    pub end_block: BlockKey,
    pub end_offset: usize,
}

impl Selection {
    pub fn new(
        start_block: impl Into<BlockKey>,
        start_offset: usize,
        end_block: impl Into<BlockKey>,
        end_offset: usize,
    ) -> Self {
        Self {
            start_block: start_block.into(),
            start_offset,
            end_block: end_block.into(),
            end_offset,
        }
    }

    /// Selection inside a single block.
    pub fn within(block: impl Into<BlockKey>, start: usize, end: usize) -> Self {
        let block = block.into();
        Self::new(block.clone(), start, block, end)
    }

    pub fn is_collapsed(&self) -> bool {
        self.start_block == self.end_block && self.start_offset == self.end_offset
    }
}

/// A concrete range inside one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRange {
    pub block: BlockKey,
    pub interval: Interval,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedSelection {
    /// Selected text, block boundaries joined with `\n`
    pub text: String,
    /// Touched block ranges in document order
    pub ranges: Vec<BlockRange>,
}

impl ResolvedSelection {
    /// True when nothing was selected (collapsed selection).
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Resolve a selection against a snapshot into text plus per-block ranges.
///
/// Collapsed selections resolve to empty text and no ranges. Block pieces of
/// zero width (a selection starting exactly at the end of a block, or an
/// empty block in the middle) contribute their line break to the text but
/// produce no range.
pub fn resolve_selection(doc: &DocumentSnapshot, selection: &Selection) -> Result<ResolvedSelection> {
    let start_index = doc
        .block_index(&selection.start_block)
        .ok_or_else(|| AnnotationError::UnknownBlock(selection.start_block.clone()))?;
    let end_index = doc
        .block_index(&selection.end_block)
        .ok_or_else(|| AnnotationError::UnknownBlock(selection.end_block.clone()))?;

    if start_index > end_index {
        return Err(AnnotationError::InvalidSelection(format!(
            "block {} comes after block {}",
            selection.start_block, selection.end_block
        )));
    }
    if start_index == end_index && selection.start_offset > selection.end_offset {
        return Err(AnnotationError::InvalidSelection(format!(
            "start offset {} is after end offset {}",
            selection.start_offset, selection.end_offset
        )));
    }

    let blocks = &doc.blocks()[start_index..=end_index];
    let first = &blocks[0];
    let last = &blocks[blocks.len() - 1];
    if selection.start_offset > first.len() {
        return Err(AnnotationError::InvalidSelection(format!(
            "start offset {} is past the end of block {}",
            selection.start_offset,
            first.key()
        )));
    }
    if selection.end_offset > last.len() {
        return Err(AnnotationError::InvalidSelection(format!(
            "end offset {} is past the end of block {}",
            selection.end_offset,
            last.key()
        )));
    }

    if selection.is_collapsed() {
        return Ok(ResolvedSelection::default());
    }

    let mut resolved = ResolvedSelection::default();
    for (position, block) in blocks.iter().enumerate() {
        let is_first = position == 0;
        let is_last = position == blocks.len() - 1;
        let from = if is_first { selection.start_offset } else { 0 };
        let to = if is_last {
            selection.end_offset
        } else {
            block.len()
        };

        resolved.text.push_str(&block.slice(from, to));
        if !is_last {
            resolved.text.push('\n');
        }
        if from < to {
            resolved.ranges.push(BlockRange {
                block: block.key().clone(),
                interval: Interval {
                    start: from,
                    end: to,
                },
            });
        }
    }
    Ok(resolved)
}
