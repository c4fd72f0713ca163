use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;
use std::sync::Arc;

use uuid::Uuid;

use crate::editing::{AnnotationId, AnnotationTable, Attachment, Block, BlockKey, blocks_from_text};
use crate::error::{AnnotationError, Result};

/// Immutable view of an annotated document.
///
/// Snapshots are cheap to clone: blocks, annotation records and attachment
/// lists are shared through `Arc`s and copied only when a new snapshot is
/// derived and mutated. Readers holding an older snapshot never observe a
/// partially merged block.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    id: Uuid,
    version: u64,
    blocks: Arc<Vec<Block>>,
    annotations: Arc<AnnotationTable>,
    attachments: Arc<BTreeMap<BlockKey, Vec<Attachment>>>,
}

impl DocumentSnapshot {
    /// Build a snapshot from flat text, one block per line.
    pub fn from_text(text: &str) -> Self {
        Self::with_blocks(blocks_from_text(text))
    }

    /// Build a snapshot over an existing block sequence.
    ///
    /// Attachments are keyed by block, so every key must be unique.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        if let Some(block) = blocks.iter().find(|block| !seen.insert(block.key())) {
            return Err(AnnotationError::DuplicateBlock(block.key().clone()));
        }
        Ok(Self::with_blocks(blocks))
    }

    fn with_blocks(blocks: Vec<Block>) -> Self {
        Self {
            id: Uuid::new_v4(),
            version: 0,
            blocks: Arc::new(blocks),
            annotations: Arc::new(AnnotationTable::new()),
            attachments: Arc::new(BTreeMap::new()),
        }
    }

    /// Document identity, shared by every snapshot derived from this one.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, key: &BlockKey) -> Option<&Block> {
        self.blocks.iter().find(|block| block.key() == key)
    }

    pub fn block_index(&self, key: &BlockKey) -> Option<usize> {
        self.blocks.iter().position(|block| block.key() == key)
    }

    pub fn annotations(&self) -> &AnnotationTable {
        &self.annotations
    }

    /// Attachments of one block in stored order (empty for unknown blocks).
    pub fn attachments(&self, key: &BlockKey) -> &[Attachment] {
        self.attachments.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The annotation covering `offset` in a block, if any.
    pub fn annotation_at(&self, key: &BlockKey, offset: usize) -> Option<AnnotationId> {
        self.attachments(key)
            .iter()
            .find(|a| a.interval.start <= offset && offset < a.interval.end)
            .map(|a| a.annotation)
    }

    /// Full document text with blocks joined by newlines.
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Derive the next snapshot; shares all data until it is mutated.
    pub(crate) fn next_version(&self) -> Self {
        let mut next = self.clone();
        next.version += 1;
        next
    }

    pub(crate) fn annotations_mut(&mut self) -> &mut AnnotationTable {
        Arc::make_mut(&mut self.annotations)
    }

    pub(crate) fn attach(&mut self, key: &BlockKey, attachment: Attachment) {
        Arc::make_mut(&mut self.attachments)
            .entry(key.clone())
            .or_default()
            .push(attachment);
    }

    /// Swap in a block's whole attachment list; an empty list drops the entry.
    pub(crate) fn replace_attachments(&mut self, key: &BlockKey, attachments: Vec<Attachment>) {
        let map = Arc::make_mut(&mut self.attachments);
        if attachments.is_empty() {
            map.remove(key);
        } else {
            map.insert(key.clone(), attachments);
        }
    }

    /// Remove annotation records no attachment refers to any more.
    pub(crate) fn prune_annotations(&mut self) -> usize {
        let referenced: BTreeSet<AnnotationId> = self
            .attachments
            .values()
            .flatten()
            .map(|a| a.annotation)
            .collect();
        if self.annotations.iter().all(|a| referenced.contains(&a.id)) {
            return 0;
        }
        self.annotations_mut().retain_referenced(&referenced)
    }
}

/// Render a snapshot as readable text for snapshot testing and debugging.
///
/// Each block is printed with its key and text, followed by one indented
/// line per attachment showing the range, the covered text and the tags of
/// the attached annotation (`?` when the record is missing).
pub fn format_snapshot(snapshot: &DocumentSnapshot) -> String {
    let mut out = String::new();
    for block in snapshot.blocks() {
        let _ = writeln!(out, "{} {:?}", block.key(), block.text());
        for attachment in snapshot.attachments(block.key()) {
            let tags = match snapshot.annotations().get(attachment.annotation) {
                Ok(annotation) => annotation
                    .tags
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
                Err(_) => "?".to_string(),
            };
            let _ = writeln!(
                out,
                "  [{}, {}) {:?} {{{}}}",
                attachment.interval.start,
                attachment.interval.end,
                block.slice(attachment.interval.start, attachment.interval.end),
                tags
            );
        }
    }
    out
}
