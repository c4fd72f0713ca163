//! Overlap merging: collapse a block's possibly overlapping attachments into
//! sorted, disjoint segments whose tag sets are the union of every interval
//! fully covering them.

use std::collections::BTreeSet;

use log::debug;
use serde::Serialize;

use crate::editing::{Attachment, BlockKey, DocumentSnapshot, Interval, TagSet};
use crate::error::{AnnotationError, Result};

/// One output segment of the merge algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedSegment {
    pub interval: Interval,
    pub tags: TagSet,
}

/// Partition `[0, block_len)` at every interval boundary and union tags.
///
/// A candidate segment `[b_i, b_i+1)` takes the tags of every input interval
/// with `start <= b_i` and `end >= b_i+1`. Intervals that only partially
/// overlap a candidate contribute nothing to it. Candidates with no tags are
/// dropped, and adjacent segments with equal tag sets stay separate.
pub fn merge_intervals(block_len: usize, intervals: &[(Interval, &TagSet)]) -> Result<Vec<MergedSegment>> {
    for (interval, _) in intervals {
        if interval.is_empty() {
            return Err(AnnotationError::DegenerateInterval {
                start: interval.start,
                end: interval.end,
            });
        }
        if interval.end > block_len {
            return Err(AnnotationError::IntervalOutOfBounds {
                end: interval.end,
                len: block_len,
            });
        }
    }

    let mut boundaries = BTreeSet::from([0, block_len]);
    for (interval, _) in intervals {
        boundaries.insert(interval.start);
        boundaries.insert(interval.end);
    }
    let boundaries: Vec<usize> = boundaries.into_iter().collect();

    let segments = boundaries
        .windows(2)
        .filter_map(|pair| {
            let (start, end) = (pair[0], pair[1]);
            let tags: TagSet = intervals
                .iter()
                .filter(|(interval, _)| interval.covers(start, end))
                .flat_map(|(_, tags)| tags.iter().cloned())
                .collect();
            (!tags.is_empty()).then_some(MergedSegment {
                interval: Interval { start, end },
                tags,
            })
        })
        .collect();
    Ok(segments)
}

/// Renormalize one block's attachments and return the resulting snapshot.
///
/// Every retained segment gets a freshly created annotation: ids held from
/// before the merge no longer resolve. The whole attachment list of the
/// block is replaced and records left unreferenced are pruned. A block with
/// no attachments is returned unchanged.
pub fn merge_block(doc: &DocumentSnapshot, key: &BlockKey) -> Result<DocumentSnapshot> {
    let block = doc
        .block(key)
        .ok_or_else(|| AnnotationError::UnknownBlock(key.clone()))?;
    let attachments = doc.attachments(key);
    if attachments.is_empty() {
        return Ok(doc.clone());
    }

    let inputs = attachments
        .iter()
        .map(|attachment| {
            doc.annotations()
                .get(attachment.annotation)
                .map(|annotation| (attachment.interval, &annotation.tags))
        })
        .collect::<Result<Vec<_>>>()?;
    let segments = merge_intervals(block.len(), &inputs)?;

    let mut next = doc.next_version();
    let mut merged = Vec::with_capacity(segments.len());
    for segment in segments {
        let annotation = next.annotations_mut().create(segment.tags)?;
        merged.push(Attachment {
            interval: segment.interval,
            annotation,
        });
    }
    debug!(
        "merged block {key}: {} attachments -> {} segments",
        attachments.len(),
        merged.len()
    );
    next.replace_attachments(key, merged);
    next.prune_annotations();
    Ok(next)
}

/// Merge several blocks in turn, skipping repeated keys.
pub fn merge_blocks<'a>(
    doc: &DocumentSnapshot,
    keys: impl IntoIterator<Item = &'a BlockKey>,
) -> Result<DocumentSnapshot> {
    let mut seen = BTreeSet::new();
    let mut current = doc.clone();
    for key in keys {
        if seen.insert(key) {
            current = merge_block(&current, key)?;
        }
    }
    Ok(current)
}
