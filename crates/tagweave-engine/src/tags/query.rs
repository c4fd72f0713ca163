use std::collections::BTreeMap;

use serde::Serialize;

use crate::editing::{AnnotationId, BlockKey, DocumentSnapshot, Interval, TagName, TagSet};

/// Read model of one attachment: where it is, what it covers, and its tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub block: BlockKey,
    pub interval: Interval,
    pub text: String,
    pub tags: TagSet,
    pub annotation: AnnotationId,
}

/// Every highlighted segment in document order.
///
/// Attachments whose annotation record is missing are skipped.
pub fn highlights(doc: &DocumentSnapshot) -> Vec<Segment> {
    doc.blocks()
        .iter()
        .flat_map(|block| {
            doc.attachments(block.key()).iter().filter_map(move |attachment| {
                let annotation = doc.annotations().get(attachment.annotation).ok()?;
                Some(Segment {
                    block: block.key().clone(),
                    interval: attachment.interval,
                    text: block.slice(attachment.interval.start, attachment.interval.end),
                    tags: annotation.tags.clone(),
                    annotation: attachment.annotation,
                })
            })
        })
        .collect()
}

/// Usage count per tag, recomputed from scratch: one per segment carrying it.
pub fn tag_counts(doc: &DocumentSnapshot) -> BTreeMap<TagName, usize> {
    let mut counts = BTreeMap::new();
    for segment in highlights(doc) {
        for tag in segment.tags {
            *counts.entry(tag).or_insert(0) += 1;
        }
    }
    counts
}

/// Segments tagged `name` or any dotted child of it (`name.sub`).
pub fn segments_for_tag(doc: &DocumentSnapshot, name: &str) -> Vec<Segment> {
    highlights(doc)
        .into_iter()
        .filter(|segment| segment.tags.iter().any(|tag| matches_tag(tag, name)))
        .collect()
}

/// `candidate` is `filter` itself or nested below it with a `.` separator.
pub fn matches_tag(candidate: &str, filter: &str) -> bool {
    candidate
        .strip_prefix(filter)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}
