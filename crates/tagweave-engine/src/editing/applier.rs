use log::debug;

use crate::editing::{
    AnnotationId, Attachment, BlockRange, DocumentSnapshot, ResolvedSelection, Selection, TagSet,
    merge_block, merge_blocks, resolve_selection,
};
use crate::error::{AnnotationError, Result};

/// The highlight under edit.
///
/// The id is only a hint: any merge issues fresh ids, so the target is also
/// remembered by its block range and the tag set it had when the edit began.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditTarget {
    pub annotation: AnnotationId,
    pub tags: TagSet,
    pub range: BlockRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ApplierState {
    #[default]
    Idle,
    SelectingForNew {
        selection: Selection,
        resolved: ResolvedSelection,
    },
    EditingExisting {
        target: EditTarget,
    },
}

/// Create-or-edit state machine for highlights.
///
/// Operations take the current snapshot by reference and hand back the
/// snapshot to commit; the applier itself only holds the working selection
/// or edit target. A failed operation keeps both its state and the
/// caller's snapshot as they were.
#[derive(Debug, Clone, Default)]
pub struct HighlightApplier {
    state: ApplierState,
}

impl HighlightApplier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ApplierState {
        &self.state
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, ApplierState::EditingExisting { .. })
    }

    /// Tags of the highlight under edit, if any.
    pub fn working_tags(&self) -> Option<&TagSet> {
        match &self.state {
            ApplierState::EditingExisting { target } => Some(&target.tags),
            _ => None,
        }
    }

    /// Offer a selection for a new highlight.
    ///
    /// Returns `Ok(true)` and enters `SelectingForNew` (abandoning any edit
    /// in progress) when the selection covers text that is not blank.
    /// Collapsed or whitespace-only selections return `Ok(false)` and leave
    /// the state alone.
    pub fn select(&mut self, doc: &DocumentSnapshot, selection: &Selection) -> Result<bool> {
        let resolved = resolve_selection(doc, selection)?;
        if resolved.is_empty() || resolved.text.trim().is_empty() {
            return Ok(false);
        }
        debug!("selected {:?} for a new highlight", resolved.text);
        self.state = ApplierState::SelectingForNew {
            selection: selection.clone(),
            resolved,
        };
        Ok(true)
    }

    /// Start editing an existing highlight, signalled by its id alone.
    ///
    /// Loads the first range the annotation is attached to, in document
    /// order, together with its current tags.
    pub fn begin_edit(&mut self, doc: &DocumentSnapshot, id: AnnotationId) -> Result<()> {
        let annotation = doc.annotations().get(id)?;
        let range = doc
            .blocks()
            .iter()
            .find_map(|block| {
                doc.attachments(block.key())
                    .iter()
                    .find(|attachment| attachment.annotation == id)
                    .map(|attachment| BlockRange {
                        block: block.key().clone(),
                        interval: attachment.interval,
                    })
            })
            .ok_or(AnnotationError::NotFound(id))?;

        debug!("editing highlight {id} at {}:{:?}", range.block, range.interval);
        self.state = ApplierState::EditingExisting {
            target: EditTarget {
                annotation: id,
                tags: annotation.tags.clone(),
                range,
            },
        };
        Ok(())
    }

    /// Apply tags to the current target and return the snapshot to commit.
    ///
    /// Editing unions the new tags into the existing ones; it never removes
    /// a tag. A new highlight is attached to every range of the selection
    /// and each touched block is merged.
    pub fn apply(&mut self, doc: &DocumentSnapshot, tags: &TagSet) -> Result<DocumentSnapshot> {
        let next = match &self.state {
            ApplierState::Idle => return Err(AnnotationError::NoTarget),
            ApplierState::EditingExisting { target } => apply_edit(doc, target, tags)?,
            ApplierState::SelectingForNew { resolved, .. } => apply_new(doc, resolved, tags)?,
        };
        self.state = ApplierState::Idle;
        Ok(next)
    }

    /// Clear the range of the highlight under edit.
    ///
    /// Attachments overlapping the range are trimmed to the parts outside
    /// it. A range that is already clear is a no-op.
    pub fn delete(&mut self, doc: &DocumentSnapshot) -> Result<DocumentSnapshot> {
        let ApplierState::EditingExisting { target } = &self.state else {
            return Err(AnnotationError::NoTarget);
        };
        let range = &target.range;
        let current = doc.attachments(&range.block);
        if !current.iter().any(|a| a.interval.overlaps(&range.interval)) {
            debug!("highlight at {}:{:?} already cleared", range.block, range.interval);
            self.state = ApplierState::Idle;
            return Ok(doc.clone());
        }

        let trimmed: Vec<Attachment> = current
            .iter()
            .flat_map(|attachment| {
                attachment
                    .interval
                    .subtract(&range.interval)
                    .into_iter()
                    .map(|interval| Attachment {
                        interval,
                        annotation: attachment.annotation,
                    })
            })
            .collect();

        let mut next = doc.next_version();
        next.replace_attachments(&range.block, trimmed);
        next.prune_annotations();
        let next = merge_block(&next, &range.block)?;
        debug!("cleared {}:{:?}", range.block, range.interval);
        self.state = ApplierState::Idle;
        Ok(next)
    }

    /// Drop any working selection or edit. Never touches the document.
    pub fn cancel(&mut self) {
        self.state = ApplierState::Idle;
    }
}

fn apply_edit(doc: &DocumentSnapshot, target: &EditTarget, tags: &TagSet) -> Result<DocumentSnapshot> {
    let id = resolve_target(doc, target)?;
    let merged: TagSet = target.tags.union(tags).cloned().collect();
    debug!("edit {id}: {:?} -> {:?}", target.tags, merged);

    let mut next = doc.next_version();
    next.annotations_mut().replace_tags(id, merged)?;
    merge_block(&next, &target.range.block)
}

fn apply_new(doc: &DocumentSnapshot, resolved: &ResolvedSelection, tags: &TagSet) -> Result<DocumentSnapshot> {
    let mut next = doc.next_version();
    let id = next.annotations_mut().create(tags.clone())?;
    for range in &resolved.ranges {
        next.attach(
            &range.block,
            Attachment {
                interval: range.interval,
                annotation: id,
            },
        );
    }
    debug!(
        "new highlight {id} with {:?} over {} range(s)",
        tags,
        resolved.ranges.len()
    );
    merge_blocks(&next, resolved.ranges.iter().map(|range| &range.block))
}

/// Find the annotation currently standing for an edit target.
///
/// The remembered id wins if it is still attached at the remembered range;
/// otherwise an attachment with the same range and pre-edit tags is used.
fn resolve_target(doc: &DocumentSnapshot, target: &EditTarget) -> Result<AnnotationId> {
    let attachments = doc.attachments(&target.range.block);
    let at_range = |attachment: &&Attachment| attachment.interval == target.range.interval;

    if attachments
        .iter()
        .filter(at_range)
        .any(|attachment| attachment.annotation == target.annotation)
        && doc.annotations().contains(target.annotation)
    {
        return Ok(target.annotation);
    }

    attachments
        .iter()
        .filter(at_range)
        .find(|attachment| {
            doc.annotations()
                .get(attachment.annotation)
                .is_ok_and(|annotation| annotation.tags == target.tags)
        })
        .map(|attachment| attachment.annotation)
        .ok_or(AnnotationError::NotFound(target.annotation))
}
