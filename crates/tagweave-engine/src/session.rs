use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::collab::{CollaborativeChannel, RemoteEdit};
use crate::editing::{
    AnnotationId, ApplierState, BlockKey, BlockRange, DocumentSnapshot, HighlightApplier, ResolvedSelection,
    Selection, TagName, TagSet,
};
use crate::error::{AnnotationError, Result};
use crate::tags::{
    DEFAULT_HIGHLIGHT_COLOR, HighlightStyle, Segment, Tag, TagRegistry, highlights, segments_for_tag, tag_counts,
};

/// Where the document source is in loading.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Loading,
    Ready,
    Failed(String),
}

/// Owns the current snapshot, the tag registry and the applier.
///
/// Every successful mutation replaces the snapshot wholesale; earlier
/// snapshots handed out by [`Session::snapshot`] stay valid. Local commits
/// are queued for [`Session::sync_remote`].
#[derive(Debug)]
pub struct Session {
    snapshot: DocumentSnapshot,
    registry: TagRegistry,
    applier: HighlightApplier,
    status: LoadStatus,
    highlight_color: String,
    outbox: Vec<RemoteEdit>,
}

impl Session {
    /// A session waiting for its document.
    pub fn new(registry: TagRegistry) -> Self {
        Self {
            snapshot: DocumentSnapshot::from_text(""),
            registry,
            applier: HighlightApplier::new(),
            status: LoadStatus::Loading,
            highlight_color: DEFAULT_HIGHLIGHT_COLOR.to_string(),
            outbox: Vec::new(),
        }
    }

    /// A session over already loaded text.
    pub fn from_text(text: &str, registry: TagRegistry) -> Self {
        let mut session = Self::new(registry);
        session.load(text);
        session
    }

    pub fn with_highlight_color(mut self, color: impl Into<String>) -> Self {
        self.highlight_color = color.into();
        self
    }

    /// Replace the document with freshly loaded text and mark it ready.
    pub fn load(&mut self, text: &str) {
        self.snapshot = DocumentSnapshot::from_text(text);
        self.applier.cancel();
        self.outbox.clear();
        self.status = LoadStatus::Ready;
        info!(
            "loaded document {} with {} blocks",
            self.snapshot.id(),
            self.snapshot.blocks().len()
        );
    }

    /// Record that the document source could not be read.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("document failed to load: {message}");
        self.applier.cancel();
        self.status = LoadStatus::Failed(message);
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn is_ready(&self) -> bool {
        self.status == LoadStatus::Ready
    }

    pub fn snapshot(&self) -> &DocumentSnapshot {
        &self.snapshot
    }

    pub fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TagRegistry {
        &mut self.registry
    }

    pub fn applier(&self) -> &HighlightApplier {
        &self.applier
    }

    pub fn highlight_color(&self) -> &str {
        &self.highlight_color
    }

    /// Local edits not yet published.
    pub fn outbox(&self) -> &[RemoteEdit] {
        &self.outbox
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(AnnotationError::DocumentNotReady)
        }
    }

    fn commit(&mut self, next: DocumentSnapshot) {
        debug!("commit version {} -> {}", self.snapshot.version(), next.version());
        self.snapshot = next;
    }

    // ============ editing ============

    pub fn resolve_selection(&self, selection: &Selection) -> Result<ResolvedSelection> {
        crate::editing::resolve_selection(&self.snapshot, selection)
    }

    pub fn select(&mut self, selection: &Selection) -> Result<bool> {
        self.ensure_ready()?;
        self.applier.select(&self.snapshot, selection)
    }

    pub fn begin_edit(&mut self, id: AnnotationId) -> Result<()> {
        self.ensure_ready()?;
        self.applier.begin_edit(&self.snapshot, id)
    }

    pub fn apply(&mut self, tags: &TagSet) -> Result<()> {
        self.ensure_ready()?;
        let edit = match self.applier.state() {
            ApplierState::Idle => None,
            ApplierState::SelectingForNew { selection, .. } => Some(RemoteEdit::Highlight {
                selection: selection.clone(),
                tags: tags.clone(),
            }),
            ApplierState::EditingExisting { target } => Some(RemoteEdit::AddTags {
                range: target.range.clone(),
                tags: tags.clone(),
            }),
        };
        let next = self.applier.apply(&self.snapshot, tags)?;
        self.commit(next);
        self.outbox.extend(edit);
        Ok(())
    }

    pub fn delete(&mut self) -> Result<()> {
        self.ensure_ready()?;
        let range = match self.applier.state() {
            ApplierState::EditingExisting { target } => Some(target.range.clone()),
            _ => None,
        };
        let next = self.applier.delete(&self.snapshot)?;
        if next.version() != self.snapshot.version() {
            self.commit(next);
            self.outbox.extend(range.map(|range| RemoteEdit::Clear { range }));
        }
        Ok(())
    }

    pub fn cancel(&mut self) {
        self.applier.cancel();
    }

    pub fn merge_block(&mut self, key: &BlockKey) -> Result<()> {
        self.ensure_ready()?;
        let next = crate::editing::merge_block(&self.snapshot, key)?;
        self.commit(next);
        Ok(())
    }

    pub fn create_tag(&mut self, tag: Tag) -> Result<()> {
        self.registry.create(tag)
    }

    // ============ read models ============

    pub fn highlights(&self) -> Vec<Segment> {
        highlights(&self.snapshot)
    }

    pub fn tag_counts(&self) -> BTreeMap<TagName, usize> {
        tag_counts(&self.snapshot)
    }

    pub fn segments_for_tag(&self, name: &str) -> Vec<Segment> {
        segments_for_tag(&self.snapshot, name)
    }

    pub fn highlight_style(&self, tags: &TagSet) -> HighlightStyle {
        HighlightStyle::resolve(&self.registry, tags, &self.highlight_color)
    }

    // ============ collaboration ============

    /// Replay an edit from another replica through a fresh applier.
    ///
    /// The local applier keeps its state. Edits addressing a range are
    /// matched against the attachment with exactly that interval; a cleared
    /// range that is already clear is a no-op.
    pub fn apply_remote(&mut self, edit: &RemoteEdit) -> Result<()> {
        self.ensure_ready()?;
        let mut applier = HighlightApplier::new();
        let next = match edit {
            RemoteEdit::Highlight { selection, tags } => {
                if !applier.select(&self.snapshot, selection)? {
                    return Ok(());
                }
                applier.apply(&self.snapshot, tags)?
            }
            RemoteEdit::AddTags { range, tags } => {
                let id = self
                    .attachment_at(range)
                    .ok_or_else(|| missing_highlight(range))?;
                applier.begin_edit(&self.snapshot, id)?;
                applier.apply(&self.snapshot, tags)?
            }
            RemoteEdit::Clear { range } => {
                let Some(id) = self.attachment_at(range) else {
                    debug!("remote clear of {}:{:?} already applied", range.block, range.interval);
                    return Ok(());
                };
                applier.begin_edit(&self.snapshot, id)?;
                applier.delete(&self.snapshot)?
            }
        };
        self.commit(next);
        Ok(())
    }

    /// Publish queued local edits, then apply everything received.
    ///
    /// Remote edits that fail are logged and skipped; their errors are
    /// returned in arrival order.
    pub fn sync_remote(&mut self, channel: &mut dyn CollaborativeChannel) -> Vec<AnnotationError> {
        for edit in self.outbox.drain(..) {
            channel.publish(&edit);
        }
        let mut failures = Vec::new();
        for edit in channel.drain() {
            if let Err(err) = self.apply_remote(&edit) {
                warn!("dropping remote edit {edit:?}: {err}");
                failures.push(err);
            }
        }
        failures
    }

    fn attachment_at(&self, range: &BlockRange) -> Option<AnnotationId> {
        self.snapshot
            .attachments(&range.block)
            .iter()
            .find(|attachment| attachment.interval == range.interval)
            .map(|attachment| attachment.annotation)
    }
}

fn missing_highlight(range: &BlockRange) -> AnnotationError {
    AnnotationError::InvalidSelection(format!(
        "no highlight at {} [{}, {})",
        range.block, range.interval.start, range.interval.end
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::LocalChannel;
    use crate::editing::{Interval, format_snapshot, tag_set};
    use pretty_assertions::assert_eq;

    fn ready(text: &str) -> Session {
        Session::from_text(text, TagRegistry::with_defaults())
    }

    fn highlight(session: &mut Session, start: usize, end: usize, tags: &[&str]) {
        assert!(session.select(&Selection::within("b0", start, end)).unwrap());
        session.apply(&tag_set(tags.iter().copied())).unwrap();
    }

    fn range(start: usize, end: usize) -> BlockRange {
        BlockRange {
            block: "b0".into(),
            interval: Interval { start, end },
        }
    }

    // ============ load status ============

    #[test]
    fn test_mutations_wait_for_document() {
        let mut session = Session::new(TagRegistry::with_defaults());

        assert_eq!(session.status(), &LoadStatus::Loading);
        assert_eq!(
            session.select(&Selection::within("b0", 0, 1)),
            Err(AnnotationError::DocumentNotReady)
        );
        assert_eq!(session.apply(&tag_set(["A"])), Err(AnnotationError::DocumentNotReady));

        session.load("hello world");

        assert!(session.is_ready());
        assert_eq!(session.select(&Selection::within("b0", 0, 5)), Ok(true));
    }

    #[test]
    fn test_failed_load_blocks_mutations() {
        let mut session = ready("hello");

        session.fail("disk on fire");

        assert_eq!(session.status(), &LoadStatus::Failed("disk on fire".to_string()));
        assert_eq!(
            session.merge_block(&BlockKey::from("b0")),
            Err(AnnotationError::DocumentNotReady)
        );
    }

    // ============ local editing ============

    #[test]
    fn test_apply_commits_and_queues_edit() {
        let mut session = ready("The quick brown fox");

        highlight(&mut session, 0, 9, &["A"]);

        assert_eq!(session.snapshot().version(), 1);
        assert_eq!(
            session.outbox(),
            &[RemoteEdit::Highlight {
                selection: Selection::within("b0", 0, 9),
                tags: tag_set(["A"]),
            }]
        );
    }

    #[test]
    fn test_failed_apply_queues_nothing() {
        let mut session = ready("The quick brown fox");
        session.select(&Selection::within("b0", 0, 3)).unwrap();

        assert_eq!(session.apply(&TagSet::new()), Err(AnnotationError::InvalidAnnotation));
        assert!(session.outbox().is_empty());
        assert_eq!(session.snapshot().version(), 0);
    }

    #[test]
    fn test_edit_and_delete_queue_range_edits() {
        let mut session = ready("The quick brown fox");
        highlight(&mut session, 4, 9, &["A"]);
        let id = session.snapshot().annotation_at(&BlockKey::from("b0"), 4).unwrap();

        session.begin_edit(id).unwrap();
        session.apply(&tag_set(["B"])).unwrap();
        let id = session.snapshot().annotation_at(&BlockKey::from("b0"), 4).unwrap();
        session.begin_edit(id).unwrap();
        session.delete().unwrap();

        assert_eq!(
            &session.outbox()[1..],
            &[
                RemoteEdit::AddTags {
                    range: range(4, 9),
                    tags: tag_set(["B"]),
                },
                RemoteEdit::Clear { range: range(4, 9) },
            ]
        );
        assert!(session.highlights().is_empty());
    }

    #[test]
    fn test_highlight_style_uses_session_fallback() {
        let session = ready("text").with_highlight_color("#abcdef");

        assert_eq!(session.highlight_style(&tag_set(["orphan"])).color, "#abcdef");
        assert_eq!(session.highlight_style(&tag_set(["review"])).color, "#1976D2");
    }

    // ============ collaboration ============

    #[test]
    fn test_sync_replays_edits_on_peer() {
        let mut alice = ready("The quick brown fox");
        let mut bob = ready("The quick brown fox");
        let mut wire = LocalChannel::new();

        highlight(&mut alice, 0, 9, &["A"]);
        highlight(&mut alice, 4, 15, &["B"]);
        assert!(alice.sync_remote(&mut wire).is_empty());
        assert!(alice.outbox().is_empty());

        for edit in wire.take_published() {
            wire.receive(edit);
        }
        assert!(bob.sync_remote(&mut wire).is_empty());

        assert_eq!(format_snapshot(bob.snapshot()), format_snapshot(alice.snapshot()));
        assert_eq!(bob.tag_counts(), alice.tag_counts());
    }

    #[test]
    fn test_remote_add_tags_targets_range() {
        let mut session = ready("The quick brown fox");
        highlight(&mut session, 4, 9, &["A"]);

        session
            .apply_remote(&RemoteEdit::AddTags {
                range: range(4, 9),
                tags: tag_set(["B"]),
            })
            .unwrap();

        let segments = session.highlights();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].tags, tag_set(["A", "B"]));
    }

    #[test]
    fn test_remote_edit_leaves_local_applier_alone() {
        let mut session = ready("The quick brown fox");
        session.select(&Selection::within("b0", 10, 15)).unwrap();

        session
            .apply_remote(&RemoteEdit::Highlight {
                selection: Selection::within("b0", 0, 3),
                tags: tag_set(["remote"]),
            })
            .unwrap();

        assert!(matches!(session.applier().state(), ApplierState::SelectingForNew { .. }));
        session.apply(&tag_set(["local"])).unwrap();
        assert_eq!(session.tag_counts().len(), 2);
    }

    #[test]
    fn test_remote_clear_of_missing_range_is_noop() {
        let mut session = ready("The quick brown fox");

        session.apply_remote(&RemoteEdit::Clear { range: range(0, 3) }).unwrap();

        assert_eq!(session.snapshot().version(), 0);
    }

    #[test]
    fn test_failing_remote_edits_are_reported_and_skipped() {
        let mut session = ready("The quick brown fox");
        let mut wire = LocalChannel::new();
        wire.receive(RemoteEdit::AddTags {
            range: range(0, 3),
            tags: tag_set(["A"]),
        });
        wire.receive(RemoteEdit::Highlight {
            selection: Selection::within("b0", 0, 3),
            tags: tag_set(["B"]),
        });

        let failures = session.sync_remote(&mut wire);

        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], AnnotationError::InvalidSelection(_)));
        assert_eq!(session.tag_counts(), BTreeMap::from([("B".to_string(), 1)]));
    }
}
