//! Extension point for sharing edits with other replicas.
//!
//! Edits travel by range rather than by annotation id: ids are local to a
//! replica and churn on every merge. Incoming edits are replayed through the
//! same applier pipeline as local ones, last writer wins.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::editing::{BlockRange, Selection, TagSet};

/// One committed local change, in a form another replica can replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RemoteEdit {
    /// A new highlight over `selection`
    Highlight { selection: Selection, tags: TagSet },
    /// Tags unioned into the highlight at `range`
    AddTags { range: BlockRange, tags: TagSet },
    /// The highlight at `range` was cleared
    Clear { range: BlockRange },
}

pub trait CollaborativeChannel {
    /// Send a local edit to the other replicas.
    fn publish(&mut self, edit: &RemoteEdit);

    /// Take every edit received since the last drain, oldest first.
    fn drain(&mut self) -> Vec<RemoteEdit>;
}

/// In-process channel; useful for tests and for wiring two sessions together.
#[derive(Debug, Clone, Default)]
pub struct LocalChannel {
    inbox: VecDeque<RemoteEdit>,
    published: Vec<RemoteEdit>,
}

impl LocalChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an edit as if it had arrived from another replica.
    pub fn receive(&mut self, edit: RemoteEdit) {
        self.inbox.push_back(edit);
    }

    pub fn published(&self) -> &[RemoteEdit] {
        &self.published
    }

    /// Hand everything published so far over to the caller.
    pub fn take_published(&mut self) -> Vec<RemoteEdit> {
        std::mem::take(&mut self.published)
    }
}

impl CollaborativeChannel for LocalChannel {
    fn publish(&mut self, edit: &RemoteEdit) {
        self.published.push(edit.clone());
    }

    fn drain(&mut self) -> Vec<RemoteEdit> {
        self.inbox.drain(..).collect()
    }
}
