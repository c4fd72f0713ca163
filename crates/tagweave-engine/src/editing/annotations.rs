use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AnnotationError, Result};

pub type TagName = String;
pub type TagSet = BTreeSet<TagName>;

/// Build a tag set from anything string-like.
pub fn tag_set<I, S>(tags: I) -> TagSet
where
    I: IntoIterator<Item = S>,
    S: Into<TagName>,
{
    tags.into_iter().map(Into::into).collect()
}

/// Identifier of an annotation record, assigned monotonically per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(u64);

impl AnnotationId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnnotationKind {
    #[default]
    Highlight,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub tags: TagSet,
    pub kind: AnnotationKind,
}

/// Annotation records owned by a document snapshot.
///
/// The table is stored behind an `Arc` in the snapshot and cloned on write,
/// so every mutation is observed only by the snapshot that made it. The
/// `version` counter is bumped on each mutation for consumers that diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationTable {
    records: BTreeMap<AnnotationId, Annotation>,
    next_id: u64,
    version: u64,
}

impl AnnotationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, tags: TagSet) -> Result<AnnotationId> {
        if tags.is_empty() {
            return Err(AnnotationError::InvalidAnnotation);
        }
        self.next_id += 1;
        let id = AnnotationId(self.next_id);
        self.records.insert(
            id,
            Annotation {
                id,
                tags,
                kind: AnnotationKind::Highlight,
            },
        );
        self.version += 1;
        Ok(id)
    }

    pub fn get(&self, id: AnnotationId) -> Result<&Annotation> {
        self.records.get(&id).ok_or(AnnotationError::NotFound(id))
    }

    pub fn replace_tags(&mut self, id: AnnotationId, tags: TagSet) -> Result<()> {
        if tags.is_empty() {
            return Err(AnnotationError::InvalidAnnotation);
        }
        let record = self
            .records
            .get_mut(&id)
            .ok_or(AnnotationError::NotFound(id))?;
        record.tags = tags;
        self.version += 1;
        Ok(())
    }

    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let removed = self.records.remove(&id);
        if removed.is_some() {
            self.version += 1;
        }
        removed
    }

    pub fn contains(&self, id: AnnotationId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.records.values()
    }

    /// Drop every record whose id is not in `referenced`; returns how many went.
    pub(crate) fn retain_referenced(&mut self, referenced: &BTreeSet<AnnotationId>) -> usize {
        let before = self.records.len();
        self.records.retain(|id, _| referenced.contains(id));
        let pruned = before - self.records.len();
        if pruned > 0 {
            self.version += 1;
        }
        pruned
    }
}
