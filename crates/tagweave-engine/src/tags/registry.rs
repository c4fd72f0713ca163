use std::fmt;

use log::{debug, warn};
use thiserror::Error;

use crate::error::{AnnotationError, Result};
use crate::tags::Tag;

/// Failure reported by a tag persistence backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("tag store: {0}")]
pub struct TagStoreError(pub String);

/// Remote persistence for registry changes.
///
/// The registry updates its local state first and only then tells the
/// store; a failing store never rolls local state back.
pub trait TagStore {
    fn create(&mut self, tag: &Tag) -> std::result::Result<(), TagStoreError>;
    fn update(&mut self, tag: &Tag) -> std::result::Result<(), TagStoreError>;
    fn delete(&mut self, name: &str) -> std::result::Result<(), TagStoreError>;
}

/// The set of known tags, kept sorted by name.
#[derive(Default)]
pub struct TagRegistry {
    tags: Vec<Tag>,
    store: Option<Box<dyn TagStore>>,
}

impl fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagRegistry")
            .field("tags", &self.tags)
            .field("has_store", &self.store.is_some())
            .finish()
    }
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The starter palette offered before any tag has been created.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for tag in default_tags() {
            registry.insert_sorted(tag);
        }
        registry
    }

    /// Build a registry from existing tags, skipping case-insensitive duplicates.
    pub fn from_tags(tags: impl IntoIterator<Item = Tag>) -> Self {
        let mut registry = Self::new();
        for tag in tags {
            if let Err(err) = registry.create(tag) {
                warn!("skipping tag: {err}");
            }
        }
        registry
    }

    pub fn with_store(mut self, store: Box<dyn TagStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter()
    }

    /// Exact-name lookup.
    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.name == name)
    }

    /// Case-insensitive lookup.
    pub fn find(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.same_name(name))
    }

    pub fn create(&mut self, tag: Tag) -> Result<()> {
        if self.find(&tag.name).is_some() {
            return Err(AnnotationError::DuplicateTag(tag.name));
        }
        debug!("creating tag '{}'", tag.name);
        let index = self.insert_sorted(tag);
        self.persist(|store, tags| store.create(&tags[index]));
        Ok(())
    }

    /// Replace the tag carrying the same name.
    pub fn update(&mut self, tag: Tag) -> Result<()> {
        let index = self
            .tags
            .iter()
            .position(|existing| existing.name == tag.name)
            .ok_or_else(|| AnnotationError::UnknownTag(tag.name.clone()))?;
        self.tags[index] = tag;
        self.persist(|store, tags| store.update(&tags[index]));
        Ok(())
    }

    /// Remove a tag. Annotations citing it keep the name as an orphan reference.
    pub fn delete(&mut self, name: &str) -> Result<Tag> {
        let index = self
            .tags
            .iter()
            .position(|tag| tag.name == name)
            .ok_or_else(|| AnnotationError::UnknownTag(name.to_string()))?;
        let removed = self.tags.remove(index);
        self.persist(|store, _| store.delete(name));
        Ok(removed)
    }

    fn insert_sorted(&mut self, tag: Tag) -> usize {
        let key = sort_key(&tag.name);
        let index = self
            .tags
            .partition_point(|existing| sort_key(&existing.name) <= key);
        self.tags.insert(index, tag);
        index
    }

    fn persist<F>(&mut self, call: F)
    where
        F: FnOnce(&mut Box<dyn TagStore>, &[Tag]) -> std::result::Result<(), TagStoreError>,
    {
        if let Some(store) = self.store.as_mut()
            && let Err(err) = call(store, &self.tags)
        {
            warn!("{err}; keeping local tag state");
        }
    }
}

fn sort_key(name: &str) -> (String, &str) {
    (name.to_lowercase(), name)
}

fn default_tags() -> Vec<Tag> {
    vec![
        Tag::new("interesting", "#FFC107").with_description("Default tag: interesting"),
        Tag::new("important", "#D32F2F").with_description("Important info"),
        Tag::new("review", "#1976D2").with_description("For review"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn names(registry: &TagRegistry) -> Vec<&str> {
        registry.iter().map(|tag| tag.name.as_str()).collect()
    }

    /// Records calls and optionally fails them.
    #[derive(Clone, Default)]
    struct RecordingStore {
        calls: Rc<RefCell<Vec<String>>>,
        fail: bool,
    }

    impl RecordingStore {
        fn record(&self, call: String) -> std::result::Result<(), TagStoreError> {
            self.calls.borrow_mut().push(call);
            if self.fail {
                Err(TagStoreError("offline".to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl TagStore for RecordingStore {
        fn create(&mut self, tag: &Tag) -> std::result::Result<(), TagStoreError> {
            self.record(format!("create {}", tag.name))
        }

        fn update(&mut self, tag: &Tag) -> std::result::Result<(), TagStoreError> {
            self.record(format!("update {}", tag.name))
        }

        fn delete(&mut self, name: &str) -> std::result::Result<(), TagStoreError> {
            self.record(format!("delete {name}"))
        }
    }

    #[test]
    fn test_defaults_are_sorted() {
        let registry = TagRegistry::with_defaults();

        assert_eq!(names(&registry), vec!["important", "interesting", "review"]);
        assert_eq!(registry.get("important").unwrap().color, "#D32F2F");
    }

    #[test]
    fn test_create_keeps_sorted_order() {
        let mut registry = TagRegistry::with_defaults();

        registry.create(Tag::new("Alpha", "#000000")).unwrap();
        registry.create(Tag::new("project.sub", "#111111")).unwrap();

        assert_eq!(
            names(&registry),
            vec!["Alpha", "important", "interesting", "project.sub", "review"]
        );
    }

    #[test]
    fn test_create_rejects_case_insensitive_duplicate() {
        let mut registry = TagRegistry::with_defaults();

        let result = registry.create(Tag::new("IMPORTANT", "#000000"));

        assert_eq!(result, Err(AnnotationError::DuplicateTag("IMPORTANT".to_string())));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_update_replaces_metadata() {
        let mut registry = TagRegistry::with_defaults();

        registry
            .update(Tag::new("review", "#ABCDEF").with_description("Second look"))
            .unwrap();

        let tag = registry.get("review").unwrap();
        assert_eq!(tag.color, "#ABCDEF");
        assert_eq!(tag.description.as_deref(), Some("Second look"));
    }

    #[test]
    fn test_update_unknown_tag() {
        let mut registry = TagRegistry::new();

        assert_eq!(
            registry.update(Tag::new("ghost", "#000000")),
            Err(AnnotationError::UnknownTag("ghost".to_string()))
        );
    }

    #[test]
    fn test_delete_removes_tag() {
        let mut registry = TagRegistry::with_defaults();

        let removed = registry.delete("review").unwrap();

        assert_eq!(removed.name, "review");
        assert!(registry.get("review").is_none());
        assert!(registry.delete("review").is_err());
    }

    #[test]
    fn test_from_tags_skips_duplicates() {
        let registry = TagRegistry::from_tags([
            Tag::new("a", "#000000"),
            Tag::new("A", "#111111"),
            Tag::new("b", "#222222"),
        ]);

        assert_eq!(names(&registry), vec!["a", "b"]);
        assert_eq!(registry.find("A").unwrap().color, "#000000");
    }

    #[test]
    fn test_store_is_called_after_local_change() {
        let store = RecordingStore::default();
        let calls = store.calls.clone();
        let mut registry = TagRegistry::new().with_store(Box::new(store));

        registry.create(Tag::new("a", "#000000")).unwrap();
        registry.update(Tag::new("a", "#FFFFFF")).unwrap();
        registry.delete("a").unwrap();

        assert_eq!(*calls.borrow(), vec!["create a", "update a", "delete a"]);
    }

    #[test]
    fn test_store_failure_keeps_local_state() {
        let store = RecordingStore {
            fail: true,
            ..RecordingStore::default()
        };
        let calls = store.calls.clone();
        let mut registry = TagRegistry::new().with_store(Box::new(store));

        registry.create(Tag::new("offline", "#000000")).unwrap();
        assert_eq!(registry.get("offline").unwrap().color, "#000000");

        registry.update(Tag::new("offline", "#FFFFFF")).unwrap();
        assert_eq!(registry.get("offline").unwrap().color, "#FFFFFF");

        registry.create(Tag::new("kept", "#111111")).unwrap();
        let removed = registry.delete("offline").unwrap();
        assert_eq!(removed.color, "#FFFFFF");
        assert!(registry.get("offline").is_none());
        assert_eq!(names(&registry), vec!["kept"]);

        assert_eq!(
            *calls.borrow(),
            vec!["create offline", "update offline", "create kept", "delete offline"]
        );
    }
}
