//! # Annotation editing core
//!
//! A document is an ordered sequence of immutable [`Block`]s. Tags are
//! attached to block ranges through annotations, and each block keeps an
//! explicit attachment list of `(Interval, AnnotationId)` pairs rather than
//! per-character metadata.
//!
//! ## Pipeline
//!
//! 1. **Selection**: [`resolve_selection`] turns a (possibly multi-block)
//!    [`Selection`] into text and per-block ranges.
//! 2. **Apply**: the [`HighlightApplier`] decides between creating a new
//!    highlight and unioning tags into the one under edit.
//! 3. **Merge**: [`merge_block`] recomputes the block as sorted, disjoint
//!    segments whose tags are the union of every range covering them.
//! 4. **Commit**: every step returns a new [`DocumentSnapshot`]; the old one
//!    stays valid for readers that still hold it.
//!
//! ```rust
//! use tagweave_engine::editing::{BlockKey, DocumentSnapshot, HighlightApplier, Selection, tag_set};
//!
//! let doc = DocumentSnapshot::from_text("The quick brown fox");
//! let mut applier = HighlightApplier::new();
//!
//! applier.select(&doc, &Selection::within("b0", 0, 9)).unwrap();
//! let doc = applier.apply(&doc, &tag_set(["A"])).unwrap();
//!
//! applier.select(&doc, &Selection::within("b0", 4, 15)).unwrap();
//! let doc = applier.apply(&doc, &tag_set(["B"])).unwrap();
//!
//! assert_eq!(doc.attachments(&BlockKey::from("b0")).len(), 3);
//! ```

pub mod annotations;
pub mod applier;
pub mod block;
pub mod interval;
pub mod merge;
pub mod selection;
pub mod snapshot;

pub use annotations::{Annotation, AnnotationId, AnnotationKind, AnnotationTable, TagName, TagSet, tag_set};
pub use applier::{ApplierState, EditTarget, HighlightApplier};
pub use block::{Block, BlockKey, blocks_from_text};
pub use interval::{Attachment, Interval};
pub use merge::{MergedSegment, merge_block, merge_blocks, merge_intervals};
pub use selection::{BlockRange, ResolvedSelection, Selection, resolve_selection};
pub use snapshot::{DocumentSnapshot, format_snapshot};
