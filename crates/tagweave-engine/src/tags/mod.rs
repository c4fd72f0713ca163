//! Tag definitions, the registry of known tags, and the read models derived
//! from a snapshot (segments, usage counts, display style).

pub mod query;
pub mod registry;
pub mod style;
pub mod tag;

pub use query::{Segment, highlights, matches_tag, segments_for_tag, tag_counts};
pub use registry::{TagRegistry, TagStore, TagStoreError};
pub use style::{DEFAULT_HIGHLIGHT_COLOR, HighlightStyle, highlight_style};
pub use tag::{FileRef, HighlightRef, Tag, TagKind, TimestampOption, parse_related};
