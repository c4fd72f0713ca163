use thiserror::Error;

use crate::editing::{AnnotationId, BlockKey};

/// Errors raised by the annotation engine.
///
/// Every variant is recoverable: an operation that fails leaves the document
/// snapshot it was given untouched, so callers can surface the message and
/// carry on with the previous state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotationError {
    #[error("an annotation needs at least one tag")]
    InvalidAnnotation,

    #[error("annotation {0} not found")]
    NotFound(AnnotationId),

    #[error("zero-width interval [{start}, {end})")]
    DegenerateInterval { start: usize, end: usize },

    #[error("interval ends at {end} but the block is only {len} units long")]
    IntervalOutOfBounds { end: usize, len: usize },

    #[error("a tag named '{0}' already exists")]
    DuplicateTag(String),

    #[error("no tag named '{0}'")]
    UnknownTag(String),

    #[error("nothing to apply tags to: no selection and no highlight under edit")]
    NoTarget,

    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error("no block with key '{0}'")]
    UnknownBlock(BlockKey),

    #[error("block key '{0}' is used more than once")]
    DuplicateBlock(BlockKey),

    #[error("document is still loading or failed to load")]
    DocumentNotReady,
}

pub type Result<T> = std::result::Result<T, AnnotationError>;
