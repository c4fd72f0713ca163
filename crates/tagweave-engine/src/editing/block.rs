use std::fmt;

use serde::{Deserialize, Serialize};
use xi_rope::Rope;
use xi_rope::rope::Utf16CodeUnitsMetric;

/// Stable identity of a block within a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockKey(String);

impl BlockKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for BlockKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// One immutable unit of document text (a paragraph or line).
///
/// Offsets into a block are UTF-16 code units, which is how selections are
/// reported by text surfaces. The rope translates them to byte offsets with
/// its UTF-16 metric.
#[derive(Debug, Clone)]
pub struct Block {
    key: BlockKey,
    text: Rope,
}

impl Block {
    pub fn new(key: impl Into<BlockKey>, text: &str) -> Self {
        Self {
            key: key.into(),
            text: Rope::from(text),
        }
    }

    pub fn key(&self) -> &BlockKey {
        &self.key
    }

    /// Length in UTF-16 code units.
    pub fn len(&self) -> usize {
        self.text.measure::<Utf16CodeUnitsMetric>()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn text(&self) -> String {
        String::from(&self.text)
    }

    /// Text between two UTF-16 offsets. Offsets past the end are clamped.
    pub fn slice(&self, start: usize, end: usize) -> String {
        let from = self.byte_offset(start);
        let to = self.byte_offset(end.max(start));
        self.text.slice_to_cow(from..to).into_owned()
    }

    /// Byte offset of a UTF-16 offset. An offset inside a surrogate pair
    /// rounds up to the end of that character.
    fn byte_offset(&self, utf16_offset: usize) -> usize {
        if utf16_offset >= self.len() {
            return self.text.len();
        }
        self.text.count_base_units::<Utf16CodeUnitsMetric>(utf16_offset)
    }
}

/// Split flat document text into blocks, one per line.
///
/// Keys are assigned as `b0`, `b1`, ... in document order. A trailing `\r`
/// on each line is dropped so CRLF input yields the same blocks as LF input.
/// Empty input still produces a single empty block.
pub fn blocks_from_text(text: &str) -> Vec<Block> {
    text.split('\n')
        .enumerate()
        .map(|(index, line)| {
            let line = line.strip_suffix('\r').unwrap_or(line);
            Block::new(format!("b{index}"), line)
        })
        .collect()
}
