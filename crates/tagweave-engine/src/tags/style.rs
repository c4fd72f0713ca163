use serde::Serialize;

use crate::editing::TagSet;
use crate::tags::TagRegistry;

/// Highlight color used when none of a segment's tags is registered.
pub const DEFAULT_HIGHLIGHT_COLOR: &str = "#ffeb3b";

/// How a highlighted segment should be drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightStyle {
    pub color: String,
    /// More than one tag covers the segment
    pub nested: bool,
    pub label: String,
}

impl HighlightStyle {
    /// Color of the first tag (in name order) the registry knows by exact
    /// name, `fallback` otherwise.
    ///
    /// Tag sets carry no insertion order, so this is not "the tag applied
    /// first": unregistered names are skipped and the lowest registered
    /// name wins.
    pub fn resolve(registry: &TagRegistry, tags: &TagSet, fallback: &str) -> Self {
        let color = tags
            .iter()
            .find_map(|name| registry.get(name))
            .map_or_else(|| fallback.to_string(), |tag| tag.color.clone());
        Self {
            color,
            nested: tags.len() > 1,
            label: tags.iter().cloned().collect::<Vec<_>>().join(", "),
        }
    }
}

pub fn highlight_style(registry: &TagRegistry, tags: &TagSet) -> HighlightStyle {
    HighlightStyle::resolve(registry, tags, DEFAULT_HIGHLIGHT_COLOR)
}
