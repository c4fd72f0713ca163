use std::collections::BTreeSet;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::editing::{BlockKey, Interval, TagName};

/// A named label with display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: TagName,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub related: BTreeSet<TagName>,
    #[serde(default)]
    pub kind: TagKind,
}

/// What a tag denotes beyond its name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TagKind {
    #[default]
    Generic,
    Timestamp,
    Geo {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        latitude: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        longitude: Option<String>,
    },
    DateRange,
    EntityLink {
        entity_id: String,
    },
    FileConnection {
        subject: FileRef,
        predicate: String,
    },
    HighlightConnection {
        subject: HighlightRef,
        predicate: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub id: String,
    pub name: String,
}

/// A highlighted passage used as the subject of a connection tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightRef {
    pub id: String,
    pub name: String,
    pub block: BlockKey,
    pub interval: Interval,
}

/// Which moment a timestamp tag is named after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampOption {
    Now,
    Today,
    Tomorrow,
    Yesterday,
    Month,
    Year,
}

impl Tag {
    /// A generic tag with no description or related tags.
    pub fn new(name: impl Into<TagName>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            description: None,
            related: BTreeSet::new(),
            kind: TagKind::Generic,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_related<I, S>(mut self, related: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TagName>,
    {
        self.related = related.into_iter().map(Into::into).collect();
        self
    }

    /// A tag named after a point in time, e.g. `20240115T103045` for now or
    /// `202401` for the month.
    pub fn timestamp(option: TimestampOption, now: DateTime<Utc>, color: impl Into<String>) -> Self {
        let name = match option {
            TimestampOption::Now => now.format("%Y%m%dT%H%M%S").to_string(),
            TimestampOption::Today => now.format("%Y%m%d").to_string(),
            TimestampOption::Tomorrow => (now + TimeDelta::days(1)).format("%Y%m%d").to_string(),
            TimestampOption::Yesterday => (now - TimeDelta::days(1)).format("%Y%m%d").to_string(),
            TimestampOption::Month => now.format("%Y%m").to_string(),
            TimestampOption::Year => now.format("%Y").to_string(),
        };
        Self {
            kind: TagKind::Timestamp,
            ..Self::new(name, color)
        }
    }

    pub fn date_range(range: &str, color: impl Into<String>) -> Self {
        Self {
            kind: TagKind::DateRange,
            ..Self::new(range.trim(), color)
        }
    }

    /// `"<subject> -- <predicate> --> <target>"` linking two files.
    pub fn file_connection(subject: FileRef, predicate: &str, target_name: &str, color: impl Into<String>) -> Self {
        let predicate = predicate.trim().to_string();
        let name = format!("{} -- {} --> {}", subject.name.trim(), predicate, target_name);
        Self {
            kind: TagKind::FileConnection { subject, predicate },
            ..Self::new(name, color)
        }
    }

    /// `"<highlight> -- <predicate> --> <object>"` linking a highlight to something.
    pub fn highlight_connection(
        subject: HighlightRef,
        predicate: &str,
        object: &str,
        color: impl Into<String>,
    ) -> Self {
        let predicate = predicate.trim().to_string();
        let name = format!("{} -- {} --> {}", subject.name, predicate, object.trim());
        Self {
            kind: TagKind::HighlightConnection { subject, predicate },
            ..Self::new(name, color)
        }
    }

    /// Case-insensitive name comparison, the registry's notion of equality.
    pub fn same_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

/// Parse a comma separated list of related tag names, dropping blanks.
pub fn parse_related(input: &str) -> BTreeSet<TagName> {
    input
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
