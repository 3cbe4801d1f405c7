//! Feed record and snapshot data structures.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry as it appears in the feed document, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub pub_date: Option<String>,
    /// Value of `content:encoded`
    pub content: Option<String>,
    pub guid: Option<String>,
}

/// A normalized feed entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedRecord {
    /// Entry title, entities decoded and trimmed
    pub title: String,

    /// Publication instant
    #[serde(rename = "date", with = "iso8601")]
    pub published_at: DateTime<Utc>,

    /// Plain-text body
    #[serde(rename = "content")]
    pub body: String,

    /// Feed-supplied unique identifier, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
}

impl FeedRecord {
    /// Key used to decide whether two records are the same entry.
    pub fn identity(&self, key: IdentityKey) -> &str {
        match key {
            IdentityKey::Title => &self.title,
            IdentityKey::Guid => self.guid.as_deref().unwrap_or(&self.title),
        }
    }
}

/// Which field identifies a record across cycles.
///
/// Titles are not guaranteed unique by feeds; keying on them is a heuristic.
/// `Guid` uses the feed's `<guid>` and falls back to the title when it is missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityKey {
    #[default]
    Title,
    Guid,
}

/// Ordered records, most recently discovered first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FeedSnapshot(Vec<FeedRecord>);

impl FeedSnapshot {
    pub fn new(records: Vec<FeedRecord>) -> Self {
        Self(records)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FeedRecord> {
        self.0.iter()
    }

    pub fn records(&self) -> &[FeedRecord] {
        &self.0
    }

    pub fn into_records(self) -> Vec<FeedRecord> {
        self.0
    }

    /// Set of identity keys present in this snapshot.
    pub fn keys(&self, key: IdentityKey) -> HashSet<&str> {
        self.0.iter().map(|r| r.identity(key)).collect()
    }

    /// Put `newer` ahead of the current records.
    pub fn prepend(self, newer: FeedSnapshot) -> FeedSnapshot {
        let mut records = newer.0;
        records.extend(self.0);
        FeedSnapshot(records)
    }
}

impl From<Vec<FeedRecord>> for FeedSnapshot {
    fn from(records: Vec<FeedRecord>) -> Self {
        Self(records)
    }
}

impl FromIterator<FeedRecord> for FeedSnapshot {
    fn from_iter<I: IntoIterator<Item = FeedRecord>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FeedSnapshot {
    type Item = &'a FeedRecord;
    type IntoIter = std::slice::Iter<'a, FeedRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
mod iso8601 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(D::Error::custom)
    }
}
