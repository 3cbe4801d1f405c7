//! Diff calculation between the persisted store and a fresh fetch.
//!
//! A record is new when its identity key is absent from the existing store.
//! Keys are recorded as records are accepted, so a key repeated inside one
//! incoming batch is only reported once.

use std::collections::HashSet;

use crate::models::{FeedRecord, FeedSnapshot, IdentityKey};

/// Calculator for computing diffs between snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffCalculator {
    key: IdentityKey,
}

impl DiffCalculator {
    /// Create a diff calculator keyed on titles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a diff calculator with the given identity policy.
    pub fn with_key(key: IdentityKey) -> Self {
        Self { key }
    }

    /// Records from `incoming` not present in `existing`, in `incoming` order.
    pub fn calculate(&self, existing: &FeedSnapshot, incoming: &FeedSnapshot) -> FeedSnapshot {
        let mut seen: HashSet<&str> = existing.keys(self.key);
        let mut added = Vec::new();

        for record in incoming {
            if seen.insert(record.identity(self.key)) {
                added.push(record.clone());
            }
        }

        FeedSnapshot::new(added)
    }
}

/// Convenience function to calculate a title-keyed diff.
pub fn calculate_diff(existing: &FeedSnapshot, incoming: &FeedSnapshot) -> FeedSnapshot {
    DiffCalculator::new().calculate(existing, incoming)
}

/// New records first, then everything already stored.
pub fn merge(added: FeedSnapshot, existing: FeedSnapshot) -> FeedSnapshot {
    existing.prepend(added)
}

/// Titles of a slice of records, for logging.
pub fn titles(records: &[FeedRecord]) -> Vec<&str> {
    records.iter().map(|r| r.title.as_str()).collect()
}
