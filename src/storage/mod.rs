//! Storage abstractions for snapshot persistence.
//!
//! ## Directory Structure
//!
//! ```text
//! data/
//! ├── feed.json        # Every entry seen so far, newest batch first
//! ├── latest.json      # Audit: entries from the most recent fetch
//! └── previous.json    # Audit: store contents as loaded by the last cycle
//! ```

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::FeedSnapshot;

// Re-export for convenience
pub use local::LocalStorage;

/// Outcome of reading a snapshot file.
///
/// A missing file is an expected first-run condition. A file that exists but
/// cannot be decoded is reported as `AppError::CorruptState` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadedSnapshot {
    Absent,
    Present(FeedSnapshot),
}

impl LoadedSnapshot {
    pub fn is_absent(&self) -> bool {
        matches!(self, LoadedSnapshot::Absent)
    }

    /// The snapshot, or an empty one when the file was absent.
    pub fn into_snapshot(self) -> FeedSnapshot {
        match self {
            LoadedSnapshot::Absent => FeedSnapshot::default(),
            LoadedSnapshot::Present(snapshot) => snapshot,
        }
    }
}

/// Trait for snapshot storage backends.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Read the snapshot stored under `key`.
    async fn load(&self, key: &str) -> Result<LoadedSnapshot>;

    /// Replace whatever is stored under `key` with `snapshot`.
    async fn save(&self, key: &str, snapshot: &FeedSnapshot) -> Result<()>;

    /// Human-readable location of `key`, for status lines.
    fn describe(&self, key: &str) -> String;
}
