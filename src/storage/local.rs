//! Local filesystem storage implementation.
//!
//! Snapshots are pretty-printed JSON arrays. Writes go to a sibling temp file
//! which is then renamed over the target, so readers never observe a half
//! written snapshot. There is no locking between writers.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::FeedSnapshot;
use crate::storage::{LoadedSnapshot, SnapshotStore};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a key. Absolute keys are used as-is.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl SnapshotStore for LocalStorage {
    async fn load(&self, key: &str) -> Result<LoadedSnapshot> {
        match self.read_bytes(key).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(LoadedSnapshot::Present)
                .map_err(|e| AppError::corrupt_state(self.describe(key), e)),
            None => {
                log::debug!("No snapshot at {}", self.describe(key));
                Ok(LoadedSnapshot::Absent)
            }
        }
    }

    async fn save(&self, key: &str, snapshot: &FeedSnapshot) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        self.write_bytes(key, &bytes).await?;
        log::debug!(
            "Wrote {} records to {}",
            snapshot.len(),
            self.describe(key)
        );
        Ok(())
    }

    fn describe(&self, key: &str) -> String {
        self.path(key).display().to_string()
    }
}
