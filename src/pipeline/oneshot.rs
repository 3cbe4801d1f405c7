// src/pipeline/oneshot.rs

//! Single fetch that overwrites an output file.
//!
//! No diffing against prior state and no audit files: the output always
//! holds exactly the latest fetch.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::FeedSnapshot;
use crate::services::{EntryFailurePolicy, FeedSource, normalize_entries, parse_feed};
use crate::storage::SnapshotStore;
use crate::utils::log;

/// Anchor a user-supplied output path at `cwd`, so it is not later joined
/// onto the storage directory. Absolute paths pass through.
pub fn resolve_output(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Fetch, normalize and write the batch to `output_key`. Returns the record count.
pub async fn run_once(
    source: &dyn FeedSource,
    storage: &dyn SnapshotStore,
    output_key: &str,
    policy: EntryFailurePolicy,
) -> Result<usize> {
    log::info(&format!("Fetching {}", source.location()));

    let payload = source.fetch().await?;
    let raw = parse_feed(&payload)?;
    let batch = normalize_entries(&raw, policy)?;
    if batch.skipped > 0 {
        log::warn(&format!("{} entries skipped", batch.skipped));
    }

    let snapshot = FeedSnapshot::new(batch.records);
    storage.save(output_key, &snapshot).await?;

    log::success(&format!(
        "Saved {} entries to {}",
        snapshot.len(),
        storage.describe(output_key)
    ));
    Ok(snapshot.len())
}
