// src/pipeline/cycle.rs

//! One fetch → normalize → diff → persist pass.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{Config, FeedSnapshot, IdentityKey};
use crate::services::{EntryFailurePolicy, FeedSource, normalize_entries, parse_feed};
use crate::storage::SnapshotStore;
use crate::utils::log;

use super::diff::{DiffCalculator, merge};
use super::scheduler::Job;

/// Stages of a cycle, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    Fetch,
    Parse,
    Normalize,
    RecordLatest,
    LoadStore,
    RecordPrior,
    Persist,
}

impl CycleStage {
    pub fn as_str(self) -> &'static str {
        match self {
            CycleStage::Fetch => "fetch",
            CycleStage::Parse => "parse",
            CycleStage::Normalize => "normalize",
            CycleStage::RecordLatest => "record latest",
            CycleStage::LoadStore => "load store",
            CycleStage::RecordPrior => "record prior",
            CycleStage::Persist => "persist",
        }
    }

    fn wrap(self) -> impl FnOnce(AppError) -> AppError {
        move |e| AppError::in_stage(self.as_str(), e)
    }
}

impl fmt::Display for CycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage keys and policies a cycle runs with.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub store_key: String,
    pub latest_key: String,
    pub prior_key: String,
    pub identity: IdentityKey,
    pub entry_policy: EntryFailurePolicy,
}

impl CycleSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            store_key: config.paths.store_file.clone(),
            latest_key: config.paths.latest_file.clone(),
            prior_key: config.paths.prior_file.clone(),
            identity: config.feed.identity,
            entry_policy: config.schedule.entry_policy(),
        }
    }
}

/// What a successful cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Records that survived normalization
    pub fetched: usize,
    /// Entries dropped by the normalizer
    pub skipped: usize,
    /// Records in the store before the cycle
    pub existing: usize,
    /// Records added to the store
    pub added: usize,
    /// Whether the main store was rewritten
    pub store_written: bool,
}

/// The cycle orchestrator.
pub struct FeedCycle {
    source: Arc<dyn FeedSource>,
    storage: Arc<dyn SnapshotStore>,
    settings: CycleSettings,
}

impl FeedCycle {
    pub fn new(
        source: Arc<dyn FeedSource>,
        storage: Arc<dyn SnapshotStore>,
        settings: CycleSettings,
    ) -> Self {
        Self {
            source,
            storage,
            settings,
        }
    }

    /// Run one cycle, returning the first stage failure.
    pub async fn try_run(&self) -> Result<CycleReport> {
        let settings = &self.settings;

        let payload = self.source.fetch().await.map_err(CycleStage::Fetch.wrap())?;
        let raw = parse_feed(&payload).map_err(CycleStage::Parse.wrap())?;
        let batch =
            normalize_entries(&raw, settings.entry_policy).map_err(CycleStage::Normalize.wrap())?;
        log::info(&format!(
            "Fetched {} entries from {}",
            batch.records.len(),
            self.source.location()
        ));

        let incoming = FeedSnapshot::new(batch.records);
        self.storage
            .save(&settings.latest_key, &incoming)
            .await
            .map_err(CycleStage::RecordLatest.wrap())?;

        let loaded = self
            .storage
            .load(&settings.store_key)
            .await
            .map_err(CycleStage::LoadStore.wrap())?;
        if loaded.is_absent() {
            log::info(&format!(
                "No store at {}, starting empty",
                self.storage.describe(&settings.store_key)
            ));
        }
        let existing = loaded.into_snapshot();
        self.storage
            .save(&settings.prior_key, &existing)
            .await
            .map_err(CycleStage::RecordPrior.wrap())?;

        let added = DiffCalculator::with_key(settings.identity).calculate(&existing, &incoming);

        let mut report = CycleReport {
            fetched: incoming.len(),
            skipped: batch.skipped,
            existing: existing.len(),
            added: added.len(),
            store_written: false,
        };

        if added.is_empty() {
            log::info("No new entries");
            return Ok(report);
        }

        for record in &added {
            log::sub_item(&format!("+ {}", record.title));
        }
        let merged = merge(added, existing);
        self.storage
            .save(&settings.store_key, &merged)
            .await
            .map_err(CycleStage::Persist.wrap())?;
        report.store_written = true;

        log::success(&format!(
            "{} new entries, store now holds {}",
            report.added,
            merged.len()
        ));
        Ok(report)
    }

    /// Run one cycle, logging any failure instead of returning it.
    pub async fn run(&self) -> Option<CycleReport> {
        match self.try_run().await {
            Ok(report) => Some(report),
            Err(e) => {
                log::error(&format!("Cycle aborted ({}): {}", e.category(), e));
                None
            }
        }
    }
}

#[async_trait]
impl Job for FeedCycle {
    fn name(&self) -> &'static str {
        "feed-cycle"
    }

    async fn execute(&self) {
        self.run().await;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::models::FeedConfig;
    use crate::services::HttpFeedSource;
    use crate::storage::{LoadedSnapshot, LocalStorage};
    use tempfile::TempDir;

    /// Feed source serving whatever payload the test sets; `None` fails the fetch.
    pub(crate) struct StubSource {
        payload: Mutex<Option<String>>,
    }

    impl StubSource {
        pub(crate) fn new(payload: Option<String>) -> Self {
            Self {
                payload: Mutex::new(payload),
            }
        }

        pub(crate) fn set(&self, payload: Option<String>) {
            *self.payload.lock().unwrap() = payload;
        }
    }

    #[async_trait]
    impl FeedSource for StubSource {
        fn location(&self) -> &str {
            "stub"
        }

        async fn fetch(&self) -> Result<Vec<u8>> {
            match self.payload.lock().unwrap().as_ref() {
                Some(p) => Ok(p.clone().into_bytes()),
                None => Err(AppError::Io(std::io::Error::other("connection refused"))),
            }
        }
    }

    /// Build an RSS document from `(title, pubDate)` pairs.
    pub(crate) fn rss(items: &[(&str, &str)]) -> String {
        let body: String = items
            .iter()
            .map(|(title, date)| {
                format!(
                    "<item><title>{title}</title><pubDate>{date}</pubDate>\
                     <content:encoded><![CDATA[<p>{title}</p>]]></content:encoded></item>"
                )
            })
            .collect();
        format!(
            "<?xml version=\"1.0\"?>\
             <rss version=\"2.0\" xmlns:content=\"http://purl.org/rss/1.0/modules/content/\">\
             <channel><title>t</title><link>https://example.com</link>\
             <description>d</description>{body}</channel></rss>"
        )
    }

    /// Local storage whose saves to one key fail.
    struct FailingStore {
        inner: LocalStorage,
        failing_key: String,
    }

    #[async_trait]
    impl SnapshotStore for FailingStore {
        async fn load(&self, key: &str) -> Result<LoadedSnapshot> {
            self.inner.load(key).await
        }

        async fn save(&self, key: &str, snapshot: &FeedSnapshot) -> Result<()> {
            if key == self.failing_key {
                return Err(AppError::Io(std::io::Error::other("disk full")));
            }
            self.inner.save(key, snapshot).await
        }

        fn describe(&self, key: &str) -> String {
            self.inner.describe(key)
        }
    }

    const DATE: &str = "Mon, 01 Jan 2024 12:00:00 GMT";

    fn settings() -> CycleSettings {
        CycleSettings::from_config(&Config::default())
    }

    fn setup(payload: Option<String>) -> (TempDir, Arc<StubSource>, FeedCycle) {
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(StubSource::new(payload));
        let storage = Arc::new(LocalStorage::new(tmp.path()));
        let cycle = FeedCycle::new(source.clone(), storage, settings());
        (tmp, source, cycle)
    }

    fn stored_titles(tmp: &TempDir, file: &str) -> Vec<String> {
        let text = std::fs::read_to_string(tmp.path().join(file)).unwrap();
        let snapshot: FeedSnapshot = serde_json::from_str(&text).unwrap();
        snapshot.iter().map(|r| r.title.clone()).collect()
    }

    #[tokio::test]
    async fn test_first_cycle_stores_full_batch() {
        let (tmp, _source, cycle) = setup(Some(rss(&[("A", DATE), ("B", DATE)])));

        let report = cycle.try_run().await.unwrap();
        assert_eq!(report.fetched, 2);
        assert_eq!(report.existing, 0);
        assert_eq!(report.added, 2);
        assert!(report.store_written);

        assert_eq!(stored_titles(&tmp, "feed.json"), vec!["A", "B"]);
        assert_eq!(stored_titles(&tmp, "latest.json"), vec!["A", "B"]);
        assert!(stored_titles(&tmp, "previous.json").is_empty());
    }

    #[tokio::test]
    async fn test_repeat_cycle_leaves_store_byte_identical() {
        let (tmp, _source, cycle) = setup(Some(rss(&[("A", DATE), ("B", DATE)])));

        cycle.try_run().await.unwrap();
        let before = std::fs::read(tmp.path().join("feed.json")).unwrap();

        let report = cycle.try_run().await.unwrap();
        assert_eq!(report.added, 0);
        assert!(!report.store_written);

        let after = std::fs::read(tmp.path().join("feed.json")).unwrap();
        assert_eq!(before, after);
        assert_eq!(stored_titles(&tmp, "previous.json"), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_new_entries_are_prepended() {
        let (tmp, source, cycle) = setup(Some(rss(&[("B", DATE)])));
        cycle.try_run().await.unwrap();

        source.set(Some(rss(&[("A", DATE), ("B", DATE)])));
        let report = cycle.try_run().await.unwrap();

        assert_eq!(report.added, 1);
        assert_eq!(stored_titles(&tmp, "feed.json"), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_duplicate_titles_in_one_fetch_stored_once() {
        let (tmp, _source, cycle) = setup(Some(rss(&[("A", DATE), ("A", DATE), ("B", DATE)])));

        cycle.try_run().await.unwrap();
        assert_eq!(stored_titles(&tmp, "feed.json"), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_state_untouched() {
        let (tmp, source, cycle) = setup(Some(rss(&[("A", DATE)])));
        cycle.try_run().await.unwrap();
        std::fs::remove_file(tmp.path().join("latest.json")).unwrap();
        let before = std::fs::read(tmp.path().join("feed.json")).unwrap();

        source.set(None);
        let err = cycle.try_run().await.unwrap_err();
        assert!(matches!(err, AppError::Cycle { stage: "fetch", .. }));
        assert!(cycle.run().await.is_none());

        assert_eq!(std::fs::read(tmp.path().join("feed.json")).unwrap(), before);
        assert!(!tmp.path().join("latest.json").exists());
    }

    #[tokio::test]
    async fn test_malformed_document_fails_at_parse() {
        let (tmp, _source, cycle) = setup(Some("<html>nope</html>".to_string()));

        let err = cycle.try_run().await.unwrap_err();
        assert!(matches!(err, AppError::Cycle { stage: "parse", .. }));
        assert_eq!(err.category(), "parse");
        assert!(!tmp.path().join("feed.json").exists());
    }

    #[tokio::test]
    async fn test_corrupt_store_is_not_overwritten() {
        let (tmp, _source, cycle) = setup(Some(rss(&[("A", DATE)])));
        std::fs::write(tmp.path().join("feed.json"), "not json").unwrap();

        let err = cycle.try_run().await.unwrap_err();
        assert!(matches!(err, AppError::Cycle { stage: "load store", .. }));
        assert_eq!(err.category(), "corrupt-state");

        let text = std::fs::read_to_string(tmp.path().join("feed.json")).unwrap();
        assert_eq!(text, "not json");
        assert!(!tmp.path().join("previous.json").exists());
    }

    /// Seed a store holding "B", then run a cycle fetching "A" and "B" whose
    /// save to `failing_key` fails. Returns the error and whether the store
    /// bytes survived unchanged.
    async fn run_with_failing_save(failing_key: &str) -> (AppError, bool) {
        let (tmp, _source, seed) = setup(Some(rss(&[("B", DATE)])));
        seed.try_run().await.unwrap();
        let before = std::fs::read(tmp.path().join("feed.json")).unwrap();

        let source = Arc::new(StubSource::new(Some(rss(&[("A", DATE), ("B", DATE)]))));
        let storage = Arc::new(FailingStore {
            inner: LocalStorage::new(tmp.path()),
            failing_key: failing_key.to_string(),
        });
        let cycle = FeedCycle::new(source, storage, settings());

        let err = cycle.try_run().await.unwrap_err();
        assert!(cycle.run().await.is_none());
        let after = std::fs::read(tmp.path().join("feed.json")).unwrap();
        (err, before == after)
    }

    #[tokio::test]
    async fn test_latest_write_failure_leaves_store_untouched() {
        let (err, unchanged) = run_with_failing_save("latest.json").await;
        assert!(matches!(err, AppError::Cycle { stage: "record latest", .. }));
        assert_eq!(err.category(), "io");
        assert!(unchanged);
    }

    #[tokio::test]
    async fn test_prior_write_failure_leaves_store_untouched() {
        let (err, unchanged) = run_with_failing_save("previous.json").await;
        assert!(matches!(err, AppError::Cycle { stage: "record prior", .. }));
        assert!(unchanged);
    }

    #[tokio::test]
    async fn test_persist_failure_leaves_store_untouched() {
        let (err, unchanged) = run_with_failing_save("feed.json").await;
        assert!(matches!(err, AppError::Cycle { stage: "persist", .. }));
        assert_eq!(err.to_string(), "persist failed: I/O error: disk full");
        assert!(unchanged);
    }

    #[tokio::test]
    async fn test_transport_failure_is_fetch_category() {
        // Bind then release a port so the connection is refused.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = FeedConfig {
            url: format!("http://127.0.0.1:{port}/rss.xml"),
            timeout_secs: 5,
            ..FeedConfig::default()
        };
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(HttpFeedSource::new(&config).unwrap());
        let storage = Arc::new(LocalStorage::new(tmp.path()));
        let cycle = FeedCycle::new(source, storage, settings());

        let err = cycle.try_run().await.unwrap_err();
        assert!(matches!(err, AppError::Cycle { stage: "fetch", .. }));
        assert_eq!(err.category(), "fetch");
        assert!(cycle.run().await.is_none());
        assert!(!tmp.path().join("latest.json").exists());
    }

    #[tokio::test]
    async fn test_bad_date_skipped_by_default() {
        let (tmp, _source, cycle) = setup(Some(rss(&[("A", DATE), ("B", "someday")])));

        let report = cycle.try_run().await.unwrap();
        assert_eq!(report.fetched, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(stored_titles(&tmp, "feed.json"), vec!["A"]);
    }

    #[tokio::test]
    async fn test_bad_date_aborts_under_abort_policy() {
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(StubSource::new(Some(rss(&[("A", DATE), ("B", "someday")]))));
        let storage = Arc::new(LocalStorage::new(tmp.path()));
        let mut settings = settings();
        settings.entry_policy = EntryFailurePolicy::Abort;
        let cycle = FeedCycle::new(source, storage, settings);

        let err = cycle.try_run().await.unwrap_err();
        assert!(matches!(err, AppError::Cycle { stage: "normalize", .. }));
        assert!(!tmp.path().join("latest.json").exists());
    }
}
