//! Feed services.
//!
//! - `feed`: fetch and parse the RSS document
//! - `normalize`: turn raw entries into canonical records

pub mod feed;
pub mod normalize;

pub use feed::{FeedSource, HttpFeedSource, parse_feed};
pub use normalize::{EntryFailurePolicy, NormalizedBatch, normalize_entries, normalize_entry};
