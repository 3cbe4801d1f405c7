// src/models/mod.rs

//! Domain models for the feed watcher.

mod config;
mod record;

// Re-export all public types
pub use config::{Config, FeedConfig, LoggingConfig, PathsConfig, ScheduleConfig};
pub use record::{FeedRecord, FeedSnapshot, IdentityKey, RawEntry};
