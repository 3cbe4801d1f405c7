// src/error.rs

//! Unified error handling for the feed watcher.

use std::fmt;

use thiserror::Error;

/// Result type alias for feed watcher operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// The feed document could not be parsed
    #[error("Feed parse error: {0}")]
    Feed(String),

    /// An entry carried a date that is not RFC 2822 or RFC 3339
    #[error("Malformed date '{value}': {message}")]
    MalformedDate { value: String, message: String },

    /// An entry is missing a required field
    #[error("Malformed entry: {0}")]
    MalformedEntry(String),

    /// The persisted store exists but is not a valid snapshot
    #[error("Corrupt state in {path}: {message}")]
    CorruptState { path: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A scheduled job's worker died
    #[error("Job '{job}' worker stopped: {message}")]
    JobPanicked { job: &'static str, message: String },

    /// A cycle stage failed
    #[error("{stage} failed: {source}")]
    Cycle {
        stage: &'static str,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    /// Create a feed parsing error.
    pub fn feed(message: impl fmt::Display) -> Self {
        Self::Feed(message.to_string())
    }

    /// Create a malformed date error.
    pub fn malformed_date(value: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::MalformedDate {
            value: value.into(),
            message: message.to_string(),
        }
    }

    /// Create a malformed entry error.
    pub fn malformed_entry(message: impl Into<String>) -> Self {
        Self::MalformedEntry(message.into())
    }

    /// Create a corrupt state error.
    pub fn corrupt_state(path: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::CorruptState {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Wrap an error with the cycle stage it came from.
    pub fn in_stage(stage: &'static str, source: AppError) -> Self {
        Self::Cycle {
            stage,
            source: Box::new(source),
        }
    }

    /// Short category name used in status lines.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Http(_) => "fetch",
            Self::Feed(_) | Self::MalformedDate { .. } | Self::MalformedEntry(_) => "parse",
            Self::Io(_) | Self::Json(_) => "io",
            Self::CorruptState { .. } => "corrupt-state",
            Self::Toml(_) | Self::Url(_) | Self::Config(_) | Self::Validation(_) => "config",
            Self::JobPanicked { .. } => "scheduler",
            Self::Cycle { source, .. } => source.category(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_looks_through_cycle_wrapper() {
        let err = AppError::in_stage("load store", AppError::corrupt_state("feed.json", "eof"));
        assert_eq!(err.category(), "corrupt-state");
        assert_eq!(
            err.to_string(),
            "load store failed: Corrupt state in feed.json: eof"
        );
    }

    #[test]
    fn test_parse_categories() {
        assert_eq!(AppError::feed("bad xml").category(), "parse");
        assert_eq!(AppError::malformed_date("x", "nope").category(), "parse");
        assert_eq!(AppError::malformed_entry("no title").category(), "parse");
    }
}
