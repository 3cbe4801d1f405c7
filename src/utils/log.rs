// src/utils/log.rs

//! Console status lines on top of the `log` facade.
//!
//! Level filtering and timestamps come from whichever logger the binary
//! installs. This module only decides how a status line reads.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// How status lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStyle {
    /// Bare messages
    #[default]
    Plain,
    /// Messages prefixed with a status marker, boxed headers
    Decorated,
}

/// Kind of status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Info,
    Success,
    Warn,
    Error,
}

impl Status {
    fn marker(self) -> &'static str {
        match self {
            Status::Info => "•",
            Status::Success => "✓",
            Status::Warn => "⚠",
            Status::Error => "✗",
        }
    }
}

static STYLE: OnceLock<LogStyle> = OnceLock::new();

/// Set the status line style. Only the first call has an effect.
pub fn init(style: LogStyle) {
    let _ = STYLE.set(style);
}

fn style() -> LogStyle {
    STYLE.get().copied().unwrap_or_default()
}

/// Render a status line in the given style.
pub fn format_status(style: LogStyle, status: Status, message: &str) -> String {
    match style {
        LogStyle::Plain => message.to_string(),
        LogStyle::Decorated => format!("{} {}", status.marker(), message),
    }
}

/// Log an info message
pub fn info(message: &str) {
    log::info!("{}", format_status(style(), Status::Info, message));
}

/// Log a success message (emitted at INFO)
pub fn success(message: &str) {
    log::info!("{}", format_status(style(), Status::Success, message));
}

/// Log a warning message
pub fn warn(message: &str) {
    log::warn!("{}", format_status(style(), Status::Warn, message));
}

/// Log an error message
pub fn error(message: &str) {
    log::error!("{}", format_status(style(), Status::Error, message));
}

/// Log a header
pub fn header(title: &str) {
    match style() {
        LogStyle::Plain => log::info!("== {} ==", title),
        LogStyle::Decorated => {
            let border = "═".repeat(60);
            log::info!("{}", border);
            log::info!("  {}", title);
            log::info!("{}", border);
        }
    }
}

/// Log a sub-item (indented)
pub fn sub_item(message: &str) {
    log::info!("    {}", message);
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {}", title);
    for (key, value) in items {
        log::info!("    {}: {}", key, value);
    }
}
