// src/services/normalize.rs

//! Entry normalization.
//!
//! Turns a [`RawEntry`] into a canonical [`FeedRecord`]: decoded and trimmed
//! title, UTC publication instant, plain-text body.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::{AppError, Result};
use crate::models::{FeedRecord, RawEntry};
use crate::utils::log;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// What to do with an entry that fails to normalize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EntryFailurePolicy {
    /// Fail the whole batch
    Abort,
    /// Log and leave the entry out
    #[default]
    Skip,
}

/// Result of normalizing a batch.
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub records: Vec<FeedRecord>,
    pub skipped: usize,
}

/// Normalize a single raw entry.
pub fn normalize_entry(raw: &RawEntry) -> Result<FeedRecord> {
    let title = raw
        .title
        .as_deref()
        .map(normalize_title)
        .unwrap_or_default();
    if title.is_empty() {
        return Err(AppError::malformed_entry("entry has no title"));
    }

    let date = raw
        .pub_date
        .as_deref()
        .ok_or_else(|| AppError::malformed_date("", format!("'{title}' has no pubDate")))?;

    Ok(FeedRecord {
        published_at: parse_date(date)?,
        body: normalize_body(raw.content.as_deref().unwrap_or("")),
        guid: raw
            .guid
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string),
        title,
    })
}

/// Normalize every entry, applying `policy` to failures.
pub fn normalize_entries(
    raw: &[RawEntry],
    policy: EntryFailurePolicy,
) -> Result<NormalizedBatch> {
    let mut batch = NormalizedBatch::default();
    for entry in raw {
        match normalize_entry(entry) {
            Ok(record) => batch.records.push(record),
            Err(e) if policy == EntryFailurePolicy::Skip => {
                log::warn(&format!("Skipping entry: {e}"));
                batch.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(batch)
}

/// Strip tags, decode HTML entities and trim.
///
/// Tags are removed before decoding so an escaped `&lt;b&gt;` stays as text.
pub fn normalize_title(raw: &str) -> String {
    let stripped = TAG_RE.replace_all(raw, "");
    html_escape::decode_html_entities(&stripped).trim().to_string()
}

/// Strip tags, collapse whitespace, trim, then decode HTML entities.
pub fn normalize_body(raw: &str) -> String {
    let stripped = TAG_RE.replace_all(raw, "");
    let collapsed = WHITESPACE_RE.replace_all(&stripped, " ");
    html_escape::decode_html_entities(collapsed.trim()).into_owned()
}

/// Parse an RFC 2822 or RFC 3339 date into a UTC instant.
///
/// Feeds often carry a weekday that does not match the date; when strict
/// RFC 2822 parsing rejects the value, it is retried without the weekday.
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>> {
    let value = raw.trim();

    let parsed = DateTime::parse_from_rfc2822(value)
        .or_else(|e| match strip_weekday(value) {
            Some(rest) => DateTime::parse_from_rfc2822(rest),
            None => Err(e),
        })
        .or_else(|_| DateTime::parse_from_rfc3339(value));

    parsed
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::malformed_date(value, e))
}

fn strip_weekday(value: &str) -> Option<&str> {
    let (day, rest) = value.split_once(',')?;
    day.chars()
        .all(|c| c.is_ascii_alphabetic())
        .then_some(rest.trim_start())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(title: &str, date: &str, content: Option<&str>) -> RawEntry {
        RawEntry {
            title: Some(title.to_string()),
            pub_date: Some(date.to_string()),
            content: content.map(str::to_string),
            guid: None,
        }
    }

    #[test]
    fn test_body_strips_markup_before_decoding() {
        assert_eq!(normalize_body("  <b>Order</b> &amp; Memo  "), "Order & Memo");
    }

    #[test]
    fn test_body_keeps_encoded_markup_as_text() {
        assert_eq!(normalize_body("<p>1 &lt; 2</p>"), "1 < 2");
    }

    #[test]
    fn test_whitespace_collapse() {
        assert_eq!(normalize_body("Hello\n\n   World"), "Hello World");
        assert_eq!(
            normalize_body("<p>Hello</p>\n<p>\tWorld</p>"),
            "Hello World"
        );
    }

    #[test]
    fn test_title_decoded_and_trimmed() {
        assert_eq!(normalize_title("  Order &amp; Memo  "), "Order & Memo");
    }

    #[test]
    fn test_title_markup_stripped() {
        assert_eq!(normalize_title("  <b>Order</b> &amp; Memo  "), "Order & Memo");
        assert_eq!(normalize_title("&lt;b&gt;Order&lt;/b&gt;"), "<b>Order</b>");
    }

    #[test]
    fn test_rfc2822_date_to_iso() {
        let record = normalize_entry(&raw("T", "Tue, 01 Jan 2024 12:00:00 GMT", None)).unwrap();
        assert_eq!(
            record
                .published_at
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "2024-01-01T12:00:00.000Z"
        );
    }

    #[test]
    fn test_date_offset_converted_to_utc() {
        let parsed = parse_date("Mon, 01 Jan 2024 12:00:00 +0900").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-01-01T03:00:00+00:00");
    }

    #[test]
    fn test_rfc3339_date_accepted() {
        let parsed = parse_date("2024-03-05T08:30:00Z").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-03-05T08:30:00+00:00");
    }

    #[test]
    fn test_malformed_date_fails() {
        let err = normalize_entry(&raw("T", "yesterday-ish", None)).unwrap_err();
        assert!(matches!(err, AppError::MalformedDate { .. }));
    }

    #[test]
    fn test_missing_content_is_empty_body() {
        let record = normalize_entry(&raw("T", "Mon, 01 Jan 2024 12:00:00 GMT", None)).unwrap();
        assert_eq!(record.body, "");
    }

    #[test]
    fn test_blank_title_rejected() {
        let entry = raw("   ", "Mon, 01 Jan 2024 12:00:00 GMT", None);
        let err = normalize_entry(&entry).unwrap_err();
        assert!(matches!(err, AppError::MalformedEntry(_)));
    }

    #[test]
    fn test_batch_skip_policy_isolates_bad_entry() {
        let entries = vec![
            raw("Good", "Mon, 01 Jan 2024 12:00:00 GMT", None),
            raw("Bad", "not a date", None),
        ];
        let batch = normalize_entries(&entries, EntryFailurePolicy::Skip).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.records[0].title, "Good");
    }

    #[test]
    fn test_batch_abort_policy_fails() {
        let entries = vec![
            raw("Good", "Mon, 01 Jan 2024 12:00:00 GMT", None),
            raw("Bad", "not a date", None),
        ];
        assert!(normalize_entries(&entries, EntryFailurePolicy::Abort).is_err());
    }
}
