// src/services/feed.rs

//! Feed source service.
//!
//! Fetches the raw RSS payload and extracts the per-item fields the
//! normalizer needs.

use async_trait::async_trait;
use rss::Channel;

use crate::error::{AppError, Result};
use crate::models::{FeedConfig, RawEntry};
use crate::utils::http;

/// Something that can hand back the current feed document.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Where the payload comes from, for status lines.
    fn location(&self) -> &str;

    /// Retrieve the raw document.
    async fn fetch(&self) -> Result<Vec<u8>>;
}

/// Feed source backed by a single HTTP GET.
pub struct HttpFeedSource {
    url: String,
    client: reqwest::Client,
}

impl HttpFeedSource {
    /// Create a source for the configured feed URL.
    pub fn new(config: &FeedConfig) -> Result<Self> {
        Ok(Self {
            url: config.url.clone(),
            client: http::create_async_client(config)?,
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    fn location(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        http::fetch_bytes(&self.client, &self.url).await
    }
}

/// Parse an RSS 2.0 document into raw entries, in document order.
pub fn parse_feed(payload: &[u8]) -> Result<Vec<RawEntry>> {
    let channel = Channel::read_from(payload).map_err(AppError::feed)?;

    Ok(channel
        .items()
        .iter()
        .map(|item| RawEntry {
            title: item.title().map(str::to_string),
            pub_date: item.pub_date().map(str::to_string),
            content: item.content().map(str::to_string),
            guid: item.guid().map(|g| g.value().to_string()),
        })
        .collect())
}
