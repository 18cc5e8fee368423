//! Feed source abstraction
//!
//! The core pipeline only requires a sequence of [`Document`] records from
//! each source; syndication-format details stay behind [`FeedSource`].

use std::time::Duration;

use async_trait::async_trait;

use crate::corpus::Document;
use crate::errors::{AppError, Result};

/// A single upstream article source.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Identifier of this source, used in logs.
    fn url(&self) -> &str;

    /// Fetch up to `limit` articles from this source.
    async fn fetch(&self, limit: usize) -> Result<Vec<Document>>;
}

/// A syndication feed (RSS/Atom) fetched over HTTP.
pub struct RssFeedSource {
    client: reqwest::Client,
    url: String,
}

impl RssFeedSource {
    pub fn new(url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self { client, url }
    }

    fn unavailable(&self, message: impl ToString) -> AppError {
        AppError::SourceUnavailable {
            url: self.url.clone(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl FeedSource for RssFeedSource {
    fn url(&self) -> &str {
        &self.url
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<Document>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.unavailable(e))?
            .error_for_status()
            .map_err(|e| self.unavailable(e))?;

        let body = response.bytes().await.map_err(|e| self.unavailable(e))?;
        let feed = feed_rs::parser::parse(&body[..]).map_err(|e| self.unavailable(e))?;

        let source_name = feed
            .title
            .map(|t| t.content)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| self.url.clone());

        let documents = feed
            .entries
            .into_iter()
            .take(limit)
            .map(|entry| {
                let content = entry
                    .summary
                    .map(|s| s.content)
                    .or_else(|| entry.content.and_then(|c| c.body));
                Document::from_feed_fields(
                    entry.title.map(|t| t.content),
                    content,
                    entry.links.first().map(|l| l.href.clone()),
                    entry
                        .published
                        .or(entry.updated)
                        .map(|d| d.to_rfc3339()),
                    source_name.clone(),
                )
            })
            .collect();

        Ok(documents)
    }
}
