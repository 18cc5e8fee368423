//! News corpus model
//!
//! Defines the [`Document`] record every pipeline stage operates on, the
//! built-in seed corpus used when every feed source is unreachable, and the
//! local cache / feed-source collaborators.

pub mod cache;
pub mod feeds;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use cache::CorpusCache;
pub use feeds::{FeedSource, RssFeedSource};

/// Default content placed on feed items that carry no body text
pub const DEFAULT_CONTENT: &str = "No content available";

/// Default title placed on feed items that carry no title
pub const DEFAULT_TITLE: &str = "Untitled";

/// A single news article, immutable once ingested.
///
/// All optionality from the upstream feeds is resolved here, at ingestion
/// time, so the rest of the pipeline never handles missing fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub url: String,
    pub publish_date: String,
    pub source: String,
}

impl Document {
    /// Build a document from raw feed fields, applying explicit defaults
    /// for anything the feed omitted.
    pub fn from_feed_fields(
        title: Option<String>,
        content: Option<String>,
        url: Option<String>,
        publish_date: Option<String>,
        source: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            content: content
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CONTENT.to_string()),
            url: url.unwrap_or_default(),
            publish_date: publish_date.unwrap_or_default(),
            source,
        }
    }

    /// Text submitted to the embedding provider for this document:
    /// title and content joined, capped at `max_chars` characters to bound
    /// provider payload size.
    pub fn embedding_text(&self, max_chars: usize) -> String {
        let mut text = format!("{} {}", self.title, self.content);
        if let Some((idx, _)) = text.char_indices().nth(max_chars) {
            text.truncate(idx);
        }
        text
    }
}

/// Truncate a string to at most `max_chars` characters, respecting UTF-8
/// boundaries.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Fixed offline corpus substituted when every feed source fails and no
/// cache exists. Length and titles are deterministic.
pub fn seed_documents() -> Vec<Document> {
    let seeds = [
        (
            "Global markets steady after central bank decisions",
            "Major stock indices held steady this week as central banks in the \
             US and Europe kept interest rates unchanged, citing cooling \
             inflation and a resilient labor market.",
            "Seed Wire",
        ),
        (
            "Breakthrough reported in solid-state battery research",
            "Researchers announced a solid-state battery design with higher \
             energy density and faster charging, a step toward longer-range \
             electric vehicles and safer consumer electronics.",
            "Seed Wire",
        ),
        (
            "International summit concludes with new climate pledges",
            "Delegates from more than 150 countries agreed to accelerate \
             emission cuts and expand funding for adaptation projects in the \
             most affected regions.",
            "Seed Wire",
        ),
        (
            "Major sporting event draws record global audience",
            "Organizers reported the largest worldwide audience in the \
             tournament's history, driven by streaming viewership and strong \
             interest across new markets.",
            "Seed Wire",
        ),
        (
            "Health agencies track seasonal outbreak trends",
            "Public health agencies published updated surveillance figures \
             showing typical seasonal patterns, urging vaccination for \
             vulnerable groups ahead of winter.",
            "Seed Wire",
        ),
        (
            "New space telescope returns first calibration images",
            "Engineers confirmed the observatory's instruments are performing \
             within expectations after it returned its first calibration \
             images from orbit.",
            "Seed Wire",
        ),
    ];

    seeds
        .into_iter()
        .map(|(title, content, source)| Document {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.to_string(),
            url: String::new(),
            publish_date: String::new(),
            source: source.to_string(),
        })
        .collect()
}
