//! Configuration management
//!
//! Supports loading configuration from:
//! - Default values
//! - Environment variables (prefixed with APP, `__` separating sections)
//!
//! E.g. `APP_EMBEDDING__API_KEY=...` sets `EmbeddingConfig.api_key`, and
//! `APP_INGEST__FEED_URLS=url1,url2` replaces the feed list.

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub ingest: IngestConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub session: SessionConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub rust_log: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Syndication feeds queried during ingestion
    pub feed_urls: Vec<String>,
    /// Total article budget, split evenly across feeds
    pub article_limit: usize,
    /// Path of the local JSON corpus cache
    pub cache_path: String,
    /// Per-feed fetch timeout in seconds
    pub fetch_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    pub api_url: String,
    /// Empty key selects the deterministic mock embedder
    pub api_key: String,
    pub model: String,
    pub dimension: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Fixed session lease, measured from creation
    pub ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Number of documents retrieved per query
    pub top_k: usize,
    /// Per-document character cap applied before embedding
    pub max_embed_chars: usize,
    /// Per-document excerpt length in the assembled context
    pub snippet_chars: usize,
}

impl AppConfig {
    pub fn build() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            // Start with defaults
            .set_default("server.rust_log", "info,newsdesk=debug")?
            .set_default(
                "ingest.feed_urls",
                vec![
                    "https://feeds.bbci.co.uk/news/rss.xml",
                    "https://rss.cnn.com/rss/edition.rss",
                    "https://feeds.reuters.com/reuters/topNews",
                ],
            )?
            .set_default("ingest.article_limit", 50)?
            .set_default("ingest.cache_path", "data/news.json")?
            .set_default("ingest.fetch_timeout_secs", 15)?
            .set_default("embedding.api_url", "https://api.jina.ai/v1/embeddings")?
            .set_default("embedding.api_key", "")?
            .set_default("embedding.model", "jina-embeddings-v2-base-en")?
            .set_default("embedding.dimension", 768)?
            .set_default("embedding.timeout_secs", 30)?
            .set_default("embedding.max_retries", 3)?
            .set_default(
                "generation.api_url",
                "https://generativelanguage.googleapis.com/v1beta",
            )?
            .set_default("generation.api_key", "")?
            .set_default("generation.model", "gemini-1.5-flash")?
            .set_default("generation.timeout_secs", 30)?
            .set_default("session.ttl_secs", 3600)?
            .set_default("retrieval.top_k", 3)?
            .set_default("retrieval.max_embed_chars", 1000)?
            .set_default("retrieval.snippet_chars", 300)?
            // Environment variables override defaults; feed_urls accepts a
            // comma-separated list
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("APP")
                    .prefix_separator("_")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("ingest.feed_urls"),
            );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // defaults and env overrides share process-wide state, so both are
    // checked in one test to keep the environment mutation isolated
    #[test]
    fn defaults_produce_a_complete_config_and_env_overrides_apply() {
        let config = AppConfig::build().expect("defaults should deserialize");
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.session.ttl_secs, 3600);
        assert_eq!(config.embedding.dimension, 768);
        assert_eq!(config.ingest.feed_urls.len(), 3);

        std::env::set_var(
            "APP_INGEST__FEED_URLS",
            "https://example.com/a.rss,https://example.com/b.rss",
        );
        let overridden = AppConfig::build().expect("env override should deserialize");
        std::env::remove_var("APP_INGEST__FEED_URLS");

        assert_eq!(
            overridden.ingest.feed_urls,
            vec![
                "https://example.com/a.rss".to_string(),
                "https://example.com/b.rss".to_string(),
            ]
        );
    }
}
