//! Corpus ingestion service
//!
//! Handles the corpus acquisition workflow:
//! 1. Query every configured feed source, isolating per-source failures
//! 2. Distribute the article budget evenly across sources
//! 3. Substitute the built-in seed corpus if every source failed
//! 4. Persist the result to the local cache

use std::sync::Arc;

use crate::corpus::{self, CorpusCache, Document, FeedSource};

pub struct IngestService {
    sources: Vec<Arc<dyn FeedSource>>,
    cache: CorpusCache,
}

impl IngestService {
    pub fn new(sources: Vec<Arc<dyn FeedSource>>, cache: CorpusCache) -> Self {
        Self { sources, cache }
    }

    /// Load the previously persisted corpus; empty when absent or corrupt.
    pub async fn load_cached(&self) -> Vec<Document> {
        self.cache.load().await
    }

    /// Fetch up to `limit` articles across all sources.
    ///
    /// A failing source is logged and skipped; it never aborts ingestion of
    /// the remaining sources. If the aggregate is empty the fixed seed
    /// corpus is substituted so the service stays operable offline. The
    /// final list is persisted to the cache before being returned.
    pub async fn ingest(&self, limit: usize) -> Vec<Document> {
        tracing::info!(limit, sources = self.sources.len(), "fetching news articles");

        let per_source = if self.sources.is_empty() {
            0
        } else {
            limit.div_ceil(self.sources.len())
        };

        let mut articles = Vec::new();
        for source in &self.sources {
            match source.fetch(per_source).await {
                Ok(batch) => {
                    tracing::debug!(url = source.url(), count = batch.len(), "feed fetched");
                    articles.extend(batch);
                }
                Err(err) => {
                    tracing::warn!(
                        url = source.url(),
                        error = %err,
                        "feed source failed, continuing with remaining sources"
                    );
                    metrics::counter!("newsdesk_ingest_sources_failed_total").increment(1);
                }
            }
        }

        if articles.is_empty() {
            tracing::warn!("all feed sources failed, substituting built-in seed corpus");
            articles = corpus::seed_documents();
        }

        if let Err(err) = self.cache.store(&articles).await {
            // the cache is rebuildable; losing it is not worth failing ingestion
            tracing::warn!(error = %err, "failed to persist corpus cache");
        }

        metrics::counter!("newsdesk_ingest_articles_total").increment(articles.len() as u64);
        tracing::info!(count = articles.len(), "corpus ingested");
        articles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::errors::{AppError, Result};

    struct StaticSource {
        url: String,
        titles: Vec<&'static str>,
        requested: AtomicUsize,
    }

    impl StaticSource {
        fn new(url: &str, titles: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                url: url.to_string(),
                titles,
                requested: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl FeedSource for StaticSource {
        fn url(&self) -> &str {
            &self.url
        }

        async fn fetch(&self, limit: usize) -> Result<Vec<Document>> {
            self.requested.store(limit, Ordering::SeqCst);
            Ok(self
                .titles
                .iter()
                .take(limit)
                .map(|t| {
                    Document::from_feed_fields(
                        Some(t.to_string()),
                        Some("content".into()),
                        None,
                        None,
                        self.url.clone(),
                    )
                })
                .collect())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl FeedSource for FailingSource {
        fn url(&self) -> &str {
            "https://down.example.com/rss"
        }

        async fn fetch(&self, _limit: usize) -> Result<Vec<Document>> {
            Err(AppError::SourceUnavailable {
                url: self.url().to_string(),
                message: "connection refused".into(),
            })
        }
    }

    fn temp_cache(dir: &tempfile::TempDir) -> CorpusCache {
        CorpusCache::new(dir.path().join("news.json"))
    }

    #[tokio::test]
    async fn limit_is_distributed_by_ceiling_division() {
        let dir = tempfile::tempdir().unwrap();
        let a = StaticSource::new("https://a.example.com", vec!["a1", "a2", "a3"]);
        let b = StaticSource::new("https://b.example.com", vec!["b1", "b2", "b3"]);
        let c = StaticSource::new("https://c.example.com", vec!["c1", "c2", "c3"]);
        let sources: Vec<Arc<dyn FeedSource>> = vec![a.clone(), b.clone(), c.clone()];
        let service = IngestService::new(sources, temp_cache(&dir));

        let articles = service.ingest(50).await;

        // ceil(50 / 3) = 17 requested from each source
        assert_eq!(a.requested.load(Ordering::SeqCst), 17);
        assert_eq!(b.requested.load(Ordering::SeqCst), 17);
        assert_eq!(c.requested.load(Ordering::SeqCst), 17);
        assert_eq!(articles.len(), 9);
    }

    #[tokio::test]
    async fn one_failing_source_does_not_abort_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let good = StaticSource::new("https://good.example.com", vec!["g1", "g2"]);
        let sources: Vec<Arc<dyn FeedSource>> = vec![Arc::new(FailingSource), good];
        let service = IngestService::new(sources, temp_cache(&dir));

        let articles = service.ingest(10).await;
        assert_eq!(articles.len(), 2);
        assert!(articles.iter().all(|d| d.source == "https://good.example.com"));
    }

    #[tokio::test]
    async fn all_sources_failing_yields_exactly_the_seed_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let sources: Vec<Arc<dyn FeedSource>> =
            vec![Arc::new(FailingSource), Arc::new(FailingSource)];
        let service = IngestService::new(sources, temp_cache(&dir));

        let articles = service.ingest(10).await;
        let seeds = corpus::seed_documents();
        assert_eq!(articles.len(), seeds.len());
        let titles: Vec<_> = articles.iter().map(|d| &d.title).collect();
        let seed_titles: Vec<_> = seeds.iter().map(|d| &d.title).collect();
        assert_eq!(titles, seed_titles);
    }

    #[tokio::test]
    async fn ingested_corpus_is_persisted_to_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let source = StaticSource::new("https://a.example.com", vec!["a1"]);
        let sources: Vec<Arc<dyn FeedSource>> = vec![source];
        let service = IngestService::new(sources, temp_cache(&dir));

        let articles = service.ingest(5).await;
        let cached = service.load_cached().await;
        assert_eq!(cached, articles);
    }
}
