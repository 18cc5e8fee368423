//! RAG query orchestrator
//!
//! Coordinates the full pipeline: one-time corpus load/ingest and index
//! build, then per query embed → retrieve → assemble context → generate →
//! record. Initialization is a one-way Uninitialized → Ready transition
//! guarded by a `OnceCell`, so concurrent first queries wait on a single
//! in-flight build instead of racing or failing.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::OnceCell;

use crate::config::RetrievalConfig;
use crate::corpus::truncate_chars;
use crate::embeddings::Embedder;
use crate::errors::Result;
use crate::generation::{self, Generator};
use crate::index::{RetrievalResult, VectorIndex};
use crate::services::ingest::IngestService;
use crate::sessions::SessionStore;
use uuid::Uuid;

pub struct RagEngine {
    ingest: IngestService,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    sessions: SessionStore,
    retrieval: RetrievalConfig,
    article_limit: usize,
    index: OnceCell<VectorIndex>,
}

impl RagEngine {
    pub fn new(
        ingest: IngestService,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        sessions: SessionStore,
        retrieval: RetrievalConfig,
        article_limit: usize,
    ) -> Self {
        Self {
            ingest,
            embedder,
            generator,
            sessions,
            retrieval,
            article_limit,
            index: OnceCell::new(),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Build the corpus and index if not already Ready. Idempotent; a
    /// failed attempt leaves the engine Uninitialized so a later call can
    /// retry. Embedding failure here is fatal and propagates.
    pub async fn initialize(&self) -> Result<()> {
        self.index().await.map(|_| ())
    }

    pub async fn is_ready(&self) -> bool {
        self.index.initialized()
    }

    pub async fn document_count(&self) -> usize {
        self.index.get().map(VectorIndex::len).unwrap_or(0)
    }

    async fn index(&self) -> Result<&VectorIndex> {
        self.index
            .get_or_try_init(|| async { self.build_index().await })
            .await
    }

    async fn build_index(&self) -> Result<VectorIndex> {
        let start = Instant::now();
        tracing::info!("initializing RAG pipeline");

        let mut documents = self.ingest.load_cached().await;
        if documents.is_empty() {
            documents = self.ingest.ingest(self.article_limit).await;
        }
        if documents.is_empty() {
            return Err(crate::errors::AppError::CorpusEmpty);
        }

        let texts: Vec<String> = documents
            .iter()
            .map(|d| d.embedding_text(self.retrieval.max_embed_chars))
            .collect();

        tracing::info!(count = texts.len(), model = self.embedder.model_name(), "embedding corpus");
        let vectors = self.embedder.embed_batch(&texts).await?;

        let mut index = VectorIndex::new();
        index.add_documents(documents, vectors)?;

        metrics::histogram!("newsdesk_init_duration_seconds").record(start.elapsed().as_secs_f64());
        tracing::info!(
            documents = index.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "RAG pipeline ready"
        );
        Ok(index)
    }

    /// Answer a query against the indexed corpus.
    ///
    /// Lazily initializes on first use, so initialization failures can
    /// propagate from here. Transient provider failures never do: they
    /// degrade into a fixed apology string. Fatal contract violations
    /// (`AppError::is_fatal`) always propagate.
    pub async fn process_query(&self, query: &str) -> Result<String> {
        let start = Instant::now();
        let index = self.index().await?;
        metrics::counter!("newsdesk_queries_total").increment(1);

        let query_vector = match self.embedder.embed(query).await {
            Ok(vector) => vector,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                tracing::warn!(error = %err, "query embedding failed, degrading");
                metrics::counter!("newsdesk_query_failures_total").increment(1);
                return Ok(generation::APOLOGY_UNAVAILABLE.to_string());
            }
        };

        let results = index.top_k(&query_vector, self.retrieval.top_k)?;
        let context = self.build_context(&results);
        tracing::debug!(
            retrieved = results.len(),
            context_chars = context.len(),
            "context assembled"
        );

        let answer = match self.generator.generate(query, &context).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "generation failed, degrading to apology");
                metrics::counter!("newsdesk_generation_failures_total").increment(1);
                generation::apology_for(&err).to_string()
            }
        };

        metrics::histogram!("newsdesk_query_duration_seconds").record(start.elapsed().as_secs_f64());
        Ok(answer)
    }

    /// Answer a query and record the exchange in the session's history.
    /// Unknown session ids fail (strict write path).
    pub async fn answer(&self, session_id: Uuid, query: &str) -> Result<String> {
        let answer = self.process_query(query).await?;
        self.sessions.append_message(session_id, query, &answer).await?;
        Ok(answer)
    }

    /// Concatenate a bounded excerpt of each retrieved article into the
    /// grounding context.
    fn build_context(&self, results: &[RetrievalResult]) -> String {
        results
            .iter()
            .map(|result| {
                let doc = &result.document;
                format!(
                    "Article: {}\nSource: {}\nContent: {}...\nURL: {}",
                    doc.title,
                    doc.source,
                    truncate_chars(&doc.content, self.retrieval.snippet_chars),
                    doc.url
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
