//! Brute-force in-memory vector index
//!
//! Holds `(vector, document)` pairs and answers top-K queries by cosine
//! similarity against every stored vector. No approximate structure is used;
//! exact ranking and simplicity win for corpora in the low thousands. The
//! index is append-only during ingestion and read-only afterwards, so it is
//! shared across queries without locking.

use std::cmp::Ordering;

use serde::Serialize;

use crate::corpus::Document;
use crate::errors::{AppError, Result};

/// One stored vector paired with exactly one document.
#[derive(Clone, Debug)]
struct IndexedRecord {
    vector: Vec<f32>,
    document: Document,
}

/// A retrieved document with its cosine similarity to the query.
#[derive(Clone, Debug, Serialize)]
pub struct RetrievalResult {
    pub document: Document,
    pub score: f32,
}

/// Compute cosine similarity between two vectors of equal length.
///
/// Zero-vector policy: if either operand has zero magnitude the similarity
/// is defined as 0.0. This keeps scores total (no NaN) and ranks degenerate
/// vectors below every real match; the same rule applies on insert and
/// query paths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Append-only vector index with a dimension fixed by the first batch.
#[derive(Default)]
pub struct VectorIndex {
    records: Vec<IndexedRecord>,
    dimension: Option<usize>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Dimension D of stored vectors, set by the first inserted batch.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Append records, pairing each document with its vector positionally.
    ///
    /// Fails with [`AppError::CorpusIndexMismatch`] if the counts differ and
    /// [`AppError::VectorDimensionMismatch`] if any vector deviates from D.
    /// Nothing is inserted on failure.
    pub fn add_documents(
        &mut self,
        documents: Vec<Document>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<()> {
        if documents.len() != vectors.len() {
            return Err(AppError::CorpusIndexMismatch {
                documents: documents.len(),
                vectors: vectors.len(),
            });
        }

        let dimension = match (self.dimension, vectors.first()) {
            (Some(d), _) => d,
            (None, Some(first)) => first.len(),
            (None, None) => return Ok(()),
        };
        for vector in &vectors {
            if vector.len() != dimension {
                return Err(AppError::VectorDimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
        }

        self.dimension = Some(dimension);
        let count = documents.len();
        self.records.extend(
            vectors
                .into_iter()
                .zip(documents)
                .map(|(vector, document)| IndexedRecord { vector, document }),
        );

        tracing::info!(added = count, total = self.records.len(), "documents indexed");
        Ok(())
    }

    /// Return the `min(k, len)` most similar documents, sorted by
    /// descending score. The sort is stable: ties keep insertion order.
    pub fn top_k(&self, query: &[f32], k: usize) -> Result<Vec<RetrievalResult>> {
        if let Some(dimension) = self.dimension {
            if query.len() != dimension {
                return Err(AppError::VectorDimensionMismatch {
                    expected: dimension,
                    actual: query.len(),
                });
            }
        }

        let mut scored: Vec<RetrievalResult> = self
            .records
            .iter()
            .map(|record| RetrievalResult {
                document: record.document.clone(),
                score: cosine_similarity(query, &record.vector),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}
