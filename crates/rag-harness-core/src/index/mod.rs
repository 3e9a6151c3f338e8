//! Vector index abstraction for RAG Harness.
//!
//! The [`VectorIndex`] trait defines the storage operations the selector
//! needs: adding (record, vector) pairs and answering nearest-neighbour
//! queries. Backends are pluggable; [`memory::InMemoryIndex`] is the
//! brute-force implementation used by the CLI and tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;
use tracing::debug;

use crate::embedding::Embedder;
use crate::error::{RetrievalError, Result};
use crate::models::Record;

/// A record returned from a nearest-neighbour query.
///
/// Carries the stored vector so diversity-aware strategies can compare
/// candidates with each other without another round-trip.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub record: Record,
    pub vector: Vec<f32>,
    /// Distance to the query vector under the index's metric (lower is nearer).
    pub distance: f32,
}

/// Abstract vector index.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`add`](VectorIndex::add) | Store records with their vectors |
/// | [`search_by_vector`](VectorIndex::search_by_vector) | Nearest neighbours, ascending distance |
/// | [`count`](VectorIndex::count) | Number of stored records |
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Store records alongside their vectors. `records` and `vectors`
    /// must have equal length.
    async fn add(&self, records: Vec<Record>, vectors: Vec<Vec<f32>>) -> Result<()>;

    /// Return up to `limit` candidates ordered by ascending distance.
    /// Ties keep insertion order.
    async fn search_by_vector(&self, query_vec: &[f32], limit: usize) -> Result<Vec<Candidate>>;

    /// Number of stored records.
    async fn count(&self) -> Result<usize>;
}

/// Embed `records` in batches of `batch_size` and add them to `index`.
///
/// Every vector must have `embedder.dims()` components. Returns the number of records indexed.
pub async fn index_records<E, I>(
    embedder: &E,
    index: &I,
    records: Vec<Record>,
    batch_size: usize,
) -> Result<usize>
where
    E: Embedder + ?Sized,
    I: VectorIndex + ?Sized,
{
    if batch_size == 0 {
        return Err(RetrievalError::InvalidParameter(
            "batch_size must be > 0".to_string(),
        ));
    }

    let total = records.len();
    let mut remaining = records;
    while !remaining.is_empty() {
        let rest = remaining.split_off(remaining.len().min(batch_size));
        let batch = std::mem::replace(&mut remaining, rest);

        let texts: Vec<String> = batch.iter().map(|r| r.text.clone()).collect();
        let vectors = embedder.embed_documents(&texts).await?;
        if vectors.len() != batch.len() {
            return Err(RetrievalError::unavailable(
                embedder.model_name(),
                format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                ),
            ));
        }
        let dims = embedder.dims();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
            return Err(RetrievalError::unavailable(
                embedder.model_name(),
                format!("expected {}-dimensional embeddings, got {}", dims, bad.len()),
            ));
        }
        debug!(batch = batch.len(), model = embedder.model_name(), "indexed batch");
        index.add(batch, vectors).await?;
    }

    Ok(total)
}
