//! In-memory [`VectorIndex`] implementation.
//!
//! Uses a `Vec` behind `std::sync::RwLock` for thread safety. Search is
//! brute-force over all stored vectors under the configured [`Distance`].

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::embedding::Distance;
use crate::error::{RetrievalError, Result};
use crate::models::Record;

use super::{Candidate, VectorIndex};

struct Entry {
    record: Record,
    vector: Vec<f32>,
}

/// In-memory index for one-shot corpora.
pub struct InMemoryIndex {
    entries: RwLock<Vec<Entry>>,
    distance: Distance,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::with_distance(Distance::default())
    }

    pub fn with_distance(distance: Distance) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            distance,
        }
    }

    pub fn distance(&self) -> Distance {
        self.distance
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Entry>>> {
        self.entries
            .read()
            .map_err(|_| RetrievalError::unavailable("index", "lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Entry>>> {
        self.entries
            .write()
            .map_err(|_| RetrievalError::unavailable("index", "lock poisoned"))
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn add(&self, records: Vec<Record>, vectors: Vec<Vec<f32>>) -> Result<()> {
        if records.len() != vectors.len() {
            return Err(RetrievalError::InvalidParameter(format!(
                "{} records but {} vectors",
                records.len(),
                vectors.len()
            )));
        }

        let mut entries = self.write()?;
        let expected_dims = entries
            .first()
            .map(|e| e.vector.len())
            .or_else(|| vectors.first().map(Vec::len));
        if let Some(dims) = expected_dims {
            if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
                return Err(RetrievalError::InvalidParameter(format!(
                    "vector dimension mismatch: expected {}, got {}",
                    dims,
                    bad.len()
                )));
            }
        }

        entries.extend(
            records
                .into_iter()
                .zip(vectors)
                .map(|(record, vector)| Entry { record, vector }),
        );
        Ok(())
    }

    async fn search_by_vector(&self, query_vec: &[f32], limit: usize) -> Result<Vec<Candidate>> {
        let entries = self.read()?;
        if let Some(first) = entries.first() {
            if first.vector.len() != query_vec.len() {
                return Err(RetrievalError::InvalidParameter(format!(
                    "query vector dimension mismatch: index has {}, got {}",
                    first.vector.len(),
                    query_vec.len()
                )));
            }
        }
        let mut candidates: Vec<Candidate> = entries
            .iter()
            .map(|e| Candidate {
                record: e.record.clone(),
                vector: e.vector.clone(),
                distance: self.distance.between(query_vec, &e.vector),
            })
            .collect();
        // sort_by is stable, so equal distances keep insertion order.
        candidates.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(limit);
        Ok(candidates)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}
