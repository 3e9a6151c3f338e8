//! Deterministic fakes shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::embedding::Embedder;
use crate::error::{RetrievalError, Result};

/// Embeds text as word counts over fixed concept axes.
///
/// Each axis is a list of words; component `i` of a vector is the number of
/// words in the text that belong to axis `i`.
pub struct AxisEmbedder {
    axes: Vec<Vec<&'static str>>,
    pub calls: AtomicUsize,
}

impl AxisEmbedder {
    pub fn new(axes: Vec<Vec<&'static str>>) -> Self {
        Self {
            axes,
            calls: AtomicUsize::new(0),
        }
    }

    /// Axes for the feline / canine / vehicle scenario.
    pub fn animals() -> Self {
        Self::new(vec![
            vec!["cat", "kitten", "feline"],
            vec!["dog", "puppy", "canine"],
            vec!["car", "vehicle", "engine"],
        ])
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        self.axes
            .iter()
            .map(|axis| words.iter().filter(|w| axis.contains(w)).count() as f32)
            .collect()
    }
}

#[async_trait]
impl Embedder for AxisEmbedder {
    fn model_name(&self) -> &str {
        "axis"
    }
    fn dims(&self) -> usize {
        self.axes.len()
    }
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// An embedder whose backing service is always down.
pub struct DownEmbedder;

#[async_trait]
impl Embedder for DownEmbedder {
    fn model_name(&self) -> &str {
        "down"
    }
    fn dims(&self) -> usize {
        3
    }
    async fn embed_documents(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(RetrievalError::unavailable("embedder", "connection refused"))
    }
}
