//! Core data models: records, corpora, and selection strategies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// The atomic retrievable item: an immutable text payload plus tags.
///
/// `id` is assigned once at corpus-build time and is the identity used for
/// de-duplication. `hash` is the SHA-256 of `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub id: String,
    pub text: String,
    pub tags: BTreeMap<String, String>,
    pub hash: String,
}

impl Record {
    /// Create an untagged record with a fresh id.
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_tags(text, BTreeMap::new())
    }

    /// Create a tagged record with a fresh id.
    pub fn with_tags(text: impl Into<String>, tags: BTreeMap<String, String>) -> Self {
        let text = text.into();
        Record {
            id: Uuid::new_v4().to_string(),
            hash: content_hash(&text),
            text,
            tags,
        }
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// SHA-256 hex digest of a text payload.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// One entry of a corpus file: text plus optional tags.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecordSpec {
    pub text: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Builder for a small, fixed set of records.
///
/// ```rust
/// use rag_harness_core::models::Corpus;
///
/// let records = Corpus::new()
///     .text("Deep sleep is crucial for cellular repair.")
///     .tagged("Python balances readability with power.", [("source", "I2")])
///     .into_records();
/// assert_eq!(records.len(), 2);
/// assert_eq!(records[1].tag("source"), Some("I2"));
/// ```
#[derive(Debug, Default, Clone)]
pub struct Corpus {
    records: Vec<Record>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.records.push(Record::new(text));
        self
    }

    pub fn tagged<K, V>(mut self, text: impl Into<String>, tags: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let tags = tags
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.records.push(Record::with_tags(text, tags));
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

impl FromIterator<RecordSpec> for Corpus {
    fn from_iter<T: IntoIterator<Item = RecordSpec>>(iter: T) -> Self {
        Corpus {
            records: iter
                .into_iter()
                .map(|spec| Record::with_tags(spec.text, spec.tags))
                .collect(),
        }
    }
}

/// How the selector ranks records for a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    /// Plain nearest-neighbour ranking.
    Similarity,
    /// Maximal marginal relevance. `lambda = 1` is pure relevance,
    /// `lambda = 0` is pure diversity.
    DiversityBalanced { lambda: f32 },
    /// Expand the query into `variants` paraphrases and merge their
    /// similarity results.
    MultiVariant { variants: usize },
}

impl Strategy {
    /// Short name used in logs and CLI output.
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Similarity => "similarity",
            Strategy::DiversityBalanced { .. } => "mmr",
            Strategy::MultiVariant { .. } => "multi-query",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_ids_are_unique() {
        let a = Record::new("same text");
        let b = Record::new("same text");
        assert_ne!(a.id, b.id);
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn test_hash_is_sha256_hex() {
        let r = Record::new("abc");
        assert_eq!(
            r.hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_corpus_from_specs_keeps_order_and_tags() {
        let specs = vec![
            RecordSpec {
                text: "first".into(),
                tags: BTreeMap::new(),
            },
            RecordSpec {
                text: "second".into(),
                tags: [("source".to_string(), "H2".to_string())].into(),
            },
        ];
        let records = specs.into_iter().collect::<Corpus>().into_records();
        assert_eq!(records[0].text, "first");
        assert_eq!(records[1].tag("source"), Some("H2"));
        assert_eq!(records[0].tag("source"), None);
    }
}
