//! `rag select` and `rag compare`: build an in-memory index from a corpus
//! and run the selector over it.
//!
//! The index lives for one command. Records come from exactly one of a
//! corpus file, a built-in sample, or documents on disk (split with the
//! `[splitter]` settings).

use std::path::PathBuf;

use anyhow::{bail, Result};
use rag_harness_core::chat::ChatModel;
use rag_harness_core::embedding::Embedder;
use rag_harness_core::expand::LlmQueryExpander;
use rag_harness_core::index::memory::InMemoryIndex;
use rag_harness_core::index::index_records;
use rag_harness_core::retriever::{Retriever, VectorStoreRetriever};
use rag_harness_core::select::{SelectParams, Selector};
use rag_harness_core::split::CharacterTextSplitter;
use rag_harness_core::{Record, Strategy};
use tracing::info;

use crate::chat::create_chat_model;
use crate::config::{Config, Credentials};
use crate::corpus;
use crate::embedding::create_embedder;
use crate::loader;
use crate::output;

/// Where the records to index come from.
#[derive(Debug, Clone, Default)]
pub struct CorpusSource {
    pub corpus: Option<PathBuf>,
    pub sample: Option<String>,
    pub docs: Option<PathBuf>,
}

impl CorpusSource {
    pub fn load(&self, config: &Config) -> Result<Vec<Record>> {
        match (&self.corpus, &self.sample, &self.docs) {
            (Some(path), None, None) => Ok(corpus::load_corpus_file(path)?.into_records()),
            (None, Some(name), None) => Ok(corpus::sample(name)?.into_records()),
            (None, None, Some(path)) => {
                let docs = loader::load_documents(path, &loader::default_include_globs())?;
                let splitter = CharacterTextSplitter::new(
                    config.splitter.chunk_size,
                    config.splitter.chunk_overlap,
                    config.splitter.separator.clone(),
                )?;
                Ok(splitter.split_records(&docs))
            }
            (None, None, None) => bail!("No corpus given: use --corpus, --sample, or --docs"),
            _ => bail!("Use only one of --corpus, --sample, --docs"),
        }
    }
}

/// Selection request after merging CLI flags over `[retrieval]`.
#[derive(Debug, Clone)]
pub struct SelectRequest {
    pub strategy: Strategy,
    pub k: i64,
    pub params: SelectParams,
}

impl SelectRequest {
    pub fn from_config(config: &Config, strategy: Strategy) -> Self {
        Self {
            strategy,
            k: config.retrieval.k,
            params: SelectParams {
                fetch_k: config.retrieval.fetch_k,
                include_original: config.retrieval.include_original,
            },
        }
    }
}

/// Embedder, optional chat model and a built index, shared by every
/// selection a command runs.
struct PreparedIndex {
    embedder: Box<dyn Embedder>,
    chat: Option<Box<dyn ChatModel>>,
    index: InMemoryIndex,
}

impl PreparedIndex {
    /// Create the providers, then embed `records` into a fresh index using
    /// the configured distance.
    ///
    /// The chat model is created before any embedding call so a missing
    /// chat configuration fails first.
    async fn build(
        config: &Config,
        creds: &Credentials,
        records: Vec<Record>,
        with_chat: bool,
    ) -> Result<Self> {
        let embedder = create_embedder(&config.embedding, creds)?;
        let chat = if with_chat {
            Some(create_chat_model(&config.chat, creds)?)
        } else {
            None
        };

        let index = InMemoryIndex::with_distance(config.retrieval.distance);
        let indexed =
            index_records(embedder.as_ref(), &index, records, config.embedding.batch_size).await?;
        info!(
            records = indexed,
            model = embedder.model_name(),
            distance = ?index.distance(),
            "index built"
        );
        Ok(Self {
            embedder,
            chat,
            index,
        })
    }

    async fn select(&self, query: &str, request: &SelectRequest) -> Result<Vec<Record>> {
        let expander = self
            .chat
            .as_ref()
            .map(|model| LlmQueryExpander::new(model.as_ref()))
            .transpose()?;

        let mut selector = Selector::new(self.embedder.as_ref(), &self.index)
            .with_params(request.params.clone());
        if let Some(expander) = &expander {
            selector = selector.with_expander(expander);
        }

        let retriever = VectorStoreRetriever::new(selector, request.strategy.clone(), request.k);
        let results = retriever.retrieve(query).await?;
        info!(
            strategy = retriever.strategy().name(),
            results = results.len(),
            "selection complete"
        );
        Ok(results)
    }
}

fn needs_chat(strategy: &Strategy) -> bool {
    matches!(strategy, Strategy::MultiVariant { .. })
}

/// Run one selection and return the records.
pub async fn select_records(
    config: &Config,
    creds: &Credentials,
    records: Vec<Record>,
    query: &str,
    request: &SelectRequest,
) -> Result<Vec<Record>> {
    if request.k <= 0 {
        return Ok(Vec::new());
    }

    let prepared =
        PreparedIndex::build(config, creds, records, needs_chat(&request.strategy)).await?;
    prepared.select(query, request).await
}

pub async fn run_select(
    config: &Config,
    creds: &Credentials,
    source: &CorpusSource,
    query: &str,
    request: &SelectRequest,
) -> Result<()> {
    let records = source.load(config)?;
    let results = select_records(config, creds, records, query, request).await?;
    output::print_results(&results)?;
    Ok(())
}

/// Similarity results, a delimiter line, then multi-query results, both
/// selected from one index built over the corpus.
pub async fn run_compare(
    config: &Config,
    creds: &Credentials,
    source: &CorpusSource,
    query: &str,
    k: i64,
) -> Result<()> {
    let records = source.load(config)?;

    let mut similarity = SelectRequest::from_config(config, Strategy::Similarity);
    similarity.k = k;
    let mut multi = SelectRequest::from_config(
        config,
        Strategy::MultiVariant {
            variants: config.retrieval.variants,
        },
    );
    multi.k = k;

    let (first, second) = if k <= 0 {
        (Vec::new(), Vec::new())
    } else {
        let prepared = PreparedIndex::build(config, creds, records, true).await?;
        (
            prepared.select(query, &similarity).await?,
            prepared.select(query, &multi).await?,
        )
    };

    let mut out = std::io::stdout().lock();
    output::write_results(&mut out, &first)?;
    output::write_delimiter(&mut out)?;
    output::write_results(&mut out, &second)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_requires_exactly_one() {
        let config = Config::default();
        assert!(CorpusSource::default().load(&config).is_err());

        let both = CorpusSource {
            sample: Some("mmr".to_string()),
            docs: Some(PathBuf::from(".")),
            ..CorpusSource::default()
        };
        assert!(both.load(&config).is_err());
    }

    #[test]
    fn test_sample_source() {
        let source = CorpusSource {
            sample: Some("health".to_string()),
            ..CorpusSource::default()
        };
        assert_eq!(source.load(&Config::default()).unwrap().len(), 10);
    }

    #[test]
    fn test_docs_source_is_split() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x".repeat(450)).unwrap();
        let source = CorpusSource {
            docs: Some(dir.path().to_path_buf()),
            ..CorpusSource::default()
        };
        let chunks = source.load(&Config::default()).unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].tag("source").unwrap().ends_with("a.txt"));
    }

    #[tokio::test]
    async fn test_non_positive_k_needs_no_credentials() {
        let config = Config::default();
        let request = SelectRequest {
            strategy: Strategy::Similarity,
            k: 0,
            params: SelectParams::default(),
        };
        let records = corpus::sample("animals").unwrap().into_records();
        let results = select_records(&config, &Credentials::default(), records, "kitten", &request)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_is_configuration_error() {
        let config = Config::default();
        let request = SelectRequest::from_config(&config, Strategy::Similarity);
        let records = corpus::sample("animals").unwrap().into_records();
        let err = select_records(&config, &Credentials::default(), records, "kitten", &request)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
