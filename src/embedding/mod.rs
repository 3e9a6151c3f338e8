//! Embedding providers implementing the core [`Embedder`] trait.
//!
//! - **[`DisabledEmbedder`]**: fails every call; used when embeddings are not configured.
//! - **[`OpenAIEmbedder`]**: calls an OpenAI-compatible `POST /embeddings` endpoint.
//! - **[`OllamaEmbedder`]**: calls a local Ollama instance's `/api/embed` endpoint.
//! - **`LocalEmbedder`**: runs models locally via fastembed (feature
//!   `local-embeddings-fastembed`); no network calls after model download.
//!
//! # Provider Selection
//!
//! Use [`create_embedder`] to instantiate the provider named in the
//! configuration:
//!
//! ```rust
//! # use rag_harness::config::{Credentials, EmbeddingConfig};
//! # use rag_harness::embedding::create_embedder;
//! let config = EmbeddingConfig {
//!     provider: "disabled".to_string(),
//!     ..EmbeddingConfig::default()
//! };
//! let embedder = create_embedder(&config, &Credentials::default()).unwrap();
//! assert_eq!(embedder.model_name(), "disabled");
//! ```
//!
//! Remote providers retry according to [`crate::http`].

#[cfg(feature = "local-embeddings-fastembed")]
mod local;

use async_trait::async_trait;
use rag_harness_core::embedding::Embedder;
use rag_harness_core::{Result, RetrievalError};
use serde_json::Value;
use tracing::debug;

use crate::config::{Credentials, EmbeddingConfig};
use crate::http::{endpoint, Service};

#[cfg(feature = "local-embeddings-fastembed")]
pub use local::LocalEmbedder;

const OPENAI_URL: &str = "https://api.openai.com/v1";
const OLLAMA_URL: &str = "http://localhost:11434";

// ============ Disabled Provider ============

/// An embedder that always fails with `ConfigurationMissing`.
///
/// Used when `embedding.provider = "disabled"`.
pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed_documents(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(RetrievalError::ConfigurationMissing(
            "embedding provider is disabled".to_string(),
        ))
    }
}

// ============ OpenAI Provider ============

/// Embedder backed by an OpenAI-compatible embeddings API.
///
/// Sends every batch as one `POST {url}/embeddings` request with the
/// configured model. The API key is taken from [`Credentials`].
pub struct OpenAIEmbedder {
    model: String,
    dims: usize,
    url: String,
    api_key: String,
    service: Service,
}

impl OpenAIEmbedder {
    /// # Errors
    ///
    /// `ConfigurationMissing` if `model`, `dims` or `OPENAI_API_KEY` is
    /// absent. No request is made.
    pub fn new(config: &EmbeddingConfig, creds: &Credentials) -> Result<Self> {
        let (model, dims) = model_and_dims(config, "OpenAI")?;
        let api_key = creds.require_openai()?.to_string();
        let url = config.url.clone().unwrap_or_else(|| OPENAI_URL.to_string());
        let service = Service::new("OpenAI embeddings", config.timeout_secs, config.max_retries)?;
        Ok(Self {
            model,
            dims,
            url,
            api_key,
            service,
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        debug!(model = %self.model, batch = texts.len(), "embedding with OpenAI");
        let json = self
            .service
            .post_json(&endpoint(&self.url, "embeddings"), Some(&self.api_key), &body)
            .await?;
        parse_openai_response(&json).map_err(|reason| self.service.unavailable(reason))
    }
}

/// Parse the OpenAI embeddings API response JSON.
///
/// Extracts the `data[].embedding` arrays, ordered by `data[].index` when
/// present.
fn parse_openai_response(json: &Value) -> std::result::Result<Vec<Vec<f32>>, String> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or("invalid response: missing data array")?;

    let mut indexed = Vec::with_capacity(data.len());
    for (pos, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .ok_or("invalid response: missing embedding")?;
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(pos);
        indexed.push((index, to_vector(embedding)?));
    }
    indexed.sort_by_key(|(i, _)| *i);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Ollama Provider ============

/// Embedder backed by a local Ollama instance.
///
/// Calls `POST {url}/api/embed` (default `http://localhost:11434`).
/// Requires an embedding model pulled into Ollama, e.g.
/// `ollama pull nomic-embed-text`.
pub struct OllamaEmbedder {
    model: String,
    dims: usize,
    url: String,
    service: Service,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model, dims) = model_and_dims(config, "Ollama")?;
        let url = config.url.clone().unwrap_or_else(|| OLLAMA_URL.to_string());
        let service = Service::new("Ollama embeddings", config.timeout_secs, config.max_retries)?;
        Ok(Self {
            model,
            dims,
            url,
            service,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = self
            .service
            .post_json(&endpoint(&self.url, "api/embed"), None, &body)
            .await?;
        parse_ollama_response(&json).map_err(|reason| self.service.unavailable(reason))
    }
}

fn parse_ollama_response(json: &Value) -> std::result::Result<Vec<Vec<f32>>, String> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or("invalid response: missing embeddings array")?;

    embeddings.iter().map(to_vector).collect()
}

fn to_vector(value: &Value) -> std::result::Result<Vec<f32>, String> {
    value
        .as_array()
        .ok_or_else(|| "invalid response: embedding is not an array".to_string())?
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| "invalid response: non-numeric embedding value".to_string())
        })
        .collect()
}

fn model_and_dims(config: &EmbeddingConfig, provider: &str) -> Result<(String, usize)> {
    let model = config.model.clone().ok_or_else(|| {
        RetrievalError::ConfigurationMissing(format!("embedding.model required for {} provider", provider))
    })?;
    let dims = config.dims.filter(|d| *d > 0).ok_or_else(|| {
        RetrievalError::ConfigurationMissing(format!("embedding.dims required for {} provider", provider))
    })?;
    Ok((model, dims))
}

/// Create the [`Embedder`] named by `config.provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledEmbedder`] |
/// | `"openai"` | [`OpenAIEmbedder`] |
/// | `"ollama"` | [`OllamaEmbedder`] |
/// | `"local"` | `LocalEmbedder` (feature `local-embeddings-fastembed`) |
pub fn create_embedder(config: &EmbeddingConfig, creds: &Credentials) -> Result<Box<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledEmbedder)),
        "openai" => Ok(Box::new(OpenAIEmbedder::new(config, creds)?)),
        "ollama" => Ok(Box::new(OllamaEmbedder::new(config)?)),
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Box::new(LocalEmbedder::new(config)?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => Err(RetrievalError::ConfigurationMissing(
            "local embedding provider requires --features local-embeddings-fastembed".to_string(),
        )),
        other => Err(RetrievalError::InvalidParameter(format!(
            "unknown embedding provider: {}",
            other
        ))),
    }
}
