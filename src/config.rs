use anyhow::{bail, Context, Result};
use rag_harness_core::embedding::Distance;
use rag_harness_core::RetrievalError;
use serde::Deserialize;
use std::path::Path;

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "config/rag.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub splitter: SplitterConfig,
    #[serde(default)]
    pub wikipedia: WikipediaConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: Option<String>,
    #[serde(default = "default_embedding_dims")]
    pub dims: Option<usize>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_embedding_model(),
            dims: default_embedding_dims(),
            url: None,
            batch_size: default_batch_size(),
            max_retries: 0,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_embedding_model() -> Option<String> {
    Some("text-embedding-ada-002".to_string())
}
fn default_embedding_dims() -> Option<usize> {
    Some(1536)
}
fn default_batch_size() -> usize {
    64
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_chat_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_chat_model(),
            temperature: default_temperature(),
            url: None,
            max_retries: 0,
            timeout_secs: default_chat_timeout_secs(),
        }
    }
}

fn default_chat_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_chat_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub k: i64,
    #[serde(default = "default_fetch_k")]
    pub fetch_k: usize,
    #[serde(default = "default_lambda")]
    pub lambda: f32,
    #[serde(default = "default_variants")]
    pub variants: usize,
    #[serde(default)]
    pub include_original: bool,
    #[serde(default)]
    pub distance: Distance,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            fetch_k: default_fetch_k(),
            lambda: default_lambda(),
            variants: default_variants(),
            include_original: false,
            distance: Distance::default(),
        }
    }
}

fn default_k() -> i64 {
    4
}
fn default_fetch_k() -> usize {
    20
}
fn default_lambda() -> f32 {
    0.5
}
fn default_variants() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct SplitterConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub chunk_overlap: usize,
    #[serde(default)]
    pub separator: String,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: 0,
            separator: String::new(),
        }
    }
}

fn default_chunk_size() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct WikipediaConfig {
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default = "default_top_k_results")]
    pub top_k_results: usize,
    #[serde(default = "default_doc_content_chars_max")]
    pub doc_content_chars_max: usize,
    /// API endpoint; `{lang}` is replaced with [`WikipediaConfig::lang`].
    #[serde(default = "default_wikipedia_url")]
    pub url: String,
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            lang: default_lang(),
            top_k_results: default_top_k_results(),
            doc_content_chars_max: default_doc_content_chars_max(),
            url: default_wikipedia_url(),
        }
    }
}

fn default_lang() -> String {
    "en".to_string()
}
fn default_top_k_results() -> usize {
    3
}
fn default_doc_content_chars_max() -> usize {
    4000
}
fn default_wikipedia_url() -> String {
    "https://{lang}.wikipedia.org/w/api.php".to_string()
}

impl WikipediaConfig {
    pub fn endpoint(&self) -> String {
        self.url.replace("{lang}", &self.lang)
    }
}

/// API credentials, read once from the environment (after `.env`).
#[derive(Clone, Default)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
        }
    }

    /// The OpenAI key, or `ConfigurationMissing`.
    pub fn require_openai(&self) -> std::result::Result<&str, RetrievalError> {
        self.openai_api_key.as_deref().ok_or_else(|| {
            RetrievalError::ConfigurationMissing(
                "OPENAI_API_KEY environment variable not set".to_string(),
            )
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if given, else [`DEFAULT_CONFIG_PATH`] if it exists, else
/// built-in defaults.
pub fn resolve_config(path: Option<&Path>) -> Result<Config> {
    resolve_config_in(Path::new("."), path)
}

/// [`resolve_config`] with the default path looked up under `dir`.
pub fn resolve_config_in(dir: &Path, path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => load_config(p),
        None => {
            let fallback = dir.join(DEFAULT_CONFIG_PATH);
            if fallback.exists() {
                load_config(&fallback)
            } else {
                Ok(Config::default())
            }
        }
    }
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate embedding
    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" | "local" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }
    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }
    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }

    // Validate chat
    match config.chat.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => bail!(
            "Unknown chat provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    // Validate retrieval
    if !(0.0..=1.0).contains(&config.retrieval.lambda) {
        bail!("retrieval.lambda must be in [0.0, 1.0]");
    }
    if config.retrieval.variants == 0 {
        bail!("retrieval.variants must be >= 1");
    }

    // Validate splitter
    if config.splitter.chunk_size == 0 {
        bail!("splitter.chunk_size must be > 0");
    }
    if config.splitter.chunk_overlap > config.splitter.chunk_size {
        bail!("splitter.chunk_overlap must not exceed splitter.chunk_size");
    }

    // Validate wikipedia
    if config.wikipedia.top_k_results == 0 {
        bail!("wikipedia.top_k_results must be >= 1");
    }

    Ok(())
}
