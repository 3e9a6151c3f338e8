//! Error taxonomy shared by every stage of the selection pipeline.
//!
//! An empty corpus is deliberately absent from this list: it produces an
//! empty result set, not an error.

use thiserror::Error;

/// Errors surfaced by the core pipeline and its external capabilities.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// A credential or required setting is absent. Raised by constructors,
    /// before any service call is attempted.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    /// An embedder, index, chat model, or remote retriever could not
    /// answer. Never retried or degraded by the core.
    #[error("{service} unavailable: {reason}")]
    ServiceUnavailable { service: String, reason: String },

    /// A caller-supplied parameter is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The chosen strategy needs a component that was not wired in.
    #[error("missing capability: {0}")]
    MissingCapability(&'static str),

    /// Prompt template parsing or formatting failed.
    #[error("template error: {0}")]
    Template(String),
}

impl RetrievalError {
    /// Shorthand for [`RetrievalError::ServiceUnavailable`].
    pub fn unavailable(service: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        RetrievalError::ServiceUnavailable {
            service: service.into(),
            reason: reason.to_string(),
        }
    }

    /// True for failures of an external service.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, RetrievalError::ServiceUnavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
