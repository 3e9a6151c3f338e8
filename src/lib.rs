//! # RAG Harness
//!
//! A small retrieval toolkit over in-memory corpora. Records are embedded
//! into a vector index built for a single command, then selected by one of
//! three strategies:
//!
//! - **similarity**: nearest neighbours of the query vector
//! - **mmr**: maximal marginal relevance, trading relevance for diversity
//! - **multi-query**: an LLM paraphrases the query; per-variant results are
//!   merged and de-duplicated
//!
//! Alongside selection it carries Wikipedia retrieval, character-based text
//! splitting (text and PDF), and serialized prompt templates sent to a chat
//! model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Corpus file  │   │   Embedder   │   │  In-memory   │
//! │ Sample / Docs│──▶│ OpenAI/Ollama│──▶│ vector index │
//! └──────────────┘   └──────────────┘   └──────┬───────┘
//!                                              │
//!                     ┌────────────┐    ┌──────▼───────┐
//!                     │ Chat model │───▶│   Selector   │──▶ stdout
//!                     │ (variants) │    │ sim/mmr/multi│
//!                     └────────────┘    └──────────────┘
//! ```
//!
//! The algorithms live in `rag-harness-core`; this crate supplies the HTTP
//! providers, configuration, loaders and the `rag` CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and credentials |
//! | [`http`] | JSON over HTTP with retry |
//! | [`embedding`] | Embedding providers |
//! | [`chat`] | Chat model providers |
//! | [`wikipedia`] | Wikipedia retriever |
//! | [`corpus`] | Corpus files and built-in samples |
//! | [`loader`] | Text and PDF document loading |
//! | [`extract`] | PDF text extraction |
//! | [`select`] | `select` and `compare` commands |
//! | [`split`] | `split` command |
//! | [`prompt`] | `prompt` command |
//! | [`output`] | Result rendering |
//! | [`logging`] | tracing subscriber setup |

pub mod chat;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod extract;
pub mod http;
pub mod loader;
pub mod logging;
pub mod output;
pub mod prompt;
pub mod select;
pub mod split;
pub mod wikipedia;
