//! # RAG Harness Core
//!
//! Shared logic for RAG Harness: records and corpora, the vector index
//! abstraction, selection strategies (similarity, MMR, multi-query),
//! prompt templates, and text splitting.
//!
//! This crate contains no tokio runtime, HTTP client, or filesystem I/O.
//! Embedding models, chat models, and remote retrievers are reached
//! through the [`embedding::Embedder`], [`chat::ChatModel`] and
//! [`retriever::Retriever`] traits, implemented by the app crate.

pub mod chat;
pub mod embedding;
pub mod error;
pub mod expand;
pub mod index;
pub mod models;
pub mod prompt;
pub mod retriever;
pub mod select;
pub mod split;

#[cfg(test)]
mod testing;

pub use error::{Result, RetrievalError};
pub use models::{Corpus, Record, Strategy};
