//! Query expansion for the multi-variant strategy.
//!
//! A [`QueryExpander`] turns one user question into several paraphrases.
//! [`LlmQueryExpander`] asks a [`ChatModel`] for them and parses the reply
//! one variant per line.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use crate::chat::ChatModel;
use crate::error::Result;
use crate::prompt::PromptTemplate;

/// Default instruction sent to the chat model. Placeholders: `{count}`, `{question}`.
pub const DEFAULT_EXPANSION_PROMPT: &str = "You are an AI language model assistant. \
Write {count} different versions of the user question below, so that documents \
can be retrieved from a vector database from several perspectives. Rephrasing \
the question helps work around the limits of distance-based similarity search. \
Put each alternative question on its own line and output nothing else.\n\
Original question: {question}";

/// Produces paraphrased variants of a query.
#[async_trait]
pub trait QueryExpander: Send + Sync {
    /// Return up to `count` variants of `query`. May return fewer.
    async fn expand(&self, query: &str, count: usize) -> Result<Vec<String>>;
}

/// Expander backed by a chat model.
pub struct LlmQueryExpander<'a> {
    model: &'a dyn ChatModel,
    template: PromptTemplate,
}

impl<'a> LlmQueryExpander<'a> {
    pub fn new(model: &'a dyn ChatModel) -> Result<Self> {
        Self::with_template(model, PromptTemplate::from_template(DEFAULT_EXPANSION_PROMPT)?)
    }

    /// Use a custom template. It must reference `{question}`; `{count}` is optional.
    pub fn with_template(model: &'a dyn ChatModel, template: PromptTemplate) -> Result<Self> {
        if !template.input_variables().iter().any(|v| v == "question") {
            return Err(crate::error::RetrievalError::Template(
                "expansion template must use {question}".to_string(),
            ));
        }
        Ok(Self { model, template })
    }
}

#[async_trait]
impl QueryExpander for LlmQueryExpander<'_> {
    async fn expand(&self, query: &str, count: usize) -> Result<Vec<String>> {
        let values = HashMap::from([
            ("question".to_string(), query.to_string()),
            ("count".to_string(), count.to_string()),
        ]);
        let prompt = self.template.format(&values)?;
        let reply = self.model.complete(&prompt).await?;
        let variants = parse_variants(&reply, count);
        debug!(model = self.model.model_name(), ?variants, "generated query variants");
        Ok(variants)
    }
}

/// Split a model reply into at most `count` distinct, non-empty lines.
///
/// Leading list markers (`1.`, `2)`, `-`, `*`, `•`, each followed by
/// whitespace) and surrounding quotes are stripped.
pub fn parse_variants(reply: &str, count: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for line in reply.lines() {
        let cleaned = strip_list_marker(line.trim())
            .trim()
            .trim_matches('"')
            .trim();
        if cleaned.is_empty() || out.iter().any(|v| v == cleaned) {
            continue;
        }
        out.push(cleaned.to_string());
        if out.len() == count {
            break;
        }
    }
    out
}

fn strip_list_marker(line: &str) -> &str {
    for bullet in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return rest;
        }
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(stripped) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            // `3.14` is a number, `3. text` is a list item.
            if stripped.starts_with(char::is_whitespace) {
                return stripped;
            }
        }
    }
    line
}
