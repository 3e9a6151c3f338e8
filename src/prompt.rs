//! `rag prompt`: render a serialized prompt template and send it to the
//! chat model.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use rag_harness_core::prompt::PromptTemplate;
use tracing::{debug, info};

use crate::chat::create_chat_model;
use crate::config::{Config, Credentials};

/// Read a JSON prompt template from disk.
pub fn load_prompt(path: &Path) -> Result<PromptTemplate> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read prompt template: {}", path.display()))?;
    let template = PromptTemplate::from_json(&content)
        .with_context(|| format!("Invalid prompt template: {}", path.display()))?;
    Ok(template)
}

/// Render the template at `path` with `vars`. Unless `dry_run`, send the
/// rendered prompt to the configured chat model and print the reply;
/// otherwise print the prompt itself.
pub async fn run_prompt(
    config: &Config,
    creds: &Credentials,
    path: &Path,
    vars: Vec<(String, String)>,
    dry_run: bool,
) -> Result<()> {
    let template = load_prompt(path)?;
    debug!(
        template = template.template(),
        variables = ?template.input_variables(),
        "loaded prompt template"
    );
    let values: HashMap<String, String> = vars.into_iter().collect();
    let rendered = template.format(&values)?;

    if dry_run {
        println!("{}", rendered);
        return Ok(());
    }

    let model = create_chat_model(&config.chat, creds)?;
    info!(model = model.model_name(), "sending prompt");
    let reply = model.complete(&rendered).await?;
    println!("{}", reply);
    Ok(())
}
