//! `rag split`: load documents and print their chunks.

use std::path::Path;

use anyhow::{bail, Result};
use rag_harness_core::split::CharacterTextSplitter;
use tracing::info;

use crate::config::Config;
use crate::loader;
use crate::output;

/// Overrides for the `[splitter]` section.
#[derive(Debug, Clone, Default)]
pub struct SplitOverrides {
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub separator: Option<String>,
}

pub fn splitter_from(config: &Config, overrides: &SplitOverrides) -> Result<CharacterTextSplitter> {
    let splitter = CharacterTextSplitter::new(
        overrides.chunk_size.unwrap_or(config.splitter.chunk_size),
        overrides.chunk_overlap.unwrap_or(config.splitter.chunk_overlap),
        overrides
            .separator
            .clone()
            .unwrap_or_else(|| config.splitter.separator.clone()),
    )?;
    Ok(splitter)
}

/// Split the document(s) at `path`. With `index`, print only that chunk's
/// text; otherwise print every chunk as a result block.
pub fn run_split(
    config: &Config,
    path: &Path,
    overrides: &SplitOverrides,
    index: Option<usize>,
) -> Result<()> {
    let splitter = splitter_from(config, overrides)?;
    let docs = loader::load_documents(path, &loader::default_include_globs())?;
    let chunks = splitter.split_records(&docs);
    info!(
        documents = docs.len(),
        chunks = chunks.len(),
        chunk_size = splitter.chunk_size(),
        "split complete"
    );

    match index {
        Some(i) => match chunks.get(i) {
            Some(chunk) => println!("{}", chunk.text),
            None => bail!(
                "Chunk index {} out of range: {} chunk(s) produced",
                i,
                chunks.len()
            ),
        },
        None => output::print_results(&chunks)?,
    }
    Ok(())
}
