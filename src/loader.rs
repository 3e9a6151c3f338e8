//! Document loader: turns a file or a directory tree into records.
//!
//! Directories are walked recursively and filtered by include globs
//! (relative to the root). Default excludes skip `.git`, `target` and
//! `node_modules`. Each file becomes one record tagged with `source` (the
//! path) and `content_type`. Output is sorted by path.

use std::path::Path;

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use rag_harness_core::Record;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::extract::{content_type_for, extract_text};

pub const SOURCE_TAG: &str = "source";
pub const CONTENT_TYPE_TAG: &str = "content_type";

pub fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.txt".to_string(),
        "**/*.md".to_string(),
        "**/*.pdf".to_string(),
    ]
}

/// Load `path` as records. A file is always loaded; a directory is walked
/// with `include_globs`.
pub fn load_documents(path: &Path, include_globs: &[String]) -> Result<Vec<Record>> {
    if !path.exists() {
        bail!("Document path does not exist: {}", path.display());
    }
    if path.is_file() {
        return Ok(vec![load_file(path)?]);
    }

    let include_set = build_globset(include_globs)?;
    let exclude_set = build_globset(&[
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ])?;

    let mut files = Vec::new();
    for entry in WalkDir::new(path) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file = entry.path();
        let relative = file.strip_prefix(path).unwrap_or(file);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }
        files.push(file.to_path_buf());
    }

    // Sort for deterministic ordering
    files.sort();

    let mut records = Vec::with_capacity(files.len());
    for file in &files {
        match load_file(file) {
            Ok(record) => records.push(record),
            Err(e) => warn!(path = %file.display(), error = %e, "skipping document"),
        }
    }
    debug!(root = %path.display(), loaded = records.len(), "documents loaded");
    Ok(records)
}

fn load_file(path: &Path) -> Result<Record> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let content_type = content_type_for(path.extension().and_then(|e| e.to_str()));
    let text = extract_text(&bytes, content_type)
        .with_context(|| format!("Failed to extract text from {}", path.display()))?;

    Ok(Record::with_tags(
        text,
        [
            (SOURCE_TAG.to_string(), path.display().to_string()),
            (CONTENT_TYPE_TAG.to_string(), content_type.to_string()),
        ]
        .into_iter()
        .collect(),
    ))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_walks_directory_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("notes")).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("notes/b.md"), "# Bee").unwrap();
        fs::write(dir.path().join("a.txt"), "Ay").unwrap();
        fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();
        fs::write(dir.path().join(".git/config.txt"), "ignored").unwrap();

        let records = load_documents(dir.path(), &default_include_globs()).unwrap();
        let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["Ay", "# Bee"]);
        assert_eq!(records[1].tag(CONTENT_TYPE_TAG), Some("text/markdown"));
        assert!(records[0].tag(SOURCE_TAG).unwrap().ends_with("a.txt"));
    }

    #[test]
    fn test_single_file_ignores_globs() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.log");
        fs::write(&file, "line one").unwrap();
        let records = load_documents(&file, &default_include_globs()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].tag(CONTENT_TYPE_TAG), Some("text/plain"));
    }

    #[test]
    fn test_unreadable_file_is_skipped_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ok.txt"), "fine").unwrap();
        fs::write(dir.path().join("broken.pdf"), "not a pdf").unwrap();
        let records = load_documents(dir.path(), &default_include_globs()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "fine");
    }

    #[test]
    fn test_missing_path() {
        assert!(load_documents(Path::new("/definitely/not/here"), &[]).is_err());
    }
}
