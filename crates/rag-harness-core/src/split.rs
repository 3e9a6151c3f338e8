//! Character-based text splitter.
//!
//! Splits text on a separator and greedily merges the pieces back into
//! chunks of at most `chunk_size` characters, carrying up to
//! `chunk_overlap` characters of trailing context into the next chunk.
//!
//! # Algorithm
//!
//! 1. Split the text on `separator`. An empty separator splits into single
//!    characters. Empty pieces are dropped.
//! 2. Append pieces to a window while the joined length stays within
//!    `chunk_size`.
//! 3. When the next piece does not fit, emit the window (trimmed; empty
//!    chunks are skipped), then drop pieces from the front until the
//!    window is no longer than `chunk_overlap` and the next piece fits.
//! 4. A single piece longer than `chunk_size` is emitted as its own
//!    oversize chunk.
//!
//! # Example
//!
//! ```rust
//! use rag_harness_core::split::CharacterTextSplitter;
//!
//! let splitter = CharacterTextSplitter::new(10, 0, "").unwrap();
//! let chunks = splitter.split_text("abcdefghijklmnopqrstuvwxyz");
//! assert_eq!(chunks, vec!["abcdefghij", "klmnopqrst", "uvwxyz"]);
//! ```

use std::collections::VecDeque;

use tracing::warn;

use crate::error::{RetrievalError, Result};
use crate::models::Record;

/// Tag set on chunk records pointing at the record they came from.
pub const PARENT_ID_TAG: &str = "parent_id";
/// Tag set on chunk records with their 0-based position within the parent.
pub const CHUNK_INDEX_TAG: &str = "chunk_index";

/// Splits text on a separator into bounded, optionally overlapping chunks.
#[derive(Debug, Clone)]
pub struct CharacterTextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separator: String,
}

impl CharacterTextSplitter {
    /// # Errors
    ///
    /// `InvalidParameter` when `chunk_size` is zero or smaller than
    /// `chunk_overlap`.
    pub fn new(chunk_size: usize, chunk_overlap: usize, separator: impl Into<String>) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RetrievalError::InvalidParameter(
                "chunk_size must be > 0".to_string(),
            ));
        }
        if chunk_overlap > chunk_size {
            return Err(RetrievalError::InvalidParameter(format!(
                "chunk_overlap ({}) must not exceed chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separator: separator.into(),
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let pieces: Vec<&str> = if self.separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(self.separator.as_str())
                .filter(|p| !p.is_empty())
                .collect()
        };
        self.merge(&pieces)
    }

    /// Split every record, producing chunk records in order.
    ///
    /// Each chunk gets a fresh id and hash, inherits the parent's tags, and
    /// is tagged with [`PARENT_ID_TAG`] and [`CHUNK_INDEX_TAG`].
    pub fn split_records(&self, records: &[Record]) -> Vec<Record> {
        let mut out = Vec::new();
        for parent in records {
            for (i, chunk) in self.split_text(&parent.text).into_iter().enumerate() {
                let mut tags = parent.tags.clone();
                tags.insert(PARENT_ID_TAG.to_string(), parent.id.clone());
                tags.insert(CHUNK_INDEX_TAG.to_string(), i.to_string());
                out.push(Record::with_tags(chunk, tags));
            }
        }
        out
    }

    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let sep_len = self.separator.chars().count();
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = piece.chars().count();
            let joiner = if window.is_empty() { 0 } else { sep_len };

            if total + len + joiner > self.chunk_size {
                if total > self.chunk_size {
                    warn!(
                        size = total,
                        limit = self.chunk_size,
                        "created a chunk longer than chunk_size"
                    );
                }
                if !window.is_empty() {
                    self.emit(&window, &mut chunks);
                    loop {
                        let joiner = if window.is_empty() { 0 } else { sep_len };
                        let too_long = total > self.chunk_overlap
                            || (total > 0 && total + len + joiner > self.chunk_size);
                        if !too_long {
                            break;
                        }
                        let Some((_, front_len)) = window.pop_front() else {
                            break;
                        };
                        let dropped_joiner = if window.is_empty() { 0 } else { sep_len };
                        total -= front_len + dropped_joiner;
                    }
                }
            }

            let joiner = if window.is_empty() { 0 } else { sep_len };
            window.push_back((piece, len));
            total += len + joiner;
        }

        if !window.is_empty() {
            if total > self.chunk_size {
                warn!(
                    size = total,
                    limit = self.chunk_size,
                    "created a chunk longer than chunk_size"
                );
            }
            self.emit(&window, &mut chunks);
        }
        chunks
    }

    fn emit(&self, window: &VecDeque<(&str, usize)>, chunks: &mut Vec<String>) {
        let joined = window
            .iter()
            .map(|(p, _)| *p)
            .collect::<Vec<_>>()
            .join(&self.separator);
        let trimmed = joined.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_rejects_bad_sizes() {
        assert!(CharacterTextSplitter::new(0, 0, "").is_err());
        assert!(CharacterTextSplitter::new(10, 11, "").is_err());
        assert!(CharacterTextSplitter::new(10, 10, "").is_ok());
    }

    #[test]
    fn test_empty_separator_fixed_windows() {
        let s = CharacterTextSplitter::new(200, 0, "").unwrap();
        let text = "x".repeat(450);
        let chunks = s.split_text(&text);
        let lens: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(lens, vec![200, 200, 50]);
    }

    #[test]
    fn test_words_never_exceed_chunk_size() {
        let s = CharacterTextSplitter::new(20, 0, " ").unwrap();
        let text = "the quick brown fox jumps over the lazy dog and keeps running far away";
        let chunks = s.split_text(text);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 20, "chunk too long: {:?}", c);
        }
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn test_overlap_carries_context() {
        let s = CharacterTextSplitter::new(7, 3, " ").unwrap();
        let chunks = s.split_text("foo bar baz 123");
        assert_eq!(chunks, vec!["foo bar", "bar baz", "baz 123"]);
    }

    #[test]
    fn test_oversize_piece_kept_whole() {
        let s = CharacterTextSplitter::new(5, 0, " ").unwrap();
        let chunks = s.split_text("tiny enormousword end");
        assert_eq!(chunks, vec!["tiny", "enormousword", "end"]);
    }

    #[test]
    fn test_blank_chunks_dropped() {
        let s = CharacterTextSplitter::new(3, 0, "").unwrap();
        let chunks = s.split_text("ab    cd");
        assert_eq!(chunks, vec!["ab", "cd"]);
    }

    #[test]
    fn test_multibyte_chars_counted_as_chars() {
        let s = CharacterTextSplitter::new(2, 0, "").unwrap();
        let chunks = s.split_text("┌──┐");
        assert_eq!(chunks, vec!["┌─", "─┐"]);
    }

    #[test]
    fn test_empty_text() {
        let s = CharacterTextSplitter::new(10, 0, "\n\n").unwrap();
        assert!(s.split_text("").is_empty());
    }

    #[test]
    fn test_split_records_tags_chunks() {
        let s = CharacterTextSplitter::new(5, 0, "").unwrap();
        let parent = Record::with_tags(
            "abcdefghij",
            BTreeMap::from([("source".to_string(), "dl-curriculum.pdf".to_string())]),
        );
        let chunks = s.split_records(std::slice::from_ref(&parent));
        assert_eq!(chunks.len(), 2);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.tag("source"), Some("dl-curriculum.pdf"));
            assert_eq!(c.tag(PARENT_ID_TAG), Some(parent.id.as_str()));
            assert_eq!(c.tag(CHUNK_INDEX_TAG), Some(i.to_string().as_str()));
            assert_ne!(c.id, parent.id);
        }
        assert_eq!(chunks[1].text, "fghij");
    }

    #[test]
    fn test_deterministic() {
        let s = CharacterTextSplitter::new(8, 2, " ").unwrap();
        let text = "Alpha Beta Gamma Delta Epsilon";
        assert_eq!(s.split_text(text), s.split_text(text));
    }
}
