//! Plain-text rendering of result sets.
//!
//! Each record prints as a numbered block:
//!
//! ```text
//!
//! --- Result 1 ---
//! Deep sleep is crucial for cellular repair and emotional regulation.
//! [source: H3]
//! ```
//!
//! Chunk bookkeeping tags (`parent_id`, `chunk_index`) are not shown.

use std::io::{self, Write};

use rag_harness_core::split::{CHUNK_INDEX_TAG, PARENT_ID_TAG};
use rag_harness_core::Record;

/// Line printed between two result sets in `compare`.
pub const DELIMITER_WIDTH: usize = 150;

pub fn write_results<W: Write>(out: &mut W, records: &[Record]) -> io::Result<()> {
    if records.is_empty() {
        writeln!(out, "No results.")?;
        return Ok(());
    }
    for (i, record) in records.iter().enumerate() {
        writeln!(out)?;
        writeln!(out, "--- Result {} ---", i + 1)?;
        writeln!(out, "{}", record.text)?;
        let tags: Vec<String> = record
            .tags
            .iter()
            .filter(|(k, _)| k.as_str() != PARENT_ID_TAG && k.as_str() != CHUNK_INDEX_TAG)
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect();
        if !tags.is_empty() {
            writeln!(out, "[{}]", tags.join(", "))?;
        }
    }
    Ok(())
}

pub fn write_delimiter<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", "*".repeat(DELIMITER_WIDTH))
}

pub fn print_results(records: &[Record]) -> io::Result<()> {
    write_results(&mut io::stdout().lock(), records)
}
