//! Text extraction for binary documents.
//!
//! The loader supplies bytes and a content type; this module returns plain
//! UTF-8 text. Only PDF is binary; everything else is decoded as UTF-8.

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_MARKDOWN: &str = "text/markdown";

/// Extraction error. Never a panic; the caller decides whether to skip.
#[derive(Debug)]
pub enum ExtractError {
    Pdf(String),
    Utf8(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Utf8(e) => write!(f, "not valid UTF-8 text: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Content type from a file extension. Unknown extensions are plain text.
pub fn content_type_for(ext: Option<&str>) -> &'static str {
    match ext.map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("pdf") => MIME_PDF,
        Some("md") | Some("markdown") => MIME_MARKDOWN,
        _ => MIME_TEXT,
    }
}

pub fn extract_text(bytes: &[u8], content_type: &str) -> Result<String, ExtractError> {
    match content_type {
        MIME_PDF => extract_pdf(bytes),
        _ => String::from_utf8(bytes.to_vec()).map_err(|e| ExtractError::Utf8(e.to_string())),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}
