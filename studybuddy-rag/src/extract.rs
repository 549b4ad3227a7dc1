//! Text extraction from uploaded documents.

use tracing::debug;

use crate::error::{RagError, Result};

/// Plain text pulled out of a document, plus its page count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    /// Concatenated text of every page.
    pub text: String,
    /// Number of pages in the source document.
    pub page_count: usize,
}

/// Turns raw document bytes into text.
///
/// Extraction is CPU bound and synchronous; the ingestion pipeline runs it on
/// the blocking thread pool.
pub trait TextExtractor: Send + Sync {
    /// Extract the text of a document.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ExtractionError`] for unreadable input and
    /// [`RagError::NoExtractableText`] when the result is blank.
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedText>;
}

/// Extracts text from PDF files using `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedText> {
        let document = lopdf::Document::load_mem(bytes)
            .map_err(|e| RagError::ExtractionError(format!("failed to parse PDF: {e}")))?;

        let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
        let page_count = page_numbers.len();
        let text = document
            .extract_text(&page_numbers)
            .map_err(|e| RagError::ExtractionError(format!("failed to read PDF text: {e}")))?;

        debug!(page_count, text_len = text.len(), "extracted PDF text");
        ensure_text(text, page_count)
    }
}

/// Treats the input as UTF-8 text with a single page.
///
/// Useful for plain-text notes and for exercising the pipeline without PDFs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedText> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| RagError::ExtractionError(format!("input is not UTF-8: {e}")))?;
        ensure_text(text.to_string(), 1)
    }
}

fn ensure_text(text: String, page_count: usize) -> Result<ExtractedText> {
    if text.trim().is_empty() {
        return Err(RagError::NoExtractableText);
    }
    Ok(ExtractedText { text, page_count })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_are_an_extraction_error() {
        let err = PdfExtractor::new().extract(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, RagError::ExtractionError(_)));
    }

    #[test]
    fn blank_text_is_rejected() {
        let err = PlainTextExtractor.extract(b"  \n\t ").unwrap_err();
        assert!(matches!(err, RagError::NoExtractableText));
    }

    #[test]
    fn plain_text_reports_one_page() {
        let extracted = PlainTextExtractor.extract(b"Sine is opposite over hypotenuse.").unwrap();
        assert_eq!(extracted.page_count, 1);
        assert!(extracted.text.starts_with("Sine"));
    }
}
