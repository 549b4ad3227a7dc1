//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`SentenceChunker`], a sliding
//! window splitter that prefers to end a chunk on a sentence terminator or line
//! break rather than in the middle of a sentence.

use std::ops::Range;

use crate::error::{RagError, Result};

/// A strategy for splitting extracted document text into chunks.
pub trait Chunker: Send + Sync {
    /// Split text into trimmed, non-empty chunks in document order.
    ///
    /// Returns an empty `Vec` if the text is empty or whitespace only.
    fn chunk(&self, text: &str) -> Vec<String>;
}

/// Splits text into overlapping windows of at most `chunk_size` characters.
///
/// When a window ends before the end of the text, the splitter looks back for the
/// last `.` or `\n` inside the window. If that character sits in the second half
/// of the window, the window is cut just after it. The next window then starts
/// `chunk_overlap` characters before the previous window's end.
///
/// Sizes are counted in `char`s, never bytes, so multi-byte text is never split
/// inside a code point.
///
/// # Example
///
/// ```rust,ignore
/// use studybuddy_rag::{Chunker, SentenceChunker};
///
/// let chunker = SentenceChunker::new(1000, 200)?;
/// let chunks = chunker.chunk(&extracted.text);
/// ```
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SentenceChunker {
    /// Create a new `SentenceChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ChunkingError`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`, either of which would stop the window
    /// from advancing.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::ChunkingError("chunk_size must be greater than zero".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::ChunkingError(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// The configured window size in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// The configured overlap in characters.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Compute the untrimmed windows as `char` index ranges.
    ///
    /// Consecutive ranges overlap by at most `chunk_overlap` characters, each
    /// range ends past the previous one, and together they cover every
    /// character of the input.
    pub fn spans(&self, text: &str) -> Vec<Range<usize>> {
        let chars: Vec<char> = text.chars().collect();
        self.spans_of(&chars)
    }

    fn spans_of(&self, chars: &[char]) -> Vec<Range<usize>> {
        let len = chars.len();
        let mut spans = Vec::new();
        let mut start = 0;
        let mut covered = 0;

        while start < len {
            let mut end = (start + self.chunk_size).min(len);

            if end < len {
                let min_break = start + self.chunk_size / 2;
                if let Some(pos) = chars[start..end].iter().rposition(|c| *c == '.' || *c == '\n')
                {
                    let pos = start + pos;
                    // The snapped window must still reach past the previous one.
                    if pos >= min_break && pos + 1 > covered {
                        end = pos + 1;
                    }
                }
            }

            spans.push(start..end);
            covered = end;

            if end >= len {
                break;
            }
            // A sentence snap can pull `end` close to `start`; always make progress.
            start = end.saturating_sub(self.chunk_overlap).max(start + 1);
        }

        spans
    }
}

impl Chunker for SentenceChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        self.spans_of(&chars)
            .into_iter()
            .filter_map(|span| {
                let piece: String = chars[span].iter().collect();
                let trimmed = piece.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .collect()
    }
}
