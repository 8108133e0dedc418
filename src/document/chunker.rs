//! Blank-line chunker
//!
//! Splits document text on paragraph boundaries (one or more blank lines),
//! discards whitespace-only pieces, and numbers survivors with contiguous
//! ordinals starting at 0. Pure function of its input.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::errors::ChunkingError;

/// A contiguous passage of document text, the unit of retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Insertion order, unique and contiguous within one document
    pub ordinal: usize,
    /// Passage text, non-empty after trimming
    pub text: String,
}

/// Splits raw document text into ordered chunks
#[derive(Debug, Clone)]
pub struct Chunker {
    /// Soft cap on chunk length; oversize paragraphs are re-split on
    /// whitespace so embedding-input limits are respected downstream
    max_chunk_chars: Option<usize>,
}

impl Chunker {
    /// Create a chunker with no length cap
    pub fn new() -> Self {
        Self {
            max_chunk_chars: None,
        }
    }

    /// Create a chunker that re-splits paragraphs longer than `max_chars`
    ///
    /// A cap of 0 is meaningless (no chunk could ever satisfy it) and
    /// is treated as no cap.
    pub fn with_max_chars(max_chars: Option<usize>) -> Self {
        Self {
            max_chunk_chars: max_chars.filter(|&max| max > 0),
        }
    }

    /// Split text into ordered chunks
    ///
    /// Text with no blank line yields exactly one chunk containing the
    /// whole trimmed input. Returns `ChunkingError` when nothing usable
    /// survives trimming.
    pub fn split(&self, text: &str) -> Result<Vec<Chunk>, ChunkingError> {
        let text = normalize_newlines(text);
        let mut chunks = Vec::new();

        for piece in text.split("\n\n") {
            let trimmed = piece.trim();
            if trimmed.is_empty() {
                continue;
            }

            match self.max_chunk_chars {
                Some(max) if trimmed.chars().count() > max => {
                    for part in split_at_whitespace(trimmed, max) {
                        push_chunk(&mut chunks, &part);
                    }
                }
                _ => push_chunk(&mut chunks, trimmed),
            }
        }

        if chunks.is_empty() {
            return Err(ChunkingError);
        }

        Ok(chunks)
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new()
    }
}

fn push_chunk(chunks: &mut Vec<Chunk>, text: &str) {
    if text.trim().is_empty() {
        return;
    }
    chunks.push(Chunk {
        ordinal: chunks.len(),
        text: text.trim().to_string(),
    });
}

/// Fold \r\n to \n so CRLF and LF paragraph breaks split alike, even
/// when one document mixes both
fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Break an oversize paragraph into pieces of at most `max` chars,
/// preferring the whitespace boundary nearest the cap
fn split_at_whitespace(text: &str, max: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut remaining = text;

    while remaining.chars().count() > max {
        let byte_cap = remaining
            .char_indices()
            .nth(max)
            .map(|(i, _)| i)
            .unwrap_or(remaining.len());

        let cut = remaining[..byte_cap]
            .rfind(char::is_whitespace)
            .filter(|&i| i > 0)
            .unwrap_or(byte_cap);

        parts.push(remaining[..cut].trim().to_string());
        remaining = remaining[cut..].trim_start();
    }

    if !remaining.trim().is_empty() {
        parts.push(remaining.trim().to_string());
    }

    parts
}
