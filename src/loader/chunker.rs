//! Character Text Splitter - fixed-size chunks with overlap
//!
//! The text is split on a separator (a newline by default) and the pieces are
//! merged back together until a chunk would exceed `chunk_size` characters.
//! The next chunk starts with the tail of the previous one, keeping at most
//! `chunk_overlap` characters of shared context.
//!
//! Lengths are counted in characters, not bytes, so non-ASCII text gets the
//! same chunk sizes as ASCII text.

use std::collections::VecDeque;

use crate::document::{Chunk, Document};
use crate::{Error, Result};

/// Default chunk size in characters
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Overlap between consecutive chunks to preserve context
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Pieces are split on line breaks
pub const DEFAULT_SEPARATOR: &str = "\n";

/// Splitter for extracted document text
#[derive(Debug, Clone)]
pub struct CharacterTextSplitter {
    separator: String,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for CharacterTextSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl CharacterTextSplitter {
    /// Create a splitter with default settings
    pub fn new() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }

    /// Create a splitter with custom settings
    pub fn with_settings(separator: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than zero".to_string()));
        }
        if chunk_overlap > chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) is larger than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            separator: separator.to_string(),
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split a document into numbered chunks carrying its source
    pub fn split_document(&self, document: &Document) -> Vec<Chunk> {
        self.split_text(&document.text)
            .into_iter()
            .enumerate()
            .map(|(idx, content)| Chunk::new(idx, content, document.source.clone()))
            .collect()
    }

    /// Split raw text into chunk strings
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let pieces: Vec<&str> = if self.separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(self.separator.as_str()).collect()
        };

        let pieces: Vec<&str> = pieces.into_iter().filter(|p| !p.is_empty()).collect();
        self.merge_pieces(&pieces)
    }

    /// Greedily merge pieces into chunks no longer than `chunk_size`
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let separator_len = char_len(&self.separator);
        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total: usize = 0;

        for piece in pieces {
            let piece_len = char_len(piece);
            let joiner = if current.is_empty() { 0 } else { separator_len };

            if total + piece_len + joiner > self.chunk_size {
                if total > self.chunk_size {
                    tracing::warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total,
                        self.chunk_size
                    );
                }

                if !current.is_empty() {
                    if let Some(chunk) = self.join(&current) {
                        chunks.push(chunk);
                    }

                    // Drop pieces from the front until what is left fits as overlap
                    // and the next piece can be appended.
                    while total > self.chunk_overlap
                        || (total > 0
                            && total
                                + piece_len
                                + if current.is_empty() { 0 } else { separator_len }
                                > self.chunk_size)
                    {
                        let Some(front) = current.pop_front() else {
                            break;
                        };
                        let front_joiner = if current.is_empty() { 0 } else { separator_len };
                        total = total.saturating_sub(char_len(front) + front_joiner);
                    }
                }
            }

            current.push_back(piece);
            total += piece_len + if current.len() > 1 { separator_len } else { 0 };
        }

        if let Some(chunk) = self.join(&current) {
            chunks.push(chunk);
        }

        chunks
    }

    fn join(&self, pieces: &VecDeque<&str>) -> Option<String> {
        let joined = pieces
            .iter()
            .copied()
            .collect::<Vec<_>>()
            .join(&self.separator);
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
