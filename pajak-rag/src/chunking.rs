//! Document chunking.
//!
//! [`RecursiveChunker`] splits text hierarchically on paragraph breaks, line
//! breaks, and spaces before falling back to a hard per-character cut. Small
//! pieces are merged back up to the chunk size, and consecutive chunks share
//! up to `chunk_overlap` characters. All sizes and offsets count Unicode
//! scalar values, not bytes.

use std::collections::VecDeque;

use crate::document::{Chunk, ChunkMetadata, Document};

/// Separators tried in order. The empty separator is a hard cut.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and metadata but no embeddings.
/// Embeddings are attached later by the ingestion pipeline.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has no non-whitespace text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;

    /// Split every document in order. Chunks never span two documents.
    fn chunk_all(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().flat_map(|document| self.chunk(document)).collect()
    }
}

/// Splits text hierarchically: paragraphs → lines → words → characters.
///
/// Chunk IDs are generated as `{document_id}_{chunk_index}`. Each chunk
/// inherits the parent document's metadata plus its `start_index`.
///
/// # Example
///
/// ```rust,ignore
/// use pajak_rag::{Chunker, RecursiveChunker};
///
/// let chunker = RecursiveChunker::new(3000, 200);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }

    /// Split raw text into trimmed, non-empty chunk strings.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (separator, remaining) = pick_separator(text, separators);

        let mut chunks = Vec::new();
        let mut small: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                small.push(piece);
                continue;
            }

            if !small.is_empty() {
                chunks.extend(self.merge(&small));
                small.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !small.is_empty() {
            chunks.extend(self.merge(&small));
        }

        chunks
    }

    /// Greedily merge pieces up to `chunk_size`, carrying at most
    /// `chunk_overlap` characters of trailing pieces into the next chunk.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut merged = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !current.is_empty() {
                if let Some(chunk) = join_trimmed(&current) {
                    merged.push(chunk);
                }
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match current.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }
            current.push_back(piece);
            total += len;
        }

        if let Some(chunk) = join_trimmed(&current) {
            merged.push(chunk);
        }

        merged
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let text = &document.text;
        let mut chunks = Vec::new();
        let mut index: usize = 0;
        let mut previous_len: usize = 0;

        for (i, chunk_text) in self.split_text(text).into_iter().enumerate() {
            let from = (index + previous_len).saturating_sub(self.chunk_overlap);
            // Every chunk is a trimmed slice of `text`, so the full scan always hits.
            index = find_from(text, &chunk_text, from)
                .or_else(|| find_from(text, &chunk_text, 0))
                .unwrap_or(index);
            previous_len = char_len(&chunk_text);

            chunks.push(Chunk {
                id: format!("{}_{i}", document.id),
                text: chunk_text,
                metadata: ChunkMetadata {
                    source: document.metadata.source.clone(),
                    page: document.metadata.page,
                    start_index: index,
                    extra: Default::default(),
                },
                embedding: Vec::new(),
            });
        }

        chunks
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Pick the first separator present in `text` and the separators left for
/// recursing into oversized pieces.
fn pick_separator<'a>(text: &str, separators: &'a [&'a str]) -> (&'a str, &'a [&'a str]) {
    for (i, &separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return (separator, &[]);
        }
        if text.contains(separator) {
            return (separator, &separators[i + 1..]);
        }
    }
    (separators.last().copied().unwrap_or(""), &[])
}

/// Split text at a separator, attaching each separator to the start of the
/// piece that follows it. Empty pieces are dropped.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            pieces.push(&text[start..pos]);
        }
        start = pos;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn join_trimmed(pieces: &VecDeque<&str>) -> Option<String> {
    let joined: String = pieces.iter().copied().collect();
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Character index of `needle` in `haystack`, searching from character `from`.
fn find_from(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let (byte_from, _) = haystack.char_indices().nth(from)?;
    let byte_pos = byte_from + haystack[byte_from..].find(needle)?;
    Some(from + char_len(&haystack[byte_from..byte_pos]))
}
