//! Recursive character chunking with offset and page tracking
//!
//! Text is split on the first separator present (`"\n\n"`, `"\n"`, `" "`, then
//! single characters), keeping each separator at the start of the piece that
//! follows it. Pieces shorter than the chunk size are merged greedily; longer
//! pieces recurse with the remaining separators. All lengths are in `char`s.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{Chunk, ChunkSource, Document};

/// Separators tried in order; the empty separator splits into characters
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

static PAGE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"--- (?:Page|Slide) (\d+) ---").expect("Invalid regex"));

/// A chunk of text located in its source
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    /// Character offset of the first char
    pub char_start: usize,
    /// Character offset one past the last char
    pub char_end: usize,
}

/// Recursive character text splitter
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Target chunk size in characters
    chunk_size: usize,
    /// Overlap between chunks
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker
    ///
    /// Callers validate `overlap < chunk_size` through the config.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            overlap,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split text into chunks
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &DEFAULT_SEPARATORS)
    }

    /// Split text and locate each chunk by character offset
    pub fn split_with_offsets(&self, text: &str) -> Vec<TextSpan> {
        let index = CharIndex::new(text);
        let mut spans = Vec::new();
        let mut prev_start = 0usize;
        let mut prev_len = 0usize;

        for chunk in self.split_text(text) {
            let len = chunk.chars().count();
            let from = (prev_start + prev_len).saturating_sub(self.overlap);
            let start = index
                .find_from(text, &chunk, from)
                .or_else(|| index.find_from(text, &chunk, 0))
                .unwrap_or(from);

            prev_start = start;
            prev_len = len;
            spans.push(TextSpan {
                text: chunk,
                char_start: start,
                char_end: start + len,
            });
        }

        spans
    }

    /// Chunk a document's sanitized text into `Chunk` records
    pub fn chunk_document(&self, doc: &Document, text: &str) -> Vec<Chunk> {
        let markers = page_markers(text);
        let spans = self.split_with_offsets(text);
        let total = spans.len() as u32;
        let extension = format!(".{}", doc.file_type.extension());

        spans
            .into_iter()
            .enumerate()
            .map(|(i, span)| {
                let page = page_for_span(&markers, span.char_start, span.char_end);
                let source = ChunkSource::new(doc.filename.clone(), doc.file_type, page);
                let mut chunk = Chunk::new(
                    doc.id,
                    span.text,
                    source,
                    span.char_start,
                    span.char_end,
                    i as u32,
                );
                chunk.total_chunks = total;
                chunk
                    .metadata
                    .insert("source".to_string(), serde_json::json!(doc.filename));
                chunk
                    .metadata
                    .insert("chunk_id".to_string(), serde_json::json!(i));
                chunk
                    .metadata
                    .insert("file_type".to_string(), serde_json::json!(extension));
                chunk
                    .metadata
                    .insert("total_chunks".to_string(), serde_json::json!(total));
                chunk
            })
            .collect()
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = separators.last().copied().unwrap_or("");
        let mut remaining: &[&str] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = sep;
                break;
            }
            if text.contains(sep) {
                separator = sep;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut good_splits: Vec<String> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if piece.chars().count() < self.chunk_size {
                good_splits.push(piece);
                continue;
            }
            if !good_splits.is_empty() {
                chunks.extend(self.merge_splits(&good_splits));
                good_splits.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_recursive(&piece, remaining));
            }
        }

        if !good_splits.is_empty() {
            chunks.extend(self.merge_splits(&good_splits));
        }

        chunks
    }

    /// Greedily merge small pieces, carrying up to `overlap` chars forward
    fn merge_splits(&self, splits: &[String]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut current: std::collections::VecDeque<(&str, usize)> =
            std::collections::VecDeque::new();
        let mut total = 0usize;

        for split in splits {
            let len = split.chars().count();
            if total + len > self.chunk_size && !current.is_empty() {
                if total > self.chunk_size {
                    tracing::warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total,
                        self.chunk_size
                    );
                }
                push_joined(&mut docs, &current);
                while total > self.overlap || (total + len > self.chunk_size && total > 0) {
                    match current.pop_front() {
                        Some((_, first_len)) => total -= first_len,
                        None => break,
                    }
                }
            }
            current.push_back((split.as_str(), len));
            total += len;
        }

        push_joined(&mut docs, &current);
        docs
    }
}

fn push_joined(docs: &mut Vec<String>, current: &std::collections::VecDeque<(&str, usize)>) {
    let joined: String = current.iter().map(|(s, _)| *s).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        docs.push(trimmed.to_string());
    }
}

/// Split so that each separator starts the piece after it; empty pieces dropped
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }

    let mut pieces = Vec::new();
    let mut parts = text.split(separator);
    if let Some(first) = parts.next() {
        if !first.is_empty() {
            pieces.push(first.to_string());
        }
    }
    for part in parts {
        pieces.push(format!("{}{}", separator, part));
    }
    pieces
}

/// Char/byte offset conversion for one text
struct CharIndex {
    /// Byte offset of every char, plus the text length
    byte_offsets: Vec<usize>,
}

impl CharIndex {
    fn new(text: &str) -> Self {
        let mut byte_offsets: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        byte_offsets.push(text.len());
        Self { byte_offsets }
    }

    /// Char offset of `needle` at or after char offset `from`
    fn find_from(&self, text: &str, needle: &str, from: usize) -> Option<usize> {
        let start_byte = *self.byte_offsets.get(from)?;
        let found = text[start_byte..].find(needle)? + start_byte;
        self.byte_offsets.binary_search(&found).ok()
    }
}

/// `(char offset, number)` of every page/slide marker
fn page_markers(text: &str) -> Vec<(usize, u32)> {
    let index = CharIndex::new(text);
    PAGE_MARKER
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let number = caps.get(1)?.as_str().parse().ok()?;
            let offset = index.byte_offsets.binary_search(&whole.start()).ok()?;
            Some((offset, number))
        })
        .collect()
}

/// Last marker at or before the span start, else the first marker inside it
fn page_for_span(markers: &[(usize, u32)], start: usize, end: usize) -> Option<u32> {
    markers
        .iter()
        .rev()
        .find(|(offset, _)| *offset <= start)
        .or_else(|| markers.iter().find(|(offset, _)| *offset < end))
        .map(|(_, page)| *page)
}
