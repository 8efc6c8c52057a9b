//! Recursive, content-addressed text chunking.
//!
//! Splitting walks a separator ladder from the largest semantic boundary down
//! to single characters: paragraphs (`"\n\n"`), lines (`"\n"`), sentences
//! (`". "`), words (`" "`), and finally a character window. Pieces that fit
//! the configured size are greedily merged back together, carrying up to
//! `chunk_overlap` characters of trailing context into the next segment.
//!
//! Output is deterministic: the same text, filename, and configuration always
//! produce byte-identical segments and ids.

use sha2::{Digest, Sha256};

use crate::types::Chunk;

/// Separator ladder, ordered largest semantic boundary first. The empty
/// string is the character-window fallback and always matches.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " ", ""];

/// Size and overlap settings for one document class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkerConfig {
    /// Maximum segment length in characters.
    pub chunk_size: usize,
    /// Characters of trailing context shared between consecutive segments.
    pub chunk_overlap: usize,
}

impl ChunkerConfig {
    /// Tuned for extracted-PDF text, where extraction often loses paragraph
    /// structure: larger segments, larger overlap.
    pub fn pdf() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
        }
    }

    /// Tuned for plain text files.
    pub fn plain_text() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// Deterministic content-addressed id over the exact segment text.
///
/// Identical `(filename, text)` pairs hash identically across processes and
/// time, which is what lets deduplication be a pure existence check.
pub fn chunk_id(filename: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(filename.as_bytes());
    hasher.update(b"-");
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Splits document text into overlapping, content-addressed segments.
#[derive(Clone, Copy, Debug)]
pub struct RecursiveChunker {
    config: ChunkerConfig,
}

impl RecursiveChunker {
    /// # Panics
    ///
    /// Panics if `chunk_overlap >= chunk_size`.
    pub fn new(config: ChunkerConfig) -> Self {
        assert!(
            config.chunk_overlap < config.chunk_size,
            "chunk_overlap must be smaller than chunk_size"
        );
        Self { config }
    }

    pub fn config(&self) -> ChunkerConfig {
        self.config
    }

    /// Produces the chunk sequence for one extracted document.
    ///
    /// Whitespace-only segments are discarded; ids are computed over the
    /// exact segment text plus `filename`.
    pub fn chunk(&self, text: &str, filename: &str, source_uri: &str) -> Vec<Chunk> {
        self.split_text(text, SEPARATORS)
            .into_iter()
            .filter(|segment| !segment.trim().is_empty())
            .map(|segment| Chunk {
                id: chunk_id(filename, &segment),
                text: segment,
                filename: filename.to_string(),
                source_uri: source_uri.to_string(),
            })
            .collect()
    }

    fn split_text(&self, text: &str, separators: &[&str]) -> Vec<String> {
        if text.chars().count() <= self.config.chunk_size {
            return vec![text.to_string()];
        }

        let (index, separator) = separators
            .iter()
            .enumerate()
            .find(|(_, sep)| sep.is_empty() || text.contains(**sep))
            .map(|(i, sep)| (i, *sep))
            .unwrap_or((separators.len() - 1, ""));

        if separator.is_empty() {
            return self.window_split(text);
        }
        let remaining = &separators[index + 1..];

        let mut segments = Vec::new();
        let mut pending: Vec<String> = Vec::new();
        for piece in split_keep_separator(text, separator) {
            if piece.chars().count() <= self.config.chunk_size {
                pending.push(piece.to_string());
            } else {
                // Flush merged pieces before descending, so ordering holds.
                if !pending.is_empty() {
                    segments.extend(self.merge_pieces(std::mem::take(&mut pending)));
                }
                segments.extend(self.split_text(piece, remaining));
            }
        }
        if !pending.is_empty() {
            segments.extend(self.merge_pieces(pending));
        }
        segments
    }

    /// Greedily packs sub-size pieces into segments of at most `chunk_size`
    /// characters, carrying trailing pieces worth up to `chunk_overlap`
    /// characters into the next segment.
    fn merge_pieces(&self, pieces: Vec<String>) -> Vec<String> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut segments = Vec::new();
        let mut window: Vec<(String, usize)> = Vec::new();
        let mut window_len = 0usize;

        for piece in pieces {
            let piece_len = piece.chars().count();
            if window_len + piece_len > size && !window.is_empty() {
                segments.push(concat_window(&window));
                while window_len > overlap
                    || (window_len + piece_len > size && !window.is_empty())
                {
                    let (_, dropped) = window.remove(0);
                    window_len -= dropped;
                }
            }
            window.push((piece, piece_len));
            window_len += piece_len;
        }
        if !window.is_empty() {
            segments.push(concat_window(&window));
        }
        segments
    }

    /// Character-window fallback for text with no usable separator: fixed
    /// stride of `chunk_size - chunk_overlap`, so consecutive windows share
    /// exactly `chunk_overlap` characters.
    fn window_split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let size = self.config.chunk_size;
        let step = size - self.config.chunk_overlap;

        let mut segments = Vec::new();
        let mut start = 0usize;
        loop {
            let end = (start + size).min(chars.len());
            segments.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }
        segments
    }
}

fn concat_window(window: &[(String, usize)]) -> String {
    window.iter().map(|(piece, _)| piece.as_str()).collect()
}

/// Splits on `separator`, keeping the separator attached to the preceding
/// piece so concatenating pieces reproduces the input.
fn split_keep_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0usize;
    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        pieces.push(&text[start..end]);
        start = end;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}
