//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`SemanticChunker`] — cuts chunks wherever the cosine distance between
//!   consecutive context-widened sentence embeddings exceeds a threshold
//! - [`RecursiveChunker`] — splits hierarchically by paragraphs, sentences,
//!   then words, by character count with overlap (the naive-mode splitter)

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::document::{Chunk, CombinedSentence, TextUnit};
use crate::embedding::{cosine_similarity, EmbeddingProvider};
use crate::error::{RagError, Result};
use crate::sentence::{combine_sentences, normalize_whitespace, split_into_sentences};

/// Default target chunk size for the recursive splitter, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default overlap between consecutive recursive chunks, in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// A strategy for splitting text units into chunks.
///
/// Implementations produce [`Chunk`]s with text but empty metadata;
/// metadata is attached later by the propagator.
#[async_trait]
pub trait Chunker: Send + Sync {
    /// Split the given text units into chunks.
    ///
    /// Returns an empty `Vec` if the units contain no text.
    async fn chunk(&self, units: &[TextUnit]) -> Result<Vec<Chunk>>;
}

/// Cuts chunks at embedding-distance boundaries between sentences.
///
/// The whole input is joined, normalized, and split into sentences. Each
/// sentence is widened with `buffer_size` neighbors on both sides, and the
/// widened texts are embedded in one batch. A chunk boundary is placed after
/// sentence `i` whenever `1 - cosine_similarity(i, i+1)` exceeds the
/// threshold. Emitted chunks join the *raw* sentence texts, so the buffer
/// text is never duplicated in the output.
///
/// # Example
///
/// ```rust,ignore
/// use semrag::SemanticChunker;
///
/// let chunker = SemanticChunker::new(embedder, 1, 0.3)?;
/// let chunks = chunker.chunk(&units).await?;
/// ```
pub struct SemanticChunker {
    embedder: Arc<dyn EmbeddingProvider>,
    buffer_size: usize,
    threshold: f32,
}

impl SemanticChunker {
    /// Create a new `SemanticChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `threshold` is outside the cosine
    /// distance range `[0, 2]`.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        buffer_size: usize,
        threshold: f32,
    ) -> Result<Self> {
        if !(0.0..=2.0).contains(&threshold) {
            return Err(RagError::ConfigError(format!(
                "threshold ({threshold}) must be within [0, 2]"
            )));
        }
        Ok(Self { embedder, buffer_size, threshold })
    }

    /// Compute the cosine distance between each adjacent pair of combined
    /// embeddings. Returns one distance per boundary (`len - 1` values).
    fn cosine_distances(embeddings: &[Vec<f32>]) -> Vec<f32> {
        embeddings
            .windows(2)
            .map(|pair| 1.0 - cosine_similarity(&pair[0], &pair[1]))
            .collect()
    }

    /// Partition sentences at boundary indices into maximal contiguous runs,
    /// joining each run's raw sentence texts with single spaces.
    fn emit_chunks(combined: &[CombinedSentence], boundaries: &[usize]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut start = 0;

        for &boundary in boundaries {
            let run = &combined[start..=boundary];
            chunks.push(Chunk::new(join_sentences(run)));
            start = boundary + 1;
        }

        // The final run is always emitted, boundary or not.
        if start < combined.len() {
            chunks.push(Chunk::new(join_sentences(&combined[start..])));
        }

        chunks
    }
}

fn join_sentences(run: &[CombinedSentence]) -> String {
    run.iter().map(|c| c.sentence.text.as_str()).collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl Chunker for SemanticChunker {
    async fn chunk(&self, units: &[TextUnit]) -> Result<Vec<Chunk>> {
        let joined = units.iter().map(|u| u.text.as_str()).collect::<Vec<_>>().join(" ");
        let cleaned = normalize_whitespace(&joined);
        let sentences = split_into_sentences(&cleaned);
        if sentences.is_empty() {
            return Ok(Vec::new());
        }
        debug!(sentence_count = sentences.len(), "segmented input");

        let combined = combine_sentences(&sentences, self.buffer_size);
        let texts: Vec<&str> = combined.iter().map(|c| c.combined_text.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != combined.len() {
            return Err(RagError::ChunkingError(format!(
                "embedding count ({}) does not match sentence count ({})",
                embeddings.len(),
                combined.len()
            )));
        }

        let distances = Self::cosine_distances(&embeddings);
        let boundaries: Vec<usize> = distances
            .iter()
            .enumerate()
            .filter(|(_, &d)| d > self.threshold)
            .map(|(i, _)| i)
            .collect();

        let chunks = Self::emit_chunks(&combined, &boundaries);
        info!(
            sentence_count = combined.len(),
            boundary_count = boundaries.len(),
            chunk_count = chunks.len(),
            "semantic chunking complete"
        );
        Ok(chunks)
    }
}

/// Splits text hierarchically: paragraphs → sentences → words.
///
/// First splits by paragraph separators (`\n\n`). If a paragraph exceeds
/// `chunk_size`, splits by sentence boundaries (`. `, `! `, `? `). If a
/// sentence still exceeds `chunk_size`, splits by word boundaries. Each unit
/// is split independently and its chunk texts are whitespace-normalized.
///
/// # Example
///
/// ```rust,ignore
/// use semrag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(1000, 200);
/// let chunks = chunker.chunk(&units).await?;
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of characters per chunk
    /// * `chunk_overlap` — number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

#[async_trait]
impl Chunker for RecursiveChunker {
    async fn chunk(&self, units: &[TextUnit]) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        for unit in units {
            if unit.text.is_empty() {
                continue;
            }
            let separators = ["\n\n", ". ", "! ", "? ", " "];
            let raw = split_and_merge(&unit.text, self.chunk_size, self.chunk_overlap, &separators);
            chunks.extend(
                raw.into_iter()
                    .map(|text| Chunk::new(normalize_whitespace(&text)))
                    .filter(|c| !c.text.is_empty()),
            );
        }
        Ok(chunks)
    }
}

/// Split text by a separator, then merge segments into chunks that respect
/// `chunk_size`. If a segment exceeds `chunk_size`, it is split further
/// using the next-level separator.
fn split_and_merge(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    if text.len() <= chunk_size || separators.is_empty() {
        return split_by_size(text, chunk_size, chunk_overlap);
    }

    let separator = separators[0];
    let remaining_separators = &separators[1..];

    // Separators stay attached to the preceding segment at every level, so
    // merged chunks keep the spaces between words.
    let segments: Vec<&str> = split_keeping_separator(text, separator);

    let mut chunks = Vec::new();
    let mut current = String::new();

    for segment in segments {
        if current.is_empty() {
            current = segment.to_string();
        } else if current.len() + segment.len() <= chunk_size {
            current.push_str(segment);
        } else {
            if current.len() > chunk_size {
                chunks.extend(split_and_merge(
                    &current,
                    chunk_size,
                    chunk_overlap,
                    remaining_separators,
                ));
            } else {
                chunks.push(current);
            }
            current = segment.to_string();
        }
    }

    if !current.is_empty() {
        if current.len() > chunk_size {
            chunks.extend(split_and_merge(&current, chunk_size, chunk_overlap, remaining_separators));
        } else {
            chunks.push(current);
        }
    }

    chunks
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

/// Simple character-based splitting with overlap. Slice ends are clamped to
/// char boundaries so multibyte text never splits mid-character.
fn split_by_size(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = floor_char_boundary(text, (start + chunk_size).min(text.len()));
        if end <= start {
            // A single char wider than chunk_size still has to advance.
            end = next_char_boundary(text, start);
        }
        chunks.push(text[start..end].to_string());
        if end == text.len() {
            break;
        }
        let step = chunk_size.saturating_sub(chunk_overlap);
        if step == 0 {
            break;
        }
        let next = floor_char_boundary(text, start + step);
        start = if next > start { next } else { end };
    }

    chunks
}

/// The nearest char boundary at or below `index`.
fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// The first char boundary strictly above `index`.
fn next_char_boundary(text: &str, index: usize) -> usize {
    text[index..].chars().next().map(|c| index + c.len_utf8()).unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_chunks_partitions_at_boundaries() {
        let sentences = crate::sentence::split_into_sentences("A. B. C. D.");
        let combined = crate::sentence::combine_sentences(&sentences, 0);
        let chunks = SemanticChunker::emit_chunks(&combined, &[1]);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "A. B.");
        assert_eq!(chunks[1].text, "C. D.");
    }

    #[test]
    fn emit_chunks_without_boundaries_yields_one_chunk() {
        let sentences = crate::sentence::split_into_sentences("A. B. C.");
        let combined = crate::sentence::combine_sentences(&sentences, 0);
        let chunks = SemanticChunker::emit_chunks(&combined, &[]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "A. B. C.");
    }

    #[test]
    fn boundary_on_last_pair_still_emits_final_run() {
        let sentences = crate::sentence::split_into_sentences("A. B. C.");
        let combined = crate::sentence::combine_sentences(&sentences, 0);
        let chunks = SemanticChunker::emit_chunks(&combined, &[1]);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].text, "C.");
    }

    #[test]
    fn distances_are_one_minus_similarity() {
        let embeddings = vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]];
        let distances = SemanticChunker::cosine_distances(&embeddings);
        assert_eq!(distances.len(), 2);
        assert!(distances[0].abs() < 1e-6);
        assert!((distances[1] - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn recursive_chunker_respects_size_bound() {
        let text = "para one sentence. another sentence here.\n\npara two is longer. it keeps going on and on.";
        let units = vec![TextUnit::new(text, "test.txt")];
        let chunker = RecursiveChunker::new(40, 10);
        let chunks = chunker.chunk(&units).await.unwrap();
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.text.len() <= 40, "chunk exceeds size: {:?}", chunk.text);
        }
    }

    #[tokio::test]
    async fn recursive_chunker_splits_multibyte_text_on_char_boundaries() {
        // An unbroken run of 2-byte chars longer than chunk_size.
        let text = "é".repeat(50);
        let units = vec![TextUnit::new(text, "multibyte.txt")];
        let chunks = RecursiveChunker::new(25, 5).chunk(&units).await.unwrap();
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.text.chars().all(|c| c == 'é'), "corrupt chunk: {:?}", chunk.text);
        }
    }

    #[tokio::test]
    async fn word_split_keeps_spaces_between_words() {
        let text = vec!["word"; 30].join(" ");
        let units = vec![TextUnit::new(text, "words.txt")];
        let chunks = RecursiveChunker::new(50, 10).chunk(&units).await.unwrap();
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(!chunk.text.contains("wordword"), "words ran together: {:?}", chunk.text);
        }
    }

    #[tokio::test]
    async fn recursive_chunker_skips_empty_units() {
        let units = vec![TextUnit::new("", "empty.txt")];
        let chunks = RecursiveChunker::default().chunk(&units).await.unwrap();
        assert!(chunks.is_empty());
    }
}
