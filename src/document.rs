//! Data types for the stages of the chunking and retrieval pipeline.
//!
//! Each stage boundary has one explicit value type: the loader emits
//! [`TextUnit`]s, the segmenter emits [`Sentence`]s, the combiner emits
//! [`CombinedSentence`]s, the chunkers emit [`Chunk`]s, and the vector store
//! owns [`IndexedDocument`]s after insertion.

use serde::{Deserialize, Serialize};

/// The sentinel value used for document properties that are absent from the
/// source file. Downstream code can assume every property is always present.
pub const UNKNOWN_PROPERTY: &str = "Unknown";

/// Document-level properties extracted from a source file (PDF Info dictionary).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentProperties {
    /// The document author, or `"Unknown"`.
    pub author: String,
    /// The document title, or `"Unknown"`.
    pub title: String,
    /// The creation date string, or `"Unknown"`.
    pub creation_date: String,
    /// The modification date string, or `"Unknown"`.
    pub modification_date: String,
}

impl Default for DocumentProperties {
    fn default() -> Self {
        Self {
            author: UNKNOWN_PROPERTY.to_string(),
            title: UNKNOWN_PROPERTY.to_string(),
            creation_date: UNKNOWN_PROPERTY.to_string(),
            modification_date: UNKNOWN_PROPERTY.to_string(),
        }
    }
}

/// One unit of extracted text: a PDF page, or a whole txt/docx file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextUnit {
    /// The extracted plain text.
    pub text: String,
    /// The source file path this unit came from.
    pub source: String,
    /// The 1-based page number for per-page PDF extraction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    /// Document-level properties, with `"Unknown"` sentinels when not enriched.
    pub properties: DocumentProperties,
}

impl TextUnit {
    /// Create a text unit with default (sentinel) properties.
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self { text: text.into(), source: source.into(), page: None, properties: DocumentProperties::default() }
    }
}

/// A single sentence with its position in the source sequence.
///
/// Immutable once created; ordering by `index` is the only meaningful order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sentence {
    /// 0-based, contiguous position in the sentence sequence.
    pub index: usize,
    /// The sentence text, terminator attached.
    pub text: String,
}

/// A [`Sentence`] widened with a symmetric window of neighboring sentences.
///
/// The combined text is what gets embedded for boundary detection; the raw
/// sentence text is what ends up in emitted chunks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CombinedSentence {
    /// The underlying sentence.
    pub sentence: Sentence,
    /// Space-joined window of `buffer_size` neighbors on each side plus the
    /// sentence itself.
    pub combined_text: String,
}

/// Hierarchical structure markers carried by a chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    /// The nearest preceding title marker, if any.
    pub title: Option<String>,
    /// The nearest preceding subtitle marker, if any.
    pub subtitle: Option<String>,
    /// The nearest preceding sub-subtitle marker, if any.
    pub sub_subtitle: Option<String>,
}

/// A contiguous merged span of sentences treated as one retrievable unit.
///
/// Created once by a chunker (text), enriched by the metadata propagator
/// (metadata), never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// The merged sentence text.
    pub text: String,
    /// Structural metadata propagated onto this chunk.
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Create a chunk with empty metadata.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), metadata: ChunkMetadata::default() }
    }
}

/// A chunk bound to a unique identifier and an embedding vector, as stored
/// in the vector store. Immutable after insertion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedDocument {
    /// Externally generated unique identifier (UUID v4).
    pub id: String,
    /// The chunk text.
    pub text: String,
    /// The embedding vector for `text`.
    pub embedding: Vec<f32>,
    /// Structural metadata stored alongside the text.
    pub metadata: ChunkMetadata,
}

/// A retrieved [`IndexedDocument`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    /// The retrieved document.
    pub document: IndexedDocument,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}
