//! # semrag
//!
//! A document question-answering pipeline: semantic chunking of document
//! corpora, hybrid dense+sparse retrieval, a retrieval-augmented generation
//! chain, and a benchmark-driven evaluation harness.
//!
//! The pipeline flows loader → sentence segmenter → context combiner →
//! semantic chunker → metadata propagator → vector store → RAG chain. Two
//! modes exist: `super` (folder corpus, semantic chunks, structural metadata,
//! hybrid retrieval) and `naive` (single file, character chunks, dense-only).
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use semrag::{
//!     AppConfig, InMemoryVectorStore, QueryEngine, RagPipeline,
//!     openai::{OpenAIChatModel, OpenAIEmbeddingProvider},
//! };
//!
//! let config = AppConfig::load("config.yaml")?;
//! let pipeline = RagPipeline::builder()
//!     .embedding_provider(Arc::new(
//!         OpenAIEmbeddingProvider::new(&config.openai_api_key)?.with_model(&config.model_name),
//!     ))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .generator(Arc::new(
//!         OpenAIChatModel::new(&config.openai_api_key)?.with_model(&config.model),
//!     ))
//!     .build()?;
//!
//! let rag = pipeline.initialize(&config, false).await?;
//! let result = rag.chain.answer("What are the milk pasteurization procedures?").await?;
//! println!("{}", result.answer);
//! ```

pub mod chain;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod eval;
pub mod generation;
pub mod inmemory;
pub mod loader;
pub mod metrics;
pub mod openai;
pub mod pipeline;
#[cfg(feature = "qdrant")]
pub mod qdrant;
pub mod retriever;
pub mod sentence;
pub mod sparse;
pub mod structure;
pub mod vectorstore;

pub use chain::{ChainAnswer, QueryEngine, RagChain, DEFAULT_TOP_K};
pub use chunking::{Chunker, RecursiveChunker, SemanticChunker};
pub use config::{AppConfig, RagMode};
pub use document::{
    Chunk, ChunkMetadata, CombinedSentence, DocumentProperties, IndexedDocument, ScoredDocument,
    Sentence, TextUnit,
};
pub use embedding::{cosine_similarity, EmbeddingProvider};
pub use error::{RagError, Result};
pub use eval::{
    load_benchmark, save_benchmark, CancellationToken, EvaluationHarness, EvaluationRecord, QaPair,
    SUMMARY_ROW_LABEL,
};
pub use generation::Generator;
pub use inmemory::InMemoryVectorStore;
pub use loader::{stash_uploads, DocumentLoader};
pub use metrics::{score_record, summarize, MetricScores, MetricSummary};
pub use pipeline::{
    write_chunk_preview, InitializedRag, RagPipeline, RagPipelineBuilder, NAIVE_COLLECTION,
    SUPER_COLLECTION,
};
pub use retriever::Retriever;
pub use sparse::Bm25Index;
pub use structure::{MetadataPropagator, RegulatoryMatcher, StructureMatcher};
pub use vectorstore::VectorStore;
