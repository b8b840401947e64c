//! Error types for the `semrag` crate.

use thiserror::Error;

/// Errors that can occur in the chunking, retrieval, and evaluation pipeline.
#[derive(Debug, Error)]
pub enum RagError {
    /// A source document could not be read or parsed.
    #[error("Load error ({path}): {message}")]
    LoadError {
        /// The file that failed to load.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during answer generation.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during document chunking.
    #[error("Chunking error: {0}")]
    ChunkingError(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// An error in the evaluation harness.
    #[error("Evaluation error: {0}")]
    EvaluationError(String),

    /// An I/O error from reading or writing pipeline files.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// An error reading or writing a tabular (CSV) file.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// A convenience result type for pipeline operations.
pub type Result<T> = std::result::Result<T, RagError>;
