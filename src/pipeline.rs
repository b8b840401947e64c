//! Pipeline orchestrator: mode dispatch, indexing, and chain assembly.
//!
//! [`RagPipeline`] wires the loader, chunkers, metadata propagator,
//! retriever, and chain together according to the active [`AppConfig`].
//! Initialization is per-call: the configuration is taken by reference so an
//! external caller can toggle the mode between runs.
//!
//! # Example
//!
//! ```rust,ignore
//! use semrag::{AppConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .embedding_provider(embedder)
//!     .vector_store(store)
//!     .generator(generator)
//!     .build()?;
//!
//! let config = AppConfig::load("config.yaml")?;
//! let rag = pipeline.initialize(&config, false).await?;
//! let result = rag.chain.answer("What are the labeling requirements?").await?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::chain::RagChain;
use crate::chunking::{Chunker, RecursiveChunker, SemanticChunker};
use crate::config::{AppConfig, RagMode};
use crate::document::Chunk;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::Generator;
use crate::loader::DocumentLoader;
use crate::retriever::Retriever;
use crate::structure::{MetadataPropagator, RegulatoryMatcher, StructureMatcher};
use crate::vectorstore::VectorStore;

/// Collection name for the super-mode corpus.
pub const SUPER_COLLECTION: &str = "my_documents";

/// Collection name for the naive-mode document.
pub const NAIVE_COLLECTION: &str = "naive_documents";

/// A fully initialized pipeline instance for one mode.
pub struct InitializedRag {
    /// The query→answer chain.
    pub chain: Arc<RagChain>,
    /// The retriever behind the chain, exposed for direct retrieval.
    pub retriever: Arc<Retriever>,
    /// The chunks that were indexed, in order.
    pub chunks: Vec<Chunk>,
}

/// Wires providers into the mode-appropriate ingest-and-query pipeline.
///
/// Construct one via [`RagPipeline::builder()`]; the structure matcher
/// defaults to [`RegulatoryMatcher`].
pub struct RagPipeline {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    generator: Arc<dyn Generator>,
    matcher: Arc<dyn StructureMatcher>,
    loader: DocumentLoader,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Initialize the pipeline for the mode named in `config`.
    ///
    /// Super mode loads the corpus folder, chunks it semantically, annotates
    /// structural metadata, and indexes into the hybrid `my_documents`
    /// collection. Naive mode loads a single file, splits it by character
    /// count, and indexes into the dense-only `naive_documents` collection.
    /// With `update` set, the target collection is dropped and repopulated.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] for an invalid configuration,
    /// [`RagError::PipelineError`] when no chunks can be produced, and
    /// propagates backend errors unchanged.
    pub async fn initialize(&self, config: &AppConfig, update: bool) -> Result<InitializedRag> {
        config.validate()?;

        let (chunks, retriever) = match config.rag {
            RagMode::Super => {
                // validate() guarantees the path is present.
                let folder = config.directory_path.as_deref().ok_or_else(|| {
                    RagError::ConfigError("'directory_path' is required".to_string())
                })?;
                let units = self.loader.load_folder(folder)?;

                let chunker = SemanticChunker::new(
                    Arc::clone(&self.embedding_provider),
                    config.buffer_size,
                    config.threshold,
                )?;
                let chunks = chunker.chunk(&units).await?;

                let propagator =
                    MetadataPropagator::new(Arc::clone(&self.matcher), config.max_previous_chunks);
                let annotated = propagator.annotate(chunks);

                let retriever = Retriever::new(
                    Arc::clone(&self.embedding_provider),
                    Arc::clone(&self.vector_store),
                    SUPER_COLLECTION,
                    true,
                );
                (annotated, retriever)
            }
            RagMode::Naive => {
                let file = config.file_path.as_deref().ok_or_else(|| {
                    RagError::ConfigError("'file_path' is required".to_string())
                })?;
                let units = self.loader.load_file(file)?;

                let chunks = RecursiveChunker::default().chunk(&units).await?;
                let retriever = Retriever::new(
                    Arc::clone(&self.embedding_provider),
                    Arc::clone(&self.vector_store),
                    NAIVE_COLLECTION,
                    false,
                );
                (chunks, retriever)
            }
        };

        if chunks.is_empty() {
            return Err(RagError::PipelineError(
                "chunking produced no chunks; check the corpus configuration".to_string(),
            ));
        }

        let retriever = Arc::new(retriever);
        retriever.index(&chunks, update).await?;

        let chain = Arc::new(RagChain::new(Arc::clone(&retriever), Arc::clone(&self.generator)));
        info!(mode = %config.rag, chunk_count = chunks.len(), "pipeline initialized");

        Ok(InitializedRag { chain, retriever, chunks })
    }
}

#[derive(Serialize)]
struct ChunkPreviewRow<'a> {
    chunk_text: &'a str,
    title: Option<&'a str>,
    subtitle: Option<&'a str>,
    sub_subtitle: Option<&'a str>,
}

/// Write the last `show_chunks` chunks to `chunks_<mode>.csv` and return the
/// path.
///
/// # Errors
///
/// Returns [`RagError::PipelineError`] when fewer chunks exist than
/// requested.
pub fn write_chunk_preview(chunks: &[Chunk], mode: RagMode, show_chunks: usize) -> Result<PathBuf> {
    if chunks.len() < show_chunks {
        return Err(RagError::PipelineError(format!(
            "chunk preview needs at least {show_chunks} chunks, got {}",
            chunks.len()
        )));
    }

    let path = PathBuf::from(format!("chunks_{mode}.csv"));
    let mut writer = csv::Writer::from_path(&path)?;
    for chunk in &chunks[chunks.len() - show_chunks..] {
        writer.serialize(ChunkPreviewRow {
            chunk_text: &chunk.text,
            title: chunk.metadata.title.as_deref(),
            subtitle: chunk.metadata.subtitle.as_deref(),
            sub_subtitle: chunk.metadata.sub_subtitle.as_deref(),
        })?;
    }
    writer.flush()?;
    info!(path = %path.display(), count = show_chunks, "wrote chunk preview");
    Ok(path)
}

/// Builder for constructing a [`RagPipeline`].
///
/// The embedding provider, vector store, and generator are required; the
/// structure matcher and loader have defaults.
#[derive(Default)]
pub struct RagPipelineBuilder {
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    generator: Option<Arc<dyn Generator>>,
    matcher: Option<Arc<dyn StructureMatcher>>,
    loader: Option<DocumentLoader>,
}

impl RagPipelineBuilder {
    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the generation model.
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set the structure matcher used for metadata propagation.
    pub fn matcher(mut self, matcher: Arc<dyn StructureMatcher>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    /// Set the document loader.
    pub fn loader(mut self, loader: DocumentLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::ConfigError("generator is required".to_string()))?;

        Ok(RagPipeline {
            embedding_provider,
            vector_store,
            generator,
            matcher: self.matcher.unwrap_or_else(|| Arc::new(RegulatoryMatcher)),
            loader: self.loader.unwrap_or_default(),
        })
    }
}
