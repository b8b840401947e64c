//! Vector store trait for storing and searching chunk embeddings.

use async_trait::async_trait;

use crate::document::{IndexedDocument, ScoredDocument};
use crate::error::Result;

/// A storage backend for chunk embeddings with similarity search.
///
/// Implementations manage named collections of [`IndexedDocument`]s. There is
/// no update path for stored documents: re-indexing with `update = true`
/// replaces the whole collection. The destructive recreate must not run
/// concurrently with readers; serializing rebuilds against query traffic is
/// the caller's responsibility.
///
/// # Example
///
/// ```rust,ignore
/// use semrag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.ensure_collection("docs", 384, false).await?;
/// store.upsert("docs", &documents).await?;
/// let results = store.search("docs", &query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Ensure a named collection exists.
    ///
    /// Idempotent: an existing collection is reused when `update` is false,
    /// and dropped and recreated when `update` is true.
    async fn ensure_collection(&self, name: &str, dimensions: usize, update: bool) -> Result<()>;

    /// Delete a named collection and all its data.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Upsert documents into a collection. Documents must have embeddings set.
    ///
    /// Identifiers are assigned by the caller; no dedup logic exists, so
    /// inserting the same content under fresh ids creates duplicates.
    async fn upsert(&self, collection: &str, documents: &[IndexedDocument]) -> Result<()>;

    /// Search for the `top_k` most similar documents to the given embedding.
    ///
    /// Returns results ordered by descending similarity score, each carrying
    /// its stored metadata.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredDocument>>;

    /// Count the documents stored in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;
}
