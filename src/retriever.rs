//! Indexing and retrieval over the dense store, with optional hybrid fusion.
//!
//! The [`Retriever`] embeds chunks at index time, assigns each a fresh UUID,
//! and feeds the dense store — plus, in hybrid mode, an in-process BM25
//! index over the same documents. Retrieval is dense-only or a fusion of
//! both lists: per-list scores are max-normalized and combined with a
//! weighted sum, so exact keyword and semantic matches both contribute.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::document::{Chunk, IndexedDocument, ScoredDocument};
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::sparse::Bm25Index;
use crate::vectorstore::VectorStore;

/// Weight of the dense score in hybrid fusion.
const DENSE_WEIGHT: f32 = 0.7;

/// Weight of the sparse (BM25) score in hybrid fusion.
const SPARSE_WEIGHT: f32 = 0.3;

/// Indexes chunks into a collection and retrieves the top-k most similar.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    collection: String,
    hybrid: bool,
    sparse: RwLock<Bm25Index>,
}

impl Retriever {
    /// Create a retriever over the given collection.
    ///
    /// With `hybrid` enabled, indexing also populates a BM25 index and
    /// retrieval fuses dense and sparse scores.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        hybrid: bool,
    ) -> Self {
        Self {
            embedder,
            store,
            collection: collection.into(),
            hybrid,
            sparse: RwLock::new(Bm25Index::new()),
        }
    }

    /// The collection this retriever reads and writes.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Embed and index the given chunks.
    ///
    /// Ensures the collection exists first (dropping and recreating it when
    /// `update` is set), embeds all chunk texts in one batch, assigns each
    /// document a fresh UUID v4, and upserts. In hybrid mode the sparse index
    /// is rebuilt from the same documents.
    ///
    /// Returns the indexed documents.
    pub async fn index(&self, chunks: &[Chunk], update: bool) -> Result<Vec<IndexedDocument>> {
        self.store
            .ensure_collection(&self.collection, self.embedder.dimensions(), update)
            .await?;

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let documents: Vec<IndexedDocument> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexedDocument {
                id: Uuid::new_v4().to_string(),
                text: chunk.text.clone(),
                embedding,
                metadata: chunk.metadata.clone(),
            })
            .collect();

        self.store.upsert(&self.collection, &documents).await?;

        if self.hybrid {
            let mut sparse = self.sparse.write().await;
            if update {
                sparse.clear();
            }
            for document in &documents {
                sparse.index(document.clone());
            }
            debug!(collection = %self.collection, sparse_count = sparse.len(), "rebuilt sparse index");
        }

        info!(
            collection = %self.collection,
            document_count = documents.len(),
            hybrid = self.hybrid,
            "indexed chunks"
        );
        Ok(documents)
    }

    /// Retrieve the top-k documents for a query.
    ///
    /// Dense-only in naive mode; in hybrid mode the dense and sparse result
    /// lists are max-normalized, fused with a weighted sum (dense 0.7 /
    /// sparse 0.3), merged by id keeping the best fused score, and ranked
    /// by that score.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ScoredDocument>> {
        let query_embedding = self.embedder.embed(query).await?;
        let dense = self.store.search(&self.collection, &query_embedding, top_k).await?;

        if !self.hybrid {
            return Ok(dense);
        }

        let sparse = self.sparse.read().await.search(query, top_k);
        Ok(fuse(dense, sparse, top_k))
    }
}

/// Max-normalize a score list in place. A list whose best score is not
/// positive is left untouched.
fn max_normalize(results: &mut [ScoredDocument]) {
    let max = results.iter().map(|r| r.score).fold(0.0f32, f32::max);
    if max > 0.0 {
        for result in results.iter_mut() {
            result.score /= max;
        }
    }
}

/// Fuse dense and sparse result lists into one ranking.
fn fuse(
    mut dense: Vec<ScoredDocument>,
    mut sparse: Vec<ScoredDocument>,
    top_k: usize,
) -> Vec<ScoredDocument> {
    max_normalize(&mut dense);
    max_normalize(&mut sparse);

    let sparse_scores: HashMap<String, f32> =
        sparse.iter().map(|r| (r.document.id.clone(), r.score)).collect();
    let dense_scores: HashMap<String, f32> =
        dense.iter().map(|r| (r.document.id.clone(), r.score)).collect();

    let mut merged: HashMap<String, ScoredDocument> = HashMap::new();
    for mut result in dense.into_iter().chain(sparse.into_iter()) {
        let id = result.document.id.clone();
        let fused = DENSE_WEIGHT * dense_scores.get(&id).copied().unwrap_or(0.0)
            + SPARSE_WEIGHT * sparse_scores.get(&id).copied().unwrap_or(0.0);
        result.score = fused;
        merged
            .entry(id)
            .and_modify(|existing| {
                if result.score > existing.score {
                    *existing = result.clone();
                }
            })
            .or_insert(result);
    }

    let mut fused: Vec<ScoredDocument> = merged.into_values().collect();
    fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    fused.truncate(top_k);
    fused
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ChunkMetadata;

    fn scored(id: &str, score: f32) -> ScoredDocument {
        ScoredDocument {
            document: IndexedDocument {
                id: id.to_string(),
                text: format!("text {id}"),
                embedding: Vec::new(),
                metadata: ChunkMetadata::default(),
            },
            score,
        }
    }

    #[test]
    fn fusion_prefers_documents_in_both_lists() {
        let dense = vec![scored("both", 0.8), scored("dense_only", 1.0)];
        let sparse = vec![scored("both", 2.0)];
        let fused = fuse(dense, sparse, 10);
        // both: 0.7 * 0.8 + 0.3 * 1.0 = 0.86 beats dense_only's 0.7.
        assert_eq!(fused[0].document.id, "both");
        assert_eq!(fused[1].document.id, "dense_only");
    }

    #[test]
    fn fusion_truncates_to_top_k() {
        let dense = vec![scored("a", 1.0), scored("b", 0.9), scored("c", 0.8)];
        let fused = fuse(dense, Vec::new(), 2);
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].document.id, "a");
    }

    #[test]
    fn empty_sparse_list_degrades_to_weighted_dense() {
        let dense = vec![scored("a", 0.5), scored("b", 0.25)];
        let fused = fuse(dense, Vec::new(), 10);
        assert_eq!(fused.len(), 2);
        assert!((fused[0].score - 0.7).abs() < 1e-6);
    }
}
