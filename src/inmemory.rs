//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a zero-dependency vector
//! store backed by a `HashMap` protected by a `tokio::sync::RwLock`. It is
//! the default backend and the test double for the external ones.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{IndexedDocument, ScoredDocument};
use crate::embedding::cosine_similarity;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// An in-memory vector store using cosine similarity for search.
///
/// Collections are stored as nested `HashMap`s: collection name → document ID
/// → document. All operations are async-safe via `tokio::sync::RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, HashMap<String, IndexedDocument>>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing_collection(collection: &str) -> RagError {
    RagError::VectorStoreError {
        backend: "InMemory".to_string(),
        message: format!("collection '{collection}' does not exist"),
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn ensure_collection(&self, name: &str, _dimensions: usize, update: bool) -> Result<()> {
        let mut collections = self.collections.write().await;
        if update {
            debug!(collection = name, "recreating collection");
            collections.insert(name.to_string(), HashMap::new());
        } else {
            collections.entry(name.to_string()).or_default();
        }
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, documents: &[IndexedDocument]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing_collection(collection))?;
        for document in documents {
            store.insert(document.id.clone(), document.clone());
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredDocument>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing_collection(collection))?;

        let mut scored: Vec<ScoredDocument> = store
            .values()
            .map(|document| {
                let score = cosine_similarity(&document.embedding, embedding);
                ScoredDocument { document: document.clone(), score }
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing_collection(collection))?;
        Ok(store.len())
    }
}
