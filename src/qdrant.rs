//! Qdrant vector store backend.
//!
//! Provides [`QdrantVectorStore`] which implements [`VectorStore`] using
//! the [qdrant-client](https://docs.rs/qdrant-client) crate over gRPC.
//! Only available when the `qdrant` feature is enabled.
//!
//! # Example
//!
//! ```rust,ignore
//! use semrag::qdrant::QdrantVectorStore;
//!
//! let store = QdrantVectorStore::new("http://localhost:6334")?;
//! store.ensure_collection("my_documents", 1536, false).await?;
//! store.upsert("my_documents", &documents).await?;
//! let results = store.search("my_documents", &query_embedding, 5).await?;
//! ```

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tracing::debug;

use crate::document::{ChunkMetadata, IndexedDocument, ScoredDocument};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// A [`VectorStore`] backed by [Qdrant](https://qdrant.tech/).
///
/// Collections map to Qdrant collections with cosine distance. Chunk text and
/// structural metadata are stored as point payload.
pub struct QdrantVectorStore {
    client: Qdrant,
}

impl QdrantVectorStore {
    /// Create a new Qdrant vector store connecting to the given URL.
    pub fn new(url: &str) -> Result<Self> {
        let client = Qdrant::from_url(url).build().map_err(Self::map_err)?;
        Ok(Self { client })
    }

    /// Create a new Qdrant vector store with default URL (`http://localhost:6334`).
    pub fn default_url() -> Result<Self> {
        Self::new("http://localhost:6334")
    }

    /// Create a new Qdrant vector store from an existing client.
    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }

    fn map_err(e: qdrant_client::QdrantError) -> RagError {
        RagError::VectorStoreError { backend: "qdrant".to_string(), message: e.to_string() }
    }

    /// Extract a string from a Qdrant payload value.
    fn extract_string(value: &QdrantValue) -> Option<String> {
        match &value.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        }
    }
}

fn metadata_field(value: Option<&String>) -> serde_json::Value {
    match value {
        Some(s) => serde_json::Value::String(s.clone()),
        None => serde_json::Value::Null,
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn ensure_collection(&self, name: &str, dimensions: usize, update: bool) -> Result<()> {
        let collections = self.client.list_collections().await.map_err(Self::map_err)?;
        let exists = collections.collections.iter().any(|c| c.name == name);

        if exists {
            if !update {
                debug!(collection = name, "qdrant collection already exists, reusing");
                return Ok(());
            }
            self.client.delete_collection(name).await.map_err(Self::map_err)?;
            debug!(collection = name, "dropped qdrant collection for recreate");
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dimensions as u64, Distance::Cosine)),
            )
            .await
            .map_err(Self::map_err)?;

        debug!(collection = name, dimensions, "created qdrant collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.client.delete_collection(name).await.map_err(Self::map_err)?;
        debug!(collection = name, "deleted qdrant collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, documents: &[IndexedDocument]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = documents
            .iter()
            .map(|document| {
                let mut payload_map = serde_json::Map::new();
                payload_map
                    .insert("text".to_string(), serde_json::Value::String(document.text.clone()));
                payload_map
                    .insert("title".to_string(), metadata_field(document.metadata.title.as_ref()));
                payload_map.insert(
                    "subtitle".to_string(),
                    metadata_field(document.metadata.subtitle.as_ref()),
                );
                payload_map.insert(
                    "sub_subtitle".to_string(),
                    metadata_field(document.metadata.sub_subtitle.as_ref()),
                );

                let payload =
                    Payload::try_from(serde_json::Value::Object(payload_map)).unwrap_or_default();

                PointStruct::new(document.id.clone(), document.embedding.clone(), payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(Self::map_err)?;

        debug!(collection, count = documents.len(), "upserted documents to qdrant");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredDocument>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, embedding.to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(Self::map_err)?;

        let results = response
            .result
            .into_iter()
            .map(|scored| {
                let id = scored
                    .id
                    .as_ref()
                    .and_then(|pid| match &pid.point_id_options {
                        Some(PointIdOptions::Uuid(s)) => Some(s.clone()),
                        Some(PointIdOptions::Num(n)) => Some(n.to_string()),
                        None => None,
                    })
                    .unwrap_or_default();

                let text =
                    scored.payload.get("text").and_then(Self::extract_string).unwrap_or_default();

                let metadata = ChunkMetadata {
                    title: scored.payload.get("title").and_then(Self::extract_string),
                    subtitle: scored.payload.get("subtitle").and_then(Self::extract_string),
                    sub_subtitle: scored.payload.get("sub_subtitle").and_then(Self::extract_string),
                };

                ScoredDocument {
                    document: IndexedDocument { id, text, embedding: vec![], metadata },
                    score: scored.score,
                }
            })
            .collect();

        Ok(results)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let response = self
            .client
            .count(CountPointsBuilder::new(collection).exact(true))
            .await
            .map_err(Self::map_err)?;
        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }
}
