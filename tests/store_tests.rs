//! Tests for the in-memory vector store and the hybrid retriever.

use std::sync::Arc;

use proptest::prelude::*;
use semrag::{
    Chunk, ChunkMetadata, EmbeddingProvider, IndexedDocument, InMemoryVectorStore, Retriever,
    VectorStore,
};

fn document(id: &str, embedding: Vec<f32>) -> IndexedDocument {
    IndexedDocument {
        id: id.to_string(),
        text: format!("document {id}"),
        embedding,
        metadata: ChunkMetadata::default(),
    }
}

fn arb_embedding(dimensions: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0, dimensions)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Search returns at most `top_k` results, in non-increasing score order.
    #[test]
    fn search_is_bounded_and_descending(
        embeddings in proptest::collection::vec(arb_embedding(4), 1..16),
        query in arb_embedding(4),
        top_k in 1usize..8,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = InMemoryVectorStore::new();
            store.ensure_collection("test", 4, false).await.unwrap();

            let documents: Vec<IndexedDocument> = embeddings
                .into_iter()
                .enumerate()
                .map(|(i, e)| document(&format!("doc-{i}"), e))
                .collect();
            store.upsert("test", &documents).await.unwrap();

            let results = store.search("test", &query, top_k).await.unwrap();
            assert!(results.len() <= top_k);
            for pair in results.windows(2) {
                assert!(pair[0].score >= pair[1].score);
            }
        });
    }
}

#[tokio::test]
async fn ensure_collection_without_update_preserves_contents() {
    let store = InMemoryVectorStore::new();
    store.ensure_collection("test", 2, false).await.unwrap();
    store.upsert("test", &[document("a", vec![1.0, 0.0])]).await.unwrap();

    store.ensure_collection("test", 2, false).await.unwrap();
    assert_eq!(store.count("test").await.unwrap(), 1);
}

#[tokio::test]
async fn ensure_collection_with_update_drops_contents() {
    let store = InMemoryVectorStore::new();
    store.ensure_collection("test", 2, false).await.unwrap();
    store.upsert("test", &[document("a", vec![1.0, 0.0])]).await.unwrap();

    store.ensure_collection("test", 2, true).await.unwrap();
    assert_eq!(store.count("test").await.unwrap(), 0);
}

#[tokio::test]
async fn upsert_into_missing_collection_fails() {
    let store = InMemoryVectorStore::new();
    let result = store.upsert("missing", &[document("a", vec![1.0])]).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn delete_collection_removes_it() {
    let store = InMemoryVectorStore::new();
    store.ensure_collection("test", 2, false).await.unwrap();
    store.delete_collection("test").await.unwrap();
    assert!(store.count("test").await.is_err());
}

/// Embeds every text to the same unit vector, so all dense scores tie and
/// retrieval outcomes depend only on the sparse side.
struct ConstantEmbedder;

#[async_trait::async_trait]
impl EmbeddingProvider for ConstantEmbedder {
    async fn embed(&self, _text: &str) -> semrag::Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }

    fn dimensions(&self) -> usize {
        2
    }
}

fn chunk(text: &str) -> Chunk {
    Chunk::new(text)
}

#[tokio::test]
async fn hybrid_retrieval_surfaces_exact_keyword_match() {
    let store = Arc::new(InMemoryVectorStore::new());
    let retriever = Retriever::new(Arc::new(ConstantEmbedder), store, "test", true);

    let chunks = vec![
        chunk("General provisions apply to all establishments."),
        chunk("Pasteurization of milk requires heating to a minimum temperature."),
        chunk("Labels must carry the establishment number."),
        chunk("Inspection occurs before and after processing."),
    ];
    retriever.index(&chunks, false).await.unwrap();

    // top_k covers the whole corpus so tied dense scores cannot push the
    // keyword match out of the dense candidate list.
    let results = retriever.retrieve("pasteurization temperature", 4).await.unwrap();
    // Dense scores all tie, so the sparse keyword match must rank first.
    assert!(results[0].document.text.contains("Pasteurization"));
}

#[tokio::test]
async fn dense_only_retrieval_ignores_keywords() {
    let store = Arc::new(InMemoryVectorStore::new());
    let retriever = Retriever::new(Arc::new(ConstantEmbedder), store, "test", false);

    let chunks = vec![chunk("alpha text"), chunk("beta text"), chunk("gamma text")];
    retriever.index(&chunks, false).await.unwrap();

    let results = retriever.retrieve("beta", 2).await.unwrap();
    assert_eq!(results.len(), 2);
    // All dense scores tie; no sparse signal exists to reorder them.
    assert!((results[0].score - results[1].score).abs() < 1e-6);
}

#[tokio::test]
async fn reindex_with_update_replaces_the_collection() {
    let store = Arc::new(InMemoryVectorStore::new());
    let retriever =
        Retriever::new(Arc::new(ConstantEmbedder), Arc::clone(&store) as Arc<dyn VectorStore>, "test", true);

    let first = vec![chunk("one"), chunk("two"), chunk("three")];
    retriever.index(&first, false).await.unwrap();
    assert_eq!(store.count("test").await.unwrap(), 3);

    let second = vec![chunk("four"), chunk("five")];
    retriever.index(&second, true).await.unwrap();
    assert_eq!(store.count("test").await.unwrap(), 2);
}

#[tokio::test]
async fn reindex_without_update_accumulates() {
    let store = Arc::new(InMemoryVectorStore::new());
    let retriever =
        Retriever::new(Arc::new(ConstantEmbedder), Arc::clone(&store) as Arc<dyn VectorStore>, "test", false);

    retriever.index(&[chunk("one")], false).await.unwrap();
    retriever.index(&[chunk("two")], false).await.unwrap();
    // Fresh UUIDs per call, so both batches remain.
    assert_eq!(store.count("test").await.unwrap(), 2);
}
