//! Sparse keyword index with BM25 scoring.
//!
//! The sparse side of hybrid retrieval. The index owns its copy of the
//! indexed documents and lives in process memory beside the dense store; it
//! is rebuilt at each (re)index.

use std::collections::HashMap;

use crate::document::{IndexedDocument, ScoredDocument};

const K1: f32 = 1.2;
const B: f32 = 0.75;

/// Lowercase alphanumeric tokenization shared by the sparse index and the
/// lexical evaluation metrics.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}

struct Bm25Entry {
    document: IndexedDocument,
    tokens: Vec<String>,
}

/// A BM25 keyword index over [`IndexedDocument`]s.
#[derive(Default)]
pub struct Bm25Index {
    entries: Vec<Bm25Entry>,
    document_frequencies: HashMap<String, usize>,
}

impl Bm25Index {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document to the index.
    pub fn index(&mut self, document: IndexedDocument) {
        let tokens = tokenize(&document.text);
        let mut seen: Vec<&str> = tokens.iter().map(String::as_str).collect();
        seen.sort_unstable();
        seen.dedup();
        for token in seen {
            *self.document_frequencies.entry(token.to_string()).or_insert(0) += 1;
        }
        self.entries.push(Bm25Entry { document, tokens });
    }

    /// Drop every indexed document.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.document_frequencies.clear();
    }

    /// The number of indexed documents.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no documents.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Score every indexed document against the query and return the top `k`
    /// by descending BM25 score. Documents scoring zero are omitted.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<ScoredDocument> {
        if self.entries.is_empty() {
            return Vec::new();
        }

        let query_tokens = tokenize(query);
        let total_tokens: usize = self.entries.iter().map(|e| e.tokens.len()).sum();
        let avg_len = total_tokens as f32 / self.entries.len() as f32;

        let mut scored: Vec<ScoredDocument> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let score = self.score(&query_tokens, &entry.tokens, avg_len);
                (score > 0.0)
                    .then(|| ScoredDocument { document: entry.document.clone(), score })
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored
    }

    fn score(&self, query_tokens: &[String], doc_tokens: &[String], avg_len: f32) -> f32 {
        if doc_tokens.is_empty() {
            return 0.0;
        }
        let doc_len = doc_tokens.len() as f32;
        let total_docs = self.entries.len() as f32;

        let mut term_frequencies = HashMap::<&str, usize>::new();
        for token in doc_tokens {
            *term_frequencies.entry(token).or_insert(0) += 1;
        }

        let mut score = 0.0;
        for token in query_tokens {
            if let Some(&freq) = term_frequencies.get(token.as_str()) {
                let df = self.document_frequencies.get(token).copied().unwrap_or(1) as f32;
                let idf = ((total_docs - df + 0.5) / (df + 0.5)).ln().max(0.0);
                let numerator = freq as f32 * (K1 + 1.0);
                let denominator =
                    freq as f32 + K1 * (1.0 - B + B * (doc_len / avg_len.max(1e-3)));
                score += idf * (numerator / denominator.max(1e-6));
            }
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ChunkMetadata;

    fn doc(id: &str, text: &str) -> IndexedDocument {
        IndexedDocument {
            id: id.to_string(),
            text: text.to_string(),
            embedding: Vec::new(),
            metadata: ChunkMetadata::default(),
        }
    }

    fn index_of(texts: &[(&str, &str)]) -> Bm25Index {
        let mut index = Bm25Index::new();
        for (id, text) in texts {
            index.index(doc(id, text));
        }
        index
    }

    #[test]
    fn tokenize_lowercases_and_splits_on_non_alphanumeric() {
        assert_eq!(tokenize("Milk, pasteurized-at 63°C!"), vec!["milk", "pasteurized", "at", "63", "c"]);
    }

    #[test]
    fn exact_keyword_match_ranks_first() {
        let index = index_of(&[
            ("a", "the stock market crashed today"),
            ("b", "a cat sat on the mat"),
            ("c", "oil prices rose sharply"),
        ]);
        let results = index.search("stock market", 3);
        assert!(!results.is_empty());
        assert_eq!(results[0].document.id, "a");
    }

    #[test]
    fn unmatched_query_returns_nothing() {
        let index = index_of(&[("a", "milk and cream standards")]);
        assert!(index.search("quantum chromodynamics", 5).is_empty());
    }

    #[test]
    fn clear_resets_the_corpus() {
        let mut index = index_of(&[("a", "some text here")]);
        assert_eq!(index.len(), 1);
        index.clear();
        assert!(index.is_empty());
        assert!(index.search("text", 5).is_empty());
    }

    #[test]
    fn results_are_bounded_and_descending() {
        // Keep "milk" rare enough that its idf stays positive.
        let index = index_of(&[
            ("a", "milk milk milk"),
            ("b", "milk and cream"),
            ("c", "oil prices rose sharply"),
            ("d", "nothing relevant"),
            ("e", "stock market report"),
        ]);
        let results = index.search("milk", 2);
        assert_eq!(results.len(), 2);
        assert!(results[0].score >= results[1].score);
    }
}
