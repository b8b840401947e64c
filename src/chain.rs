//! The retrieval-augmented generation chain.
//!
//! [`RagChain::answer`] retrieves top-k contexts, renders them into a fixed
//! prompt template, and invokes the generation model. The retrieved contexts
//! are part of the return value so the evaluation harness sees retrieval and
//! generation separately; they are never black-boxed together.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::Result;
use crate::generation::Generator;
use crate::retriever::Retriever;

/// Default number of contexts retrieved per query.
pub const DEFAULT_TOP_K: usize = 4;

/// Separator placed between retrieved context texts in the prompt.
const CONTEXT_SEPARATOR: &str = "\n\n";

const PROMPT_TEMPLATE: &str = "You are an assistant for question-answering tasks. \
Use the following pieces of retrieved context to answer the question. \
If you don't know the answer, just say that you don't know. \
Use three sentences maximum and keep the answer concise.\n\
Question: {question}\n\
Context: {context}\n\
Answer:";

/// The answer to a query together with the contexts that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainAnswer {
    /// The generated answer, trimmed.
    pub answer: String,
    /// The retrieved context texts, in rank order.
    pub contexts: Vec<String>,
}

/// Anything that can answer a query with supporting contexts.
///
/// [`RagChain`] is the production implementation; the evaluation harness
/// accepts any implementor so tests can substitute a fixed stub.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Answer a natural-language query.
    async fn answer(&self, query: &str) -> Result<ChainAnswer>;
}

/// Composes retrieval, prompt templating, generation, and output parsing.
///
/// # Example
///
/// ```rust,ignore
/// use semrag::RagChain;
///
/// let chain = RagChain::new(retriever, generator);
/// let result = chain.answer("What are the pasteurization procedures?").await?;
/// println!("{}", result.answer);
/// ```
pub struct RagChain {
    retriever: Arc<Retriever>,
    generator: Arc<dyn Generator>,
    top_k: usize,
}

impl RagChain {
    /// Create a chain with the default top-k.
    pub fn new(retriever: Arc<Retriever>, generator: Arc<dyn Generator>) -> Self {
        Self { retriever, generator, top_k: DEFAULT_TOP_K }
    }

    /// Set the number of contexts retrieved per query.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

#[async_trait]
impl QueryEngine for RagChain {
    /// Retrieve → template → generate → parse.
    ///
    /// Backend failures (embedding, store, generation) propagate as labeled
    /// errors; nothing is swallowed here. No retry or backoff is applied.
    async fn answer(&self, query: &str) -> Result<ChainAnswer> {
        let results = self.retriever.retrieve(query, self.top_k).await?;
        let contexts: Vec<String> = results.into_iter().map(|r| r.document.text).collect();
        debug!(context_count = contexts.len(), "retrieved contexts");

        let context = contexts.join(CONTEXT_SEPARATOR);
        let prompt = PROMPT_TEMPLATE.replace("{question}", query).replace("{context}", &context);

        let raw = self.generator.complete(&prompt).await?;
        let answer = raw.trim().to_string();
        info!(model = self.generator.name(), answer_len = answer.len(), "answered query");

        Ok(ChainAnswer { answer, contexts })
    }
}
