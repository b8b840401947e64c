//! Evaluation harness: benchmark acquisition, sequential runs, scoring,
//! and persistence.
//!
//! One run is a fixed sequence: acquire questions (load a persisted benchmark
//! CSV or generate factoid pairs from sampled documents), answer every
//! question in input order, score each with the lexical metrics, and persist
//! per-question rows plus aggregate means. Any stage failure aborts the run;
//! partial results are never silently accepted.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::chain::QueryEngine;
use crate::config::RagMode;
use crate::document::TextUnit;
use crate::error::{RagError, Result};
use crate::generation::Generator;
use crate::metrics::{score_record, summarize, MetricScores, MetricSummary};

/// The factoid-question instruction rendered per sampled document.
const FACTOID_PROMPT: &str = "\
Your task is to generate a *factoid question* and its corresponding *answer* based on the given context.

Here are the rules:
1. The *factoid question* must be directly answerable with a specific and concise piece of factual information from the context.
2. Avoid using phrases like \"according to the passage\" or \"based on the context\" in your question.
3. The question should resemble the style of queries typically entered in a search engine, focusing on clarity and relevance.

Please provide your response in the following format:

Output:::
Factoid question: (Your factoid question here)
Answer: (The answer to the factoid question here)

Here is the context:

Context: {context}

Output:::";

const QUESTION_MARKER: &str = "Factoid question:";
const ANSWER_MARKER: &str = "Answer:";

/// A benchmark item: a question and its ground-truth answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaPair {
    /// The benchmark question.
    pub question: String,
    /// The expected answer.
    #[serde(rename = "answer")]
    pub ground_truth: String,
}

/// One evaluated question: answer, contexts, and metric scores.
#[derive(Debug, Clone)]
pub struct EvaluationRecord {
    /// The benchmark question.
    pub question: String,
    /// The answer the chain generated.
    pub answer: String,
    /// The retrieved contexts, in rank order.
    pub contexts: Vec<String>,
    /// The expected answer.
    pub ground_truth: String,
    /// Per-question metric scores.
    pub scores: MetricScores,
}

/// A cooperative cancellation flag checked between questions.
///
/// Cancelling aborts the run with an error; partial results are discarded.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Load a persisted benchmark CSV (header `question,answer`).
///
/// # Errors
///
/// Returns [`RagError::EvaluationError`] if the file is missing or contains
/// no pairs, and [`RagError::Csv`] on malformed rows.
pub fn load_benchmark(path: impl AsRef<Path>) -> Result<Vec<QaPair>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(RagError::EvaluationError(format!(
            "benchmark file '{}' not found",
            path.display()
        )));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let mut pairs = Vec::new();
    for record in reader.deserialize() {
        let pair: QaPair = record?;
        pairs.push(pair);
    }

    if pairs.is_empty() {
        return Err(RagError::EvaluationError(format!(
            "benchmark file '{}' contains no question/answer pairs",
            path.display()
        )));
    }
    info!(path = %path.display(), pair_count = pairs.len(), "loaded benchmark");
    Ok(pairs)
}

/// Persist a benchmark as CSV (header `question,answer`), creating parent
/// directories as needed.
pub fn save_benchmark(path: impl AsRef<Path>, pairs: &[QaPair]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for pair in pairs {
        writer.serialize(pair)?;
    }
    writer.flush()?;
    info!(path = %path.display(), pair_count = pairs.len(), "saved benchmark");
    Ok(())
}

/// Parse a generation-model response by its literal markers.
///
/// Responses missing either marker, or with an empty question or answer,
/// yield `None` and are dropped by the caller.
fn parse_factoid_response(response: &str) -> Option<QaPair> {
    let after_question = response.split(QUESTION_MARKER).nth(1)?;
    let question = after_question.split(ANSWER_MARKER).next()?.trim();
    let answer_part = after_question.split(ANSWER_MARKER).nth(1)?;
    let answer = answer_part.trim().trim_end_matches(":::").trim_end_matches("Output").trim();

    if question.is_empty() || answer.is_empty() {
        return None;
    }
    Some(QaPair { question: question.to_string(), ground_truth: answer.to_string() })
}

/// The path of the results file for a mode (`results_super.csv`).
pub fn results_path(mode: RagMode) -> PathBuf {
    PathBuf::from(format!("results_{mode}.csv"))
}

/// The `question`-column label of the trailing aggregate row in a results
/// file. Its metric columns hold the mean of each metric as a percentage.
pub const SUMMARY_ROW_LABEL: &str = "aggregate_mean_pct";

#[derive(Serialize)]
struct ResultsRow<'a> {
    question: &'a str,
    answer: &'a str,
    contexts: String,
    ground_truth: &'a str,
    context_precision: f64,
    context_recall: f64,
    faithfulness: f64,
    answer_relevancy: f64,
}

/// Drives benchmark generation, evaluation runs, and result persistence.
pub struct EvaluationHarness {
    engine: Arc<dyn QueryEngine>,
    generator: Arc<dyn Generator>,
    mode: RagMode,
}

impl EvaluationHarness {
    /// Create a harness for the given engine, generator, and mode tag.
    pub fn new(engine: Arc<dyn QueryEngine>, generator: Arc<dyn Generator>, mode: RagMode) -> Self {
        Self { engine, generator, mode }
    }

    /// Generate a fresh benchmark by sampling `num_samples` text units
    /// without replacement and prompting the generation model once per
    /// sample.
    ///
    /// Responses missing the literal `Factoid question:` or `Answer:` markers
    /// are dropped with a warning, so the final benchmark may be smaller than
    /// requested. Pass a `seed` for reproducible sampling.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EvaluationError`] when no units are available or
    /// every response fails to parse; generation-model failures propagate.
    pub async fn generate_benchmark(
        &self,
        units: &[TextUnit],
        num_samples: usize,
        seed: Option<u64>,
    ) -> Result<Vec<QaPair>> {
        if units.is_empty() {
            return Err(RagError::EvaluationError(
                "no documents available for benchmark generation".to_string(),
            ));
        }

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let sample_count = num_samples.min(units.len());
        let sampled = sample_without_replacement(&mut rng, units.len(), sample_count);

        let mut pairs = Vec::new();
        let mut dropped = 0usize;
        for index in sampled {
            let prompt = FACTOID_PROMPT.replace("{context}", &units[index].text);
            let response = self.generator.complete(&prompt).await?;
            match parse_factoid_response(&response) {
                Some(pair) => pairs.push(pair),
                None => {
                    dropped += 1;
                    warn!(unit_index = index, "dropping response missing factoid markers");
                }
            }
        }

        if pairs.is_empty() {
            return Err(RagError::EvaluationError(
                "benchmark generation produced no parseable question/answer pairs".to_string(),
            ));
        }
        info!(
            generated = pairs.len(),
            dropped,
            requested = num_samples,
            "generated benchmark"
        );
        Ok(pairs)
    }

    /// Answer and score every pair, preserving input order.
    ///
    /// The cancellation token is checked between questions; cancellation and
    /// backend errors both abort the run as hard failures.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EvaluationError`] for an empty benchmark or a
    /// cancelled run; chain errors propagate unchanged.
    pub async fn run(
        &self,
        pairs: &[QaPair],
        cancel: &CancellationToken,
    ) -> Result<Vec<EvaluationRecord>> {
        if pairs.is_empty() {
            return Err(RagError::EvaluationError("benchmark contains no questions".to_string()));
        }

        let mut records = Vec::with_capacity(pairs.len());
        for (i, pair) in pairs.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(RagError::EvaluationError(format!(
                    "evaluation cancelled after {i} of {} questions",
                    pairs.len()
                )));
            }

            let result = self.engine.answer(&pair.question).await?;
            let scores = score_record(&result.answer, &result.contexts, &pair.ground_truth);
            records.push(EvaluationRecord {
                question: pair.question.clone(),
                answer: result.answer,
                contexts: result.contexts,
                ground_truth: pair.ground_truth.clone(),
                scores,
            });
        }

        info!(mode = %self.mode, record_count = records.len(), "evaluation run complete");
        Ok(records)
    }

    /// Persist per-question rows and the aggregate means to
    /// `results_<mode>.csv` and return the aggregate summary.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EvaluationError`] for an empty result set.
    pub fn write_results(&self, records: &[EvaluationRecord]) -> Result<MetricSummary> {
        self.write_results_to(results_path(self.mode), records)
    }

    /// Persist results to an explicit path. After the per-question rows, one
    /// trailing row labeled [`SUMMARY_ROW_LABEL`] carries the mean of each
    /// metric as a percentage.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EvaluationError`] for an empty result set.
    pub fn write_results_to(
        &self,
        path: impl AsRef<Path>,
        records: &[EvaluationRecord],
    ) -> Result<MetricSummary> {
        if records.is_empty() {
            return Err(RagError::EvaluationError("evaluation produced no results".to_string()));
        }

        let scores: Vec<MetricScores> = records.iter().map(|r| r.scores).collect();
        let summary = summarize(&scores);

        let path = path.as_ref();
        let mut writer = csv::Writer::from_path(path)?;
        for record in records {
            writer.serialize(ResultsRow {
                question: &record.question,
                answer: &record.answer,
                contexts: record.contexts.join(" | "),
                ground_truth: &record.ground_truth,
                context_precision: record.scores.context_precision,
                context_recall: record.scores.context_recall,
                faithfulness: record.scores.faithfulness,
                answer_relevancy: record.scores.answer_relevancy,
            })?;
        }
        writer.serialize(ResultsRow {
            question: SUMMARY_ROW_LABEL,
            answer: "",
            contexts: String::new(),
            ground_truth: "",
            context_precision: summary.context_precision_pct,
            context_recall: summary.context_recall_pct,
            faithfulness: summary.faithfulness_pct,
            answer_relevancy: summary.answer_relevancy_pct,
        })?;
        writer.flush()?;
        info!(
            mode = %self.mode,
            path = %path.display(),
            context_precision_pct = format!("{:.2}", summary.context_precision_pct),
            context_recall_pct = format!("{:.2}", summary.context_recall_pct),
            faithfulness_pct = format!("{:.2}", summary.faithfulness_pct),
            answer_relevancy_pct = format!("{:.2}", summary.answer_relevancy_pct),
            "evaluation results saved"
        );
        Ok(summary)
    }
}

/// Sample `amount` distinct indices from `0..len` in draw order.
fn sample_without_replacement(rng: &mut StdRng, len: usize, amount: usize) -> Vec<usize> {
    let mut available: Vec<usize> = (0..len).collect();
    let mut sampled = Vec::with_capacity(amount);
    for _ in 0..amount {
        let pick = rng.random_range(0..available.len());
        sampled.push(available.swap_remove(pick));
    }
    sampled
}
