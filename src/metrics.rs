//! Deterministic lexical approximations of retrieval and generation metrics.
//!
//! All four metrics are pure token-overlap functions in `[0, 1]`:
//!
//! - `context_precision` — rank-weighted precision over relevant contexts
//! - `context_recall` — ground-truth token coverage by the context union
//! - `faithfulness` — answer-token support by the context union
//! - `answer_relevancy` — token F1 between answer and ground truth
//!
//! Scores are surface-lexical, not semantic: an answer that restates the
//! ground truth verbatim scores 1.0, a paraphrase scores lower.

use std::collections::HashSet;

use serde::Serialize;

use crate::sparse::tokenize;

/// A context counts as relevant when it covers more than this fraction of
/// the ground-truth tokens.
const RELEVANCE_CUTOFF: f64 = 0.5;

/// Per-question metric scores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricScores {
    /// Rank-weighted precision of the retrieved context list.
    pub context_precision: f64,
    /// Fraction of ground-truth tokens covered by the retrieved contexts.
    pub context_recall: f64,
    /// Fraction of answer tokens supported by the retrieved contexts.
    pub faithfulness: f64,
    /// Token F1 between the generated answer and the ground truth.
    pub answer_relevancy: f64,
}

fn token_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

/// Fraction of `reference` tokens present in `candidate`. 0.0 when the
/// reference has no tokens.
fn coverage(reference: &HashSet<String>, candidate: &HashSet<String>) -> f64 {
    if reference.is_empty() {
        return 0.0;
    }
    let covered = reference.iter().filter(|t| candidate.contains(*t)).count();
    covered as f64 / reference.len() as f64
}

/// Rank-weighted precision: the mean of precision@k over the positions
/// holding a relevant context. 0.0 when no context is relevant.
fn context_precision(contexts: &[String], ground_truth_tokens: &HashSet<String>) -> f64 {
    let mut relevant_seen = 0usize;
    let mut precision_sum = 0.0;

    for (i, context) in contexts.iter().enumerate() {
        let relevant = coverage(ground_truth_tokens, &token_set(context)) > RELEVANCE_CUTOFF;
        if relevant {
            relevant_seen += 1;
            precision_sum += relevant_seen as f64 / (i + 1) as f64;
        }
    }

    if relevant_seen == 0 {
        return 0.0;
    }
    precision_sum / relevant_seen as f64
}

/// Token F1 between two texts. 1.0 when the token sets are identical,
/// 0.0 when either side is empty.
fn token_f1(a: &str, b: &str) -> f64 {
    let tokens_a = token_set(a);
    let tokens_b = token_set(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }
    let overlap = tokens_a.intersection(&tokens_b).count() as f64;
    if overlap == 0.0 {
        return 0.0;
    }
    let precision = overlap / tokens_a.len() as f64;
    let recall = overlap / tokens_b.len() as f64;
    2.0 * precision * recall / (precision + recall)
}

/// Score one evaluated question.
pub fn score_record(answer: &str, contexts: &[String], ground_truth: &str) -> MetricScores {
    let ground_truth_tokens = token_set(ground_truth);
    let context_union: HashSet<String> =
        contexts.iter().flat_map(|c| tokenize(c)).collect();
    let answer_tokens = token_set(answer);

    MetricScores {
        context_precision: context_precision(contexts, &ground_truth_tokens),
        context_recall: coverage(&ground_truth_tokens, &context_union),
        faithfulness: coverage(&answer_tokens, &context_union),
        answer_relevancy: token_f1(answer, ground_truth),
    }
}

/// The mean of each metric over a run, expressed as a percentage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricSummary {
    /// Mean context precision, in percent.
    pub context_precision_pct: f64,
    /// Mean context recall, in percent.
    pub context_recall_pct: f64,
    /// Mean faithfulness, in percent.
    pub faithfulness_pct: f64,
    /// Mean answer relevancy, in percent.
    pub answer_relevancy_pct: f64,
}

/// Aggregate per-question scores into percentage means.
pub fn summarize(scores: &[MetricScores]) -> MetricSummary {
    if scores.is_empty() {
        return MetricSummary::default();
    }
    let n = scores.len() as f64;
    MetricSummary {
        context_precision_pct: scores.iter().map(|s| s.context_precision).sum::<f64>() / n * 100.0,
        context_recall_pct: scores.iter().map(|s| s.context_recall).sum::<f64>() / n * 100.0,
        faithfulness_pct: scores.iter().map(|s| s.faithfulness).sum::<f64>() / n * 100.0,
        answer_relevancy_pct: scores.iter().map(|s| s.answer_relevancy).sum::<f64>() / n * 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbatim_answer_scores_maximum() {
        let ground_truth = "Milk must be pasteurized at 63 degrees for 30 minutes";
        let contexts = vec![format!("The regulation states: {ground_truth}.")];
        let scores = score_record(ground_truth, &contexts, ground_truth);
        assert!((scores.faithfulness - 1.0).abs() < 1e-9);
        assert!((scores.answer_relevancy - 1.0).abs() < 1e-9);
        assert!((scores.context_recall - 1.0).abs() < 1e-9);
        assert!((scores.context_precision - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unrelated_answer_scores_zero_relevancy() {
        let scores = score_record("oranges are tasty", &["milk context".to_string()], "milk standards");
        assert_eq!(scores.answer_relevancy, 0.0);
    }

    #[test]
    fn empty_contexts_give_zero_retrieval_scores() {
        let scores = score_record("some answer", &[], "some ground truth");
        assert_eq!(scores.context_precision, 0.0);
        assert_eq!(scores.context_recall, 0.0);
        assert_eq!(scores.faithfulness, 0.0);
    }

    #[test]
    fn irrelevant_context_at_rank_one_lowers_precision() {
        let ground_truth = "milk pasteurization temperature standards".to_string();
        let contexts = vec![
            "completely unrelated filler text".to_string(),
            format!("rules on {ground_truth}"),
        ];
        let scores = score_record("x", &contexts, &ground_truth);
        assert!(scores.context_precision > 0.0);
        assert!(scores.context_precision < 1.0);
    }

    #[test]
    fn summary_is_mean_as_percentage() {
        let scores = vec![
            MetricScores { context_precision: 1.0, context_recall: 1.0, faithfulness: 1.0, answer_relevancy: 1.0 },
            MetricScores { context_precision: 0.0, context_recall: 0.5, faithfulness: 0.0, answer_relevancy: 0.5 },
        ];
        let summary = summarize(&scores);
        assert!((summary.context_precision_pct - 50.0).abs() < 1e-9);
        assert!((summary.context_recall_pct - 75.0).abs() < 1e-9);
        assert!((summary.answer_relevancy_pct - 75.0).abs() < 1e-9);
    }
}
