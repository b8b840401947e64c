//! End-to-end tests for the evaluation harness with stubbed chain and
//! generation model.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use semrag::{
    load_benchmark, save_benchmark, CancellationToken, ChainAnswer, EvaluationHarness, Generator,
    QaPair, QueryEngine, RagError, RagMode, TextUnit,
};

/// Answers every question with its ground truth verbatim, wrapped in one
/// supporting context.
struct OracleEngine {
    answers: HashMap<String, String>,
}

#[async_trait]
impl QueryEngine for OracleEngine {
    async fn answer(&self, query: &str) -> semrag::Result<ChainAnswer> {
        let answer = self.answers.get(query).cloned().ok_or_else(|| {
            RagError::EvaluationError(format!("no scripted answer for '{query}'"))
        })?;
        Ok(ChainAnswer { contexts: vec![format!("Regulation text: {answer}.")], answer })
    }
}

/// Returns scripted responses in order; errors once the script runs out.
struct ScriptedGenerator {
    responses: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn new(responses: &[&str]) -> Self {
        // Stored reversed so pop() yields them in order.
        let mut responses: Vec<String> = responses.iter().map(|s| s.to_string()).collect();
        responses.reverse();
        Self { responses: Mutex::new(responses) }
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn complete(&self, _prompt: &str) -> semrag::Result<String> {
        self.responses.lock().unwrap().pop().ok_or_else(|| RagError::GenerationError {
            provider: "scripted".to_string(),
            message: "script exhausted".to_string(),
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn pairs() -> Vec<QaPair> {
    vec![
        QaPair {
            question: "What temperature pasteurizes milk?".to_string(),
            ground_truth: "63 degrees Celsius for 30 minutes".to_string(),
        },
        QaPair {
            question: "Who inspects establishments?".to_string(),
            ground_truth: "the state regulatory agency".to_string(),
        },
        QaPair {
            question: "When are labels required?".to_string(),
            ground_truth: "before the product leaves the establishment".to_string(),
        },
    ]
}

fn harness(engine: Arc<dyn QueryEngine>, generator: Arc<dyn Generator>) -> EvaluationHarness {
    EvaluationHarness::new(engine, generator, RagMode::Super)
}

#[tokio::test]
async fn oracle_engine_scores_maximum_on_every_question() {
    let pairs = pairs();
    let answers: HashMap<String, String> =
        pairs.iter().map(|p| (p.question.clone(), p.ground_truth.clone())).collect();
    let harness = harness(
        Arc::new(OracleEngine { answers }),
        Arc::new(ScriptedGenerator::new(&[])),
    );

    let records = harness.run(&pairs, &CancellationToken::new()).await.unwrap();

    assert_eq!(records.len(), 3);
    for (record, pair) in records.iter().zip(&pairs) {
        // Input order is preserved.
        assert_eq!(record.question, pair.question);
        assert_eq!(record.answer, pair.ground_truth);
        assert!((record.scores.faithfulness - 1.0).abs() < 1e-9);
        assert!((record.scores.answer_relevancy - 1.0).abs() < 1e-9);
        assert!((record.scores.context_recall - 1.0).abs() < 1e-9);
    }
}

#[tokio::test]
async fn empty_benchmark_aborts_the_run() {
    let harness = harness(
        Arc::new(OracleEngine { answers: HashMap::new() }),
        Arc::new(ScriptedGenerator::new(&[])),
    );
    let result = harness.run(&[], &CancellationToken::new()).await;
    assert!(matches!(result, Err(RagError::EvaluationError(_))));
}

#[tokio::test]
async fn cancellation_aborts_before_the_first_question() {
    let pairs = pairs();
    let answers: HashMap<String, String> =
        pairs.iter().map(|p| (p.question.clone(), p.ground_truth.clone())).collect();
    let harness = harness(
        Arc::new(OracleEngine { answers }),
        Arc::new(ScriptedGenerator::new(&[])),
    );

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = harness.run(&pairs, &cancel).await;
    assert!(matches!(result, Err(RagError::EvaluationError(_))));
}

#[tokio::test]
async fn chain_errors_abort_the_run() {
    // No scripted answers, so the engine fails on the first question.
    let harness = harness(
        Arc::new(OracleEngine { answers: HashMap::new() }),
        Arc::new(ScriptedGenerator::new(&[])),
    );
    let result = harness.run(&pairs(), &CancellationToken::new()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn unparseable_responses_are_dropped_from_generation() {
    let units = vec![
        TextUnit::new("Milk must be pasteurized before sale.", "a.txt"),
        TextUnit::new("Labels must show the establishment number.", "b.txt"),
    ];
    let generator = ScriptedGenerator::new(&[
        "Output:::\nFactoid question: What must happen before sale?\nAnswer: Pasteurization\nOutput:::",
        "I cannot produce a question for this context.",
    ]);
    let harness = harness(
        Arc::new(OracleEngine { answers: HashMap::new() }),
        Arc::new(generator),
    );

    let pairs = harness.generate_benchmark(&units, 2, Some(7)).await.unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].question, "What must happen before sale?");
    assert_eq!(pairs[0].ground_truth, "Pasteurization");
}

#[tokio::test]
async fn generation_with_no_parseable_responses_fails() {
    let units = vec![TextUnit::new("Some context.", "a.txt")];
    let generator = ScriptedGenerator::new(&["nothing useful here"]);
    let harness = harness(
        Arc::new(OracleEngine { answers: HashMap::new() }),
        Arc::new(generator),
    );

    let result = harness.generate_benchmark(&units, 1, Some(7)).await;
    assert!(matches!(result, Err(RagError::EvaluationError(_))));
}

#[tokio::test]
async fn generation_with_no_units_fails() {
    let harness = harness(
        Arc::new(OracleEngine { answers: HashMap::new() }),
        Arc::new(ScriptedGenerator::new(&[])),
    );
    let result = harness.generate_benchmark(&[], 5, None).await;
    assert!(matches!(result, Err(RagError::EvaluationError(_))));
}

#[tokio::test]
async fn results_file_ends_with_the_aggregate_row() {
    let pairs = pairs();
    let answers: HashMap<String, String> =
        pairs.iter().map(|p| (p.question.clone(), p.ground_truth.clone())).collect();
    let harness = harness(
        Arc::new(OracleEngine { answers }),
        Arc::new(ScriptedGenerator::new(&[])),
    );
    let records = harness.run(&pairs, &CancellationToken::new()).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.csv");
    let summary = harness.write_results_to(&path, &records).unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();

    // Three per-question rows plus the trailing aggregate row.
    assert_eq!(rows.len(), 4);
    let aggregate = rows.last().unwrap();
    assert_eq!(&aggregate[0], semrag::SUMMARY_ROW_LABEL);
    let recall_pct: f64 = aggregate[5].parse().unwrap();
    assert!((recall_pct - summary.context_recall_pct).abs() < 1e-6);
    let relevancy_pct: f64 = aggregate[7].parse().unwrap();
    assert!((relevancy_pct - 100.0).abs() < 1e-6);
}

#[test]
fn benchmark_round_trips_through_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("evaluation_data.csv");

    let pairs = pairs();
    save_benchmark(&path, &pairs).unwrap();
    let loaded = load_benchmark(&path).unwrap();
    assert_eq!(loaded, pairs);
}

#[test]
fn missing_benchmark_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_benchmark(dir.path().join("absent.csv"));
    assert!(matches!(result, Err(RagError::EvaluationError(_))));
}

#[test]
fn empty_benchmark_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.csv");
    save_benchmark(&path, &[]).unwrap();
    let result = load_benchmark(&path);
    assert!(matches!(result, Err(RagError::EvaluationError(_))));
}
