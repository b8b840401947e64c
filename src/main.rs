//! Command-line entry point for the semrag pipeline.
//!
//! Subcommands mirror the application flow: `ask` answers a single question,
//! `eval` runs the evaluation harness, `chunks` writes the chunk preview
//! file. All of them (re)initialize the pipeline from the configuration
//! file, so mode changes take effect per invocation.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use semrag::openai::{OpenAIChatModel, OpenAIEmbeddingProvider};
use semrag::{
    load_benchmark, save_benchmark, write_chunk_preview, AppConfig, CancellationToken,
    DocumentLoader, EvaluationHarness, InMemoryVectorStore, QueryEngine, RagError, RagPipeline,
};

#[derive(Parser)]
#[command(name = "semrag", about = "Semantic chunking and RAG pipeline", version)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "config.yaml")]
    config: String,

    /// Drop and rebuild the target collection before indexing.
    #[arg(long)]
    update: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a single question against the indexed corpus.
    Ask {
        /// The question to answer.
        question: String,
    },
    /// Run the evaluation harness and persist per-question results.
    Eval,
    /// Write the trailing chunk preview file for the active mode.
    Chunks,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("failed to load configuration from '{}'", cli.config))?;

    let embedder = Arc::new(
        OpenAIEmbeddingProvider::new(config.openai_api_key.clone())?
            .with_model(config.model_name.clone()),
    );
    let generator = Arc::new(
        OpenAIChatModel::new(config.openai_api_key.clone())?
            .with_model(config.model.clone())
            .with_temperature(config.temperature),
    );
    let store = Arc::new(InMemoryVectorStore::new());

    let pipeline = RagPipeline::builder()
        .embedding_provider(embedder)
        .vector_store(store)
        .generator(Arc::clone(&generator) as Arc<dyn semrag::Generator>)
        .build()?;

    let rag = pipeline.initialize(&config, cli.update).await?;

    match cli.command {
        Command::Ask { question } => {
            // Interactive rendering: backend failures become the printed
            // answer, while still being logged as errors.
            match rag.chain.answer(&question).await {
                Ok(result) => {
                    info!(context_count = result.contexts.len(), "answer ready");
                    println!("{}", result.answer);
                }
                Err(e @ (RagError::EmbeddingError { .. }
                | RagError::GenerationError { .. }
                | RagError::VectorStoreError { .. })) => {
                    error!(error = %e, "backend failure while answering");
                    println!("{e}");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Eval => {
            let harness = EvaluationHarness::new(
                Arc::clone(&rag.chain) as Arc<dyn QueryEngine>,
                Arc::clone(&generator) as Arc<dyn semrag::Generator>,
                config.rag,
            );

            let pairs = if config.use_existing_questions {
                load_benchmark(&config.questions_file)?
            } else {
                let loader = DocumentLoader::new();
                let units = match (&config.file_path, &config.directory_path) {
                    (Some(file), _) => loader.load_file(file)?,
                    (None, Some(folder)) => loader.load_folder(folder)?,
                    (None, None) => anyhow::bail!(
                        "benchmark generation needs 'file_path' or 'directory_path'"
                    ),
                };
                let pairs = harness.generate_benchmark(&units, config.num_samples, None).await?;
                save_benchmark(&config.questions_file, &pairs)?;
                pairs
            };

            let cancel = CancellationToken::new();
            let records = harness.run(&pairs, &cancel).await?;
            let summary = harness.write_results(&records)?;

            println!("Evaluation summary ({} mode):", config.rag);
            println!("  Context Precision: {:>6.2}%", summary.context_precision_pct);
            println!("  Context Recall:    {:>6.2}%", summary.context_recall_pct);
            println!("  Faithfulness:      {:>6.2}%", summary.faithfulness_pct);
            println!("  Answer Relevancy:  {:>6.2}%", summary.answer_relevancy_pct);
        }
        Command::Chunks => {
            if config.show_chunks == 0 {
                warn!("'show_chunks' is 0; nothing to write");
            } else {
                let path = write_chunk_preview(&rag.chunks, config.rag, config.show_chunks)?;
                println!("wrote {}", path.display());
            }
        }
    }

    Ok(())
}
