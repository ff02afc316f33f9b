//! CLI entry point for the SMJ extraction and ingestion pipeline.

use clap::{Parser, Subcommand};
use smj_pipeline::graph::GraphStore;
use smj_pipeline::shared::config::Config;
use smj_pipeline::shared::errors::AppError;
use smj_pipeline::shared::logger::init_logger;
use smj_pipeline::worker;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// SMJ pipeline - extracts scholarly entities from paper PDFs and ingests them into a graph
#[derive(Parser)]
#[command(name = "smj-pipeline")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the discovery -> extraction -> ingestion pipeline over a corpus
    Pipeline {
        /// Root directory containing `YYYY_<id>.pdf` paper files
        corpus_root: String,

        /// Number of concurrent workers
        #[arg(long)]
        workers: Option<usize>,

        /// Inclusive lower bound on publication year
        #[arg(long)]
        year_start: Option<i32>,

        /// Inclusive upper bound on publication year
        #[arg(long)]
        year_end: Option<i32>,

        /// Ignore any existing progress store and reprocess everything
        #[arg(long)]
        no_resume: bool,

        /// Model name override for the default LLM provider
        #[arg(long)]
        model: Option<String>,
    },

    /// Post-hoc pass that creates paper-to-paper relationships from shared
    /// theories, methods, variables, and publication proximity
    ComputeRelationships,

    /// Batch-encode Papers, Theories, Phenomena, Methods, and
    /// ResearchQuestions and store their embeddings
    GenerateEmbeddings,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logger(&cli.log_level) {
        eprintln!("failed to initialize logging: {e}");
        return std::process::ExitCode::from(1);
    }

    match run(cli.command).await {
        Ok(code) => std::process::ExitCode::from(code),
        Err(e) => {
            error!(error = %e, "pipeline failed");
            std::process::ExitCode::from(1u8)
        }
    }
}

async fn run(command: Commands) -> Result<u8, AppError> {
    let mut config = Config::from_env()?;

    match command {
        Commands::Pipeline {
            corpus_root,
            workers,
            year_start,
            year_end,
            no_resume,
            model,
        } => {
            config.corpus_root = corpus_root;
            if let Some(workers) = workers {
                config = config.with_worker_count(workers);
            }
            if year_start.is_some() || year_end.is_some() {
                config = config.with_year_range(year_start, year_end);
            }
            if no_resume {
                config = config.with_resume(false);
            }
            if let Some(model) = model {
                config = config.with_model(model);
            }

            let cancel = Arc::new(AtomicBool::new(false));
            let cancel_handler = Arc::clone(&cancel);
            let _ = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("cancellation requested, finishing in-flight papers");
                    cancel_handler.store(true, Ordering::Relaxed);
                }
            });

            let outcome = worker::run_pipeline(&config, Arc::clone(&cancel)).await?;
            if outcome.cancelled {
                return Ok(130);
            }
            if outcome.had_failures() {
                return Ok(2);
            }
            Ok(0)
        }

        Commands::ComputeRelationships => {
            let graph = GraphStore::connect(&config).await?;
            graph.ensure_schema().await?;
            let report = graph.compute_relationships().await?;
            info!(
                uses_same_theory = report.uses_same_theory,
                uses_same_method = report.uses_same_method,
                uses_same_variables = report.uses_same_variables,
                temporal_sequence = report.temporal_sequence,
                "relationships computed"
            );
            Ok(0)
        }

        Commands::GenerateEmbeddings => {
            let graph = GraphStore::connect(&config).await?;
            graph.ensure_schema().await?;
            let report = graph.generate_embeddings().await?;
            info!(
                papers = report.papers,
                theories = report.theories,
                phenomena = report.phenomena,
                methods = report.methods,
                research_questions = report.research_questions,
                "embeddings generated"
            );
            Ok(0)
        }
    }
}
