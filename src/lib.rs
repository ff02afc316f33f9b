//! # SMJ Pipeline
//!
//! A concurrent extraction and knowledge-graph ingestion pipeline for
//! Strategic Management Journal papers: a worker pool pulls PDFs off a
//! bounded task queue, runs each through an LLM-powered extractor,
//! normalizes and validates the extracted entities, and ingests the
//! result into a property graph as a single atomic transaction per
//! paper.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use smj_pipeline::shared::config::Config;
//! use smj_pipeline::worker;
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let outcome = worker::run_pipeline(&config, Arc::new(AtomicBool::new(false))).await?;
//!     println!("processed {} papers, {} failed", outcome.processed, outcome.failed);
//!     Ok(())
//! }
//! ```

pub mod agents;
pub mod cache;
pub mod conflict;
pub mod connection_strength;
pub mod discovery;
pub mod embedding;
pub mod graph;
pub mod models;
pub mod normalizer;
pub mod pdf;
pub mod progress;
pub mod shared;
pub mod validator;
pub mod worker;

// Re-export the most frequently used types at the crate root.
pub use graph::GraphStore;
pub use models::{Author, Institution, Paper};
pub use shared::config::Config;
pub use shared::errors::{AppError, AppResult};
pub use worker::{run_pipeline, PipelineOutcome};

// Re-export agent types.
pub use agents::{Extractor, ExtractorConfig, LlmConfig, LlmProvider, Message, MessageRole};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use super::{
        AppError, AppResult, Author, Config, Extractor, GraphStore, Institution, LlmProvider,
        Paper, PipelineOutcome,
    };
}
