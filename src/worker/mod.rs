//! Worker pool and pipeline orchestration (§4.2, §5).
//!
//! Ported from the original pipeline's `worker()`/`run()` loop: a fixed
//! number of concurrent workers pull `PaperTask`s off a bounded channel,
//! run each through extraction, validation, and ingestion, and report
//! into a shared, mutex-guarded `PipelineStats` plus the durable
//! `ProgressStore`. Shutdown is a poison-pill (`WorkItem::Shutdown`) sent
//! once per worker after the producer has dispatched every discovered
//! task, mirroring the original's `None` sentinel repeated `max_workers`
//! times down an `asyncio.Queue`.

use crate::agents::providers::ProviderHandle;
use crate::agents::Extractor;
use crate::cache::ResponseCache;
use crate::discovery::{self, PaperTask, YearRange};
use crate::graph::GraphStore;
use crate::models::{Author, ExtractionResult, Institution, Paper};
use crate::progress::{PipelineStats, ProgressRecord, ProgressStore};
use crate::shared::config::Config;
use crate::shared::errors::{AppError, AppResult};
use crate::validator;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Persist a progress/stats checkpoint after this many completed papers
/// (§4.9: "every 5 completed papers").
const CHECKPOINT_BATCH_SIZE: u64 = 5;

/// Monitoring tick interval (§4.2: "every 30 s").
const MONITOR_INTERVAL: Duration = Duration::from_secs(30);

/// One message on the worker channel: either real work or the shutdown
/// poison pill.
enum WorkItem {
    Task(PaperTask),
    Shutdown,
}

/// Everything a worker needs, shared behind reference counting. Counters
/// and the progress record live under their own mutexes rather than one
/// big lock, since `PipelineStats` and `ProgressRecord` are updated at
/// different points in a paper's lifecycle.
struct Shared {
    extractor: Extractor<ProviderHandle>,
    graph: Arc<GraphStore>,
    progress_store: ProgressStore,
    stats: Mutex<PipelineStats>,
    progress: Mutex<ProgressRecord>,
    cancel: Arc<AtomicBool>,
    completed_since_checkpoint: Mutex<u64>,
}

/// Outcome of one full pipeline invocation, used by the CLI to pick an
/// exit code (§6.4).
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOutcome {
    pub processed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub cancelled: bool,
}

impl PipelineOutcome {
    pub fn had_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Run the full pipeline against `config`: discover papers, spawn the
/// worker pool, dispatch tasks, and checkpoint progress until the corpus
/// is exhausted or `cancel` is set (§4.1-§4.2, §4.9).
pub async fn run_pipeline(config: &Config, cancel: Arc<AtomicBool>) -> AppResult<PipelineOutcome> {
    let progress_store = ProgressStore::new(&config.progress_file_path, &config.stats_file_path);
    let mut progress = if config.resume {
        progress_store.load()?
    } else {
        ProgressRecord::default()
    };

    let resume_completed: HashSet<String> = if config.resume {
        progress.completed.clone()
    } else {
        HashSet::new()
    };

    let year_range = YearRange {
        start: config.year_start,
        end: config.year_end,
    };
    let tasks = discovery::discover_papers(
        std::path::Path::new(&config.corpus_root),
        year_range,
        &resume_completed,
    )?;
    let total_papers = tasks.len() as u64;
    info!(total_papers, workers = config.worker_count, "starting pipeline run");

    if tasks.is_empty() {
        progress_store.save_progress(&progress)?;
        return Ok(PipelineOutcome::default());
    }

    let cache = Arc::new(ResponseCache::new(&config.cache_dir, config.cache_ttl_days)?);
    let primary = ProviderHandle::from_config(config.default_llm_provider, config)?;
    let mut extractor = Extractor::new(primary, cache);
    if let Some(fallback_kind) = config.fallback_llm_provider {
        extractor = extractor.with_fallback(ProviderHandle::from_config(fallback_kind, config)?);
    }
    if let Some(model) = &config.default_model {
        extractor = extractor.with_model(model.clone());
    }

    let graph = Arc::new(GraphStore::connect(config).await?);
    graph.ensure_schema().await?;

    let stats = PipelineStats {
        total_papers,
        ..Default::default()
    };

    progress.last_updated = chrono::Local::now();

    let shared = Arc::new(Shared {
        extractor,
        graph,
        progress_store,
        stats: Mutex::new(stats),
        progress: Mutex::new(progress),
        cancel,
        completed_since_checkpoint: Mutex::new(0),
    });

    let worker_count = config.worker_count.max(1);
    let capacity = discovery::queue_capacity(worker_count);
    let (tx, rx) = mpsc::channel::<WorkItem>(capacity);
    let rx = Arc::new(tokio::sync::Mutex::new(rx));

    let mut handles = Vec::with_capacity(worker_count);
    for worker_id in 0..worker_count {
        let shared = Arc::clone(&shared);
        let rx = Arc::clone(&rx);
        let tx = tx.clone();
        handles.push(tokio::spawn(async move {
            worker_loop(worker_id, shared, rx, tx).await;
        }));
    }

    let monitor_shared = Arc::clone(&shared);
    let monitor = tokio::spawn(async move { monitor_loop(monitor_shared).await });

    for task in tasks {
        if tx.send(WorkItem::Task(task)).await.is_err() {
            break;
        }
    }
    for _ in 0..worker_count {
        let _ = tx.send(WorkItem::Shutdown).await;
    }
    drop(tx);

    for handle in handles {
        let _ = handle.await;
    }
    monitor.abort();

    let stats = shared.stats.lock().unwrap().clone();
    let progress = shared.progress.lock().unwrap().clone();
    shared.progress_store.save_progress(&progress)?;
    shared.progress_store.save_stats(&stats)?;

    let cancelled = shared.cancel.load(Ordering::Relaxed);
    info!(
        processed = stats.processed,
        failed = stats.failed,
        skipped = stats.skipped,
        cancelled,
        "pipeline run finished"
    );

    Ok(PipelineOutcome {
        processed: stats.processed,
        failed: stats.failed,
        skipped: stats.skipped,
        cancelled,
    })
}

async fn worker_loop(
    worker_id: usize,
    shared: Arc<Shared>,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<WorkItem>>>,
    tx: mpsc::Sender<WorkItem>,
) {
    loop {
        if shared.cancel.load(Ordering::Relaxed) {
            info!(worker_id, "worker exiting on cancellation");
            return;
        }

        let item = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };

        let task = match item {
            Some(WorkItem::Task(task)) => task,
            Some(WorkItem::Shutdown) | None => {
                info!(worker_id, "worker shutting down");
                return;
            }
        };

        process_task(worker_id, &shared, task, &tx).await;
    }
}

/// Process one paper through extraction, validation, and ingestion,
/// re-enqueueing it with an incremented attempt count on a transient
/// failure (§4.1, §4.2 "PENDING -> EXTRACTING -> NORMALIZING -> INGESTING
/// -> COMPLETED|FAILED").
async fn process_task(
    worker_id: usize,
    shared: &Arc<Shared>,
    mut task: PaperTask,
    tx: &mpsc::Sender<WorkItem>,
) {
    if shared.cancel.load(Ordering::Relaxed) {
        return;
    }

    let paper_id = task.paper_id.clone();
    let extraction_start = Instant::now();
    let extraction = shared.extractor.extract(&paper_id, &task.pdf_path).await;
    let extraction_seconds = extraction_start.elapsed().as_secs_f64();

    let extraction = match extraction {
        Ok(extraction) => extraction,
        Err(e) => {
            handle_failure(worker_id, shared, &mut task, &e, tx).await;
            return;
        }
    };

    if shared.cancel.load(Ordering::Relaxed) {
        return;
    }

    let normalization_start = Instant::now();
    let (paper, authors) = build_paper_and_authors(&paper_id, &extraction);
    let normalization_seconds = normalization_start.elapsed().as_secs_f64();

    if shared.cancel.load(Ordering::Relaxed) {
        return;
    }

    let ingestion_start = Instant::now();
    let report = shared.graph.ingest_paper(&extraction, &paper, &authors).await;
    let ingestion_seconds = ingestion_start.elapsed().as_secs_f64();

    match report {
        Ok(report) => {
            let mut stats = shared.stats.lock().unwrap();
            stats.processed += 1;
            stats.total_extraction_seconds += extraction_seconds;
            stats.total_normalization_seconds += normalization_seconds;
            stats.total_ingestion_seconds += ingestion_seconds;
            stats.record_entity("author", report.authors);
            stats.record_entity("theory", report.theories);
            stats.record_entity("phenomenon", report.phenomena);
            stats.record_entity("method", report.methods);
            stats.record_entity("software", report.software);
            stats.record_entity("variable", report.variables);
            stats.record_entity("finding", report.findings);
            stats.record_entity("contribution", report.contributions);
            stats.record_entity("research_question", report.research_questions);
            stats.record_entity("citation", report.citations);
            stats.record_entity("explains_phenomenon", report.explains_phenomenon);
            drop(stats);

            {
                let mut progress = shared.progress.lock().unwrap();
                shared.progress_store.mark_completed(&mut progress, &paper_id);
            }
            info!(worker_id, paper_id, "paper completed");
            checkpoint_if_due(shared);
        }
        Err(e) => {
            handle_failure(worker_id, shared, &mut task, &e, tx).await;
        }
    }
}

async fn handle_failure(
    worker_id: usize,
    shared: &Arc<Shared>,
    task: &mut PaperTask,
    error: &AppError,
    tx: &mpsc::Sender<WorkItem>,
) {
    task.attempt += 1;
    if error.is_transient() && !task.exhausted() {
        warn!(
            worker_id,
            paper_id = %task.paper_id,
            attempt = task.attempt,
            error = %error,
            "transient failure, re-enqueueing"
        );
        let _ = tx.send(WorkItem::Task(task.clone())).await;
        return;
    }

    error!(worker_id, paper_id = %task.paper_id, error = %error, "paper failed permanently");
    {
        let mut stats = shared.stats.lock().unwrap();
        stats.failed += 1;
        stats.errors.push(format!("{}: {}", task.paper_id, error));
    }
    {
        let mut progress = shared.progress.lock().unwrap();
        shared
            .progress_store
            .mark_failed(&mut progress, &task.paper_id, &error.to_string(), task.attempt);
    }
    checkpoint_if_due(shared);
}

fn checkpoint_if_due(shared: &Arc<Shared>) {
    let mut count = shared.completed_since_checkpoint.lock().unwrap();
    *count += 1;
    if *count >= CHECKPOINT_BATCH_SIZE {
        *count = 0;
        drop(count);
        save_checkpoint(shared);
    }
}

fn save_checkpoint(shared: &Arc<Shared>) {
    let stats = shared.stats.lock().unwrap().clone();
    let progress = shared.progress.lock().unwrap().clone();
    if let Err(e) = shared.progress_store.save_progress(&progress) {
        warn!(error = %e, "failed to persist progress checkpoint");
    }
    if let Err(e) = shared.progress_store.save_stats(&stats) {
        warn!(error = %e, "failed to persist stats checkpoint");
    }
}

/// Background task emitting a progress snapshot and persisting the
/// checkpoint every 30 s (§4.2, §4.9).
async fn monitor_loop(shared: Arc<Shared>) {
    loop {
        tokio::time::sleep(MONITOR_INTERVAL).await;
        let stats = shared.stats.lock().unwrap().clone();
        info!(
            processed = stats.processed,
            failed = stats.failed,
            total = stats.total_papers,
            "progress snapshot"
        );
        save_checkpoint(&shared);
    }
}

/// Coerce an `ExtractionResult`'s metadata and authors into the typed
/// `Paper`/`Author`/`Institution` records the ingester expects, in author
/// position order (§4.4, §4.6 step 2).
fn build_paper_and_authors(
    paper_id: &str,
    extraction: &ExtractionResult,
) -> (Paper, Vec<(Author, Vec<Institution>, i32)>) {
    let paper = validator::validate_metadata(paper_id, &extraction.metadata);

    let mut authors = Vec::new();
    for (position, raw) in extraction.authors.iter().enumerate() {
        let Some(validated) = validator::validate_author(position as i32, raw) else {
            continue;
        };
        let author = Author::new(
            &validated.full_name,
            &validated.given_name,
            &validated.family_name,
        );
        let institutions = validated
            .affiliations
            .iter()
            .take(3)
            .map(|name| Institution::new(name))
            .collect();
        authors.push((author, institutions, validated.position));
    }

    (paper, authors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawAuthor;

    #[test]
    fn build_paper_and_authors_drops_nameless_authors_and_preserves_position() {
        let mut extraction = ExtractionResult::default();
        extraction.authors = vec![
            RawAuthor {
                full_name: Some("Jay B. Barney".into()),
                ..Default::default()
            },
            RawAuthor::default(),
            RawAuthor {
                full_name: Some("Kathleen M. Eisenhardt".into()),
                ..Default::default()
            },
        ];

        let (_, authors) = build_paper_and_authors("1991_014", &extraction);
        assert_eq!(authors.len(), 2);
        assert_eq!(authors[0].0.family_name, "Barney");
        assert_eq!(authors[1].2, 2);
    }

    #[test]
    fn build_paper_and_authors_caps_affiliations_at_three() {
        let mut extraction = ExtractionResult::default();
        extraction.authors = vec![RawAuthor {
            full_name: Some("Jay B. Barney".into()),
            affiliations: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            ..Default::default()
        }];

        let (_, authors) = build_paper_and_authors("1991_014", &extraction);
        assert_eq!(authors[0].1.len(), 3);
    }
}
