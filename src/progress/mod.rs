//! Crash-safe progress and run statistics persistence (§4.9).
//!
//! Ported from the original pipeline's `load_progress`/`save_progress` and
//! `PipelineStats`. The progress file records which papers are done so a
//! restarted run can resume (§4.1's `resume_completed` set); the stats file
//! is an operator-facing summary regenerated on every checkpoint.

use crate::shared::errors::{AppError, AppResult};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// One permanently failed paper, kept for operator triage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedPaper {
    pub paper_id: String,
    pub reason: String,
    pub attempts: u32,
    pub failed_at: DateTime<Local>,
}

/// On-disk progress record: the resumable set of completed papers plus
/// the failures accumulated so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub completed: HashSet<String>,
    pub failed: Vec<FailedPaper>,
    pub last_updated: DateTime<Local>,
}

impl Default for ProgressRecord {
    fn default() -> Self {
        Self {
            completed: HashSet::new(),
            failed: Vec::new(),
            last_updated: Local::now(),
        }
    }
}

/// Running totals accumulated across one pipeline invocation, mirroring
/// the original `PipelineStats` dataclass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineStats {
    pub total_papers: u64,
    pub processed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub in_progress: u64,
    pub total_extraction_seconds: f64,
    pub total_normalization_seconds: f64,
    pub total_ingestion_seconds: f64,
    pub entities_by_kind: HashMap<String, u64>,
    pub normalizer_exact_matches: u64,
    pub normalizer_dictionary_matches: u64,
    pub normalizer_embedding_matches: u64,
    pub normalizer_new_entities: u64,
    pub errors: Vec<String>,
}

/// Summary view computed from `PipelineStats`, ported from the original's
/// `to_dict()` derived fields.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatsSummary {
    pub papers_per_hour: f64,
    pub success_rate: f64,
    pub avg_extraction_seconds: f64,
    pub avg_normalization_seconds: f64,
    pub avg_ingestion_seconds: f64,
    pub normalization_coverage: f64,
}

impl PipelineStats {
    pub fn record_entity(&mut self, kind: &str, count: u64) {
        *self.entities_by_kind.entry(kind.to_string()).or_insert(0) += count;
    }

    /// Derived summary. `elapsed_seconds` is the wall-clock time since the
    /// run started, supplied by the caller (stats don't track their own
    /// start time so they stay trivially serializable).
    pub fn summary(&self, elapsed_seconds: f64) -> PipelineStatsSummary {
        let papers_per_hour = if elapsed_seconds > 0.0 {
            self.processed as f64 / elapsed_seconds * 3600.0
        } else {
            0.0
        };
        let attempted = self.processed + self.failed;
        let success_rate = if attempted > 0 {
            self.processed as f64 / attempted as f64
        } else {
            0.0
        };
        let avg = |total: f64| if self.processed > 0 { total / self.processed as f64 } else { 0.0 };
        let normalizer_total = self.normalizer_exact_matches
            + self.normalizer_dictionary_matches
            + self.normalizer_embedding_matches
            + self.normalizer_new_entities;
        let normalization_coverage = if normalizer_total > 0 {
            (normalizer_total - self.normalizer_new_entities) as f64 / normalizer_total as f64
        } else {
            0.0
        };

        PipelineStatsSummary {
            papers_per_hour,
            success_rate,
            avg_extraction_seconds: avg(self.total_extraction_seconds),
            avg_normalization_seconds: avg(self.total_normalization_seconds),
            avg_ingestion_seconds: avg(self.total_ingestion_seconds),
            normalization_coverage,
        }
    }
}

/// Atomic JSON-backed progress and stats store. Writes go to a temp file
/// in the same directory, then rename over the target so a crash mid-write
/// never leaves a truncated file (§4.9 "atomic checkpoint").
pub struct ProgressStore {
    progress_path: PathBuf,
    stats_path: PathBuf,
}

impl ProgressStore {
    pub fn new(progress_path: impl Into<PathBuf>, stats_path: impl Into<PathBuf>) -> Self {
        Self {
            progress_path: progress_path.into(),
            stats_path: stats_path.into(),
        }
    }

    /// Load the progress record from disk, or a fresh default if the file
    /// doesn't exist yet (first run).
    pub fn load(&self) -> AppResult<ProgressRecord> {
        match std::fs::read_to_string(&self.progress_path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| AppError::ProgressStoreError(format!("parsing progress file: {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ProgressRecord::default()),
            Err(e) => Err(AppError::ProgressStoreError(format!(
                "reading progress file: {e}"
            ))),
        }
    }

    pub fn save_progress(&self, record: &ProgressRecord) -> AppResult<()> {
        let mut record = record.clone();
        record.last_updated = Local::now();
        write_atomic(&self.progress_path, &record)
    }

    pub fn save_stats(&self, stats: &PipelineStats) -> AppResult<()> {
        write_atomic(&self.stats_path, stats)
    }

    pub fn mark_completed(&self, record: &mut ProgressRecord, paper_id: &str) {
        record.completed.insert(paper_id.to_string());
        record.failed.retain(|f| f.paper_id != paper_id);
    }

    pub fn mark_failed(&self, record: &mut ProgressRecord, paper_id: &str, reason: &str, attempts: u32) {
        record.failed.retain(|f| f.paper_id != paper_id);
        record.failed.push(FailedPaper {
            paper_id: paper_id.to_string(),
            reason: reason.to_string(),
            attempts,
            failed_at: Local::now(),
        });
    }
}

fn write_atomic<T: Serialize>(path: &Path, value: &T) -> AppResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)
        .map_err(|e| AppError::ProgressStoreError(format!("creating directory: {e}")))?;

    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::ProgressStoreError(format!("serializing: {e}")))?;

    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, json)
        .map_err(|e| AppError::ProgressStoreError(format!("writing temp file: {e}")))?;
    std::fs::rename(&tmp_path, path)
        .map_err(|e| AppError::ProgressStoreError(format!("renaming temp file: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_paths(tag: &str) -> (PathBuf, PathBuf) {
        let base = std::env::temp_dir().join(format!("smj_progress_test_{tag}_{}", std::process::id()));
        (base.join("progress.json"), base.join("stats.json"))
    }

    #[test]
    fn round_trips_progress_record() {
        let (progress_path, stats_path) = temp_paths("roundtrip");
        let store = ProgressStore::new(&progress_path, &stats_path);

        let mut record = store.load().unwrap();
        assert!(record.completed.is_empty());

        store.mark_completed(&mut record, "2001_a");
        store.save_progress(&record).unwrap();

        let reloaded = store.load().unwrap();
        assert!(reloaded.completed.contains("2001_a"));

        std::fs::remove_dir_all(progress_path.parent().unwrap()).ok();
    }

    #[test]
    fn mark_failed_replaces_prior_failure_for_same_paper() {
        let (progress_path, stats_path) = temp_paths("failed");
        let store = ProgressStore::new(&progress_path, &stats_path);
        let mut record = ProgressRecord::default();

        store.mark_failed(&mut record, "2001_a", "insufficient text", 1);
        store.mark_failed(&mut record, "2001_a", "llm error", 2);

        assert_eq!(record.failed.len(), 1);
        assert_eq!(record.failed[0].reason, "llm error");
        assert_eq!(record.failed[0].attempts, 2);

        std::fs::remove_dir_all(progress_path.parent().unwrap()).ok();
    }

    #[test]
    fn mark_completed_clears_prior_failure() {
        let mut record = ProgressRecord::default();
        record.failed.push(FailedPaper {
            paper_id: "2001_a".into(),
            reason: "x".into(),
            attempts: 1,
            failed_at: Local::now(),
        });

        let (progress_path, stats_path) = temp_paths("clear");
        let store = ProgressStore::new(&progress_path, &stats_path);
        store.mark_completed(&mut record, "2001_a");

        assert!(record.failed.is_empty());
        assert!(record.completed.contains("2001_a"));
    }

    #[test]
    fn stats_summary_computes_rates() {
        let mut stats = PipelineStats {
            processed: 9,
            failed: 1,
            total_extraction_seconds: 90.0,
            ..Default::default()
        };
        stats.record_entity("theory", 5);
        stats.normalizer_exact_matches = 8;
        stats.normalizer_new_entities = 2;

        let summary = stats.summary(3600.0);
        assert_eq!(summary.success_rate, 0.9);
        assert!((summary.avg_extraction_seconds - 10.0).abs() < 1e-9);
        assert_eq!(summary.normalization_coverage, 0.8);
    }
}
