//! Corpus discovery and task construction (§4.1).
//!
//! Ported from the original pipeline's `discover_papers`: the corpus root
//! is walked for PDFs named `YYYY_<suffix>.pdf`, filtered by year range and
//! by a resume set of already-completed paper ids, then turned into
//! deterministically ordered `PaperTask`s for the worker pool (§4.2).

use crate::shared::errors::{AppError, AppResult};
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Maximum extraction attempts before a paper is marked permanently failed.
pub const MAX_ATTEMPTS: u32 = 3;

fn filename_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{4})_(.+)\.pdf$").unwrap())
}

/// One unit of work handed to a worker: a paper id (derived from the PDF
/// filename stem) and the path to its source PDF.
#[derive(Debug, Clone)]
pub struct PaperTask {
    pub paper_id: String,
    pub pdf_path: PathBuf,
    pub attempt: u32,
    pub max_attempts: u32,
}

impl PaperTask {
    fn new(paper_id: String, pdf_path: PathBuf) -> Self {
        Self {
            paper_id,
            pdf_path,
            attempt: 0,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    /// Publication year parsed from the `paper_id`'s `YYYY_` prefix.
    pub fn year(&self) -> Option<i32> {
        self.paper_id.split('_').next()?.parse().ok()
    }

    /// True once `attempt` has reached `max_attempts` and the task should
    /// be marked permanently failed rather than retried (§4.2).
    pub fn exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

/// Inclusive year range filter. `None` on either bound means unbounded.
#[derive(Debug, Clone, Copy, Default)]
pub struct YearRange {
    pub start: Option<i32>,
    pub end: Option<i32>,
}

impl YearRange {
    pub fn contains(&self, year: i32) -> bool {
        self.start.is_none_or(|s| year >= s) && self.end.is_none_or(|e| year <= e)
    }
}

/// Recursively walk `corpus_root` collecting every file that matches the
/// `YYYY_<suffix>.pdf` naming convention, non-matching files are skipped
/// rather than failing discovery.
fn walk_pdfs(root: &Path) -> AppResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = std::fs::read_dir(&dir).map_err(|e| {
            AppError::CorpusError(format!("reading corpus directory {}: {e}", dir.display()))
        })?;
        for entry in entries {
            let entry = entry.map_err(AppError::IoError)?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| filename_pattern().is_match(name))
            {
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}

/// Discover paper tasks under `corpus_root`, filtered by `year_range` and
/// excluding any `paper_id` present in `resume_completed`. Results are
/// sorted by paper id for deterministic ordering across runs.
pub fn discover_papers(
    corpus_root: &Path,
    year_range: YearRange,
    resume_completed: &HashSet<String>,
) -> AppResult<Vec<PaperTask>> {
    let paths = walk_pdfs(corpus_root)?;
    let mut tasks = Vec::new();

    for path in paths {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(captures) = filename_pattern().captures(file_name) else {
            continue;
        };
        let year: i32 = captures[1].parse().unwrap_or(0);
        if !year_range.contains(year) {
            continue;
        }

        let paper_id = file_name.trim_end_matches(".pdf").to_string();
        if resume_completed.contains(&paper_id) {
            continue;
        }

        tasks.push(PaperTask::new(paper_id, path));
    }

    tasks.sort_by(|a, b| a.paper_id.cmp(&b.paper_id));
    Ok(tasks)
}

/// Bounded task queue capacity recommended for `worker_count` concurrent
/// workers (§4.1: "the queue is bounded to twice the worker count").
pub fn queue_capacity(worker_count: usize) -> usize {
    (worker_count * 2).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"%PDF-1.4 stub").unwrap();
    }

    #[test]
    fn discovers_matching_pdfs_sorted_by_paper_id() {
        let dir = std::env::temp_dir().join(format!("smj_discovery_test_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        touch(&dir, "2005_firm_growth.pdf");
        touch(&dir, "1998_agency.pdf");
        touch(&dir, "notes.txt");

        let tasks = discover_papers(&dir, YearRange::default(), &HashSet::new()).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].paper_id, "1998_agency");
        assert_eq!(tasks[1].year(), Some(2005));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn year_range_filters_out_of_range_papers() {
        let dir = std::env::temp_dir().join(format!("smj_discovery_test2_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        touch(&dir, "1990_old.pdf");
        touch(&dir, "2020_new.pdf");

        let range = YearRange { start: Some(2000), end: None };
        let tasks = discover_papers(&dir, range, &HashSet::new()).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].paper_id, "2020_new");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn resume_set_excludes_completed_papers() {
        let dir = std::env::temp_dir().join(format!("smj_discovery_test3_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        touch(&dir, "2001_done.pdf");
        touch(&dir, "2001_pending.pdf");

        let mut resume = HashSet::new();
        resume.insert("2001_done".to_string());

        let tasks = discover_papers(&dir, YearRange::default(), &resume).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].paper_id, "2001_pending");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn queue_capacity_is_twice_worker_count() {
        assert_eq!(queue_capacity(10), 20);
        assert_eq!(queue_capacity(0), 1);
    }

    #[test]
    fn task_exhausted_after_max_attempts() {
        let mut task = PaperTask::new("2001_x".into(), PathBuf::from("/tmp/2001_x.pdf"));
        task.attempt = MAX_ATTEMPTS;
        assert!(task.exhausted());
    }
}
