//! PDF text extraction implementation using rsrpp
//!
//! rsrpp's parser is URL-oriented; local corpus files are addressed by
//! wrapping their absolute path as a `file://` URI (§4.3 stage 1). Extracted
//! text is capped at 25,000 characters per paper and cached in-memory keyed
//! by `(path, mtime, size)` so re-running a paper within one process (e.g.
//! during a retry) does not re-parse the PDF.

use crate::shared::errors::{AppError, AppResult};
use chrono::{DateTime, Local};
use futures::FutureExt;
use rsrpp::config::ParserConfig;
use rsrpp::models::Section;
use rsrpp::parser::{pages2sections, parse};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;

/// Maximum number of characters of extracted text kept per paper.
pub const MAX_EXTRACTED_CHARS: usize = 25_000;

/// Minimum number of characters required for a paper to be considered
/// extractable; fewer than this and the pipeline treats the PDF as
/// unreadable (scanned image, corrupted file, etc).
pub const MIN_EXTRACTED_CHARS: usize = 100;

/// Configuration for PDF extraction
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Enable verbose logging during extraction
    pub verbose: bool,
    /// Cleanup temporary files after extraction
    pub cleanup: bool,
    /// Include math markup in extracted text (using `<math>...</math>` tags)
    pub include_math: bool,
    /// Hard cap on characters of plain text kept per paper
    pub max_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            cleanup: true,
            include_math: true,
            max_chars: MAX_EXTRACTED_CHARS,
        }
    }
}

impl ExtractionConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbose logging
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set cleanup behavior
    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Set math markup extraction
    pub fn with_include_math(mut self, include_math: bool) -> Self {
        self.include_math = include_math;
        self
    }

    /// Set the character cap applied to extracted text
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

/// Plain-text extraction result for one paper.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    /// Extracted text, truncated to `ExtractionConfig::max_chars`
    pub plain_text: String,
    /// Number of characters kept
    pub char_count: usize,
    /// When the extraction ran
    pub extracted_at: DateTime<Local>,
}

#[derive(Clone)]
struct CacheEntry {
    mtime: SystemTime,
    size: u64,
    text: ExtractedText,
}

/// PDF text extractor using rsrpp, specialized for a local corpus directory.
pub struct PdfExtractor {
    config: ExtractionConfig,
    cache: Mutex<HashMap<String, CacheEntry>>,
}

impl PdfExtractor {
    /// Create a new extractor with default configuration
    pub fn new() -> Self {
        Self {
            config: ExtractionConfig::default(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Create a new extractor with custom configuration
    pub fn with_config(config: ExtractionConfig) -> Self {
        Self {
            config,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Extract (and cap) plain text from a local PDF path.
    pub async fn extract_from_path(&self, path: &Path) -> AppResult<ExtractedText> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            AppError::PdfExtractionError(format!("cannot stat {}: {}", path.display(), e))
        })?;
        let mtime = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let size = metadata.len();
        let cache_key = path.to_string_lossy().to_string();

        if let Some(entry) = self.cache.lock().unwrap().get(&cache_key)
            && entry.mtime == mtime
            && entry.size == size
        {
            return Ok(entry.text.clone());
        }

        let url = Self::path_to_file_url(path)?;
        tracing::info!("Extracting text from PDF: {}", path.display());

        let mut parser_config = ParserConfig::new();
        parser_config.extract_references = false;

        let parse_result = AssertUnwindSafe(parse(&url, &mut parser_config, self.config.verbose))
            .catch_unwind()
            .await;

        let pages = match parse_result {
            Ok(Ok(pages)) => pages,
            Ok(Err(e)) => {
                return Err(AppError::PdfExtractionError(format!(
                    "PDF parse failed for {}: {}",
                    path.display(),
                    e
                )));
            }
            Err(panic_info) => {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic during PDF extraction".to_string()
                };
                tracing::error!("PDF extraction panicked for {}: {}", path.display(), panic_msg);
                return Err(AppError::PdfExtractionError(format!(
                    "PDF extraction panicked for {}: {}",
                    path.display(),
                    panic_msg
                )));
            }
        };

        let sections = pages2sections(&pages, &parser_config);
        let mut plain_text = self.build_plain_text(&sections);

        if self.config.cleanup && parser_config.clean_files().is_err() {
            tracing::warn!("failed to cleanup temp files for {}", path.display());
        }

        if plain_text.chars().count() < MIN_EXTRACTED_CHARS {
            return Err(AppError::InsufficientText(path.display().to_string()));
        }

        if plain_text.chars().count() > self.config.max_chars {
            plain_text = plain_text.chars().take(self.config.max_chars).collect();
        }

        let text = ExtractedText {
            char_count: plain_text.chars().count(),
            plain_text,
            extracted_at: Local::now(),
        };

        self.cache.lock().unwrap().insert(
            cache_key,
            CacheEntry {
                mtime,
                size,
                text: text.clone(),
            },
        );

        tracing::info!(
            "Extracted {} chars from {}",
            text.char_count,
            path.display()
        );

        Ok(text)
    }

    /// Wrap a local filesystem path as a `file://` URI for rsrpp's
    /// URL-oriented parser.
    fn path_to_file_url(path: &Path) -> AppResult<String> {
        let absolute = std::fs::canonicalize(path).map_err(|e| {
            AppError::PdfExtractionError(format!(
                "cannot resolve path {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(format!("file://{}", absolute.to_string_lossy()))
    }

    /// Build plain text from rsrpp sections, optionally including math markup.
    fn build_plain_text(&self, sections: &[Section]) -> String {
        sections
            .iter()
            .map(|s| {
                if self.config.include_math {
                    let math_text = s.get_math_text();
                    let regular_text = s.get_text();
                    if math_text != regular_text {
                        math_text
                    } else {
                        regular_text
                    }
                } else {
                    s.get_text()
                }
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_config_default() {
        let config = ExtractionConfig::default();
        assert!(!config.verbose);
        assert!(config.cleanup);
        assert_eq!(config.max_chars, MAX_EXTRACTED_CHARS);
    }

    #[test]
    fn test_extraction_config_builder() {
        let config = ExtractionConfig::new()
            .with_verbose(true)
            .with_cleanup(false)
            .with_include_math(false)
            .with_max_chars(1000);
        assert!(config.verbose);
        assert!(!config.cleanup);
        assert!(!config.include_math);
        assert_eq!(config.max_chars, 1000);
    }

    #[test]
    fn test_path_to_file_url_roundtrips_existing_path() {
        let path = std::env::current_dir().unwrap();
        let url = PdfExtractor::path_to_file_url(&path).unwrap();
        assert!(url.starts_with("file://"));
    }
}
