//! Small shared helpers used across the extraction, normalization, and
//! conflict-resolution layers.

use crate::shared::errors::AppError;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;

/// Creates and configures a new `ProgressBar` with a custom style and optional message.
///
/// This function initializes a progress bar with a spinner, percentage display,
/// and customizable message. The progress bar uses Unicode block characters
/// for visual representation.
///
/// # Arguments
///
/// * `total` - The total number of steps for the progress bar.
/// * `msg` - An optional message to display alongside the progress bar.
///           Defaults to "Processing" if `None` is provided.
///
/// # Returns
///
/// A configured `ProgressBar` instance ready for use.
pub fn generate_progress_bar(total: usize, msg: Option<String>) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{wide_bar}] {percent}% ({msg})")
            .unwrap()
            .progress_chars("█▓▒░")
            .tick_chars("⠋⠙⠚⠉"),
    );
    if let Some(m) = msg {
        pb.set_message(m);
    } else {
        pb.set_message("Processing".to_string());
    }
    pb
}

/// Lower-cased, whitespace-split tokens of length > 3, the "significant
/// token" definition used by source-grounded validation (§4.3) and the
/// connection-strength keyword score (§4.8).
pub fn significant_tokens(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| w.chars().count() > 3)
        .collect()
}

/// Jaccard similarity between the whitespace-token sets of two texts.
/// Ported from the original pipeline's conflict resolver (`_similar_text`),
/// reused by the Normalizer/Ingester compatibility check (§4.7) and by the
/// connection-strength keyword score (§4.8).
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let tokens_a: HashSet<String> = a.split_whitespace().map(|w| w.to_lowercase()).collect();
    let tokens_b: HashSet<String> = b.split_whitespace().map(|w| w.to_lowercase()).collect();

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Fraction of `needle`'s significant tokens (length > 3) that appear
/// verbatim in `haystack`, lower-cased. Used by the extractor's
/// source-grounded validation heuristic (§4.3).
pub fn token_coverage(needle: &str, haystack: &str) -> f64 {
    let needle_tokens = significant_tokens(needle);
    if needle_tokens.is_empty() {
        return 0.0;
    }
    let haystack_lower = haystack.to_lowercase();
    let found = needle_tokens
        .iter()
        .filter(|t| haystack_lower.contains(t.as_str()))
        .count();
    found as f64 / needle_tokens.len() as f64
}

/// Classifies a failed LLM call as quota exhaustion (§4.3, §7 "Quota
/// exhaustion") rather than a plain transient error, so the extractor's
/// one-time backend fallback (`complete_text`) actually has something to
/// fire on. `status` is the HTTP status code when the provider has one in
/// hand; `detail` is the raw error/body text, checked for a rate-limit or
/// quota signal when no (or a non-429) status is available.
pub fn classify_llm_error(status: Option<u16>, detail: impl std::fmt::Display) -> AppError {
    let detail = detail.to_string();
    let lower = detail.to_lowercase();
    let is_quota = status == Some(429)
        || lower.contains("insufficient_quota")
        || lower.contains("rate_limit")
        || lower.contains("rate limit")
        || lower.contains("too many requests")
        || lower.contains("quota");
    if is_quota {
        AppError::QuotaExhausted(detail)
    } else {
        AppError::LlmError(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_llm_error_429_status_is_quota_exhausted() {
        assert!(matches!(
            classify_llm_error(Some(429), "slow down"),
            AppError::QuotaExhausted(_)
        ));
    }

    #[test]
    fn classify_llm_error_insufficient_quota_text_is_quota_exhausted() {
        assert!(matches!(
            classify_llm_error(None, "Error: insufficient_quota for this key"),
            AppError::QuotaExhausted(_)
        ));
    }

    #[test]
    fn classify_llm_error_generic_5xx_is_llm_error() {
        assert!(matches!(
            classify_llm_error(Some(500), "internal server error"),
            AppError::LlmError(_)
        ));
    }

    #[test]
    fn jaccard_similarity_identical_texts_is_one() {
        assert_eq!(jaccard_similarity("firm performance growth", "firm performance growth"), 1.0);
    }

    #[test]
    fn jaccard_similarity_disjoint_texts_is_zero() {
        assert_eq!(jaccard_similarity("firm performance", "market entry timing"), 0.0);
    }

    #[test]
    fn token_coverage_counts_substring_presence() {
        let coverage = token_coverage(
            "Resource-Based View",
            "the firm applies the resource-based view of strategy",
        );
        assert!(coverage > 0.0);
    }

    #[test]
    fn token_coverage_empty_needle_is_zero() {
        assert_eq!(token_coverage("", "some haystack text"), 0.0);
    }
}
