//! Multi-stage scholarly-entity extractor (§4.3).
//!
//! Turns one PDF into a typed, never-partial `ExtractionResult`: text
//! acquisition through `pdf::PdfExtractor`, prompt construction through
//! `agents::prompts::PromptTemplates`, LLM invocation in either combined
//! mode (one call per entity group) or single-entity fallback mode, JSON
//! parsing with retry, and a final source-grounded validation pass that
//! checks each extracted theory/method/variable/research question/citation
//! against the text it was drawn from.

use crate::agents::prompts::{PromptTemplates, PROMPT_VERSION};
use crate::agents::providers::ProviderHandle;
use crate::agents::traits::{LlmConfig, LlmProvider, Message};
use crate::cache::ResponseCache;
use crate::models::{
    ExtractionResult, RawAuthor, RawCitation, RawContribution, RawFinding, RawMetadata, RawMethod,
    RawPhenomenon, RawResearchQuestion, RawTheory, RawTheoryPhenomenonLink, RawVariable,
    ValidationStatus,
};
use crate::pdf::PdfExtractor;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::token_coverage;
use chrono::Local;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Confidence floor below which a source-grounded entity is dropped rather
/// than retained with a `not_found` status (§4.3 stage 5).
const MIN_EXTRACTION_CONFIDENCE: f64 = 0.3;

/// Known abbreviation expansions used by the source-grounded validation pass
/// when the acronym itself never appears verbatim in the source text (e.g.
/// a paper that writes "resource-based" throughout but never spells out
/// "RBV").
const ABBREVIATIONS: &[(&str, &[&str])] = &[
    ("rbv", &["resource", "based"]),
    ("rbt", &["resource", "based"]),
    ("kbv", &["knowledge", "based"]),
    ("tce", &["transaction", "cost"]),
    ("ols", &["ordinary", "least", "squares"]),
    ("gmm", &["generalized", "method", "moments"]),
    ("hlm", &["hierarchical", "linear"]),
    ("sem", &["structural", "equation"]),
    ("ceo", &["chief", "executive"]),
    ("tmt", &["top", "management", "team"]),
];

/// Runtime knobs for the extractor (§4.3 stages 3-4).
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Run the 3-call-plus-citations combined strategy rather than the
    /// one-call-per-kind fallback strategy.
    pub combined_mode: bool,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            combined_mode: true,
            max_retries: 3,
            retry_base_delay: Duration::from_secs(2),
            retry_max_delay: Duration::from_secs(16),
        }
    }
}

/// Turns one PDF into a typed `ExtractionResult`. Generic over the primary
/// LLM provider; an optional secondary `ProviderHandle` takes over after a
/// one-time quota-exhaustion fallback and is never switched back (§4.3/§9).
pub struct Extractor<P: LlmProvider> {
    provider: P,
    fallback: Option<ProviderHandle>,
    cache: Arc<ResponseCache>,
    pdf: PdfExtractor,
    config: ExtractorConfig,
    model: Option<String>,
    quota_exhausted: AtomicBool,
}

impl<P: LlmProvider> Extractor<P> {
    pub fn new(provider: P, cache: Arc<ResponseCache>) -> Self {
        Self {
            provider,
            fallback: None,
            cache,
            pdf: PdfExtractor::new(),
            config: ExtractorConfig::default(),
            model: None,
            quota_exhausted: AtomicBool::new(false),
        }
    }

    pub fn with_fallback(mut self, fallback: ProviderHandle) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_config(mut self, config: ExtractorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    fn llm_config(&self) -> LlmConfig {
        let mut cfg = LlmConfig {
            temperature: Some(0.1),
            ..LlmConfig::default()
        };
        if let Some(model) = &self.model {
            cfg = cfg.with_model(model.clone());
        }
        cfg
    }

    /// Run the full extraction pipeline for one paper: text acquisition,
    /// LLM invocation, and source-grounded validation.
    pub async fn extract(&self, paper_id: &str, pdf_path: &Path) -> AppResult<ExtractionResult> {
        let extracted = self.pdf.extract_from_path(pdf_path).await?;
        let text = extracted.plain_text;

        let mut result = if self.config.combined_mode {
            self.extract_combined(&text).await
        } else {
            self.extract_single_entity(&text).await
        };
        result.paper_id = paper_id.to_string();
        result.extracted_at = Some(Local::now());

        self.validate_against_source(&mut result, &text);
        Ok(result)
    }

    /// Combined mode: one call for metadata+authors, one for
    /// theories+phenomena+links, one for methods/variables/findings/
    /// contributions/research_questions, plus the always-separate
    /// citations call (§4.3 stage 3).
    async fn extract_combined(&self, text: &str) -> ExtractionResult {
        let metadata: MetadataCall = self
            .call_json("metadata", PromptTemplates::metadata_prompt(text), text)
            .await;
        let theories_phenomena: TheoriesPhenomenaCall = self
            .call_json(
                "theories_phenomena",
                PromptTemplates::theories_phenomena_prompt(text),
                text,
            )
            .await;
        let methods_findings: MethodsFindingsCall = self
            .call_json(
                "methods_findings",
                PromptTemplates::methods_findings_prompt(text),
                text,
            )
            .await;
        let citations: CitationsCall = self
            .call_json("citations", PromptTemplates::citations_prompt(text), text)
            .await;

        ExtractionResult {
            paper_id: String::new(),
            metadata: metadata.metadata,
            authors: metadata.authors,
            theories: theories_phenomena.theories,
            phenomena: theories_phenomena.phenomena,
            theory_phenomenon_links: theories_phenomena.theory_phenomenon_links,
            methods: methods_findings.methods,
            variables: methods_findings.variables,
            findings: methods_findings.findings,
            contributions: methods_findings.contributions,
            research_questions: methods_findings.research_questions,
            citations: citations.citations,
            extracted_at: None,
        }
    }

    /// Single-entity fallback mode: one call per entity kind, used when the
    /// combined calls keep failing to parse (§4.3 fallback mode). Theory and
    /// phenomenon links aren't a distinct extractable kind on their own, so
    /// they're sourced from the theories call's response as in combined mode.
    async fn extract_single_entity(&self, text: &str) -> ExtractionResult {
        let metadata: MetadataCall = self
            .call_json(
                "metadata",
                PromptTemplates::single_entity_prompt("metadata", text),
                text,
            )
            .await;
        let theories: TheoriesPhenomenaCall = self
            .call_json(
                "theories",
                PromptTemplates::single_entity_prompt("theories", text),
                text,
            )
            .await;
        let phenomena: TheoriesPhenomenaCall = self
            .call_json(
                "phenomena",
                PromptTemplates::single_entity_prompt("phenomena", text),
                text,
            )
            .await;
        let methods: MethodsFindingsCall = self
            .call_json(
                "methods",
                PromptTemplates::single_entity_prompt("methods", text),
                text,
            )
            .await;
        let variables: MethodsFindingsCall = self
            .call_json(
                "variables",
                PromptTemplates::single_entity_prompt("variables", text),
                text,
            )
            .await;
        let findings: MethodsFindingsCall = self
            .call_json(
                "findings",
                PromptTemplates::single_entity_prompt("findings", text),
                text,
            )
            .await;
        let contributions: MethodsFindingsCall = self
            .call_json(
                "contributions",
                PromptTemplates::single_entity_prompt("contributions", text),
                text,
            )
            .await;
        let research_questions: MethodsFindingsCall = self
            .call_json(
                "research_questions",
                PromptTemplates::single_entity_prompt("research_questions", text),
                text,
            )
            .await;
        let citations: CitationsCall = self
            .call_json(
                "citations",
                PromptTemplates::single_entity_prompt("citations", text),
                text,
            )
            .await;

        ExtractionResult {
            paper_id: String::new(),
            metadata: metadata.metadata,
            authors: metadata.authors,
            theories: theories.theories,
            phenomena: phenomena.phenomena,
            theory_phenomenon_links: Vec::new(),
            methods: methods.methods,
            variables: variables.variables,
            findings: findings.findings,
            contributions: contributions.contributions,
            research_questions: research_questions.research_questions,
            citations: citations.citations,
            extracted_at: None,
        }
    }

    /// Run one prompt through the cache and, on a miss, the LLM, retrying
    /// JSON parse failures with exponential backoff. Exhausting retries
    /// yields a default (empty) value rather than an error, so the overall
    /// extraction always produces a total `ExtractionResult` (§4.3 stage 4).
    async fn call_json<T>(&self, prompt_type: &str, prompt: String, text: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        if let Some(cached) = self.cache.get(prompt_type, PROMPT_VERSION, text) {
            if let Ok(parsed) = self.provider.parse_json_response::<T>(&cached) {
                return parsed;
            }
        }

        let messages = vec![
            Message::system(PromptTemplates::system_prompt()),
            Message::user(prompt),
        ];
        let config = self.llm_config();
        let mut delay = self.config.retry_base_delay;

        for attempt in 1..=self.config.max_retries {
            match self.complete_text(messages.clone(), &config).await {
                Ok(response) => match self.provider.parse_json_response::<T>(&response) {
                    Ok(parsed) => {
                        if let Err(e) = self.cache.put(prompt_type, PROMPT_VERSION, text, &response)
                        {
                            warn!(error = %e, "failed to cache llm response");
                        }
                        return parsed;
                    }
                    Err(e) => {
                        warn!(attempt, prompt_type, error = %e, "failed to parse llm response as json");
                    }
                },
                Err(e) => {
                    warn!(attempt, prompt_type, error = %e, "llm call failed");
                }
            }
            if attempt < self.config.max_retries {
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(self.config.retry_max_delay);
            }
        }

        warn!(prompt_type, "extraction exhausted retries, returning empty result");
        T::default()
    }

    /// Issue one completion call, switching to the secondary backend (once,
    /// permanently) the first time the primary reports quota exhaustion
    /// (§4.3/§9 "one-time fallback").
    async fn complete_text(&self, messages: Vec<Message>, config: &LlmConfig) -> AppResult<String> {
        if self.quota_exhausted.load(Ordering::Relaxed) {
            if let Some(fallback) = &self.fallback {
                return fallback.complete(messages, config).await;
            }
        }

        match self.provider.complete(messages.clone(), config).await {
            Err(AppError::QuotaExhausted(reason)) if self.fallback.is_some() => {
                warn!(reason, "quota exhausted, switching to fallback llm backend");
                self.quota_exhausted.store(true, Ordering::Relaxed);
                self.fallback.as_ref().unwrap().complete(messages, config).await
            }
            other => other,
        }
    }

    /// Check every extracted theory/method/variable/research question/
    /// citation against the source text, overwriting its `confidence` (and,
    /// for theories, `validation_status`) and dropping anything that falls
    /// below `MIN_EXTRACTION_CONFIDENCE` (§4.3 stage 5).
    fn validate_against_source(&self, result: &mut ExtractionResult, source_text: &str) {
        result.theories.retain_mut(|raw| {
            let name = raw
                .theory_name
                .clone()
                .or_else(|| raw.name.clone())
                .unwrap_or_default();
            let (confidence, status) = source_match(&name, source_text);
            raw.confidence = confidence;
            raw.validation_status = status;
            confidence >= MIN_EXTRACTION_CONFIDENCE
        });

        result.methods.retain_mut(|raw| {
            let name = raw
                .method_name
                .clone()
                .or_else(|| raw.name.clone())
                .or_else(|| raw.method.clone())
                .unwrap_or_default();
            let (confidence, _status) = source_match(&name, source_text);
            raw.confidence = confidence;
            confidence >= MIN_EXTRACTION_CONFIDENCE
        });

        result.variables.retain_mut(|raw| {
            let name = raw
                .variable_name
                .clone()
                .or_else(|| raw.name.clone())
                .unwrap_or_default();
            let (confidence, _status) = source_match(&name, source_text);
            raw.confidence = confidence;
            confidence >= MIN_EXTRACTION_CONFIDENCE
        });

        result.research_questions.retain_mut(|raw| {
            let question = raw
                .question
                .clone()
                .or_else(|| raw.text.clone())
                .unwrap_or_default();
            let (confidence, _status) = source_match(&question, source_text);
            raw.confidence = confidence;
            confidence >= MIN_EXTRACTION_CONFIDENCE
        });

        result.citations.retain_mut(|raw| {
            let title = raw
                .title
                .clone()
                .or_else(|| raw.cited_title.clone())
                .unwrap_or_default();
            let (confidence, _status) = source_match(&title, source_text);
            raw.confidence = confidence;
            confidence >= MIN_EXTRACTION_CONFIDENCE
        });
    }
}

fn is_abbreviation_match(candidate: &str, source_lower: &str) -> bool {
    let key = candidate.trim().to_lowercase();
    ABBREVIATIONS
        .iter()
        .find(|(abbr, _)| *abbr == key)
        .is_some_and(|(_, words)| words.iter().all(|w| source_lower.contains(w)))
}

/// Heuristic source-grounded match for one extracted text span (§4.3 stage
/// 5): exact substring scores 1.0, >=70% significant-token coverage scores
/// 0.8, >=50% scores 0.6, a known abbreviation co-present with its expansion
/// scores 0.7, and anything else is retained as `not_found` with a
/// sub-threshold confidence that still clears the drop floor.
fn source_match(candidate: &str, source_text: &str) -> (f64, ValidationStatus) {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return (0.2, ValidationStatus::NotFound);
    }

    let source_lower = source_text.to_lowercase();
    if source_lower.contains(&candidate.to_lowercase()) {
        return (1.0, ValidationStatus::ExactMatch);
    }

    let coverage = token_coverage(candidate, source_text);
    if coverage >= 0.7 {
        return (0.8, ValidationStatus::PartialMatch);
    }
    if coverage >= 0.5 {
        return (0.6, ValidationStatus::WeakMatch);
    }
    if is_abbreviation_match(candidate, &source_lower) {
        return (0.7, ValidationStatus::AbbreviationMatch);
    }

    (0.4, ValidationStatus::NotFound)
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct MetadataCall {
    #[serde(default)]
    metadata: RawMetadata,
    #[serde(default)]
    authors: Vec<RawAuthor>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct TheoriesPhenomenaCall {
    #[serde(default)]
    theories: Vec<RawTheory>,
    #[serde(default)]
    phenomena: Vec<RawPhenomenon>,
    #[serde(default)]
    theory_phenomenon_links: Vec<RawTheoryPhenomenonLink>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct MethodsFindingsCall {
    #[serde(default)]
    methods: Vec<RawMethod>,
    #[serde(default)]
    variables: Vec<RawVariable>,
    #[serde(default)]
    findings: Vec<RawFinding>,
    #[serde(default)]
    contributions: Vec<RawContribution>,
    #[serde(default)]
    research_questions: Vec<RawResearchQuestion>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct CitationsCall {
    #[serde(default)]
    citations: Vec<RawCitation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_substring_scores_maximum_confidence() {
        let (confidence, status) =
            source_match("Resource-Based View", "...drawing on the Resource-Based View of the firm...");
        assert_eq!(confidence, 1.0);
        assert_eq!(status, ValidationStatus::ExactMatch);
    }

    #[test]
    fn partial_token_coverage_scores_point_eight() {
        let (confidence, status) = source_match(
            "dynamic capabilities framework",
            "firms develop dynamic capabilities over time to sustain advantage",
        );
        assert_eq!(confidence, 0.8);
        assert_eq!(status, ValidationStatus::PartialMatch);
    }

    #[test]
    fn abbreviation_rule_matches_expansion() {
        let (confidence, status) =
            source_match("RBV", "the firm's resources are valuable, rare, and hard to imitate, a resource based logic");
        assert_eq!(confidence, 0.7);
        assert_eq!(status, ValidationStatus::AbbreviationMatch);
    }

    #[test]
    fn unmatched_candidate_is_retained_as_not_found() {
        let (confidence, status) = source_match("quantum entanglement theory", "firm performance and growth");
        assert_eq!(confidence, 0.4);
        assert_eq!(status, ValidationStatus::NotFound);
    }

    #[test]
    fn empty_candidate_drops_below_threshold() {
        let (confidence, _) = source_match("", "anything");
        assert!(confidence < MIN_EXTRACTION_CONFIDENCE);
    }
}
