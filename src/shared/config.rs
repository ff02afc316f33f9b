//! Configuration management for the pipeline

use crate::shared::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Type of LLM provider to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderType {
    /// OpenAI API (GPT-4, etc.)
    #[default]
    OpenAi,
    /// Anthropic API (Claude)
    Anthropic,
    /// Ollama (local LLMs)
    Ollama,
}

impl std::fmt::Display for LlmProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProviderType::OpenAi => write!(f, "openai"),
            LlmProviderType::Anthropic => write!(f, "anthropic"),
            LlmProviderType::Ollama => write!(f, "ollama"),
        }
    }
}

/// Pipeline configuration: LLM backend credentials plus the graph store,
/// corpus, worker, cache, and progress-store settings needed to run the
/// ingestion pipeline end to end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// OpenAI model (default: gpt-4o)
    pub openai_model: Option<String>,

    /// Anthropic API key
    pub anthropic_api_key: Option<String>,

    /// Anthropic model (default: claude-sonnet-4-20250514)
    pub anthropic_model: Option<String>,

    /// Ollama base URL (default: http://localhost:11434)
    pub ollama_base_url: Option<String>,

    /// Default Ollama model
    pub ollama_model: Option<String>,

    /// Default LLM provider to use
    pub default_llm_provider: LlmProviderType,

    /// Default model to use (provider-specific)
    pub default_model: Option<String>,

    /// Fallback LLM provider used when the primary backend reports quota
    /// exhaustion (§6.2).
    pub fallback_llm_provider: Option<LlmProviderType>,

    /// Retry count for LLM API calls
    pub retry_count: u64,

    /// Wait time between retries (seconds)
    pub retry_wait_time: u64,

    /// Bolt URI of the target graph store (e.g. `bolt://localhost:7687`)
    pub neo4j_uri: String,

    /// Graph store username
    pub neo4j_user: String,

    /// Graph store password
    pub neo4j_password: String,

    /// Graph store database name
    pub neo4j_database: String,

    /// Root directory to walk for `YYYY_<suffix>.pdf` corpus files
    pub corpus_root: String,

    /// Number of concurrent extraction/ingestion workers
    pub worker_count: usize,

    /// Inclusive lower bound on publication year, if filtering the corpus
    pub year_start: Option<i32>,

    /// Inclusive upper bound on publication year, if filtering the corpus
    pub year_end: Option<i32>,

    /// Resume from the persisted progress store rather than reprocessing
    /// everything
    pub resume: bool,

    /// Whether nearest-neighbor embedding matching is enabled in the
    /// normalizer (requires an embedding-capable provider)
    pub embeddings_enabled: bool,

    /// Directory holding cached LLM responses
    pub cache_dir: String,

    /// Time-to-live for cached LLM responses, in days
    pub cache_ttl_days: i64,

    /// Path to the durable JSON progress store
    pub progress_file_path: String,

    /// Path to the end-of-run pipeline statistics file
    pub stats_file_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: None,
            anthropic_api_key: None,
            anthropic_model: None,
            ollama_base_url: None,
            ollama_model: None,
            default_llm_provider: LlmProviderType::default(),
            default_model: None,
            fallback_llm_provider: None,
            retry_count: 3,
            retry_wait_time: 1,
            neo4j_uri: "bolt://localhost:7687".to_string(),
            neo4j_user: "neo4j".to_string(),
            neo4j_password: String::new(),
            neo4j_database: "neo4j".to_string(),
            corpus_root: "./corpus".to_string(),
            worker_count: 10,
            year_start: None,
            year_end: None,
            resume: true,
            embeddings_enabled: false,
            cache_dir: "./.cache/llm_responses".to_string(),
            cache_ttl_days: 30,
            progress_file_path: "./progress.json".to_string(),
            stats_file_path: "./pipeline_stats.json".to_string(),
        }
    }
}

impl Config {
    /// Create a new default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            openai_model: std::env::var("OPENAI_MODEL").ok(),
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            anthropic_model: std::env::var("ANTHROPIC_MODEL").ok(),
            ollama_base_url: std::env::var("OLLAMA_BASE_URL").ok(),
            ollama_model: std::env::var("OLLAMA_MODEL").ok(),
            default_llm_provider: Self::parse_provider_from_env("LLM_PROVIDER")?
                .unwrap_or_default(),
            default_model: std::env::var("LLM_MODEL").ok(),
            fallback_llm_provider: Self::parse_provider_from_env("LLM_FALLBACK_PROVIDER")?,
            retry_count: std::env::var("API_RETRY_COUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            retry_wait_time: std::env::var("API_RETRY_WAIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
            neo4j_uri: std::env::var("NEO4J_URI").unwrap_or(defaults.neo4j_uri),
            neo4j_user: std::env::var("NEO4J_USER").unwrap_or(defaults.neo4j_user),
            neo4j_password: std::env::var("NEO4J_PASSWORD").unwrap_or(defaults.neo4j_password),
            neo4j_database: std::env::var("NEO4J_DATABASE").unwrap_or(defaults.neo4j_database),
            corpus_root: std::env::var("SMJ_CORPUS_ROOT").unwrap_or(defaults.corpus_root),
            worker_count: std::env::var("SMJ_WORKER_COUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.worker_count),
            year_start: std::env::var("SMJ_YEAR_START")
                .ok()
                .and_then(|s| s.parse().ok()),
            year_end: std::env::var("SMJ_YEAR_END")
                .ok()
                .and_then(|s| s.parse().ok()),
            resume: std::env::var("SMJ_RESUME")
                .ok()
                .map(|s| s != "0" && !s.eq_ignore_ascii_case("false"))
                .unwrap_or(defaults.resume),
            embeddings_enabled: std::env::var("SMJ_EMBEDDINGS_ENABLED")
                .ok()
                .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.embeddings_enabled),
            cache_dir: std::env::var("SMJ_CACHE_DIR").unwrap_or(defaults.cache_dir),
            cache_ttl_days: std::env::var("SMJ_CACHE_TTL_DAYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.cache_ttl_days),
            progress_file_path: std::env::var("SMJ_PROGRESS_FILE")
                .unwrap_or(defaults.progress_file_path),
            stats_file_path: std::env::var("SMJ_STATS_FILE").unwrap_or(defaults.stats_file_path),
        })
    }

    /// Parse an `LlmProviderType` from the named environment variable.
    /// Returns `Ok(None)` when the variable is unset.
    fn parse_provider_from_env(var: &str) -> AppResult<Option<LlmProviderType>> {
        match std::env::var(var).as_deref() {
            Ok("openai") => Ok(Some(LlmProviderType::OpenAi)),
            Ok("anthropic") => Ok(Some(LlmProviderType::Anthropic)),
            Ok("ollama") => Ok(Some(LlmProviderType::Ollama)),
            Ok(other) => Err(AppError::ConfigError(format!(
                "Unknown LLM provider: {}. Valid options: openai, anthropic, ollama",
                other
            ))),
            Err(_) => Ok(None),
        }
    }

    /// Check if OpenAI is configured
    pub fn has_openai(&self) -> bool {
        self.openai_api_key.is_some()
    }

    /// Check if Anthropic is configured
    pub fn has_anthropic(&self) -> bool {
        self.anthropic_api_key.is_some()
    }

    /// Check if Ollama is available (assumes local availability)
    pub fn has_ollama(&self) -> bool {
        true
    }

    /// Get the effective Ollama base URL
    pub fn ollama_url(&self) -> String {
        self.ollama_base_url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string())
    }

    /// Set OpenAI API key
    pub fn with_openai_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = Some(key.into());
        self
    }

    /// Set Anthropic API key
    pub fn with_anthropic_key(mut self, key: impl Into<String>) -> Self {
        self.anthropic_api_key = Some(key.into());
        self
    }

    /// Set default LLM provider
    pub fn with_provider(mut self, provider: LlmProviderType) -> Self {
        self.default_llm_provider = provider;
        self
    }

    /// Set default model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Set retry configuration
    pub fn with_retry_config(mut self, count: u64, wait_time: u64) -> Self {
        self.retry_count = count;
        self.retry_wait_time = wait_time;
        self
    }

    /// Set the corpus root directory
    pub fn with_corpus_root(mut self, root: impl Into<String>) -> Self {
        self.corpus_root = root.into();
        self
    }

    /// Set the worker pool size
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count.max(1);
        self
    }

    /// Set the inclusive publication-year filter range
    pub fn with_year_range(mut self, start: Option<i32>, end: Option<i32>) -> Self {
        self.year_start = start;
        self.year_end = end;
        self
    }

    /// Set whether a prior progress store should be resumed from
    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    /// Set the Neo4j connection parameters
    pub fn with_neo4j(
        mut self,
        uri: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.neo4j_uri = uri.into();
        self.neo4j_user = user.into();
        self.neo4j_password = password.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.default_llm_provider, LlmProviderType::OpenAi);
        assert_eq!(config.retry_count, 3);
        assert_eq!(config.worker_count, 10);
        assert!(config.resume);
    }

    #[test]
    fn test_config_builder() {
        let config = Config::new()
            .with_openai_key("test-key")
            .with_provider(LlmProviderType::Anthropic)
            .with_model("claude-3-opus")
            .with_corpus_root("/data/smj")
            .with_worker_count(16)
            .with_year_range(Some(1990), Some(2020));

        assert!(config.has_openai());
        assert_eq!(config.default_llm_provider, LlmProviderType::Anthropic);
        assert_eq!(config.default_model, Some("claude-3-opus".to_string()));
        assert_eq!(config.corpus_root, "/data/smj");
        assert_eq!(config.worker_count, 16);
        assert_eq!(config.year_start, Some(1990));
        assert_eq!(config.year_end, Some(2020));
    }

    #[test]
    fn test_ollama_url() {
        let config = Config::default();
        assert_eq!(config.ollama_url(), "http://localhost:11434");

        let config = Config::default().with_provider(LlmProviderType::Ollama);
        assert!(config.has_ollama());
    }

    #[test]
    fn test_worker_count_floor() {
        let config = Config::new().with_worker_count(0);
        assert_eq!(config.worker_count, 1);
    }
}
