//! LLM provider implementations

mod anthropic;
mod ollama;
mod openai;

pub use anthropic::AnthropicProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use crate::agents::traits::{LlmConfig, LlmProvider, Message};
use crate::shared::config::{Config, LlmProviderType};
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;

/// Runtime-selectable provider handle. `LlmProvider` has a generic default
/// method (`complete_json`), so it cannot be used as a trait object; this
/// enum gives the extractor (§4.3) the same "pick a backend at runtime"
/// behavior through static dispatch instead, which is also what lets the
/// quota-exhaustion fallback (§4.3/§9) swap backends mid-run.
pub enum ProviderHandle {
    OpenAi(OpenAiProvider),
    Anthropic(AnthropicProvider),
    Ollama(OllamaProvider),
}

impl ProviderHandle {
    /// Build a provider from its kind and the shared configuration.
    pub fn from_config(kind: LlmProviderType, config: &Config) -> AppResult<Self> {
        match kind {
            LlmProviderType::OpenAi => Ok(Self::OpenAi(OpenAiProvider::from_env()?)),
            LlmProviderType::Anthropic => Ok(Self::Anthropic(AnthropicProvider::from_env()?)),
            LlmProviderType::Ollama => {
                let model = config
                    .ollama_model
                    .clone()
                    .unwrap_or_else(|| "llama3.2".to_string());
                Ok(Self::Ollama(
                    OllamaProvider::new(model).with_base_url(config.ollama_url()),
                ))
            }
        }
    }
}

#[async_trait]
impl LlmProvider for ProviderHandle {
    fn name(&self) -> &str {
        match self {
            Self::OpenAi(p) => p.name(),
            Self::Anthropic(p) => p.name(),
            Self::Ollama(p) => p.name(),
        }
    }

    fn default_model(&self) -> &str {
        match self {
            Self::OpenAi(p) => p.default_model(),
            Self::Anthropic(p) => p.default_model(),
            Self::Ollama(p) => p.default_model(),
        }
    }

    async fn complete(&self, messages: Vec<Message>, config: &LlmConfig) -> AppResult<String> {
        match self {
            Self::OpenAi(p) => p.complete(messages, config).await,
            Self::Anthropic(p) => p.complete(messages, config).await,
            Self::Ollama(p) => p.complete(messages, config).await,
        }
    }
}

impl TryFrom<(&str, &Config)> for ProviderHandle {
    type Error = AppError;

    fn try_from((name, config): (&str, &Config)) -> Result<Self, Self::Error> {
        let kind = match name.to_lowercase().as_str() {
            "openai" => LlmProviderType::OpenAi,
            "anthropic" => LlmProviderType::Anthropic,
            "ollama" => LlmProviderType::Ollama,
            other => {
                return Err(AppError::ConfigError(format!(
                    "unknown LLM provider '{other}'"
                )));
            }
        };
        Self::from_config(kind, config)
    }
}
