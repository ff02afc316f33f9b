//! Agents module for LLM-powered paper extraction
//!
//! This module provides:
//! - LLM provider traits and implementations (OpenAI, Anthropic, Ollama)
//! - The multi-stage scholarly-entity extractor
//! - Prompt templates for structured extraction

mod extractor;
mod prompts;
mod traits;

pub mod providers;

// Re-export main types
pub use extractor::{Extractor, ExtractorConfig};
pub use prompts::PromptTemplates;
pub use traits::{LlmConfig, LlmProvider, Message, MessageRole};

// Re-export providers for convenience
pub use providers::{AnthropicProvider, OllamaProvider, OpenAiProvider, ProviderHandle};
