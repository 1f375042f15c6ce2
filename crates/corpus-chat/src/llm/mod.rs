//! LLM provider layer.
//!
//! Providers form a closed set behind one capability trait; the gateway picks
//! them by explicit priority order, never by runtime type inspection.

pub mod gateway;
pub mod remote;

pub use gateway::LlmGateway;
pub use remote::RemoteProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Supported provider backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Google Generative Language (`generateContent`).
    Google,
    /// Groq's OpenAI-compatible chat completions endpoint.
    Groq,
    /// Any other OpenAI-compatible chat completions endpoint.
    OpenAiCompatible { endpoint: String },
}

/// Generation parameters forwarded to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: 0.0,
            top_p: 0.95,
        }
    }
}

/// A single provider failure. `transient` marks timeouts, rate limits and
/// server errors — failures a different provider (or a later retry by the
/// caller) might not hit.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
    pub transient: bool,
}

impl ProviderError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: true,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: false,
        }
    }
}

/// Core trait for text-generation providers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for `prompt`. Exactly one provider's response is
    /// ever surfaced per gateway call.
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, ProviderError>;

    /// Provider label used in logs and failure diagnostics,
    /// e.g. `google/gemini-2.0-flash`.
    fn name(&self) -> String;
}
