//! Priority-ordered provider dispatch with fallback.

use std::time::Duration;

use crate::config::LlmSettings;
use crate::error::{ChatError, ProviderAttempt};

use super::{GenerationConfig, LlmProvider, RemoteProvider};

/// Dispatches prompts to configured providers in priority order. When a
/// provider fails the next one is tried; the failure is kept as a
/// `ProviderAttempt` so an exhausted gateway can report every reason.
pub struct LlmGateway {
    providers: Vec<Box<dyn LlmProvider>>,
    generation: GenerationConfig,
}

impl LlmGateway {
    pub fn new(
        providers: Vec<Box<dyn LlmProvider>>,
        generation: GenerationConfig,
    ) -> anyhow::Result<Self> {
        if providers.is_empty() {
            anyhow::bail!("LlmGateway requires at least one provider");
        }
        Ok(Self {
            providers,
            generation,
        })
    }

    /// Build remote providers from settings; API keys come from the
    /// environment and are never stored in config files.
    pub fn from_settings(settings: &LlmSettings) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(settings.request_timeout_secs);
        let mut providers: Vec<Box<dyn LlmProvider>> = Vec::new();
        for provider_settings in &settings.providers {
            providers.push(Box::new(RemoteProvider::from_settings(
                provider_settings,
                timeout,
            )?));
        }
        Self::new(
            providers,
            GenerationConfig {
                max_tokens: settings.max_tokens,
                temperature: settings.temperature,
                top_p: 0.95,
            },
        )
    }

    /// Names of the configured providers, in priority order.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Generate text for `prompt`, falling back through the provider list.
    /// Returns exactly one provider's output, or `ChatError::Generation`
    /// carrying every attempt when all providers are exhausted.
    pub async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
        let mut attempts = Vec::new();

        for provider in &self.providers {
            let name = provider.name();
            match provider.generate(prompt, &self.generation).await {
                Ok(text) => {
                    if !attempts.is_empty() {
                        tracing::info!(
                            provider = %name,
                            failed_attempts = attempts.len(),
                            "Fallback provider answered"
                        );
                    }
                    return Ok(text);
                }
                Err(e) => {
                    tracing::warn!(
                        provider = %name,
                        transient = e.transient,
                        error = %e,
                        "Provider failed, trying next"
                    );
                    attempts.push(ProviderAttempt {
                        provider: name,
                        reason: e.message,
                        transient: e.transient,
                    });
                }
            }
        }

        Err(ChatError::Generation { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::{FailingProvider, StaticProvider};

    #[tokio::test]
    async fn primary_success_skips_fallback() {
        let gateway = LlmGateway::new(
            vec![
                Box::new(StaticProvider::new("mock/primary", "primary answer")),
                Box::new(StaticProvider::new("mock/secondary", "secondary answer")),
            ],
            GenerationConfig::default(),
        )
        .unwrap();

        let answer = gateway.generate("question").await.unwrap();
        assert_eq!(answer, "primary answer");
    }

    #[tokio::test]
    async fn failing_primary_falls_back_to_secondary() {
        let gateway = LlmGateway::new(
            vec![
                Box::new(FailingProvider::new("mock/primary", true)),
                Box::new(StaticProvider::new("mock/secondary", "fallback answer")),
            ],
            GenerationConfig::default(),
        )
        .unwrap();

        let answer = gateway.generate("question").await.unwrap();
        assert_eq!(answer, "fallback answer");
    }

    #[tokio::test]
    async fn exhausted_providers_report_every_attempt() {
        let gateway = LlmGateway::new(
            vec![
                Box::new(FailingProvider::new("mock/primary", true)),
                Box::new(FailingProvider::new("mock/secondary", false)),
            ],
            GenerationConfig::default(),
        )
        .unwrap();

        let err = gateway.generate("question").await.unwrap_err();
        match err {
            ChatError::Generation { attempts } => {
                assert_eq!(attempts.len(), 2);
                assert_eq!(attempts[0].provider, "mock/primary");
                assert!(attempts[0].transient);
                assert_eq!(attempts[1].provider, "mock/secondary");
                assert!(!attempts[1].transient);
            }
            other => panic!("expected Generation error, got {:?}", other),
        }
    }

    #[test]
    fn empty_provider_list_is_rejected() {
        assert!(LlmGateway::new(Vec::new(), GenerationConfig::default()).is_err());
    }
}
