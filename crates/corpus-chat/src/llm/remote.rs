//! Hosted LLM providers over HTTP.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::config::{resolve_api_key, ProviderSettings};

use super::{GenerationConfig, LlmProvider, ProviderError, ProviderKind};

const GROQ_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";

pub struct RemoteProvider {
    kind: ProviderKind,
    model: String,
    api_key: String,
    client: Client,
}

impl RemoteProvider {
    pub fn new(
        kind: ProviderKind,
        model: String,
        api_key: String,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(request_timeout)
            .build()?;

        tracing::info!(kind = ?kind, model = %model, "Creating remote LLM provider");

        Ok(Self {
            kind,
            model,
            api_key,
            client,
        })
    }

    pub fn from_settings(
        settings: &ProviderSettings,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let api_key = resolve_api_key(&settings.api_key_env).ok_or_else(|| {
            anyhow::anyhow!(
                "Missing API key: set {} (or an API_KEYS JSON bundle)",
                settings.api_key_env
            )
        })?;
        Self::new(
            settings.kind.clone(),
            settings.model.clone(),
            api_key,
            request_timeout,
        )
    }

    fn endpoint(&self) -> String {
        match &self.kind {
            ProviderKind::Google => format!(
                "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
                self.model
            ),
            ProviderKind::Groq => GROQ_ENDPOINT.to_string(),
            ProviderKind::OpenAiCompatible { endpoint } => endpoint.clone(),
        }
    }

    fn classify_send_error(endpoint: &str, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() || e.is_connect() {
            ProviderError::transient(format!("Request to {} failed: {}", endpoint, e))
        } else {
            ProviderError::permanent(format!("Request to {} failed: {}", endpoint, e))
        }
    }

    /// Read the body once and classify the HTTP status; detects HTML error
    /// pages that gateways sometimes serve with a 200.
    async fn parse_json_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        endpoint: &str,
    ) -> Result<T, ProviderError> {
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::transient(format!("Failed to read response from {}: {}", endpoint, e))
        })?;

        if !status.is_success() {
            let preview: String = body.chars().take(300).collect();
            let message = format!("{} returned HTTP {}: {}", endpoint, status, preview);
            let transient = status.as_u16() == 408
                || status.as_u16() == 429
                || status.is_server_error();
            return Err(ProviderError { message, transient });
        }

        let trimmed = body.trim_start();
        if trimmed.starts_with('<') {
            let preview: String = trimmed.chars().take(200).collect();
            return Err(ProviderError::transient(format!(
                "{} returned HTML instead of JSON: {}",
                endpoint, preview
            )));
        }

        serde_json::from_str::<T>(&body).map_err(|e| {
            ProviderError::permanent(format!(
                "Failed to parse JSON from {}: {}",
                endpoint, e
            ))
        })
    }

    async fn google_generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, ProviderError> {
        #[derive(Deserialize)]
        struct GenerateResponse {
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: Content,
        }
        #[derive(Deserialize)]
        struct Content {
            parts: Vec<Part>,
        }
        #[derive(Deserialize)]
        struct Part {
            #[serde(default)]
            text: String,
        }

        let endpoint = self.endpoint();
        let request = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": config.temperature,
                "topP": config.top_p,
                "maxOutputTokens": config.max_tokens,
            },
        });

        let response = self
            .client
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::classify_send_error(&endpoint, e))?;

        let parsed: GenerateResponse = Self::parse_json_response(response, &endpoint).await?;
        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::permanent("Google returned no candidates"))?;
        let text: String = candidate
            .content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect();
        if text.is_empty() {
            return Err(ProviderError::permanent("Google returned an empty candidate"));
        }
        Ok(text)
    }

    async fn openai_compatible_generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, ProviderError> {
        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }
        #[derive(Deserialize)]
        struct Message {
            #[serde(default)]
            content: String,
        }

        let endpoint = self.endpoint();
        let request = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "top_p": config.top_p,
        });

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::classify_send_error(&endpoint, e))?;

        let parsed: ChatResponse = Self::parse_json_response(response, &endpoint).await?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::permanent("Provider returned no choices"))?;
        if choice.message.content.is_empty() {
            return Err(ProviderError::permanent("Provider returned an empty message"));
        }
        Ok(choice.message.content)
    }
}

#[async_trait]
impl LlmProvider for RemoteProvider {
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, ProviderError> {
        match &self.kind {
            ProviderKind::Google => self.google_generate(prompt, config).await,
            ProviderKind::Groq | ProviderKind::OpenAiCompatible { .. } => {
                self.openai_compatible_generate(prompt, config).await
            }
        }
    }

    fn name(&self) -> String {
        let kind = match &self.kind {
            ProviderKind::Google => "google",
            ProviderKind::Groq => "groq",
            ProviderKind::OpenAiCompatible { .. } => "openai_compatible",
        };
        format!("{}/{}", kind, self.model)
    }
}
