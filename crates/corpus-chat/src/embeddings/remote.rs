//! Remote embedding client.
//!
//! Calls a hosted embedding API over HTTP. Query embeddings go through a
//! small LRU cache since chat turns often repeat or lightly rephrase queries.

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::num::NonZeroUsize;
use std::time::Duration;

use crate::config::{resolve_api_key, EmbeddingSettings};
use crate::error::ChatError;

use super::EmbeddingModel;

/// Which wire protocol the embedding endpoint speaks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    /// Google Generative Language `embedContent` API.
    #[default]
    Google,
    /// Any `/v1/embeddings`-shaped endpoint (OpenAI, Together, local servers).
    OpenAiCompatible { endpoint: String },
}

pub struct RemoteEmbeddings {
    backend: EmbeddingBackend,
    model: String,
    dimension: usize,
    api_key: String,
    client: Client,
    query_cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl RemoteEmbeddings {
    pub fn from_settings(settings: &EmbeddingSettings) -> anyhow::Result<Self> {
        let api_key = resolve_api_key(&settings.api_key_env).ok_or_else(|| {
            anyhow::anyhow!(
                "Missing API key: set {} (or an API_KEYS JSON bundle)",
                settings.api_key_env
            )
        })?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        let cache_size =
            NonZeroUsize::new(settings.cache_size).unwrap_or(NonZeroUsize::MIN);

        tracing::info!(
            model = %settings.model,
            dimension = settings.dimension,
            "Creating remote embedding client"
        );

        Ok(Self {
            backend: settings.backend.clone(),
            model: settings.model.clone(),
            dimension: settings.dimension,
            api_key,
            client,
            query_cache: Mutex::new(LruCache::new(cache_size)),
        })
    }

    async fn parse_json_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        endpoint: &str,
    ) -> Result<T, ChatError> {
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ChatError::Embedding(format!("Failed to read response from {}: {}", endpoint, e))
        })?;

        if !status.is_success() {
            let preview: String = body.chars().take(300).collect();
            return Err(ChatError::Embedding(format!(
                "{} returned HTTP {}: {}",
                endpoint, status, preview
            )));
        }

        // Gateways sometimes return HTML error pages with a 200 status.
        let trimmed = body.trim_start();
        if trimmed.starts_with('<') {
            let preview: String = trimmed.chars().take(200).collect();
            return Err(ChatError::Embedding(format!(
                "{} returned HTML instead of JSON: {}",
                endpoint, preview
            )));
        }

        serde_json::from_str::<T>(&body).map_err(|e| {
            ChatError::Embedding(format!("Failed to parse JSON from {}: {}", endpoint, e))
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ChatError> {
        match &self.backend {
            EmbeddingBackend::Google => self.google_batch(texts).await,
            EmbeddingBackend::OpenAiCompatible { endpoint } => {
                self.openai_batch(endpoint, texts).await
            }
        }
    }

    async fn google_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ChatError> {
        #[derive(Deserialize)]
        struct BatchResponse {
            embeddings: Vec<Values>,
        }
        #[derive(Deserialize)]
        struct Values {
            values: Vec<f32>,
        }

        let endpoint = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:batchEmbedContents",
            self.model
        );
        let requests: Vec<_> = texts
            .iter()
            .map(|text| {
                json!({
                    "model": format!("models/{}", self.model),
                    "content": { "parts": [{ "text": text }] },
                })
            })
            .collect();

        let response = self
            .client
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({ "requests": requests }))
            .send()
            .await
            .map_err(|e| ChatError::Embedding(format!("Request to {} failed: {}", endpoint, e)))?;

        let parsed: BatchResponse = Self::parse_json_response(response, &endpoint).await?;
        if parsed.embeddings.len() != texts.len() {
            return Err(ChatError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }
        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }

    async fn openai_batch(
        &self,
        endpoint: &str,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, ChatError> {
        #[derive(Deserialize)]
        struct EmbeddingsResponse {
            data: Vec<EmbeddingObject>,
        }
        #[derive(Deserialize)]
        struct EmbeddingObject {
            index: usize,
            embedding: Vec<f32>,
        }

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({ "model": self.model, "input": texts }))
            .send()
            .await
            .map_err(|e| ChatError::Embedding(format!("Request to {} failed: {}", endpoint, e)))?;

        let mut parsed: EmbeddingsResponse = Self::parse_json_response(response, endpoint).await?;
        if parsed.data.len() != texts.len() {
            return Err(ChatError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }
        parsed.data.sort_by_key(|o| o.index);
        Ok(parsed.data.into_iter().map(|o| o.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingModel for RemoteEmbeddings {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ChatError> {
        if let Some(hit) = self.query_cache.lock().get(text).cloned() {
            return Ok(hit);
        }
        let vector = self
            .embed_batch(std::slice::from_ref(&text.to_string()))
            .await?
            .pop()
            .ok_or_else(|| ChatError::Embedding("Empty embedding response".into()))?;
        self.query_cache.lock().put(text.to_string(), vector.clone());
        Ok(vector)
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ChatError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        // Hosted APIs cap batch sizes; 100 is safe for both backends. The
        // batches are independent requests, so they run concurrently.
        let batches = futures::future::try_join_all(
            texts.chunks(100).map(|window| self.embed_batch(window)),
        )
        .await?;
        Ok(batches.into_iter().flatten().collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
