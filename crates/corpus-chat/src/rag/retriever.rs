//! Diversity-aware retrieval against a session's index.

use std::sync::Arc;

use crate::config::SearchConfig;
use crate::embeddings::EmbeddingModel;
use crate::error::ChatError;
use crate::session::Session;
use crate::types::RetrievedChunk;

pub struct Retriever {
    embedder: Arc<dyn EmbeddingModel>,
    config: SearchConfig,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingModel>, config: SearchConfig) -> Self {
        Self { embedder, config }
    }

    /// Embed `query` and search the session's index with the default
    /// diversity weight. The query embedder must be the same model the index
    /// was built with; an empty index yields an empty result, not an error.
    pub async fn retrieve(
        &self,
        session: &Session,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, ChatError> {
        let index = session.index();
        if self.embedder.model_id() != index.model_id() {
            return Err(ChatError::EmbeddingMismatch {
                indexed: index.model_id().to_string(),
                query: self.embedder.model_id().to_string(),
            });
        }

        if index.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_query(query).await?;
        let results = index.search(&query_vector, k, self.config.diversity_weight);
        tracing::debug!(
            session_id = %session.id(),
            k,
            retrieved = results.len(),
            "Retrieval complete"
        );
        Ok(results)
    }

    pub fn default_k(&self) -> usize {
        self.config.default_k
    }
}
