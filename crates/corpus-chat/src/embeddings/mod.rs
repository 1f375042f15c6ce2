pub mod remote;

pub use remote::RemoteEmbeddings;

use async_trait::async_trait;

use crate::error::ChatError;

/// Unified embedding model trait. The same implementation must be used at
/// index-build time and query time; `model_id` is compared to enforce that.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Embed a search query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ChatError>;

    /// Batch embed document chunks for ingestion.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ChatError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed_query(text).await?);
        }
        Ok(vectors)
    }

    /// Embedding vector dimension.
    fn dimension(&self) -> usize;

    /// Stable identifier of the embedding model; vectors from different
    /// identifiers never share an index.
    fn model_id(&self) -> &str;
}
