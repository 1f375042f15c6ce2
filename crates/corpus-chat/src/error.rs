//! Error taxonomy for the chat engine.
//!
//! Every public operation returns one of these kinds so callers can map
//! failures to client vs. server errors without string matching.

use thiserror::Error;

/// Outcome of one provider attempt inside the gateway, kept for diagnostics
/// when every configured provider fails.
#[derive(Debug, Clone)]
pub struct ProviderAttempt {
    pub provider: String,
    pub reason: String,
    /// Timeouts and rate limits are transient; auth and request errors are not.
    pub transient: bool,
}

#[derive(Debug, Error)]
pub enum ChatError {
    /// Rejected before any core state was touched (empty question,
    /// unsupported file kind, oversize file).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No session registered under the given identifier.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Chunking or embedding failed while creating a session; nothing was
    /// registered.
    #[error("ingestion failed: {0}")]
    Ingestion(String),

    /// An embedding call failed outside of ingestion (e.g. query embedding).
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The query embedder does not match the model the index was built with.
    #[error("embedding model mismatch: index built with '{indexed}', query embedder is '{query}'")]
    EmbeddingMismatch { indexed: String, query: String },

    /// Every configured LLM provider failed for this call.
    #[error("generation failed after {} provider attempt(s): {}", attempts.len(), format_attempts(attempts))]
    Generation { attempts: Vec<ProviderAttempt> },
}

fn format_attempts(attempts: &[ProviderAttempt]) -> String {
    attempts
        .iter()
        .map(|a| format!("{}: {}", a.provider, a.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_error_lists_every_attempt() {
        let err = ChatError::Generation {
            attempts: vec![
                ProviderAttempt {
                    provider: "google/gemini-2.0-flash".into(),
                    reason: "HTTP 429".into(),
                    transient: true,
                },
                ProviderAttempt {
                    provider: "groq/gpt-oss-20b".into(),
                    reason: "connect timeout".into(),
                    transient: true,
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("2 provider attempt(s)"));
        assert!(msg.contains("google/gemini-2.0-flash: HTTP 429"));
        assert!(msg.contains("groq/gpt-oss-20b: connect timeout"));
    }

    #[test]
    fn mismatch_error_names_both_models() {
        let err = ChatError::EmbeddingMismatch {
            indexed: "text-embedding-004".into(),
            query: "other-model".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("text-embedding-004"));
        assert!(msg.contains("other-model"));
    }
}
