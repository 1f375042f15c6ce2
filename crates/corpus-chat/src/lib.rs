pub mod chat;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod processing;
pub mod rag;
pub mod session;
pub mod storage;
pub mod templates;
pub mod types;

// Re-export primary types for convenience
pub use chat::engine::{ChatEngine, ChatOutcome};
pub use config::RagConfig;
pub use error::{ChatError, ProviderAttempt};
pub use ingest::{IngestReceipt, Ingestor, UploadedFile};
pub use llm::gateway::LlmGateway;
pub use session::{Session, SessionStore};
pub use storage::vector_index::VectorIndex;
pub use types::{
    Chunk, ConversationTurn, Document, DocumentKind, RetrievedChunk, TurnRole,
};
