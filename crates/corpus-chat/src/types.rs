use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Document kind derived from the uploaded filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Text,
}

impl DocumentKind {
    /// Map a filename to a supported kind, or `None` when the extension is
    /// not one we ingest.
    pub fn from_filename(name: &str) -> Option<Self> {
        let ext = name.rsplit('.').next()?;
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" | "md" | "markdown" | "text" => Some(Self::Text),
            _ => None,
        }
    }
}

/// One ingested document. Immutable after creation; owned by the session
/// that ingested it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub filename: String,
    pub kind: DocumentKind,
    pub text: String,
}

impl Document {
    pub fn new(filename: impl Into<String>, kind: DocumentKind, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            kind,
            text: text.into(),
        }
    }
}

/// A bounded text span carved from a document for independent retrieval.
/// Derived deterministically from the document text; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub doc_id: Uuid,
    /// Ordinal position within the parent document.
    pub index: usize,
    pub text: String,
    /// Source filename, carried for prompt tagging and traceability.
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One turn of conversation history. Appended only by the orchestrator, in
/// strict chronological order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub text: String,
    pub seq: u64,
}

/// A chunk returned from retrieval, with its similarity score and the rank it
/// held in the plain-similarity ordering before diversity re-ranking.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub score: f32,
    pub rank: usize,
}
