//! Upload intake: validate files, extract text, open a session over them.

use std::sync::Arc;

use crate::config::UploadLimits;
use crate::error::ChatError;
use crate::processing::DocumentParser;
use crate::session::SessionStore;
use crate::types::{Document, DocumentKind};

/// A file as received from the caller, before any validation.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            data,
        }
    }
}

/// What a completed ingestion produced.
#[derive(Debug, Clone)]
pub struct IngestReceipt {
    pub session_id: String,
    pub documents: usize,
    pub chunks: usize,
}

pub struct Ingestor {
    store: Arc<SessionStore>,
    parser: DocumentParser,
    limits: UploadLimits,
}

impl Ingestor {
    pub fn new(store: Arc<SessionStore>, limits: UploadLimits) -> Self {
        Self {
            store,
            parser: DocumentParser::new(),
            limits,
        }
    }

    /// Validate and extract every file, then create one session indexing them
    /// all. Validation runs before any session state is touched, so a bad
    /// file in the batch leaves no partial session behind.
    pub async fn ingest(&self, files: Vec<UploadedFile>) -> Result<IngestReceipt, ChatError> {
        if files.is_empty() {
            return Err(ChatError::InvalidInput(
                "at least one file is required".into(),
            ));
        }

        let mut documents = Vec::with_capacity(files.len());
        for file in &files {
            let kind = DocumentKind::from_filename(&file.filename).ok_or_else(|| {
                ChatError::InvalidInput(format!(
                    "unsupported file type: {}",
                    file.filename
                ))
            })?;

            if file.data.len() > self.limits.max_file_bytes {
                return Err(ChatError::InvalidInput(format!(
                    "{} exceeds the {} byte upload limit",
                    file.filename, self.limits.max_file_bytes
                )));
            }

            let text = self
                .parser
                .parse(kind, &file.data)
                .map_err(|e| ChatError::Ingestion(format!("{}: {}", file.filename, e)))?;

            documents.push(Document::new(&file.filename, kind, text));
        }

        if documents.iter().all(|d| d.text.trim().is_empty()) {
            return Err(ChatError::Ingestion(
                "no usable text could be extracted from the uploaded files".into(),
            ));
        }

        let document_count = documents.len();
        let session_id = self.store.create(documents).await?;
        let chunks = self.store.get(&session_id)?.index().len();

        tracing::info!(
            session_id = %session_id,
            documents = document_count,
            chunks,
            "Ingestion complete"
        );
        Ok(IngestReceipt {
            session_id,
            documents: document_count,
            chunks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChunkingConfig, SessionConfig};
    use crate::embeddings::mock::MockEmbedder;

    fn ingestor(max_file_bytes: usize) -> Ingestor {
        let store = Arc::new(SessionStore::new(
            Arc::new(MockEmbedder::new()),
            &ChunkingConfig {
                chunk_size: 20,
                overlap_fraction: 0.0,
            },
            SessionConfig {
                idle_ttl_secs: 60,
                sweep_interval_secs: 60,
            },
        ));
        Ingestor::new(store, UploadLimits { max_file_bytes })
    }

    fn txt(name: &str, body: &str) -> UploadedFile {
        UploadedFile::new(name, body.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn ingests_text_files_into_a_fresh_session() {
        let ingestor = ingestor(1024);
        let receipt = ingestor
            .ingest(vec![
                txt("notes.txt", "first file with enough text to chunk"),
                txt("more.md", "second file, markdown this time"),
            ])
            .await
            .unwrap();

        assert!(receipt.session_id.starts_with("session_"));
        assert_eq!(receipt.documents, 2);
        assert!(receipt.chunks >= 2);

        let session = ingestor.store.get(&receipt.session_id).unwrap();
        assert_eq!(session.documents().len(), 2);
        assert_eq!(session.index().len(), receipt.chunks);
    }

    #[tokio::test]
    async fn rejects_an_empty_batch() {
        let result = ingestor(1024).ingest(Vec::new()).await;
        assert!(matches!(result, Err(ChatError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn rejects_unsupported_extensions_without_creating_a_session() {
        let ingestor = ingestor(1024);
        let result = ingestor
            .ingest(vec![
                txt("fine.txt", "some text"),
                txt("slides.pptx", "not supported"),
            ])
            .await;

        assert!(matches!(result, Err(ChatError::InvalidInput(_))));
        assert!(ingestor.store.is_empty());
    }

    #[tokio::test]
    async fn rejects_oversized_files() {
        let ingestor = ingestor(8);
        let result = ingestor
            .ingest(vec![txt("big.txt", "well over eight bytes of text")])
            .await;
        assert!(matches!(result, Err(ChatError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn fails_when_no_file_yields_text() {
        let ingestor = ingestor(1024);
        let result = ingestor
            .ingest(vec![txt("blank.txt", "   \n\t  ")])
            .await;
        assert!(matches!(result, Err(ChatError::Ingestion(_))));
        assert!(ingestor.store.is_empty());
    }

    #[tokio::test]
    async fn one_blank_file_among_real_ones_is_tolerated() {
        let ingestor = ingestor(1024);
        let receipt = ingestor
            .ingest(vec![
                txt("blank.txt", ""),
                txt("real.txt", "actual content worth indexing"),
            ])
            .await
            .unwrap();
        assert_eq!(receipt.documents, 2);
        assert!(receipt.chunks >= 1);
    }

    #[tokio::test]
    async fn unparseable_pdf_reports_the_filename() {
        let ingestor = ingestor(1024);
        let result = ingestor
            .ingest(vec![UploadedFile::new(
                "broken.pdf",
                vec![0xde, 0xad, 0xbe, 0xef],
            )])
            .await;

        match result {
            Err(ChatError::Ingestion(msg)) => assert!(msg.contains("broken.pdf")),
            other => panic!("expected ingestion error, got {:?}", other.map(|r| r.session_id)),
        }
    }
}
