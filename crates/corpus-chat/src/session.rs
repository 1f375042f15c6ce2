//! Session lifecycle: one embedding index and one conversation history per
//! opaque session identifier.
//!
//! Sessions are independent; operations on one never block another. Within a
//! session, chat turns serialize on a per-session lock so the index and
//! history mutate as a unit.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{ChunkingConfig, SessionConfig};
use crate::embeddings::EmbeddingModel;
use crate::error::ChatError;
use crate::processing::TextChunker;
use crate::storage::VectorIndex;
use crate::types::{Chunk, ConversationTurn, Document, TurnRole};

pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    last_access: RwLock<DateTime<Utc>>,
    documents: Vec<Document>,
    index: VectorIndex,
    history: RwLock<Vec<ConversationTurn>>,
    /// Held for the whole of a chat turn; serializes turns on this session.
    turn_lock: tokio::sync::Mutex<()>,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_access(&self) -> DateTime<Utc> {
        *self.last_access.read()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Snapshot of the conversation history. Readers observe either the
    /// pre-turn or post-turn state, never a half-recorded turn.
    pub fn history(&self) -> Vec<ConversationTurn> {
        self.history.read().clone()
    }

    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }

    pub(crate) fn touch(&self) {
        *self.last_access.write() = Utc::now();
    }

    pub(crate) fn turn_lock(&self) -> &tokio::sync::Mutex<()> {
        &self.turn_lock
    }

    /// Append the user and assistant turns of a completed chat turn under a
    /// single write lock.
    pub(crate) fn record_turn(&self, user_text: &str, assistant_text: &str) {
        let mut history = self.history.write();
        let seq = history.len() as u64;
        history.push(ConversationTurn {
            role: TurnRole::User,
            text: user_text.to_string(),
            seq,
        });
        history.push(ConversationTurn {
            role: TurnRole::Assistant,
            text: assistant_text.to_string(),
            seq: seq + 1,
        });
    }

    fn idle_for(&self) -> Duration {
        Utc::now() - self.last_access()
    }
}

pub struct SessionStore {
    sessions: DashMap<String, Arc<Session>>,
    embedder: Arc<dyn EmbeddingModel>,
    chunker: TextChunker,
    config: SessionConfig,
}

impl SessionStore {
    pub fn new(
        embedder: Arc<dyn EmbeddingModel>,
        chunking: &ChunkingConfig,
        config: SessionConfig,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            embedder,
            chunker: TextChunker::new(chunking.chunk_size, chunking.overlap_fraction),
            config,
        }
    }

    /// Chunk and index `documents`, then register a fresh session. Nothing is
    /// registered when chunking or embedding fails. Zero resulting chunks is
    /// allowed; chat on such a session follows the empty-context policy.
    pub async fn create(&self, documents: Vec<Document>) -> Result<String, ChatError> {
        let mut chunks: Vec<Chunk> = Vec::new();
        for doc in &documents {
            for piece in self.chunker.chunk(&doc.text) {
                chunks.push(Chunk {
                    doc_id: doc.id,
                    index: piece.index,
                    text: piece.text,
                    source: doc.filename.clone(),
                });
            }
        }

        let mut index = VectorIndex::new(self.embedder.model_id(), self.embedder.dimension());
        let indexed = index
            .build(chunks, self.embedder.as_ref())
            .await
            .map_err(|e| ChatError::Ingestion(e.to_string()))?;

        let id = generate_session_id();
        let now = Utc::now();
        let session = Arc::new(Session {
            id: id.clone(),
            created_at: now,
            last_access: RwLock::new(now),
            documents,
            index,
            history: RwLock::new(Vec::new()),
            turn_lock: tokio::sync::Mutex::new(()),
        });

        tracing::info!(
            session_id = %id,
            documents = session.documents.len(),
            chunks = indexed,
            "Session created"
        );
        self.sessions.insert(id.clone(), session);
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Result<Arc<Session>, ChatError> {
        self.sessions
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ChatError::SessionNotFound(id.to_string()))
    }

    pub fn touch(&self, id: &str) -> Result<(), ChatError> {
        self.get(id)?.touch();
        Ok(())
    }

    /// Remove a session. Returns whether anything was removed. An in-flight
    /// turn keeps its `Arc` alive until the turn returns.
    pub fn evict(&self, id: &str) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            tracing::info!(session_id = %id, "Session evicted");
        }
        removed
    }

    /// Evict sessions idle beyond the configured TTL. A session whose turn
    /// lock is held has a turn in flight and is deferred to a later sweep.
    pub fn sweep_idle(&self) -> usize {
        let ttl = Duration::seconds(self.config.idle_ttl_secs as i64);
        let mut expired = Vec::new();

        for entry in self.sessions.iter() {
            let session = entry.value();
            if session.idle_for() < ttl {
                continue;
            }
            match session.turn_lock().try_lock() {
                Ok(_guard) => expired.push(session.id.clone()),
                Err(_) => {
                    tracing::debug!(
                        session_id = %session.id,
                        "Idle session has a turn in flight; eviction deferred"
                    );
                }
            }
        }

        let mut evicted = 0;
        for id in expired {
            if self.evict(&id) {
                evicted += 1;
            }
        }
        if evicted > 0 {
            tracing::info!(evicted, "Idle sweep complete");
        }
        evicted
    }

    /// Run `sweep_idle` on the configured interval until the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::downgrade(self);
        let period = std::time::Duration::from_secs(self.config.sweep_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match store.upgrade() {
                    Some(store) => {
                        store.sweep_idle();
                    }
                    None => break,
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Opaque session identifier: timestamp plus a short random suffix, readable
/// in logs while still unguessable enough for a single-process deployment.
fn generate_session_id() -> String {
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("session_{}_{}", stamp, &suffix[..8])
}
