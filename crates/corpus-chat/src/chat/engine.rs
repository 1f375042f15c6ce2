//! Conversational orchestration.
//!
//! One chat turn runs the fixed sequence: validate, reformulate, retrieve,
//! assemble, generate, record history. History is only touched after a
//! successful answer, so a failed turn leaves the session exactly as it was.

use std::sync::Arc;

use crate::config::{ChatConfig, SearchConfig};
use crate::embeddings::EmbeddingModel;
use crate::error::ChatError;
use crate::llm::LlmGateway;
use crate::rag::{QueryRewriter, Retriever};
use crate::session::SessionStore;
use crate::templates::{assemble_prompt, NO_CONTEXT_ANSWER};
use crate::types::RetrievedChunk;

/// The result of one completed chat turn.
#[derive(Debug)]
pub struct ChatOutcome {
    pub answer: String,
    /// The standalone query actually used for retrieval.
    pub reformulated_query: String,
    /// Retrieved chunks in rank order, for traceability.
    pub sources: Vec<RetrievedChunk>,
}

pub struct ChatEngine {
    store: Arc<SessionStore>,
    gateway: Arc<LlmGateway>,
    rewriter: QueryRewriter,
    retriever: Retriever,
    config: ChatConfig,
}

impl ChatEngine {
    pub fn new(
        store: Arc<SessionStore>,
        embedder: Arc<dyn EmbeddingModel>,
        gateway: Arc<LlmGateway>,
        search: SearchConfig,
        config: ChatConfig,
    ) -> Self {
        let rewriter = QueryRewriter::new(config.history_window);
        let retriever = Retriever::new(embedder, search);
        Self {
            store,
            gateway,
            rewriter,
            retriever,
            config,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Run one chat turn against the given session.
    pub async fn chat(&self, session_id: &str, message: &str) -> Result<ChatOutcome, ChatError> {
        let question = message.trim();
        if question.is_empty() {
            return Err(ChatError::InvalidInput("question must not be empty".into()));
        }

        let session = self.store.get(session_id)?;

        // Serializes turns on this session; held on every exit path below.
        let _turn = session.turn_lock().lock().await;
        session.touch();

        let history = session.history();
        let reformulated = self
            .rewriter
            .reformulate(question, &history, &self.gateway)
            .await?;

        let sources = self
            .retriever
            .retrieve(&session, &reformulated, self.retriever.default_k())
            .await?;

        let answer = if sources.is_empty() {
            // Empty or fresh index: answer explicitly rather than failing,
            // and skip the generation call entirely.
            tracing::info!(session_id = %session.id(), "No grounding content retrieved");
            NO_CONTEXT_ANSWER.to_string()
        } else {
            let prompt = assemble_prompt(
                &sources,
                &history,
                self.config.history_window,
                &reformulated,
            );
            self.gateway.generate(&prompt).await?
        };

        // Mutation is the last step; nothing above has touched history.
        session.record_turn(question, &answer);
        tracing::info!(
            session_id = %session.id(),
            sources = sources.len(),
            "Chat turn recorded"
        );

        Ok(ChatOutcome {
            answer,
            reformulated_query: reformulated,
            sources,
        })
    }
}
