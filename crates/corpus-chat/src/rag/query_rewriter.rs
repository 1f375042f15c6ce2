//! Query reformulation.
//!
//! Follow-up questions lean on prior turns ("what about section 2?"), which
//! makes them poor retrieval queries on their own. The rewriter turns them
//! into standalone questions using the conversation history.

use crate::error::ChatError;
use crate::llm::LlmGateway;
use crate::templates::format_history;
use crate::types::ConversationTurn;

pub struct QueryRewriter {
    history_window: usize,
}

impl QueryRewriter {
    pub fn new(history_window: usize) -> Self {
        Self { history_window }
    }

    fn build_prompt(&self, question: &str, history: &[ConversationTurn]) -> String {
        format!(
            "Given a chat history and the latest user question which might reference \
context in the chat history, formulate a standalone question that can be \
understood without the chat history. Do NOT answer the question; only rewrite \
it if needed, otherwise return it as is. Respond with the question alone.\n\n\
Chat history:\n{}\n\nLatest question: {}\n\nStandalone question:",
            format_history(history, self.history_window),
            question
        )
    }

    /// Rewrite `question` into a standalone retrieval query. With no prior
    /// turns there is nothing to resolve, so the question passes through
    /// without an LLM call.
    pub async fn reformulate(
        &self,
        question: &str,
        history: &[ConversationTurn],
        gateway: &LlmGateway,
    ) -> Result<String, ChatError> {
        if history.is_empty() {
            return Ok(question.to_string());
        }

        let prompt = self.build_prompt(question, history);
        let rewritten = gateway.generate(&prompt).await?;
        let rewritten = rewritten.trim();

        if rewritten.is_empty() {
            tracing::warn!("Reformulation returned empty text; using the raw question");
            return Ok(question.to_string());
        }

        tracing::debug!(
            original = %question,
            rewritten = %rewritten,
            "Reformulated follow-up question"
        );
        Ok(rewritten.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::{FailingProvider, StaticProvider};
    use crate::llm::GenerationConfig;
    use crate::types::TurnRole;
    use std::sync::Arc;

    fn turn(role: TurnRole, text: &str, seq: u64) -> ConversationTurn {
        ConversationTurn {
            role,
            text: text.into(),
            seq,
        }
    }

    fn gateway_with(provider: Arc<StaticProvider>) -> LlmGateway {
        struct Shared(Arc<StaticProvider>);

        #[async_trait::async_trait]
        impl crate::llm::LlmProvider for Shared {
            async fn generate(
                &self,
                prompt: &str,
                config: &GenerationConfig,
            ) -> Result<String, crate::llm::ProviderError> {
                self.0.generate(prompt, config).await
            }
            fn name(&self) -> String {
                self.0.name()
            }
        }

        LlmGateway::new(vec![Box::new(Shared(provider))], GenerationConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn empty_history_passes_question_through_without_llm_call() {
        let provider = Arc::new(StaticProvider::new("mock/rewriter", "should not be used"));
        let gateway = gateway_with(provider.clone());
        let rewriter = QueryRewriter::new(10);

        let query = rewriter
            .reformulate("What is chapter one about?", &[], &gateway)
            .await
            .unwrap();

        assert_eq!(query, "What is chapter one about?");
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn follow_up_is_rewritten_via_gateway() {
        let provider = Arc::new(StaticProvider::new(
            "mock/rewriter",
            "What does section 2 of the report say?",
        ));
        let gateway = gateway_with(provider.clone());
        let rewriter = QueryRewriter::new(10);

        let history = vec![
            turn(TurnRole::User, "Summarize the report.", 0),
            turn(TurnRole::Assistant, "The report covers revenue.", 1),
        ];
        let query = rewriter
            .reformulate("what about section 2?", &history, &gateway)
            .await
            .unwrap();

        assert_eq!(query, "What does section 2 of the report say?");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn gateway_failure_propagates() {
        let gateway = LlmGateway::new(
            vec![Box::new(FailingProvider::new("mock/down", true))],
            GenerationConfig::default(),
        )
        .unwrap();
        let rewriter = QueryRewriter::new(10);

        let history = vec![turn(TurnRole::User, "hello", 0)];
        let result = rewriter.reformulate("and then?", &history, &gateway).await;
        assert!(matches!(result, Err(ChatError::Generation { .. })));
    }
}
