//! Prompt templates and deterministic prompt assembly.

use crate::types::{ConversationTurn, RetrievedChunk, TurnRole};

/// Fixed system instruction for grounded question answering.
pub const RAG_SYSTEM_PROMPT: &str = "You are an assistant answering questions about the user's uploaded documents. \
Use only the retrieved context below to answer. If the context does not contain \
the answer, say that you don't know rather than guessing. Keep answers concise.";

/// Answer returned when retrieval finds nothing to ground on. Stated
/// explicitly rather than failing the turn.
pub const NO_CONTEXT_ANSWER: &str =
    "No relevant content was found in the uploaded documents for this question.";

fn role_label(role: TurnRole) -> &'static str {
    match role {
        TurnRole::User => "User",
        TurnRole::Assistant => "Assistant",
    }
}

/// Format the most recent `window` turns, oldest first.
pub fn format_history(history: &[ConversationTurn], window: usize) -> String {
    let start = history.len().saturating_sub(window);
    history[start..]
        .iter()
        .map(|turn| format!("{}: {}", role_label(turn.role), turn.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Deterministically assemble the answering prompt: system instruction,
/// retrieved chunks in rank order (each tagged with its source), a bounded
/// history window, then the question.
pub fn assemble_prompt(
    chunks: &[RetrievedChunk],
    history: &[ConversationTurn],
    history_window: usize,
    question: &str,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(RAG_SYSTEM_PROMPT);
    prompt.push_str("\n\nContext:\n");

    for retrieved in chunks {
        prompt.push_str(&format!(
            "[source: {} | chunk {}]\n{}\n\n",
            retrieved.chunk.source, retrieved.chunk.index, retrieved.chunk.text
        ));
    }

    if !history.is_empty() {
        prompt.push_str("Conversation so far:\n");
        prompt.push_str(&format_history(history, history_window));
        prompt.push_str("\n\n");
    }

    prompt.push_str("Question: ");
    prompt.push_str(question);
    prompt.push_str("\nAnswer:");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chunk;
    use uuid::Uuid;

    fn retrieved(text: &str, source: &str, index: usize) -> RetrievedChunk {
        RetrievedChunk {
            chunk: Chunk {
                doc_id: Uuid::new_v4(),
                index,
                text: text.into(),
                source: source.into(),
            },
            score: 0.9,
            rank: index,
        }
    }

    fn turn(role: TurnRole, text: &str, seq: u64) -> ConversationTurn {
        ConversationTurn {
            role,
            text: text.into(),
            seq,
        }
    }

    #[test]
    fn prompt_tags_chunks_with_sources_in_order() {
        let chunks = vec![
            retrieved("first passage", "report.pdf", 0),
            retrieved("second passage", "notes.txt", 3),
        ];
        let prompt = assemble_prompt(&chunks, &[], 10, "what happened?");

        let first = prompt.find("[source: report.pdf | chunk 0]").unwrap();
        let second = prompt.find("[source: notes.txt | chunk 3]").unwrap();
        assert!(first < second);
        assert!(prompt.starts_with(RAG_SYSTEM_PROMPT));
        assert!(prompt.trim_end().ends_with("Answer:"));
        assert!(prompt.contains("Question: what happened?"));
    }

    #[test]
    fn history_window_is_bounded_to_most_recent_turns() {
        let history: Vec<ConversationTurn> = (0..6)
            .map(|i| {
                let role = if i % 2 == 0 {
                    TurnRole::User
                } else {
                    TurnRole::Assistant
                };
                turn(role, &format!("turn {}", i), i as u64)
            })
            .collect();

        let formatted = format_history(&history, 2);
        assert!(!formatted.contains("turn 3"));
        assert!(formatted.contains("turn 4"));
        assert!(formatted.contains("turn 5"));
    }

    #[test]
    fn assembly_is_deterministic() {
        let chunks = vec![retrieved("passage", "a.txt", 0)];
        let history = vec![turn(TurnRole::User, "hi", 0)];
        let a = assemble_prompt(&chunks, &history, 5, "q");
        let b = assemble_prompt(&chunks, &history, 5, "q");
        assert_eq!(a, b);
    }
}
