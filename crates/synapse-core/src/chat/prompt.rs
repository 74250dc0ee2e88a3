//! Prompt assembly: context block construction from sources and the graph
//! narrative, preset-selected system prompt, and the `previous_context`
//! block carried on follow-up turns.

use crate::config::{GenerationPreset, preset_table};
use crate::llm::LlmMessage;
use crate::types::{ChatMessage, Hit, MessageRole};

const RAG_SYSTEM_PREAMBLE: &str = "You are a retrieval-augmented assistant. Answer strictly from the \
provided context; if the context does not cover the question, say so rather than guessing. Cite \
sources inline as [1], [2], etc.";

/// Joins the knowledge-graph narrative (if the response was graph-enhanced)
/// and the numbered document excerpts into one context block.
pub fn build_context(sources: &[Hit], graph_context: Option<&str>) -> String {
    let mut parts = Vec::new();

    if let Some(graph_context) = graph_context {
        parts.push(format!("KNOWLEDGE GRAPH CONTEXT:\n{graph_context}\n---"));
    }

    if !sources.is_empty() {
        let chunks: Vec<String> = sources
            .iter()
            .enumerate()
            .map(|(i, source)| {
                let content = source.expanded_content.as_deref().unwrap_or(&source.content);
                let doc_name = if !source.document.title.is_empty() {
                    &source.document.title
                } else {
                    &source.document.filename
                };
                format!("[{}] {}\n    Source: {}", i + 1, content, doc_name)
            })
            .collect();
        parts.push(format!("DOCUMENT EXCERPTS:\n{}", chunks.join("\n\n")));
    }

    parts.join("\n\n")
}

/// Builds the preset-selected system prompt with `context` folded in. Used
/// only when the caller did not supply a raw system prompt override — when
/// they did, the override stands alone and `context` instead rides in the
/// first user message (see [`build_messages`]).
pub fn build_system_prompt(preset: GenerationPreset, context: &str, custom_instruction: Option<&str>, previous_context: Option<&str>) -> String {
    let resolved = preset_table(preset);
    let mut prompt = format!("{RAG_SYSTEM_PREAMBLE}\n\n{}\n\nCONTEXT:\n{context}", resolved.template);

    if let Some(previous_context) = previous_context {
        prompt.push_str(&format!("\n\nPREVIOUS EXCHANGE:\n{previous_context}"));
    }
    if let Some(custom_instruction) = custom_instruction {
        prompt.push_str(&format!("\n\nADDITIONAL INSTRUCTION:\n{custom_instruction}"));
    }

    prompt
}

const MAX_HISTORY_MESSAGES: usize = 10;

/// Builds the LLM message list: the system prompt, the last
/// [`MAX_HISTORY_MESSAGES`] turns of history, then the current user
/// message. `context_for_message` is only non-empty when the caller
/// overrode the system prompt — the preset-built prompt already carries
/// the context, so folding it into the user message too would duplicate it.
pub fn build_messages(history: &[ChatMessage], user_message: &str, context_for_message: &str, system_prompt: &str) -> Vec<LlmMessage> {
    let mut messages = vec![LlmMessage::system(system_prompt)];

    let start = history.len().saturating_sub(MAX_HISTORY_MESSAGES);
    for msg in &history[start..] {
        match msg.role {
            MessageRole::User => messages.push(LlmMessage::user(msg.content.clone())),
            MessageRole::Assistant => messages.push(LlmMessage::assistant(msg.content.clone())),
            MessageRole::System => {}
        }
    }

    let content = if context_for_message.is_empty() {
        user_message.to_string()
    } else {
        format!("CONTEXT FROM KNOWLEDGE BASE:\n{context_for_message}\n\n---\n\nUSER QUESTION: {user_message}")
    };
    messages.push(LlmMessage::user(content));
    messages
}

const MAX_PREVIOUS_EXCHANGES: usize = 4;
const MAX_PREVIOUS_MESSAGE_CHARS: usize = 1000;

/// Serializes the last [`MAX_PREVIOUS_EXCHANGES`] history messages into the
/// `previous_context` block for a follow-up turn, truncating each to
/// roughly 1000 characters.
pub fn extract_previous_context(history: &[ChatMessage]) -> Option<String> {
    if history.is_empty() {
        return None;
    }
    let start = history.len().saturating_sub(MAX_PREVIOUS_EXCHANGES);
    let parts: Vec<String> = history[start..]
        .iter()
        .map(|msg| {
            let role_label = match msg.role {
                MessageRole::User => "User",
                MessageRole::Assistant => "Assistant",
                MessageRole::System => "System",
            };
            format!("{role_label}: {}", truncate_chars(&msg.content, MAX_PREVIOUS_MESSAGE_CHARS))
        })
        .collect();
    Some(parts.join("\n\n"))
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let truncated: String = s.chars().take(max).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

/// Word-count token estimate, the fallback path the original
/// `tiktoken`-backed counter uses when no encoder is available
/// (`len(text.split()) * 4 // 3`). No tokenizer dependency is pulled in
/// purely for usage reporting, which does not need to be exact.
pub fn estimate_tokens(text: &str) -> u32 {
    let words = text.split_whitespace().count();
    ((words * 4) / 3) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentInfo;
    use std::collections::HashMap as StdHashMap;
    use uuid::Uuid;

    fn sample_hit(content: &str) -> Hit {
        Hit {
            chunk_id: Uuid::new_v4(),
            content: content.to_string(),
            chunk_index: 0,
            score: 0.9,
            rerank_score: None,
            metadata: StdHashMap::new(),
            chunk_metadata: StdHashMap::new(),
            document: DocumentInfo {
                id: Uuid::new_v4(),
                title: "Doc".to_string(),
                filename: "doc.pdf".to_string(),
            },
            collection_id: Uuid::new_v4(),
            expanded_content: None,
            context_window: None,
        }
    }

    fn sample_message(session_id: Uuid, role: MessageRole, content: &str) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            session_id,
            role,
            content: content.to_string(),
            chunk_ids: Vec::new(),
            metadata: StdHashMap::new(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn build_context_includes_graph_narrative_before_document_excerpts() {
        let sources = vec![sample_hit("revenue grew 12%")];
        let context = build_context(&sources, Some("Acme is a subsidiary of Globex"));
        let graph_pos = context.find("KNOWLEDGE GRAPH CONTEXT").unwrap();
        let doc_pos = context.find("DOCUMENT EXCERPTS").unwrap();
        assert!(graph_pos < doc_pos);
        assert!(context.contains("revenue grew 12%"));
    }

    #[test]
    fn build_context_is_empty_with_no_sources_or_graph_context() {
        assert_eq!(build_context(&[], None), "");
    }

    #[test]
    fn build_messages_caps_history_at_the_configured_window() {
        let session_id = Uuid::new_v4();
        let history: Vec<ChatMessage> = (0..20)
            .map(|i| sample_message(session_id, MessageRole::User, &format!("turn {i}")))
            .collect();
        let messages = build_messages(&history, "current question", "", "system prompt");
        // system + 10 history + current user message
        assert_eq!(messages.len(), 12);
    }

    #[test]
    fn build_messages_folds_context_into_the_user_turn_only_when_provided() {
        let messages = build_messages(&[], "what changed?", "some context", "system prompt");
        let user_turn = messages.last().unwrap();
        assert!(user_turn.content.contains("CONTEXT FROM KNOWLEDGE BASE"));
        assert!(user_turn.content.contains("what changed?"));
    }

    #[test]
    fn extract_previous_context_truncates_long_messages() {
        let session_id = Uuid::new_v4();
        let long_content = "x".repeat(2000);
        let history = vec![sample_message(session_id, MessageRole::Assistant, &long_content)];
        let context = extract_previous_context(&history).unwrap();
        assert!(context.ends_with("..."));
        assert!(context.len() < 1100);
    }

    #[test]
    fn estimate_tokens_scales_with_word_count() {
        assert_eq!(estimate_tokens(""), 0);
        assert!(estimate_tokens("one two three four") > 0);
    }
}
