//! Media extraction and follow-up question generation.

mod error;
#[cfg(test)]
mod tests;

pub use error::FollowUpError;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::llm::{LlmClient, LlmMessage};
use crate::types::{FollowUpQuestion, Hit, MediaItem, MediaType};

const TIMEOUT: Duration = Duration::from_secs(8);
const MAX_QUESTIONS: usize = 3;
const MAX_MEDIA_IN_PROMPT: usize = 5;
const MAX_SOURCES_IN_SUMMARY: usize = 5;

const FOLLOWUP_PROMPT: &str = "Based on the conversation below, generate 2-3 relevant follow-up questions the user might want to ask next.\n\n\
USER QUESTION:\n{query}\n\nASSISTANT RESPONSE:\n{response}\n\nAVAILABLE CONTEXT TOPICS:\n{context_summary}\n\n{media_section}\n\n\
Generate follow-up questions that dig deeper into topics mentioned in the response, explore related information available \
in the context, clarify or expand on key points, and if media (images/tables) exist, ask about them.\n\n\
Output ONLY valid JSON (no markdown, no explanation):\n\
{{\"questions\": [{{\"question\": \"...\", \"relevance\": \"Brief reason why this is relevant\"}}]}}";

#[derive(Debug, Deserialize)]
struct FollowUpResponse {
    #[serde(default)]
    questions: Vec<RawQuestion>,
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    question: String,
    #[serde(default = "default_relevance")]
    relevance: String,
}

fn default_relevance() -> String {
    "Related to the topic".to_string()
}

pub struct FollowUpService {
    llm: Arc<dyn LlmClient>,
}

impl FollowUpService {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Extracts image/table/figure references from `sources` using four
    /// independent heuristics: an `image_count`/`images` metadata entry, a
    /// markdown-table shape in the content, a "figure"/"fig." substring, and
    /// a `chunk_metadata.has_image` flag. Deduplicates by
    /// `(type, document_id, description)`.
    pub fn extract_media(&self, sources: &[Hit]) -> Vec<MediaItem> {
        let mut items = Vec::new();

        for source in sources {
            let doc_id = source.document.id;
            let doc_title = if !source.document.title.is_empty() {
                source.document.title.clone()
            } else {
                source.document.filename.clone()
            };

            if let Some(images) = source.metadata.get("images").and_then(|v| v.as_array()) {
                let has_images = source
                    .metadata
                    .get("image_count")
                    .and_then(|v| v.as_i64())
                    .map(|n| n > 0)
                    .unwrap_or(false);
                if has_images {
                    for img in images {
                        items.push(MediaItem {
                            media_type: MediaType::Image,
                            source_document_id: doc_id,
                            source_document_title: doc_title.clone(),
                            description: img
                                .get("caption")
                                .or_else(|| img.get("description"))
                                .and_then(|v| v.as_str())
                                .map(|s| s.to_string()),
                            page_number: img.get("page_number").and_then(|v| v.as_i64()),
                            url: img.get("url").and_then(|v| v.as_str()).map(|s| s.to_string()),
                            content_preview: img.get("extracted_text").and_then(|v| v.as_str()).map(|s| s.to_string()),
                        });
                    }
                }
            }

            if source.content.contains('|') && source.content.contains("---") {
                let table_lines: Vec<&str> = source
                    .content
                    .lines()
                    .filter(|l| l.trim_start().starts_with('|'))
                    .collect();
                if table_lines.len() >= 2 {
                    let preview = table_lines.iter().take(4).copied().collect::<Vec<_>>().join("\n");
                    let preview = if preview.len() > 200 {
                        format!("{}...", &preview[..200])
                    } else {
                        preview
                    };
                    items.push(MediaItem {
                        media_type: MediaType::Table,
                        source_document_id: doc_id,
                        source_document_title: doc_title.clone(),
                        description: Some("Data table from document".to_string()),
                        page_number: None,
                        url: None,
                        content_preview: Some(preview),
                    });
                }
            }

            let lower = source.content.to_lowercase();
            if lower.contains("figure") || lower.contains("fig.") {
                items.push(MediaItem {
                    media_type: MediaType::Figure,
                    source_document_id: doc_id,
                    source_document_title: doc_title.clone(),
                    description: Some("Figure referenced in document".to_string()),
                    page_number: None,
                    url: None,
                    content_preview: None,
                });
            }

            if source.chunk_metadata.get("has_image").and_then(|v| v.as_bool()).unwrap_or(false) {
                items.push(MediaItem {
                    media_type: MediaType::Image,
                    source_document_id: doc_id,
                    source_document_title: doc_title.clone(),
                    description: source
                        .chunk_metadata
                        .get("image_description")
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string()),
                    page_number: None,
                    url: None,
                    content_preview: None,
                });
            }
        }

        let mut seen = HashSet::new();
        items.retain(|item| {
            let key = (item.media_type, item.source_document_id, item.description.clone().unwrap_or_default());
            seen.insert(key)
        });
        items
    }

    fn build_context_summary(sources: &[Hit]) -> String {
        if sources.is_empty() {
            return "No additional context available".to_string();
        }
        sources
            .iter()
            .take(MAX_SOURCES_IN_SUMMARY)
            .enumerate()
            .map(|(i, source)| {
                let doc_name = if !source.document.title.is_empty() {
                    &source.document.title
                } else {
                    &source.document.filename
                };
                let preview: String = source.content.replace('\n', " ").chars().take(100).collect();
                format!("{}. {}: {}...", i + 1, doc_name, preview)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn build_media_section(media_items: &[MediaItem]) -> String {
        if media_items.is_empty() {
            return String::new();
        }
        let mut lines = vec!["MEDIA IN SOURCES:".to_string()];
        for item in media_items.iter().take(MAX_MEDIA_IN_PROMPT) {
            lines.push(format!(
                "- {:?}: {} (from {})",
                item.media_type,
                item.description.as_deref().unwrap_or("No description"),
                item.source_document_title
            ));
        }
        lines.join("\n")
    }

    /// Generates up to 3 follow-up questions. Returns an empty list (never
    /// an error) on a timeout or any generation failure — follow-ups are a
    /// nice-to-have, not worth failing the response over.
    #[tracing::instrument(skip(self, sources, media_items))]
    pub async fn generate_follow_ups(
        &self,
        query: &str,
        response: &str,
        sources: &[Hit],
        media_items: Option<Vec<MediaItem>>,
    ) -> Vec<FollowUpQuestion> {
        let media_items = media_items.unwrap_or_else(|| self.extract_media(sources));
        let context_summary = Self::build_context_summary(sources);
        let media_section = Self::build_media_section(&media_items);
        let truncated_response: String = response.chars().take(1500).collect();

        let prompt = FOLLOWUP_PROMPT
            .replace("{query}", query)
            .replace("{response}", &truncated_response)
            .replace("{context_summary}", &context_summary)
            .replace("{media_section}", &media_section);

        let call = self.llm.complete(vec![LlmMessage::user(prompt)]);
        let Ok(Ok(text)) = tokio::time::timeout(TIMEOUT, call).await else {
            return Vec::new();
        };

        let Ok(parsed) = serde_json::from_str::<FollowUpResponse>(&text) else {
            return Vec::new();
        };

        parsed
            .questions
            .into_iter()
            .take(MAX_QUESTIONS)
            .map(|q| FollowUpQuestion { question: q.question, relevance: q.relevance })
            .collect()
    }
}
