//! Sentence-window context expansion.
//!
//! Widens each hit's visible content to its neighboring chunks so the
//! generator sees surrounding sentences instead of an isolated fragment,
//! without paying for a second round of vector search.

mod error;
#[cfg(test)]
mod tests;

pub use error::ContextError;

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ContextConfig;
use crate::persistence::ChunkStore;
use crate::types::{ContextWindow, DocumentId, Hit};

pub struct ContextExpander<C: ChunkStore> {
    chunks: Arc<C>,
    config: ContextConfig,
}

impl<C: ChunkStore> ContextExpander<C> {
    pub fn new(chunks: Arc<C>, config: ContextConfig) -> Self {
        Self { chunks, config }
    }

    /// Expands every hit's `expanded_content`/`context_window` in place,
    /// deduping hits whose windows overlap. Hits are processed highest
    /// score first so an overlap always yields to the stronger hit.
    #[tracing::instrument(skip(self, hits))]
    pub async fn expand(&self, mut hits: Vec<Hit>) -> Result<Vec<Hit>, ContextError> {
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let mut by_document: HashMap<DocumentId, Vec<(i32, i32)>> = HashMap::new();
        for hit in &hits {
            let start = (hit.chunk_index - self.config.window_before).max(0);
            let end = hit.chunk_index + self.config.window_after;
            let range = by_document.entry(hit.document.id).or_default();
            range.push((start, end));
        }

        let mut fetched: HashMap<DocumentId, Vec<crate::types::Chunk>> = HashMap::new();
        for (document_id, ranges) in &by_document {
            let start = ranges.iter().map(|(s, _)| *s).min().unwrap_or(0);
            let end = ranges.iter().map(|(_, e)| *e).max().unwrap_or(0);
            let window = self.chunks.get_window(*document_id, start, end).await?;
            fetched.insert(*document_id, window);
        }

        let mut covered: HashMap<DocumentId, Vec<(i32, i32)>> = HashMap::new();
        let mut out = Vec::with_capacity(hits.len());

        for mut hit in hits {
            let document_chunks = fetched.get(&hit.document.id).cloned().unwrap_or_default();
            let max_fetched_index = document_chunks.iter().map(|c| c.chunk_index).max();

            let start = (hit.chunk_index - self.config.window_before).max(0);
            let mut end = hit.chunk_index + self.config.window_after;
            if let Some(max_index) = max_fetched_index {
                end = end.min(max_index);
            }

            let already_covered = covered.entry(hit.document.id).or_default();
            if already_covered
                .iter()
                .any(|(cov_start, cov_end)| start <= *cov_end && end >= *cov_start)
            {
                // A higher-scoring hit already covers this range; drop this one.
                continue;
            }
            already_covered.push((start, end));

            let mut window_chunks: Vec<_> = document_chunks
                .iter()
                .filter(|c| c.chunk_index >= start && c.chunk_index <= end)
                .collect();
            window_chunks.sort_by_key(|c| c.chunk_index);

            if !window_chunks.is_empty() {
                hit.expanded_content = Some(
                    window_chunks
                        .iter()
                        .map(|c| c.content.as_str())
                        .collect::<Vec<_>>()
                        .join("\n\n"),
                );
                hit.context_window = Some(ContextWindow {
                    original_index: hit.chunk_index,
                    start_index: start,
                    end_index: end,
                    chunks_merged: window_chunks.len(),
                });
            }

            out.push(hit);
        }

        Ok(out)
    }
}
