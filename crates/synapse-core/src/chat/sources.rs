//! Source assembly for the chat response: chunk hits and graph references
//! both collapse into one [`SourceReference`] list, deduplicated and sorted
//! by score.

use std::collections::HashMap;

use crate::hashing;
use crate::types::{GraphReference, Hit, SourceReference};

/// Projects chunk hits to the lightweight response shape, preferring the
/// rerank score when one was assigned.
pub fn hits_to_source_references(hits: &[Hit]) -> Vec<SourceReference> {
    hits.iter()
        .map(|hit| SourceReference {
            document_id: hit.document.id.to_string(),
            title: hit.document.title.clone(),
            filename: Some(hit.document.filename.clone()).filter(|f| !f.is_empty()),
            chunk_index: hit.chunk_index,
            score: hit.rerank_score.unwrap_or(hit.score),
        })
        .collect()
}

/// Converts graph library references to the same shape. A reference
/// missing `reference_id` falls back to a stable id synthesized from its
/// `file_path`, then its `content`, matching the original's
/// `reference_id → md5(file_path) → md5(content)` fallback chain (here
/// using [`hashing::synthetic_id`] rather than introducing `md5`; see
/// DESIGN.md open question (a) on the resulting collision behavior).
pub fn graph_references_to_source_references(refs: &[GraphReference]) -> Vec<SourceReference> {
    refs.iter()
        .map(|reference| {
            let file_path = reference.file_path.as_deref().unwrap_or("");
            let filename = file_path.rsplit('/').next().filter(|s| !s.is_empty()).map(str::to_string);

            let document_id = match &reference.reference_id {
                Some(id) if !id.is_empty() => id.clone(),
                _ if !file_path.is_empty() => hashing::synthetic_id(file_path),
                _ => hashing::synthetic_id(reference.content.as_deref().unwrap_or("")),
            };

            SourceReference {
                title: filename.clone().unwrap_or_else(|| "Knowledge Graph".to_string()),
                filename,
                document_id,
                // Graph references carry no chunk, so there is nothing to index into.
                chunk_index: 0,
                score: 1.0,
            }
        })
        .collect()
}

/// Merges chunk-sourced and graph-sourced references. Chunk sources are
/// keyed first by `(document_id, chunk_index)`; a graph source sharing a
/// filename with an already-seen source is folded into that entry instead
/// of appended as a new one. Whichever side wins a collision keeps the
/// higher score. Result is sorted by score descending.
pub fn deduplicate_sources(chunk_sources: Vec<SourceReference>, graph_sources: Vec<SourceReference>) -> Vec<SourceReference> {
    let mut seen: HashMap<(String, i32), SourceReference> = HashMap::new();
    let mut order: Vec<(String, i32)> = Vec::new();

    for source in chunk_sources {
        let key = (source.document_id.clone(), source.chunk_index);
        upsert_by_score(&mut seen, &mut order, key, source);
    }

    for source in graph_sources {
        let matched_key = source.filename.as_ref().and_then(|filename| {
            order
                .iter()
                .find(|key| seen.get(*key).and_then(|e| e.filename.as_ref()) == Some(filename))
                .cloned()
        });

        let key = matched_key.unwrap_or_else(|| (source.document_id.clone(), source.chunk_index));
        upsert_by_score(&mut seen, &mut order, key, source);
    }

    let mut deduplicated: Vec<SourceReference> = order.into_iter().filter_map(|key| seen.remove(&key)).collect();
    deduplicated.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    deduplicated
}

fn upsert_by_score(
    seen: &mut HashMap<(String, i32), SourceReference>,
    order: &mut Vec<(String, i32)>,
    key: (String, i32),
    source: SourceReference,
) {
    match seen.get(&key) {
        Some(existing) if existing.score >= source.score => {}
        Some(_) => {
            seen.insert(key, source);
        }
        None => {
            order.push(key.clone());
            seen.insert(key, source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentInfo;
    use std::collections::HashMap as StdHashMap;
    use uuid::Uuid;

    fn sample_hit(score: f32) -> Hit {
        Hit {
            chunk_id: Uuid::new_v4(),
            content: "content".to_string(),
            chunk_index: 0,
            score,
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

    #[test]
    fn graph_reference_without_any_id_falls_back_to_a_content_hash() {
        let refs = vec![GraphReference {
            reference_id: None,
            file_path: None,
            content: Some("entity summary".to_string()),
        }];
        let out = graph_references_to_source_references(&refs);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "Knowledge Graph");
        assert_eq!(out[0].document_id, hashing::synthetic_id("entity summary"));
    }

    #[test]
    fn graph_reference_prefers_the_explicit_reference_id() {
        let refs = vec![GraphReference {
            reference_id: Some("entity-42".to_string()),
            file_path: Some("/docs/report.pdf".to_string()),
            content: None,
        }];
        let out = graph_references_to_source_references(&refs);
        assert_eq!(out[0].document_id, "entity-42");
        assert_eq!(out[0].filename.as_deref(), Some("report.pdf"));
    }

    #[test]
    fn dedup_keeps_the_higher_scoring_duplicate_by_document_and_chunk() {
        let hit = sample_hit(0.5);
        let mut low = hits_to_source_references(std::slice::from_ref(&hit));
        low[0].score = 0.4;
        let mut high = low.clone();
        high[0].score = 0.9;

        let out = deduplicate_sources(low, high);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].score, 0.9);
    }

    #[test]
    fn dedup_folds_a_graph_source_sharing_a_filename_into_the_chunk_source() {
        let hit = sample_hit(0.6);
        let chunk_sources = hits_to_source_references(std::slice::from_ref(&hit));

        let graph_sources = vec![SourceReference {
            document_id: hashing::synthetic_id("graph-entity"),
            title: "doc.pdf".to_string(),
            filename: Some("doc.pdf".to_string()),
            chunk_index: 0,
            score: 0.95,
        }];

        let out = deduplicate_sources(chunk_sources, graph_sources);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].score, 0.95);
    }

    #[test]
    fn dedup_sorts_by_score_descending() {
        let a = SourceReference {
            document_id: "a".to_string(),
            title: "A".to_string(),
            filename: None,
            chunk_index: 0,
            score: 0.2,
        };
        let b = SourceReference {
            document_id: "b".to_string(),
            title: "B".to_string(),
            filename: None,
            chunk_index: 0,
            score: 0.8,
        };
        let out = deduplicate_sources(vec![a, b], Vec::new());
        assert_eq!(out[0].document_id, "b");
        assert_eq!(out[1].document_id, "a");
    }
}
