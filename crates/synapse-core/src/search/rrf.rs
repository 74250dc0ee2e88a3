//! Reciprocal Rank Fusion: the ranking key is the summed RRF score across
//! every list a chunk appears in; the *reported* score is the max of that
//! chunk's original scores across those lists, not the RRF sum itself.

use std::collections::HashMap;

use crate::types::Hit;

const DEFAULT_K: u32 = 60;

/// Fuses multiple independently-ranked hit lists into one, ranked by RRF
/// score, each hit's `score` field overwritten with the max of its original
/// scores across the lists it appeared in.
pub fn reciprocal_rank_fusion(lists: &[Vec<Hit>], k: u32) -> Vec<Hit> {
    let mut rrf_scores: HashMap<uuid::Uuid, f64> = HashMap::new();
    let mut best: HashMap<uuid::Uuid, Hit> = HashMap::new();

    for list in lists {
        for (rank, hit) in list.iter().enumerate() {
            let rank = rank as u32 + 1;
            let contribution = 1.0 / (k as f64 + rank as f64);
            *rrf_scores.entry(hit.chunk_id).or_insert(0.0) += contribution;

            best.entry(hit.chunk_id)
                .and_modify(|existing| {
                    if hit.score > existing.score {
                        *existing = hit.clone();
                    }
                })
                .or_insert_with(|| hit.clone());
        }
    }

    let mut fused: Vec<(f64, Hit)> = rrf_scores
        .into_iter()
        .map(|(chunk_id, rrf_score)| {
            // `best` already holds the max-original-score hit for this id;
            // `score` is left as-is, `rrf_score` only drives ranking below.
            let hit = best.remove(&chunk_id).expect("every scored id has a hit");
            (rrf_score, hit)
        })
        .collect();

    fused.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    fused.into_iter().map(|(_, hit)| hit).collect()
}

/// Fuses with the conventional default `k=60`.
pub fn reciprocal_rank_fusion_default(lists: &[Vec<Hit>]) -> Vec<Hit> {
    reciprocal_rank_fusion(lists, DEFAULT_K)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentInfo;
    use std::collections::HashMap as StdHashMap;
    use uuid::Uuid;

    fn hit(id: Uuid, score: f32) -> Hit {
        Hit {
            chunk_id: id,
            content: "c".to_string(),
            chunk_index: 0,
            score,
            rerank_score: None,
            metadata: StdHashMap::new(),
            chunk_metadata: StdHashMap::new(),
            document: DocumentInfo {
                id: Uuid::new_v4(),
                title: "d".to_string(),
                filename: "d.pdf".to_string(),
            },
            collection_id: Uuid::new_v4(),
            expanded_content: None,
            context_window: None,
        }
    }

    #[test]
    fn ranks_by_rrf_but_reports_max_original_score() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        // `a` ranks 2nd in list 1, 1st in list 2 (present in both).
        // `b` ranks 1st in list 1 only.
        let list1 = vec![hit(b, 0.95), hit(a, 0.40)];
        let list2 = vec![hit(a, 0.99)];

        let fused = reciprocal_rank_fusion_default(&[list1, list2]);

        // `a` appears in both lists so its RRF score is higher even though
        // its max original score (0.99) only edges out b's single 0.95.
        assert_eq!(fused[0].chunk_id, a);
        assert_eq!(fused[0].score, 0.99);
        assert_eq!(fused[1].chunk_id, b);
        assert_eq!(fused[1].score, 0.95);
    }
}
