//! Multi-query fusion.
//!
//! Each search phrase produces its own nearest-neighbor list. The lists are merged
//! by keeping, per candidate id, the best score seen in any list (max-fusion), so a
//! profile that strongly matches a single aspect of the request still surfaces.
//!
//! Ordering is deterministic: score descending, and equal scores keep the order in
//! which ids were first discovered (phrase order, then rank within the phrase).

use std::cmp::Ordering;
use std::collections::HashMap;

use super::{clamp_score, ScoredCandidate};

/// Candidates requested per phrase so deduplication does not starve the final top-k.
pub fn overfetch(top_k: usize) -> usize {
    top_k.saturating_mul(2)
}

/// Fuse per-phrase result lists into one ranked list of at most `top_k` unique ids.
pub fn fuse<I>(result_sets: I, top_k: usize) -> Vec<ScoredCandidate>
where
    I: IntoIterator<Item = Vec<ScoredCandidate>>,
{
    let mut fused: Vec<ScoredCandidate> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for hits in result_sets {
        for hit in hits {
            let score = clamp_score(hit.score);
            match positions.get(&hit.id) {
                Some(&pos) => {
                    if score > fused[pos].score {
                        fused[pos].score = score;
                    }
                }
                None => {
                    positions.insert(hit.id.clone(), fused.len());
                    fused.push(ScoredCandidate { id: hit.id, score });
                }
            }
        }
    }

    // Stable sort keeps discovery order among equal scores
    fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    fused.truncate(top_k);
    fused
}
