//! Rank fusion primitives shared by the retrieval strategies.
//!
//! Three pure operations over [`RankedList`]s:
//!
//! - Reciprocal Rank Fusion (RRF) merges heterogeneous rankings by rank
//!   position alone: `score(d) = Σ 1/(k + rank_i(d))`, `k` defaulting to 60.
//! - Prefetch-then-rerank restricts a precise rescoring to a wide, cheaply
//!   obtained candidate set.
//! - Weighted merge min-max normalizes each input list and sums the
//!   weighted normalized scores.
//!
//! None of these hold state; a [`FusionEngine`] only carries parameters.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{CandidateRecord, RankedList, cmp_score_desc};

/// Default RRF constant.
pub const DEFAULT_RRF_K: u32 = 60;

/// Parameters for rank fusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FusionEngine {
    rrf_k: u32,
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self { rrf_k: DEFAULT_RRF_K }
    }
}

impl FusionEngine {
    /// Create an engine with the default RRF constant.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the RRF constant (higher gives more weight to lower ranks).
    pub fn with_rrf_k(mut self, k: u32) -> Self {
        self.rrf_k = k;
        self
    }

    /// The RRF constant.
    pub fn rrf_k(&self) -> u32 {
        self.rrf_k
    }

    /// Merge ranked lists using Reciprocal Rank Fusion.
    ///
    /// For each record appearing in any list, `rrf_score = Σ 1/(k + rank_i)`
    /// where `rank_i` is the 1-based rank in each list where it appears.
    /// Records appearing in several lists naturally score higher. The payload
    /// is taken from the first list containing the record. Equal fused scores
    /// keep first-appearance order.
    pub fn reciprocal_rank_fusion(&self, lists: &[RankedList], limit: usize) -> RankedList {
        let k = self.rrf_k as f32;
        let mut fused: Vec<CandidateRecord> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for list in lists {
            for (rank, record) in list.iter().enumerate() {
                let rrf_score = 1.0 / (k + (rank + 1) as f32);
                match positions.get(&record.id) {
                    Some(&pos) => fused[pos].score += rrf_score,
                    None => {
                        positions.insert(record.id.clone(), fused.len());
                        fused.push(record.rescored(rrf_score));
                    }
                }
            }
        }

        RankedList::from_records(fused).truncated(limit)
    }

    /// Rerank a prefetch set by a rescoring pass.
    ///
    /// `rescored` is the rescoring function's output over (a subset of) the
    /// prefetch ids, already in its own order. The result:
    ///
    /// - contains only records present in `prefetch`
    /// - carries the rescored score and the prefetch payload
    /// - drops records below `threshold` (scores equal to it are kept)
    /// - follows the rescoring order and is at most `limit` long
    ///
    /// Prefetch records the rescoring did not score are dropped.
    pub fn prefetch_then_rerank(
        &self,
        prefetch: &RankedList,
        rescored: &RankedList,
        limit: usize,
        threshold: Option<f32>,
    ) -> RankedList {
        let reranked = rescored
            .iter()
            .filter_map(|r| {
                let original = prefetch.get(&r.id)?;
                let payload = if original.payload.is_empty() {
                    r.payload.clone()
                } else {
                    original.payload.clone()
                };
                Some(CandidateRecord {
                    id: r.id.clone(),
                    score: r.score,
                    payload,
                })
            })
            .collect();

        RankedList::from_records(reranked)
            .at_least(threshold)
            .truncated(limit)
    }

    /// Combine several ranked lists by weighted sum of min-max normalized
    /// scores.
    ///
    /// Each list is normalized to [0, 1]; a list whose scores are all equal
    /// (including a single-record list) normalizes every record to 1.0. A
    /// record absent from a list contributes nothing for it. Ties on the
    /// combined score go to the higher best individual normalized score,
    /// then to the lexicographically smaller id.
    pub fn weighted_merge(&self, lists: &[(f32, RankedList)], limit: usize) -> RankedList {
        struct Acc {
            record: CandidateRecord,
            combined: f32,
            best: f32,
        }

        let mut acc: HashMap<String, Acc> = HashMap::new();

        for (weight, list) in lists {
            for (record, normalized) in list.iter().zip(min_max_normalize(list)) {
                let entry = acc.entry(record.id.clone()).or_insert_with(|| Acc {
                    record: record.clone(),
                    combined: 0.0,
                    best: f32::NEG_INFINITY,
                });
                entry.combined += weight * normalized;
                entry.best = entry.best.max(normalized);
            }
        }

        let mut merged: Vec<Acc> = acc.into_values().collect();
        merged.sort_by(|a, b| {
            cmp_score_desc(a.combined, b.combined)
                .then_with(|| cmp_score_desc(a.best, b.best))
                .then_with(|| a.record.id.cmp(&b.record.id))
        });

        let records = merged
            .into_iter()
            .map(|a| CandidateRecord {
                score: a.combined,
                ..a.record
            })
            .collect();

        // Already totally ordered; from_records keeps that order for ties.
        RankedList::from_records(records).truncated(limit)
    }
}

/// Min-max normalize a list's scores into [0, 1], in list order.
///
/// All-equal scores (and single-record lists) map to 1.0.
pub fn min_max_normalize(list: &RankedList) -> Vec<f32> {
    let finite = list.iter().map(|r| r.score).filter(|s| s.is_finite());
    let (min, max) = finite.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), s| {
        (lo.min(s), hi.max(s))
    });

    list.iter()
        .map(|r| {
            if !r.score.is_finite() {
                0.0
            } else if max > min {
                (r.score - min) / (max - min)
            } else {
                1.0
            }
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
