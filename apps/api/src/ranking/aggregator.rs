//! Orders evaluations and assigns dense ranks.

use std::cmp::Ordering;

use crate::models::evaluation::{EvaluationRecord, RankedResult};

/// Sorts by match percentage descending and numbers the result 1..=n.
///
/// The sort is stable: equal scores keep upload order, and each record still
/// gets its own rank (no shared ranks, no gaps).
pub fn rank_records(mut records: Vec<EvaluationRecord>) -> Vec<RankedResult> {
    records.sort_by(|a, b| {
        b.match_percentage
            .partial_cmp(&a.match_percentage)
            .unwrap_or(Ordering::Equal)
    });
    records
        .into_iter()
        .enumerate()
        .map(|(idx, record)| RankedResult {
            rank: idx as u32 + 1,
            record,
        })
        .collect()
}
