//! Consensus vote aggregation.
//!
//! Each enabled, non-syncing bridge stakes one prediction for the
//! upcoming period. Aggregation folds identical predictions into one
//! candidate, counting votes and collecting contributor names. Keys
//! are already canonical (pairs sorted, touch sets de-duplicated), so
//! two bridges arriving at the same pair from different directions
//! land on the same candidate.

use crate::bridge::{BridgeDefinition, Prediction};
use crate::types::DrawRecord;
use std::collections::BTreeMap;
use tracing::debug;

/// One candidate with its consensus backing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateVotes {
    pub prediction: Prediction,
    pub vote_count: u32,
    /// Contributing bridge names, sorted for determinism.
    pub contributors: Vec<String>,
}

/// Aggregate named predictions into vote-ranked candidates.
///
/// Output is sorted by vote count descending, then candidate key
/// ascending, so equal-vote runs keep a stable order.
pub fn aggregate(entries: impl IntoIterator<Item = (String, Prediction)>) -> Vec<CandidateVotes> {
    let mut by_key: BTreeMap<Prediction, Vec<String>> = BTreeMap::new();
    for (name, prediction) in entries {
        by_key.entry(prediction).or_default().push(name);
    }

    let mut candidates: Vec<CandidateVotes> = by_key
        .into_iter()
        .map(|(prediction, mut contributors)| {
            contributors.sort();
            contributors.dedup();
            CandidateVotes {
                vote_count: contributors.len() as u32,
                prediction,
                contributors,
            }
        })
        .collect();
    candidates.sort_by(|a, b| {
        b.vote_count
            .cmp(&a.vote_count)
            .then_with(|| a.prediction.cmp(&b.prediction))
    });
    debug!(candidates = candidates.len(), "consensus aggregated");
    candidates
}

/// Compute every bridge's upcoming prediction off the latest draw and
/// aggregate. Bridges whose rule cannot read the draw contribute
/// nothing.
pub fn aggregate_from_latest(
    bridges: &[BridgeDefinition],
    latest: &DrawRecord,
) -> Vec<CandidateVotes> {
    aggregate(
        bridges
            .iter()
            .filter_map(|def| def.predict(latest).map(|p| (def.name(), p))),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PairKey;

    fn pair(a: u8, b: u8) -> Prediction {
        Prediction::Pair(PairKey::new(a, b))
    }

    #[test]
    fn test_votes_fold_identical_predictions() {
        let candidates = aggregate([
            ("CLASSIC_1".to_string(), pair(16, 61)),
            ("CLASSIC_2".to_string(), pair(7, 70)),
            ("MEM_SUM_GDB_G1".to_string(), pair(16, 61)),
        ]);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].vote_count, 2);
        assert_eq!(
            candidates[0].contributors,
            vec!["CLASSIC_1".to_string(), "MEM_SUM_GDB_G1".to_string()],
        );
        assert_eq!(candidates[1].vote_count, 1);
    }

    #[test]
    fn test_normalized_keys_collapse_reversed_pairs() {
        let candidates = aggregate([
            ("A".to_string(), pair(30, 1)),
            ("B".to_string(), pair(1, 30)),
        ]);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].vote_count, 2);
    }

    #[test]
    fn test_duplicate_contributor_counts_once() {
        let candidates = aggregate([
            ("A".to_string(), pair(5, 50)),
            ("A".to_string(), pair(5, 50)),
        ]);
        assert_eq!(candidates[0].vote_count, 1);
    }

    #[test]
    fn test_equal_votes_sort_by_key() {
        let candidates = aggregate([
            ("A".to_string(), pair(20, 2)),
            ("B".to_string(), pair(1, 10)),
        ]);
        assert_eq!(candidates[0].prediction, pair(1, 10));
        assert_eq!(candidates[1].prediction, pair(2, 20));
    }

    #[test]
    fn test_aggregate_from_latest_skips_unreadable() {
        let mut latest = DrawRecord::sample(0);
        latest.first = "bad".into();
        let bridges = vec![
            // reads GDB only, still fine
            BridgeDefinition::Position { pos1: 0, pos2: 1 },
            // reads G1, cannot predict
            BridgeDefinition::Position { pos1: 5, pos2: 6 },
        ];
        let candidates = aggregate_from_latest(&bridges, &latest);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].contributors, vec!["LO_POS_GDB[0]_GDB[1]".to_string()]);
    }
}
