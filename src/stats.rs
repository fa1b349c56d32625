//! Frequency and absence statistics over the draw history.
//!
//! Scoring wants two numbers per candidate: how often it landed inside
//! the trailing stats window (frequency) and how many consecutive days
//! it has now been absent (gan). Both are computed fresh from the
//! borrowed history on every scoring pass.

use crate::bridge::Prediction;
use crate::types::DrawRecord;

/// Frequency and dry-streak numbers for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CandidateStats {
    /// Days inside the window on which the candidate landed.
    pub frequency: u32,
    /// Consecutive most-recent days without a hit. A candidate that
    /// never appears in the history counts every day as absent.
    pub gan_days: u32,
}

/// Compute both statistics for a candidate.
///
/// Frequency looks at the trailing `stats_days` records only; the gan
/// count walks backwards through the whole slice until the last hit.
pub fn candidate_stats(
    history: &[DrawRecord],
    stats_days: usize,
    prediction: &Prediction,
) -> CandidateStats {
    let window_start = history.len().saturating_sub(stats_days);
    let frequency = history[window_start..]
        .iter()
        .filter(|day| prediction.hit(day))
        .count() as u32;

    let gan_days = history
        .iter()
        .rev()
        .take_while(|day| !prediction.hit(day))
        .count() as u32;

    CandidateStats { frequency, gan_days }
}

/// Highest frequency across a set of candidates, the normalizer for
/// the frequency bonus. At least 1 so the ratio stays defined.
pub fn max_frequency<'a>(stats: impl IntoIterator<Item = &'a CandidateStats>) -> u32 {
    stats.into_iter().map(|s| s.frequency).max().unwrap_or(0).max(1)
}
