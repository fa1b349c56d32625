//! Composite candidate scoring.
//!
//! Each candidate's score is Attack − Defense + Bonus. Attack rewards
//! contributing bridges for streaks and win rates, Defense charges for
//! deep two-period lose streaks and long dry spells, Bonus folds in
//! window frequency, recent form and the external probability signal.
//! Results are recomputed from scratch on every request and never
//! persisted.

use crate::bridge::Prediction;
use crate::config::ScoringConfig;
use crate::consensus::CandidateVotes;
use crate::stats::{max_frequency, CandidateStats};
use crate::types::BridgeMetrics;
use std::collections::HashMap;
use tracing::debug;

/// Final ranked entry for one candidate, with the score taken apart
/// so callers can show where it came from.
#[derive(Debug, Clone)]
pub struct ScoreResult {
    pub candidate: CandidateVotes,
    pub stats: CandidateStats,
    pub ai_probability: Option<f64>,
    pub attack: f64,
    pub defense: f64,
    pub bonus: f64,
    pub score: f64,
}

pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Rank candidates by composite score, descending, ties broken by
    /// candidate key ascending. Contributors without a cache row add
    /// nothing in either direction.
    pub fn score(
        &self,
        candidates: Vec<CandidateVotes>,
        metrics: &HashMap<String, BridgeMetrics>,
        stats: &HashMap<Prediction, CandidateStats>,
        ai: &HashMap<Prediction, f64>,
    ) -> Vec<ScoreResult> {
        let max_freq = max_frequency(stats.values());

        let mut results: Vec<ScoreResult> = candidates
            .into_iter()
            .map(|candidate| {
                let candidate_stats = stats
                    .get(&candidate.prediction)
                    .copied()
                    .unwrap_or_default();
                let ai_probability = ai.get(&candidate.prediction).copied();
                self.score_one(candidate, candidate_stats, ai_probability, metrics, max_freq)
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.candidate.prediction.cmp(&b.candidate.prediction))
        });
        debug!(ranked = results.len(), "scoring pass complete");
        results
    }

    fn score_one(
        &self,
        candidate: CandidateVotes,
        stats: CandidateStats,
        ai_probability: Option<f64>,
        metrics: &HashMap<String, BridgeMetrics>,
        max_freq: u32,
    ) -> ScoreResult {
        let cfg = &self.config;
        let mut attack = 0.0;
        let mut defense = 0.0;
        let mut bonus = 0.0;

        for name in &candidate.contributors {
            let Some(m) = metrics.get(name) else { continue };

            // Losing streaks never subtract here; they are charged
            // through the K2N risk penalty and the gan bands.
            attack += cfg.streak_multiplier * m.current_streak.max(0) as f64;
            if let Some(rate) = m.win_rate_percent() {
                attack += rate / cfg.winrate_divisor;
                if m.kind == "memory" {
                    attack += rate / cfg.memory_divisor;
                }
            }

            // Flat once past the threshold, not scaled by the excess.
            if m.max_lose_streak_k2n >= cfg.risk_start_threshold {
                defense += cfg.k2n_penalty;
            }

            bonus += self.form_bonus(m.recent_win_count);
        }

        defense += self.gan_penalty(stats.gan_days);
        bonus += cfg.freq_bonus_max * stats.frequency as f64 / max_freq as f64;
        if let Some(p) = ai_probability {
            bonus += p * cfg.ai_score_weight;
        }

        let score = attack - defense + bonus;
        ScoreResult {
            candidate,
            stats,
            ai_probability,
            attack,
            defense,
            bonus,
            score,
        }
    }

    fn form_bonus(&self, recent_wins: i64) -> f64 {
        let cfg = &self.config;
        if recent_wins >= cfg.form_tier3_wins {
            cfg.form_tier3_bonus
        } else if recent_wins >= cfg.form_tier2_wins {
            cfg.form_tier2_bonus
        } else if recent_wins >= cfg.form_tier1_wins {
            cfg.form_tier1_bonus
        } else {
            0.0
        }
    }

    fn gan_penalty(&self, gan_days: u32) -> f64 {
        let cfg = &self.config;
        if gan_days <= cfg.gan_free_days {
            0.0
        } else if gan_days <= cfg.gan_band1_end {
            cfg.gan_band1_penalty
        } else if gan_days <= cfg.gan_band2_end {
            cfg.gan_band2_penalty
        } else {
            cfg.gan_band3_penalty
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PairKey;

    fn key(a: u8, b: u8) -> Prediction {
        Prediction::Pair(PairKey::new(a, b))
    }

    fn votes(prediction: Prediction, contributors: &[&str]) -> CandidateVotes {
        CandidateVotes {
            prediction,
            vote_count: contributors.len() as u32,
            contributors: contributors.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn make_metrics(name: &str, streak: i64, wins: u32, total: u32) -> BridgeMetrics {
        BridgeMetrics {
            name: name.to_string(),
            kind: "position".into(),
            pos1_idx: None,
            pos2_idx: None,
            win_rate_text: BridgeMetrics::format_win_rate(wins, total),
            current_streak: streak,
            max_lose_streak_k2n: 0,
            next_prediction: String::new(),
            recent_win_count: 0,
            is_enabled: true,
            is_pinned: false,
            last_evaluated_period: 9,
        }
    }

    fn engine() -> ScoringEngine {
        ScoringEngine::new(ScoringConfig::default())
    }

    #[test]
    fn test_empty_candidates_rank_empty() {
        let results = engine().score(
            Vec::new(),
            &HashMap::new(),
            &HashMap::new(),
            &HashMap::new(),
        );
        assert!(results.is_empty());
    }

    #[test]
    fn test_attack_from_streak_and_win_rate() {
        let metrics = HashMap::from([("A".to_string(), make_metrics("A", 4, 60, 100))]);
        let stats = HashMap::from([(key(1, 10), CandidateStats::default())]);
        let results = engine().score(
            vec![votes(key(1, 10), &["A"])],
            &metrics,
            &stats,
            &HashMap::new(),
        );
        // 0.25*4 + 60/20 = 4.0 attack, frequency bonus 0
        assert!((results[0].attack - 4.0).abs() < 1e-9);
        assert!((results[0].defense - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_memory_bridge_confidence_term() {
        let mut m = make_metrics("M", 0, 50, 100);
        m.kind = "memory".into();
        m.recent_win_count = 5;
        let metrics = HashMap::from([("M".to_string(), m)]);
        let results = engine().score(
            vec![votes(key(1, 10), &["M"])],
            &metrics,
            &HashMap::new(),
            &HashMap::new(),
        );
        // win rate feeds both terms: 50/20 + 50/10 attack, plus the
        // tier-1 form bonus in the bonus term
        assert!((results[0].attack - 7.5).abs() < 1e-9);
        assert!((results[0].bonus - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_losing_streak_never_drags_attack_negative() {
        let metrics = HashMap::from([("L".to_string(), make_metrics("L", -8, 0, 10))]);
        let results = engine().score(
            vec![votes(key(1, 10), &["L"])],
            &metrics,
            &HashMap::new(),
            &HashMap::new(),
        );
        // streak term clamps at zero and the win rate is 0%
        assert!((results[0].attack - 0.0).abs() < 1e-9);
        assert!(results[0].attack >= 0.0);
    }

    #[test]
    fn test_k2n_penalty_is_flat_per_qualifying_bridge() {
        let mut risky = make_metrics("R", 0, 50, 100);
        risky.max_lose_streak_k2n = 9; // well past the threshold of 6
        let mut deeper = make_metrics("D", 0, 50, 100);
        deeper.max_lose_streak_k2n = 30;
        let metrics = HashMap::from([
            ("R".to_string(), risky),
            ("D".to_string(), deeper),
        ]);
        let results = engine().score(
            vec![votes(key(1, 10), &["R", "D"])],
            &metrics,
            &HashMap::new(),
            &HashMap::new(),
        );
        // flat 1.0 each, depth past the threshold changes nothing
        assert!((results[0].defense - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_gan_penalty_bands() {
        let e = engine();
        assert_eq!(e.gan_penalty(10), 0.0);
        assert_eq!(e.gan_penalty(11), 0.5);
        assert_eq!(e.gan_penalty(15), 0.5);
        assert_eq!(e.gan_penalty(16), 1.0);
        assert_eq!(e.gan_penalty(25), 1.0);
        assert_eq!(e.gan_penalty(26), 2.0);
    }

    #[test]
    fn test_form_bonus_tiers() {
        let e = engine();
        assert_eq!(e.form_bonus(4), 0.0);
        assert_eq!(e.form_bonus(5), 0.5);
        assert_eq!(e.form_bonus(7), 1.0);
        assert_eq!(e.form_bonus(9), 1.5);
        assert_eq!(e.form_bonus(10), 1.5);
    }

    #[test]
    fn test_frequency_bonus_normalized_by_window_max() {
        let stats = HashMap::from([
            (key(1, 10), CandidateStats { frequency: 4, gan_days: 0 }),
            (key(2, 20), CandidateStats { frequency: 2, gan_days: 0 }),
        ]);
        let results = engine().score(
            vec![votes(key(1, 10), &[]), votes(key(2, 20), &[])],
            &HashMap::new(),
            &stats,
            &HashMap::new(),
        );
        let top = results.iter().find(|r| r.candidate.prediction == key(1, 10)).unwrap();
        let other = results.iter().find(|r| r.candidate.prediction == key(2, 20)).unwrap();
        assert!((top.bonus - 1.0).abs() < 1e-9);
        assert!((other.bonus - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_ai_term_applied_once_per_candidate() {
        let ai = HashMap::from([(key(1, 10), 0.8)]);
        let results = engine().score(
            vec![votes(key(1, 10), &[])],
            &HashMap::new(),
            &HashMap::new(),
            &ai,
        );
        assert!((results[0].bonus - 0.16).abs() < 1e-9);
        assert_eq!(results[0].ai_probability, Some(0.8));
    }

    #[test]
    fn test_ranking_descending_with_key_tiebreak() {
        let metrics = HashMap::from([("A".to_string(), make_metrics("A", 2, 50, 100))]);
        let results = engine().score(
            vec![
                votes(key(2, 20), &[]),
                votes(key(1, 10), &["A"]),
                votes(key(1, 12), &[]),
            ],
            &metrics,
            &HashMap::new(),
            &HashMap::new(),
        );
        assert_eq!(results[0].candidate.prediction, key(1, 10));
        // the two zero-score candidates tie and order by key
        assert_eq!(results[1].candidate.prediction, key(1, 12));
        assert_eq!(results[2].candidate.prediction, key(2, 20));
    }
}
