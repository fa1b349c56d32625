//! Historical bridge backtesting.
//!
//! Replays a bridge over an ordered draw history and measures its
//! performance two ways: strict next-day hits (K1N) and two-period
//! windows (K2N), where a missed prediction stays live for exactly one
//! more day before it counts as a loss. The signed streak, the worst
//! K2N losing run and the trailing-window form feed scoring and
//! lifecycle decisions downstream.

use crate::bridge::{BridgeDefinition, Prediction};
use crate::config::BacktestConfig;
use crate::error::{EngineError, EngineResult};
use crate::types::{BridgeMetrics, DrawRecord};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// K1N and K2N outcome of one valid evaluation day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayOutcome {
    Win,
    Miss,
}

/// Complete performance report for one bridge over one history slice.
#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub name: String,
    /// Day pairs that produced a K1N verdict.
    pub total_k1n: u32,
    pub wins_k1n: u32,
    /// Two-period frames that reached a verdict.
    pub total_k2n: u32,
    pub wins_k2n: u32,
    /// Signed K2N streak: +n after n straight frame wins, -n after
    /// n straight frame losses, 0 with no decided frame.
    pub current_streak: i64,
    pub max_win_streak: i64,
    pub max_lose_streak_k2n: i64,
    /// K1N wins inside the trailing recent-form window.
    pub recent_win_count: u32,
    /// Malformed or unreadable days skipped without a verdict.
    pub skipped_days: u32,
    /// Prediction staked on the first undrawn period.
    pub next_prediction: Option<Prediction>,
    /// Newest period in the evaluated slice; the cache row is valid
    /// only as of this point.
    pub last_evaluated_period: i64,
}

impl BacktestReport {
    pub fn win_rate_k1n(&self) -> f64 {
        if self.total_k1n == 0 {
            0.0
        } else {
            self.wins_k1n as f64 / self.total_k1n as f64 * 100.0
        }
    }

    pub fn win_rate_k2n(&self) -> f64 {
        if self.total_k2n == 0 {
            0.0
        } else {
            self.wins_k2n as f64 / self.total_k2n as f64 * 100.0
        }
    }

    /// Flatten into the row shape the performance cache persists.
    pub fn to_metrics(&self, def: &BridgeDefinition) -> BridgeMetrics {
        let (pos1_idx, pos2_idx) = def.position_indices();
        BridgeMetrics {
            name: self.name.clone(),
            kind: def.kind().to_string(),
            pos1_idx,
            pos2_idx,
            win_rate_text: BridgeMetrics::format_win_rate(self.wins_k1n, self.total_k1n),
            current_streak: self.current_streak,
            max_lose_streak_k2n: self.max_lose_streak_k2n,
            next_prediction: self
                .next_prediction
                .as_ref()
                .map(|p| p.to_string())
                .unwrap_or_default(),
            recent_win_count: self.recent_win_count as i64,
            is_enabled: true,
            is_pinned: false,
            last_evaluated_period: self.last_evaluated_period,
        }
    }
}

// ---------------------------------------------------------------------------
// Backtester
// ---------------------------------------------------------------------------

pub struct Backtester {
    config: BacktestConfig,
}

impl Backtester {
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    /// Run one bridge over a history slice sorted oldest to newest.
    ///
    /// Needs at least `min_rows` draws; below that the whole request is
    /// meaningless and fails with `InsufficientData`. Individual
    /// malformed days inside the slice are skipped and counted, with a
    /// live two-period frame surviving across them.
    pub fn run(
        &self,
        def: &BridgeDefinition,
        history: &[DrawRecord],
    ) -> EngineResult<BacktestReport> {
        if history.len() < self.config.min_rows {
            return Err(EngineError::InsufficientData {
                required: self.config.min_rows,
                available: history.len(),
            });
        }

        let name = def.name();
        let mut report = BacktestReport {
            name: name.clone(),
            total_k1n: 0,
            wins_k1n: 0,
            total_k2n: 0,
            wins_k2n: 0,
            current_streak: 0,
            max_win_streak: 0,
            max_lose_streak_k2n: 0,
            recent_win_count: 0,
            skipped_days: 0,
            next_prediction: None,
            last_evaluated_period: history
                .last()
                .map(|d| d.period as i64)
                .unwrap_or_default(),
        };

        // Prediction made two days ago that missed its first day and is
        // still live for this one.
        let mut open_frame: Option<Prediction> = None;
        // K1N verdicts in order, for the trailing-form window.
        let mut k1n_outcomes: Vec<DayOutcome> = Vec::new();
        let mut last_clean: Option<&DrawRecord> = None;

        for pair in history.windows(2) {
            let (prev, day) = (&pair[0], &pair[1]);

            if let Some(reason) = day.malformed_reason() {
                trace!(bridge = %name, period = day.period, %reason, "skipping malformed day");
                report.skipped_days += 1;
                continue;
            }
            last_clean = Some(day);

            // A live frame closes today, win or lose.
            if let Some(frame) = open_frame.take() {
                if frame.hit(day) {
                    self.frame_win(&mut report);
                } else {
                    self.frame_loss(&mut report);
                }
            }

            let Some(prediction) = def.predict(prev) else {
                report.skipped_days += 1;
                continue;
            };

            if prediction.hit(day) {
                report.total_k1n += 1;
                report.wins_k1n += 1;
                k1n_outcomes.push(DayOutcome::Win);
                self.frame_win(&mut report);
            } else {
                report.total_k1n += 1;
                k1n_outcomes.push(DayOutcome::Miss);
                // One more day before this counts against the bridge.
                open_frame = Some(prediction);
            }
        }

        report.recent_win_count = k1n_outcomes
            .iter()
            .rev()
            .take(self.config.recent_window)
            .filter(|o| **o == DayOutcome::Win)
            .count() as u32;

        report.next_prediction = last_clean
            .or_else(|| history.last().filter(|d| d.malformed_reason().is_none()))
            .and_then(|d| def.predict(d));

        debug!(
            bridge = %name,
            k1n = format_args!("{}/{}", report.wins_k1n, report.total_k1n),
            k2n = format_args!("{}/{}", report.wins_k2n, report.total_k2n),
            streak = report.current_streak,
            max_lose_k2n = report.max_lose_streak_k2n,
            skipped = report.skipped_days,
            "backtest complete"
        );
        Ok(report)
    }

    fn frame_win(&self, report: &mut BacktestReport) {
        report.total_k2n += 1;
        report.wins_k2n += 1;
        report.current_streak = if report.current_streak > 0 {
            report.current_streak + 1
        } else {
            1
        };
        report.max_win_streak = report.max_win_streak.max(report.current_streak);
    }

    fn frame_loss(&self, report: &mut BacktestReport) {
        report.total_k2n += 1;
        report.current_streak = if report.current_streak < 0 {
            report.current_streak - 1
        } else {
            -1
        };
        report.max_lose_streak_k2n = report.max_lose_streak_k2n.max(-report.current_streak);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PairKey;

    /// Bridge under test reads GDB[0] and G1[0] of the previous day:
    /// the sample draw predicts 16-61 every period.
    fn bridge() -> BridgeDefinition {
        BridgeDefinition::Position { pos1: 0, pos2: 5 }
    }

    fn backtester() -> Backtester {
        Backtester::new(BacktestConfig::default())
    }

    /// A day whose loto set avoids 16 and 61.
    fn clean_day(period: u32) -> DrawRecord {
        DrawRecord::sample(period)
    }

    /// A day where the predicted pair lands.
    fn hit_day(period: u32) -> DrawRecord {
        let mut day = DrawRecord::sample(period);
        day.seventh[0] = "16".into();
        day
    }

    #[test]
    fn test_insufficient_history_is_fatal() {
        let err = backtester().run(&bridge(), &[clean_day(0)]).unwrap_err();
        assert_eq!(err.reason(), "insufficient_data");
    }

    #[test]
    fn test_direct_hit_counts_both_ways() {
        let history = vec![clean_day(0), hit_day(1)];
        let report = backtester().run(&bridge(), &history).unwrap();
        assert_eq!((report.wins_k1n, report.total_k1n), (1, 1));
        assert_eq!((report.wins_k2n, report.total_k2n), (1, 1));
        assert_eq!(report.current_streak, 1);
        assert_eq!(report.max_lose_streak_k2n, 0);
    }

    #[test]
    fn test_miss_then_frame_win_saves_the_frame() {
        // Day 1 misses and opens a frame, day 2 lands the carried pair.
        let history = vec![clean_day(0), clean_day(1), hit_day(2)];
        let report = backtester().run(&bridge(), &history).unwrap();
        assert_eq!((report.wins_k1n, report.total_k1n), (1, 2));
        // Frame win plus the day-2 direct win.
        assert_eq!((report.wins_k2n, report.total_k2n), (2, 2));
        assert_eq!(report.current_streak, 2);
        assert_eq!(report.max_lose_streak_k2n, 0);
    }

    #[test]
    fn test_consecutive_frame_losses_build_the_lose_streak() {
        let history = vec![clean_day(0), clean_day(1), clean_day(2), clean_day(3)];
        let report = backtester().run(&bridge(), &history).unwrap();
        assert_eq!((report.wins_k1n, report.total_k1n), (0, 3));
        // Frames from days 1 and 2 closed as losses; day 3's is undecided.
        assert_eq!((report.wins_k2n, report.total_k2n), (0, 2));
        assert_eq!(report.current_streak, -2);
        assert_eq!(report.max_lose_streak_k2n, 2);
    }

    #[test]
    fn test_trailing_frame_stays_undecided() {
        let history = vec![clean_day(0), clean_day(1)];
        let report = backtester().run(&bridge(), &history).unwrap();
        assert_eq!((report.wins_k1n, report.total_k1n), (0, 1));
        assert_eq!(report.total_k2n, 0);
        assert_eq!(report.current_streak, 0);
    }

    #[test]
    fn test_malformed_day_skipped_frame_survives() {
        let mut broken = clean_day(1);
        broken.special = "x".into();
        // Day 1 is unreadable; the day-0 prediction cannot be judged on
        // it, so no frame exists yet and day 2 starts fresh.
        let history = vec![clean_day(0), broken, hit_day(2)];
        let report = backtester().run(&bridge(), &history).unwrap();
        // Day 1 skipped outright; day 2 skipped because day 1 cannot
        // feed a prediction.
        assert_eq!(report.skipped_days, 2);
        assert_eq!(report.total_k1n, 0);
        // Next prediction still reads off the last clean day.
        assert!(report.next_prediction.is_some());
    }

    #[test]
    fn test_next_prediction_comes_from_last_clean_day() {
        let history = vec![clean_day(0), hit_day(1)];
        let report = backtester().run(&bridge(), &history).unwrap();
        assert_eq!(
            report.next_prediction,
            Some(Prediction::Pair(PairKey::new(16, 61))),
        );
    }

    #[test]
    fn test_report_flattens_to_metrics_row() {
        let history = vec![clean_day(0), hit_day(1)];
        let report = backtester().run(&bridge(), &history).unwrap();
        let metrics = report.to_metrics(&bridge());
        assert_eq!(metrics.name, "LO_POS_GDB[0]_G1[0]");
        assert_eq!(metrics.kind, "position");
        assert_eq!(metrics.pos1_idx, Some(0));
        assert_eq!(metrics.win_rate_text, "100.00% (1/1)");
        assert_eq!(metrics.next_prediction, "16-61");
        assert_eq!(metrics.last_evaluated_period, 1);
        assert!(metrics.is_enabled);
    }

    #[test]
    fn test_win_rates() {
        let report = BacktestReport {
            name: "x".into(),
            total_k1n: 70,
            wins_k1n: 40,
            total_k2n: 50,
            wins_k2n: 45,
            current_streak: 0,
            max_win_streak: 0,
            max_lose_streak_k2n: 0,
            recent_win_count: 0,
            skipped_days: 0,
            next_prediction: None,
            last_evaluated_period: 0,
        };
        assert!((report.win_rate_k1n() - 57.142857).abs() < 1e-4);
        assert!((report.win_rate_k2n() - 90.0).abs() < 1e-9);
    }
}
