//! Bridge discovery scans.
//!
//! A scan backtests an entire bridge family against history and keeps
//! the best performers, so new bridges can be promoted into the cache
//! without anyone naming them by hand. Per-bridge failures are counted
//! and the scan continues; only an unusable history aborts it.

use crate::backtest::Backtester;
use crate::bridge::BridgeDefinition;
use crate::config::{BacktestConfig, ScanConfig};
use crate::error::{EngineError, EngineResult};
use crate::types::DrawRecord;
use std::collections::BTreeMap;
use tracing::info;

/// One bridge that survived the scan filters.
#[derive(Debug, Clone)]
pub struct ScanHit {
    pub def: BridgeDefinition,
    pub win_rate: f64,
    pub wins: u32,
    pub total: u32,
    pub max_lose_streak_k2n: i64,
}

/// Outcome of scanning one family.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub scanned: u32,
    /// Top performers, best win rate first, capped at `top_n`.
    pub hits: Vec<ScanHit>,
    /// De-duplicated failure reasons with counts.
    pub failed: BTreeMap<String, u32>,
}

/// Backtest every definition and keep those at or above the win-rate
/// floor, best first.
pub fn scan(
    defs: impl IntoIterator<Item = BridgeDefinition>,
    history: &[DrawRecord],
    backtest_config: &BacktestConfig,
    scan_config: &ScanConfig,
) -> EngineResult<ScanReport> {
    if history.len() < backtest_config.min_rows {
        return Err(EngineError::InsufficientData {
            required: backtest_config.min_rows,
            available: history.len(),
        });
    }

    let backtester = Backtester::new(backtest_config.clone());
    let mut report = ScanReport::default();

    for def in defs {
        report.scanned += 1;
        match backtester.run(&def, history) {
            Ok(result) => {
                // A perfect score over a couple of days means nothing.
                if result.total_k1n == 0 {
                    continue;
                }
                let win_rate = result.win_rate_k1n();
                if win_rate >= scan_config.min_win_rate {
                    report.hits.push(ScanHit {
                        def,
                        win_rate,
                        wins: result.wins_k1n,
                        total: result.total_k1n,
                        max_lose_streak_k2n: result.max_lose_streak_k2n,
                    });
                }
            }
            Err(e) => {
                *report.failed.entry(e.reason().to_string()).or_insert(0) += 1;
            }
        }
    }

    report.hits.sort_by(|a, b| {
        b.win_rate
            .total_cmp(&a.win_rate)
            .then_with(|| a.def.name().cmp(&b.def.name()))
    });
    report.hits.truncate(scan_config.top_n);

    info!(
        scanned = report.scanned,
        hits = report.hits.len(),
        failed = report.failed.values().sum::<u32>(),
        "discovery scan complete"
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::registry;

    fn history(days: u32) -> Vec<DrawRecord> {
        (0..days).map(DrawRecord::sample).collect()
    }

    #[test]
    fn test_scan_needs_history() {
        let err = scan(
            registry::classic_bridges(),
            &history(1),
            &BacktestConfig::default(),
            &ScanConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.reason(), "insufficient_data");
    }

    #[test]
    fn test_scan_filters_by_win_rate_floor() {
        // identical sample days: every classic bridge predicts the same
        // pair each period, a hit or a miss across the board
        let report = scan(
            registry::classic_bridges(),
            &history(5),
            &BacktestConfig::default(),
            &ScanConfig { min_win_rate: 100.0, ..ScanConfig::default() },
        )
        .unwrap();
        assert_eq!(report.scanned, 15);
        for hit in &report.hits {
            assert!((hit.win_rate - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_scan_caps_and_sorts_hits() {
        let report = scan(
            registry::memory_bridges(),
            &history(6),
            &BacktestConfig::default(),
            &ScanConfig { min_win_rate: 0.0, top_n: 5, ..ScanConfig::default() },
        )
        .unwrap();
        assert_eq!(report.scanned, 702);
        assert!(report.hits.len() <= 5);
        for pair in report.hits.windows(2) {
            assert!(pair[0].win_rate >= pair[1].win_rate);
        }
    }
}
