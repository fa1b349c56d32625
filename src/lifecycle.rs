//! Bridge lifecycle management.
//!
//! Win rates crossing the add threshold enable a bridge; falling under
//! the remove threshold disables it; the band between the two retains
//! the current state so a rate wobbling inside it never flaps the
//! roster. Đề bridges answer to higher thresholds than lô. A worst-case
//! two-period lose streak past the prune ceiling disables a bridge
//! outright. Pins are operator overrides: a pinned bridge is never
//! disabled or pruned automatically.

use crate::bridge::{BridgeDefinition, Target};
use crate::cache::PerformanceCache;
use crate::config::LifecycleConfig;
use crate::error::EngineResult;
use crate::types::BridgeMetrics;
use tracing::{info, warn};

/// What lifecycle wants done with one bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Enable,
    Disable,
    /// Disable for a lose streak past the ceiling, not for win rate.
    Prune,
    Retain,
}

/// Summary of one lifecycle sweep over the cache.
#[derive(Debug, Default)]
pub struct LifecycleReport {
    pub enabled: Vec<String>,
    pub disabled: Vec<String>,
    pub pruned: Vec<String>,
    pub retained: usize,
    /// Names that no longer parse; left untouched.
    pub unparseable: Vec<String>,
}

pub struct LifecycleManager {
    config: LifecycleConfig,
}

impl LifecycleManager {
    pub fn new(config: LifecycleConfig) -> Self {
        Self { config }
    }

    /// Pure decision for one bridge.
    pub fn decide(&self, metrics: &BridgeMetrics, target: Target) -> LifecycleAction {
        if !metrics.is_pinned && metrics.max_lose_streak_k2n > self.config.prune_max_lose_streak {
            return if metrics.is_enabled {
                LifecycleAction::Prune
            } else {
                LifecycleAction::Retain
            };
        }

        let (add, remove) = match target {
            Target::Lo => (self.config.lo_add_threshold, self.config.lo_remove_threshold),
            Target::De => (self.config.de_add_threshold, self.config.de_remove_threshold),
        };
        let rate = metrics.win_rate_percent().unwrap_or(0.0);

        if !metrics.is_enabled && rate >= add {
            LifecycleAction::Enable
        } else if metrics.is_enabled && !metrics.is_pinned && rate < remove {
            LifecycleAction::Disable
        } else {
            LifecycleAction::Retain
        }
    }

    /// Sweep every cached bridge and apply the decisions.
    pub fn apply(&self, cache: &PerformanceCache) -> EngineResult<LifecycleReport> {
        let mut report = LifecycleReport::default();
        for metrics in cache.all()? {
            let def = match BridgeDefinition::parse(&metrics.name) {
                Ok(def) => def,
                Err(e) => {
                    warn!(bridge = %metrics.name, error = %e, "lifecycle skipping unparseable bridge");
                    report.unparseable.push(metrics.name);
                    continue;
                }
            };
            match self.decide(&metrics, def.target()) {
                LifecycleAction::Enable => {
                    cache.set_enabled(&metrics.name, true)?;
                    info!(bridge = %metrics.name, rate = %metrics.win_rate_text, "bridge enabled");
                    report.enabled.push(metrics.name);
                }
                LifecycleAction::Disable => {
                    cache.set_enabled(&metrics.name, false)?;
                    info!(bridge = %metrics.name, rate = %metrics.win_rate_text, "bridge disabled");
                    report.disabled.push(metrics.name);
                }
                LifecycleAction::Prune => {
                    cache.set_enabled(&metrics.name, false)?;
                    info!(
                        bridge = %metrics.name,
                        max_lose_k2n = metrics.max_lose_streak_k2n,
                        "bridge pruned for lose streak"
                    );
                    report.pruned.push(metrics.name);
                }
                LifecycleAction::Retain => report.retained += 1,
            }
        }
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
