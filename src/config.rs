//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every section carries defaults, so a missing file or a partial one
//! still yields a runnable configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub backtest: BacktestConfig,
    pub scan: ScanConfig,
    pub scoring: ScoringConfig,
    pub lifecycle: LifecycleConfig,
    pub jobs: JobsConfig,
    pub signal: SignalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineConfig {
    /// SQLite file holding the bridge performance cache.
    pub cache_path: String,
    /// JSON file holding the draw history, oldest first.
    pub history_path: String,
    /// Seconds between history refresh checks in the main loop.
    pub refresh_interval_secs: u64,
    /// Ranked candidates shown per scoring pass.
    pub top_results: usize,
    /// Emit logs as JSON instead of human-readable lines.
    pub log_json: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_path: "bridge_cache.db".into(),
            history_path: "draws.json".into(),
            refresh_interval_secs: 600,
            top_results: 10,
            log_json: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BacktestConfig {
    /// Minimum history rows before a backtest is meaningful.
    pub min_rows: usize,
    /// Evaluate only the trailing `window` draws; 0 replays everything.
    pub window: usize,
    /// Trailing day-pair window for the recent-form win count.
    pub recent_window: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            window: 0,
            recent_window: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScanConfig {
    /// Largest touch offset the discovery scan enumerates.
    pub max_touch_offset: u8,
    /// How many top performers per family a scan reports.
    pub top_n: usize,
    /// Floor on the next-day win rate for a scan hit, in percent.
    pub min_win_rate: f64,
    /// How deep into the position table the set-bridge scan reads.
    pub set_position_limit: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_touch_offset: 4,
            top_n: 20,
            min_win_rate: 50.0,
            set_position_limit: 50,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScoringConfig {
    /// Attack contribution per point of signed streak.
    pub streak_multiplier: f64,
    /// Divisor scaling each contributor's win-rate percent into attack.
    pub winrate_divisor: f64,
    /// Divisor scaling memory-bridge confidence into attack.
    pub memory_divisor: f64,
    /// Lose streaks at or beyond this depth start the risk penalty.
    pub risk_start_threshold: i64,
    /// Flat penalty per contributing bridge whose lose streak qualifies.
    pub k2n_penalty: f64,
    /// Weight of the external probability signal in the bonus term.
    pub ai_score_weight: f64,
    /// Ceiling of the frequency bonus; scaled by count over window max.
    pub freq_bonus_max: f64,
    /// Recent-form win counts that earn a bonus, with their bonuses.
    pub form_tier1_wins: i64,
    pub form_tier1_bonus: f64,
    pub form_tier2_wins: i64,
    pub form_tier2_bonus: f64,
    pub form_tier3_wins: i64,
    pub form_tier3_bonus: f64,
    /// Trailing days for the frequency count.
    pub stats_days: usize,
    /// Absence up to this many days costs nothing.
    pub gan_free_days: u32,
    /// Band edges and penalties for longer absences.
    pub gan_band1_end: u32,
    pub gan_band1_penalty: f64,
    pub gan_band2_end: u32,
    pub gan_band2_penalty: f64,
    pub gan_band3_penalty: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            streak_multiplier: 0.25,
            winrate_divisor: 20.0,
            memory_divisor: 10.0,
            risk_start_threshold: 6,
            k2n_penalty: 1.0,
            ai_score_weight: 0.2,
            freq_bonus_max: 1.0,
            form_tier1_wins: 5,
            form_tier1_bonus: 0.5,
            form_tier2_wins: 7,
            form_tier2_bonus: 1.0,
            form_tier3_wins: 9,
            form_tier3_bonus: 1.5,
            stats_days: 7,
            gan_free_days: 10,
            gan_band1_end: 15,
            gan_band1_penalty: 0.5,
            gan_band2_end: 25,
            gan_band2_penalty: 1.0,
            gan_band3_penalty: 2.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Lô bridges join the active roster at this win rate (percent).
    pub lo_add_threshold: f64,
    /// Lô bridges leave below this. The gap is the hysteresis band.
    pub lo_remove_threshold: f64,
    /// Đề thresholds sit higher: the special tail is one value a day.
    pub de_add_threshold: f64,
    pub de_remove_threshold: f64,
    /// Unpinned bridges whose worst lose streak passes this are disabled.
    pub prune_max_lose_streak: i64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            lo_add_threshold: 50.0,
            lo_remove_threshold: 40.0,
            de_add_threshold: 60.0,
            de_remove_threshold: 50.0,
            prune_max_lose_streak: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct JobsConfig {
    /// Concurrent re-evaluation jobs allowed in flight.
    pub max_concurrent: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self { max_concurrent: 4 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SignalConfig {
    /// Whether the external probability signal is consulted at all.
    pub enabled: bool,
    /// JSON file of per-pair probabilities, refreshed out of band.
    pub probabilities_path: String,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            probabilities_path: "ai_probabilities.json".into(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Load from a TOML file, falling back to defaults when it is absent.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            info!(%path, "config file not found, using defaults");
            Ok(Self::default())
        }
    }
}
