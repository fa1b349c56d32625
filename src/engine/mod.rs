//! Engine orchestration.
//!
//! Ties the pieces together: recomputing the performance cache off a
//! bounded blocking pool, building consensus over the enabled roster,
//! scoring candidates and sweeping lifecycle. The cache and the
//! in-flight guard are the only shared state; history is borrowed
//! read-only per call.

use crate::backtest::Backtester;
use crate::bridge::{registry, scanner, BridgeDefinition};
use crate::cache::guard::SyncRegistry;
use crate::cache::PerformanceCache;
use crate::config::AppConfig;
use crate::consensus::{self, CandidateVotes};
use crate::error::{EngineError, EngineResult};
use crate::history::DrawHistory;
use crate::lifecycle::{LifecycleManager, LifecycleReport};
use crate::scoring::{ScoreResult, ScoringEngine};
use crate::signal::{self, ProbabilitySignal};
use crate::stats::{candidate_stats, CandidateStats};
use crate::types::{BridgeMetrics, DrawRecord};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Summary of one full cache recompute pass.
#[derive(Debug, Default)]
pub struct RecomputeReport {
    pub processed: u32,
    pub succeeded: u32,
    /// Bridges another job already held; left for it to finish.
    pub skipped_in_flight: u32,
    /// De-duplicated failure reasons with counts.
    pub failed: BTreeMap<String, u32>,
}

impl RecomputeReport {
    fn record_failure(&mut self, reason: &str) {
        *self.failed.entry(reason.to_string()).or_insert(0) += 1;
    }
}

pub struct Engine {
    config: AppConfig,
    cache: Arc<PerformanceCache>,
    guard: SyncRegistry,
    scoring: ScoringEngine,
    lifecycle: LifecycleManager,
    signal: Arc<dyn ProbabilitySignal>,
}

impl Engine {
    pub fn new(config: AppConfig, signal: Arc<dyn ProbabilitySignal>) -> EngineResult<Self> {
        let cache = Arc::new(PerformanceCache::open(&config.engine.cache_path)?);
        Ok(Self::with_cache(config, cache, signal))
    }

    /// Build around an existing cache handle; tests use the in-memory one.
    pub fn with_cache(
        config: AppConfig,
        cache: Arc<PerformanceCache>,
        signal: Arc<dyn ProbabilitySignal>,
    ) -> Self {
        let scoring = ScoringEngine::new(config.scoring.clone());
        let lifecycle = LifecycleManager::new(config.lifecycle.clone());
        Self {
            config,
            cache,
            guard: SyncRegistry::new(),
            scoring,
            lifecycle,
            signal,
        }
    }

    pub fn cache(&self) -> &PerformanceCache {
        &self.cache
    }

    pub fn guard(&self) -> &SyncRegistry {
        &self.guard
    }

    /// The slice every backtest replays: the trailing configured
    /// window, or the whole history when the window is 0.
    fn evaluation_draws<'a>(&self, history: &'a DrawHistory) -> &'a [DrawRecord] {
        match self.config.backtest.window {
            0 => history.draws(),
            days => history.tail(days),
        }
    }

    // -- roster ------------------------------------------------------------

    /// Backtest a batch of bridges and write their rows. Used both for
    /// seeding a fresh cache and for promoting discovery-scan hits.
    pub fn register_bridges(
        &self,
        defs: &[BridgeDefinition],
        history: &DrawHistory,
    ) -> EngineResult<RecomputeReport> {
        let backtester = Backtester::new(self.config.backtest.clone());
        let mut report = RecomputeReport::default();
        let draws = self.evaluation_draws(history);
        for def in defs {
            report.processed += 1;
            let outcome = backtester
                .run(def, draws)
                .and_then(|r| self.cache.upsert(&r.to_metrics(def)));
            match outcome {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    warn!(bridge = %def.name(), error = %e, "failed to register bridge");
                    report.record_failure(e.reason());
                }
            }
        }
        info!(
            registered = report.succeeded,
            failed = report.processed - report.succeeded,
            "bridge registration complete"
        );
        Ok(report)
    }

    /// The default roster seeded into an empty cache: every classic
    /// formula plus the memory family.
    pub fn seed_default_roster(&self, history: &DrawHistory) -> EngineResult<RecomputeReport> {
        let defs: Vec<BridgeDefinition> = registry::classic_bridges()
            .chain(registry::memory_bridges())
            .collect();
        self.register_bridges(&defs, history)
    }

    // -- recompute ---------------------------------------------------------

    /// Re-backtest every cached bridge against fresh history, bounded
    /// by the configured number of concurrent jobs. Each bridge is
    /// claimed for the duration of its rewrite; claimed bridges stay
    /// invisible to consensus until the new row is committed.
    pub async fn recompute_all(&self, history: &DrawHistory) -> EngineResult<RecomputeReport> {
        let mut report = RecomputeReport::default();
        let names = self.cache.names()?;
        if names.is_empty() {
            return Ok(report);
        }

        let resolved = registry::resolve_all(names.iter().map(String::as_str));
        for _ in &resolved.skipped {
            report.processed += 1;
            report.record_failure("unparseable_bridge_name");
        }

        let draws: Arc<[DrawRecord]> = self.evaluation_draws(history).to_vec().into();
        let semaphore = Arc::new(Semaphore::new(self.config.jobs.max_concurrent.max(1)));
        let mut jobs: JoinSet<(String, EngineResult<()>)> = JoinSet::new();

        for def in resolved.resolved {
            report.processed += 1;
            let name = def.name();
            let Some(claim) = self.guard.try_claim(&name) else {
                report.skipped_in_flight += 1;
                continue;
            };
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                // semaphore closed only on shutdown; stop queuing
                break;
            };
            let cache = Arc::clone(&self.cache);
            let backtest_config = self.config.backtest.clone();
            let draws = Arc::clone(&draws);
            jobs.spawn_blocking(move || {
                let _permit = permit;
                let _claim = claim;
                let backtester = Backtester::new(backtest_config);
                let outcome = backtester
                    .run(&def, &draws)
                    .and_then(|r| cache.upsert(&r.to_metrics(&def)));
                (def.name(), outcome)
            });
        }

        while let Some(joined) = jobs.join_next().await {
            match joined {
                Ok((_, Ok(()))) => report.succeeded += 1,
                Ok((name, Err(e))) => {
                    warn!(bridge = %name, error = %e, "recompute failed");
                    report.record_failure(e.reason());
                }
                Err(e) => {
                    warn!(error = %e, "recompute job panicked");
                    report.record_failure("job_panic");
                }
            }
        }

        info!(
            processed = report.processed,
            succeeded = report.succeeded,
            skipped_in_flight = report.skipped_in_flight,
            failed = report.failed.values().sum::<u32>(),
            "cache recompute complete"
        );
        Ok(report)
    }

    // -- consensus and scoring ---------------------------------------------

    /// Consensus plus composite scoring for the next period.
    ///
    /// Reads the enabled roster, drops bridges mid-recompute, votes
    /// their predictions off the latest draw and ranks the candidates.
    pub async fn rank(&self, history: &DrawHistory) -> EngineResult<Vec<ScoreResult>> {
        let latest = history.latest().ok_or(EngineError::InsufficientData {
            required: 1,
            available: 0,
        })?;
        if let Some(reason) = latest.malformed_reason() {
            return Err(EngineError::MalformedDrawRow {
                period: latest.period,
                reason,
            });
        }

        let enabled = self.cache.enabled()?;
        let metrics_by_name: HashMap<String, BridgeMetrics> = enabled
            .iter()
            .map(|m| (m.name.clone(), m.clone()))
            .collect();

        let ready = self
            .guard
            .filter_ready(enabled.into_iter().map(|m| m.name).collect());
        let resolved = registry::resolve_all(ready.iter().map(String::as_str));

        let candidates = consensus::aggregate_from_latest(&resolved.resolved, latest);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let stats = self.stats_for(&candidates, history);
        let keys: Vec<_> = candidates.iter().map(|c| c.prediction.clone()).collect();
        let ai = signal::fetch_or_empty(self.signal.as_ref(), &keys).await;

        Ok(self.scoring.score(candidates, &metrics_by_name, &stats, &ai))
    }

    fn stats_for(
        &self,
        candidates: &[CandidateVotes],
        history: &DrawHistory,
    ) -> HashMap<crate::bridge::Prediction, CandidateStats> {
        candidates
            .iter()
            .map(|c| {
                (
                    c.prediction.clone(),
                    candidate_stats(history.draws(), self.config.scoring.stats_days, &c.prediction),
                )
            })
            .collect()
    }

    // -- lifecycle and discovery -------------------------------------------

    /// Hysteresis sweep over the whole cache.
    pub fn apply_lifecycle(&self) -> EngineResult<LifecycleReport> {
        self.lifecycle.apply(&self.cache)
    }

    /// Scan the đề families (dynamic touch and set bridges) off the
    /// blocking pool and promote the hits into the cache.
    pub async fn discover_de_bridges(
        &self,
        history: &DrawHistory,
    ) -> EngineResult<scanner::ScanReport> {
        let max_offset = self.config.scan.max_touch_offset;
        let position_limit = self.config.scan.set_position_limit;
        let defs: Vec<BridgeDefinition> = registry::dynamic_touch_bridges(max_offset)
            .chain(registry::set_bridges(position_limit))
            .collect();
        self.discover(defs, history).await
    }

    /// Scan the positional lô family, every unordered pair of the full
    /// position table, and promote the hits into the cache.
    pub async fn discover_lo_bridges(
        &self,
        history: &DrawHistory,
    ) -> EngineResult<scanner::ScanReport> {
        let defs: Vec<BridgeDefinition> = registry::position_bridges().collect();
        self.discover(defs, history).await
    }

    async fn discover(
        &self,
        defs: Vec<BridgeDefinition>,
        history: &DrawHistory,
    ) -> EngineResult<scanner::ScanReport> {
        let draws: Arc<[DrawRecord]> = self.evaluation_draws(history).to_vec().into();
        let backtest_config = self.config.backtest.clone();
        let scan_config = self.config.scan.clone();

        let scan = tokio::task::spawn_blocking(move || {
            scanner::scan(defs, &draws, &backtest_config, &scan_config)
        })
        .await
        .map_err(|e| EngineError::Job(e.to_string()))??;

        let promoted: Vec<BridgeDefinition> =
            scan.hits.iter().map(|h| h.def.clone()).collect();
        if !promoted.is_empty() {
            self.register_bridges(&promoted, history)?;
        }
        Ok(scan)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
