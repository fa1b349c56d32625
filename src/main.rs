//! CAULYTICS — bridge backtesting and consensus scoring engine.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! opens the performance cache (seeding the default roster on first
//! run), then re-evaluates and re-ranks whenever the draw history
//! grows, with graceful shutdown.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use caulytics::config::AppConfig;
use caulytics::engine::Engine;
use caulytics::history::DrawHistory;
use caulytics::signal::{FileSignal, NullSignal, ProbabilitySignal};

const BANNER: &str = r#"
   ____    _   _   _ _  __   _______ ___ ____ ____
  / ___|  / \ | | | | | \ \ / /_   _|_ _/ ___/ ___|
 | |     / _ \| | | | |  \ V /  | |  | | |   \___ \
 | |___ / ___ \ |_| | |___| |   | |  | | |___ ___) |
  \____/_/   \_\___/|_____|_|   |_| |___\____|____/

  Bridge Backtesting & Consensus Scoring Engine
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = AppConfig::load_or_default("config.toml")?;
    init_logging(&cfg);

    println!("{BANNER}");
    info!(
        cache = %cfg.engine.cache_path,
        history = %cfg.engine.history_path,
        refresh_secs = cfg.engine.refresh_interval_secs,
        "engine starting up"
    );

    let signal: Arc<dyn ProbabilitySignal> = if cfg.signal.enabled {
        info!(path = %cfg.signal.probabilities_path, "external probability signal enabled");
        Arc::new(FileSignal::new(cfg.signal.probabilities_path.clone()))
    } else {
        Arc::new(NullSignal)
    };

    let engine = Engine::new(cfg.clone(), signal).context("Failed to open performance cache")?;
    let history = DrawHistory::load(&cfg.engine.history_path)?;

    if engine.cache().names()?.is_empty() {
        info!("empty cache, seeding default bridge roster");
        let report = engine.seed_default_roster(&history)?;
        info!(
            registered = report.succeeded,
            failed = report.failed.values().sum::<u32>(),
            "default roster seeded"
        );
        match engine.discover_lo_bridges(&history).await {
            Ok(scan) => info!(
                scanned = scan.scanned,
                promoted = scan.hits.len(),
                "lô discovery scan complete"
            ),
            Err(e) => warn!(error = %e, "lô discovery scan failed"),
        }
        match engine.discover_de_bridges(&history).await {
            Ok(scan) => info!(
                scanned = scan.scanned,
                promoted = scan.hits.len(),
                "đề discovery scan complete"
            ),
            Err(e) => warn!(error = %e, "đề discovery scan failed"),
        }
    }

    run_pass(&engine, &history, &cfg).await;
    let mut last_period = history.latest().map(|d| d.period);

    // -- Main loop ---------------------------------------------------------

    let mut interval =
        tokio::time::interval(Duration::from_secs(cfg.engine.refresh_interval_secs.max(1)));
    interval.tick().await; // the first tick fires immediately
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("entering main loop, press Ctrl+C to stop");
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let history = match DrawHistory::load(&cfg.engine.history_path) {
                    Ok(h) => h,
                    Err(e) => {
                        error!(error = %e, "history reload failed, keeping previous ranking");
                        continue;
                    }
                };
                let period = history.latest().map(|d| d.period);
                if period == last_period {
                    continue;
                }
                info!(period = ?period, "new draw detected");
                run_pass(&engine, &history, &cfg).await;
                last_period = period;
            }
            _ = &mut shutdown => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    info!("engine shut down cleanly");
    Ok(())
}

/// One full recompute → lifecycle → rank pass.
async fn run_pass(engine: &Engine, history: &DrawHistory, cfg: &AppConfig) {
    match engine.recompute_all(history).await {
        Ok(report) => info!(
            processed = report.processed,
            succeeded = report.succeeded,
            skipped_in_flight = report.skipped_in_flight,
            failed = report.failed.values().sum::<u32>(),
            "recompute pass complete"
        ),
        Err(e) => {
            error!(error = %e, "recompute pass failed");
            return;
        }
    }

    match engine.apply_lifecycle() {
        Ok(report) => info!(
            enabled = report.enabled.len(),
            disabled = report.disabled.len(),
            pruned = report.pruned.len(),
            retained = report.retained,
            "lifecycle sweep complete"
        ),
        Err(e) => warn!(error = %e, "lifecycle sweep failed"),
    }

    match engine.rank(history).await {
        Ok(ranked) => {
            for (i, r) in ranked.iter().take(cfg.engine.top_results).enumerate() {
                info!(
                    rank = i + 1,
                    candidate = %r.candidate.prediction,
                    score = format!("{:.2}", r.score),
                    votes = r.candidate.vote_count,
                    attack = format!("{:.2}", r.attack),
                    defense = format!("{:.2}", r.defense),
                    bonus = format!("{:.2}", r.bonus),
                    gan = r.stats.gan_days,
                    "ranked candidate"
                );
            }
            if ranked.is_empty() {
                warn!("no candidates to rank, is the roster enabled?");
            }
        }
        Err(e) => error!(error = %e, "scoring pass failed"),
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging(cfg: &AppConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("caulytics=info"));

    if cfg.engine.log_json {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
