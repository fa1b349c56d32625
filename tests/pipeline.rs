//! End-to-end pipeline tests: seed a roster, recompute the cache,
//! sweep lifecycle and rank candidates, all against a synthetic but
//! fully-formed draw history.

use std::sync::Arc;

use caulytics::bridge::BridgeDefinition;
use caulytics::cache::PerformanceCache;
use caulytics::config::AppConfig;
use caulytics::engine::Engine;
use caulytics::history::DrawHistory;
use caulytics::signal::{FileSignal, NullSignal};
use caulytics::types::DrawRecord;
use chrono::NaiveDate;

/// A complete draw with correct tier shapes. `special`/`first` drive
/// the positional bridges; `extra` lands one chosen loto value via the
/// seventh tier.
fn make_draw(period: u32, special: &str, first: &str, extra: &str) -> DrawRecord {
    DrawRecord {
        period,
        date: NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .checked_add_days(chrono::Days::new(period as u64))
            .unwrap(),
        special: special.to_string(),
        first: first.to_string(),
        second: vec!["13579".into(), "24680".into()],
        third: vec![
            "11223".into(),
            "44556".into(),
            "77889".into(),
            "10293".into(),
            "84756".into(),
            "61524".into(),
        ],
        fourth: vec!["1928".into(), "3746".into(), "5564".into(), "9182".into()],
        fifth: vec![
            "1029".into(),
            "3847".into(),
            "5665".into(),
            "7483".into(),
            "9201".into(),
            "1847".into(),
        ],
        sixth: vec!["102".into(), "384".into(), "566".into()],
        seventh: vec![extra.into(), "31".into(), "42".into(), "53".into()],
    }
}

fn engine_with(config: AppConfig) -> Engine {
    let cache = Arc::new(PerformanceCache::open_in_memory().unwrap());
    Engine::with_cache(config, cache, Arc::new(NullSignal))
}

/// Ten-day history where the pair read from GDB[0]/G1[0] (always 1
/// and 6 → 16-61) lands on most days through the seventh tier.
fn favourable_history() -> DrawHistory {
    let draws = (0..10u32)
        .map(|p| {
            let extra = if p % 3 == 0 { "99" } else { "16" };
            make_draw(p, "12345", "67890", extra)
        })
        .collect();
    DrawHistory::from_draws(draws)
}

#[tokio::test]
async fn full_pipeline_is_reproducible() {
    let engine = engine_with(AppConfig::default());
    let history = favourable_history();

    let defs = vec![
        BridgeDefinition::Position { pos1: 0, pos2: 5 },
        BridgeDefinition::Classic { id: 2 },
        BridgeDefinition::MemorySum { slot1: 0, slot2: 1 },
    ];
    let report = engine.register_bridges(&defs, &history).unwrap();
    assert_eq!(report.succeeded, 3);

    let recompute = engine.recompute_all(&history).await.unwrap();
    assert_eq!(recompute.processed, 3);
    assert_eq!(recompute.succeeded, 3);
    assert!(recompute.failed.is_empty());

    let first = engine.rank(&history).await.unwrap();
    let second = engine.rank(&history).await.unwrap();
    assert!(!first.is_empty());
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.candidate.prediction, b.candidate.prediction);
        assert!((a.score - b.score).abs() < 1e-12);
    }
}

#[tokio::test]
async fn strong_bridge_outranks_cold_candidate() {
    let engine = engine_with(AppConfig::default());
    let history = favourable_history();

    engine
        .register_bridges(
            &[
                // 16-61 lands on six of the nine evaluated days
                BridgeDefinition::Position { pos1: 0, pos2: 5 },
                // 19-91 never appears in this history
                BridgeDefinition::Position { pos1: 0, pos2: 8 },
            ],
            &history,
        )
        .unwrap();

    let ranked = engine.rank(&history).await.unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].candidate.prediction.to_string(), "16-61");
    assert!(ranked[0].score > ranked[1].score);
    // the cold candidate has been absent all ten days
    assert_eq!(ranked[1].stats.gan_days, 10);
}

#[tokio::test]
async fn lifecycle_sweep_silences_losing_roster() {
    let mut config = AppConfig::default();
    config.lifecycle.prune_max_lose_streak = 3;
    let engine = engine_with(config);

    // 16-61 never lands, so the bridge loses every day.
    let draws = (0..10u32)
        .map(|p| make_draw(p, "12345", "67890", "99"))
        .collect();
    let history = DrawHistory::from_draws(draws);

    engine
        .register_bridges(&[BridgeDefinition::Position { pos1: 0, pos2: 5 }], &history)
        .unwrap();

    let report = engine.apply_lifecycle().unwrap();
    // 0% win rate with a deep K2N lose streak: pruned, not just disabled
    assert_eq!(report.pruned.len() + report.disabled.len(), 1);
    assert!(engine.rank(&history).await.unwrap().is_empty());

    // pinned bridges ride out the sweep
    let name = BridgeDefinition::Position { pos1: 0, pos2: 5 }.name();
    engine.cache().set_enabled(&name, true).unwrap();
    engine.cache().set_pinned(&name, true).unwrap();
    let report = engine.apply_lifecycle().unwrap();
    assert!(report.pruned.is_empty());
    assert!(report.disabled.is_empty());
    assert_eq!(engine.rank(&history).await.unwrap().len(), 1);
}

#[tokio::test]
async fn external_signal_shifts_the_score() {
    let history = favourable_history();
    let defs = [BridgeDefinition::Position { pos1: 0, pos2: 5 }];

    let baseline_engine = engine_with(AppConfig::default());
    baseline_engine.register_bridges(&defs, &history).unwrap();
    let baseline = baseline_engine.rank(&history).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let probs = dir.path().join("probs.json");
    std::fs::write(&probs, r#"{"16-61": 1.0}"#).unwrap();

    let cache = Arc::new(PerformanceCache::open_in_memory().unwrap());
    let boosted_engine = Engine::with_cache(
        AppConfig::default(),
        cache,
        Arc::new(FileSignal::new(probs.to_str().unwrap())),
    );
    boosted_engine.register_bridges(&defs, &history).unwrap();
    let boosted = boosted_engine.rank(&history).await.unwrap();

    // default ai weight is 0.2, applied once to the candidate
    let delta = boosted[0].score - baseline[0].score;
    assert!((delta - 0.2).abs() < 1e-9);
    assert_eq!(boosted[0].ai_probability, Some(1.0));
    assert_eq!(baseline[0].ai_probability, None);
}

#[tokio::test]
async fn discovery_scan_promotes_de_bridges() {
    let mut config = AppConfig::default();
    config.scan.top_n = 3;
    config.scan.min_win_rate = 0.0;
    let engine = engine_with(config);
    let history = favourable_history();

    let before = engine.cache().names().unwrap().len();
    let scan = engine.discover_de_bridges(&history).await.unwrap();
    assert!(scan.scanned > 0);
    assert!(scan.hits.len() <= 3);

    let after = engine.cache().names().unwrap().len();
    assert_eq!(after, before + scan.hits.len());
    for hit in &scan.hits {
        let row = engine.cache().get(&hit.def.name()).unwrap().unwrap();
        assert!(row.kind == "touch" || row.kind == "set", "kind {}", row.kind);
    }
}

#[tokio::test]
async fn discovery_scan_promotes_positional_lo_bridges() {
    let mut config = AppConfig::default();
    config.scan.top_n = 3;
    config.scan.min_win_rate = 50.0;
    let engine = engine_with(config);
    let history = favourable_history();

    let scan = engine.discover_lo_bridges(&history).await.unwrap();
    // the whole 214-position pair family goes through the scan
    assert_eq!(scan.scanned, 214 * 213 / 2);
    assert!(!scan.hits.is_empty());
    assert!(scan.hits.len() <= 3);

    for hit in &scan.hits {
        assert!(hit.win_rate >= 50.0);
        let row = engine.cache().get(&hit.def.name()).unwrap().unwrap();
        assert_eq!(row.kind, "position");
    }
}
