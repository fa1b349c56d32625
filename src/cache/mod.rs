//! Persisted bridge performance cache.
//!
//! One SQLite row per bridge keyed by name, refreshed after every
//! backtest. Scoring and lifecycle read from here instead of replaying
//! history. The companion [`guard`] module keeps concurrent rewrites
//! of the same row from ever being visible.

pub mod guard;

use crate::error::{EngineError, EngineResult};
use crate::types::BridgeMetrics;
use rusqlite::{params, Connection, Row};
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

pub struct PerformanceCache {
    conn: Mutex<Connection>,
}

impl PerformanceCache {
    /// Open (or create) the cache file and ensure the schema.
    pub fn open(path: &str) -> EngineResult<Self> {
        let conn = Connection::open(path)?;
        Self::init(&conn)?;
        info!(%path, "performance cache open");
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Fresh in-memory cache, used by tests and dry runs.
    pub fn open_in_memory() -> EngineResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn init(conn: &Connection) -> EngineResult<()> {
        conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS bridge_metrics (
                name TEXT PRIMARY KEY,
                type TEXT NOT NULL,
                pos1_idx INTEGER,
                pos2_idx INTEGER,
                win_rate_text TEXT NOT NULL,
                current_streak INTEGER NOT NULL,
                max_lose_streak_k2n INTEGER NOT NULL,
                next_prediction TEXT NOT NULL,
                recent_win_count INTEGER NOT NULL,
                is_enabled INTEGER NOT NULL DEFAULT 1,
                is_pinned INTEGER NOT NULL DEFAULT 0,
                last_evaluated_period INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_bridge_metrics_enabled
                ON bridge_metrics (is_enabled);
            COMMIT;",
        )?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- writes ------------------------------------------------------------

    /// Insert or refresh one row. A conflicting update keeps the stored
    /// `is_enabled` and `is_pinned` flags: those belong to lifecycle and
    /// the operator, not to the backtest that produced the metrics.
    /// A write that fails twice surfaces as `CacheWriteConflict`.
    pub fn upsert(&self, metrics: &BridgeMetrics) -> EngineResult<()> {
        let conn = self.lock();
        Self::upsert_with_retry(&conn, metrics)
    }

    fn upsert_with_retry(conn: &Connection, m: &BridgeMetrics) -> EngineResult<()> {
        match Self::upsert_inner(conn, m) {
            Ok(()) => Ok(()),
            Err(first) => {
                warn!(bridge = %m.name, error = %first, "cache upsert failed, retrying once");
                Self::upsert_inner(conn, m)
                    .map_err(|_| EngineError::CacheWriteConflict(m.name.clone()))
            }
        }
    }

    fn upsert_inner(conn: &Connection, m: &BridgeMetrics) -> rusqlite::Result<()> {
        conn.execute(
            "INSERT INTO bridge_metrics (
                name, type, pos1_idx, pos2_idx, win_rate_text,
                current_streak, max_lose_streak_k2n, next_prediction,
                recent_win_count, is_enabled, is_pinned, last_evaluated_period
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(name) DO UPDATE SET
                type = excluded.type,
                pos1_idx = excluded.pos1_idx,
                pos2_idx = excluded.pos2_idx,
                win_rate_text = excluded.win_rate_text,
                current_streak = excluded.current_streak,
                max_lose_streak_k2n = excluded.max_lose_streak_k2n,
                next_prediction = excluded.next_prediction,
                recent_win_count = excluded.recent_win_count,
                last_evaluated_period = excluded.last_evaluated_period",
            params![
                m.name,
                m.kind,
                m.pos1_idx,
                m.pos2_idx,
                m.win_rate_text,
                m.current_streak,
                m.max_lose_streak_k2n,
                m.next_prediction,
                m.recent_win_count,
                m.is_enabled as i64,
                m.is_pinned as i64,
                m.last_evaluated_period,
            ],
        )?;
        Ok(())
    }

    /// Refresh a batch inside one transaction. Each row gets the same
    /// single retry as [`upsert`](Self::upsert) before the batch fails.
    pub fn upsert_many(&self, batch: &[BridgeMetrics]) -> EngineResult<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        for m in batch {
            Self::upsert_with_retry(&tx, m)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Flip the lifecycle flag. Returns whether the row existed.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> EngineResult<bool> {
        let changed = self.lock().execute(
            "UPDATE bridge_metrics SET is_enabled = ?2 WHERE name = ?1",
            params![name, enabled as i64],
        )?;
        Ok(changed > 0)
    }

    /// Pin or unpin a bridge against automatic pruning.
    pub fn set_pinned(&self, name: &str, pinned: bool) -> EngineResult<bool> {
        let changed = self.lock().execute(
            "UPDATE bridge_metrics SET is_pinned = ?2 WHERE name = ?1",
            params![name, pinned as i64],
        )?;
        Ok(changed > 0)
    }

    pub fn delete(&self, name: &str) -> EngineResult<bool> {
        let changed = self
            .lock()
            .execute("DELETE FROM bridge_metrics WHERE name = ?1", params![name])?;
        Ok(changed > 0)
    }

    // -- reads -------------------------------------------------------------

    pub fn get(&self, name: &str) -> EngineResult<Option<BridgeMetrics>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT name, type, pos1_idx, pos2_idx, win_rate_text,
                    current_streak, max_lose_streak_k2n, next_prediction,
                    recent_win_count, is_enabled, is_pinned, last_evaluated_period
             FROM bridge_metrics WHERE name = ?1",
        )?;
        let mut rows = stmt.query_map(params![name], row_to_metrics)?;
        rows.next().transpose().map_err(EngineError::from)
    }

    pub fn all(&self) -> EngineResult<Vec<BridgeMetrics>> {
        self.select("")
    }

    /// Only rows lifecycle currently considers active.
    pub fn enabled(&self) -> EngineResult<Vec<BridgeMetrics>> {
        self.select("WHERE is_enabled = 1")
    }

    pub fn names(&self) -> EngineResult<Vec<String>> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT name FROM bridge_metrics ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    fn select(&self, filter: &str) -> EngineResult<Vec<BridgeMetrics>> {
        let conn = self.lock();
        let sql = format!(
            "SELECT name, type, pos1_idx, pos2_idx, win_rate_text,
                    current_streak, max_lose_streak_k2n, next_prediction,
                    recent_win_count, is_enabled, is_pinned, last_evaluated_period
             FROM bridge_metrics {filter} ORDER BY name",
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], row_to_metrics)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn row_to_metrics(row: &Row<'_>) -> rusqlite::Result<BridgeMetrics> {
    Ok(BridgeMetrics {
        name: row.get(0)?,
        kind: row.get(1)?,
        pos1_idx: row.get(2)?,
        pos2_idx: row.get(3)?,
        win_rate_text: row.get(4)?,
        current_streak: row.get(5)?,
        max_lose_streak_k2n: row.get(6)?,
        next_prediction: row.get(7)?,
        recent_win_count: row.get(8)?,
        is_enabled: row.get::<_, i64>(9)? != 0,
        is_pinned: row.get::<_, i64>(10)? != 0,
        last_evaluated_period: row.get(11)?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
