//! Error taxonomy for the engine.
//!
//! Per-item failures (a malformed day inside a backtest, one unparseable
//! bridge in a batch) are recovered locally and counted in run reports;
//! only errors that make the whole requested operation meaningless are
//! surfaced to the caller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Fewer than the minimum number of history rows for the operation.
    /// Fatal to the request; reported to the caller, never retried.
    #[error("insufficient history: need {required} rows, have {available}")]
    InsufficientData { required: usize, available: usize },

    /// A stored bridge name that does not match the name grammar.
    /// Skipped per-bridge during batch operations.
    #[error("unparseable bridge name: {0}")]
    UnparseableBridgeName(String),

    /// A draw row missing or corrupting required prize fields.
    /// Skipped per-day during backtests.
    #[error("malformed draw row at period {period}: {reason}")]
    MalformedDrawRow { period: u32, reason: String },

    /// A cache upsert that still fails after one retry.
    #[error("cache write conflict for bridge '{0}'")]
    CacheWriteConflict(String),

    /// The external probability signal could not be reached.
    /// Scoring degrades to a zero AI contribution instead of failing.
    #[error("external signal unavailable: {0}")]
    ExternalSignalUnavailable(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A background job failed to run to completion.
    #[error("background job failed: {0}")]
    Job(String),
}

impl EngineError {
    /// Short stable label used to de-duplicate error reasons in run reports.
    pub fn reason(&self) -> &'static str {
        match self {
            EngineError::InsufficientData { .. } => "insufficient_data",
            EngineError::UnparseableBridgeName(_) => "unparseable_bridge_name",
            EngineError::MalformedDrawRow { .. } => "malformed_draw_row",
            EngineError::CacheWriteConflict(_) => "cache_write_conflict",
            EngineError::ExternalSignalUnavailable(_) => "external_signal_unavailable",
            EngineError::Storage(_) => "storage",
            EngineError::Job(_) => "job",
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_labels_are_stable() {
        let e = EngineError::InsufficientData { required: 2, available: 0 };
        assert_eq!(e.reason(), "insufficient_data");
        let e = EngineError::UnparseableBridgeName("XX_9".into());
        assert_eq!(e.reason(), "unparseable_bridge_name");
    }

    #[test]
    fn test_display_contains_context() {
        let e = EngineError::MalformedDrawRow { period: 412, reason: "empty special".into() };
        assert!(e.to_string().contains("412"));
        assert!(e.to_string().contains("empty special"));
    }
}
