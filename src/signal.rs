//! External probability signal.
//!
//! A model trained out of band publishes per-candidate probabilities;
//! scoring folds them in with a small weight. The engine only depends
//! on this trait, and a signal failure degrades to a zero contribution
//! instead of failing the scoring pass.

use crate::bridge::Prediction;
use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::warn;

#[async_trait]
pub trait ProbabilitySignal: Send + Sync {
    /// Probabilities in [0,1] for whichever keys the signal knows.
    /// Missing keys simply score without the term.
    async fn probabilities(
        &self,
        keys: &[Prediction],
    ) -> EngineResult<HashMap<Prediction, f64>>;
}

/// Fetch with graceful degradation: an unavailable signal logs and
/// yields an empty map.
pub async fn fetch_or_empty(
    signal: &dyn ProbabilitySignal,
    keys: &[Prediction],
) -> HashMap<Prediction, f64> {
    match signal.probabilities(keys).await {
        Ok(map) => map,
        Err(e) => {
            warn!(error = %e, "probability signal unavailable, scoring without it");
            HashMap::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Implementations
// ---------------------------------------------------------------------------

/// The disabled signal: contributes nothing, never fails.
pub struct NullSignal;

#[async_trait]
impl ProbabilitySignal for NullSignal {
    async fn probabilities(
        &self,
        _keys: &[Prediction],
    ) -> EngineResult<HashMap<Prediction, f64>> {
        Ok(HashMap::new())
    }
}

/// Reads a JSON object of rendered candidate key → probability,
/// refreshed out of band by the model pipeline.
pub struct FileSignal {
    path: String,
}

impl FileSignal {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ProbabilitySignal for FileSignal {
    async fn probabilities(
        &self,
        keys: &[Prediction],
    ) -> EngineResult<HashMap<Prediction, f64>> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            EngineError::ExternalSignalUnavailable(format!("{}: {e}", self.path))
        })?;
        let raw: HashMap<String, f64> = serde_json::from_str(&contents).map_err(|e| {
            EngineError::ExternalSignalUnavailable(format!("{}: {e}", self.path))
        })?;

        let map = keys
            .iter()
            .filter_map(|key| {
                raw.get(&key.to_string())
                    .map(|p| (key.clone(), p.clamp(0.0, 1.0)))
            })
            .collect();
        Ok(map)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
