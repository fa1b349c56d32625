//! Draw history loading.
//!
//! The history lives outside the engine as an append-only JSON array
//! of draw records. The engine borrows it read-only; loading sorts by
//! period and drops duplicate periods so downstream replay can rely on
//! a strictly increasing sequence.

use crate::types::DrawRecord;
use anyhow::{Context, Result};
use std::fs;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct DrawHistory {
    draws: Vec<DrawRecord>,
}

impl DrawHistory {
    /// Load and normalize a JSON history file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read history file: {path}"))?;
        let draws: Vec<DrawRecord> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse history file: {path}"))?;
        let history = Self::from_draws(draws);
        info!(%path, draws = history.len(), "draw history loaded");
        Ok(history)
    }

    /// Sort oldest first and keep the first record per period.
    pub fn from_draws(mut draws: Vec<DrawRecord>) -> Self {
        draws.sort_by_key(|d| d.period);
        draws.dedup_by_key(|d| d.period);
        Self { draws }
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    pub fn latest(&self) -> Option<&DrawRecord> {
        self.draws.last()
    }

    /// The trailing `days` records, or everything when shorter.
    pub fn tail(&self, days: usize) -> &[DrawRecord] {
        let start = self.draws.len().saturating_sub(days);
        &self.draws[start..]
    }
}
