//! In-flight re-evaluation tracking.
//!
//! While a bridge is being re-backtested its cache row is mid-rewrite,
//! so readers must leave it out and a second job must not start on it.
//! Claims are held in a shared set and released on drop, so a panicked
//! job never wedges its bridge.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Shared registry of bridge names currently being re-evaluated.
#[derive(Debug, Clone, Default)]
pub struct SyncRegistry {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl SyncRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a bridge for re-evaluation. `None` when a job already
    /// holds it; callers skip instead of waiting.
    pub fn try_claim(&self, name: &str) -> Option<SyncClaim> {
        let mut set = self.lock();
        if set.insert(name.to_string()) {
            debug!(bridge = %name, "claimed for re-evaluation");
            Some(SyncClaim {
                name: name.to_string(),
                registry: self.clone(),
            })
        } else {
            None
        }
    }

    /// Whether a bridge is mid-rewrite right now.
    pub fn is_syncing(&self, name: &str) -> bool {
        self.lock().contains(name)
    }

    /// Drop in-flight names from a read set, never blocking on them.
    pub fn filter_ready(&self, names: Vec<String>) -> Vec<String> {
        let set = self.lock();
        names.into_iter().filter(|n| !set.contains(n)).collect()
    }

    /// Names currently claimed, for diagnostics.
    pub fn active(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().iter().cloned().collect();
        names.sort();
        names
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        // A poisoned set only means a claim holder panicked; its Drop
        // already ran or never will, either way the set stays usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, name: &str) {
        self.lock().remove(name);
        debug!(bridge = %name, "released after re-evaluation");
    }
}

/// RAII claim on one bridge name.
#[derive(Debug)]
pub struct SyncClaim {
    name: String,
    registry: SyncRegistry,
}

impl SyncClaim {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for SyncClaim {
    fn drop(&mut self) {
        self.registry.release(&self.name);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
