//! Bridge registry: batch name resolution and family enumeration.
//!
//! The cache stores bridge names only. On load the registry turns a
//! batch of names back into definitions, skipping and counting the
//! unparseable ones instead of failing the batch. For discovery scans
//! it enumerates whole bridge families lazily.

use super::positions::TOTAL_POSITIONS;
use super::{BridgeDefinition, CLASSIC_COUNT};
use crate::bridge::positions::MEMORY_SLOTS;
use tracing::warn;

/// Outcome of resolving a batch of stored names.
#[derive(Debug, Default)]
pub struct ResolveReport {
    pub resolved: Vec<BridgeDefinition>,
    /// (name, reason) per skipped entry.
    pub skipped: Vec<(String, String)>,
}

/// Resolve every name in the batch, warning and skipping names that no
/// longer parse (for example after a grammar change).
pub fn resolve_all<'a>(names: impl IntoIterator<Item = &'a str>) -> ResolveReport {
    let mut report = ResolveReport::default();
    for name in names {
        match BridgeDefinition::parse(name) {
            Ok(def) => report.resolved.push(def),
            Err(e) => {
                warn!(bridge = %name, error = %e, "skipping unresolvable bridge name");
                report.skipped.push((name.to_string(), e.to_string()));
            }
        }
    }
    report
}

// ---------------------------------------------------------------------------
// Family enumeration
// ---------------------------------------------------------------------------

/// Every classic formula.
pub fn classic_bridges() -> impl Iterator<Item = BridgeDefinition> {
    (1..=CLASSIC_COUNT).map(|id| BridgeDefinition::Classic { id })
}

/// Every unordered pair of distinct position indices, base and shadow.
pub fn position_bridges() -> impl Iterator<Item = BridgeDefinition> {
    (0..TOTAL_POSITIONS).flat_map(|pos1| {
        (pos1 + 1..TOTAL_POSITIONS).map(move |pos2| BridgeDefinition::Position { pos1, pos2 })
    })
}

/// Every memory sum and difference bridge over distinct slot pairs.
pub fn memory_bridges() -> impl Iterator<Item = BridgeDefinition> {
    slot_pairs().flat_map(|(slot1, slot2)| {
        [
            BridgeDefinition::MemorySum { slot1, slot2 },
            BridgeDefinition::MemoryDiff { slot1, slot2 },
        ]
    })
}

/// Every dynamic touch bridge with offsets `0..=max_offset`.
pub fn dynamic_touch_bridges(max_offset: u8) -> impl Iterator<Item = BridgeDefinition> {
    let max_offset = max_offset.min(9);
    slot_pairs().flat_map(move |(slot1, slot2)| {
        (0..=max_offset).map(move |offset| BridgeDefinition::DynamicTouch { slot1, slot2, offset })
    })
}

/// Every set bridge over unordered pairs of distinct position indices,
/// limited to the first `max_positions` entries of the table.
pub fn set_bridges(max_positions: usize) -> impl Iterator<Item = BridgeDefinition> {
    let limit = max_positions.min(TOTAL_POSITIONS);
    (0..limit).flat_map(move |pos1| {
        (pos1 + 1..limit).map(move |pos2| BridgeDefinition::SetBridge { pos1, pos2 })
    })
}

fn slot_pairs() -> impl Iterator<Item = (usize, usize)> {
    (0..MEMORY_SLOTS)
        .flat_map(|s1| (s1 + 1..MEMORY_SLOTS).map(move |s2| (s1, s2)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
