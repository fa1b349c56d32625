//! Bridge definitions.
//!
//! A bridge is a deterministic rule that reads one finished draw and
//! emits a prediction for the next one. Five families exist: the fixed
//! classic catalog, positional digit pairs, memory sum/difference
//! pairs, dynamic touch spreads and named-set pairs. A bridge is fully
//! described by its name, so the cache only ever stores names and the
//! registry rebuilds the rule on load.

pub mod positions;
pub mod registry;
pub mod scanner;
pub mod sets;

use crate::error::{EngineError, EngineResult};
use crate::types::{reverse_digits, DrawRecord, PairKey, TouchSet};
use serde::{Deserialize, Serialize};
use sets::NumberSet;
use std::fmt;

/// Number of formulas in the classic catalog.
pub const CLASSIC_COUNT: u32 = 15;

// ---------------------------------------------------------------------------
// Prediction
// ---------------------------------------------------------------------------

/// What a bridge stakes on the next draw.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Prediction {
    /// A lô pair: hit when either member lands in the day's loto set.
    Pair(PairKey),
    /// Đề touches: hit when the special pair touches any digit.
    Touches(TouchSet),
    /// A đề set: hit when the special pair falls inside it.
    Set(NumberSet),
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prediction::Pair(pair) => write!(f, "{pair}"),
            Prediction::Touches(touches) => write!(f, "C:{touches}"),
            Prediction::Set(set) => write!(f, "B:{set}"),
        }
    }
}

impl Prediction {
    /// Whether the prediction came true on `day`.
    pub fn hit(&self, day: &DrawRecord) -> bool {
        match self {
            Prediction::Pair(pair) => pair.hits(&day.loto_set()),
            Prediction::Touches(touches) => {
                day.special_pair().is_some_and(|v| touches.matches(v))
            }
            Prediction::Set(set) => day.special_pair().is_some_and(|v| set.contains(v)),
        }
    }
}

// ---------------------------------------------------------------------------
// BridgeDefinition
// ---------------------------------------------------------------------------

/// Market the bridge plays: lô (any prize tail) or đề (special tail only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    Lo,
    De,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BridgeDefinition {
    /// One of the fixed classic formulas, 1-based id.
    Classic { id: u32 },
    /// Digit pair read from two position-table indices.
    Position { pos1: usize, pos2: usize },
    /// Sum of two memory slots, paired with its digit reverse.
    MemorySum { slot1: usize, slot2: usize },
    /// Absolute difference of two memory slots, paired with its reverse.
    MemoryDiff { slot1: usize, slot2: usize },
    /// Touch spread from two memory slots and a fixed offset.
    DynamicTouch { slot1: usize, slot2: usize, offset: u8 },
    /// Đề set picked by joining the digits at two position indices.
    SetBridge { pos1: usize, pos2: usize },
}

impl fmt::Display for BridgeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl BridgeDefinition {
    // -- naming ------------------------------------------------------------

    pub fn name(&self) -> String {
        match self {
            BridgeDefinition::Classic { id } => format!("CLASSIC_{id}"),
            BridgeDefinition::Position { pos1, pos2 } => format!(
                "LO_POS_{}_{}",
                position_label(*pos1),
                position_label(*pos2),
            ),
            BridgeDefinition::MemorySum { slot1, slot2 } => format!(
                "MEM_SUM_{}_{}",
                slot_label(*slot1),
                slot_label(*slot2),
            ),
            BridgeDefinition::MemoryDiff { slot1, slot2 } => format!(
                "MEM_DIFF_{}_{}",
                slot_label(*slot1),
                slot_label(*slot2),
            ),
            BridgeDefinition::DynamicTouch { slot1, slot2, offset } => format!(
                "DE_DYN_{}_{}_K{}",
                slot_label(*slot1),
                slot_label(*slot2),
                offset,
            ),
            BridgeDefinition::SetBridge { pos1, pos2 } => format!(
                "DE_SET_{}_{}",
                position_label(*pos1),
                position_label(*pos2),
            ),
        }
    }

    /// Parse a stored bridge name back into its definition.
    ///
    /// Position and slot names never contain underscores, so the tail
    /// of each prefix splits unambiguously on `_`.
    pub fn parse(name: &str) -> EngineResult<Self> {
        let bad = || EngineError::UnparseableBridgeName(name.to_string());

        if let Some(rest) = name.strip_prefix("CLASSIC_") {
            let id: u32 = rest.parse().map_err(|_| bad())?;
            if id == 0 || id > CLASSIC_COUNT {
                return Err(bad());
            }
            return Ok(BridgeDefinition::Classic { id });
        }
        if let Some(rest) = name.strip_prefix("LO_POS_") {
            let (p1, p2) = rest.split_once('_').ok_or_else(bad)?;
            let pos1 = positions::position_index(p1).ok_or_else(bad)?;
            let pos2 = positions::position_index(p2).ok_or_else(bad)?;
            if pos1 == pos2 {
                return Err(bad());
            }
            return Ok(BridgeDefinition::Position { pos1, pos2 });
        }
        if let Some(rest) = name.strip_prefix("MEM_SUM_") {
            let (slot1, slot2) = parse_slot_pair(rest).ok_or_else(bad)?;
            return Ok(BridgeDefinition::MemorySum { slot1, slot2 });
        }
        if let Some(rest) = name.strip_prefix("MEM_DIFF_") {
            let (slot1, slot2) = parse_slot_pair(rest).ok_or_else(bad)?;
            return Ok(BridgeDefinition::MemoryDiff { slot1, slot2 });
        }
        if let Some(rest) = name.strip_prefix("DE_DYN_") {
            let mut parts = rest.split('_');
            let s1 = parts.next().ok_or_else(bad)?;
            let s2 = parts.next().ok_or_else(bad)?;
            let k = parts.next().ok_or_else(bad)?;
            if parts.next().is_some() {
                return Err(bad());
            }
            let slot1 = positions::slot_index(s1).ok_or_else(bad)?;
            let slot2 = positions::slot_index(s2).ok_or_else(bad)?;
            let offset: u8 = k.strip_prefix('K').ok_or_else(bad)?.parse().map_err(|_| bad())?;
            if offset > 9 {
                return Err(bad());
            }
            return Ok(BridgeDefinition::DynamicTouch { slot1, slot2, offset });
        }
        if let Some(rest) = name.strip_prefix("DE_SET_") {
            let (p1, p2) = rest.split_once('_').ok_or_else(bad)?;
            let pos1 = positions::position_index(p1).ok_or_else(bad)?;
            let pos2 = positions::position_index(p2).ok_or_else(bad)?;
            if pos1 == pos2 {
                return Err(bad());
            }
            return Ok(BridgeDefinition::SetBridge { pos1, pos2 });
        }
        Err(bad())
    }

    /// Kind tag stored in the cache row.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeDefinition::Classic { .. } => "classic",
            BridgeDefinition::Position { .. } => "position",
            BridgeDefinition::MemorySum { .. } | BridgeDefinition::MemoryDiff { .. } => "memory",
            BridgeDefinition::DynamicTouch { .. } => "touch",
            BridgeDefinition::SetBridge { .. } => "set",
        }
    }

    pub fn target(&self) -> Target {
        match self {
            BridgeDefinition::Classic { .. }
            | BridgeDefinition::Position { .. }
            | BridgeDefinition::MemorySum { .. }
            | BridgeDefinition::MemoryDiff { .. } => Target::Lo,
            BridgeDefinition::DynamicTouch { .. } | BridgeDefinition::SetBridge { .. } => Target::De,
        }
    }

    /// The two indices a positional bridge reads, for the cache row.
    pub fn position_indices(&self) -> (Option<i64>, Option<i64>) {
        match self {
            BridgeDefinition::Position { pos1, pos2 }
            | BridgeDefinition::SetBridge { pos1, pos2 } => {
                (Some(*pos1 as i64), Some(*pos2 as i64))
            }
            _ => (None, None),
        }
    }

    // -- evaluation --------------------------------------------------------

    /// Compute the prediction this bridge makes after seeing `prev`.
    /// `None` when the draw lacks the digits the rule reads.
    pub fn predict(&self, prev: &DrawRecord) -> Option<Prediction> {
        match self {
            BridgeDefinition::Classic { id } => {
                let (a, b) = classic_digits(*id, prev)?;
                Some(Prediction::Pair(PairKey::from_digit_pair(a, b)))
            }
            BridgeDefinition::Position { pos1, pos2 } => {
                let a = positions::digit_at(prev, *pos1)?;
                let b = positions::digit_at(prev, *pos2)?;
                Some(Prediction::Pair(PairKey::from_digit_pair(a, b)))
            }
            BridgeDefinition::MemorySum { slot1, slot2 } => {
                let v1 = prev.memory_slot(*slot1)?;
                let v2 = prev.memory_slot(*slot2)?;
                let value = (v1 as u16 + v2 as u16) as u8 % 100;
                Some(Prediction::Pair(PairKey::new(value, reverse_digits(value))))
            }
            BridgeDefinition::MemoryDiff { slot1, slot2 } => {
                let v1 = prev.memory_slot(*slot1)?;
                let v2 = prev.memory_slot(*slot2)?;
                let value = v1.abs_diff(v2) % 100;
                Some(Prediction::Pair(PairKey::new(value, reverse_digits(value))))
            }
            BridgeDefinition::DynamicTouch { slot1, slot2, offset } => {
                let v1 = prev.memory_slot(*slot1)?;
                let v2 = prev.memory_slot(*slot2)?;
                let base = (v1 % 10 + v2 % 10) % 10;
                Some(Prediction::Touches(TouchSet::spread(base, *offset)))
            }
            BridgeDefinition::SetBridge { pos1, pos2 } => {
                let d1 = positions::digit_at(prev, *pos1)?;
                let d2 = positions::digit_at(prev, *pos2)?;
                Some(Prediction::Set(NumberSet::containing(d1 * 10 + d2)))
            }
        }
    }
}

// Rendered names must parse back; an index outside the table would
// encode as an empty segment and break the round trip.
fn position_label(idx: usize) -> String {
    let name = positions::position_name(idx);
    debug_assert!(name.is_some(), "position index {idx} outside the table");
    name.unwrap_or_default()
}

fn slot_label(slot: usize) -> String {
    let name = positions::slot_name(slot);
    debug_assert!(name.is_some(), "memory slot {slot} outside the table");
    name.unwrap_or_default()
}

fn parse_slot_pair(rest: &str) -> Option<(usize, usize)> {
    let (s1, s2) = rest.split_once('_')?;
    let slot1 = positions::slot_index(s1)?;
    let slot2 = positions::slot_index(s2)?;
    if slot1 == slot2 {
        return None;
    }
    Some((slot1, slot2))
}

/// The classic formula catalog. Each id reads a fixed pair of digits
/// out of the previous draw, some shifted by a modular offset.
fn classic_digits(id: u32, prev: &DrawRecord) -> Option<(u8, u8)> {
    let d = |idx: usize| positions::digit_at(prev, idx);
    let off = |v: u8, k: u8| (v + k) % 10;
    match id {
        // special pair shifted by +5
        1 => Some((off(d(3)?, 5), off(d(4)?, 5))),
        // tail of G6.3 against tail of G7.4
        2 => Some((d(98)?, d(106)?)),
        // special tail against first-prize tail
        3 => Some((d(4)?, d(9)?)),
        // special fourth digit against first-prize tail
        4 => Some((d(3)?, d(9)?)),
        // head of G7.1 against tail of G7.4
        5 => Some((d(99)?, d(106)?)),
        // tail of G7.2 against head of G7.3
        6 => Some((d(102)?, d(103)?)),
        // head of G5.1 against head of G7.1
        7 => Some((d(66)?, d(99)?)),
        // heads of G3.1 and G4.1
        8 => Some((d(20)?, d(50)?)),
        // heads of the special and first prizes
        9 => Some((d(0)?, d(5)?)),
        // G2.2 second digit against G3.3 tail
        10 => Some((d(16)?, d(34)?)),
        // special second digit against G3.2 tail
        11 => Some((d(1)?, d(29)?)),
        // special tail against G3.3 third digit
        12 => Some((d(4)?, d(32)?)),
        // G7.3 shifted by +8
        13 => Some((off(d(103)?, 8), off(d(104)?, 8))),
        // first-prize pair shifted by +2
        14 => Some((off(d(8)?, 2), off(d(9)?, 2))),
        // special pair shifted by +7
        15 => Some((off(d(3)?, 7), off(d(4)?, 7))),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
