//! The digit position table.
//!
//! Every digit of every prize value gets a stable index: 107 base
//! positions laid out tier by tier (special 0–4, first 5–9, second
//! 10–19, third 20–49, fourth 50–65, fifth 66–89, sixth 90–98,
//! seventh 99–106), then one shadow twin per base position at
//! index + 107 which reads the same digit through the shadow map.
//! Positional bridges reference a pair of these indices.

use crate::types::{shadow_digit, DrawRecord};

/// Number of plain digit positions across all 27 prize values.
pub const BASE_POSITIONS: usize = 107;
/// Base positions plus their shadow twins.
pub const TOTAL_POSITIONS: usize = 2 * BASE_POSITIONS;

struct Tier {
    label: &'static str,
    entries: usize,
    width: usize,
}

// Tier order matches DrawRecord::prize_values.
const TIERS: &[Tier] = &[
    Tier { label: "GDB", entries: 1, width: 5 },
    Tier { label: "G1", entries: 1, width: 5 },
    Tier { label: "G2", entries: 2, width: 5 },
    Tier { label: "G3", entries: 6, width: 5 },
    Tier { label: "G4", entries: 4, width: 4 },
    Tier { label: "G5", entries: 6, width: 4 },
    Tier { label: "G6", entries: 3, width: 3 },
    Tier { label: "G7", entries: 4, width: 2 },
];

/// Whether the index addresses a shadow twin.
pub fn is_shadow(idx: usize) -> bool {
    (BASE_POSITIONS..TOTAL_POSITIONS).contains(&idx)
}

/// Locate a base index inside the tier table.
/// Returns (tier, entry within tier, digit offset, flat prize index).
fn locate(base_idx: usize) -> Option<(&'static Tier, usize, usize, usize)> {
    let mut digit_start = 0usize;
    let mut prize_start = 0usize;
    for tier in TIERS {
        let tier_digits = tier.entries * tier.width;
        if base_idx < digit_start + tier_digits {
            let within = base_idx - digit_start;
            let entry = within / tier.width;
            let offset = within % tier.width;
            return Some((tier, entry, offset, prize_start + entry));
        }
        digit_start += tier_digits;
        prize_start += tier.entries;
    }
    None
}

/// Human name of a position index, e.g. `GDB[0]`, `G3.2[4]`,
/// `Bong(G7.4[1])`. Returns `None` past the table.
pub fn position_name(idx: usize) -> Option<String> {
    if is_shadow(idx) {
        return Some(format!("Bong({})", position_name(idx - BASE_POSITIONS)?));
    }
    let (tier, entry, offset, _) = locate(idx)?;
    if tier.entries == 1 {
        Some(format!("{}[{}]", tier.label, offset))
    } else {
        Some(format!("{}.{}[{}]", tier.label, entry + 1, offset))
    }
}

/// Inverse of [`position_name`].
pub fn position_index(name: &str) -> Option<usize> {
    if let Some(inner) = name.strip_prefix("Bong(").and_then(|s| s.strip_suffix(')')) {
        return Some(position_index(inner)? + BASE_POSITIONS);
    }
    let (head, rest) = name.split_once('[')?;
    let offset: usize = rest.strip_suffix(']')?.parse().ok()?;
    let (label, entry) = match head.split_once('.') {
        Some((label, ord)) => (label, ord.parse::<usize>().ok()?.checked_sub(1)?),
        None => (head, 0),
    };

    let mut digit_start = 0usize;
    for tier in TIERS {
        if tier.label == label {
            if entry >= tier.entries || offset >= tier.width {
                return None;
            }
            // single-entry tiers take no ordinal, multi-entry tiers require one
            if (tier.entries == 1) == head.contains('.') {
                return None;
            }
            return Some(digit_start + entry * tier.width + offset);
        }
        digit_start += tier.entries * tier.width;
    }
    None
}

/// Read the digit a position index addresses in a draw.
///
/// Prize strings shorter than their tier width are left-padded with
/// zeros, longer ones are read from their tail. Shadow indices route
/// the base digit through the shadow map. `None` for non-digit prize
/// text or an out-of-table index.
pub fn digit_at(draw: &DrawRecord, idx: usize) -> Option<u8> {
    if is_shadow(idx) {
        return digit_at(draw, idx - BASE_POSITIONS).map(shadow_digit);
    }
    let (tier, _, offset, prize_idx) = locate(idx)?;
    let values = draw.prize_values();
    let raw = values.get(prize_idx)?;
    if !raw.bytes().all(|b| b.is_ascii_digit()) || raw.is_empty() {
        return None;
    }
    let bytes = raw.as_bytes();
    let digit = if bytes.len() >= tier.width {
        // read from the tail so trailing pairs stay aligned
        let tail = &bytes[bytes.len() - tier.width..];
        tail[offset] - b'0'
    } else {
        let pad = tier.width - bytes.len();
        if offset < pad {
            0
        } else {
            bytes[offset - pad] - b'0'
        }
    };
    Some(digit)
}

// ---------------------------------------------------------------------------
// Memory slots
// ---------------------------------------------------------------------------

/// Number of per-prize memory slots (one trailing pair per prize value).
pub const MEMORY_SLOTS: usize = 27;

/// Name of a memory slot: single-entry tiers are bare (`GDB`, `G1`),
/// multi-entry tiers carry a 1-based ordinal (`G3.5`).
pub fn slot_name(slot: usize) -> Option<String> {
    let mut start = 0usize;
    for tier in TIERS {
        if slot < start + tier.entries {
            let entry = slot - start;
            return if tier.entries == 1 {
                Some(tier.label.to_string())
            } else {
                Some(format!("{}.{}", tier.label, entry + 1))
            };
        }
        start += tier.entries;
    }
    None
}

/// Inverse of [`slot_name`].
pub fn slot_index(name: &str) -> Option<usize> {
    let (label, entry) = match name.split_once('.') {
        Some((label, ord)) => (label, ord.parse::<usize>().ok()?.checked_sub(1)?),
        None => (name, 0),
    };
    let mut start = 0usize;
    for tier in TIERS {
        if tier.label == label {
            if entry >= tier.entries {
                return None;
            }
            if (tier.entries == 1) == name.contains('.') {
                return None;
            }
            return Some(start + entry);
        }
        start += tier.entries;
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
