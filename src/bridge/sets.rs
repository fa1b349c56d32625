//! Named đề number sets.
//!
//! Every 00–99 value belongs to exactly one of 15 sets, identified by
//! the sorted pair of base digits (0–4) its two digits reduce to under
//! the shadow map. The 5 doubled ids ("00"…"44") hold 4 numbers each,
//! the 10 mixed ids ("01"…"34") hold 8, covering all 100 values.

use crate::types::shadow_digit;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Total number of named sets.
pub const SET_COUNT: usize = 15;

/// A canonical set id: two base digits, both 0–4, low first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NumberSet {
    a: u8,
    b: u8,
}

impl NumberSet {
    /// Build from two digits of any value; each digit reduces to its
    /// base partner (d and shadow(d) share a base).
    pub fn from_digits(x: u8, y: u8) -> Self {
        let (mut a, mut b) = (x % 10 % 5, y % 10 % 5);
        if a > b {
            std::mem::swap(&mut a, &mut b);
        }
        NumberSet { a, b }
    }

    /// The unique set containing a 00–99 value.
    pub fn containing(value: u8) -> Self {
        let value = value % 100;
        NumberSet::from_digits(value / 10, value % 10)
    }

    /// Parse a two-character id like "01" or "44".
    pub fn parse(name: &str) -> Option<Self> {
        let bytes = name.as_bytes();
        if bytes.len() != 2 || !bytes.iter().all(|b| (b'0'..=b'4').contains(b)) {
            return None;
        }
        let (a, b) = (bytes[0] - b'0', bytes[1] - b'0');
        if a > b {
            return None;
        }
        Some(NumberSet { a, b })
    }

    /// All 15 sets in id order.
    pub fn all() -> impl Iterator<Item = NumberSet> {
        (0u8..5).flat_map(|a| (a..5).map(move |b| NumberSet { a, b }))
    }

    pub fn is_double(&self) -> bool {
        self.a == self.b
    }

    /// Member values: every combination of each digit with its shadow,
    /// in both digit orders. 4 values for doubled ids, 8 otherwise.
    pub fn members(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8);
        for x in [self.a, shadow_digit(self.a)] {
            for y in [self.b, shadow_digit(self.b)] {
                out.push(x * 10 + y);
                out.push(y * 10 + x);
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn contains(&self, value: u8) -> bool {
        NumberSet::containing(value) == *self
    }
}

impl fmt::Display for NumberSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.a, self.b)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_double_set_members() {
        let set = NumberSet::parse("00").unwrap();
        assert!(set.is_double());
        assert_eq!(set.members(), vec![0, 5, 50, 55]);
    }

    #[test]
    fn test_mixed_set_members() {
        let set = NumberSet::parse("01").unwrap();
        assert!(!set.is_double());
        assert_eq!(set.members(), vec![1, 6, 10, 15, 51, 56, 60, 65]);
    }

    #[test]
    fn test_sets_partition_all_values() {
        let mut seen = BTreeSet::new();
        for set in NumberSet::all() {
            for v in set.members() {
                assert!(seen.insert(v), "value {v:02} in two sets");
            }
        }
        assert_eq!(seen.len(), 100);
    }

    #[test]
    fn test_all_count_and_sizes() {
        let sets: Vec<_> = NumberSet::all().collect();
        assert_eq!(sets.len(), SET_COUNT);
        assert_eq!(sets.iter().filter(|s| s.is_double()).count(), 5);
        assert_eq!(sets.iter().filter(|s| s.members().len() == 8).count(), 10);
    }

    #[test]
    fn test_containing_matches_membership() {
        for v in 0..100u8 {
            let set = NumberSet::containing(v);
            assert!(set.members().contains(&v));
            assert!(set.contains(v));
        }
        // 65 → digits 6,5 → bases 1,0 → set "01"
        assert_eq!(NumberSet::containing(65).to_string(), "01");
    }

    #[test]
    fn test_parse_rejects_bad_ids() {
        assert!(NumberSet::parse("10").is_none()); // not sorted
        assert!(NumberSet::parse("05").is_none()); // digit out of base range
        assert!(NumberSet::parse("0").is_none());
        assert!(NumberSet::parse("012").is_none());
        assert_eq!(NumberSet::parse("34").unwrap().to_string(), "34");
    }
}
