//! Shared types for the CAULYTICS engine.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that bridge, backtest, cache
//! and scoring modules can depend on them without circular references.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Digit helpers
// ---------------------------------------------------------------------------

/// Reverse the two digits of a 00–99 value: 17 → 71, 30 → 3, 5 → 50.
pub fn reverse_digits(n: u8) -> u8 {
    (n % 10) * 10 + (n / 10)
}

/// Map a digit onto its shadow partner: 0↔5, 1↔6, 2↔7, 3↔8, 4↔9.
pub fn shadow_digit(d: u8) -> u8 {
    (d + 5) % 10
}

/// The trailing two digits of a prize value as a 0–99 number.
/// Returns `None` if the string has fewer than two digits or holds
/// any non-digit character.
pub fn trailing_pair(value: &str) -> Option<u8> {
    if value.len() < 2 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let tail = &value[value.len() - 2..];
    tail.parse::<u8>().ok()
}

// ---------------------------------------------------------------------------
// DrawRecord
// ---------------------------------------------------------------------------

/// One complete day's draw across all eight prize tiers.
///
/// Prize values are kept as digit strings because positional bridges
/// address individual digits, including leading zeros. Tier widths:
/// special and first are 5 digits, second 2×5, third 6×5, fourth 4×4,
/// fifth 6×4, sixth 3×3, seventh 4×2 — 27 values in total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawRecord {
    pub period: u32,
    pub date: NaiveDate,
    pub special: String,
    pub first: String,
    pub second: Vec<String>,
    pub third: Vec<String>,
    pub fourth: Vec<String>,
    pub fifth: Vec<String>,
    pub sixth: Vec<String>,
    pub seventh: Vec<String>,
}

impl fmt::Display for DrawRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} special={} loto_count={}",
            self.period,
            self.date,
            self.special,
            self.loto_set().len(),
        )
    }
}

impl DrawRecord {
    /// All 27 prize values in canonical tier order.
    pub fn prize_values(&self) -> Vec<&str> {
        let mut out = Vec::with_capacity(27);
        out.push(self.special.as_str());
        out.push(self.first.as_str());
        for tier in [
            &self.second,
            &self.third,
            &self.fourth,
            &self.fifth,
            &self.sixth,
            &self.seventh,
        ] {
            out.extend(tier.iter().map(|s| s.as_str()));
        }
        out
    }

    /// The day's de-duplicated set of trailing pairs across every prize.
    pub fn loto_set(&self) -> BTreeSet<u8> {
        self.prize_values()
            .into_iter()
            .filter_map(trailing_pair)
            .collect()
    }

    /// The trailing pair of the special prize, the đề result for the day.
    pub fn special_pair(&self) -> Option<u8> {
        trailing_pair(&self.special)
    }

    /// The trailing pair of prize value `slot` (0–26), the per-slot
    /// memory value used by sum/difference bridges.
    pub fn memory_slot(&self, slot: usize) -> Option<u8> {
        self.prize_values().get(slot).copied().and_then(trailing_pair)
    }

    /// Reason string when the row cannot be evaluated, `None` when it can.
    ///
    /// A malformed day is skipped and counted, never fatal to a backtest.
    pub fn malformed_reason(&self) -> Option<String> {
        if trailing_pair(&self.special).is_none() {
            return Some(format!("bad special prize '{}'", self.special));
        }
        if trailing_pair(&self.first).is_none() {
            return Some(format!("bad first prize '{}'", self.first));
        }
        let counts = [
            ("second", self.second.len(), 2usize),
            ("third", self.third.len(), 6),
            ("fourth", self.fourth.len(), 4),
            ("fifth", self.fifth.len(), 6),
            ("sixth", self.sixth.len(), 3),
            ("seventh", self.seventh.len(), 4),
        ];
        for (tier, got, want) in counts {
            if got != want {
                return Some(format!("{tier} tier has {got} values, expected {want}"));
            }
        }
        if self.loto_set().is_empty() {
            return Some("no parseable loto values".into());
        }
        None
    }

    /// Helper to build a deterministic draw with sensible tier shapes.
    #[cfg(test)]
    pub fn sample(period: u32) -> Self {
        DrawRecord {
            period,
            date: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .checked_add_days(chrono::Days::new(period as u64))
                .unwrap(),
            special: "12345".into(),
            first: "67890".into(),
            second: vec!["11111".into(), "22222".into()],
            third: vec![
                "33333".into(),
                "44444".into(),
                "55555".into(),
                "66666".into(),
                "77777".into(),
                "88888".into(),
            ],
            fourth: vec!["1234".into(), "5678".into(), "9012".into(), "3456".into()],
            fifth: vec![
                "1111".into(),
                "2222".into(),
                "3333".into(),
                "4444".into(),
                "5555".into(),
                "6666".into(),
            ],
            sixth: vec!["123".into(), "456".into(), "789".into()],
            seventh: vec!["12".into(), "34".into(), "56".into(), "78".into()],
        }
    }
}

// ---------------------------------------------------------------------------
// PairKey
// ---------------------------------------------------------------------------

/// A normalized unordered pair of 00–99 numbers, the unit a lô bridge
/// predicts. Ordering and equality are on the sorted members so that
/// "30-01" and "01-30" collapse to one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey {
    low: u8,
    high: u8,
}

impl PairKey {
    pub fn new(a: u8, b: u8) -> Self {
        let (a, b) = (a % 100, b % 100);
        if a <= b {
            PairKey { low: a, high: b }
        } else {
            PairKey { low: b, high: a }
        }
    }

    /// The pair spanned by two digits: distinct digits give (ab, ba),
    /// a doubled digit gives (aa, shadow(a)shadow(a)).
    pub fn from_digit_pair(a: u8, b: u8) -> Self {
        let (a, b) = (a % 10, b % 10);
        if a == b {
            let s = shadow_digit(a);
            PairKey::new(a * 11, s * 11)
        } else {
            PairKey::new(a * 10 + b, b * 10 + a)
        }
    }

    pub fn members(&self) -> (u8, u8) {
        (self.low, self.high)
    }

    pub fn contains(&self, n: u8) -> bool {
        self.low == n || self.high == n
    }

    /// Whether both members are double numbers (00, 11, … 99).
    pub fn is_double(&self) -> bool {
        self.low % 11 == 0 && self.high % 11 == 0
    }

    /// Whether any member appears in the day's loto set.
    pub fn hits(&self, loto: &BTreeSet<u8>) -> bool {
        loto.contains(&self.low) || loto.contains(&self.high)
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.low, self.high)
    }
}

impl std::str::FromStr for PairKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (a, b) = s
            .split_once('-')
            .ok_or_else(|| anyhow::anyhow!("pair key missing '-': {s}"))?;
        Ok(PairKey::new(a.trim().parse()?, b.trim().parse()?))
    }
}

// ---------------------------------------------------------------------------
// TouchSet
// ---------------------------------------------------------------------------

/// A canonical set of đề touch digits (0–9), sorted and de-duplicated.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TouchSet(Vec<u8>);

impl TouchSet {
    pub fn new(digits: impl IntoIterator<Item = u8>) -> Self {
        let mut v: Vec<u8> = digits.into_iter().map(|d| d % 10).collect();
        v.sort_unstable();
        v.dedup();
        TouchSet(v)
    }

    /// The four touches spread out from a base digit and offset:
    /// base+k, its shadow, base+k+1 and that digit's shadow.
    pub fn spread(base: u8, offset: u8) -> Self {
        let first = (base + offset) % 10;
        let second = (base + offset + 1) % 10;
        TouchSet::new([first, shadow_digit(first), second, shadow_digit(second)])
    }

    pub fn digits(&self) -> &[u8] {
        &self.0
    }

    pub fn contains(&self, digit: u8) -> bool {
        self.0.binary_search(&(digit % 10)).is_ok()
    }

    /// Whether a 00–99 value touches this set through either digit.
    pub fn matches(&self, value: u8) -> bool {
        self.contains(value / 10) || self.contains(value % 10)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TouchSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|d| d.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

// ---------------------------------------------------------------------------
// BridgeMetrics
// ---------------------------------------------------------------------------

/// One cached performance row for a bridge, mirroring the persisted
/// `bridge_metrics` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeMetrics {
    pub name: String,
    /// Bridge kind tag, e.g. "classic", "position", "memory", "touch", "set".
    pub kind: String,
    pub pos1_idx: Option<i64>,
    pub pos2_idx: Option<i64>,
    /// Rendered win rate, e.g. "57.14% (40/70)".
    pub win_rate_text: String,
    /// Signed streak: positive = consecutive wins, negative = consecutive
    /// misses, zero = no history.
    pub current_streak: i64,
    /// Worst consecutive-loss run under two-period evaluation.
    pub max_lose_streak_k2n: i64,
    /// Rendered prediction for the next undrawn period.
    pub next_prediction: String,
    /// Wins inside the trailing recent-form window.
    pub recent_win_count: i64,
    pub is_enabled: bool,
    pub is_pinned: bool,
    /// Period ordinal of the newest draw the metrics were computed
    /// against. Any draw appended past it makes the row stale.
    pub last_evaluated_period: i64,
}

impl fmt::Display for BridgeMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} streak={} max_lose_k2n={} next={} {}",
            self.name,
            self.kind,
            self.win_rate_text,
            self.current_streak,
            self.max_lose_streak_k2n,
            self.next_prediction,
            if self.is_enabled { "on" } else { "off" },
        )
    }
}

impl BridgeMetrics {
    /// Render a win rate the way the cache stores it.
    pub fn format_win_rate(wins: u32, total: u32) -> String {
        let pct = if total == 0 {
            0.0
        } else {
            wins as f64 / total as f64 * 100.0
        };
        format!("{pct:.2}% ({wins}/{total})")
    }

    /// Parse the percentage back out of `win_rate_text`.
    pub fn win_rate_percent(&self) -> Option<f64> {
        let head = self.win_rate_text.split('%').next()?;
        head.trim().parse::<f64>().ok()
    }

    #[cfg(test)]
    pub fn sample(name: &str) -> Self {
        BridgeMetrics {
            name: name.to_string(),
            kind: "position".into(),
            pos1_idx: Some(0),
            pos2_idx: Some(5),
            win_rate_text: BridgeMetrics::format_win_rate(40, 70),
            current_streak: 3,
            max_lose_streak_k2n: 4,
            next_prediction: "12-21".into(),
            recent_win_count: 5,
            is_enabled: true,
            is_pinned: false,
            last_evaluated_period: 7,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
