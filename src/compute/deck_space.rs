//! Deck-space size calculations.
//!
//! Counts the raw and role-constrained search spaces of a candidate pool
//! without enumerating them. All counts use arbitrary-precision integers since
//! `C(n, 8)` overflows 64 bits for realistic pools well before n reaches 300.

use std::collections::BTreeMap;

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};

use crate::schema::{CardCandidate, CardRole, DECK_SIZE, RoleComposition};

/// An average-elixir bucket used for reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElixirRange {
    pub min: f64,
    pub max: f64,
    pub label: &'static str,
}

/// Buckets used by deck-space statistics.
pub const STANDARD_ELIXIR_RANGES: [ElixirRange; 7] = [
    ElixirRange { min: 0.0, max: 2.5, label: "Very Fast" },
    ElixirRange { min: 2.5, max: 3.0, label: "Fast" },
    ElixirRange { min: 3.0, max: 3.5, label: "Medium-Fast" },
    ElixirRange { min: 3.5, max: 4.0, label: "Medium" },
    ElixirRange { min: 4.0, max: 4.5, label: "Medium-Slow" },
    ElixirRange { min: 4.5, max: 5.0, label: "Slow" },
    ElixirRange { min: 5.0, max: 10.0, label: "Very Slow (5.0+)" },
];

/// Archetypes used for the rough per-archetype split.
pub const ARCHETYPES: [&str; 6] = ["Beatdown", "Control", "Cycle", "Siege", "Bridge Spam", "Bait"];

/// Binomial coefficient `C(n, k)`.
///
/// Returns 0 when `k < 0` or `k > n`, and 1 when `k == 0`.
pub fn combinations(n: i64, k: i64) -> BigUint {
    if k < 0 || k > n {
        return BigUint::zero();
    }
    if k == 0 || k == n {
        return BigUint::one();
    }

    let k = k.min(n - k);
    let mut result = BigUint::one();
    for i in 0..k {
        // After this step result == C(n, i + 1), so the division is exact.
        result *= BigUint::from((n - i) as u64);
        result /= BigUint::from((i + 1) as u64);
    }
    result
}

/// Summary of a candidate pool's search space.
#[derive(Debug, Clone, PartialEq)]
pub struct DeckSpaceStats {
    /// Cards in the pool.
    pub total_cards: usize,
    /// Cards per role. Cards without a role are not counted.
    pub cards_by_role: BTreeMap<CardRole, usize>,
    /// `C(n, 8)`.
    pub total_combinations: BigUint,
    /// Combinations matching the role composition exactly.
    pub valid_combinations: BigUint,
    /// Estimated valid combinations per average-elixir bucket, in bucket order.
    pub by_elixir_range: Vec<(&'static str, BigUint)>,
    /// Estimated valid combinations per archetype.
    pub by_archetype: BTreeMap<&'static str, BigUint>,
}

/// Counts deck combinations over a fixed candidate pool.
#[derive(Debug, Clone)]
pub struct DeckSpaceCalculator {
    elixir: Vec<u32>,
    cards_by_role: BTreeMap<CardRole, usize>,
    composition: RoleComposition,
}

impl DeckSpaceCalculator {
    /// Snapshot a candidate pool, using the default composition.
    pub fn new(candidates: &[CardCandidate]) -> Self {
        let mut cards_by_role = BTreeMap::new();
        for card in candidates {
            if let Some(role) = card.role {
                *cards_by_role.entry(role).or_insert(0) += 1;
            }
        }

        Self {
            elixir: candidates.iter().map(|c| c.elixir).collect(),
            cards_by_role,
            composition: RoleComposition::default(),
        }
    }

    /// Use a different role composition for constrained counts.
    pub fn with_composition(mut self, composition: RoleComposition) -> Self {
        self.composition = composition;
        self
    }

    /// Number of cards in the pool.
    pub fn total_cards(&self) -> usize {
        self.elixir.len()
    }

    /// Unconstrained `C(n, 8)`.
    pub fn total_combinations(&self) -> BigUint {
        combinations(self.elixir.len() as i64, DECK_SIZE as i64)
    }

    /// Product of per-role `C(available, target)`.
    ///
    /// Zero if any role has fewer cards than its target.
    pub fn constrained_combinations(&self) -> BigUint {
        let mut result = BigUint::one();
        for (role, target) in self.composition.quotas() {
            let available = self.cards_by_role.get(&role).copied().unwrap_or(0);
            if available < target {
                return BigUint::zero();
            }
            result *= combinations(available as i64, target as i64);
        }
        result
    }

    /// Full statistics block.
    pub fn calculate_stats(&self) -> DeckSpaceStats {
        let valid = self.constrained_combinations();
        DeckSpaceStats {
            total_cards: self.total_cards(),
            cards_by_role: self.cards_by_role.clone(),
            total_combinations: self.total_combinations(),
            by_elixir_range: self.estimate_by_elixir(&valid),
            by_archetype: self.estimate_by_archetype(&valid),
            valid_combinations: valid,
        }
    }

    /// Bell-curve heuristic around the pool's mean elixir cost.
    fn estimate_by_elixir(&self, valid: &BigUint) -> Vec<(&'static str, BigUint)> {
        let avg = if self.elixir.is_empty() {
            0.0
        } else {
            self.elixir.iter().map(|&e| e as f64).sum::<f64>() / self.elixir.len() as f64
        };

        STANDARD_ELIXIR_RANGES
            .iter()
            .map(|range| {
                let mid = (range.min + range.max) / 2.0;
                let proportion = (-(avg - mid).abs() / 0.5).exp();
                let percentage = (proportion * 100.0) as u64;
                (range.label, valid / 100u32 * percentage)
            })
            .collect()
    }

    fn estimate_by_archetype(&self, valid: &BigUint) -> BTreeMap<&'static str, BigUint> {
        let per_archetype = valid / ARCHETYPES.len() as u32;
        ARCHETYPES
            .iter()
            .map(|name| (*name, per_archetype.clone()))
            .collect()
    }
}

/// Human-readable count with K/M/B/T suffixes at one decimal.
///
/// `None` renders as "0"; values below 1000 print in full.
pub fn format_large_number(n: Option<&BigUint>) -> String {
    let Some(n) = n else {
        return "0".to_string();
    };
    let value = n.to_f64().unwrap_or(f64::INFINITY);

    if value >= 1e12 {
        format!("{:.1}T", value / 1e12)
    } else if value >= 1e9 {
        format!("{:.1}B", value / 1e9)
    } else if value >= 1e6 {
        format!("{:.1}M", value / 1e6)
    } else if value >= 1e3 {
        format!("{:.1}K", value / 1e3)
    } else {
        n.to_string()
    }
}
