//! Generator configuration: strategy selection, constraints and sampling knobs.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::card::{CardCandidate, RoleComposition};
use super::evolution::GeneticConfig;

/// Default number of decks drawn by the sampling strategies.
pub const DEFAULT_SAMPLE_SIZE: usize = 1000;

/// Deck generation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorStrategy {
    /// Every 8-card combination in lexicographic order.
    Exhaustive,
    /// Uniform per-role sampling.
    #[default]
    RandomSample,
    /// Score-weighted per-role sampling.
    SmartSample,
    /// Score-weighted sampling aimed at one archetype.
    ArchetypeFocused,
    /// Genetic optimization, yielding the hall of fame.
    Genetic,
}

impl GeneratorStrategy {
    /// Stable string key, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            GeneratorStrategy::Exhaustive => "exhaustive",
            GeneratorStrategy::RandomSample => "random_sample",
            GeneratorStrategy::SmartSample => "smart_sample",
            GeneratorStrategy::ArchetypeFocused => "archetype_focused",
            GeneratorStrategy::Genetic => "genetic",
        }
    }

    /// Whether the strategy draws a fixed sample budget.
    pub fn is_sampling(&self) -> bool {
        matches!(
            self,
            GeneratorStrategy::RandomSample
                | GeneratorStrategy::SmartSample
                | GeneratorStrategy::ArchetypeFocused
        )
    }
}

impl fmt::Display for GeneratorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deck validation policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConstraints {
    /// Minimum average elixir cost.
    #[serde(default = "default_min_avg_elixir")]
    pub min_avg_elixir: f64,
    /// Maximum average elixir cost.
    #[serde(default = "default_max_avg_elixir")]
    pub max_avg_elixir: f64,
    /// Cards every deck must contain.
    #[serde(default)]
    pub include_cards: Vec<String>,
    /// Cards removed from the pool.
    #[serde(default)]
    pub exclude_cards: Vec<String>,
    /// Require at least one win condition.
    #[serde(default = "default_true")]
    pub require_win_condition: bool,
    /// Minimum number of evolved cards.
    #[serde(default)]
    pub min_evolution_cards: usize,
    /// Blend candidate scores with level progression before ranking.
    #[serde(default)]
    pub prefer_high_level: bool,
}

fn default_min_avg_elixir() -> f64 {
    2.0
}

fn default_max_avg_elixir() -> f64 {
    5.0
}

fn default_true() -> bool {
    true
}

impl Default for GeneratorConstraints {
    fn default() -> Self {
        Self {
            min_avg_elixir: default_min_avg_elixir(),
            max_avg_elixir: default_max_avg_elixir(),
            include_cards: Vec::new(),
            exclude_cards: Vec::new(),
            require_win_condition: true,
            min_evolution_cards: 0,
            prefer_high_level: false,
        }
    }
}

impl GeneratorConstraints {
    /// Constraints that accept any 8 distinct pool cards.
    pub fn permissive() -> Self {
        Self {
            min_avg_elixir: 0.0,
            max_avg_elixir: f64::MAX,
            require_win_condition: false,
            ..Default::default()
        }
    }
}

/// Deck generator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Generation strategy.
    #[serde(default)]
    pub strategy: GeneratorStrategy,
    /// Candidate pool.
    pub candidates: Vec<CardCandidate>,
    /// Target role composition. Defaults when absent.
    #[serde(default)]
    pub composition: Option<RoleComposition>,
    /// Validation constraints. Defaults when absent.
    #[serde(default)]
    pub constraints: Option<GeneratorConstraints>,
    /// Random seed. 0 draws a seed from entropy.
    #[serde(default)]
    pub seed: u64,
    /// Decks drawn by sampling strategies. 0 means the default.
    #[serde(default)]
    pub sample_size: usize,
    /// Independent generators used by parallel generation.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Archetype targeted by the archetype-focused strategy.
    #[serde(default)]
    pub archetype: Option<String>,
    /// Genetic optimizer settings. Defaults when absent.
    #[serde(default)]
    pub genetic: Option<GeneticConfig>,
}

fn default_workers() -> usize {
    1
}

impl GeneratorConfig {
    /// Configuration for a strategy over a candidate pool, everything else default.
    pub fn new(strategy: GeneratorStrategy, candidates: Vec<CardCandidate>) -> Self {
        Self {
            strategy,
            candidates,
            workers: default_workers(),
            ..Default::default()
        }
    }

    /// Sample budget with the default applied.
    pub fn effective_sample_size(&self) -> usize {
        if self.sample_size == 0 {
            DEFAULT_SAMPLE_SIZE
        } else {
            self.sample_size
        }
    }
}
