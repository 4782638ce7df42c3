//! Persisted discovery session state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::checkpoint::GeneratorCheckpoint;
use super::generator::GeneratorStrategy;

/// Running statistics of a discovery session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryStats {
    /// Decks evaluated.
    pub evaluated: u64,
    /// Known number of decks the strategy will produce (0 = unknown).
    #[serde(default)]
    pub total: u64,
    /// Decks newly stored (duplicates excluded).
    pub stored: u64,
    /// Best overall scores, descending.
    #[serde(default)]
    pub top_scores: Vec<f64>,
    /// Mean overall score.
    pub avg_score: f64,
    /// Decks per second in the current session.
    pub rate: f64,
    /// Estimated seconds remaining, when the total is known.
    #[serde(default)]
    pub eta_seconds: Option<f64>,
    /// Highest scoring deck so far.
    #[serde(default)]
    pub best_deck: Vec<String>,
    /// Score of `best_deck`.
    pub best_score: f64,
    /// Session start.
    pub start_time: DateTime<Utc>,
    /// Seconds since `start_time`.
    pub elapsed_seconds: f64,
    /// Strategy driving the session.
    pub strategy: GeneratorStrategy,
    /// Player tag with leading '#'.
    pub player_tag: String,
}

impl DiscoveryStats {
    /// Fresh statistics for a session.
    pub fn new(strategy: GeneratorStrategy, sanitized_tag: &str, total: u64) -> Self {
        Self {
            evaluated: 0,
            total,
            stored: 0,
            top_scores: Vec::new(),
            avg_score: 0.0,
            rate: 0.0,
            eta_seconds: None,
            best_deck: Vec::new(),
            best_score: 0.0,
            start_time: Utc::now(),
            elapsed_seconds: 0.0,
            strategy,
            player_tag: format!("#{sanitized_tag}"),
        }
    }
}

/// Everything needed to resume a discovery session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryCheckpoint {
    /// Iterator position.
    pub generator_checkpoint: GeneratorCheckpoint,
    /// Statistics at the time of the checkpoint.
    pub stats: DiscoveryStats,
    /// When the checkpoint was written.
    pub timestamp: DateTime<Utc>,
    /// Sanitized player tag.
    pub player_tag: String,
    /// Strategy driving the session.
    pub strategy: GeneratorStrategy,
}
