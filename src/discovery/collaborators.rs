//! External collaborators of a discovery session: the deck evaluator and the
//! result store.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::compute::evolution::{FitnessError, FitnessFunction};
use crate::schema::GeneratorStrategy;

/// One evaluated deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Store-assigned id, 0 until inserted.
    #[serde(default)]
    pub id: u64,
    /// Order-independent identity of `cards`.
    pub deck_hash: String,
    pub cards: Vec<String>,
    pub overall_score: f64,
    #[serde(default)]
    pub attack_score: f64,
    #[serde(default)]
    pub defense_score: f64,
    #[serde(default)]
    pub synergy_score: f64,
    #[serde(default)]
    pub versatility_score: f64,
    #[serde(default)]
    pub f2p_score: f64,
    #[serde(default)]
    pub playability_score: f64,
    #[serde(default)]
    pub archetype: String,
    #[serde(default)]
    pub archetype_confidence: f64,
    pub strategy: GeneratorStrategy,
    #[serde(default)]
    pub avg_elixir: f64,
    pub evaluated_at: DateTime<Utc>,
    #[serde(default)]
    pub player_tag: String,
    #[serde(default)]
    pub evaluation_version: String,
}

impl ScoreRecord {
    /// A record with only the overall score set.
    pub fn new(cards: Vec<String>, overall_score: f64, strategy: GeneratorStrategy) -> Self {
        Self {
            id: 0,
            deck_hash: deck_hash(&cards),
            cards,
            overall_score,
            attack_score: 0.0,
            defense_score: 0.0,
            synergy_score: 0.0,
            versatility_score: 0.0,
            f2p_score: 0.0,
            playability_score: 0.0,
            archetype: String::new(),
            archetype_confidence: 0.0,
            strategy,
            avg_elixir: 0.0,
            evaluated_at: Utc::now(),
            player_tag: String::new(),
            evaluation_version: String::new(),
        }
    }
}

/// Sorted card names joined with '|'.
pub fn deck_hash(cards: &[String]) -> String {
    let mut sorted: Vec<&str> = cards.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.join("|")
}

/// Evaluator failure for a single deck.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("evaluation failed: {0}")]
pub struct EvaluationError(pub String);

/// Result store failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("store error: {0}")]
pub struct StoreError(pub String);

/// Scores a deck.
pub trait DeckEvaluator: Send + Sync {
    fn evaluate(&self, deck: &[String]) -> Result<ScoreRecord, EvaluationError>;
}

/// Outcome of [`ResultStore::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOutcome {
    pub id: u64,
    /// The deck was already stored.
    pub duplicate: bool,
}

/// Column to sort stored results by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Overall,
    Attack,
    Defense,
    Synergy,
    Versatility,
    EvaluatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortField::Overall => "overall_score",
            SortField::Attack => "attack_score",
            SortField::Defense => "defense_score",
            SortField::Synergy => "synergy_score",
            SortField::Versatility => "versatility_score",
            SortField::EvaluatedAt => "evaluated_at",
        };
        f.write_str(name)
    }
}

/// Persists evaluated decks.
pub trait ResultStore: Send + Sync {
    fn insert(&self, record: ScoreRecord) -> Result<InsertOutcome, StoreError>;

    fn query(
        &self,
        field: SortField,
        order: SortOrder,
        limit: usize,
    ) -> Result<Vec<ScoreRecord>, StoreError>;
}

/// Uses an evaluator's overall score as genetic fitness.
pub struct EvaluatorFitness {
    evaluator: Arc<dyn DeckEvaluator>,
}

impl EvaluatorFitness {
    pub fn new(evaluator: Arc<dyn DeckEvaluator>) -> Self {
        Self { evaluator }
    }
}

impl FitnessFunction for EvaluatorFitness {
    fn fitness(&self, deck: &[String]) -> Result<f64, FitnessError> {
        self.evaluator
            .evaluate(deck)
            .map(|record| record.overall_score)
            .map_err(|e| FitnessError(e.to_string()))
    }
}
