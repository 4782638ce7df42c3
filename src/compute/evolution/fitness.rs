//! Fitness functions and the per-run fitness cache.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::schema::CardCandidate;

/// A fitness function failed for one deck.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("fitness evaluation failed: {0}")]
pub struct FitnessError(pub String);

/// Scores a deck. Higher is better.
pub trait FitnessFunction: Send + Sync {
    fn fitness(&self, deck: &[String]) -> Result<f64, FitnessError>;
}

impl<F> FitnessFunction for F
where
    F: Fn(&[String]) -> f64 + Send + Sync,
{
    fn fitness(&self, deck: &[String]) -> Result<f64, FitnessError> {
        Ok(self(deck))
    }
}

/// Placeholder fitness: mean candidate score of the deck's cards.
///
/// Unknown cards contribute 0.
#[derive(Debug, Clone, Default)]
pub struct CandidateScoreFitness {
    scores: HashMap<String, f64>,
}

impl CandidateScoreFitness {
    pub fn new(candidates: &[CardCandidate]) -> Self {
        Self {
            scores: candidates
                .iter()
                .map(|c| (c.name.clone(), c.score))
                .collect(),
        }
    }
}

impl FitnessFunction for CandidateScoreFitness {
    fn fitness(&self, deck: &[String]) -> Result<f64, FitnessError> {
        if deck.is_empty() {
            return Ok(0.0);
        }
        let total: f64 = deck
            .iter()
            .map(|name| self.scores.get(name).copied().unwrap_or(0.0))
            .sum();
        Ok(total / deck.len() as f64)
    }
}

/// Fitness values keyed by order-independent deck identity.
#[derive(Debug, Default)]
pub struct FitnessCache {
    entries: RwLock<HashMap<String, f64>>,
}

impl FitnessCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries.read().get(key).copied()
    }

    pub fn insert(&self, key: String, fitness: f64) {
        self.entries.write().insert(key, fitness);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
