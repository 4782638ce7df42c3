//! Iterator checkpoints.

use serde::{Deserialize, Serialize};

use super::generator::GeneratorStrategy;

/// Strategy-specific iteration state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CheckpointState {
    /// Current lexicographic combination and exhaustion flag.
    Exhaustive { indices: Vec<usize>, done: bool },
    /// Remaining sample budget.
    Sample { remaining: usize },
    /// Next hall-of-fame rank to yield and exhaustion flag.
    Genetic { rank: usize, done: bool },
}

impl CheckpointState {
    /// Variant name, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            CheckpointState::Exhaustive { .. } => "exhaustive",
            CheckpointState::Sample { .. } => "sample",
            CheckpointState::Genetic { .. } => "genetic",
        }
    }
}

/// Snapshot of an iterator's position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorCheckpoint {
    /// Strategy that produced the checkpoint.
    pub strategy: GeneratorStrategy,
    /// Display-only position. Lossy for the exhaustive strategy.
    #[serde(default)]
    pub position: u64,
    /// Decks produced so far, including skipped ones.
    pub generated: u64,
    /// State needed to resume.
    pub state: CheckpointState,
}

/// Pack up to 8 indices into a single integer, one byte each.
///
/// Indices above 255 are truncated, so the result is only suitable for display.
pub fn pack_position(indices: &[usize]) -> u64 {
    indices
        .iter()
        .take(8)
        .enumerate()
        .fold(0u64, |acc, (i, &idx)| acc | (((idx & 0xFF) as u64) << (i * 8)))
}
