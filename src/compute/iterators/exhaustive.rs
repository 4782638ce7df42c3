//! Lexicographic enumeration of every 8-card combination.

use std::sync::Arc;

use crate::compute::cancel::CancelToken;
use crate::compute::generator::{DeckGenerator, GeneratorError};
use crate::schema::{
    CheckpointState, DECK_SIZE, Deck, GeneratorCheckpoint, GeneratorStrategy, pack_position,
};

use super::{DeckIterator, check_strategy, unexpected_state};

/// Walks `C(n, 8)` index combinations over the score-sorted pool.
///
/// Invalid decks are skipped but still advance `generated`.
pub struct ExhaustiveIterator {
    generator: Arc<DeckGenerator>,
    indices: Vec<usize>,
    n: usize,
    done: bool,
    generated: u64,
}

impl ExhaustiveIterator {
    pub fn new(generator: Arc<DeckGenerator>) -> Self {
        let n = generator.candidates().len();
        Self {
            generator,
            indices: (0..DECK_SIZE).collect(),
            n,
            done: n < DECK_SIZE,
            generated: 0,
        }
    }

    /// Current combination, for display.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    fn current_deck(&self) -> Deck {
        self.indices
            .iter()
            .map(|&i| self.generator.candidates()[i].name.clone())
            .collect()
    }

    /// Step to the next combination in lexicographic order.
    ///
    /// Returns false once the last combination has been passed.
    fn advance(&mut self) -> bool {
        let k = DECK_SIZE;
        let Some(i) = (0..k).rev().find(|&i| self.indices[i] < self.n - k + i) else {
            return false;
        };
        self.indices[i] += 1;
        for j in i + 1..k {
            self.indices[j] = self.indices[j - 1] + 1;
        }
        true
    }
}

impl DeckIterator for ExhaustiveIterator {
    fn strategy(&self) -> GeneratorStrategy {
        GeneratorStrategy::Exhaustive
    }

    fn next_deck(&mut self, cancel: &CancelToken) -> Result<Option<Deck>, GeneratorError> {
        loop {
            if cancel.is_cancelled() {
                return Err(GeneratorError::Cancelled);
            }
            if self.done {
                return Ok(None);
            }

            let deck = self.current_deck();
            self.generated += 1;
            if !self.advance() {
                self.done = true;
            }

            match self.generator.validate_deck(&deck) {
                Ok(()) => return Ok(Some(deck)),
                Err(e) => log::trace!("skipping combination: {e}"),
            }
        }
    }

    fn checkpoint(&self) -> GeneratorCheckpoint {
        GeneratorCheckpoint {
            strategy: GeneratorStrategy::Exhaustive,
            position: pack_position(&self.indices),
            generated: self.generated,
            state: CheckpointState::Exhaustive {
                indices: self.indices.clone(),
                done: self.done,
            },
        }
    }

    fn resume(&mut self, checkpoint: &GeneratorCheckpoint) -> Result<(), GeneratorError> {
        check_strategy(GeneratorStrategy::Exhaustive, checkpoint)?;
        let CheckpointState::Exhaustive { indices, done } = &checkpoint.state else {
            return Err(unexpected_state("exhaustive", checkpoint));
        };

        if indices.len() != DECK_SIZE {
            return Err(GeneratorError::InvalidCheckpoint(format!(
                "expected {DECK_SIZE} indices, got {}",
                indices.len()
            )));
        }
        if !indices.windows(2).all(|w| w[0] < w[1]) {
            return Err(GeneratorError::InvalidCheckpoint(format!(
                "indices not strictly ascending: {indices:?}"
            )));
        }
        if !*done && indices.last().is_some_and(|&last| last >= self.n) {
            return Err(GeneratorError::InvalidCheckpoint(format!(
                "index out of range for a pool of {}: {indices:?}",
                self.n
            )));
        }

        self.indices = indices.clone();
        self.done = *done;
        self.generated = checkpoint.generated;
        Ok(())
    }

    fn reset(&mut self) {
        self.indices = (0..DECK_SIZE).collect();
        self.done = self.n < DECK_SIZE;
        self.generated = 0;
    }

    fn close(&mut self) {
        self.done = true;
    }
}
