//! Resumable deck iterators, one per generation strategy.

mod exhaustive;
mod genetic;
mod sample;

pub use exhaustive::ExhaustiveIterator;
pub use genetic::GeneticIterator;
pub use sample::SampleIterator;

use crate::schema::{Deck, GeneratorCheckpoint, GeneratorStrategy};

use super::cancel::CancelToken;
use super::generator::GeneratorError;

/// Common contract of every deck iterator.
pub trait DeckIterator: Send {
    /// Strategy this iterator implements.
    fn strategy(&self) -> GeneratorStrategy;

    /// Advance by one unit of work.
    ///
    /// `Ok(None)` means exhausted and is returned again on every later call.
    fn next_deck(&mut self, cancel: &CancelToken) -> Result<Option<Deck>, GeneratorError>;

    /// Snapshot the current position.
    fn checkpoint(&self) -> GeneratorCheckpoint;

    /// Restore a snapshot taken by an iterator of the same strategy.
    fn resume(&mut self, checkpoint: &GeneratorCheckpoint) -> Result<(), GeneratorError>;

    /// Return to the initial state.
    fn reset(&mut self);

    /// Release held resources. Safe to call more than once.
    fn close(&mut self);
}

fn check_strategy(
    expected: GeneratorStrategy,
    checkpoint: &GeneratorCheckpoint,
) -> Result<(), GeneratorError> {
    if checkpoint.strategy != expected {
        return Err(GeneratorError::StrategyMismatch {
            expected,
            found: checkpoint.strategy,
        });
    }
    Ok(())
}

fn unexpected_state(expected: &str, checkpoint: &GeneratorCheckpoint) -> GeneratorError {
    GeneratorError::InvalidCheckpoint(format!(
        "expected {expected} state, found {}",
        checkpoint.state.kind()
    ))
}
