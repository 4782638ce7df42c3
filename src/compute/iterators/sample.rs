//! Quota-bounded random and score-weighted deck sampling.

use std::collections::HashSet;
use std::sync::Arc;

use rand::prelude::*;
use rand_distr::WeightedIndex;

use crate::compute::cancel::CancelToken;
use crate::compute::generator::{DeckError, DeckGenerator, GeneratorError};
use crate::schema::{CardRole, CheckpointState, Deck, GeneratorCheckpoint, GeneratorStrategy};

use super::{DeckIterator, check_strategy, unexpected_state};

/// Attempts per deck before giving up on the current draw.
pub const MAX_ATTEMPTS: usize = 100;

/// Draws decks until the sample budget is spent.
///
/// `RandomSample` shuffles each role uniformly using the generator's shared
/// random source. `SmartSample` and `ArchetypeFocused` weight each card by
/// its score squared and use a private source seeded from the generator.
/// A failed draw still spends one unit of budget.
pub struct SampleIterator {
    generator: Arc<DeckGenerator>,
    strategy: GeneratorStrategy,
    rng: StdRng,
    remaining: usize,
    generated: u64,
}

impl SampleIterator {
    pub fn new(generator: Arc<DeckGenerator>, strategy: GeneratorStrategy) -> Self {
        if strategy == GeneratorStrategy::ArchetypeFocused {
            log::info!(
                "archetype-focused sampling for {}",
                generator.archetype().unwrap_or("any archetype")
            );
        }
        Self {
            rng: StdRng::seed_from_u64(generator.seed()),
            remaining: generator.sample_size(),
            generated: 0,
            strategy,
            generator,
        }
    }

    /// Budget left.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    fn weighted(&self) -> bool {
        self.strategy != GeneratorStrategy::RandomSample
    }

    fn draw(&mut self) -> Deck {
        let generator = Arc::clone(&self.generator);
        if self.weighted() {
            let rng = &mut self.rng;
            generator.assemble_deck(|role, count, used| {
                select_weighted_from_role(&generator, rng, role, count, used)
            })
        } else {
            generator.assemble_deck(|role, count, used| {
                generator.select_random_from_role(role, count, used)
            })
        }
    }
}

/// Up to `count` unused cards of a role, weighted by score squared.
///
/// Falls back to a uniform pick when every remaining weight is zero.
fn select_weighted_from_role(
    generator: &DeckGenerator,
    rng: &mut StdRng,
    role: CardRole,
    count: usize,
    used: &HashSet<String>,
) -> Vec<String> {
    let mut pool: Vec<(&str, f64)> = generator
        .role_cards(role)
        .filter(|card| !used.contains(&card.name))
        .map(|card| (card.name.as_str(), card.score.max(0.0).powi(2)))
        .collect();

    let mut picked = Vec::with_capacity(count);
    while picked.len() < count && !pool.is_empty() {
        let idx = match WeightedIndex::new(pool.iter().map(|(_, w)| *w)) {
            Ok(dist) => dist.sample(rng),
            Err(_) => rng.gen_range(0..pool.len()),
        };
        picked.push(pool.swap_remove(idx).0.to_string());
    }
    picked
}

impl DeckIterator for SampleIterator {
    fn strategy(&self) -> GeneratorStrategy {
        self.strategy
    }

    fn next_deck(&mut self, cancel: &CancelToken) -> Result<Option<Deck>, GeneratorError> {
        if cancel.is_cancelled() {
            return Err(GeneratorError::Cancelled);
        }
        if self.remaining == 0 {
            return Ok(None);
        }

        let mut last_error = None;
        let mut found = None;
        for _ in 0..MAX_ATTEMPTS {
            let deck = self.draw();
            match self.generator.validate_deck(&deck) {
                Ok(()) => {
                    found = Some(deck);
                    break;
                }
                Err(e) => last_error = Some(e),
            }
        }

        self.remaining -= 1;
        self.generated += 1;

        match found {
            Some(deck) => Ok(Some(deck)),
            None => Err(GeneratorError::SamplingFailed {
                attempts: MAX_ATTEMPTS,
                source: last_error.unwrap_or(DeckError::InvalidDeckSize(0)),
            }),
        }
    }

    fn checkpoint(&self) -> GeneratorCheckpoint {
        GeneratorCheckpoint {
            strategy: self.strategy,
            position: self.generated,
            generated: self.generated,
            state: CheckpointState::Sample {
                remaining: self.remaining,
            },
        }
    }

    fn resume(&mut self, checkpoint: &GeneratorCheckpoint) -> Result<(), GeneratorError> {
        check_strategy(self.strategy, checkpoint)?;
        let CheckpointState::Sample { remaining } = checkpoint.state else {
            return Err(unexpected_state("sample", checkpoint));
        };
        self.remaining = remaining;
        self.generated = checkpoint.generated;
        Ok(())
    }

    fn reset(&mut self) {
        self.remaining = self.generator.sample_size();
        self.generated = 0;
        if self.weighted() {
            self.rng = StdRng::seed_from_u64(self.generator.seed());
        } else {
            self.generator.reseed();
        }
    }

    fn close(&mut self) {
        self.remaining = 0;
    }
}
