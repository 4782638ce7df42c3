//! Genetic search exposed through the iterator contract.

use std::collections::HashSet;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::compute::cancel::CancelToken;
use crate::compute::evolution::{
    FitnessError, FitnessFunction, GenePool, GeneticError, GeneticOptimizer, GeneticResult,
};
use crate::compute::generator::{DeckGenerator, GeneratorError};
use crate::schema::{
    CheckpointState, Deck, GeneratorCheckpoint, GeneratorStrategy, GeneticConfig, StopReason,
};

use super::{DeckIterator, check_strategy, unexpected_state};

/// Fitness that scores decks failing validation as 0.
struct ValidatedFitness {
    generator: Arc<DeckGenerator>,
    inner: Arc<dyn FitnessFunction>,
}

impl FitnessFunction for ValidatedFitness {
    fn fitness(&self, deck: &[String]) -> Result<f64, FitnessError> {
        if self.generator.validate_deck(deck).is_err() {
            return Ok(0.0);
        }
        self.inner.fitness(deck)
    }
}

/// Runs the optimizer on the first call, then yields the hall of fame
/// best first.
pub struct GeneticIterator {
    generator: Arc<DeckGenerator>,
    config: GeneticConfig,
    result: Option<GeneticResult>,
    rank: usize,
    done: bool,
    generated: u64,
}

impl GeneticIterator {
    pub fn new(generator: Arc<DeckGenerator>) -> Result<Self, GeneratorError> {
        let mut config = generator.genetic_config();
        config.validate().map_err(GeneticError::from)?;
        GenePool::new(generator.candidates())?;
        if config.random_seed.is_none() {
            config.random_seed = Some(generator.seed());
        }

        Ok(Self {
            generator,
            config,
            result: None,
            rank: 0,
            done: false,
            generated: 0,
        })
    }

    /// Result of the optimization, once it has run.
    pub fn result(&self) -> Option<&GeneticResult> {
        self.result.as_ref()
    }

    /// Greedy deck first, then up to a quarter of the population in
    /// sampled valid decks, on top of any configured seeds.
    fn seed_population(&self) -> Vec<Deck> {
        let mut seeds = self.config.seed_population.clone();
        let mut known: HashSet<Vec<String>> = seeds.iter().map(|d| sorted(d)).collect();

        let greedy = self.generator.greedy_deck();
        if self.generator.validate_deck(&greedy).is_ok() && known.insert(sorted(&greedy)) {
            seeds.push(greedy);
        }

        let seed = self.config.random_seed.unwrap_or(self.generator.seed());
        let mut rng = StdRng::seed_from_u64(seed);
        let wanted = self.config.population_size / 4;
        let mut sampled = 0;
        for _ in 0..wanted * 4 {
            if sampled >= wanted {
                break;
            }
            let deck = self.generator.assemble_deck(|role, count, used| {
                self.generator
                    .select_random_from_role_with(&mut rng, role, count, used)
            });
            if self.generator.validate_deck(&deck).is_ok() && known.insert(sorted(&deck)) {
                seeds.push(deck);
                sampled += 1;
            }
        }
        seeds
    }

    fn optimize(&mut self, cancel: &CancelToken) -> Result<(), GeneratorError> {
        let mut config = self.config.clone();
        config.seed_population = self.seed_population();
        log::info!(
            "starting genetic search: population {}, {} generations, {} seed decks",
            config.population_size,
            config.generations,
            config.seed_population.len()
        );

        let fitness = Arc::new(ValidatedFitness {
            generator: Arc::clone(&self.generator),
            inner: self.generator.fitness(),
        });
        let mut optimizer =
            GeneticOptimizer::new(self.generator.candidates(), config, fitness)?;
        if let Some(scorer) = self.generator.uniqueness() {
            optimizer = optimizer.with_uniqueness(scorer.clone());
        }

        let result = optimizer.run(cancel);
        if result.stop_reason == StopReason::Cancelled {
            return Err(GeneratorError::Cancelled);
        }
        self.result = Some(result);
        Ok(())
    }
}

fn sorted(deck: &[String]) -> Vec<String> {
    let mut deck = deck.to_vec();
    deck.sort();
    deck
}

impl DeckIterator for GeneticIterator {
    fn strategy(&self) -> GeneratorStrategy {
        GeneratorStrategy::Genetic
    }

    fn next_deck(&mut self, cancel: &CancelToken) -> Result<Option<Deck>, GeneratorError> {
        if cancel.is_cancelled() {
            return Err(GeneratorError::Cancelled);
        }
        if self.done {
            return Ok(None);
        }
        if self.result.is_none() {
            self.optimize(cancel)?;
        }
        let Some(result) = &self.result else {
            return Ok(None);
        };

        while let Some(genome) = result.hall_of_fame.get(self.rank) {
            self.rank += 1;
            self.generated += 1;
            match self.generator.validate_deck(&genome.cards) {
                Ok(()) => return Ok(Some(genome.cards.clone())),
                Err(e) => log::debug!("dropping invalid hall-of-fame deck: {e}"),
            }
        }

        self.done = true;
        Ok(None)
    }

    fn checkpoint(&self) -> GeneratorCheckpoint {
        GeneratorCheckpoint {
            strategy: GeneratorStrategy::Genetic,
            position: self.rank as u64,
            generated: self.generated,
            state: CheckpointState::Genetic {
                rank: self.rank,
                done: self.done,
            },
        }
    }

    /// Restores the rank; the search itself is re-run on the next call.
    fn resume(&mut self, checkpoint: &GeneratorCheckpoint) -> Result<(), GeneratorError> {
        check_strategy(GeneratorStrategy::Genetic, checkpoint)?;
        let CheckpointState::Genetic { rank, done } = checkpoint.state else {
            return Err(unexpected_state("genetic", checkpoint));
        };
        self.rank = rank;
        self.done = done;
        self.generated = checkpoint.generated;
        Ok(())
    }

    fn reset(&mut self) {
        self.result = None;
        self.rank = 0;
        self.done = false;
        self.generated = 0;
    }

    fn close(&mut self) {
        self.result = None;
        self.done = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{GeneratorConfig, GeneratorConstraints};
    use crate::test_support::test_candidates;

    fn generator(constraints: GeneratorConstraints) -> Arc<DeckGenerator> {
        let config = GeneratorConfig {
            constraints: Some(constraints),
            seed: 3,
            genetic: Some(GeneticConfig {
                population_size: 16,
                generations: 5,
                elite_count: 2,
                tournament_size: 3,
                convergence_generations: 0,
                hall_of_fame_size: 6,
                ..Default::default()
            }),
            ..GeneratorConfig::new(GeneratorStrategy::Genetic, test_candidates(20))
        };
        Arc::new(DeckGenerator::new(config).unwrap())
    }

    fn drain(iter: &mut GeneticIterator, cancel: &CancelToken) -> Vec<Deck> {
        let mut decks = Vec::new();
        while let Some(deck) = iter.next_deck(cancel).unwrap() {
            decks.push(deck);
        }
        decks
    }

    #[test]
    fn test_yields_valid_hall_of_fame_best_first() {
        let generator = generator(GeneratorConstraints::default());
        let mut iter = GeneticIterator::new(Arc::clone(&generator)).unwrap();
        let cancel = CancelToken::new();

        let decks = drain(&mut iter, &cancel);
        assert!(!decks.is_empty());
        assert!(decks.len() <= 6);
        for deck in &decks {
            assert_eq!(generator.validate_deck(deck), Ok(()));
        }

        let result = iter.result().unwrap();
        assert!(result.scores.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(result.generations, 5);
        assert!(iter.next_deck(&cancel).unwrap().is_none());
    }

    #[test]
    fn test_invalid_decks_never_yielded() {
        let generator = generator(GeneratorConstraints {
            include_cards: vec!["Arrows".into()],
            ..Default::default()
        });
        let mut iter = GeneticIterator::new(Arc::clone(&generator)).unwrap();
        for deck in drain(&mut iter, &CancelToken::new()) {
            assert!(deck.contains(&"Arrows".to_string()));
        }
    }

    #[test]
    fn test_cancelled_before_search() {
        let mut iter = GeneticIterator::new(generator(GeneratorConstraints::default())).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            iter.next_deck(&cancel),
            Err(GeneratorError::Cancelled)
        ));
        assert!(iter.result().is_none());
    }

    #[test]
    fn test_checkpoint_resume_and_reset() {
        let generator = generator(GeneratorConstraints::default());
        let cancel = CancelToken::new();

        let mut iter = GeneticIterator::new(Arc::clone(&generator)).unwrap();
        let first = iter.next_deck(&cancel).unwrap().unwrap();
        let second = iter.next_deck(&cancel).unwrap();
        let checkpoint = iter.checkpoint();
        assert!(matches!(
            checkpoint.state,
            CheckpointState::Genetic { done: false, .. }
        ));
        let third = iter.next_deck(&cancel).unwrap();

        // Same seed, same search: the resumed iterator continues after `second`.
        let mut resumed = GeneticIterator::new(Arc::clone(&generator)).unwrap();
        resumed.resume(&checkpoint).unwrap();
        assert_eq!(resumed.next_deck(&cancel).unwrap(), third);

        iter.reset();
        assert_eq!(iter.next_deck(&cancel).unwrap(), Some(first));
        assert_eq!(iter.next_deck(&cancel).unwrap(), second);

        let sample = GeneratorCheckpoint {
            strategy: GeneratorStrategy::SmartSample,
            position: 0,
            generated: 0,
            state: CheckpointState::Sample { remaining: 1 },
        };
        assert!(matches!(
            iter.resume(&sample),
            Err(GeneratorError::StrategyMismatch { .. })
        ));
    }

    #[test]
    fn test_close() {
        let mut iter = GeneticIterator::new(generator(GeneratorConstraints::default())).unwrap();
        iter.close();
        iter.close();
        assert!(iter.next_deck(&CancelToken::new()).unwrap().is_none());
    }
}
