//! Deck generator: candidate pool, deck validation and iterator factory.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use num_traits::ToPrimitive;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;

use crate::schema::{
    CardCandidate, CardRole, DECK_SIZE, Deck, GeneratorConfig, GeneratorConstraints,
    GeneratorStrategy, GeneticConfig, RoleComposition,
};

use super::cancel::CancelToken;
use super::deck_space::combinations;
use super::evolution::{CandidateScoreFitness, FitnessFunction, GeneticError};
use super::iterators::{DeckIterator, ExhaustiveIterator, GeneticIterator, SampleIterator};
use super::uniqueness::UniquenessScorer;

/// Reason a deck failed validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeckError {
    #[error("invalid deck size: expected {DECK_SIZE} cards, got {0}")]
    InvalidDeckSize(usize),
    #[error("duplicate card: {0}")]
    DuplicateCard(String),
    #[error("card not in candidate pool: {0}")]
    UnknownCard(String),
    #[error("average elixir {avg:.2} below minimum {min:.2}")]
    ElixirTooLow { avg: f64, min: f64 },
    #[error("average elixir {avg:.2} above maximum {max:.2}")]
    ElixirTooHigh { avg: f64, max: f64 },
    #[error("deck has no win condition")]
    NoWinCondition,
    #[error("deck has {found} evolved cards, {required} required")]
    TooFewEvolutions { found: usize, required: usize },
    #[error("required card missing: {0}")]
    MissingRequiredCard(String),
}

/// Deck generation failure.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("insufficient cards: need at least {DECK_SIZE} candidates, have {available}")]
    InsufficientCards { available: usize },
    #[error("role composition must total {DECK_SIZE} cards, got {0}")]
    InvalidComposition(usize),
    #[error("generation cancelled")]
    Cancelled,
    #[error("failed to generate valid deck after {attempts} attempts, last error: {source}")]
    SamplingFailed {
        attempts: usize,
        #[source]
        source: DeckError,
    },
    #[error("checkpoint strategy mismatch: iterator is {expected}, checkpoint is {found}")]
    StrategyMismatch {
        expected: GeneratorStrategy,
        found: GeneratorStrategy,
    },
    #[error("invalid checkpoint: {0}")]
    InvalidCheckpoint(String),
    #[error(transparent)]
    Genetic(#[from] GeneticError),
}

/// Batch generation progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeneratorProgress {
    /// Attempts made so far.
    pub generated: usize,
    /// Requested decks.
    pub total: usize,
    /// Decks produced.
    pub valid: usize,
    /// Attempts that could not produce a valid deck.
    pub invalid: usize,
}

/// Progress callback for batch generation.
pub type GeneratorProgressCallback = Arc<dyn Fn(&GeneratorProgress) + Send + Sync>;

/// Holds the filtered candidate pool and builds decks from it.
///
/// Candidates are sorted by descending score. The generator owns one random
/// source behind a lock; concurrent workers should each build their own
/// generator (see [`DeckGenerator::generate_parallel`]) instead of sharing it.
pub struct DeckGenerator {
    config: GeneratorConfig,
    candidates: Vec<CardCandidate>,
    index: HashMap<String, usize>,
    by_role: HashMap<CardRole, Vec<usize>>,
    composition: RoleComposition,
    constraints: GeneratorConstraints,
    include: Vec<String>,
    seed: u64,
    rng: Mutex<StdRng>,
    fitness: Arc<dyn FitnessFunction>,
    uniqueness: Option<UniquenessScorer>,
    progress: Option<GeneratorProgressCallback>,
}

impl DeckGenerator {
    /// Filter and index the candidate pool.
    pub fn new(config: GeneratorConfig) -> Result<Self, GeneratorError> {
        if config.candidates.is_empty() {
            return Err(GeneratorError::InsufficientCards { available: 0 });
        }

        let composition = config.composition.unwrap_or_default();
        if composition.total() != DECK_SIZE {
            return Err(GeneratorError::InvalidComposition(composition.total()));
        }

        let mut constraints = config.constraints.clone().unwrap_or_default();
        constraints.include_cards = trimmed_unique(&constraints.include_cards);
        constraints.exclude_cards = trimmed_unique(&constraints.exclude_cards);
        let exclude: HashSet<&str> = constraints
            .exclude_cards
            .iter()
            .map(String::as_str)
            .collect();

        let mut seen = HashSet::new();
        let mut candidates = Vec::with_capacity(config.candidates.len());
        for card in &config.candidates {
            if exclude.contains(card.name.as_str()) {
                continue;
            }
            if !seen.insert(card.name.clone()) {
                log::warn!("duplicate candidate {} ignored", card.name);
                continue;
            }
            let mut card = card.clone();
            if constraints.prefer_high_level {
                card.score *= 0.5 + 0.5 * card.level_ratio();
            }
            candidates.push(card);
        }

        if candidates.len() < DECK_SIZE {
            return Err(GeneratorError::InsufficientCards {
                available: candidates.len(),
            });
        }

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut index = HashMap::with_capacity(candidates.len());
        let mut by_role: HashMap<CardRole, Vec<usize>> = HashMap::new();
        for (i, card) in candidates.iter().enumerate() {
            index.insert(card.name.clone(), i);
            if let Some(role) = card.role {
                by_role.entry(role).or_default().push(i);
            }
        }

        for name in &constraints.include_cards {
            if !index.contains_key(name) {
                log::warn!("required card {name} is not in the candidate pool");
            }
        }

        if config.strategy == GeneratorStrategy::Genetic {
            let genetic = config.genetic.clone().unwrap_or_default();
            genetic.validate().map_err(GeneticError::from)?;
        }

        let seed = if config.seed == 0 {
            rand::random()
        } else {
            config.seed
        };
        let fitness: Arc<dyn FitnessFunction> = Arc::new(CandidateScoreFitness::new(&candidates));

        log::debug!(
            "deck generator ready: {} candidates, strategy {}, seed {}",
            candidates.len(),
            config.strategy,
            seed
        );

        Ok(Self {
            include: constraints.include_cards.clone(),
            config,
            candidates,
            index,
            by_role,
            composition,
            constraints,
            seed,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            fitness,
            uniqueness: None,
            progress: None,
        })
    }

    /// Replace the fitness function used by the genetic strategy.
    pub fn with_fitness(mut self, fitness: Arc<dyn FitnessFunction>) -> Self {
        self.fitness = fitness;
        self
    }

    /// Add a uniqueness bonus to genetic fitness.
    pub fn with_uniqueness(mut self, scorer: UniquenessScorer) -> Self {
        self.uniqueness = Some(scorer);
        self
    }

    /// Report progress from [`DeckGenerator::generate`].
    pub fn with_progress(mut self, callback: GeneratorProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn strategy(&self) -> GeneratorStrategy {
        self.config.strategy
    }

    /// Candidates in descending score order.
    pub fn candidates(&self) -> &[CardCandidate] {
        &self.candidates
    }

    pub fn candidate(&self, name: &str) -> Option<&CardCandidate> {
        self.index.get(name).map(|&i| &self.candidates[i])
    }

    pub fn composition(&self) -> &RoleComposition {
        &self.composition
    }

    pub fn constraints(&self) -> &GeneratorConstraints {
        &self.constraints
    }

    /// Resolved random seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Sample budget of the sampling strategies.
    pub fn sample_size(&self) -> usize {
        self.config.effective_sample_size()
    }

    pub fn archetype(&self) -> Option<&str> {
        self.config.archetype.as_deref()
    }

    /// Genetic settings with defaults applied.
    pub fn genetic_config(&self) -> GeneticConfig {
        self.config.genetic.clone().unwrap_or_default()
    }

    pub fn fitness(&self) -> Arc<dyn FitnessFunction> {
        Arc::clone(&self.fitness)
    }

    pub fn uniqueness(&self) -> Option<&UniquenessScorer> {
        self.uniqueness.as_ref()
    }

    /// Number of decks the configured strategy will produce, when known.
    pub fn estimated_total(&self) -> Option<u64> {
        match self.config.strategy {
            GeneratorStrategy::Exhaustive => {
                combinations(self.candidates.len() as i64, DECK_SIZE as i64).to_u64()
            }
            strategy if strategy.is_sampling() => Some(self.sample_size() as u64),
            _ => None,
        }
    }

    /// Average elixir cost of a deck, ignoring unknown cards.
    pub fn average_elixir(&self, deck: &[String]) -> f64 {
        let total: u32 = deck
            .iter()
            .filter_map(|name| self.candidate(name))
            .map(|card| card.elixir)
            .sum();
        total as f64 / DECK_SIZE as f64
    }

    /// Check a deck against every active constraint.
    pub fn validate_deck(&self, deck: &[String]) -> Result<(), DeckError> {
        if deck.len() != DECK_SIZE {
            return Err(DeckError::InvalidDeckSize(deck.len()));
        }

        let mut seen = HashSet::with_capacity(DECK_SIZE);
        for name in deck {
            if !seen.insert(name.as_str()) {
                return Err(DeckError::DuplicateCard(name.clone()));
            }
        }

        let mut cards = Vec::with_capacity(DECK_SIZE);
        for name in deck {
            match self.candidate(name) {
                Some(card) => cards.push(card),
                None => return Err(DeckError::UnknownCard(name.clone())),
            }
        }

        let avg = cards.iter().map(|c| c.elixir).sum::<u32>() as f64 / DECK_SIZE as f64;
        if avg < self.constraints.min_avg_elixir {
            return Err(DeckError::ElixirTooLow {
                avg,
                min: self.constraints.min_avg_elixir,
            });
        }
        if avg > self.constraints.max_avg_elixir {
            return Err(DeckError::ElixirTooHigh {
                avg,
                max: self.constraints.max_avg_elixir,
            });
        }

        if self.constraints.require_win_condition && !cards.iter().any(|c| c.is_win_condition()) {
            return Err(DeckError::NoWinCondition);
        }

        let evolved = cards.iter().filter(|c| c.is_evolved()).count();
        if evolved < self.constraints.min_evolution_cards {
            return Err(DeckError::TooFewEvolutions {
                found: evolved,
                required: self.constraints.min_evolution_cards,
            });
        }

        for name in &self.include {
            if !seen.contains(name.as_str()) {
                return Err(DeckError::MissingRequiredCard(name.clone()));
            }
        }

        Ok(())
    }

    /// Build an iterator for the configured strategy.
    pub fn iterator(self: &Arc<Self>) -> Result<Box<dyn DeckIterator>, GeneratorError> {
        let generator = Arc::clone(self);
        let iterator: Box<dyn DeckIterator> = match self.config.strategy {
            GeneratorStrategy::Exhaustive => Box::new(ExhaustiveIterator::new(generator)),
            GeneratorStrategy::RandomSample
            | GeneratorStrategy::SmartSample
            | GeneratorStrategy::ArchetypeFocused => {
                Box::new(SampleIterator::new(generator, self.config.strategy))
            }
            GeneratorStrategy::Genetic => Box::new(GeneticIterator::new(generator)?),
        };
        Ok(iterator)
    }

    /// Produce a single deck, or `None` if the strategy yields nothing.
    pub fn generate_one(
        self: &Arc<Self>,
        cancel: &CancelToken,
    ) -> Result<Option<Deck>, GeneratorError> {
        let mut iterator = self.iterator()?;
        let deck = iterator.next_deck(cancel);
        iterator.close();
        deck
    }

    /// Produce up to `count` decks.
    ///
    /// Sampling misses are counted as invalid and skipped; any other error
    /// stops the batch.
    pub fn generate(
        self: &Arc<Self>,
        cancel: &CancelToken,
        count: usize,
    ) -> Result<Vec<Deck>, GeneratorError> {
        let mut iterator = self.iterator()?;
        let mut decks = Vec::with_capacity(count);
        let mut progress = GeneratorProgress {
            total: count,
            ..Default::default()
        };

        let result = loop {
            if progress.generated >= count {
                break Ok(());
            }
            if cancel.is_cancelled() {
                break Err(GeneratorError::Cancelled);
            }

            progress.generated += 1;
            match iterator.next_deck(cancel) {
                Ok(Some(deck)) => {
                    decks.push(deck);
                    progress.valid += 1;
                }
                Ok(None) => break Ok(()),
                Err(GeneratorError::SamplingFailed { source, .. }) => {
                    log::debug!("sampling miss: {source}");
                    progress.invalid += 1;
                }
                Err(e) => break Err(e),
            }

            if let Some(callback) = &self.progress {
                callback(&progress);
            }
        };

        iterator.close();
        result.map(|()| decks)
    }

    /// Split a sampling run across `config.workers` independent generators.
    ///
    /// Worker `w` uses seed `seed + w * workers`, so a fixed non-zero seed
    /// gives a reproducible batch. Non-sampling strategies run on one worker.
    pub fn generate_parallel(
        config: &GeneratorConfig,
        count: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<Deck>, GeneratorError> {
        let workers = config.workers.max(1);
        if workers == 1 || !config.strategy.is_sampling() {
            return Arc::new(Self::new(config.clone())?).generate(cancel, count);
        }

        let base_seed = if config.seed == 0 {
            rand::random()
        } else {
            config.seed
        };

        let batches: Vec<Result<Vec<Deck>, GeneratorError>> = (0..workers)
            .into_par_iter()
            .map(|worker| {
                let share = count / workers + usize::from(worker < count % workers);
                let mut local = config.clone();
                local.seed = base_seed.wrapping_add((worker * workers) as u64).max(1);
                local.sample_size = share;
                let generator = Arc::new(Self::new(local)?);
                generator.generate(cancel, share)
            })
            .collect();

        let mut decks = Vec::with_capacity(count);
        for batch in batches {
            decks.extend(batch?);
        }
        Ok(decks)
    }

    /// Re-seed the shared random source from the resolved seed.
    pub(crate) fn reseed(&self) {
        *self.rng.lock() = StdRng::seed_from_u64(self.seed);
    }

    /// Names of a role's candidates, best first.
    pub(crate) fn role_cards(&self, role: CardRole) -> impl Iterator<Item = &CardCandidate> {
        self.by_role
            .get(&role)
            .into_iter()
            .flatten()
            .map(|&i| &self.candidates[i])
    }

    /// Up to `count` unused cards of a role, drawn uniformly without replacement.
    pub(crate) fn select_random_from_role(
        &self,
        role: CardRole,
        count: usize,
        used: &HashSet<String>,
    ) -> Vec<String> {
        self.select_random_from_role_with(&mut *self.rng.lock(), role, count, used)
    }

    /// As [`Self::select_random_from_role`], drawing from a caller-owned source.
    pub(crate) fn select_random_from_role_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        role: CardRole,
        count: usize,
        used: &HashSet<String>,
    ) -> Vec<String> {
        let mut pool: Vec<&str> = self
            .role_cards(role)
            .map(|card| card.name.as_str())
            .filter(|name| !used.contains(*name))
            .collect();
        pool.shuffle(rng);
        pool.into_iter().take(count).map(str::to_string).collect()
    }

    /// Up to `count` unused cards of a role, highest score first.
    pub(crate) fn select_best_from_role(
        &self,
        role: CardRole,
        count: usize,
        used: &HashSet<String>,
    ) -> Vec<String> {
        self.role_cards(role)
            .filter(|card| !used.contains(&card.name))
            .take(count)
            .map(|card| card.name.clone())
            .collect()
    }

    /// Top up a deck with the highest scoring unused cards.
    pub(crate) fn fill_remaining_slots(&self, deck: &mut Deck, used: &mut HashSet<String>) {
        for card in &self.candidates {
            if deck.len() >= DECK_SIZE {
                break;
            }
            if used.insert(card.name.clone()) {
                deck.push(card.name.clone());
            }
        }
    }

    /// Assemble a deck: forced includes, then role quotas via `pick`, then fill.
    ///
    /// Included cards count toward their role's quota.
    pub(crate) fn assemble_deck<F>(&self, mut pick: F) -> Deck
    where
        F: FnMut(CardRole, usize, &HashSet<String>) -> Vec<String>,
    {
        let mut deck = Vec::with_capacity(DECK_SIZE);
        let mut used = HashSet::with_capacity(DECK_SIZE);
        let mut filled: HashMap<CardRole, usize> = HashMap::new();

        for name in &self.include {
            if used.insert(name.clone()) {
                deck.push(name.clone());
                if let Some(role) = self.candidate(name).and_then(|c| c.role) {
                    *filled.entry(role).or_insert(0) += 1;
                }
            }
        }

        for (role, target) in self.composition.quotas() {
            let open = DECK_SIZE.saturating_sub(deck.len());
            let wanted = target
                .saturating_sub(filled.get(&role).copied().unwrap_or(0))
                .min(open);
            if wanted == 0 {
                continue;
            }
            for name in pick(role, wanted, &used) {
                if used.insert(name.clone()) {
                    deck.push(name);
                }
            }
        }

        self.fill_remaining_slots(&mut deck, &mut used);
        deck
    }

    /// The deck built from the best card of every role quota.
    pub(crate) fn greedy_deck(&self) -> Deck {
        self.assemble_deck(|role, count, used| self.select_best_from_role(role, count, used))
    }
}

fn trimmed_unique(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty() && seen.insert(*name))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_candidates;

    fn generator(strategy: GeneratorStrategy, constraints: GeneratorConstraints) -> DeckGenerator {
        let config = GeneratorConfig {
            constraints: Some(constraints),
            seed: 7,
            ..GeneratorConfig::new(strategy, test_candidates(20))
        };
        DeckGenerator::new(config).unwrap()
    }

    fn valid_deck() -> Deck {
        [
            "Hog Rider", "Cannon", "Fireball", "Zap", "Support0", "Support1", "Cycle1", "Cycle2",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    #[test]
    fn test_insufficient_cards() {
        let empty = GeneratorConfig::new(GeneratorStrategy::RandomSample, Vec::new());
        assert!(matches!(
            DeckGenerator::new(empty),
            Err(GeneratorError::InsufficientCards { available: 0 })
        ));

        let five = GeneratorConfig::new(GeneratorStrategy::RandomSample, test_candidates(5));
        let err = DeckGenerator::new(five).err().unwrap();
        assert!(matches!(err, GeneratorError::InsufficientCards { available: 5 }));
        assert!(err.to_string().contains("insufficient cards"));
    }

    #[test]
    fn test_exclusion_can_starve_pool() {
        let config = GeneratorConfig {
            constraints: Some(GeneratorConstraints {
                exclude_cards: vec![" Hog Rider ".into(), "Giant".into(), "Miner".into()],
                ..Default::default()
            }),
            ..GeneratorConfig::new(GeneratorStrategy::RandomSample, test_candidates(10))
        };
        assert!(matches!(
            DeckGenerator::new(config),
            Err(GeneratorError::InsufficientCards { available: 7 })
        ));
    }

    #[test]
    fn test_pool_sorted_and_filtered() {
        let generator = generator(
            GeneratorStrategy::RandomSample,
            GeneratorConstraints {
                exclude_cards: vec!["Golem".into(), "Zap".into()],
                ..Default::default()
            },
        );

        assert_eq!(generator.candidates().len(), 19);
        assert!(generator.candidate("Zap").is_none());
        let scores: Vec<f64> = generator.candidates().iter().map(|c| c.score).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(generator.candidates()[0].name, "Hog Rider");
    }

    #[test]
    fn test_defaults_applied() {
        let config = GeneratorConfig::new(GeneratorStrategy::RandomSample, test_candidates(20));
        let generator = DeckGenerator::new(config).unwrap();
        assert_eq!(generator.constraints(), &GeneratorConstraints::default());
        assert_eq!(generator.composition(), &RoleComposition::default());
        assert_ne!(generator.seed(), 0);
        assert_eq!(generator.estimated_total(), Some(1000));
    }

    #[test]
    fn test_invalid_composition_rejected() {
        let config = GeneratorConfig {
            composition: Some(RoleComposition {
                support: 5,
                ..Default::default()
            }),
            ..GeneratorConfig::new(GeneratorStrategy::RandomSample, test_candidates(20))
        };
        assert!(matches!(
            DeckGenerator::new(config),
            Err(GeneratorError::InvalidComposition(11))
        ));
    }

    #[test]
    fn test_invalid_genetic_config_rejected() {
        let config = GeneratorConfig {
            genetic: Some(GeneticConfig {
                population_size: 0,
                ..Default::default()
            }),
            ..GeneratorConfig::new(GeneratorStrategy::Genetic, test_candidates(20))
        };
        assert!(matches!(
            DeckGenerator::new(config),
            Err(GeneratorError::Genetic(GeneticError::Config(_)))
        ));
    }

    #[test]
    fn test_validate_deck_rejections() {
        let generator = generator(
            GeneratorStrategy::RandomSample,
            GeneratorConstraints {
                include_cards: vec!["Hog Rider".into()],
                ..Default::default()
            },
        );
        let deck = valid_deck();
        assert_eq!(generator.validate_deck(&deck), Ok(()));

        assert_eq!(
            generator.validate_deck(&deck[..7]),
            Err(DeckError::InvalidDeckSize(7))
        );

        let mut duplicate = deck.clone();
        duplicate[7] = "Cycle1".into();
        assert_eq!(
            generator.validate_deck(&duplicate),
            Err(DeckError::DuplicateCard("Cycle1".into()))
        );

        let mut unknown = deck.clone();
        unknown[7] = "Golem".into();
        assert_eq!(
            generator.validate_deck(&unknown),
            Err(DeckError::UnknownCard("Golem".into()))
        );

        let mut no_win = deck.clone();
        no_win[0] = "Tesla".into();
        assert!(matches!(
            generator.validate_deck(&no_win),
            Err(DeckError::NoWinCondition)
        ));
    }

    #[test]
    fn test_validate_elixir_bounds() {
        let generator = generator(
            GeneratorStrategy::RandomSample,
            GeneratorConstraints {
                min_avg_elixir: 3.0,
                max_avg_elixir: 3.5,
                ..Default::default()
            },
        );

        // 4+3+4+2+3+3+1+1 = 21 -> 2.625
        assert!(matches!(
            generator.validate_deck(&valid_deck()),
            Err(DeckError::ElixirTooLow { .. })
        ));

        let heavy: Deck = [
            "Giant",
            "Inferno Tower",
            "Rocket",
            "Lightning",
            "Balloon",
            "Fireball",
            "Tesla",
            "Arrows",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert!(matches!(
            generator.validate_deck(&heavy),
            Err(DeckError::ElixirTooHigh { .. })
        ));
    }

    #[test]
    fn test_validate_evolution_minimum() {
        let generator = generator(
            GeneratorStrategy::RandomSample,
            GeneratorConstraints {
                min_evolution_cards: 2,
                ..Default::default()
            },
        );
        // Only Hog Rider is evolved.
        assert_eq!(
            generator.validate_deck(&valid_deck()),
            Err(DeckError::TooFewEvolutions {
                found: 1,
                required: 2
            })
        );

        let mut deck = valid_deck();
        deck[7] = "Miner".into();
        assert_eq!(generator.validate_deck(&deck), Ok(()));
    }

    #[test]
    fn test_selection_helpers() {
        let generator = generator(GeneratorStrategy::RandomSample, GeneratorConstraints::default());
        let mut used = HashSet::new();
        used.insert("Support0".to_string());

        let picked = generator.select_random_from_role(CardRole::Support, 2, &used);
        assert_eq!(picked.len(), 2);
        assert!(!picked.contains(&"Support0".to_string()));

        let best = generator.select_best_from_role(CardRole::WinCondition, 10, &used);
        assert_eq!(best.len(), 4);

        let mut deck = vec!["Hog Rider".to_string()];
        let mut used: HashSet<String> = deck.iter().cloned().collect();
        generator.fill_remaining_slots(&mut deck, &mut used);
        assert_eq!(deck.len(), DECK_SIZE);
        assert_eq!(deck[1], "Giant");
    }

    #[test]
    fn test_greedy_deck_is_valid() {
        let generator = generator(GeneratorStrategy::RandomSample, GeneratorConstraints::default());
        let deck = generator.greedy_deck();
        assert_eq!(generator.validate_deck(&deck), Ok(()));
    }

    #[test]
    fn test_forced_include_counts_toward_quota() {
        let generator = generator(
            GeneratorStrategy::RandomSample,
            GeneratorConstraints {
                include_cards: vec!["Hog Rider".into(), "Fireball".into()],
                ..Default::default()
            },
        );
        for _ in 0..50 {
            let deck = generator.assemble_deck(|role, count, used| {
                generator.select_random_from_role(role, count, used)
            });
            assert_eq!(deck.len(), DECK_SIZE);
            assert_eq!(&deck[..2], &["Hog Rider".to_string(), "Fireball".to_string()]);
            assert_eq!(generator.validate_deck(&deck), Ok(()));
        }
    }

    #[test]
    fn test_generate_with_progress() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let on_progress = Arc::new(move |progress: &GeneratorProgress| {
            assert!(progress.valid + progress.invalid <= progress.generated);
            seen.fetch_add(1, Ordering::Relaxed);
        });
        let generator = Arc::new(
            generator(GeneratorStrategy::SmartSample, GeneratorConstraints::default())
                .with_progress(on_progress),
        );

        let decks = generator.generate(&CancelToken::new(), 25).unwrap();
        assert_eq!(decks.len(), 25);
        assert_eq!(calls.load(Ordering::Relaxed), 25);
        for deck in &decks {
            assert_eq!(generator.validate_deck(deck), Ok(()));
        }

        let one = generator.generate_one(&CancelToken::new()).unwrap();
        assert!(one.is_some());
    }

    #[test]
    fn test_generate_cancelled() {
        let generator = Arc::new(generator(
            GeneratorStrategy::RandomSample,
            GeneratorConstraints::default(),
        ));
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            generator.generate(&cancel, 5),
            Err(GeneratorError::Cancelled)
        ));
    }

    #[test]
    fn test_generate_parallel() {
        let config = GeneratorConfig {
            seed: 11,
            workers: 4,
            ..GeneratorConfig::new(GeneratorStrategy::RandomSample, test_candidates(20))
        };
        let first = DeckGenerator::generate_parallel(&config, 30, &CancelToken::new()).unwrap();
        let second = DeckGenerator::generate_parallel(&config, 30, &CancelToken::new()).unwrap();
        assert_eq!(first.len(), 30);
        assert_eq!(first, second);
    }

    #[test]
    fn test_average_elixir() {
        let generator = generator(GeneratorStrategy::RandomSample, GeneratorConstraints::default());
        assert!((generator.average_elixir(&valid_deck()) - 21.0 / 8.0).abs() < 1e-9);
    }
}
