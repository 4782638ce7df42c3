//! Genetic deck optimizer with an optional island model.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::compute::cancel::CancelToken;
use crate::compute::uniqueness::UniquenessScorer;
use crate::schema::{CardCandidate, GeneticConfig, GeneticConfigError, GeneticProgress, StopReason};

use super::fitness::{FitnessCache, FitnessFunction};
use super::genome::{DeckGenome, GenePool, GenomeRng};

/// Genetic optimizer failure.
#[derive(Debug, thiserror::Error)]
pub enum GeneticError {
    #[error("invalid genetic config: {0}")]
    Config(#[from] GeneticConfigError),
    #[error("insufficient candidates: need at least 8, have {0}")]
    InsufficientCandidates(usize),
    #[error("invalid genome: {0}")]
    InvalidGenome(String),
}

/// Progress callback type.
pub type ProgressCallback = Box<dyn Fn(&GeneticProgress) + Send + Sync>;

/// Outcome of a genetic run.
#[derive(Debug, Clone)]
pub struct GeneticResult {
    /// Distinct decks, best first.
    pub hall_of_fame: Vec<DeckGenome>,
    /// Fitness of each hall-of-fame entry, non-increasing.
    pub scores: Vec<f64>,
    /// Generations actually run.
    pub generations: usize,
    /// Wall-clock time used.
    pub duration: Duration,
    pub stop_reason: StopReason,
}

/// Evolves decks toward higher fitness.
pub struct GeneticOptimizer {
    config: GeneticConfig,
    pool: GenePool,
    fitness: Arc<dyn FitnessFunction>,
    uniqueness: Option<UniquenessScorer>,
    cache: FitnessCache,
    rng: GenomeRng,
    islands: Vec<Vec<DeckGenome>>,
    hall_of_fame: Vec<DeckGenome>,
    generation: usize,
    best_fitness: f64,
    last_improvement: usize,
}

impl GeneticOptimizer {
    /// Create an optimizer over a candidate pool.
    pub fn new(
        candidates: &[CardCandidate],
        config: GeneticConfig,
        fitness: Arc<dyn FitnessFunction>,
    ) -> Result<Self, GeneticError> {
        config.validate()?;
        let pool = GenePool::new(candidates)?;
        let rng = match config.random_seed {
            Some(seed) => GenomeRng::new(seed),
            None => GenomeRng::random(),
        };

        Ok(Self {
            config,
            pool,
            fitness,
            uniqueness: None,
            cache: FitnessCache::new(),
            rng,
            islands: Vec::new(),
            hall_of_fame: Vec::new(),
            generation: 0,
            best_fitness: f64::NEG_INFINITY,
            last_improvement: 0,
        })
    }

    /// Add a uniqueness bonus on top of the fitness function.
    pub fn with_uniqueness(mut self, scorer: UniquenessScorer) -> Self {
        self.uniqueness = Some(scorer);
        self
    }

    pub fn config(&self) -> &GeneticConfig {
        &self.config
    }

    /// Fill every island, seed decks first.
    ///
    /// The population is split as evenly as possible: the first
    /// `population_size % islands` islands hold one extra member. Seeds that
    /// are not 8 distinct pool cards are skipped.
    pub fn initialize(&mut self) {
        let sizes = island_sizes(self.config.population_size, self.config.islands());
        let island_count = sizes.len();

        let mut seeds = Vec::new();
        for cards in &self.config.seed_population {
            match DeckGenome::from_cards(cards.clone(), &self.pool) {
                Ok(genome) => seeds.push(genome),
                Err(e) => log::debug!("skipping seed deck: {e}"),
            }
        }

        // Round-robin never overfills: earlier islands are the larger ones.
        self.islands = sizes.iter().map(|&size| Vec::with_capacity(size)).collect();
        let total = sizes.iter().sum();
        for (i, genome) in seeds.into_iter().take(total).enumerate() {
            self.islands[i % island_count].push(genome);
        }
        for (island, &size) in self.islands.iter_mut().zip(&sizes) {
            while island.len() < size {
                island.push(self.rng.random_genome(&self.pool));
            }
        }

        self.hall_of_fame.clear();
        self.generation = 0;
        self.best_fitness = f64::NEG_INFINITY;
        self.last_improvement = 0;
    }

    /// Evaluate every genome without a cached fitness.
    fn evaluate_population(&mut self) {
        let fitness = self.fitness.as_ref();
        let uniqueness = self.uniqueness.as_ref();
        let cache = &self.cache;

        let evaluate = |genome: &mut DeckGenome| {
            if genome.fitness.is_some() {
                return;
            }
            let key = genome.key();
            let value = match cache.get(&key) {
                Some(value) => value,
                None => {
                    let value = score_deck(fitness, uniqueness, &genome.cards);
                    cache.insert(key, value);
                    value
                }
            };
            genome.fitness = Some(value);
        };

        if self.config.parallel_evaluations {
            self.islands
                .par_iter_mut()
                .flat_map(|island| island.par_iter_mut())
                .for_each(evaluate);
        } else {
            for genome in self.islands.iter_mut().flatten() {
                evaluate(genome);
            }
        }
    }

    /// Breed the next generation of one island.
    fn next_generation(&mut self, mut population: Vec<DeckGenome>) -> Vec<DeckGenome> {
        sort_by_fitness(&mut population);
        let size = population.len();
        let mut next = Vec::with_capacity(size);

        // Elitism: keep best individuals
        next.extend(population.iter().take(self.config.elite_count.min(size)).cloned());

        while next.len() < size {
            let idx1 = self.select_index(&population);
            let idx2 = self.select_index(&population);

            let mut child = if self.rng.chance(self.config.crossover_rate) {
                self.rng
                    .crossover(&population[idx1], &population[idx2], &self.pool)
            } else {
                population[idx1].clone()
            };

            if self.rng.chance(self.config.mutation_rate) {
                self.rng
                    .mutate(&mut child, self.config.mutation_intensity, &self.pool);
            }

            next.push(child);
        }

        next
    }

    /// Tournament selection.
    fn select_index(&mut self, population: &[DeckGenome]) -> usize {
        let mut best_idx = 0;
        let mut best_fitness = f64::NEG_INFINITY;
        for _ in 0..self.config.tournament_size.max(1) {
            let idx = self.rng.index(population.len());
            if population[idx].score() > best_fitness {
                best_fitness = population[idx].score();
                best_idx = idx;
            }
        }
        best_idx
    }

    /// Ring migration: each island's best replace the next island's worst.
    fn migrate(&mut self) {
        let count = self.islands.len();
        if count < 2 {
            return;
        }

        for island in &mut self.islands {
            sort_by_fitness(island);
        }
        let migrants: Vec<Vec<DeckGenome>> = self
            .islands
            .iter()
            .map(|island| {
                island
                    .iter()
                    .take(self.config.migration_size)
                    .cloned()
                    .collect()
            })
            .collect();

        for (source, group) in migrants.into_iter().enumerate() {
            let dest = &mut self.islands[(source + 1) % count];
            let keep = dest.len().saturating_sub(group.len());
            dest.truncate(keep);
            dest.extend(group);
        }

        log::debug!(
            "generation {}: migrated {} decks between {} islands",
            self.generation,
            self.config.migration_size,
            count
        );
    }

    /// Merge evaluated genomes into the hall of fame.
    fn update_hall_of_fame(&mut self) {
        let mut known: HashSet<String> = self.hall_of_fame.iter().map(DeckGenome::key).collect();
        for genome in self.islands.iter().flatten() {
            if genome.fitness.is_some() && known.insert(genome.key()) {
                self.hall_of_fame.push(genome.clone());
            }
        }
        sort_by_fitness(&mut self.hall_of_fame);
        self.hall_of_fame
            .truncate(self.config.hall_of_fame_size.max(1));
    }

    fn track_best(&mut self) {
        let generation_best = self
            .islands
            .iter()
            .flatten()
            .map(DeckGenome::score)
            .fold(f64::NEG_INFINITY, f64::max);
        if generation_best > self.best_fitness {
            self.best_fitness = generation_best;
            self.last_improvement = self.generation;
        }
    }

    /// Get current progress.
    pub fn progress(&self) -> GeneticProgress {
        let count = self.islands.iter().map(Vec::len).sum::<usize>();
        let avg_fitness = if count == 0 {
            0.0
        } else {
            self.islands
                .iter()
                .flatten()
                .map(DeckGenome::score)
                .sum::<f64>()
                / count as f64
        };

        GeneticProgress {
            generation: self.generation,
            best_fitness: self.best_fitness,
            avg_fitness,
            populations: self.islands.len(),
        }
    }

    /// Check if evolution should stop.
    fn should_stop(&self, cancel: &CancelToken) -> Option<StopReason> {
        if cancel.is_cancelled() {
            return Some(StopReason::Cancelled);
        }

        if self.generation >= self.config.generations {
            return Some(StopReason::MaxGenerations);
        }

        if self.config.target_fitness > 0.0 && self.best_fitness >= self.config.target_fitness {
            return Some(StopReason::TargetReached);
        }

        let window = self.config.convergence_generations;
        if window > 0 && self.generation - self.last_improvement >= window {
            return Some(StopReason::Converged);
        }

        None
    }

    /// Run evolution with progress callback.
    pub fn run_with_callback<F>(&mut self, cancel: &CancelToken, callback: F) -> GeneticResult
    where
        F: Fn(&GeneticProgress),
    {
        let start_time = Instant::now();

        self.initialize();
        self.evaluate_population();
        self.update_hall_of_fame();
        self.track_best();
        callback(&self.progress());

        let stop_reason = loop {
            if let Some(reason) = self.should_stop(cancel) {
                break reason;
            }

            let islands = std::mem::take(&mut self.islands);
            let next: Vec<Vec<DeckGenome>> = islands
                .into_iter()
                .map(|island| self.next_generation(island))
                .collect();
            self.islands = next;
            self.generation += 1;

            self.evaluate_population();
            if self.config.island_model
                && self.config.migration_interval > 0
                && self.generation % self.config.migration_interval == 0
            {
                self.migrate();
            }
            self.update_hall_of_fame();
            self.track_best();

            let progress = self.progress();
            log::debug!(
                "generation {}: best {:.4}, avg {:.4}",
                progress.generation,
                progress.best_fitness,
                progress.avg_fitness
            );
            callback(&progress);
        };

        let duration = start_time.elapsed();
        log::info!(
            "genetic search finished after {} generations in {:.2}s ({:?}), best fitness {:.4}",
            self.generation,
            duration.as_secs_f64(),
            stop_reason,
            self.best_fitness
        );

        GeneticResult {
            scores: self.hall_of_fame.iter().map(DeckGenome::score).collect(),
            hall_of_fame: self.hall_of_fame.clone(),
            generations: self.generation,
            duration,
            stop_reason,
        }
    }

    /// Run evolution (blocking).
    pub fn run(&mut self, cancel: &CancelToken) -> GeneticResult {
        self.run_with_callback(cancel, |_| {})
    }
}

/// Fitness plus any uniqueness bonus. Failures score 0.
fn score_deck(
    fitness: &dyn FitnessFunction,
    uniqueness: Option<&UniquenessScorer>,
    cards: &[String],
) -> f64 {
    let base = match fitness.fitness(cards) {
        Ok(value) if value.is_finite() => value,
        Ok(value) => {
            log::debug!("non-finite fitness {value} for {cards:?}");
            0.0
        }
        Err(e) => {
            log::debug!("{e} for {cards:?}");
            0.0
        }
    };
    base + uniqueness.map_or(0.0, |scorer| scorer.bonus(cards))
}

/// Members per island, summing to `population` (at least one each).
fn island_sizes(population: usize, islands: usize) -> Vec<usize> {
    let islands = islands.max(1);
    let base = population / islands;
    let extra = population % islands;
    (0..islands)
        .map(|i| (base + usize::from(i < extra)).max(1))
        .collect()
}

fn sort_by_fitness(population: &mut [DeckGenome]) {
    population.sort_by(|a, b| b.score().total_cmp(&a.score()));
}
