//! Genetic search over 8-card decks.
//!
//! # Overview
//!
//! - **Fitness** (`fitness`): pluggable deck scoring plus a per-run cache
//! - **Genomes** (`genome`): the gene pool, random decks, crossover and mutation
//! - **Search** (`search`): the generational optimizer, optionally split into
//!   islands with ring migration
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use deck_discovery::compute::CancelToken;
//! use deck_discovery::compute::evolution::{CandidateScoreFitness, GeneticOptimizer};
//! use deck_discovery::schema::{CardCandidate, CardRole, GeneticConfig};
//!
//! let candidates: Vec<CardCandidate> = (0..20)
//!     .map(|i| CardCandidate::new(format!("Card {i}"), 3, Some(CardRole::Support), 1.0))
//!     .collect();
//! let fitness = Arc::new(CandidateScoreFitness::new(&candidates));
//!
//! let mut optimizer = GeneticOptimizer::new(&candidates, GeneticConfig::default(), fitness)?;
//! let result = optimizer.run_with_callback(&CancelToken::new(), |progress| {
//!     println!("Generation {}: best fitness = {:.3}",
//!         progress.generation, progress.best_fitness);
//! });
//! println!("Best deck: {:?}", result.hall_of_fame[0].cards);
//! # Ok::<(), deck_discovery::compute::evolution::GeneticError>(())
//! ```

mod fitness;
mod genome;
mod search;

pub use fitness::{CandidateScoreFitness, FitnessCache, FitnessError, FitnessFunction};
pub use genome::{CrossoverOperator, DeckGenome, GenePool, GenomeRng, MutationOperator};
pub use search::{GeneticError, GeneticOptimizer, GeneticResult, ProgressCallback};
