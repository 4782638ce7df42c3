//! Deck Discovery - search engine for 8-card deck spaces.
//!
//! This crate explores combinations of 8 distinct cards drawn from a larger
//! candidate pool, under role-composition and elixir constraints. The space
//! can hold hundreds of billions of decks, so it offers several ways through
//! it: exhaustive enumeration, random and score-weighted sampling, and a
//! genetic optimizer.
//!
//! # Architecture
//!
//! The crate is split into three main modules:
//!
//! - `schema`: Card, configuration and checkpoint types
//! - `compute`: Deck generation, deck-space counting, iterators and genetic search
//! - `discovery`: Long-running, rate-limited and resumable evaluation sessions
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use deck_discovery::{
//!     compute::{CancelToken, DeckGenerator, DeckSpaceCalculator, format_large_number},
//!     schema::{CardCandidate, CardRole, GeneratorConfig, GeneratorStrategy},
//! };
//!
//! let candidates: Vec<CardCandidate> = (0..40)
//!     .map(|i| CardCandidate::new(format!("Card {i}"), 3, Some(CardRole::ALL[i % 6]), 1.0))
//!     .collect();
//!
//! let space = DeckSpaceCalculator::new(&candidates);
//! println!("Total decks: {}", format_large_number(Some(&space.total_combinations())));
//!
//! let config = GeneratorConfig::new(GeneratorStrategy::SmartSample, candidates);
//! let generator = Arc::new(DeckGenerator::new(config)?);
//! for deck in generator.generate(&CancelToken::new(), 5)? {
//!     println!("{}", deck.join(", "));
//! }
//! # Ok::<(), deck_discovery::compute::GeneratorError>(())
//! ```

pub mod compute;
pub mod discovery;
pub mod schema;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use compute::{CancelToken, DeckGenerator, DeckIterator, DeckSpaceCalculator};
pub use discovery::{DiscoveryConfig, DiscoveryRunner, MemoryStore};
pub use schema::{CardCandidate, CardRole, GeneratorConfig, GeneratorStrategy};
