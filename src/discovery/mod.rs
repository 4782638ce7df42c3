//! Discovery module - continuous, resumable deck evaluation sessions.
//!
//! A [`DiscoveryRunner`] pulls decks from one generator iterator, hands each
//! to a [`DeckEvaluator`], records the result in a [`ResultStore`] and keeps a
//! checkpoint under `~/.cr-api/discover/<TAG>.json` so an interrupted session
//! can pick up where it stopped.

mod checkpoint;
mod collaborators;
mod paths;
mod player_tag;
mod rate_limit;
mod runner;
mod store;

pub use checkpoint::{CheckpointError, load_checkpoint, save_checkpoint};
pub use collaborators::{
    DeckEvaluator, EvaluationError, EvaluatorFitness, InsertOutcome, ResultStore, ScoreRecord,
    SortField, SortOrder, StoreError, deck_hash,
};
pub use paths::{SessionPaths, default_session_dir};
pub use player_tag::{PlayerTagError, sanitize_player_tag};
pub use rate_limit::RateLimiter;
pub use runner::{
    DiscoveryConfig, DiscoveryError, DiscoveryProgressCallback, DiscoveryRunner, TOP_SCORES,
};
pub use store::MemoryStore;
