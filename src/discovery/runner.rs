//! Long-running discovery sessions.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};

use crate::compute::{CancelToken, DeckGenerator, DeckIterator, GeneratorError};
use crate::schema::{
    DiscoveryCheckpoint, DiscoveryStats, GeneratorCheckpoint, GeneratorConfig, GeneratorStrategy,
};

use super::checkpoint::{CheckpointError, load_checkpoint, save_checkpoint};
use super::collaborators::{
    DeckEvaluator, EvaluationError, EvaluatorFitness, ResultStore, ScoreRecord, SortField,
    SortOrder, deck_hash,
};
use super::paths::SessionPaths;
use super::player_tag::{PlayerTagError, sanitize_player_tag};
use super::rate_limit::RateLimiter;

/// Number of scores kept in the leaderboard snapshot.
pub const TOP_SCORES: usize = 5;

/// Called with a statistics snapshot after every evaluated deck.
pub type DiscoveryProgressCallback = Box<dyn Fn(&DiscoveryStats) + Send + Sync>;

/// Discovery session failure.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("deck evaluator is required")]
    MissingEvaluator,
    #[error("result store is required")]
    MissingStore,
    #[error("invalid player tag: {0}")]
    InvalidPlayerTag(#[from] PlayerTagError),
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error("discovery cancelled")]
    Cancelled,
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Session settings and collaborators.
pub struct DiscoveryConfig {
    pub generator: GeneratorConfig,
    pub evaluator: Option<Arc<dyn DeckEvaluator>>,
    pub store: Option<Arc<dyn ResultStore>>,
    pub player_tag: String,
    /// Overrides `~/.cr-api/discover`.
    pub checkpoint_dir: Option<PathBuf>,
    /// Evaluation cadence; 0 disables limiting.
    pub evaluations_per_second: f64,
    /// Decks the session is expected to evaluate, if known up front.
    pub total: Option<u64>,
    pub progress: Option<DiscoveryProgressCallback>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            evaluator: None,
            store: None,
            player_tag: String::new(),
            checkpoint_dir: None,
            evaluations_per_second: 1.0,
            total: None,
            progress: None,
        }
    }
}

#[derive(Debug)]
struct SessionState {
    stats: DiscoveryStats,
    score_sum: f64,
    session_evaluated: u64,
}

/// Pulls decks from one iterator, evaluates and stores them, and keeps the
/// session resumable.
pub struct DiscoveryRunner {
    generator: Arc<DeckGenerator>,
    evaluator: Arc<dyn DeckEvaluator>,
    store: Arc<dyn ResultStore>,
    tag: String,
    paths: SessionPaths,
    iterator: Mutex<Box<dyn DeckIterator>>,
    /// Iterator checkpoint as of the last pull, for saves during a pull.
    position: Mutex<GeneratorCheckpoint>,
    limiter: Mutex<RateLimiter>,
    state: RwLock<SessionState>,
    progress: Option<DiscoveryProgressCallback>,
}

impl DiscoveryRunner {
    pub fn new(config: DiscoveryConfig) -> Result<Self, DiscoveryError> {
        let evaluator = config.evaluator.ok_or(DiscoveryError::MissingEvaluator)?;
        let store = config.store.ok_or(DiscoveryError::MissingStore)?;
        let tag = sanitize_player_tag(&config.player_tag)?;

        let mut generator = DeckGenerator::new(config.generator)?;
        if generator.strategy() == GeneratorStrategy::Genetic {
            generator = generator.with_fitness(Arc::new(EvaluatorFitness::new(Arc::clone(
                &evaluator,
            ))));
        }
        let generator = Arc::new(generator);
        let iterator = generator.iterator()?;
        let position = iterator.checkpoint();

        let paths = match config.checkpoint_dir {
            Some(dir) => SessionPaths::in_dir(dir, &tag),
            None => SessionPaths::new(&tag),
        };
        paths.ensure_dir()?;

        let total = config
            .total
            .or_else(|| generator.estimated_total())
            .unwrap_or(0);
        let stats = DiscoveryStats::new(generator.strategy(), &tag, total);

        Ok(Self {
            generator,
            evaluator,
            store,
            tag,
            paths,
            iterator: Mutex::new(iterator),
            position: Mutex::new(position),
            limiter: Mutex::new(RateLimiter::per_second(config.evaluations_per_second)),
            state: RwLock::new(SessionState {
                stats,
                score_sum: 0.0,
                session_evaluated: 0,
            }),
            progress: config.progress,
        })
    }

    /// Sanitized player tag.
    pub fn player_tag(&self) -> &str {
        &self.tag
    }

    pub fn paths(&self) -> &SessionPaths {
        &self.paths
    }

    /// Run until the iterator is exhausted or `cancel` fires.
    ///
    /// A checkpoint is written on both outcomes. The iterator is closed on
    /// return; call [`DiscoveryRunner::resume`] before running again.
    pub fn run(&self, cancel: &CancelToken) -> Result<(), DiscoveryError> {
        log::info!(
            "starting discovery for #{} using {} ({} candidates)",
            self.tag,
            self.generator.strategy(),
            self.generator.candidates().len()
        );
        if let Err(e) = fs::write(self.paths.pid(), std::process::id().to_string()) {
            log::warn!("could not write pid file: {e}");
        }

        let result = self.run_loop(cancel);

        self.iterator.lock().close();
        if let Err(e) = fs::remove_file(self.paths.pid())
            && e.kind() != io::ErrorKind::NotFound
        {
            log::warn!("could not remove pid file: {e}");
        }

        let stats = self.stats();
        log::info!(
            "discovery for #{} stopped after {} decks ({:.2}/s), best score {:.2}",
            self.tag,
            stats.evaluated,
            stats.rate,
            stats.best_score
        );
        result
    }

    fn run_loop(&self, cancel: &CancelToken) -> Result<(), DiscoveryError> {
        loop {
            if cancel.is_cancelled() || !self.limiter.lock().wait(cancel) {
                return self.cancelled();
            }

            // The genetic strategy runs its whole search inside the first
            // pull; save_checkpoint falls back to `position` meanwhile.
            let next = {
                let mut iterator = self.iterator.lock();
                let next = iterator.next_deck(cancel);
                *self.position.lock() = iterator.checkpoint();
                next
            };
            let deck = match next {
                Ok(Some(deck)) => deck,
                Ok(None) => {
                    self.save_checkpoint()?;
                    log::info!("deck space exhausted for #{}", self.tag);
                    return Ok(());
                }
                Err(GeneratorError::Cancelled) => return self.cancelled(),
                Err(e) => return Err(e.into()),
            };

            if let Err(e) = self.evaluate_deck(&deck) {
                log::warn!("skipping deck {deck:?}: {e}");
            }
        }
    }

    fn cancelled(&self) -> Result<(), DiscoveryError> {
        if let Err(e) = self.save_checkpoint() {
            log::warn!("could not save checkpoint on cancellation: {e}");
        }
        Err(DiscoveryError::Cancelled)
    }

    /// Evaluate one deck, store it and fold it into the statistics.
    ///
    /// Store failures are logged and the deck still counts as evaluated.
    pub fn evaluate_deck(&self, deck: &[String]) -> Result<ScoreRecord, DiscoveryError> {
        let mut record = self.evaluator.evaluate(deck)?;
        if record.cards.is_empty() {
            record.cards = deck.to_vec();
        }
        if record.deck_hash.is_empty() {
            record.deck_hash = deck_hash(&record.cards);
        }
        if record.avg_elixir == 0.0 {
            record.avg_elixir = self.generator.average_elixir(&record.cards);
        }
        record.strategy = self.generator.strategy();
        record.player_tag = format!("#{}", self.tag);

        let stored = match self.store.insert(record.clone()) {
            Ok(outcome) => {
                record.id = outcome.id;
                !outcome.duplicate
            }
            Err(e) => {
                log::warn!("could not store deck: {e}");
                false
            }
        };

        let snapshot = self.update_stats(&record, stored);
        if let Some(callback) = &self.progress {
            callback(&snapshot);
        }
        Ok(record)
    }

    fn update_stats(&self, record: &ScoreRecord, stored: bool) -> DiscoveryStats {
        let leaderboard = self
            .store
            .query(SortField::Overall, SortOrder::Descending, TOP_SCORES);
        let top_scores = match leaderboard {
            Ok(records) => Some(records.iter().map(|r| r.overall_score).collect()),
            Err(e) => {
                log::warn!("could not refresh leaderboard: {e}");
                None
            }
        };

        let mut state = self.state.write();
        state.score_sum += record.overall_score;
        state.session_evaluated += 1;
        let score_sum = state.score_sum;
        let session_evaluated = state.session_evaluated;

        let stats = &mut state.stats;
        stats.evaluated += 1;
        if stored {
            stats.stored += 1;
        }
        stats.avg_score = score_sum / stats.evaluated as f64;
        if stats.best_deck.is_empty() || record.overall_score > stats.best_score {
            stats.best_score = record.overall_score;
            stats.best_deck = record.cards.clone();
        }
        if let Some(top_scores) = top_scores {
            stats.top_scores = top_scores;
        }

        let elapsed = Utc::now() - stats.start_time;
        stats.elapsed_seconds = elapsed
            .num_microseconds()
            .map_or(elapsed.num_seconds() as f64, |us| us as f64 / 1e6);
        stats.rate = if stats.elapsed_seconds > 0.0 {
            session_evaluated as f64 / stats.elapsed_seconds
        } else {
            0.0
        };
        stats.eta_seconds = if stats.total > 0 && stats.rate > 0.0 {
            Some(stats.total.saturating_sub(stats.evaluated) as f64 / stats.rate)
        } else {
            None
        };

        log::debug!(
            "evaluated {} decks, score {:.2}, best {:.2}",
            stats.evaluated,
            record.overall_score,
            stats.best_score
        );
        stats.clone()
    }

    /// Snapshot of the running statistics.
    pub fn stats(&self) -> DiscoveryStats {
        self.state.read().stats.clone()
    }

    /// Persist the iterator position and statistics.
    ///
    /// Never waits on a pull in progress: while another thread is inside
    /// `next_deck`, the position recorded after the previous pull is saved.
    pub fn save_checkpoint(&self) -> Result<(), DiscoveryError> {
        let generator_checkpoint = match self.iterator.try_lock() {
            Some(iterator) => {
                let current = iterator.checkpoint();
                *self.position.lock() = current.clone();
                current
            }
            None => self.position.lock().clone(),
        };
        let checkpoint = DiscoveryCheckpoint {
            generator_checkpoint,
            stats: self.stats(),
            timestamp: Utc::now(),
            player_tag: self.tag.clone(),
            strategy: self.generator.strategy(),
        };
        save_checkpoint(&self.paths.checkpoint(), &checkpoint)?;
        log::debug!("checkpoint saved to {}", self.paths.checkpoint().display());
        Ok(())
    }

    /// Restore the iterator and statistics from the saved checkpoint.
    ///
    /// The session clock restarts, so rate and ETA cover only the resumed
    /// session; the average score carries over.
    pub fn resume(&self) -> Result<(), DiscoveryError> {
        let checkpoint = load_checkpoint(&self.paths.checkpoint())?;
        {
            let mut iterator = self.iterator.lock();
            iterator.resume(&checkpoint.generator_checkpoint)?;
            *self.position.lock() = iterator.checkpoint();
        }

        let mut stats = checkpoint.stats;
        stats.start_time = Utc::now();
        stats.elapsed_seconds = 0.0;
        stats.rate = 0.0;
        stats.eta_seconds = None;
        if stats.total == 0 {
            stats.total = self.state.read().stats.total;
        }

        let mut state = self.state.write();
        state.score_sum = stats.avg_score * stats.evaluated as f64;
        state.session_evaluated = 0;
        log::info!(
            "resumed discovery for #{} at {} evaluated decks",
            self.tag,
            stats.evaluated
        );
        state.stats = stats;
        Ok(())
    }

    pub fn has_checkpoint(&self) -> bool {
        self.paths.checkpoint().is_file()
    }

    /// Delete the saved checkpoint, if any.
    pub fn clear_checkpoint(&self) -> Result<(), DiscoveryError> {
        match fs::remove_file(self.paths.checkpoint()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Human-readable session summary.
    pub fn status_summary(&self) -> String {
        let stats = self.stats();
        let mut out = String::new();

        let _ = writeln!(out, "Discovery Status for {}", stats.player_tag);
        let _ = writeln!(out, "Strategy: {}", stats.strategy);
        if stats.total > 0 {
            let _ = writeln!(
                out,
                "Progress: {} / {} ({:.1}%)",
                stats.evaluated,
                stats.total,
                stats.evaluated as f64 / stats.total as f64 * 100.0
            );
        } else {
            let _ = writeln!(out, "Progress: {} evaluated", stats.evaluated);
        }
        let _ = writeln!(out, "Stored: {}", stats.stored);
        let _ = writeln!(out, "Rate: {:.2} decks/sec", stats.rate);
        if let Some(eta) = stats.eta_seconds {
            let _ = writeln!(out, "ETA: {}", format_duration(eta));
        }
        let _ = writeln!(out, "Average Score: {:.2}", stats.avg_score);
        if !stats.best_deck.is_empty() {
            let _ = writeln!(out, "Best Score: {:.2}", stats.best_score);
            let _ = writeln!(out, "Best Deck: {}", stats.best_deck.join(", "));
        }
        if !stats.top_scores.is_empty() {
            let scores: Vec<String> = stats.top_scores.iter().map(|s| format!("{s:.2}")).collect();
            let _ = writeln!(out, "Top {}: {}", scores.len(), scores.join(", "));
        }
        out
    }
}

/// `1h 2m 3s` style duration.
fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let (h, m, s) = (total / 3600, total % 3600 / 60, total % 60);
    if h > 0 {
        format!("{h}h {m}m {s}s")
    } else if m > 0 {
        format!("{m}m {s}s")
    } else {
        format!("{s}s")
    }
}
