//! Card uniqueness scoring.
//!
//! Rewards decks built from rarely played cards. Popularity is a value in
//! [0, 1] per card; uniqueness is its complement.

use std::collections::HashMap;

use crate::schema::UniquenessConfig;

/// Popularity assumed for cards missing from the table.
pub const UNKNOWN_POPULARITY: f64 = 0.5;

/// Scores decks by how unusual their cards are.
#[derive(Debug, Clone, Default)]
pub struct UniquenessScorer {
    config: UniquenessConfig,
    popularity: HashMap<String, f64>,
}

impl UniquenessScorer {
    pub fn new(config: UniquenessConfig) -> Self {
        Self {
            config,
            popularity: HashMap::new(),
        }
    }

    /// Use an explicit popularity table.
    pub fn with_popularity(mut self, popularity: HashMap<String, f64>) -> Self {
        self.popularity = popularity
            .into_iter()
            .map(|(name, p)| (name, p.clamp(0.0, 1.0)))
            .collect();
        self
    }

    pub fn config(&self) -> &UniquenessConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Derive popularity from observed play frequencies.
    ///
    /// A card seen in half of all decks is treated as fully popular.
    pub fn update_from_frequencies(&mut self, frequencies: &HashMap<String, f64>) {
        for (name, freq) in frequencies {
            self.popularity
                .insert(name.clone(), (freq * 2.0).clamp(0.0, 1.0));
        }
    }

    /// Uniqueness of one card in [0, 1].
    pub fn card_uniqueness(&self, name: &str) -> f64 {
        1.0 - self
            .popularity
            .get(name)
            .copied()
            .unwrap_or(UNKNOWN_POPULARITY)
    }

    /// Combined uniqueness of a deck in [0, 1].
    ///
    /// Cards under the minimum threshold count as 0, so under the geometric
    /// mean a single popular card zeroes the whole deck.
    pub fn score_deck(&self, deck: &[String]) -> f64 {
        if deck.is_empty() {
            return 0.0;
        }

        let scores: Vec<f64> = deck
            .iter()
            .map(|name| {
                let u = self.card_uniqueness(name);
                if u < self.config.min_uniqueness_threshold {
                    0.0
                } else {
                    u
                }
            })
            .collect();

        let n = scores.len() as f64;
        if self.config.use_geometric_mean {
            if scores.iter().any(|&s| s <= 0.0) {
                return 0.0;
            }
            (scores.iter().map(|s| s.ln()).sum::<f64>() / n).exp()
        } else {
            scores.iter().sum::<f64>() / n
        }
    }

    /// Weighted bonus to add to a fitness value, 0 when disabled.
    pub fn bonus(&self, deck: &[String]) -> f64 {
        if !self.config.enabled {
            return 0.0;
        }
        self.score_deck(deck) * self.config.weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deck(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn scorer(geometric: bool) -> UniquenessScorer {
        let popularity = HashMap::from([
            ("Hog Rider".to_string(), 0.9),
            ("Mortar".to_string(), 0.1),
            ("Goblin Drill".to_string(), 0.2),
        ]);
        UniquenessScorer::new(UniquenessConfig {
            enabled: true,
            use_geometric_mean: geometric,
            ..Default::default()
        })
        .with_popularity(popularity)
    }

    #[test]
    fn test_card_uniqueness() {
        let scorer = scorer(false);
        assert!((scorer.card_uniqueness("Mortar") - 0.9).abs() < 1e-9);
        assert_eq!(scorer.card_uniqueness("Unknown"), 0.5);
    }

    #[test]
    fn test_arithmetic_mean_with_threshold() {
        let scorer = scorer(false);
        // Hog Rider (0.1) falls under the 0.5 threshold and counts as 0.
        let score = scorer.score_deck(&deck(&["Hog Rider", "Mortar", "Goblin Drill"]));
        assert!((score - (0.0 + 0.9 + 0.8) / 3.0).abs() < 1e-9);
        assert_eq!(scorer.score_deck(&[]), 0.0);
    }

    #[test]
    fn test_geometric_mean() {
        let scorer = scorer(true);
        assert_eq!(
            scorer.score_deck(&deck(&["Hog Rider", "Mortar"])),
            0.0
        );
        let score = scorer.score_deck(&deck(&["Mortar", "Goblin Drill"]));
        assert!((score - (0.9f64 * 0.8).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_update_from_frequencies() {
        let mut scorer = scorer(false);
        scorer.update_from_frequencies(&HashMap::from([
            ("Mortar".to_string(), 0.1),
            ("Hog Rider".to_string(), 0.7),
        ]));
        assert!((scorer.card_uniqueness("Mortar") - 0.8).abs() < 1e-9);
        assert_eq!(scorer.card_uniqueness("Hog Rider"), 0.0);
    }

    #[test]
    fn test_bonus_respects_toggle() {
        let cards = deck(&["Mortar"]);
        let enabled = scorer(false);
        assert!((enabled.bonus(&cards) - 0.9 * 0.15).abs() < 1e-9);

        let disabled = UniquenessScorer::default();
        assert!(!disabled.is_enabled());
        assert_eq!(disabled.bonus(&cards), 0.0);
    }
}
