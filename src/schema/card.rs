//! Card candidate types: roles, per-card metadata and role composition.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of cards in a deck.
pub const DECK_SIZE: usize = 8;

/// An ordered sequence of card names.
pub type Deck = Vec<String>;

/// Strategic category used to balance deck composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CardRole {
    #[serde(rename = "win_conditions")]
    WinCondition,
    #[serde(rename = "buildings")]
    Building,
    #[serde(rename = "spells_big")]
    SpellBig,
    #[serde(rename = "spells_small")]
    SpellSmall,
    #[serde(rename = "support")]
    Support,
    #[serde(rename = "cycle")]
    Cycle,
}

impl CardRole {
    /// All roles in composition order.
    pub const ALL: [CardRole; 6] = [
        CardRole::WinCondition,
        CardRole::Building,
        CardRole::SpellBig,
        CardRole::SpellSmall,
        CardRole::Support,
        CardRole::Cycle,
    ];

    /// Stable string key, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            CardRole::WinCondition => "win_conditions",
            CardRole::Building => "buildings",
            CardRole::SpellBig => "spells_big",
            CardRole::SpellSmall => "spells_small",
            CardRole::Support => "support",
            CardRole::Cycle => "cycle",
        }
    }
}

impl fmt::Display for CardRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A card under consideration for deck building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardCandidate {
    /// Card name, unique inside a candidate pool.
    pub name: String,
    /// Current card level.
    #[serde(default)]
    pub level: u32,
    /// Maximum reachable level.
    #[serde(default)]
    pub max_level: u32,
    /// Rarity label (Common, Rare, Epic, ...).
    #[serde(default)]
    pub rarity: String,
    /// Elixir cost.
    pub elixir: u32,
    /// Strategic role, if known.
    #[serde(default)]
    pub role: Option<CardRole>,
    /// Desirability score. Higher is better.
    #[serde(default)]
    pub score: f64,
    /// Current evolution level (0 = not evolved).
    #[serde(default)]
    pub evolution_level: u32,
    /// Maximum evolution level (0 = no evolution exists).
    #[serde(default)]
    pub max_evolution_level: u32,
}

impl CardCandidate {
    /// Create a candidate with only the fields needed for deck building.
    pub fn new(name: impl Into<String>, elixir: u32, role: Option<CardRole>, score: f64) -> Self {
        Self {
            name: name.into(),
            level: 0,
            max_level: 0,
            rarity: String::new(),
            elixir,
            role,
            score,
            evolution_level: 0,
            max_evolution_level: 0,
        }
    }

    /// Build a candidate by looking up role and elixir in a metadata provider.
    pub fn from_metadata(
        name: &str,
        level: u32,
        max_level: u32,
        rarity: &str,
        evolution_level: u32,
        max_evolution_level: u32,
        metadata: &dyn CardMetadata,
    ) -> Self {
        Self {
            name: name.to_string(),
            level,
            max_level,
            rarity: rarity.to_string(),
            elixir: metadata.elixir_cost(name),
            role: metadata.role(name, evolution_level),
            score: 0.0,
            evolution_level,
            max_evolution_level,
        }
    }

    /// Level progression in [0, 1].
    ///
    /// Blends card level (70%) with evolution level (30%) when the card can
    /// evolve, otherwise the plain card-level ratio.
    pub fn level_ratio(&self) -> f64 {
        if self.max_level == 0 {
            return 0.0;
        }
        let card_ratio = self.level as f64 / self.max_level as f64;
        if self.max_evolution_level == 0 {
            return card_ratio;
        }
        let evo_ratio = self.evolution_level as f64 / self.max_evolution_level as f64;
        card_ratio * 0.7 + evo_ratio * 0.3
    }

    /// Whether this card is currently evolved.
    pub fn is_evolved(&self) -> bool {
        self.evolution_level > 0
    }

    /// Whether this card is a win condition.
    pub fn is_win_condition(&self) -> bool {
        self.role == Some(CardRole::WinCondition)
    }
}

/// Lookup service for card roles and elixir costs.
pub trait CardMetadata {
    /// Role of a card, optionally different when evolved.
    fn role(&self, name: &str, evolution_level: u32) -> Option<CardRole>;
    /// Elixir cost of a card.
    fn elixir_cost(&self, name: &str) -> u32;
}

/// Map-backed metadata provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticCardMetadata {
    /// Card name to role.
    #[serde(default)]
    pub roles: HashMap<String, CardRole>,
    /// Card name to role when evolved. Falls back to `roles`.
    #[serde(default)]
    pub evolved_roles: HashMap<String, CardRole>,
    /// Card name to elixir cost.
    #[serde(default)]
    pub elixir: HashMap<String, u32>,
    /// Cost reported for unknown cards.
    #[serde(default = "default_unknown_elixir")]
    pub unknown_elixir: u32,
}

fn default_unknown_elixir() -> u32 {
    4
}

impl Default for StaticCardMetadata {
    fn default() -> Self {
        Self {
            roles: HashMap::new(),
            evolved_roles: HashMap::new(),
            elixir: HashMap::new(),
            unknown_elixir: default_unknown_elixir(),
        }
    }
}

impl StaticCardMetadata {
    /// Register a card.
    pub fn insert(&mut self, name: &str, role: Option<CardRole>, elixir: u32) {
        if let Some(role) = role {
            self.roles.insert(name.to_string(), role);
        }
        self.elixir.insert(name.to_string(), elixir);
    }
}

impl CardMetadata for StaticCardMetadata {
    fn role(&self, name: &str, evolution_level: u32) -> Option<CardRole> {
        if evolution_level > 0
            && let Some(role) = self.evolved_roles.get(name)
        {
            return Some(*role);
        }
        self.roles.get(name).copied()
    }

    fn elixir_cost(&self, name: &str) -> u32 {
        self.elixir
            .get(name)
            .copied()
            .unwrap_or(self.unknown_elixir)
    }
}

/// Target per-role card counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleComposition {
    #[serde(default = "default_one")]
    pub win_conditions: usize,
    #[serde(default = "default_one")]
    pub buildings: usize,
    #[serde(default = "default_one")]
    pub big_spells: usize,
    #[serde(default = "default_one")]
    pub small_spells: usize,
    #[serde(default = "default_two")]
    pub support: usize,
    #[serde(default = "default_two")]
    pub cycle: usize,
}

fn default_one() -> usize {
    1
}

fn default_two() -> usize {
    2
}

impl Default for RoleComposition {
    fn default() -> Self {
        Self {
            win_conditions: 1,
            buildings: 1,
            big_spells: 1,
            small_spells: 1,
            support: 2,
            cycle: 2,
        }
    }
}

impl RoleComposition {
    /// Target count for a role.
    pub fn target(&self, role: CardRole) -> usize {
        match role {
            CardRole::WinCondition => self.win_conditions,
            CardRole::Building => self.buildings,
            CardRole::SpellBig => self.big_spells,
            CardRole::SpellSmall => self.small_spells,
            CardRole::Support => self.support,
            CardRole::Cycle => self.cycle,
        }
    }

    /// Role quotas in composition order.
    pub fn quotas(&self) -> [(CardRole, usize); 6] {
        CardRole::ALL.map(|role| (role, self.target(role)))
    }

    /// Sum of all role targets.
    pub fn total(&self) -> usize {
        CardRole::ALL.iter().map(|role| self.target(*role)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ratio_without_evolution() {
        let mut card = CardCandidate::new("Knight", 3, Some(CardRole::Support), 1.0);
        assert_eq!(card.level_ratio(), 0.0);

        card.level = 10;
        card.max_level = 15;
        assert!((card.level_ratio() - 10.0 / 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_level_ratio_blends_evolution() {
        let mut card = CardCandidate::new("Knight", 3, Some(CardRole::Support), 1.0);
        card.level = 15;
        card.max_level = 15;
        card.evolution_level = 0;
        card.max_evolution_level = 2;
        assert!((card.level_ratio() - 0.7).abs() < 1e-9);

        card.evolution_level = 2;
        assert!((card.level_ratio() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_default_composition_fills_deck() {
        let composition = RoleComposition::default();
        assert_eq!(composition.total(), DECK_SIZE);
        assert_eq!(composition.quotas()[0], (CardRole::WinCondition, 1));
        assert_eq!(composition.quotas()[5], (CardRole::Cycle, 2));
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&CardRole::SpellBig).unwrap();
        assert_eq!(json, "\"spells_big\"");
        let role: CardRole = serde_json::from_str("\"win_conditions\"").unwrap();
        assert_eq!(role, CardRole::WinCondition);
        assert_eq!(CardRole::Cycle.to_string(), "cycle");
    }

    #[test]
    fn test_candidate_from_metadata() {
        let mut metadata = StaticCardMetadata::default();
        metadata.insert("Hog Rider", Some(CardRole::WinCondition), 4);
        metadata
            .evolved_roles
            .insert("Knight".to_string(), CardRole::Support);

        let hog = CardCandidate::from_metadata("Hog Rider", 11, 15, "Rare", 0, 0, &metadata);
        assert_eq!(hog.elixir, 4);
        assert_eq!(hog.role, Some(CardRole::WinCondition));

        let knight = CardCandidate::from_metadata("Knight", 14, 15, "Common", 1, 1, &metadata);
        assert_eq!(knight.role, Some(CardRole::Support));
        assert_eq!(knight.elixir, 4);
        assert!(knight.is_evolved());
    }
}
