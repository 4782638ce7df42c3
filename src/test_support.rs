//! Shared fixtures for unit tests.

use crate::schema::{CardCandidate, CardRole};

/// Build a pool of `count` candidates.
///
/// The first 13 cards are fixed: 4 win conditions, 3 buildings, 3 big spells
/// and 3 small spells. The rest alternate between `Support{i}` (3 elixir) and
/// `Cycle{i}` (1 elixir) cards.
pub(crate) fn test_candidates(count: usize) -> Vec<CardCandidate> {
    let fixed: [(&str, u32, CardRole, f64); 13] = [
        ("Hog Rider", 4, CardRole::WinCondition, 1.2),
        ("Giant", 5, CardRole::WinCondition, 1.2),
        ("Miner", 3, CardRole::WinCondition, 1.2),
        ("Balloon", 5, CardRole::WinCondition, 1.2),
        ("Cannon", 3, CardRole::Building, 1.0),
        ("Tesla", 4, CardRole::Building, 1.0),
        ("Inferno Tower", 5, CardRole::Building, 1.0),
        ("Fireball", 4, CardRole::SpellBig, 1.0),
        ("Rocket", 6, CardRole::SpellBig, 1.0),
        ("Lightning", 6, CardRole::SpellBig, 1.0),
        ("Zap", 2, CardRole::SpellSmall, 1.0),
        ("Log", 2, CardRole::SpellSmall, 1.0),
        ("Arrows", 3, CardRole::SpellSmall, 1.0),
    ];

    let mut candidates: Vec<CardCandidate> = fixed
        .iter()
        .enumerate()
        .take(count)
        .map(|(i, (name, elixir, role, score))| {
            let mut card = CardCandidate::new(*name, *elixir, Some(*role), *score);
            card.level = 11;
            card.max_level = 15;
            if *role == CardRole::WinCondition {
                card.max_evolution_level = 3;
                if i % 2 == 0 {
                    card.evolution_level = 1;
                }
            }
            card
        })
        .collect();

    let mut i = 0;
    while candidates.len() < count {
        candidates.push(CardCandidate::new(
            format!("Support{i}"),
            3,
            Some(CardRole::Support),
            0.9,
        ));
        if candidates.len() < count {
            candidates.push(CardCandidate::new(
                format!("Cycle{}", i + 1),
                1,
                Some(CardRole::Cycle),
                0.8,
            ));
        }
        i += 1;
    }

    candidates
}

/// Candidate names in pool order.
pub(crate) fn names(candidates: &[CardCandidate]) -> Vec<String> {
    candidates.iter().map(|c| c.name.clone()).collect()
}
