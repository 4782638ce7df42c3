//! Deck genomes and the random operators that create and vary them.
//!
//! Every operator preserves the genome invariant: exactly 8 pairwise
//! distinct card names, all drawn from the gene pool. Crossover and mutation
//! also restore a win condition when the pool has one to spare.

use std::collections::{HashMap, HashSet};

use rand::prelude::*;
use rand::seq::index;

use crate::schema::{CardCandidate, CardRole, DECK_SIZE};

use super::search::GeneticError;

/// Card names available to the optimizer, with the traits operators use.
#[derive(Debug, Clone)]
pub struct GenePool {
    names: Vec<String>,
    positions: HashMap<String, usize>,
    roles: Vec<Option<CardRole>>,
    evolvable: Vec<bool>,
    win_conditions: Vec<usize>,
}

impl GenePool {
    /// Build a pool; needs at least 8 distinct cards.
    pub fn new(candidates: &[CardCandidate]) -> Result<Self, GeneticError> {
        let mut names = Vec::with_capacity(candidates.len());
        let mut positions = HashMap::with_capacity(candidates.len());
        let mut roles = Vec::with_capacity(candidates.len());
        let mut evolvable = Vec::with_capacity(candidates.len());
        let mut win_conditions = Vec::new();

        for card in candidates {
            if positions.contains_key(&card.name) {
                continue;
            }
            if card.is_win_condition() {
                win_conditions.push(names.len());
            }
            positions.insert(card.name.clone(), names.len());
            names.push(card.name.clone());
            roles.push(card.role);
            evolvable.push(card.is_evolved() || card.max_evolution_level > 0);
        }

        if names.len() < DECK_SIZE {
            return Err(GeneticError::InsufficientCandidates(names.len()));
        }

        Ok(Self {
            names,
            positions,
            roles,
            evolvable,
            win_conditions,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Role of a pool card; `None` for unknown names and role-less cards.
    pub fn role(&self, name: &str) -> Option<CardRole> {
        self.positions.get(name).and_then(|&i| self.roles[i])
    }

    /// Whether a pool card is evolved or has an evolution to unlock.
    pub fn can_evolve(&self, name: &str) -> bool {
        self.positions.get(name).is_some_and(|&i| self.evolvable[i])
    }

    pub fn is_win_condition(&self, name: &str) -> bool {
        self.role(name) == Some(CardRole::WinCondition)
    }

    /// Pool cards not in `deck`.
    fn unused<'a>(&'a self, deck: &'a [String]) -> impl Iterator<Item = &'a String> + 'a {
        self.names.iter().filter(move |name| !deck.contains(name))
    }
}

/// How two parents are recombined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossoverOperator {
    /// Per-slot coin flip between the parents.
    Uniform,
    /// Whole role groups taken from one parent or the other.
    RolePreserving,
}

impl CrossoverOperator {
    pub const ALL: [CrossoverOperator; 2] = [Self::Uniform, Self::RolePreserving];
}

/// How a mutated slot picks its replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOperator {
    /// Any unused card.
    SingleCard,
    /// An unused card sharing the old card's role.
    RoleBased,
    /// Favors unused cards that can evolve.
    EvolutionAware,
    /// Role-based or evolution-aware, chosen per slot.
    Mixed,
}

impl MutationOperator {
    pub const ALL: [MutationOperator; 4] = [
        Self::SingleCard,
        Self::RoleBased,
        Self::EvolutionAware,
        Self::Mixed,
    ];
}

/// Chance an evolution-aware swap picks an evolvable card.
const EVOLVED_PREFERENCE: f64 = 0.7;

/// One individual: an 8-card deck with its cached fitness.
#[derive(Debug, Clone, PartialEq)]
pub struct DeckGenome {
    pub cards: Vec<String>,
    /// `None` until evaluated, reset by mutation.
    pub fitness: Option<f64>,
}

impl DeckGenome {
    /// Wrap a known deck, checking it against the pool.
    pub fn from_cards(cards: Vec<String>, pool: &GenePool) -> Result<Self, GeneticError> {
        if cards.len() != DECK_SIZE {
            return Err(GeneticError::InvalidGenome(format!(
                "expected {DECK_SIZE} cards, got {}",
                cards.len()
            )));
        }
        let mut seen = HashSet::with_capacity(DECK_SIZE);
        for name in &cards {
            if !pool.contains(name) {
                return Err(GeneticError::InvalidGenome(format!(
                    "{name} is not in the candidate pool"
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(GeneticError::InvalidGenome(format!("duplicate card {name}")));
            }
        }
        Ok(Self {
            cards,
            fitness: None,
        })
    }

    /// Order-independent identity: sorted names joined with '|'.
    pub fn key(&self) -> String {
        let mut sorted: Vec<&str> = self.cards.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        sorted.join("|")
    }

    /// Cached fitness, or 0 if not evaluated.
    pub fn score(&self) -> f64 {
        self.fitness.unwrap_or(0.0)
    }
}

/// Random number generator wrapper for genome operations.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// One win condition when the pool has any, the rest uniformly at random.
    pub fn random_genome(&mut self, pool: &GenePool) -> DeckGenome {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        if let Some(&wc) = pool.win_conditions.choose(&mut self.rng) {
            cards.push(pool.names[wc].clone());
        }

        let rest: Vec<&String> = pool.unused(&cards).collect();
        let picked: Vec<String> = rest
            .choose_multiple(&mut self.rng, DECK_SIZE - cards.len())
            .map(|name| (*name).clone())
            .collect();
        cards.extend(picked);

        DeckGenome {
            cards,
            fitness: None,
        }
    }

    /// Replace `max(1, round(8 * intensity))` distinct positions with unused cards.
    ///
    /// Each position draws its own [`MutationOperator`]. A position keeps its
    /// card when the pool has nothing left to swap in.
    pub fn mutate(&mut self, genome: &mut DeckGenome, intensity: f64, pool: &GenePool) {
        self.mutate_positions(genome, intensity, pool, None);
    }

    /// [`mutate`](Self::mutate) with one operator for every position.
    pub fn mutate_with(
        &mut self,
        operator: MutationOperator,
        genome: &mut DeckGenome,
        intensity: f64,
        pool: &GenePool,
    ) {
        self.mutate_positions(genome, intensity, pool, Some(operator));
    }

    fn mutate_positions(
        &mut self,
        genome: &mut DeckGenome,
        intensity: f64,
        pool: &GenePool,
        operator: Option<MutationOperator>,
    ) {
        let len = genome.cards.len();
        if len == 0 {
            return;
        }
        let count = ((DECK_SIZE as f64 * intensity).round() as usize).clamp(1, len);

        for position in index::sample(&mut self.rng, len, count) {
            let operator = operator.unwrap_or_else(|| {
                MutationOperator::ALL[self.rng.gen_range(0..MutationOperator::ALL.len())]
            });
            let old = genome.cards[position].clone();
            if let Some(card) = self.replacement(operator, &old, &genome.cards, pool) {
                genome.cards[position] = card;
            }
        }
        self.ensure_win_condition(&mut genome.cards, pool);
        genome.fitness = None;
    }

    /// An unused card to take `old`'s place in `deck`.
    fn replacement(
        &mut self,
        operator: MutationOperator,
        old: &str,
        deck: &[String],
        pool: &GenePool,
    ) -> Option<String> {
        match operator {
            MutationOperator::SingleCard => pool.unused(deck).choose(&mut self.rng).cloned(),
            MutationOperator::RoleBased => {
                let role = pool.role(old);
                let same_role: Vec<&String> = match role {
                    Some(_) => pool.unused(deck).filter(|name| pool.role(name) == role).collect(),
                    None => Vec::new(),
                };
                match same_role.choose(&mut self.rng) {
                    Some(name) => Some((*name).clone()),
                    None => self.replacement(MutationOperator::SingleCard, old, deck, pool),
                }
            }
            MutationOperator::EvolutionAware => {
                let (evolvable, plain): (Vec<&String>, Vec<&String>) =
                    pool.unused(deck).partition(|name| pool.can_evolve(name));
                let options = if !evolvable.is_empty() && self.rng.gen_bool(EVOLVED_PREFERENCE) {
                    evolvable
                } else {
                    plain
                };
                match options.choose(&mut self.rng) {
                    Some(name) => Some((*name).clone()),
                    None => self.replacement(MutationOperator::SingleCard, old, deck, pool),
                }
            }
            MutationOperator::Mixed => {
                let operator = if self.rng.gen_bool(0.5) {
                    MutationOperator::RoleBased
                } else {
                    MutationOperator::EvolutionAware
                };
                self.replacement(operator, old, deck, pool)
            }
        }
    }

    /// Recombine two parents with a randomly chosen [`CrossoverOperator`].
    pub fn crossover(&mut self, a: &DeckGenome, b: &DeckGenome, pool: &GenePool) -> DeckGenome {
        let operator = CrossoverOperator::ALL[self.rng.gen_range(0..CrossoverOperator::ALL.len())];
        self.crossover_with(operator, a, b, pool)
    }

    /// Recombine two parents, then repair the child.
    pub fn crossover_with(
        &mut self,
        operator: CrossoverOperator,
        a: &DeckGenome,
        b: &DeckGenome,
        pool: &GenePool,
    ) -> DeckGenome {
        let cards = match operator {
            CrossoverOperator::Uniform => self.uniform_cards(a, b, pool),
            CrossoverOperator::RolePreserving => role_groups(&mut self.rng, a, b, pool),
        };
        DeckGenome {
            cards: self.repair(cards, &[a, b], pool),
            fitness: None,
        }
    }

    /// Uniform crossover with duplicate repair.
    ///
    /// Each slot takes parent A's or parent B's card with equal probability.
    /// If that card is already in the child the other parent's card is tried,
    /// then any unused card from either parent, then any unused pool card.
    fn uniform_cards(
        &mut self,
        a: &DeckGenome,
        b: &DeckGenome,
        pool: &GenePool,
    ) -> Vec<String> {
        let mut cards: Vec<String> = Vec::with_capacity(DECK_SIZE);

        for i in 0..DECK_SIZE {
            let (first, second) = if self.rng.gen_bool(0.5) {
                (a.cards.get(i), b.cards.get(i))
            } else {
                (b.cards.get(i), a.cards.get(i))
            };

            let direct = [first, second]
                .into_iter()
                .flatten()
                .find(|name| !cards.contains(name))
                .cloned();
            let card = direct
                .or_else(|| {
                    a.cards
                        .iter()
                        .chain(&b.cards)
                        .find(|name| !cards.contains(name))
                        .cloned()
                })
                .or_else(|| pool.unused(&cards).choose(&mut self.rng).cloned());

            match card {
                Some(card) => cards.push(card),
                None => break,
            }
        }

        cards
    }

    /// Turn any card list into a valid deck.
    ///
    /// Keeps pool cards in order without duplicates, capped at 8, then fills
    /// from the parents and finally from random unused pool cards.
    fn repair(
        &mut self,
        cards: Vec<String>,
        parents: &[&DeckGenome],
        pool: &GenePool,
    ) -> Vec<String> {
        let mut repaired: Vec<String> = Vec::with_capacity(DECK_SIZE);
        let fallback = parents.iter().flat_map(|parent| parent.cards.iter());
        for name in cards.iter().chain(fallback) {
            if repaired.len() == DECK_SIZE {
                break;
            }
            if pool.contains(name) && !repaired.contains(name) {
                repaired.push(name.clone());
            }
        }

        while repaired.len() < DECK_SIZE {
            let next = pool.unused(&repaired).choose(&mut self.rng).cloned();
            match next {
                Some(card) => repaired.push(card),
                None => break,
            }
        }

        self.ensure_win_condition(&mut repaired, pool);
        repaired
    }

    /// Swap the last card for an unused win condition if the deck has none.
    fn ensure_win_condition(&mut self, cards: &mut [String], pool: &GenePool) {
        if cards.iter().any(|name| pool.is_win_condition(name)) {
            return;
        }
        let options: Vec<&String> = pool
            .win_conditions
            .iter()
            .map(|&i| &pool.names[i])
            .filter(|name| !cards.contains(name))
            .collect();
        if let (Some(name), Some(last)) = (options.choose(&mut self.rng), cards.last_mut()) {
            *last = (*name).clone();
        }
    }

    /// Index into a population of `len` individuals.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// True with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.r#gen::<f64>() < p
    }
}

/// Role-preserving crossover: every role group comes whole from one parent.
///
/// Cards without a role form one group. The result may hold more or fewer
/// than 8 cards and is expected to be repaired.
fn role_groups(
    rng: &mut StdRng,
    a: &DeckGenome,
    b: &DeckGenome,
    pool: &GenePool,
) -> Vec<String> {
    let mut roles: Vec<Option<CardRole>> = Vec::new();
    for name in a.cards.iter().chain(&b.cards) {
        let role = pool.role(name);
        if !roles.contains(&role) {
            roles.push(role);
        }
    }

    let mut cards = Vec::with_capacity(DECK_SIZE * 2);
    for role in roles {
        let parent = if rng.gen_bool(0.5) { a } else { b };
        cards.extend(
            parent
                .cards
                .iter()
                .filter(|name| pool.role(name) == role)
                .cloned(),
        );
    }
    cards
}
