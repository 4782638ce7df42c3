//! In-memory result store.

use std::cmp::Ordering;
use std::collections::HashMap;

use parking_lot::RwLock;

use super::collaborators::{
    InsertOutcome, ResultStore, ScoreRecord, SortField, SortOrder, StoreError, deck_hash,
};

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<u64, ScoreRecord>,
    by_hash: HashMap<String, u64>,
    next_id: u64,
}

/// Keeps evaluated decks in memory, one record per distinct card set.
///
/// Re-inserting a stored deck reports a duplicate and keeps whichever record
/// has the higher overall score. Ids start at 1 and are never reused.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    max_size: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the store; once full, a new deck replaces the lowest scoring one
    /// only if it scores higher.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    /// Get a record by id.
    pub fn get(&self, id: u64) -> Option<ScoreRecord> {
        self.inner.read().records.get(&id).cloned()
    }

    /// Get a record by its cards, in any order.
    pub fn find(&self, cards: &[String]) -> Option<ScoreRecord> {
        let inner = self.inner.read();
        inner
            .by_hash
            .get(&deck_hash(cards))
            .and_then(|id| inner.records.get(id))
            .cloned()
    }
}

impl ResultStore for MemoryStore {
    fn insert(&self, mut record: ScoreRecord) -> Result<InsertOutcome, StoreError> {
        if record.cards.is_empty() {
            return Err(StoreError("record has no cards".into()));
        }
        record.deck_hash = deck_hash(&record.cards);

        let mut inner = self.inner.write();
        if let Some(&id) = inner.by_hash.get(&record.deck_hash) {
            if let Some(existing) = inner.records.get_mut(&id)
                && record.overall_score > existing.overall_score
            {
                record.id = id;
                *existing = record;
            }
            return Ok(InsertOutcome {
                id,
                duplicate: true,
            });
        }

        if let Some(max_size) = self.max_size
            && inner.records.len() >= max_size
        {
            let lowest = inner
                .records
                .values()
                .min_by(|a, b| a.overall_score.total_cmp(&b.overall_score))
                .map(|r| (r.id, r.overall_score, r.deck_hash.clone()));
            match lowest {
                Some((id, score, hash)) if record.overall_score > score => {
                    inner.records.remove(&id);
                    inner.by_hash.remove(&hash);
                }
                _ => {
                    return Err(StoreError(format!(
                        "store full ({max_size} records) and deck does not beat the lowest score"
                    )));
                }
            }
        }

        inner.next_id += 1;
        let id = inner.next_id;
        record.id = id;
        inner.by_hash.insert(record.deck_hash.clone(), id);
        inner.records.insert(id, record);
        Ok(InsertOutcome {
            id,
            duplicate: false,
        })
    }

    fn query(
        &self,
        field: SortField,
        order: SortOrder,
        limit: usize,
    ) -> Result<Vec<ScoreRecord>, StoreError> {
        let inner = self.inner.read();
        let mut records: Vec<&ScoreRecord> = inner.records.values().collect();
        records.sort_by(|a, b| {
            let ord = compare(a, b, field).then(a.id.cmp(&b.id));
            match order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            }
        });
        Ok(records.into_iter().take(limit).cloned().collect())
    }
}

fn compare(a: &ScoreRecord, b: &ScoreRecord, field: SortField) -> Ordering {
    match field {
        SortField::Overall => a.overall_score.total_cmp(&b.overall_score),
        SortField::Attack => a.attack_score.total_cmp(&b.attack_score),
        SortField::Defense => a.defense_score.total_cmp(&b.defense_score),
        SortField::Synergy => a.synergy_score.total_cmp(&b.synergy_score),
        SortField::Versatility => a.versatility_score.total_cmp(&b.versatility_score),
        SortField::EvaluatedAt => a.evaluated_at.cmp(&b.evaluated_at),
    }
}
