//! Bounded, time-windowed memory of discovered positions
//!
//! Each category is kept ordered by observation tick (oldest first), so
//! eviction on overflow always drops the front entry.

use serde::{Deserialize, Serialize};

use crate::core::config::KnowledgeConfig;
use crate::core::types::{EntityId, Position, Tick};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnowledgeCategory {
    Treasure,
    Hideout,
    Knight,
}

impl KnowledgeCategory {
    pub const ALL: [KnowledgeCategory; 3] = [
        KnowledgeCategory::Treasure,
        KnowledgeCategory::Hideout,
        KnowledgeCategory::Knight,
    ];
}

/// One remembered sighting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub position: Position,
    /// What was seen there, if it could be identified
    pub entity: Option<EntityId>,
    /// When this position was last observed
    pub observed_at: Tick,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    capacity: usize,
    window: Tick,
    treasures: Vec<KnowledgeEntry>,
    hideouts: Vec<KnowledgeEntry>,
    knights: Vec<KnowledgeEntry>,
}

impl KnowledgeBase {
    pub fn new(capacity: usize, window: Tick) -> Self {
        Self {
            capacity,
            window,
            treasures: Vec::new(),
            hideouts: Vec::new(),
            knights: Vec::new(),
        }
    }

    pub fn from_config(config: &KnowledgeConfig) -> Self {
        Self::new(config.capacity, config.window)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn entries(&self, category: KnowledgeCategory) -> &[KnowledgeEntry] {
        match category {
            KnowledgeCategory::Treasure => &self.treasures,
            KnowledgeCategory::Hideout => &self.hideouts,
            KnowledgeCategory::Knight => &self.knights,
        }
    }

    fn entries_mut(&mut self, category: KnowledgeCategory) -> &mut Vec<KnowledgeEntry> {
        match category {
            KnowledgeCategory::Treasure => &mut self.treasures,
            KnowledgeCategory::Hideout => &mut self.hideouts,
            KnowledgeCategory::Knight => &mut self.knights,
        }
    }

    /// Remembered positions in a category, oldest observation first
    pub fn positions(&self, category: KnowledgeCategory) -> Vec<Position> {
        self.entries(category).iter().map(|e| e.position).collect()
    }

    pub fn knows(&self, category: KnowledgeCategory, position: Position) -> bool {
        self.entries(category).iter().any(|e| e.position == position)
    }

    pub fn len(&self, category: KnowledgeCategory) -> usize {
        self.entries(category).len()
    }

    pub fn total(&self) -> usize {
        self.treasures.len() + self.hideouts.len() + self.knights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Record a sighting
    ///
    /// Re-recording a known position only refreshes it. When a category is
    /// full the oldest observation is evicted.
    pub fn record(
        &mut self,
        category: KnowledgeCategory,
        position: Position,
        entity: Option<EntityId>,
        tick: Tick,
    ) {
        self.upsert(
            category,
            KnowledgeEntry {
                position,
                entity,
                observed_at: tick,
            },
        );
    }

    fn upsert(&mut self, category: KnowledgeCategory, entry: KnowledgeEntry) {
        let capacity = self.capacity;
        let entries = self.entries_mut(category);

        if let Some(idx) = entries.iter().position(|e| e.position == entry.position) {
            if entry.observed_at <= entries[idx].observed_at {
                return;
            }
            entries.remove(idx);
        }

        let at = entries.partition_point(|e| e.observed_at <= entry.observed_at);
        entries.insert(at, entry);
        while entries.len() > capacity {
            entries.remove(0);
        }
    }

    /// Drop a remembered position (seen empty)
    pub fn forget(&mut self, category: KnowledgeCategory, position: Position) -> bool {
        let entries = self.entries_mut(category);
        let before = entries.len();
        entries.retain(|e| e.position != position);
        entries.len() != before
    }

    /// Remove entries not re-observed within the window
    ///
    /// An entry observed at tick `t` survives up to and including `t + window`.
    pub fn purge(&mut self, now: Tick) -> usize {
        let window = self.window;
        let mut removed = 0;
        for category in KnowledgeCategory::ALL {
            let entries = self.entries_mut(category);
            let before = entries.len();
            entries.retain(|e| now.saturating_sub(e.observed_at) <= window);
            removed += before - entries.len();
        }
        removed
    }

    /// Union with another knowledge base
    ///
    /// Conflicts on the same position keep the more recent observation;
    /// capacity limits still apply.
    pub fn merge(&mut self, other: &KnowledgeBase) {
        for category in KnowledgeCategory::ALL {
            for entry in other.entries(category) {
                self.upsert(category, *entry);
            }
        }
    }

    /// Merge two knowledge bases into each other
    pub fn exchange(a: &mut KnowledgeBase, b: &mut KnowledgeBase) {
        let snapshot = a.clone();
        a.merge(b);
        b.merge(&snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: KnowledgeCategory = KnowledgeCategory::Treasure;

    fn kb() -> KnowledgeBase {
        KnowledgeBase::new(3, 20)
    }

    #[test]
    fn test_record_is_idempotent() {
        let mut k = kb();
        k.record(T, Position::new(1, 1), Some(EntityId(4)), 0);
        k.record(T, Position::new(1, 1), Some(EntityId(4)), 0);
        assert_eq!(k.len(T), 1);
        assert_eq!(k.len(KnowledgeCategory::Hideout), 0);
    }

    #[test]
    fn test_same_position_different_category() {
        let mut k = kb();
        k.record(T, Position::new(1, 1), None, 0);
        k.record(KnowledgeCategory::Knight, Position::new(1, 1), None, 0);
        assert_eq!(k.total(), 2);
    }

    #[test]
    fn test_oldest_evicted_on_overflow() {
        let mut k = kb();
        for (i, x) in [5, 6, 7, 8].iter().enumerate() {
            k.record(T, Position::new(*x, 0), None, i as Tick);
        }
        assert_eq!(k.len(T), 3);
        assert!(!k.knows(T, Position::new(5, 0)));
        assert!(k.knows(T, Position::new(8, 0)));
    }

    #[test]
    fn test_refresh_protects_from_eviction() {
        let mut k = kb();
        k.record(T, Position::new(0, 0), None, 0);
        k.record(T, Position::new(1, 0), None, 1);
        k.record(T, Position::new(2, 0), None, 2);
        k.record(T, Position::new(0, 0), None, 3);
        k.record(T, Position::new(3, 0), None, 4);
        assert!(k.knows(T, Position::new(0, 0)));
        assert!(!k.knows(T, Position::new(1, 0)));
    }

    #[test]
    fn test_purge_window() {
        let mut k = kb();
        k.record(T, Position::new(0, 0), None, 0);
        k.record(T, Position::new(1, 0), None, 5);
        assert_eq!(k.purge(20), 0);
        assert_eq!(k.purge(21), 1);
        assert_eq!(k.positions(T), vec![Position::new(1, 0)]);
    }

    #[test]
    fn test_forget() {
        let mut k = kb();
        k.record(T, Position::new(2, 2), None, 0);
        assert!(k.forget(T, Position::new(2, 2)));
        assert!(!k.forget(T, Position::new(2, 2)));
        assert!(k.is_empty());
    }

    #[test]
    fn test_merge_prefers_recent() {
        let mut a = kb();
        let mut b = kb();
        a.record(T, Position::new(4, 4), Some(EntityId(1)), 2);
        b.record(T, Position::new(4, 4), Some(EntityId(9)), 7);
        b.record(KnowledgeCategory::Hideout, Position::new(0, 0), None, 1);

        a.merge(&b);
        let entry = a.entries(T)[0];
        assert_eq!(entry.entity, Some(EntityId(9)));
        assert_eq!(entry.observed_at, 7);
        assert!(a.knows(KnowledgeCategory::Hideout, Position::new(0, 0)));

        // Older information never overwrites newer
        let mut c = kb();
        c.record(T, Position::new(4, 4), Some(EntityId(1)), 1);
        a.merge(&c);
        assert_eq!(a.entries(T)[0].entity, Some(EntityId(9)));
    }

    #[test]
    fn test_merge_respects_capacity() {
        let mut a = kb();
        let mut b = kb();
        for x in 0..3 {
            a.record(T, Position::new(x, 0), None, x as Tick);
            b.record(T, Position::new(x, 5), None, 10 + x as Tick);
        }
        a.merge(&b);
        assert_eq!(a.len(T), 3);
        assert_eq!(a.positions(T), b.positions(T));
    }

    #[test]
    fn test_exchange_is_bidirectional() {
        let mut a = kb();
        let mut b = kb();
        a.record(T, Position::new(1, 0), None, 0);
        b.record(KnowledgeCategory::Hideout, Position::new(2, 0), None, 0);
        KnowledgeBase::exchange(&mut a, &mut b);
        assert_eq!(a.total(), 2);
        assert_eq!(b.total(), 2);
    }
}
