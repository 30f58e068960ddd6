//! Static safe structures: hideouts for hunters, garrisons for knights
//!
//! Structures store resident ids only; the residents themselves live in the
//! world's entity table.

use serde::{Deserialize, Serialize};

use super::kind::{EntityKind, Occupant};
use super::knowledge::KnowledgeBase;
use super::treasure::TreasureKind;
use crate::core::config::SimulationConfig;
use crate::core::error::{EldoriaError, Result};
use crate::core::types::{EntityId, Tick};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hideout {
    pub capacity: usize,
    pub residents: Vec<EntityId>,
    pub stored_value: f32,
    pub deposits: u32,
    /// Deposited value per treasure type
    pub stored_by_kind: [f32; 3],
    pub knowledge: KnowledgeBase,
}

impl Hideout {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            capacity: config.structures.hideout_capacity,
            residents: Vec::new(),
            stored_value: 0.0,
            deposits: 0,
            stored_by_kind: [0.0; 3],
            knowledge: KnowledgeBase::from_config(&config.knowledge),
        }
    }

    pub fn is_full(&self) -> bool {
        self.residents.len() >= self.capacity
    }

    pub fn has_resident(&self, hunter: EntityId) -> bool {
        self.residents.contains(&hunter)
    }

    /// Register a hunter as resident; already-resident hunters are accepted
    pub fn admit(&mut self, own_id: EntityId, hunter: EntityId) -> Result<()> {
        admit_resident(&mut self.residents, self.capacity, own_id, hunter)
    }

    pub fn release(&mut self, hunter: EntityId) -> bool {
        release_resident(&mut self.residents, hunter)
    }

    pub fn deposit(&mut self, kind: TreasureKind, value: f32) {
        self.stored_value += value;
        self.stored_by_kind[kind as usize] += value;
        self.deposits += 1;
    }
}

impl Occupant for Hideout {
    const KIND: EntityKind = EntityKind::Hideout;
    const PASSABLE_FOR: &'static [EntityKind] = &[EntityKind::Hunter];
    const SHELTERS: &'static [EntityKind] = &[EntityKind::Hunter];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Garrison {
    pub capacity: usize,
    pub residents: Vec<EntityId>,
    /// Energy restored per step to resting knights
    pub recovery_rate: f32,
    /// Steps left before this garrison may raise another knight
    pub spawn_cooldown: Tick,
}

impl Garrison {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            capacity: config.structures.garrison_capacity,
            residents: Vec::new(),
            recovery_rate: config.knight.rest_gain,
            spawn_cooldown: config.structures.garrison_spawn_cooldown,
        }
    }

    pub fn is_full(&self) -> bool {
        self.residents.len() >= self.capacity
    }

    pub fn has_resident(&self, knight: EntityId) -> bool {
        self.residents.contains(&knight)
    }

    pub fn admit(&mut self, own_id: EntityId, knight: EntityId) -> Result<()> {
        admit_resident(&mut self.residents, self.capacity, own_id, knight)
    }

    pub fn release(&mut self, knight: EntityId) -> bool {
        release_resident(&mut self.residents, knight)
    }
}

impl Occupant for Garrison {
    const KIND: EntityKind = EntityKind::Garrison;
    const PASSABLE_FOR: &'static [EntityKind] = &[EntityKind::Hunter, EntityKind::Knight, EntityKind::Treasure];
    const SHELTERS: &'static [EntityKind] = &[EntityKind::Knight];
}

fn admit_resident(residents: &mut Vec<EntityId>, capacity: usize, own_id: EntityId, who: EntityId) -> Result<()> {
    if residents.contains(&who) {
        return Ok(());
    }
    if residents.len() >= capacity {
        return Err(EldoriaError::CapacityExceeded {
            structure: own_id,
            capacity,
        });
    }
    residents.push(who);
    Ok(())
}

fn release_resident(residents: &mut Vec<EntityId>, who: EntityId) -> bool {
    let before = residents.len();
    residents.retain(|&r| r != who);
    residents.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hideout_rejects_when_full() {
        let mut config = SimulationConfig::default();
        config.structures.hideout_capacity = 2;
        let mut h = Hideout::new(&config);
        let own = EntityId(1);

        h.admit(own, EntityId(2)).unwrap();
        h.admit(own, EntityId(3)).unwrap();
        h.admit(own, EntityId(3)).unwrap();
        let err = h.admit(own, EntityId(4)).unwrap_err();
        assert!(matches!(err, EldoriaError::CapacityExceeded { capacity: 2, .. }));
        assert_eq!(h.residents.len(), 2);

        assert!(h.release(EntityId(2)));
        assert!(h.admit(own, EntityId(4)).is_ok());
    }

    #[test]
    fn test_deposit_tracks_kind() {
        let mut h = Hideout::new(&SimulationConfig::default());
        h.deposit(TreasureKind::Gold, 12.5);
        h.deposit(TreasureKind::Bronze, 3.0);
        assert_eq!(h.deposits, 2);
        assert_eq!(h.stored_value, 15.5);
        assert_eq!(h.stored_by_kind[TreasureKind::Gold as usize], 12.5);
    }

    #[test]
    fn test_garrison_capacity() {
        let mut g = Garrison::new(&SimulationConfig::default());
        for i in 0..4 {
            g.admit(EntityId(0), EntityId(i + 1)).unwrap();
        }
        assert!(g.is_full());
        assert!(g.admit(EntityId(0), EntityId(9)).is_err());
        assert_eq!(g.recovery_rate, 10.0);
    }
}
