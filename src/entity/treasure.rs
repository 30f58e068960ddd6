use serde::{Deserialize, Serialize};

use super::kind::{EntityKind, Occupant};
use crate::core::config::TreasureConfig;
use crate::core::types::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TreasureKind {
    Bronze,
    Silver,
    Gold,
}

impl TreasureKind {
    pub const ALL: [TreasureKind; 3] = [TreasureKind::Bronze, TreasureKind::Silver, TreasureKind::Gold];

    pub fn base_value(self, config: &TreasureConfig) -> f32 {
        match self {
            TreasureKind::Bronze => config.bronze_value,
            TreasureKind::Silver => config.silver_value,
            TreasureKind::Gold => config.gold_value,
        }
    }

    /// Map a uniform roll in [0, 1) onto the configured type shares
    pub fn from_roll(roll: f32, config: &TreasureConfig) -> Self {
        if roll < config.bronze_share {
            TreasureKind::Bronze
        } else if roll < config.bronze_share + config.silver_share {
            TreasureKind::Silver
        } else {
            TreasureKind::Gold
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreasureLocation {
    /// On the grid
    Loose,
    /// Held by a hunter, off the grid
    CarriedBy(EntityId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treasure {
    pub kind: TreasureKind,
    pub initial_value: f32,
    pub value: f32,
    pub location: TreasureLocation,
}

impl Treasure {
    pub fn new(kind: TreasureKind, value: f32) -> Self {
        let value = value.max(0.0);
        Self {
            kind,
            initial_value: value,
            value,
            location: TreasureLocation::Loose,
        }
    }

    pub fn from_config(kind: TreasureKind, config: &TreasureConfig) -> Self {
        Self::new(kind, kind.base_value(config))
    }

    /// Lose `rate` of the initial value; returns the new value
    pub fn decay(&mut self, rate: f32) -> f32 {
        self.value = (self.value - self.initial_value * rate).max(0.0);
        self.value
    }

    pub fn is_depleted(&self, threshold: f32) -> bool {
        self.value <= threshold
    }

    pub fn is_loose(&self) -> bool {
        self.location == TreasureLocation::Loose
    }

    pub fn carrier(&self) -> Option<EntityId> {
        match self.location {
            TreasureLocation::CarriedBy(id) => Some(id),
            TreasureLocation::Loose => None,
        }
    }
}

impl Occupant for Treasure {
    const KIND: EntityKind = EntityKind::Treasure;
    const PASSABLE_FOR: &'static [EntityKind] = &[EntityKind::Hunter, EntityKind::Knight, EntityKind::Treasure];

    fn occupies_cell(&self) -> bool {
        self.is_loose()
    }
}
