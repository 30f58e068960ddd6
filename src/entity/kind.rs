//! Closed set of entity kinds and the capabilities each kind has on the grid

use serde::{Deserialize, Serialize};

use super::hunter::Hunter;
use super::knight::Knight;
use super::structures::{Garrison, Hideout};
use super::treasure::Treasure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Treasure,
    Hunter,
    Knight,
    Hideout,
    Garrison,
}

impl EntityKind {
    pub fn is_structure(self) -> bool {
        matches!(self, EntityKind::Hideout | EntityKind::Garrison)
    }

    pub fn is_agent(self) -> bool {
        matches!(self, EntityKind::Hunter | EntityKind::Knight)
    }

    /// Whether an entity of kind `mover` may share a cell with one of this kind
    pub fn is_passable_for(self, mover: EntityKind) -> bool {
        let allowed = match self {
            EntityKind::Treasure => Treasure::PASSABLE_FOR,
            EntityKind::Hunter => Hunter::PASSABLE_FOR,
            EntityKind::Knight => Knight::PASSABLE_FOR,
            EntityKind::Hideout => Hideout::PASSABLE_FOR,
            EntityKind::Garrison => Garrison::PASSABLE_FOR,
        };
        allowed.contains(&mover)
    }

    /// Whether this kind lets several `mover`s stand on its cell together
    pub fn shelters(self, mover: EntityKind) -> bool {
        let sheltered = match self {
            EntityKind::Treasure => Treasure::SHELTERS,
            EntityKind::Hunter => Hunter::SHELTERS,
            EntityKind::Knight => Knight::SHELTERS,
            EntityKind::Hideout => Hideout::SHELTERS,
            EntityKind::Garrison => Garrison::SHELTERS,
        };
        sheltered.contains(&mover)
    }
}

/// Capabilities of a concrete entity type on the grid
///
/// The kind-level rules are associated constants so the grid can evaluate
/// them from a kind tag alone; the instance methods add per-entity state.
pub trait Occupant {
    const KIND: EntityKind;
    /// Kinds that may enter a cell holding this entity
    const PASSABLE_FOR: &'static [EntityKind];
    /// Kinds that may stack on this entity's cell
    const SHELTERS: &'static [EntityKind] = &[];

    fn kind(&self) -> EntityKind {
        Self::KIND
    }

    /// Whether the entity is currently placed on the grid
    fn occupies_cell(&self) -> bool {
        true
    }

    fn can_be_captured(&self) -> bool {
        false
    }

    fn is_passable_for(&self, mover: EntityKind) -> bool {
        Self::PASSABLE_FOR.contains(&mover)
    }

    fn shelters(&self, mover: EntityKind) -> bool {
        Self::SHELTERS.contains(&mover)
    }
}

/// Entry in the world's entity table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entity {
    Treasure(Treasure),
    Hunter(Hunter),
    Knight(Knight),
    Hideout(Hideout),
    Garrison(Garrison),
}

macro_rules! dispatch {
    ($self:expr, $e:ident => $body:expr) => {
        match $self {
            Entity::Treasure($e) => $body,
            Entity::Hunter($e) => $body,
            Entity::Knight($e) => $body,
            Entity::Hideout($e) => $body,
            Entity::Garrison($e) => $body,
        }
    };
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        dispatch!(self, e => e.kind())
    }

    pub fn occupies_cell(&self) -> bool {
        dispatch!(self, e => e.occupies_cell())
    }

    pub fn can_be_captured(&self) -> bool {
        dispatch!(self, e => e.can_be_captured())
    }

    pub fn is_passable_for(&self, mover: EntityKind) -> bool {
        dispatch!(self, e => e.is_passable_for(mover))
    }

    pub fn shelters(&self, mover: EntityKind) -> bool {
        dispatch!(self, e => e.shelters(mover))
    }

    pub fn as_treasure(&self) -> Option<&Treasure> {
        match self {
            Entity::Treasure(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_treasure_mut(&mut self) -> Option<&mut Treasure> {
        match self {
            Entity::Treasure(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_hunter(&self) -> Option<&Hunter> {
        match self {
            Entity::Hunter(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_hunter_mut(&mut self) -> Option<&mut Hunter> {
        match self {
            Entity::Hunter(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_knight(&self) -> Option<&Knight> {
        match self {
            Entity::Knight(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_knight_mut(&mut self) -> Option<&mut Knight> {
        match self {
            Entity::Knight(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_hideout(&self) -> Option<&Hideout> {
        match self {
            Entity::Hideout(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_hideout_mut(&mut self) -> Option<&mut Hideout> {
        match self {
            Entity::Hideout(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_garrison(&self) -> Option<&Garrison> {
        match self {
            Entity::Garrison(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_garrison_mut(&mut self) -> Option<&mut Garrison> {
        match self {
            Entity::Garrison(g) => Some(g),
            _ => None,
        }
    }
}
