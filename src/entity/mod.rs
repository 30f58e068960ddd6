//! Entity records and their per-agent components

pub mod hunter;
pub mod kind;
pub mod knight;
pub mod knowledge;
pub mod resource;
pub mod structures;
pub mod treasure;

pub use hunter::{Hunter, HunterSkill, HunterState};
pub use kind::{Entity, EntityKind, Occupant};
pub use knight::{Knight, KnightState};
pub use knowledge::{KnowledgeBase, KnowledgeCategory, KnowledgeEntry};
pub use resource::{ResourceMeter, ResourceProfile, ResourceState};
pub use structures::{Garrison, Hideout};
pub use treasure::{Treasure, TreasureKind, TreasureLocation};
