//! Statistics and snapshots for observers
//!
//! Everything here is read-only with respect to the world.

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::{EntityId, Position, Tick};
use crate::ecs::world::World;
use crate::entity::hunter::{HunterSkill, HunterState};
use crate::entity::kind::{Entity, EntityKind};
use crate::entity::knight::KnightState;
use crate::entity::knowledge::KnowledgeCategory;
use crate::entity::resource::ResourceState;
use crate::entity::treasure::TreasureKind;

/// Running totals updated by the step pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationCounters {
    pub treasures_collected: u32,
    pub treasures_deposited: u32,
    pub treasures_depleted: u32,
    pub treasures_dropped: u32,
    pub hunters_collapsed: u32,
    pub hunters_recruited: u32,
    pub knights_spawned: u32,
    pub detains: u32,
    pub challenges: u32,
    pub collected_by_kind: PerKind<u32>,
    pub deposited_by_kind: PerKind<f32>,
}

/// One value per treasure type
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerKind<T> {
    pub bronze: T,
    pub silver: T,
    pub gold: T,
}

impl<T> PerKind<T> {
    pub fn get_mut(&mut self, kind: TreasureKind) -> &mut T {
        match kind {
            TreasureKind::Bronze => &mut self.bronze,
            TreasureKind::Silver => &mut self.silver,
            TreasureKind::Gold => &mut self.gold,
        }
    }

    pub fn get(&self, kind: TreasureKind) -> &T {
        match kind {
            TreasureKind::Bronze => &self.bronze,
            TreasureKind::Silver => &self.silver,
            TreasureKind::Gold => &self.gold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationStatistics {
    pub step: Tick,
    pub loose_treasures: usize,
    pub carried_treasures: usize,
    pub hunters_alive: usize,
    pub knights: usize,
    pub hideouts: usize,
    pub garrisons: usize,
    pub total_deposited: f32,
    pub deposited_by_kind: PerKind<f32>,
    pub collected_by_kind: PerKind<u32>,
    pub treasures_collected: u32,
    pub treasures_depleted: u32,
    pub hunters_collapsed: u32,
    pub hunters_recruited: u32,
    pub knights_spawned: u32,
    pub detains: u32,
    pub challenges: u32,
    pub average_stamina: f32,
    pub average_energy: f32,
    pub completion: Option<String>,
}

/// Resource and state of one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStatus {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Option<Position>,
    pub resource: f32,
    pub resource_state: ResourceState,
    pub state: String,
    pub carrying: Option<EntityId>,
}

pub fn collect_statistics(world: &World) -> SimulationStatistics {
    let mut loose = 0;
    let mut carried = 0;
    let mut stamina = Vec::new();
    let mut energy = Vec::new();
    let mut hideouts = 0;
    let mut garrisons = 0;
    let mut total_deposited = 0.0;

    for (_, entity) in world.entities() {
        match entity {
            Entity::Treasure(t) if t.is_loose() => loose += 1,
            Entity::Treasure(_) => carried += 1,
            Entity::Hunter(h) => stamina.push(h.stamina.value()),
            Entity::Knight(k) => energy.push(k.energy.value()),
            Entity::Hideout(h) => {
                hideouts += 1;
                total_deposited += h.stored_value;
            }
            Entity::Garrison(_) => garrisons += 1,
        }
    }

    let c = &world.counters;
    SimulationStatistics {
        step: world.current_tick(),
        loose_treasures: loose,
        carried_treasures: carried,
        hunters_alive: stamina.len(),
        knights: energy.len(),
        hideouts,
        garrisons,
        total_deposited,
        deposited_by_kind: c.deposited_by_kind,
        collected_by_kind: c.collected_by_kind,
        treasures_collected: c.treasures_collected,
        treasures_depleted: c.treasures_depleted,
        hunters_collapsed: c.hunters_collapsed,
        hunters_recruited: c.hunters_recruited,
        knights_spawned: c.knights_spawned,
        detains: c.detains,
        challenges: c.challenges,
        average_stamina: mean(&stamina),
        average_energy: mean(&energy),
        completion: world.completion().map(str::to_string),
    }
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

/// Plain serialization of the whole world, keyed by entity id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: Tick,
    pub width: i32,
    pub height: i32,
    pub completion: Option<String>,
    pub entities: Vec<EntitySnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Option<Position>,
    pub detail: EntityDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EntityDetail {
    Treasure {
        treasure: TreasureKind,
        value: f32,
        carried_by: Option<EntityId>,
    },
    Hunter {
        skill: HunterSkill,
        stamina: f32,
        state: HunterState,
        carrying: Option<EntityId>,
        known_treasures: usize,
    },
    Knight {
        energy: f32,
        state: KnightState,
        target: Option<EntityId>,
    },
    Hideout {
        residents: Vec<EntityId>,
        stored_value: f32,
    },
    Garrison {
        residents: Vec<EntityId>,
    },
}

impl WorldSnapshot {
    pub fn capture(world: &World) -> Self {
        let entities = world
            .entities()
            .map(|(id, entity)| EntitySnapshot {
                id,
                kind: entity.kind(),
                position: world.position_of(id),
                detail: detail_of(entity),
            })
            .collect();
        Self {
            tick: world.current_tick(),
            width: world.grid().width(),
            height: world.grid().height(),
            completion: world.completion().map(str::to_string),
            entities,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn detail_of(entity: &Entity) -> EntityDetail {
    match entity {
        Entity::Treasure(t) => EntityDetail::Treasure {
            treasure: t.kind,
            value: t.value,
            carried_by: t.carrier(),
        },
        Entity::Hunter(h) => EntityDetail::Hunter {
            skill: h.skill,
            stamina: h.stamina.value(),
            state: h.state,
            carrying: h.carrying,
            known_treasures: h.knowledge.len(KnowledgeCategory::Treasure),
        },
        Entity::Knight(k) => EntityDetail::Knight {
            energy: k.energy.value(),
            state: k.state,
            target: k.target,
        },
        Entity::Hideout(h) => EntityDetail::Hideout {
            residents: h.residents.clone(),
            stored_value: h.stored_value,
        },
        Entity::Garrison(g) => EntityDetail::Garrison {
            residents: g.residents.clone(),
        },
    }
}
