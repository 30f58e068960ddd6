//! Initial placement and hideout recruitment
//!
//! Hunters are the only population that grows: an occupied hideout with
//! enough skill diversity can recruit a new hunter on a random gate.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::{EntityId, Metric, Position};
use crate::ecs::world::World;
use crate::entity::hunter::{Hunter, HunterSkill};
use crate::entity::kind::EntityKind;
use crate::entity::knight::Knight;
use crate::entity::knowledge::KnowledgeCategory;
use crate::entity::treasure::{Treasure, TreasureKind};
use crate::simulation::targeting::nearest;
use crate::simulation::tick::SimulationEvent;

/// How many of each entity `setup_world` places
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounts {
    pub treasures: usize,
    pub hunters: usize,
    pub knights: usize,
    pub hideouts: usize,
    pub garrisons: usize,
}

impl Default for EntityCounts {
    fn default() -> Self {
        Self {
            treasures: 10,
            hunters: 3,
            knights: 2,
            hideouts: 2,
            garrisons: 1,
        }
    }
}

/// Preferred hideout sites: the four quarter points of the grid
fn hideout_sites(width: i32, height: i32) -> [Position; 4] {
    [
        Position::new(width / 4, height / 4),
        Position::new(3 * width / 4, 3 * height / 4),
        Position::new(width / 4, 3 * height / 4),
        Position::new(3 * width / 4, height / 4),
    ]
}

/// Populate an empty world
///
/// Order: hideouts, garrisons, knights, treasures, hunters. Every random
/// choice is drawn from the world's random source.
pub fn setup_world(world: &mut World, counts: &EntityCounts) -> Result<()> {
    let (width, height) = (world.grid().width(), world.grid().height());

    let mut hideouts = Vec::with_capacity(counts.hideouts);
    let mut sites = hideout_sites(width, height).into_iter();
    for _ in 0..counts.hideouts {
        let fixed = sites.by_ref().find(|p| world.grid().is_empty_cell(*p));
        let Some(pos) = fixed.or_else(|| world.random_empty_cell()) else {
            tracing::warn!("No room left for hideouts after placing {}", hideouts.len());
            break;
        };
        let id = world.spawn_hideout(pos)?;
        if let Some(h) = world.hideout_mut(id) {
            h.knowledge.record(KnowledgeCategory::Hideout, pos, Some(id), 0);
        }
        hideouts.push((id, pos));
    }

    let mut garrisons = Vec::with_capacity(counts.garrisons);
    for _ in 0..counts.garrisons {
        let Some(pos) = world.random_empty_cell() else {
            tracing::warn!("No room left for garrisons after placing {}", garrisons.len());
            break;
        };
        garrisons.push((world.spawn_garrison(pos)?, pos));
    }

    let garrison_ids: Vec<EntityId> = garrisons.iter().map(|(id, _)| *id).collect();
    for i in 0..counts.knights {
        let mut knight = Knight::new(&world.config().knight);
        knight.known_garrisons = garrison_ids.clone();

        let open = garrisons
            .iter()
            .cycle()
            .skip(i % garrisons.len().max(1))
            .take(garrisons.len())
            .find(|(id, _)| world.garrison(*id).is_some_and(|g| !g.is_full()))
            .copied();
        let pos = match open {
            Some((gid, gpos)) => {
                knight.home = Some(gid);
                gpos
            }
            None => {
                let Some(pos) = world.random_empty_cell() else {
                    tracing::warn!("No room left for knights after placing {}", i);
                    break;
                };
                knight.home = nearest(world.grid(), pos, &garrisons, Metric::Manhattan).map(|(id, _)| id);
                pos
            }
        };
        world.spawn_knight(knight, pos)?;
    }

    for i in 0..counts.treasures {
        let Some(pos) = world.random_empty_cell() else {
            tracing::warn!("No room left for treasures after placing {}", i);
            break;
        };
        let roll: f32 = world.rng().gen();
        let kind = TreasureKind::from_roll(roll, &world.config().treasure);
        let treasure = Treasure::from_config(kind, &world.config().treasure);
        world.spawn_treasure(treasure, pos)?;
    }

    for i in 0..counts.hunters {
        let Some(pos) = world.random_empty_cell() else {
            tracing::warn!("No room left for hunters after placing {}", i);
            break;
        };
        let skill = HunterSkill::ALL[world.rng().gen_range(0..HunterSkill::ALL.len())];
        let mut hunter = Hunter::new(skill, world.config());
        if let Some((home, home_pos)) = nearest(world.grid(), pos, &hideouts, Metric::Manhattan) {
            hunter.home = Some(home);
            hunter
                .knowledge
                .record(KnowledgeCategory::Hideout, home_pos, Some(home), world.current_tick());
        }
        world.spawn_hunter(hunter, pos)?;
    }

    tracing::info!(
        "World set up: {} hideouts, {} garrisons, {} knights, {} treasures, {} hunters",
        world.count_of_kind(EntityKind::Hideout),
        world.count_of_kind(EntityKind::Garrison),
        world.count_of_kind(EntityKind::Knight),
        world.count_of_kind(EntityKind::Treasure),
        world.count_of_kind(EntityKind::Hunter),
    );
    Ok(())
}

/// Whether a hideout meets the deterministic part of the recruitment gate
pub fn can_recruit(world: &World, hideout_id: EntityId) -> bool {
    let Some(hideout) = world.hideout(hideout_id) else {
        return false;
    };
    if hideout.is_full() {
        return false;
    }
    distinct_skills(world, &hideout.residents).len() >= world.config().structures.min_recruit_skills
}

fn distinct_skills(world: &World, residents: &[EntityId]) -> Vec<HunterSkill> {
    let mut skills = Vec::new();
    for id in residents {
        if let Some(h) = world.hunter(*id) {
            if !skills.contains(&h.skill) {
                skills.push(h.skill);
            }
        }
    }
    skills
}

/// Roll the recruitment gate for one hideout
pub fn try_recruit(world: &mut World, hideout_id: EntityId) -> Option<SimulationEvent> {
    if !can_recruit(world, hideout_id) {
        return None;
    }
    let probability = world.config().structures.recruit_probability;
    if !world.rng().gen_bool(probability) {
        return None;
    }

    let pos = world.position_of(hideout_id)?;
    let (residents, knowledge) = {
        let hideout = world.hideout(hideout_id)?;
        (hideout.residents.clone(), hideout.knowledge.clone())
    };
    if residents.is_empty() {
        return None;
    }
    let mentor = residents[world.rng().gen_range(0..residents.len())];
    let skill = world.hunter(mentor)?.skill;

    let mut recruit = Hunter::new(skill, world.config());
    recruit.home = Some(hideout_id);
    recruit.knowledge.merge(&knowledge);
    let tick = world.current_tick();
    recruit
        .knowledge
        .record(KnowledgeCategory::Hideout, pos, Some(hideout_id), tick);

    match world.spawn_hunter(recruit, pos) {
        Ok(id) => {
            world.counters.hunters_recruited += 1;
            tracing::debug!("Hideout {} recruited {:?} hunter {}", hideout_id, skill, id);
            Some(SimulationEvent::HunterRecruited {
                hunter: id,
                hideout: hideout_id,
                skill,
            })
        }
        Err(err) => {
            tracing::debug!("Recruitment at hideout {} failed: {}", hideout_id, err);
            None
        }
    }
}

/// Recruitment pass over every hideout in id order
pub fn run_recruitment(world: &mut World) -> Vec<SimulationEvent> {
    world
        .ids_of_kind(EntityKind::Hideout)
        .into_iter()
        .filter_map(|id| try_recruit(world, id))
        .collect()
}

/// Knights that call this garrison home
fn knights_fielded(world: &World, garrison_id: EntityId) -> usize {
    world
        .ids_of_kind(EntityKind::Knight)
        .into_iter()
        .filter(|id| world.knight(*id).is_some_and(|k| k.home == Some(garrison_id)))
        .count()
}

/// Count down one garrison's cooldown and raise a knight when it expires
///
/// A garrison fields at most `garrison_max_knights` knights and never raises
/// one into a full garrison; in either case it tries again next step.
pub fn try_reinforce(world: &mut World, garrison_id: EntityId) -> Option<SimulationEvent> {
    let max_knights = world.config().structures.garrison_max_knights;
    let cooldown = world.config().structures.garrison_spawn_cooldown;
    let garrison = world.garrison_mut(garrison_id)?;
    if garrison.spawn_cooldown > 0 {
        garrison.spawn_cooldown -= 1;
        return None;
    }
    if garrison.is_full() || knights_fielded(world, garrison_id) >= max_knights {
        return None;
    }

    let pos = world.position_of(garrison_id)?;
    let mut knight = Knight::new(&world.config().knight);
    knight.home = Some(garrison_id);
    knight.known_garrisons = world.ids_of_kind(EntityKind::Garrison);

    match world.spawn_knight(knight, pos) {
        Ok(id) => {
            if let Some(garrison) = world.garrison_mut(garrison_id) {
                garrison.spawn_cooldown = cooldown;
            }
            world.counters.knights_spawned += 1;
            tracing::debug!("Garrison {} raised knight {}", garrison_id, id);
            Some(SimulationEvent::KnightSpawned {
                knight: id,
                garrison: garrison_id,
            })
        }
        Err(err) => {
            tracing::debug!("Garrison {} could not raise a knight: {}", garrison_id, err);
            None
        }
    }
}

/// Reinforcement pass over every garrison in id order
pub fn run_reinforcement(world: &mut World) -> Vec<SimulationEvent> {
    world
        .ids_of_kind(EntityKind::Garrison)
        .into_iter()
        .filter_map(|id| try_reinforce(world, id))
        .collect()
}
