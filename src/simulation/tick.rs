//! Tick system - orchestrates simulation updates
//!
//! One tick is one fully committed step of the world: treasure decay, hunter
//! turns, recruitment, garrison reinforcement, knight turns, recovery and the
//! termination check. Agents act one at a time in ascending id order, so
//! every turn observes the committed results of the turns before it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, Position};
use crate::ecs::world::World;
use crate::entity::hunter::HunterSkill;
use crate::entity::kind::EntityKind;
use crate::entity::treasure::TreasureKind;
use crate::simulation::hunter_turn::run_hunter_turn;
use crate::simulation::interaction::{share_between_hunters, CaptureOutcome};
use crate::simulation::knight_turn::run_knight_turn;
use crate::simulation::population::{can_recruit, run_recruitment, run_reinforcement};

/// Completion reason when no treasure is left anywhere
pub const TREASURE_DEPLETED: &str = "treasure depleted";
/// Completion reason when no hunter is left and none can be recruited
pub const HUNTERS_ELIMINATED: &str = "hunters eliminated";

/// Events generated during a simulation tick
///
/// Returned by `run_simulation_tick` in the order they happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimulationEvent {
    /// A hunter picked up a loose treasure
    TreasureCollected {
        hunter: EntityId,
        treasure: EntityId,
        kind: TreasureKind,
        value: f32,
    },
    /// A hunter delivered its treasure to a hideout
    TreasureDeposited {
        hunter: EntityId,
        hideout: EntityId,
        kind: TreasureKind,
        value: f32,
    },
    /// A treasure decayed away, possibly out of a hunter's hands
    TreasureDepleted {
        treasure: EntityId,
        carried_by: Option<EntityId>,
    },
    /// A carried treasure went back onto the grid
    TreasureDropped {
        hunter: EntityId,
        treasure: EntityId,
        position: Position,
    },
    HunterCollapsed {
        hunter: EntityId,
        position: Position,
    },
    HunterRecruited {
        hunter: EntityId,
        hideout: EntityId,
        skill: HunterSkill,
    },
    HunterResting {
        hunter: EntityId,
        hideout: EntityId,
    },
    KnightResting {
        knight: EntityId,
        garrison: EntityId,
    },
    /// A garrison raised a new knight
    KnightSpawned {
        knight: EntityId,
        garrison: EntityId,
    },
    /// A rested knight left its garrison duty and resumed patrol
    KnightPatrolling {
        knight: EntityId,
    },
    Capture {
        knight: EntityId,
        hunter: EntityId,
        outcome: CaptureOutcome,
        /// Hunter stamina after the penalty
        stamina_after: f32,
    },
    /// The simulation reached a termination condition this tick
    Completed {
        reason: String,
    },
}

/// Run a single simulation tick
///
/// Phases, in order:
/// 1. Decay every treasure; remove those at or below the depletion threshold
/// 2. Hunter turns (scan, collect, move, deposit, rest, collapse countdown)
/// 3. Knowledge exchange between hunters sharing a cell
/// 4. Hideout recruitment
/// 5. Garrison reinforcement
/// 6. Knight turns (retreat and rest, or detect, pursue and capture, or patrol)
/// 7. Recovery for agents resting since an earlier tick
/// 8. Termination check
/// 9. Advance tick counter
///
/// A completed world is left untouched and yields no events.
pub fn run_simulation_tick(world: &mut World) -> Vec<SimulationEvent> {
    let mut events = Vec::new();
    if world.is_complete() {
        return events;
    }

    decay_treasures(world, &mut events);

    for id in world.ids_of_kind(EntityKind::Hunter) {
        events.extend(run_hunter_turn(world, id));
    }
    share_colocated_knowledge(world);
    events.extend(run_recruitment(world));
    events.extend(run_reinforcement(world));

    for id in world.ids_of_kind(EntityKind::Knight) {
        events.extend(run_knight_turn(world, id));
    }
    apply_recovery(world, &mut events);

    if let Some(reason) = check_completion(world) {
        tracing::info!("Simulation complete at tick {}: {}", world.current_tick(), reason);
        world.set_completion(reason);
        events.push(SimulationEvent::Completed {
            reason: reason.to_string(),
        });
    }

    if cfg!(debug_assertions) {
        if let Err(err) = world.check_invariants() {
            panic!("tick {}: {}", world.current_tick(), err);
        }
    }

    world.advance_tick();
    events
}

/// Linear decay of every treasure, loose or carried
fn decay_treasures(world: &mut World, events: &mut Vec<SimulationEvent>) {
    let rate = world.config().treasure.decay_rate;
    let threshold = world.config().treasure.depletion_threshold;

    for id in world.ids_of_kind(EntityKind::Treasure) {
        let Some(treasure) = world.treasure_mut(id) else {
            continue;
        };
        treasure.decay(rate);
        if !treasure.is_depleted(threshold) {
            continue;
        }
        let carried_by = treasure.carrier();
        if let Some(hunter) = carried_by.and_then(|h| world.hunter_mut(h)) {
            hunter.release_carried();
        }
        world.despawn(id);
        world.counters.treasures_depleted += 1;
        tracing::debug!("Treasure {} depleted", id);
        events.push(SimulationEvent::TreasureDepleted {
            treasure: id,
            carried_by,
        });
    }
}

/// Pairwise knowledge merge among hunters on the same cell
fn share_colocated_knowledge(world: &mut World) {
    let mut by_cell: BTreeMap<Position, Vec<EntityId>> = BTreeMap::new();
    for id in world.ids_of_kind(EntityKind::Hunter) {
        if let Some(pos) = world.position_of(id) {
            by_cell.entry(pos).or_default().push(id);
        }
    }
    for hunters in by_cell.into_values().filter(|h| h.len() > 1) {
        for (i, &a) in hunters.iter().enumerate() {
            for &b in &hunters[i + 1..] {
                share_between_hunters(world, a, b);
            }
        }
    }
}

/// One step of rest for every agent that began resting before this tick
fn apply_recovery(world: &mut World, events: &mut Vec<SimulationEvent>) {
    let tick = world.current_tick();

    for id in world.ids_of_kind(EntityKind::Hunter) {
        if let Some(hunter) = world.hunter_mut(id) {
            if hunter.resting_since.is_some_and(|since| since < tick) && hunter.recover() {
                tracing::debug!("Hunter {} fully rested", id);
            }
        }
    }

    for id in world.ids_of_kind(EntityKind::Knight) {
        let gain = garrison_recovery_rate(world, id);
        if let Some(knight) = world.knight_mut(id) {
            let gain = gain.unwrap_or(knight.energy.profile().rest_gain);
            if knight.resting_since.is_some_and(|since| since < tick) && knight.recover(gain) {
                tracing::debug!("Knight {} back on patrol", id);
                events.push(SimulationEvent::KnightPatrolling { knight: id });
            }
        }
    }
}

/// Recovery rate of the garrison a knight is resident in
fn garrison_recovery_rate(world: &World, knight_id: EntityId) -> Option<f32> {
    let pos = world.position_of(knight_id)?;
    let structure = world.structure_at(pos)?;
    world
        .garrison(structure.id)
        .filter(|g| g.has_resident(knight_id))
        .map(|g| g.recovery_rate)
}

/// Termination reason, if the world has reached one
pub fn check_completion(world: &World) -> Option<&'static str> {
    if world.count_of_kind(EntityKind::Treasure) == 0 {
        return Some(TREASURE_DEPLETED);
    }
    let hunters_left = world.count_of_kind(EntityKind::Hunter) > 0;
    let can_grow = world
        .ids_of_kind(EntityKind::Hideout)
        .into_iter()
        .any(|id| can_recruit(world, id));
    if !hunters_left && !can_grow {
        return Some(HUNTERS_ELIMINATED);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::entity::hunter::Hunter;
    use crate::entity::knight::{Knight, KnightState};
    use crate::entity::knowledge::KnowledgeCategory;
    use crate::entity::treasure::Treasure;

    fn world() -> World {
        World::new(SimulationConfig::default())
    }

    #[test]
    fn test_tick_advances_counter() {
        let mut w = world();
        w.spawn_treasure(Treasure::new(TreasureKind::Gold, 13.0), Position::new(1, 1))
            .unwrap();
        w.spawn_hunter(Hunter::new(HunterSkill::Stealth, w.config()), Position::new(9, 9))
            .unwrap();
        assert_eq!(w.current_tick(), 0);
        run_simulation_tick(&mut w);
        assert_eq!(w.current_tick(), 1);
    }

    #[test]
    fn test_empty_world_completes_immediately() {
        let mut w = world();
        let events = run_simulation_tick(&mut w);
        assert_eq!(
            events,
            vec![SimulationEvent::Completed {
                reason: TREASURE_DEPLETED.into()
            }]
        );
        assert_eq!(w.completion(), Some(TREASURE_DEPLETED));

        assert!(run_simulation_tick(&mut w).is_empty());
        assert_eq!(w.current_tick(), 1);
    }

    #[test]
    fn test_no_hunters_completes() {
        let mut w = world();
        w.spawn_treasure(Treasure::new(TreasureKind::Gold, 13.0), Position::new(1, 1))
            .unwrap();
        w.spawn_hideout(Position::new(5, 5)).unwrap();
        run_simulation_tick(&mut w);
        assert_eq!(w.completion(), Some(HUNTERS_ELIMINATED));
    }

    #[test]
    fn test_carried_treasure_depletes_out_of_hand() {
        let mut config = SimulationConfig::default();
        config.treasure.decay_rate = 1.0;
        let mut w = World::new(config);
        let pos = Position::new(3, 3);
        let hid = w
            .spawn_hunter(Hunter::new(HunterSkill::Stealth, w.config()), pos)
            .unwrap();
        let tid = w
            .spawn_treasure(Treasure::new(TreasureKind::Bronze, 3.0), pos)
            .unwrap();
        crate::simulation::interaction::collect_treasure(&mut w, hid).unwrap();

        let events = run_simulation_tick(&mut w);
        assert!(events.contains(&SimulationEvent::TreasureDepleted {
            treasure: tid,
            carried_by: Some(hid),
        }));
        assert!(w.treasure(tid).is_none());
        assert!(!w.hunter(hid).unwrap().is_carrying());
        assert_eq!(w.completion(), Some(TREASURE_DEPLETED));
    }

    #[test]
    fn test_colocated_hunters_share_knowledge() {
        let mut w = world();
        let pos = Position::new(5, 5);
        w.spawn_hideout(pos).unwrap();
        let a = w
            .spawn_hunter(Hunter::new(HunterSkill::Stealth, w.config()), pos)
            .unwrap();
        let b = w
            .spawn_hunter(Hunter::new(HunterSkill::Stealth, w.config()), pos)
            .unwrap();
        w.hunter_mut(a)
            .unwrap()
            .knowledge
            .record(KnowledgeCategory::Knight, Position::new(15, 15), None, 0);

        share_colocated_knowledge(&mut w);
        assert!(w
            .hunter(b)
            .unwrap()
            .knowledge
            .knows(KnowledgeCategory::Knight, Position::new(15, 15)));
    }

    #[test]
    fn test_resting_knight_recovers_from_next_tick() {
        let mut w = world();
        w.spawn_treasure(Treasure::new(TreasureKind::Gold, 13.0), Position::new(1, 1))
            .unwrap();
        w.spawn_hunter(Hunter::new(HunterSkill::Stealth, w.config()), Position::new(12, 12))
            .unwrap();
        let pos = Position::new(8, 8);
        let garrison = w.spawn_garrison(pos).unwrap();
        let kid = w
            .spawn_knight(Knight::new(&w.config().knight).with_energy(75.0), pos)
            .unwrap();
        let tick = w.current_tick();
        w.knight_mut(kid).unwrap().start_rest(tick);
        assert!(w.garrison(garrison).unwrap().has_resident(kid));

        let first = run_simulation_tick(&mut w);
        assert!(!first.contains(&SimulationEvent::KnightPatrolling { knight: kid }));
        assert_eq!(w.knight(kid).unwrap().energy.value(), 75.0);

        let second = run_simulation_tick(&mut w);
        assert!(second.contains(&SimulationEvent::KnightPatrolling { knight: kid }));
        assert_eq!(w.knight(kid).unwrap().energy.value(), 85.0);
        assert_eq!(w.knight(kid).unwrap().state, KnightState::Patrol);
    }

    #[test]
    fn test_garrison_rate_drives_knight_recovery() {
        let mut w = world();
        w.spawn_treasure(Treasure::new(TreasureKind::Gold, 13.0), Position::new(1, 1))
            .unwrap();
        w.spawn_hunter(Hunter::new(HunterSkill::Stealth, w.config()), Position::new(12, 12))
            .unwrap();
        let pos = Position::new(8, 8);
        let garrison = w.spawn_garrison(pos).unwrap();
        w.garrison_mut(garrison).unwrap().recovery_rate = 25.0;
        let kid = w
            .spawn_knight(Knight::new(&w.config().knight).with_energy(15.0), pos)
            .unwrap();
        let tick = w.current_tick();
        w.knight_mut(kid).unwrap().start_rest(tick);

        run_simulation_tick(&mut w);
        run_simulation_tick(&mut w);
        let knight = w.knight(kid).unwrap();
        assert_eq!(knight.energy.value(), 40.0);
        assert!(knight.is_resting());
    }
}
