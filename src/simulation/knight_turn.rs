//! One knight's turn
//!
//! A knight low on energy retreats to a garrison; otherwise it chases the
//! highest-priority hunter it can see, or patrols at random.

use crate::core::types::{EntityId, Metric, Position};
use crate::ecs::world::World;
use crate::entity::kind::EntityKind;
use crate::entity::knight::KnightState;
use crate::simulation::interaction::{resolve_capture, resolve_garrison_arrival};
use crate::simulation::movement::{step_toward, wander, KNIGHT_PATH_ALLOW};
use crate::simulation::perception::detect_hunters;
use crate::simulation::targeting::{nearest, select_by_priority};
use crate::simulation::tick::SimulationEvent;

pub fn run_knight_turn(world: &mut World, knight_id: EntityId) -> Vec<SimulationEvent> {
    let mut events = Vec::new();
    let tick = world.current_tick();
    let Some(knight) = world.knight_mut(knight_id) else {
        return events;
    };
    knight.prune_cooldowns(tick);
    if knight.is_resting() {
        return events;
    }

    if knight.energy.is_critical() {
        retreat(world, knight_id, &mut events);
    } else {
        hunt(world, knight_id, &mut events);
    }
    events
}

fn retreat(world: &mut World, knight_id: EntityId, events: &mut Vec<SimulationEvent>) {
    set_state(world, knight_id, KnightState::Retreat, None);

    if let Some(garrison) = garrison_here(world, knight_id) {
        events.extend(resolve_garrison_arrival(world, knight_id, garrison));
        return;
    }

    let moved = match retreat_goal(world, knight_id) {
        Some(goal) => step_toward(world, knight_id, goal, &KNIGHT_PATH_ALLOW),
        None => wander(world, knight_id),
    };
    if moved {
        spend_move(world, knight_id);
        if let Some(garrison) = garrison_here(world, knight_id) {
            events.extend(resolve_garrison_arrival(world, knight_id, garrison));
        }
    }
}

fn hunt(world: &mut World, knight_id: EntityId, events: &mut Vec<SimulationEvent>) {
    let candidates = detect_hunters(world, knight_id);
    let Some(radius) = world.knight(knight_id).map(|k| k.detection_radius) else {
        return;
    };
    let weights = world.config().targeting.clone();
    let target = select_by_priority(&candidates, radius, &weights, world.rng());

    let Some((hunter_id, hunter_pos)) = target.and_then(|h| world.position_of(h).map(|p| (h, p))) else {
        set_state(world, knight_id, KnightState::Patrol, None);
        if wander(world, knight_id) {
            spend_move(world, knight_id);
        }
        return;
    };

    set_state(world, knight_id, KnightState::Pursue, Some(hunter_id));
    if world.position_of(knight_id) != Some(hunter_pos)
        && step_toward(world, knight_id, hunter_pos, &KNIGHT_PATH_ALLOW)
    {
        spend_move(world, knight_id);
    }
    if world.position_of(knight_id) == Some(hunter_pos) {
        events.extend(resolve_capture(world, knight_id, hunter_id));
    }
}

/// The garrison this knight is currently resident in
fn garrison_here(world: &World, knight_id: EntityId) -> Option<EntityId> {
    let pos = world.position_of(knight_id)?;
    let structure = world.structure_at(pos)?;
    if structure.kind != EntityKind::Garrison {
        return None;
    }
    world
        .garrison(structure.id)
        .filter(|g| g.has_resident(knight_id))
        .map(|_| structure.id)
}

/// Home garrison if it has room, else the nearest known garrison with room
fn retreat_goal(world: &World, knight_id: EntityId) -> Option<Position> {
    let knight = world.knight(knight_id)?;
    let from = world.position_of(knight_id)?;
    let open = |id: EntityId| -> Option<(EntityId, Position)> {
        let garrison = world.garrison(id)?;
        if garrison.is_full() && !garrison.has_resident(knight_id) {
            return None;
        }
        world.position_of(id).map(|pos| (id, pos))
    };

    if let Some(home) = knight.home.and_then(&open) {
        return Some(home.1);
    }
    let known: Vec<(EntityId, Position)> = knight.known_garrisons.iter().filter_map(|&id| open(id)).collect();
    nearest(world.grid(), from, &known, Metric::Manhattan).map(|(_, pos)| pos)
}

fn set_state(world: &mut World, knight_id: EntityId, state: KnightState, target: Option<EntityId>) {
    if let Some(knight) = world.knight_mut(knight_id) {
        knight.state = state;
        knight.target = target;
    }
}

fn spend_move(world: &mut World, knight_id: EntityId) {
    if let Some(knight) = world.knight_mut(knight_id) {
        knight.energy.spend_move();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::entity::hunter::{Hunter, HunterSkill};
    use crate::entity::knight::Knight;
    use crate::simulation::interaction::{CaptureOutcome, FixedOutcome};

    #[test]
    fn test_knight_pursues_and_captures() {
        let mut world = World::new(SimulationConfig::default());
        world.set_capture_predictor(Box::new(FixedOutcome(CaptureOutcome::Detain)));
        let kid = world
            .spawn_knight(Knight::new(&world.config().knight), Position::new(5, 5))
            .unwrap();
        let hid = world
            .spawn_hunter(Hunter::new(HunterSkill::Navigation, world.config()), Position::new(5, 7))
            .unwrap();

        let events = run_knight_turn(&mut world, kid);
        assert!(events.is_empty());
        assert_eq!(world.position_of(kid), Some(Position::new(5, 6)));
        assert_eq!(world.knight(kid).unwrap().state, KnightState::Pursue);
        assert_eq!(world.knight(kid).unwrap().target, Some(hid));

        let events = run_knight_turn(&mut world, kid);
        assert!(matches!(
            events[0],
            SimulationEvent::Capture { hunter, outcome: CaptureOutcome::Detain, .. } if hunter == hid
        ));
        assert_eq!(world.hunter(hid).unwrap().stamina.value(), 95.0);
        assert_eq!(world.knight(kid).unwrap().energy.value(), 98.0);
        assert!(world.knight(kid).unwrap().is_ignoring(hid, world.current_tick()));
    }

    #[test]
    fn test_knight_patrols_without_targets() {
        let mut world = World::new(SimulationConfig::default());
        let start = Position::new(9, 9);
        let kid = world
            .spawn_knight(Knight::new(&world.config().knight), start)
            .unwrap();
        run_knight_turn(&mut world, kid);
        let knight = world.knight(kid).unwrap();
        assert_eq!(knight.state, KnightState::Patrol);
        assert_eq!(knight.energy.value(), 99.0);
        assert_eq!(world.grid().manhattan(start, world.position_of(kid).unwrap()), 1);
    }

    #[test]
    fn test_critical_knight_retreats_and_rests() {
        let mut world = World::new(SimulationConfig::default());
        let garrison_pos = Position::new(2, 2);
        let garrison = world.spawn_garrison(garrison_pos).unwrap();
        let mut knight = Knight::new(&world.config().knight).with_energy(15.0);
        knight.home = Some(garrison);
        let kid = world.spawn_knight(knight, Position::new(2, 4)).unwrap();

        run_knight_turn(&mut world, kid);
        assert_eq!(world.knight(kid).unwrap().state, KnightState::Retreat);
        let events = run_knight_turn(&mut world, kid);
        assert_eq!(world.position_of(kid), Some(garrison_pos));
        assert_eq!(
            events,
            vec![SimulationEvent::KnightResting { knight: kid, garrison }]
        );
        assert!(world.knight(kid).unwrap().is_resting());
        assert_eq!(world.knight(kid).unwrap().energy.value(), 13.0);
    }
}
