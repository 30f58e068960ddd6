//! One hunter's turn
//!
//! Scan, collect, pick a goal, take at most one step, then settle whatever
//! the new cell triggers. The stamina collapse countdown runs last.

use crate::core::types::{EntityId, Metric, Position};
use crate::ecs::world::World;
use crate::entity::hunter::{Hunter, HunterState};
use crate::entity::kind::EntityKind;
use crate::entity::knowledge::KnowledgeCategory;
use crate::simulation::interaction::{collapse_hunter, collect_treasure, resolve_hideout_visit};
use crate::simulation::movement::{step_toward, wander, HUNTER_PATH_ALLOW};
use crate::simulation::perception::scan_surroundings;
use crate::simulation::targeting::{avoid_threats, nearest, select_cluster_assisted, KMeansGrouping};
use crate::simulation::tick::SimulationEvent;

pub fn run_hunter_turn(world: &mut World, hunter_id: EntityId) -> Vec<SimulationEvent> {
    let mut events = Vec::new();
    match world.hunter(hunter_id) {
        Some(h) if !h.is_collapsed() => {}
        _ => return events,
    }
    if world.position_of(hunter_id).is_none() {
        return events;
    }

    scan_surroundings(world, hunter_id);
    events.extend(collect_treasure(world, hunter_id));
    events.extend(settle_in_hideout(world, hunter_id));

    let may_move = world
        .hunter(hunter_id)
        .is_some_and(|h| !h.is_resting() && h.stamina.can_move());
    if may_move && take_step(world, hunter_id) {
        if let Some(hunter) = world.hunter_mut(hunter_id) {
            hunter.stamina.spend_move();
            hunter.stats.distance_travelled += 1;
        }
        events.extend(collect_treasure(world, hunter_id));
        events.extend(settle_in_hideout(world, hunter_id));
    }

    let collapsed = world
        .hunter_mut(hunter_id)
        .is_some_and(|h| h.stamina.end_turn());
    if collapsed {
        tracing::debug!("Hunter {} ran out of grace at zero stamina", hunter_id);
        events.extend(collapse_hunter(world, hunter_id));
    }
    events
}

/// Deposit, share and maybe rest when standing in a hideout
fn settle_in_hideout(world: &mut World, hunter_id: EntityId) -> Vec<SimulationEvent> {
    let Some(pos) = world.position_of(hunter_id) else {
        return Vec::new();
    };
    match world.structure_at(pos) {
        Some(s) if s.kind == EntityKind::Hideout => resolve_hideout_visit(world, hunter_id, s.id),
        _ => Vec::new(),
    }
}

/// Move toward the current goal, or wander without one
fn take_step(world: &mut World, hunter_id: EntityId) -> bool {
    match choose_goal(world, hunter_id) {
        Some((goal, state)) => {
            set_state(world, hunter_id, state);
            step_toward(world, hunter_id, goal, &HUNTER_PATH_ALLOW)
        }
        None => {
            set_state(world, hunter_id, HunterState::Exploring);
            wander(world, hunter_id)
        }
    }
}

/// Where the hunter wants to go this turn
///
/// Critical or loaded hunters head for the nearest known hideout; otherwise
/// the hunter goes after a remembered treasure, passing over those near a
/// remembered knight while a safer one is known.
pub fn choose_goal(world: &World, hunter_id: EntityId) -> Option<(Position, HunterState)> {
    let pos = world.position_of(hunter_id)?;
    let hunter = world.hunter(hunter_id)?;

    if hunter.stamina.is_critical() || hunter.is_carrying() {
        if let Some(hideout) = nearest_hideout(world, hunter, pos) {
            return Some((hideout, HunterState::Returning));
        }
    }
    if hunter.is_carrying() {
        return None;
    }

    let candidates: Vec<((), Position)> = hunter
        .knowledge
        .positions(KnowledgeCategory::Treasure)
        .into_iter()
        .filter(|p| *p != pos)
        .map(|p| ((), p))
        .collect();
    let knights = hunter.knowledge.positions(KnowledgeCategory::Knight);
    let avoid_radius = world.config().targeting.knight_avoid_radius;
    let candidates = avoid_threats(world.grid(), &candidates, &knights, avoid_radius);
    let grouping = KMeansGrouping::default();
    let max_groups = world.config().targeting.max_clusters;
    select_cluster_assisted(world.grid(), pos, &candidates, &grouping, max_groups)
        .map(|(_, target)| (target, HunterState::Collecting))
}

/// Nearest hideout among the hunter's home and the hideouts it remembers
fn nearest_hideout(world: &World, hunter: &Hunter, from: Position) -> Option<Position> {
    let mut known: Vec<(EntityId, Position)> = Vec::new();
    if let Some(home) = hunter.home {
        if let Some(pos) = world.position_of(home) {
            known.push((home, pos));
        }
    }
    for entry in hunter.knowledge.entries(KnowledgeCategory::Hideout) {
        let still_there = world
            .structure_at(entry.position)
            .filter(|s| s.kind == EntityKind::Hideout);
        if let Some(s) = still_there {
            if !known.iter().any(|(id, _)| *id == s.id) {
                known.push((s.id, entry.position));
            }
        }
    }
    nearest(world.grid(), from, &known, Metric::Manhattan).map(|(_, pos)| pos)
}

fn set_state(world: &mut World, hunter_id: EntityId, state: HunterState) {
    if let Some(hunter) = world.hunter_mut(hunter_id) {
        if !hunter.is_resting() && !hunter.is_collapsed() {
            hunter.state = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::entity::hunter::HunterSkill;
    use crate::entity::treasure::{Treasure, TreasureKind};

    #[test]
    fn test_hunter_walks_to_visible_treasure() {
        let mut world = World::new(SimulationConfig::default());
        let hid = world
            .spawn_hunter(Hunter::new(HunterSkill::Stealth, world.config()), Position::new(0, 0))
            .unwrap();
        let tid = world
            .spawn_treasure(Treasure::new(TreasureKind::Bronze, 3.0), Position::new(0, 3))
            .unwrap();

        for _ in 0..3 {
            run_hunter_turn(&mut world, hid);
        }
        let hunter = world.hunter(hid).unwrap();
        assert_eq!(world.position_of(hid), Some(Position::new(0, 3)));
        assert_eq!(hunter.carrying, Some(tid));
        assert_eq!(hunter.stamina.value(), 94.0);
        assert_eq!(hunter.stats.distance_travelled, 3);
    }

    #[test]
    fn test_carrying_hunter_heads_home() {
        let mut world = World::new(SimulationConfig::default());
        let home_pos = Position::new(10, 10);
        let home = world.spawn_hideout(home_pos).unwrap();
        let mut hunter = Hunter::new(HunterSkill::Stealth, world.config());
        hunter.home = Some(home);
        let hid = world.spawn_hunter(hunter, Position::new(10, 14)).unwrap();
        world
            .spawn_treasure(Treasure::new(TreasureKind::Silver, 7.0), Position::new(10, 14))
            .unwrap();

        run_hunter_turn(&mut world, hid);
        assert!(world.hunter(hid).unwrap().is_carrying());
        assert_eq!(world.position_of(hid), Some(Position::new(10, 13)));
        assert_eq!(world.hunter(hid).unwrap().state, HunterState::Returning);

        for _ in 0..3 {
            run_hunter_turn(&mut world, hid);
        }
        assert_eq!(world.position_of(hid), Some(home_pos));
        assert!(!world.hunter(hid).unwrap().is_carrying());
        assert_eq!(world.hideout(home).unwrap().deposits, 1);
    }

    #[test]
    fn test_resting_hunter_stays_put() {
        let mut world = World::new(SimulationConfig::default());
        let pos = Position::new(4, 4);
        world.spawn_hideout(pos).unwrap();
        let hid = world
            .spawn_hunter(Hunter::new(HunterSkill::Stealth, world.config()).with_stamina(2.0), pos)
            .unwrap();

        run_hunter_turn(&mut world, hid);
        run_hunter_turn(&mut world, hid);
        let hunter = world.hunter(hid).unwrap();
        assert!(hunter.is_resting());
        assert_eq!(hunter.stamina.value(), 2.0);
        assert_eq!(world.position_of(hid), Some(pos));
    }

    #[test]
    fn test_no_known_target_explores() {
        let mut world = World::new(SimulationConfig::default());
        let start = Position::new(7, 7);
        let hid = world
            .spawn_hunter(Hunter::new(HunterSkill::Stealth, world.config()), start)
            .unwrap();
        assert!(choose_goal(&world, hid).is_none());
        run_hunter_turn(&mut world, hid);
        let now = world.position_of(hid).unwrap();
        assert_eq!(world.grid().manhattan(start, now), 1);
        assert_eq!(world.hunter(hid).unwrap().state, HunterState::Exploring);
    }

    #[test]
    fn test_known_knight_steers_goal_away() {
        let mut world = World::new(SimulationConfig::default());
        let hid = world
            .spawn_hunter(Hunter::new(HunterSkill::Stealth, world.config()), Position::new(0, 0))
            .unwrap();
        {
            let knowledge = &mut world.hunter_mut(hid).unwrap().knowledge;
            knowledge.record(KnowledgeCategory::Treasure, Position::new(0, 3), None, 0);
            knowledge.record(KnowledgeCategory::Treasure, Position::new(5, 5), None, 0);
        }
        assert_eq!(
            choose_goal(&world, hid),
            Some((Position::new(0, 3), HunterState::Collecting))
        );

        world
            .hunter_mut(hid)
            .unwrap()
            .knowledge
            .record(KnowledgeCategory::Knight, Position::new(0, 4), None, 0);
        assert_eq!(
            choose_goal(&world, hid),
            Some((Position::new(5, 5), HunterState::Collecting))
        );
    }
}
