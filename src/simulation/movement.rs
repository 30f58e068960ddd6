//! One-cell moves for hunters and knights

use rand::seq::SliceRandom;

use crate::core::types::{EntityId, Position};
use crate::ecs::world::World;
use crate::entity::kind::EntityKind;
use crate::spatial::pathfinding::next_step;

/// Cells a hunter's path may cross besides the goal
pub const HUNTER_PATH_ALLOW: [EntityKind; 3] = [EntityKind::Treasure, EntityKind::Hideout, EntityKind::Garrison];

/// Cells a knight's path may cross besides the goal
pub const KNIGHT_PATH_ALLOW: [EntityKind; 3] = [EntityKind::Hunter, EntityKind::Treasure, EntityKind::Garrison];

/// Take one step toward `target`
///
/// When the preferred cell turns the mover away, the remaining orthogonal
/// neighbours are tried in random order. Returns true if the agent moved.
pub fn step_toward(world: &mut World, id: EntityId, target: Position, allow: &[EntityKind]) -> bool {
    let Some(from) = world.position_of(id) else {
        return false;
    };
    if from == world.grid().wrap_pos(target) {
        return false;
    }
    let range = world.config().targeting.greedy_range;
    let preferred = next_step(world.grid(), from, target, allow, range);
    if let Some(cell) = preferred {
        if world.move_agent(id, cell) {
            return true;
        }
    }

    let mut options: Vec<Position> = world
        .grid()
        .orthogonal_neighbors(from)
        .into_iter()
        .filter(|cell| Some(*cell) != preferred)
        .collect();
    options.shuffle(world.rng());
    options.into_iter().any(|cell| world.move_agent(id, cell))
}

/// Move to a random enterable orthogonal neighbour, if any
pub fn wander(world: &mut World, id: EntityId) -> bool {
    let Some(from) = world.position_of(id) else {
        return false;
    };
    let mut options = world.grid().orthogonal_neighbors(from);
    options.shuffle(world.rng());
    options.into_iter().any(|cell| world.move_agent(id, cell))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::entity::hunter::{Hunter, HunterSkill};
    use crate::entity::knight::Knight;

    #[test]
    fn test_step_toward_takes_greedy_cell() {
        let mut world = World::new(SimulationConfig::default());
        let hid = world
            .spawn_hunter(Hunter::new(HunterSkill::Stealth, world.config()), Position::new(0, 0))
            .unwrap();
        assert!(step_toward(&mut world, hid, Position::new(0, 3), &HUNTER_PATH_ALLOW));
        assert_eq!(world.position_of(hid), Some(Position::new(0, 1)));
    }

    #[test]
    fn test_step_toward_sidesteps_blocker() {
        let mut world = World::new(SimulationConfig::default());
        let hid = world
            .spawn_hunter(Hunter::new(HunterSkill::Stealth, world.config()), Position::new(5, 5))
            .unwrap();
        world
            .spawn_knight(Knight::new(&world.config().knight), Position::new(5, 6))
            .unwrap();
        assert!(step_toward(&mut world, hid, Position::new(5, 6), &HUNTER_PATH_ALLOW));
        let now = world.position_of(hid).unwrap();
        assert_ne!(now, Position::new(5, 6));
        assert_eq!(world.grid().manhattan(now, Position::new(5, 5)), 1);
    }

    #[test]
    fn test_wander_stays_when_boxed_in() {
        let mut world = World::new(SimulationConfig::default());
        let center = Position::new(3, 3);
        let hid = world
            .spawn_hunter(Hunter::new(HunterSkill::Stealth, world.config()), center)
            .unwrap();
        for cell in world.grid().orthogonal_neighbors(center) {
            world.spawn_knight(Knight::new(&world.config().knight), cell).unwrap();
        }
        assert!(!wander(&mut world, hid));
        assert_eq!(world.position_of(hid), Some(center));
    }
}
