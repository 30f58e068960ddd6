//! Perception - what agents notice around them
//!
//! Hunters scan a Manhattan diamond and write what they see into their
//! knowledge base. Knights look for capturable hunters inside their
//! Euclidean detection radius.

use crate::core::types::{EntityId, Metric, Position};
use crate::ecs::world::World;
use crate::entity::kind::{EntityKind, Occupant};
use crate::entity::knowledge::{KnowledgeCategory, KnowledgeEntry};
use crate::simulation::targeting::{stealth_evades, PursuitCandidate};

/// One thing a hunter saw during a scan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sighting {
    pub category: KnowledgeCategory,
    pub position: Position,
    pub entity: EntityId,
}

/// Everything visible from `center` within a Manhattan radius
pub fn scan(world: &World, center: Position, radius: i32) -> Vec<Sighting> {
    let mut sightings = Vec::new();
    for cell in world.grid().cells_within(center, radius) {
        for occ in world.occupants_at(cell) {
            let category = match occ.kind {
                EntityKind::Treasure => KnowledgeCategory::Treasure,
                EntityKind::Hideout => KnowledgeCategory::Hideout,
                EntityKind::Knight => KnowledgeCategory::Knight,
                _ => continue,
            };
            sightings.push(Sighting {
                category,
                position: cell,
                entity: occ.id,
            });
        }
    }
    sightings
}

/// Purge stale memories, record what is visible, forget what has vanished
///
/// Returns the number of sightings recorded.
pub fn scan_surroundings(world: &mut World, hunter_id: EntityId) -> usize {
    let Some(pos) = world.position_of(hunter_id) else {
        return 0;
    };
    let Some(radius) = world.hunter(hunter_id).map(|h| h.scan_radius(world.config())) else {
        return 0;
    };
    let tick = world.current_tick();
    let sightings = scan(world, pos, radius);

    // Remembered positions inside the scan area that no longer hold anything
    let mut vanished = Vec::new();
    if let Some(hunter) = world.hunter(hunter_id) {
        for category in [KnowledgeCategory::Treasure, KnowledgeCategory::Knight] {
            for KnowledgeEntry { position, .. } in hunter.knowledge.entries(category) {
                let in_view = world.grid().manhattan(pos, *position) <= radius;
                let still_there = sightings
                    .iter()
                    .any(|s| s.category == category && s.position == *position);
                if in_view && !still_there {
                    vanished.push((category, *position));
                }
            }
        }
    }

    let Some(hunter) = world.hunter_mut(hunter_id) else {
        return 0;
    };
    hunter.knowledge.purge(tick);
    for (category, position) in vanished {
        hunter.knowledge.forget(category, position);
    }
    for s in &sightings {
        hunter.knowledge.record(s.category, s.position, Some(s.entity), tick);
    }
    sightings.len()
}

/// Hunters a knight can see and is willing to chase this turn
///
/// Skips hunters sheltering in a hideout, resting or collapsed hunters, and
/// hunters the knight is ignoring after a recent capture. Stealth hunters
/// roll to slip past this evaluation.
pub fn detect_hunters(world: &mut World, knight_id: EntityId) -> Vec<PursuitCandidate> {
    let Some(knight_pos) = world.position_of(knight_id) else {
        return Vec::new();
    };
    let Some(knight) = world.knight(knight_id) else {
        return Vec::new();
    };
    let radius = knight.detection_radius;
    let tick = world.current_tick();

    let mut in_range = Vec::new();
    for hunter_id in world.ids_of_kind(EntityKind::Hunter) {
        let Some(hunter_pos) = world.position_of(hunter_id) else {
            continue;
        };
        let Some(hunter) = world.hunter(hunter_id) else {
            continue;
        };
        if !hunter.can_be_captured() || knight.is_ignoring(hunter_id, tick) {
            continue;
        }
        if world
            .structure_at(hunter_pos)
            .is_some_and(|s| s.kind == EntityKind::Hideout)
        {
            continue;
        }
        let distance = world.grid().distance(knight_pos, hunter_pos, Metric::Euclidean);
        if distance > radius {
            continue;
        }
        in_range.push((
            hunter.skill,
            PursuitCandidate {
                hunter: hunter_id,
                distance,
                carrying: hunter.is_carrying(),
                stamina: hunter.stamina.value(),
                resting: hunter.is_resting(),
            },
        ));
    }

    let evasion = world.config().targeting.stealth_evasion;
    let mut detected = Vec::with_capacity(in_range.len());
    for (skill, candidate) in in_range {
        if stealth_evades(skill, evasion, world.rng()) {
            tracing::debug!("Hunter {} slipped past knight {}", candidate.hunter, knight_id);
            continue;
        }
        detected.push(candidate);
    }
    detected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::entity::hunter::{Hunter, HunterSkill};
    use crate::entity::knight::Knight;
    use crate::entity::treasure::{Treasure, TreasureKind};

    #[test]
    fn test_scan_records_and_forgets() {
        let mut world = World::new(SimulationConfig::default());
        let hunter = Hunter::new(HunterSkill::Stealth, world.config());
        let hid = world.spawn_hunter(hunter, Position::new(0, 0)).unwrap();
        let near = world
            .spawn_treasure(Treasure::new(TreasureKind::Bronze, 3.0), Position::new(0, 3))
            .unwrap();
        world
            .spawn_treasure(Treasure::new(TreasureKind::Bronze, 3.0), Position::new(3, 1))
            .unwrap();

        assert_eq!(scan_surroundings(&mut world, hid), 1);
        let kb = &world.hunter(hid).unwrap().knowledge;
        assert!(kb.knows(KnowledgeCategory::Treasure, Position::new(0, 3)));
        assert!(!kb.knows(KnowledgeCategory::Treasure, Position::new(3, 1)));

        world.despawn(near);
        scan_surroundings(&mut world, hid);
        assert!(world.hunter(hid).unwrap().knowledge.is_empty());
    }

    #[test]
    fn test_navigation_sees_further() {
        let mut world = World::new(SimulationConfig::default());
        let hunter = Hunter::new(HunterSkill::Navigation, world.config());
        let hid = world.spawn_hunter(hunter, Position::new(0, 0)).unwrap();
        world
            .spawn_treasure(Treasure::new(TreasureKind::Gold, 13.0), Position::new(19, 17))
            .unwrap();
        assert_eq!(scan_surroundings(&mut world, hid), 1);
    }

    #[test]
    fn test_detection_radius_and_shelter() {
        let mut world = World::new(SimulationConfig::default());
        let kid = world
            .spawn_knight(Knight::new(&world.config().knight), Position::new(10, 10))
            .unwrap();
        let hideout = Position::new(12, 10);
        world.spawn_hideout(hideout).unwrap();

        let visible = world
            .spawn_hunter(Hunter::new(HunterSkill::Navigation, world.config()), Position::new(12, 12))
            .unwrap();
        world
            .spawn_hunter(Hunter::new(HunterSkill::Navigation, world.config()), hideout)
            .unwrap();
        world
            .spawn_hunter(Hunter::new(HunterSkill::Navigation, world.config()), Position::new(14, 10))
            .unwrap();

        let detected = detect_hunters(&mut world, kid);
        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].hunter, visible);
        assert!((detected[0].distance - 8f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_stealth_always_evades_at_full_probability() {
        let mut config = SimulationConfig::default();
        config.targeting.stealth_evasion = 1.0;
        let mut world = World::new(config);
        let kid = world
            .spawn_knight(Knight::new(&world.config().knight), Position::new(0, 0))
            .unwrap();
        world
            .spawn_hunter(Hunter::new(HunterSkill::Stealth, world.config()), Position::new(1, 0))
            .unwrap();
        assert!(detect_hunters(&mut world, kid).is_empty());
    }
}
