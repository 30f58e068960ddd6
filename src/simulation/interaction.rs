//! Co-location triggered state transitions
//!
//! Collection, deposits and knowledge exchange at hideouts, captures, and
//! garrison rest. Every function here commits its changes fully before
//! returning.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::core::config::InteractionConfig;
use crate::core::types::EntityId;
use crate::ecs::world::World;
use crate::entity::hunter::Hunter;
use crate::entity::kind::{EntityKind, Occupant};
use crate::entity::knowledge::KnowledgeCategory;
use crate::entity::treasure::TreasureLocation;
use crate::simulation::tick::SimulationEvent;
use crate::spatial::torus::NeighborKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureOutcome {
    Detain,
    Challenge,
}

impl CaptureOutcome {
    pub fn penalty(self, config: &InteractionConfig) -> f32 {
        match self {
            CaptureOutcome::Detain => config.detain_penalty,
            CaptureOutcome::Challenge => config.challenge_penalty,
        }
    }
}

/// Decides how a capture plays out
pub trait CapturePredictor {
    fn predict(&self, hunter: &Hunter, config: &InteractionConfig, rng: &mut dyn RngCore) -> CaptureOutcome;
}

/// Hunters caught carrying treasure are challenged; others are challenged
/// with the configured probability
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicPredictor;

impl CapturePredictor for HeuristicPredictor {
    fn predict(&self, hunter: &Hunter, config: &InteractionConfig, rng: &mut dyn RngCore) -> CaptureOutcome {
        if hunter.is_carrying() || rng.gen_bool(config.challenge_probability) {
            CaptureOutcome::Challenge
        } else {
            CaptureOutcome::Detain
        }
    }
}

/// Always produces the same outcome
#[derive(Debug, Clone, Copy)]
pub struct FixedOutcome(pub CaptureOutcome);

impl CapturePredictor for FixedOutcome {
    fn predict(&self, _hunter: &Hunter, _config: &InteractionConfig, _rng: &mut dyn RngCore) -> CaptureOutcome {
        self.0
    }
}

/// Pick up a loose treasure on the hunter's cell
pub fn collect_treasure(world: &mut World, hunter_id: EntityId) -> Option<SimulationEvent> {
    let pos = world.position_of(hunter_id)?;
    let hunter = world.hunter(hunter_id)?;
    if hunter.is_carrying() || hunter.is_collapsed() {
        return None;
    }
    let treasure_id = world.grid().first_of_kind(pos, EntityKind::Treasure)?;

    world.lift(treasure_id);
    let (kind, value) = {
        let treasure = world.treasure_mut(treasure_id)?;
        treasure.location = TreasureLocation::CarriedBy(hunter_id);
        (treasure.kind, treasure.value)
    };
    let hunter = world.hunter_mut(hunter_id)?;
    hunter.pick_up(treasure_id);
    hunter.knowledge.forget(KnowledgeCategory::Treasure, pos);

    world.counters.treasures_collected += 1;
    *world.counters.collected_by_kind.get_mut(kind) += 1;
    tracing::debug!("Hunter {} collected {:?} treasure {} worth {:.3} at {}", hunter_id, kind, treasure_id, value, pos);

    Some(SimulationEvent::TreasureCollected {
        hunter: hunter_id,
        treasure: treasure_id,
        kind,
        value,
    })
}

/// Deposit, knowledge exchange and rest for a hunter inside a hideout
pub fn resolve_hideout_visit(world: &mut World, hunter_id: EntityId, hideout_id: EntityId) -> Vec<SimulationEvent> {
    let mut events = Vec::new();
    if world.hideout(hideout_id).is_none() {
        return events;
    }

    let carried = world.hunter_mut(hunter_id).and_then(Hunter::release_carried);
    if let Some(treasure_id) = carried {
        if let Some(treasure) = world.despawn(treasure_id).and_then(|e| e.as_treasure().cloned()) {
            if let Some(hideout) = world.hideout_mut(hideout_id) {
                hideout.deposit(treasure.kind, treasure.value);
            }
            if let Some(hunter) = world.hunter_mut(hunter_id) {
                hunter.stats.treasures_deposited += 1;
                hunter.stats.value_deposited += treasure.value;
            }
            world.counters.treasures_deposited += 1;
            *world.counters.deposited_by_kind.get_mut(treasure.kind) += treasure.value;
            tracing::debug!(
                "Hunter {} deposited {:?} worth {:.3} at hideout {}",
                hunter_id,
                treasure.kind,
                treasure.value,
                hideout_id
            );
            events.push(SimulationEvent::TreasureDeposited {
                hunter: hunter_id,
                hideout: hideout_id,
                kind: treasure.kind,
                value: treasure.value,
            });
        }
    }

    share_with_hideout(world, hunter_id, hideout_id);

    let tick = world.current_tick();
    if let Some(hunter) = world.hunter_mut(hunter_id) {
        if !hunter.is_resting() && hunter.stamina.is_critical() {
            hunter.start_rest(tick);
            tracing::debug!("Hunter {} resting at hideout {}", hunter_id, hideout_id);
            events.push(SimulationEvent::HunterResting {
                hunter: hunter_id,
                hideout: hideout_id,
            });
        }
    }
    events
}

/// Bidirectional knowledge merge between a hunter and a hideout
pub fn share_with_hideout(world: &mut World, hunter_id: EntityId, hideout_id: EntityId) {
    let (Some(hunter), Some(hideout)) = (world.hunter(hunter_id), world.hideout(hideout_id)) else {
        return;
    };
    let hunter_kb = hunter.knowledge.clone();
    let hideout_kb = hideout.knowledge.clone();
    if let Some(hunter) = world.hunter_mut(hunter_id) {
        hunter.knowledge.merge(&hideout_kb);
    }
    if let Some(hideout) = world.hideout_mut(hideout_id) {
        hideout.knowledge.merge(&hunter_kb);
    }
}

/// Bidirectional knowledge merge between two hunters on the same cell
pub fn share_between_hunters(world: &mut World, a: EntityId, b: EntityId) {
    let (Some(ha), Some(hb)) = (world.hunter(a), world.hunter(b)) else {
        return;
    };
    if world.position_of(a) != world.position_of(b) {
        return;
    }
    let kb_a = ha.knowledge.clone();
    let kb_b = hb.knowledge.clone();
    if let Some(h) = world.hunter_mut(a) {
        h.knowledge.merge(&kb_b);
    }
    if let Some(h) = world.hunter_mut(b) {
        h.knowledge.merge(&kb_a);
    }
}

/// A knight catches a co-located hunter
///
/// Applies the stamina penalty, forces the carried treasure back onto the
/// grid and collapses the hunter if it is left with nothing.
pub fn resolve_capture(world: &mut World, knight_id: EntityId, hunter_id: EntityId) -> Vec<SimulationEvent> {
    let mut events = Vec::new();
    let (Some(knight_pos), Some(hunter_pos)) = (world.position_of(knight_id), world.position_of(hunter_id)) else {
        return events;
    };
    if knight_pos != hunter_pos || world.knight(knight_id).is_none() {
        return events;
    }
    let Some(hunter) = world.hunter(hunter_id) else {
        return events;
    };
    if !hunter.can_be_captured() {
        return events;
    }

    let hunter = hunter.clone();
    let config = world.config().interaction.clone();
    let outcome = {
        let (predictor, rng) = world.predictor_and_rng();
        predictor.predict(&hunter, &config, rng)
    };
    let penalty = outcome.penalty(&config);

    let stamina_after = match world.hunter_mut(hunter_id) {
        Some(h) => {
            h.stamina.drain(penalty);
            h.stats.times_captured += 1;
            h.stamina.value()
        }
        None => return events,
    };
    match outcome {
        CaptureOutcome::Detain => world.counters.detains += 1,
        CaptureOutcome::Challenge => world.counters.challenges += 1,
    }

    let tick = world.current_tick();
    let cooldown = world.config().knight.capture_cooldown;
    if let Some(knight) = world.knight_mut(knight_id) {
        knight.record_capture(hunter_id, tick, cooldown);
    }
    tracing::debug!(
        "Knight {} captured hunter {} at {} ({:?}, stamina now {:.1})",
        knight_id,
        hunter_id,
        hunter_pos,
        outcome,
        stamina_after
    );
    events.push(SimulationEvent::Capture {
        knight: knight_id,
        hunter: hunter_id,
        outcome,
        stamina_after,
    });

    events.extend(drop_carried(world, hunter_id));

    let collapsed = world.hunter(hunter_id).is_some_and(|h| h.stamina.is_collapsed());
    if collapsed {
        events.extend(collapse_hunter(world, hunter_id));
    }
    events
}

/// Return a hunter's treasure to the grid at the hunter's position
pub fn drop_carried(world: &mut World, hunter_id: EntityId) -> Option<SimulationEvent> {
    let pos = world.position_of(hunter_id)?;
    let treasure_id = world.hunter_mut(hunter_id)?.release_carried()?;
    if let Some(treasure) = world.treasure_mut(treasure_id) {
        treasure.location = TreasureLocation::Loose;
    }

    let mut landed = world.place(treasure_id, pos).ok();
    if landed.is_none() {
        for cell in world.grid().neighbors(pos, 1, NeighborKind::Orthogonal) {
            if world.grid().can_enter(cell, EntityKind::Treasure) {
                landed = world.place(treasure_id, cell).ok();
                if landed.is_some() {
                    break;
                }
            }
        }
    }

    let Some(position) = landed else {
        tracing::warn!("No room to drop treasure {} near {}; discarding it", treasure_id, pos);
        world.despawn(treasure_id);
        return None;
    };

    world.counters.treasures_dropped += 1;
    tracing::debug!("Hunter {} dropped treasure {} at {}", hunter_id, treasure_id, position);
    Some(SimulationEvent::TreasureDropped {
        hunter: hunter_id,
        treasure: treasure_id,
        position,
    })
}

/// Remove a collapsed hunter from the simulation
pub fn collapse_hunter(world: &mut World, hunter_id: EntityId) -> Vec<SimulationEvent> {
    let mut events = Vec::new();
    let Some(position) = world.position_of(hunter_id) else {
        return events;
    };
    events.extend(drop_carried(world, hunter_id));
    if let Some(hunter) = world.hunter_mut(hunter_id) {
        hunter.collapse();
    }
    world.despawn(hunter_id);
    world.counters.hunters_collapsed += 1;
    tracing::debug!("Hunter {} collapsed at {}", hunter_id, position);
    events.push(SimulationEvent::HunterCollapsed {
        hunter: hunter_id,
        position,
    });
    events
}

/// A knight inside a garrison starts resting
pub fn resolve_garrison_arrival(world: &mut World, knight_id: EntityId, garrison_id: EntityId) -> Option<SimulationEvent> {
    let tick = world.current_tick();
    let resident = world.garrison(garrison_id)?.has_resident(knight_id);
    if !resident {
        return None;
    }
    let knight = world.knight_mut(knight_id)?;
    if knight.is_resting() {
        return None;
    }
    knight.start_rest(tick);
    tracing::debug!("Knight {} resting at garrison {}", knight_id, garrison_id);
    Some(SimulationEvent::KnightResting {
        knight: knight_id,
        garrison: garrison_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::Position;
    use crate::entity::hunter::HunterSkill;
    use crate::entity::knight::Knight;
    use crate::entity::treasure::{Treasure, TreasureKind};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn world() -> World {
        World::new(SimulationConfig::default())
    }

    fn carrying_hunter(world: &mut World, pos: Position, value: f32) -> (EntityId, EntityId) {
        let hunter = Hunter::new(HunterSkill::Stealth, world.config());
        let hid = world.spawn_hunter(hunter, pos).unwrap();
        let tid = world
            .spawn_treasure(Treasure::new(TreasureKind::Gold, value), pos)
            .unwrap();
        collect_treasure(world, hid).unwrap();
        (hid, tid)
    }

    #[test]
    fn test_heuristic_challenges_carriers() {
        let config = SimulationConfig::default();
        let mut hunter = Hunter::new(HunterSkill::Stealth, &config);
        hunter.carrying = Some(EntityId(9));
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..20 {
            assert_eq!(
                HeuristicPredictor.predict(&hunter, &config.interaction, &mut rng),
                CaptureOutcome::Challenge
            );
        }
    }

    #[test]
    fn test_collect_takes_treasure_off_grid() {
        let mut w = world();
        let pos = Position::new(3, 3);
        let (hid, tid) = carrying_hunter(&mut w, pos, 13.0);
        assert_eq!(w.hunter(hid).unwrap().carrying, Some(tid));
        assert_eq!(w.position_of(tid), None);
        assert_eq!(w.counters.collected_by_kind.gold, 1);
        assert!(w.check_invariants().is_ok());
    }

    #[test]
    fn test_no_second_collection_while_carrying() {
        let mut w = world();
        let pos = Position::new(3, 3);
        let (hid, tid) = carrying_hunter(&mut w, pos, 13.0);
        let other = w
            .spawn_treasure(Treasure::new(TreasureKind::Bronze, 3.0), pos)
            .unwrap();
        assert!(collect_treasure(&mut w, hid).is_none());
        assert_eq!(w.hunter(hid).unwrap().carrying, Some(tid));
        assert_eq!(w.position_of(other), Some(pos));
    }

    #[test]
    fn test_capture_drops_treasure() {
        let mut w = world();
        let pos = Position::new(6, 6);
        let (hid, tid) = carrying_hunter(&mut w, pos, 50.0);
        let kid = w.spawn_knight(Knight::new(&w.config().knight), pos).unwrap();

        let events = resolve_capture(&mut w, kid, hid);
        let hunter = w.hunter(hid).unwrap();
        assert_eq!(hunter.carrying, None);
        assert_eq!(hunter.stamina.value(), 80.0);
        assert_eq!(w.position_of(tid), Some(pos));
        assert_eq!(w.treasure(tid).unwrap().value, 50.0);
        assert!(events
            .iter()
            .any(|e| matches!(e, SimulationEvent::TreasureDropped { position, .. } if *position == pos)));
        assert_eq!(w.knight(kid).unwrap().captures, 1);
        assert!(w.check_invariants().is_ok());
    }

    #[test]
    fn test_capture_to_zero_collapses() {
        let mut w = world();
        let pos = Position::new(6, 6);
        let hunter = Hunter::new(HunterSkill::Navigation, w.config()).with_stamina(4.0);
        let hid = w.spawn_hunter(hunter, pos).unwrap();
        let kid = w.spawn_knight(Knight::new(&w.config().knight), pos).unwrap();
        w.set_capture_predictor(Box::new(FixedOutcome(CaptureOutcome::Detain)));

        let events = resolve_capture(&mut w, kid, hid);
        assert!(events.iter().any(|e| matches!(e, SimulationEvent::HunterCollapsed { .. })));
        assert!(w.hunter(hid).is_none());
        assert_eq!(w.counters.hunters_collapsed, 1);
        assert_eq!(w.counters.detains, 1);
        assert!(w.check_invariants().is_ok());
    }

    #[test]
    fn test_hideout_visit_deposits_and_shares() {
        let mut w = world();
        let hideout_pos = Position::new(8, 8);
        let hideout = w.spawn_hideout(hideout_pos).unwrap();
        w.hideout_mut(hideout)
            .unwrap()
            .knowledge
            .record(KnowledgeCategory::Treasure, Position::new(1, 1), None, 0);

        let (hid, _) = carrying_hunter(&mut w, Position::new(8, 7), 7.0);
        w.hunter_mut(hid)
            .unwrap()
            .knowledge
            .record(KnowledgeCategory::Knight, Position::new(2, 2), None, 0);
        assert!(w.move_agent(hid, hideout_pos));

        let events = resolve_hideout_visit(&mut w, hid, hideout);
        assert!(matches!(events[0], SimulationEvent::TreasureDeposited { value, .. } if value == 7.0));
        assert_eq!(w.hideout(hideout).unwrap().stored_value, 7.0);
        assert!(w
            .hunter(hid)
            .unwrap()
            .knowledge
            .knows(KnowledgeCategory::Treasure, Position::new(1, 1)));
        assert!(w
            .hideout(hideout)
            .unwrap()
            .knowledge
            .knows(KnowledgeCategory::Knight, Position::new(2, 2)));
        assert!(!w.hunter(hid).unwrap().is_resting());
        assert!(w.check_invariants().is_ok());
    }

    #[test]
    fn test_critical_hunter_rests_at_hideout() {
        let mut w = world();
        let pos = Position::new(0, 0);
        let hideout = w.spawn_hideout(pos).unwrap();
        let hunter = Hunter::new(HunterSkill::Stealth, w.config()).with_stamina(5.0);
        let hid = w.spawn_hunter(hunter, pos).unwrap();

        let events = resolve_hideout_visit(&mut w, hid, hideout);
        assert_eq!(
            events,
            vec![SimulationEvent::HunterResting {
                hunter: hid,
                hideout
            }]
        );
        assert!(w.hunter(hid).unwrap().is_resting());
    }

    #[test]
    fn test_garrison_arrival_starts_rest() {
        let mut w = world();
        let pos = Position::new(4, 4);
        let garrison = w.spawn_garrison(pos).unwrap();
        let kid = w
            .spawn_knight(Knight::new(&w.config().knight).with_energy(15.0), pos)
            .unwrap();
        assert!(resolve_garrison_arrival(&mut w, kid, garrison).is_some());
        assert!(w.knight(kid).unwrap().is_resting());
        assert!(resolve_garrison_arrival(&mut w, kid, garrison).is_none());
    }
}
