use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::kind::{EntityKind, Occupant};
use super::resource::{ResourceMeter, ResourceProfile};
use crate::core::config::KnightConfig;
use crate::core::types::{EntityId, Tick};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KnightState {
    Patrol,
    Pursue,
    Retreat,
    Rest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Knight {
    pub energy: ResourceMeter,
    pub detection_radius: f32,
    pub state: KnightState,
    pub target: Option<EntityId>,
    /// Garrison this knight retreats to by preference
    pub home: Option<EntityId>,
    pub known_garrisons: Vec<EntityId>,
    /// Hunters ignored until the given tick
    pub cooldowns: BTreeMap<EntityId, Tick>,
    pub resting_since: Option<Tick>,
    pub captures: u32,
}

impl Knight {
    pub fn new(config: &KnightConfig) -> Self {
        Self {
            energy: ResourceMeter::new(ResourceProfile::knight(config)),
            detection_radius: config.detection_radius,
            state: KnightState::Patrol,
            target: None,
            home: None,
            known_garrisons: Vec::new(),
            cooldowns: BTreeMap::new(),
            resting_since: None,
            captures: 0,
        }
    }

    pub fn with_energy(mut self, value: f32) -> Self {
        self.energy = ResourceMeter::with_value(*self.energy.profile(), value);
        self
    }

    pub fn is_resting(&self) -> bool {
        self.state == KnightState::Rest
    }

    pub fn is_ignoring(&self, hunter: EntityId, now: Tick) -> bool {
        self.cooldowns.get(&hunter).is_some_and(|&until| now < until)
    }

    pub fn record_capture(&mut self, hunter: EntityId, now: Tick, cooldown: Tick) {
        self.captures += 1;
        self.target = None;
        self.state = KnightState::Patrol;
        if cooldown > 0 {
            self.cooldowns.insert(hunter, now + cooldown);
        }
    }

    pub fn prune_cooldowns(&mut self, now: Tick) {
        self.cooldowns.retain(|_, until| now < *until);
    }

    pub fn start_rest(&mut self, tick: Tick) {
        self.energy.start_rest();
        self.state = KnightState::Rest;
        self.target = None;
        self.resting_since = Some(tick);
    }

    /// One step of rest at the garrison's rate; returns true when back on patrol
    pub fn recover(&mut self, gain: f32) -> bool {
        if !self.is_resting() {
            return false;
        }
        if self.energy.recover_by(gain) {
            self.state = KnightState::Patrol;
            self.resting_since = None;
            return true;
        }
        false
    }
}

impl Occupant for Knight {
    const KIND: EntityKind = EntityKind::Knight;
    const PASSABLE_FOR: &'static [EntityKind] = &[EntityKind::Treasure];
}
