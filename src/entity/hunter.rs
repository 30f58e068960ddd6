use serde::{Deserialize, Serialize};

use super::kind::{EntityKind, Occupant};
use super::knowledge::KnowledgeBase;
use super::resource::{ResourceMeter, ResourceProfile};
use crate::core::config::SimulationConfig;
use crate::core::types::{EntityId, Tick};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HunterSkill {
    /// Wider scan radius
    Navigation,
    /// Cheaper movement
    Endurance,
    /// Chance to go unnoticed by knights
    Stealth,
}

impl HunterSkill {
    pub const ALL: [HunterSkill; 3] = [HunterSkill::Navigation, HunterSkill::Endurance, HunterSkill::Stealth];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HunterState {
    Exploring,
    Collecting,
    Returning,
    Resting,
    Collapsed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HunterStats {
    pub treasures_deposited: u32,
    pub value_deposited: f32,
    pub distance_travelled: u32,
    pub times_captured: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hunter {
    pub skill: HunterSkill,
    pub stamina: ResourceMeter,
    /// Treasure currently held; a hunter carries at most one
    pub carrying: Option<EntityId>,
    pub knowledge: KnowledgeBase,
    pub state: HunterState,
    /// Hideout this hunter returns to by preference
    pub home: Option<EntityId>,
    /// Tick on which the current rest began
    pub resting_since: Option<Tick>,
    pub stats: HunterStats,
}

impl Hunter {
    pub fn new(skill: HunterSkill, config: &SimulationConfig) -> Self {
        let mut profile = ResourceProfile::hunter(&config.hunter);
        if skill == HunterSkill::Endurance {
            profile = profile.with_cost_factor(config.hunter.endurance_cost_factor);
        }
        Self {
            skill,
            stamina: ResourceMeter::new(profile),
            carrying: None,
            knowledge: KnowledgeBase::from_config(&config.knowledge),
            state: HunterState::Exploring,
            home: None,
            resting_since: None,
            stats: HunterStats::default(),
        }
    }

    /// Same hunter starting at a given stamina
    pub fn with_stamina(mut self, value: f32) -> Self {
        self.stamina = ResourceMeter::with_value(*self.stamina.profile(), value);
        self
    }

    pub fn scan_radius(&self, config: &SimulationConfig) -> i32 {
        match self.skill {
            HunterSkill::Navigation => config.hunter.scan_radius + config.hunter.navigation_scan_bonus,
            _ => config.hunter.scan_radius,
        }
    }

    pub fn is_carrying(&self) -> bool {
        self.carrying.is_some()
    }

    pub fn is_resting(&self) -> bool {
        self.state == HunterState::Resting
    }

    pub fn is_collapsed(&self) -> bool {
        self.state == HunterState::Collapsed
    }

    /// Take hold of a treasure; refused while already carrying one
    pub fn pick_up(&mut self, treasure: EntityId) -> bool {
        if self.carrying.is_some() || self.is_collapsed() {
            return false;
        }
        self.carrying = Some(treasure);
        self.state = HunterState::Returning;
        true
    }

    pub fn release_carried(&mut self) -> Option<EntityId> {
        let released = self.carrying.take();
        if released.is_some() && self.state == HunterState::Returning {
            self.state = HunterState::Exploring;
        }
        released
    }

    pub fn start_rest(&mut self, tick: Tick) {
        if self.is_collapsed() {
            return;
        }
        self.stamina.start_rest();
        self.state = HunterState::Resting;
        self.resting_since = Some(tick);
    }

    /// One step of rest; returns true when the hunter is fully recovered
    pub fn recover(&mut self) -> bool {
        if !self.is_resting() {
            return false;
        }
        if self.stamina.recover() {
            self.state = HunterState::Exploring;
            self.resting_since = None;
            return true;
        }
        false
    }

    pub fn collapse(&mut self) {
        self.state = HunterState::Collapsed;
        self.resting_since = None;
    }
}

impl Occupant for Hunter {
    const KIND: EntityKind = EntityKind::Hunter;
    const PASSABLE_FOR: &'static [EntityKind] = &[EntityKind::Knight, EntityKind::Treasure];

    fn occupies_cell(&self) -> bool {
        !self.is_collapsed()
    }

    fn can_be_captured(&self) -> bool {
        !self.is_collapsed() && !self.is_resting()
    }
}
