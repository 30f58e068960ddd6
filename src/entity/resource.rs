//! Depletable stamina/energy with a rest and collapse state machine
//!
//! Hunters and knights share the same meter; they differ only in their
//! `ResourceProfile`. Hunters additionally carry a collapse grace countdown.

use serde::{Deserialize, Serialize};

use crate::core::config::{HunterConfig, KnightConfig};

pub const RESOURCE_MIN: f32 = 0.0;
pub const RESOURCE_MAX: f32 = 100.0;

/// State of a resource meter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceState {
    Active,
    Critical,
    Resting,
    Collapsed,
}

/// Costs and thresholds for one kind of agent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceProfile {
    pub move_cost: f32,
    pub rest_gain: f32,
    pub critical_threshold: f32,
    pub recovered_threshold: f32,
    /// Steps at zero before collapsing; `None` means the agent never collapses
    pub collapse_grace: Option<u32>,
}

impl ResourceProfile {
    pub fn hunter(config: &HunterConfig) -> Self {
        Self {
            move_cost: config.move_cost,
            rest_gain: config.rest_gain,
            critical_threshold: config.critical_threshold,
            recovered_threshold: config.recovered_threshold,
            collapse_grace: Some(config.collapse_grace),
        }
    }

    pub fn knight(config: &KnightConfig) -> Self {
        Self {
            move_cost: config.move_cost,
            rest_gain: config.rest_gain,
            critical_threshold: config.critical_threshold,
            recovered_threshold: config.recovered_threshold,
            collapse_grace: None,
        }
    }

    /// Same profile with the per-move cost scaled
    pub fn with_cost_factor(mut self, factor: f32) -> Self {
        self.move_cost *= factor;
        self
    }
}

/// A clamped resource value plus its state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMeter {
    value: f32,
    state: ResourceState,
    profile: ResourceProfile,
    /// Consecutive ended turns spent at zero outside rest
    zero_steps: u32,
}

impl ResourceMeter {
    pub fn new(profile: ResourceProfile) -> Self {
        Self::with_value(profile, RESOURCE_MAX)
    }

    pub fn with_value(profile: ResourceProfile, value: f32) -> Self {
        let mut meter = Self {
            value: value.clamp(RESOURCE_MIN, RESOURCE_MAX),
            state: ResourceState::Active,
            profile,
            zero_steps: 0,
        };
        meter.refresh();
        meter
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    #[inline]
    pub fn state(&self) -> ResourceState {
        self.state
    }

    pub fn profile(&self) -> &ResourceProfile {
        &self.profile
    }

    pub fn zero_steps(&self) -> u32 {
        self.zero_steps
    }

    pub fn is_critical(&self) -> bool {
        self.value <= self.profile.critical_threshold
    }

    pub fn is_resting(&self) -> bool {
        self.state == ResourceState::Resting
    }

    pub fn is_collapsed(&self) -> bool {
        self.state == ResourceState::Collapsed
    }

    /// Whether the agent may still spend a move this turn
    ///
    /// Agents at zero keep moving through their grace countdown.
    pub fn can_move(&self) -> bool {
        !matches!(self.state, ResourceState::Collapsed | ResourceState::Resting)
    }

    /// Charge one move
    pub fn spend_move(&mut self) {
        self.adjust(-self.profile.move_cost);
    }

    /// Apply an external loss (capture penalty); collapses immediately at zero
    pub fn drain(&mut self, amount: f32) {
        self.adjust(-amount);
        if self.value <= RESOURCE_MIN && self.profile.collapse_grace.is_some() {
            self.state = ResourceState::Collapsed;
        }
    }

    /// Enter rest; only the structure logic calls this
    pub fn start_rest(&mut self) {
        if self.state != ResourceState::Collapsed {
            self.state = ResourceState::Resting;
            self.zero_steps = 0;
        }
    }

    /// One step of recovery while resting, at the profile's rest gain
    ///
    /// Returns true when this step completed the rest.
    pub fn recover(&mut self) -> bool {
        self.recover_by(self.profile.rest_gain)
    }

    /// One step of recovery at a rate set by the sheltering structure
    pub fn recover_by(&mut self, gain: f32) -> bool {
        if self.state != ResourceState::Resting {
            return false;
        }
        self.value = (self.value + gain).clamp(RESOURCE_MIN, RESOURCE_MAX);
        if self.value >= self.profile.recovered_threshold {
            self.state = ResourceState::Active;
            self.refresh();
            return true;
        }
        false
    }

    /// Advance the collapse countdown at the end of the agent's turn
    ///
    /// Returns true when the agent has just collapsed.
    pub fn end_turn(&mut self) -> bool {
        let Some(grace) = self.profile.collapse_grace else {
            return false;
        };
        match self.state {
            ResourceState::Collapsed => false,
            ResourceState::Resting => {
                self.zero_steps = 0;
                false
            }
            _ if self.value <= RESOURCE_MIN => {
                self.zero_steps += 1;
                if self.zero_steps >= grace {
                    self.state = ResourceState::Collapsed;
                    return true;
                }
                false
            }
            _ => {
                self.zero_steps = 0;
                false
            }
        }
    }

    fn adjust(&mut self, delta: f32) {
        self.value = (self.value + delta).clamp(RESOURCE_MIN, RESOURCE_MAX);
        self.refresh();
    }

    fn refresh(&mut self) {
        if matches!(self.state, ResourceState::Active | ResourceState::Critical) {
            self.state = if self.is_critical() {
                ResourceState::Critical
            } else {
                ResourceState::Active
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hunter() -> ResourceMeter {
        ResourceMeter::new(ResourceProfile::hunter(&HunterConfig::default()))
    }

    fn knight() -> ResourceMeter {
        ResourceMeter::new(ResourceProfile::knight(&KnightConfig::default()))
    }

    #[test]
    fn test_move_cost_and_endurance_discount() {
        let mut m = hunter();
        m.spend_move();
        assert_eq!(m.value(), 98.0);

        let profile = ResourceProfile::hunter(&HunterConfig::default()).with_cost_factor(0.5);
        let mut e = ResourceMeter::new(profile);
        e.spend_move();
        assert_eq!(e.value(), 99.0);
    }

    #[test]
    fn test_critical_transition() {
        let mut m = ResourceMeter::with_value(ResourceProfile::hunter(&HunterConfig::default()), 8.0);
        assert_eq!(m.state(), ResourceState::Active);
        m.spend_move();
        assert_eq!(m.value(), 6.0);
        assert_eq!(m.state(), ResourceState::Critical);
    }

    #[test]
    fn test_values_clamp() {
        let mut m = ResourceMeter::with_value(ResourceProfile::hunter(&HunterConfig::default()), 1.0);
        m.spend_move();
        assert_eq!(m.value(), 0.0);

        let m = ResourceMeter::with_value(ResourceProfile::hunter(&HunterConfig::default()), 150.0);
        assert_eq!(m.value(), 100.0);
    }

    #[test]
    fn test_hunter_rest_until_full() {
        let mut m = ResourceMeter::with_value(ResourceProfile::hunter(&HunterConfig::default()), 97.5);
        m.start_rest();
        assert!(!m.recover());
        assert_eq!(m.value(), 98.5);
        assert!(!m.recover());
        assert!(m.recover());
        assert_eq!(m.value(), 100.0);
        assert_eq!(m.state(), ResourceState::Active);
    }

    #[test]
    fn test_knight_rest_threshold() {
        let mut m = ResourceMeter::with_value(ResourceProfile::knight(&KnightConfig::default()), 15.0);
        assert!(m.is_critical());
        m.start_rest();
        let mut steps = 0;
        while !m.recover() {
            steps += 1;
        }
        assert_eq!(steps, 6);
        assert_eq!(m.value(), 85.0);
        assert_eq!(m.state(), ResourceState::Active);
    }

    #[test]
    fn test_collapse_after_grace() {
        let mut m = ResourceMeter::with_value(ResourceProfile::hunter(&HunterConfig::default()), 0.0);
        assert!(m.can_move());
        assert!(!m.end_turn());
        assert!(!m.end_turn());
        assert!(m.end_turn());
        assert!(m.is_collapsed());
        assert!(!m.can_move());
    }

    #[test]
    fn test_rest_cancels_countdown() {
        let mut m = ResourceMeter::with_value(ResourceProfile::hunter(&HunterConfig::default()), 0.0);
        m.end_turn();
        m.end_turn();
        m.start_rest();
        assert!(!m.end_turn());
        assert_eq!(m.zero_steps(), 0);
        assert!(!m.is_collapsed());
    }

    #[test]
    fn test_knights_never_collapse() {
        let mut m = ResourceMeter::with_value(ResourceProfile::knight(&KnightConfig::default()), 0.0);
        for _ in 0..10 {
            assert!(!m.end_turn());
        }
        m.drain(50.0);
        assert!(!m.is_collapsed());
        assert_eq!(m.value(), 0.0);
    }

    #[test]
    fn test_drain_to_zero_collapses_hunter() {
        let mut m = ResourceMeter::with_value(ResourceProfile::hunter(&HunterConfig::default()), 15.0);
        m.drain(20.0);
        assert!(m.is_collapsed());
        assert_eq!(m.value(), 0.0);
    }
}
