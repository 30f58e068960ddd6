//! Simulation configuration with documented constants
//!
//! All magic numbers are collected here with explanations of their purpose
//! and how they interact with each other. Decay rates, stamina costs and
//! capture odds live nowhere else.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{EldoriaError, Result};
use crate::core::types::Tick;

/// Configuration for the whole simulation
///
/// Owned by the world context object; there is no global copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub grid: GridConfig,
    pub treasure: TreasureConfig,
    pub hunter: HunterConfig,
    pub knight: KnightConfig,
    pub structures: StructureConfig,
    pub knowledge: KnowledgeConfig,
    pub targeting: TargetingConfig,
    pub interaction: InteractionConfig,
    /// Seed for the ChaCha random source. Two runs with the same seed and the
    /// same entity counts produce identical trajectories.
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreasureConfig {
    /// Initial value of a bronze treasure
    pub bronze_value: f32,
    /// Initial value of a silver treasure
    pub silver_value: f32,
    /// Initial value of a gold treasure
    pub gold_value: f32,

    /// Fraction of a treasure's *initial* value lost every step
    ///
    /// At 0.001 every treasure loses 0.1% of its starting value per step,
    /// so any treasure that is never deposited is gone after 1000 steps
    /// regardless of type.
    pub decay_rate: f32,

    /// A treasure whose value is at or below this is removed in the same step
    pub depletion_threshold: f32,

    /// Share of setup treasures that are bronze (0.0 - 1.0)
    pub bronze_share: f32,
    /// Share of setup treasures that are silver; gold takes the remainder
    pub silver_share: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HunterConfig {
    /// Stamina spent per cell moved
    pub move_cost: f32,
    /// Multiplier on `move_cost` for the endurance skill
    pub endurance_cost_factor: f32,
    /// Stamina recovered per step while resting at a hideout
    pub rest_gain: f32,

    /// At or below this stamina a hunter is critical and heads home
    ///
    /// 6.0 leaves exactly three moves of budget at the default cost, which
    /// together with the collapse grace covers a five-cell trip home.
    pub critical_threshold: f32,

    /// Resting ends once stamina reaches this value
    pub recovered_threshold: f32,

    /// Steps a hunter may spend at zero stamina before collapsing
    pub collapse_grace: u32,

    /// Manhattan radius of a hunter's per-turn scan
    pub scan_radius: i32,
    /// Extra scan radius for the navigation skill
    pub navigation_scan_bonus: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnightConfig {
    /// Energy spent per cell moved
    pub move_cost: f32,
    /// Energy recovered per step while resting in a garrison
    pub rest_gain: f32,
    /// At or below this energy a knight retreats to a garrison
    pub critical_threshold: f32,
    /// Resting ends once energy reaches this value
    pub recovered_threshold: f32,
    /// Euclidean radius within which hunters are detected
    pub detection_radius: f32,

    /// Steps a knight ignores a hunter it has just captured
    ///
    /// Without a cooldown a knight sharing a cell with its victim would
    /// capture it again every step until it collapsed.
    pub capture_cooldown: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    pub hideout_capacity: usize,
    pub garrison_capacity: usize,

    /// Chance per step that an eligible hideout recruits a new hunter
    pub recruit_probability: f64,

    /// Minimum number of distinct skills among residents for recruitment
    pub min_recruit_skills: usize,

    /// Knights a garrison may field (knights calling it home); 0 disables
    /// reinforcement
    pub garrison_max_knights: usize,
    /// Steps between two knights raised by the same garrison
    pub garrison_spawn_cooldown: Tick,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Entries kept per category before oldest-first eviction
    pub capacity: usize,
    /// Entries not re-observed within this many steps are purged
    pub window: Tick,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetingConfig {
    /// Score bonus for a hunter carrying treasure
    pub carrying_weight: f32,
    /// Score per cell of `detection_radius - distance`
    pub proximity_weight: f32,
    /// Score per point of missing stamina
    pub fatigue_weight: f32,
    /// Score bonus for a resting hunter
    pub resting_weight: f32,

    /// Chance a stealth hunter drops out of a single knight evaluation
    pub stealth_evasion: f64,

    /// Upper bound on spatial groups formed from known treasures
    pub max_clusters: usize,

    /// Remembered treasures within this Manhattan range of a remembered
    /// knight are passed over while a safer one is known
    pub knight_avoid_radius: i32,

    /// Wrapped Manhattan range at or under which movers take a greedy step
    /// instead of running a full search
    pub greedy_range: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Stamina lost by a detained hunter
    pub detain_penalty: f32,
    /// Stamina lost by a challenged hunter
    pub challenge_penalty: f32,
    /// Chance of a challenge when the hunter carries nothing
    ///
    /// Hunters caught with treasure are always challenged.
    pub challenge_probability: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            treasure: TreasureConfig::default(),
            hunter: HunterConfig::default(),
            knight: KnightConfig::default(),
            structures: StructureConfig::default(),
            knowledge: KnowledgeConfig::default(),
            targeting: TargetingConfig::default(),
            interaction: InteractionConfig::default(),
            seed: 42,
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { width: 20, height: 20 }
    }
}

impl Default for TreasureConfig {
    fn default() -> Self {
        Self {
            bronze_value: 3.0,
            silver_value: 7.0,
            gold_value: 13.0,
            decay_rate: 0.001,
            depletion_threshold: 0.0,
            bronze_share: 0.5,
            silver_share: 0.3,
        }
    }
}

impl Default for HunterConfig {
    fn default() -> Self {
        Self {
            move_cost: 2.0,
            endurance_cost_factor: 0.5,
            rest_gain: 1.0,
            critical_threshold: 6.0,
            recovered_threshold: 100.0,
            collapse_grace: 3,
            scan_radius: 3,
            navigation_scan_bonus: 1,
        }
    }
}

impl Default for KnightConfig {
    fn default() -> Self {
        Self {
            move_cost: 1.0,
            rest_gain: 10.0,
            critical_threshold: 20.0,
            recovered_threshold: 80.0,
            detection_radius: 3.0,
            capture_cooldown: 5,
        }
    }
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            hideout_capacity: 5,
            garrison_capacity: 4,
            recruit_probability: 0.2,
            min_recruit_skills: 2,
            garrison_max_knights: 3,
            garrison_spawn_cooldown: 10,
        }
    }
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            capacity: 20,
            window: 20,
        }
    }
}

impl Default for TargetingConfig {
    fn default() -> Self {
        Self {
            carrying_weight: 100.0,
            proximity_weight: 10.0,
            fatigue_weight: 0.5,
            resting_weight: 50.0,
            stealth_evasion: 0.5,
            max_clusters: 3,
            knight_avoid_radius: 2,
            greedy_range: 3,
        }
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            detain_penalty: 5.0,
            challenge_penalty: 20.0,
            challenge_probability: 0.5,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config with a different seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Parse a TOML document; missing keys fall back to defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.grid.width <= 0 || self.grid.height <= 0 {
            return Err(EldoriaError::Config(format!(
                "grid must be non-empty, got {}x{}",
                self.grid.width, self.grid.height
            )));
        }

        let t = &self.treasure;
        if t.decay_rate < 0.0 || t.decay_rate > 1.0 {
            return Err(EldoriaError::Config(format!(
                "treasure decay_rate ({}) must be within [0, 1]",
                t.decay_rate
            )));
        }
        if t.bronze_share < 0.0 || t.silver_share < 0.0 || t.bronze_share + t.silver_share > 1.0 {
            return Err(EldoriaError::Config(
                "treasure shares must be non-negative and sum to at most 1".into(),
            ));
        }

        let h = &self.hunter;
        if h.critical_threshold >= h.recovered_threshold {
            return Err(EldoriaError::Config(format!(
                "hunter critical_threshold ({}) should be < recovered_threshold ({})",
                h.critical_threshold, h.recovered_threshold
            )));
        }
        let k = &self.knight;
        if k.critical_threshold >= k.recovered_threshold {
            return Err(EldoriaError::Config(format!(
                "knight critical_threshold ({}) should be < recovered_threshold ({})",
                k.critical_threshold, k.recovered_threshold
            )));
        }
        if h.move_cost < 0.0 || k.move_cost < 0.0 || h.rest_gain <= 0.0 || k.rest_gain <= 0.0 {
            return Err(EldoriaError::Config(
                "move costs must be non-negative and rest gains positive".into(),
            ));
        }

        let s = &self.structures;
        if s.hideout_capacity == 0 || s.garrison_capacity == 0 {
            return Err(EldoriaError::Config("structure capacities must be positive".into()));
        }

        for (name, p) in [
            ("recruit_probability", s.recruit_probability),
            ("stealth_evasion", self.targeting.stealth_evasion),
            ("challenge_probability", self.interaction.challenge_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(EldoriaError::Config(format!("{} ({}) must be within [0, 1]", name, p)));
            }
        }

        if self.knowledge.capacity == 0 {
            return Err(EldoriaError::Config("knowledge capacity must be positive".into()));
        }
        if self.targeting.max_clusters == 0 {
            return Err(EldoriaError::Config("max_clusters must be positive".into()));
        }
        if self.targeting.knight_avoid_radius < 0 {
            return Err(EldoriaError::Config("knight_avoid_radius must be non-negative".into()));
        }

        Ok(())
    }
}
