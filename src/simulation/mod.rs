//! Simulation systems: perception, targeting, interaction and the step pipeline

pub mod driver;
pub mod hunter_turn;
pub mod interaction;
pub mod knight_turn;
pub mod movement;
pub mod perception;
pub mod population;
pub mod stats;
pub mod targeting;
pub mod tick;

pub use driver::Simulation;
pub use interaction::{CaptureOutcome, CapturePredictor, FixedOutcome, HeuristicPredictor};
pub use population::EntityCounts;
pub use stats::{AgentStatus, SimulationStatistics, WorldSnapshot};
pub use targeting::{KMeansGrouping, SpatialGrouping};
pub use tick::{run_simulation_tick, SimulationEvent, HUNTERS_ELIMINATED, TREASURE_DEPLETED};
