pub mod config;
pub mod error;
pub mod types;

pub use config::SimulationConfig;
pub use error::{EldoriaError, Result};
pub use types::{EntityId, Metric, Position, Tick};
