//! Spatial model: wraparound occupancy grid and path search

pub mod pathfinding;
pub mod torus;

pub use pathfinding::{find_path, greedy_steps, next_step};
pub use torus::{NeighborKind, Occupancy, ToroidalGrid};
