//! Eldoria - treasure hunters and knights on a toroidal grid
//!
//! Hunters scavenge decaying treasure and carry it back to hideouts while
//! knights patrol from their garrisons and capture the hunters they catch.
//! The whole simulation is single-threaded and deterministic for a given
//! seed.

pub mod core;
pub mod ecs;
pub mod entity;
pub mod simulation;
pub mod spatial;
