//! The world context object
//!
//! Owns the grid, the flat entity table and the random source; every system
//! receives it explicitly.

pub mod world;

pub use world::World;
