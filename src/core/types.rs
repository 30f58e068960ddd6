//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for entities
///
/// Allocated sequentially by the world, so ordering by id is ordering by
/// creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Simulation step counter
pub type Tick = u64;

/// Integer grid cell
///
/// Positions handed out by the grid are always normalized into
/// `[0, width) x [0, height)`; raw positions built by callers are wrapped on
/// entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// How per-axis wrapped deltas are combined into a distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    Euclidean,
    Manhattan,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_ordering() {
        assert!(EntityId(1) < EntityId(2));
        assert_eq!(EntityId::new(7), EntityId(7));
    }

    #[test]
    fn test_position_offset() {
        let p = Position::new(3, 4).offset(-1, 2);
        assert_eq!(p, Position::new(2, 6));
    }

    #[test]
    fn test_position_display() {
        assert_eq!(Position::new(0, 3).to_string(), "(0, 3)");
    }
}
