use thiserror::Error;

use crate::core::types::{EntityId, Position};

#[derive(Error, Debug)]
pub enum EldoriaError {
    #[error("Invalid placement at {position}: {reason}")]
    InvalidPlacement { position: Position, reason: String },

    #[error("Structure {structure:?} is full (capacity {capacity})")]
    CapacityExceeded { structure: EntityId, capacity: usize },

    #[error("Entity not found: {0:?}")]
    EntityNotFound(EntityId),

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EldoriaError>;
