//! Error types for arena construction and reconfiguration.

use thiserror::Error;

/// Failures surfaced to the caller. Anything else inside a tick is either a
/// normal game outcome (an agent dying, a path not found) or a broken
/// invariant that panics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArenaError {
    /// Configuration the arena refuses to start with
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No free spawn cell was left for an agent
    #[error("No free cell to place agent {0}")]
    NoFreeCell(u32),
}

/// Result type alias for arena operations.
pub type Result<T> = std::result::Result<T, ArenaError>;
