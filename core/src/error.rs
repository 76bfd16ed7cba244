//! Error taxonomy shared by the orchestration systems.
//!
//! None of these conditions is fatal. Room errors abort a single operation
//! without touching prior state, anchor errors degrade placement and spawn
//! errors skip a single unit while its batch continues.

use thiserror::Error;

use crate::RoomKind;

/// Reasons a room operation was aborted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum RoomError {
    /// The template provider has no template of the requested kind.
    #[error("no {kind:?} room template is available")]
    MissingTemplate {
        /// Kind of room that was requested.
        kind: RoomKind,
    },
}

/// Reasons a named anchor could not be resolved.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Error)]
pub enum AnchorError {
    /// Neither an exact nor a case-insensitive substring match exists.
    #[error("anchor `{name}` matched neither exactly nor by substring")]
    MissingAnchor {
        /// Name that was looked up.
        name: String,
    },
}

/// Reasons a single spawn unit was skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum SpawnError {
    /// No catalog entry is available at the requested difficulty.
    #[error("no encounter template is available at difficulty {difficulty}")]
    MissingTemplate {
        /// Difficulty the unit was requested at.
        difficulty: u32,
    },
    /// No predefined point and no random candidate passed the validity checks.
    #[error("no valid spawn position found after {attempts} random attempts")]
    SpawnPositionUnresolved {
        /// Number of random candidates that were tested.
        attempts: u32,
    },
}

/// Reasons a configuration was rejected during validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum ConfigError {
    /// The active room window must hold at least one room.
    #[error("max_active_rooms must be at least 1")]
    ZeroActiveRooms,
    /// At least one wave must be allowed to run at a time.
    #[error("max_concurrent_waves must be at least 1")]
    ZeroConcurrentWaves,
    /// A numeric field is negative or not finite.
    #[error("`{field}` must be a finite, non-negative number")]
    InvalidValue {
        /// Name of the offending field.
        field: &'static str,
    },
}

impl ConfigError {
    /// Checks that `value` is finite and non-negative.
    pub fn check_non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(ConfigError::InvalidValue { field })
        }
    }
}
