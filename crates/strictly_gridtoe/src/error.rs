//! Error types for sessions and the session registry.

use crate::SessionId;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

/// Coarse classification reported to clients alongside a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or out-of-range input: bad capacity, bad index, bad intent.
    Validation,
    /// Move rejected by the turn rules: wrong turn, occupied square, game over.
    Turn,
    /// Session unavailable: full or unknown.
    Capacity,
}

/// Error returned by a session operation.
///
/// All variants leave the session untouched.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum SessionError {
    /// The session already has all its participants.
    #[display("Session is full")]
    Full,

    /// The session has reached a terminal status.
    #[display("Game is over")]
    GameOver,

    /// The mover is not the participant whose turn it is.
    #[display("Not your turn")]
    NotYourTurn,

    /// The index is not on the board.
    #[display("Position {index} is off the board (0..{len})")]
    OutOfBounds {
        /// Requested index.
        index: usize,
        /// Number of squares on the board.
        len: usize,
    },

    /// The square already holds a mark.
    #[display("Position {_0} is already occupied")]
    Occupied(#[error(not(source))] usize),
}

impl SessionError {
    /// Returns the rejection class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Full => ErrorKind::Capacity,
            SessionError::GameOver | SessionError::NotYourTurn | SessionError::Occupied(_) => {
                ErrorKind::Turn
            }
            SessionError::OutOfBounds { .. } => ErrorKind::Validation,
        }
    }
}

/// Error returned by the session registry.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum RegistryError {
    /// Requested player count is outside the supported range.
    #[display("Invalid number of players: {requested} (expected {min}-{max})")]
    InvalidCapacity {
        /// Requested capacity.
        requested: usize,
        /// Smallest allowed capacity.
        min: usize,
        /// Largest allowed capacity.
        max: usize,
    },

    /// No session with this id exists.
    #[display("Session {_0} not found")]
    NotFound(#[error(not(source))] SessionId),
}

impl RegistryError {
    /// Returns the rejection class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::InvalidCapacity { .. } => ErrorKind::Validation,
            RegistryError::NotFound(_) => ErrorKind::Capacity,
        }
    }
}
