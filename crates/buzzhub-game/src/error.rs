//! Game error types.

use buzzhub_core::{DeviceAddress, LinkError, PressError};
use thiserror::Error;

/// Result type for state machine operations.
pub type GameResult<T> = Result<T, GameError>;

/// Result type for roster operations.
pub type RosterResult<T> = Result<T, RosterError>;

/// Team roster administration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("Team {0} already exists")]
    TeamExists(String),

    #[error("Team {0} does not exist")]
    TeamNotFound(String),

    #[error("Buzzer {address} is already associated to team {team}")]
    AddressTaken { address: DeviceAddress, team: String },

    #[error("Buzzer {0} is not connected")]
    NotConnected(DeviceAddress),

    #[error("Valid limits are 5, 8, 10 or 16, got {0}")]
    InvalidPointLimit(u32),

    #[error("Point must be an integer from 0 to point_limit ({limit}), got {point}")]
    InvalidPoint { point: u32, limit: u32 },

    #[error("Team name must not be empty")]
    EmptyName,
}

/// State machine errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// A wait for the next press is already running
    #[error("Already waiting for a button press")]
    AlreadyWaiting,

    #[error(transparent)]
    Roster(#[from] RosterError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Press(#[from] PressError),
}
