//! Quiz game logic on top of the buzzer protocol engine.

pub mod config;
pub mod error;
pub mod pattern;
pub mod roster;
pub mod state;
pub mod team;

pub use config::GameConfig;
pub use error::{GameError, GameResult, RosterError, RosterResult};
pub use roster::{TeamRoster, TeamUpdate};
pub use state::{GameSnapshot, GameState, GameStateMachine, Verdict, WaitOutcome};
pub use team::{PointLimit, Team};
