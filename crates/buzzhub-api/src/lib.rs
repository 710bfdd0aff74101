//! HTTP dashboard API for the buzzer quiz game.
//!
//! Handlers are thin: every operation delegates to the game state machine,
//! the team roster or the command façade.

pub mod handlers;
pub mod models;
pub mod server;

pub use models::{ApiResponse, ErrorResponse};
pub use server::{create_router_with_state, run, ServerState};
