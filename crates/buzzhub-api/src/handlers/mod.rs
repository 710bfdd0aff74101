//! API handlers organized by domain.

pub mod basic;
pub mod check;
pub mod common;
pub mod game;
pub mod lights;
pub mod status;
pub mod teams;

pub use crate::server::ServerState;

pub use basic::health_handler;
pub use common::{ok, HandlerResult};
