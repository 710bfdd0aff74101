//! Server state shared across all handlers.

use std::sync::Arc;

use buzzhub_core::{CommandTransport, ConnectedCache};
use buzzhub_game::{GameStateMachine, TeamRoster};

/// Server state shared across all handlers.
#[derive(Clone)]
pub struct ServerState {
    /// Game state machine, owning the roster and the command façade.
    pub machine: Arc<GameStateMachine>,
    /// Connected-buzzer cache.
    pub connected: Arc<ConnectedCache>,
    /// Server start time (unix seconds).
    pub started_at: i64,
}

impl ServerState {
    pub fn new(machine: Arc<GameStateMachine>, connected: Arc<ConnectedCache>) -> Self {
        Self {
            machine,
            connected,
            started_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn roster(&self) -> &Arc<TeamRoster> {
        self.machine.roster()
    }

    pub fn transport(&self) -> &Arc<CommandTransport> {
        self.machine.commands().transport()
    }
}
