//! LED handlers.

use axum::extract::State;

use super::common::{done, HandlerResult};
use super::ServerState;

/// Re-apply the LED output of the current game state.
pub async fn reset_led_default_handler(State(state): State<ServerState>) -> HandlerResult<()> {
    state.machine.render_current().await?;
    done()
}
