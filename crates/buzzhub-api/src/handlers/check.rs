//! Hardware consistency checks.

use axum::extract::State;
use buzzhub_core::LedCountCheck;
use tracing::warn;

use super::common::{ok, HandlerResult};
use super::ServerState;
use crate::models::ErrorResponse;

/// Ask every buzzer for its LED count and compare it with the configured
/// one. Any mismatch is a 500.
pub async fn check_led_nb_handler(State(state): State<ServerState>) -> HandlerResult<LedCountCheck> {
    let expected = state.machine.config().led_count;
    let check = state.machine.commands().check_led_count(expected).await?;

    if !check.is_consistent() {
        warn!(
            "LED count mismatch: expected {}, reported {:?}",
            check.expected, check.reported
        );
        return Err(ErrorResponse::internal(format!(
            "One of the buzzers does not have the correct number of LEDs (expected {}, reported {:?})",
            check.expected, check.reported
        )));
    }

    ok(check)
}
