//! Game state transitions driven by the judge.

use axum::extract::{Query, State};
use buzzhub_game::{GameState, Verdict, WaitOutcome};
use tracing::warn;

use super::common::{ok, HandlerResult};
use super::ServerState;
use crate::models::{ErrorResponse, StateResponse, WaitQuery};

fn current(state: &ServerState) -> StateResponse {
    let snapshot = state.machine.snapshot();
    StateResponse {
        state: snapshot.state,
        team_under_review: snapshot.team_under_review,
    }
}

/// Show the scores. Abandons a running wait.
pub async fn idle_handler(State(state): State<ServerState>) -> HandlerResult<StateResponse> {
    state.machine.enter_idle().await?;
    ok(current(&state))
}

/// Start waiting for the next press.
///
/// By default the wait runs in the background and the handler returns
/// immediately; `?block=true` holds the request until the press is resolved.
pub async fn wait_handler(
    State(state): State<ServerState>,
    Query(query): Query<WaitQuery>,
) -> HandlerResult<Option<WaitOutcome>> {
    if state.machine.state() == GameState::Wait {
        return Err(ErrorResponse::conflict("Already waiting for a button press"));
    }

    if query.block {
        let outcome = state.machine.enter_wait().await?;
        return ok(Some(outcome));
    }

    let machine = state.machine.clone();
    tokio::spawn(async move {
        if let Err(e) = machine.enter_wait().await {
            warn!("Waiting for a press failed: {}", e);
        }
    });
    ok(None)
}

pub async fn confirm_handler(State(state): State<ServerState>) -> HandlerResult<Verdict> {
    let verdict = state.machine.confirm().await?;
    ok(verdict)
}

pub async fn deny_handler(State(state): State<ServerState>) -> HandlerResult<Verdict> {
    let verdict = state.machine.deny().await?;
    ok(verdict)
}
