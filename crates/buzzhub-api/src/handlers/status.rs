//! Read-only status handlers.

use axum::extract::{Query, State};

use super::common::{ok, HandlerResult};
use super::ServerState;
use crate::models::{ConnectedQuery, ConnectedResponse, StateResponse, TeamsResponse};

/// Buzzers answering a broadcast ping. Empty while the link is down.
pub async fn get_connected_handler(
    State(state): State<ServerState>,
    Query(query): Query<ConnectedQuery>,
) -> HandlerResult<ConnectedResponse> {
    if !state.transport().is_connected() {
        return ok(ConnectedResponse { connected: Vec::new() });
    }

    let connected = state.connected.connected(query.no_cache).await?;
    ok(ConnectedResponse { connected })
}

pub async fn get_state_handler(State(state): State<ServerState>) -> HandlerResult<StateResponse> {
    let snapshot = state.machine.snapshot();
    ok(StateResponse {
        state: snapshot.state,
        team_under_review: snapshot.team_under_review,
    })
}

pub async fn get_teams_handler(State(state): State<ServerState>) -> HandlerResult<TeamsResponse> {
    ok(TeamsResponse {
        teams: state.roster().list(),
    })
}
