//! Team administration handlers.

use axum::{extract::State, Json};
use buzzhub_game::{PointLimit, Team, TeamUpdate};
use tracing::info;

use super::common::{done, ok, HandlerResult};
use super::ServerState;
use crate::models::{
    ChangeNameRequest, DeleteTeamRequest, MakeTeamRequest, PointLimitRequest, TeamsResponse,
    UpdateTeamRequest,
};

pub async fn list_teams_handler(State(state): State<ServerState>) -> HandlerResult<TeamsResponse> {
    ok(TeamsResponse {
        teams: state.roster().list(),
    })
}

/// Create a team with no buzzers. It inherits the current point limit.
pub async fn make_team_handler(
    State(state): State<ServerState>,
    Json(req): Json<MakeTeamRequest>,
) -> HandlerResult<Team> {
    let team = state
        .roster()
        .create(&req.team_name, req.primary_color, req.secondary_color)?;
    ok(team)
}

pub async fn set_point_limit_handler(
    State(state): State<ServerState>,
    Json(req): Json<PointLimitRequest>,
) -> HandlerResult<PointLimit> {
    let limit = state.roster().set_point_limit(req.limit)?;
    ok(limit)
}

/// Zero every score and turn the LEDs off.
pub async fn reset_points_handler(State(state): State<ServerState>) -> HandlerResult<()> {
    state.machine.reset_points().await?;
    done()
}

pub async fn delete_team_handler(
    State(state): State<ServerState>,
    Json(req): Json<DeleteTeamRequest>,
) -> HandlerResult<Team> {
    let team = state.roster().delete(&req.team_name)?;
    ok(team)
}

pub async fn change_name_handler(
    State(state): State<ServerState>,
    Json(req): Json<ChangeNameRequest>,
) -> HandlerResult<()> {
    state.roster().rename(&req.old_name, &req.new_name)?;
    done()
}

/// Partial update. Associating buzzers requires them to be connected, so the
/// connected cache is consulted only when addresses are given.
pub async fn update_team_handler(
    State(state): State<ServerState>,
    Json(req): Json<UpdateTeamRequest>,
) -> HandlerResult<Team> {
    let connected = match req.associated_buzzers {
        Some(_) => state.connected.connected(false).await?,
        None => Vec::new(),
    };

    let update = TeamUpdate {
        primary_color: req.primary_color,
        secondary_color: req.secondary_color,
        point: req.point,
        addresses: req.associated_buzzers,
    };
    let team = state.roster().update(&req.team_name, update, &connected)?;
    info!("Team {} updated", team.name);
    ok(team)
}
