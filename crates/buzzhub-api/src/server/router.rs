//! Application router configuration.

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};

use super::types::ServerState;

/// Create the dashboard router.
pub fn create_router_with_state(state: ServerState) -> Router {
    use crate::handlers::{basic, check, game, lights, status, teams};

    Router::new()
        .route("/api/health", get(basic::health_handler))
        .route("/api/health/status", get(basic::health_status_handler))
        // Status
        .route("/api/status/get_connected", get(status::get_connected_handler))
        .route("/api/status/get_state", get(status::get_state_handler))
        .route("/api/status/get_teams", get(status::get_teams_handler))
        // Teams
        .route("/api/teams/get", get(teams::list_teams_handler))
        .route("/api/teams/make", post(teams::make_team_handler))
        .route("/api/teams/set_point_limit", patch(teams::set_point_limit_handler))
        .route("/api/teams/reset_points", patch(teams::reset_points_handler))
        .route("/api/teams/delete", delete(teams::delete_team_handler))
        .route("/api/teams/change_name", patch(teams::change_name_handler))
        .route("/api/teams/update", patch(teams::update_team_handler))
        // Game
        .route("/api/state/idle", post(game::idle_handler))
        .route("/api/state/wait", post(game::wait_handler))
        .route("/api/state/confirm", post(game::confirm_handler))
        .route("/api/state/deny", post(game::deny_handler))
        // Lights and checks
        .route("/api/lights/reset_led_default", put(lights::reset_led_default_handler))
        .route("/api/check/led_nb", get(check::check_led_nb_handler))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(state)
}
