//! Dashboard handlers called directly against a simulated buzzer network.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use buzzhub_api::handlers::{check, game, lights, status, teams};
use buzzhub_api::models::{
    ChangeNameRequest, ConnectedQuery, DeleteTeamRequest, MakeTeamRequest, PointLimitRequest,
    UpdateTeamRequest, WaitQuery,
};
use buzzhub_api::ServerState;
use buzzhub_core::{
    Color, CommandTransport, Commands, ConnectedCache, ProtocolConfig, SimulatedNetwork,
};
use buzzhub_game::{
    pattern, GameConfig, GameState, GameStateMachine, PointLimit, TeamRoster, Verdict,
    WaitOutcome,
};

const LEDS: usize = 24;

async fn create_test_server_state(network: &SimulatedNetwork) -> ServerState {
    let config = ProtocolConfig {
        target_name: "BUZZERS-TEST".to_string(),
        ..Default::default()
    };
    let ttl = config.connected_cache_ttl();
    let transport = Arc::new(CommandTransport::new(Arc::new(network.clone()), config));
    transport.connect().await.unwrap();

    let commands = Commands::new(transport);
    let connected = Arc::new(ConnectedCache::new(commands.clone(), ttl));
    let machine = Arc::new(GameStateMachine::new(
        commands,
        Arc::new(TeamRoster::new(PointLimit::Eight)),
        GameConfig {
            led_count: LEDS,
            ..Default::default()
        },
    ));
    ServerState::new(machine, connected)
}

fn make_request(name: &str) -> Json<MakeTeamRequest> {
    Json(MakeTeamRequest {
        team_name: name.to_string(),
        primary_color: Color::RED,
        secondary_color: Color::WHITE,
    })
}

fn update_request(name: &str) -> UpdateTeamRequest {
    UpdateTeamRequest {
        team_name: name.to_string(),
        associated_buzzers: None,
        point: None,
        primary_color: None,
        secondary_color: None,
    }
}

#[tokio::test(start_paused = true)]
async fn test_make_and_list_teams() {
    let network = SimulatedNetwork::new("BUZZERS-TEST", 2, LEDS);
    let state = create_test_server_state(&network).await;

    let team = teams::make_team_handler(State(state.clone()), make_request("RED"))
        .await
        .unwrap();
    let team = team.0.data.unwrap();
    assert_eq!(team.point_limit, PointLimit::Eight);
    assert!(team.addresses.is_empty());

    let err = teams::make_team_handler(State(state.clone()), make_request("RED"))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::CONFLICT);

    let listed = status::get_teams_handler(State(state)).await.unwrap();
    let listed = listed.0.data.unwrap().teams;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "RED");
}

#[tokio::test(start_paused = true)]
async fn test_point_limit_validation() {
    let network = SimulatedNetwork::new("BUZZERS-TEST", 1, LEDS);
    let state = create_test_server_state(&network).await;
    teams::make_team_handler(State(state.clone()), make_request("RED"))
        .await
        .unwrap();

    let err = teams::set_point_limit_handler(State(state.clone()), Json(PointLimitRequest { limit: 7 }))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);

    let limit = teams::set_point_limit_handler(State(state.clone()), Json(PointLimitRequest { limit: 16 }))
        .await
        .unwrap();
    assert_eq!(limit.0.data, Some(PointLimit::Sixteen));
    assert_eq!(state.roster().get("RED").unwrap().point_limit, PointLimit::Sixteen);
}

#[tokio::test(start_paused = true)]
async fn test_update_team_requires_connected_buzzers() {
    let network = SimulatedNetwork::new("BUZZERS-TEST", 2, LEDS);
    let state = create_test_server_state(&network).await;
    let addresses = network.addresses();
    teams::make_team_handler(State(state.clone()), make_request("RED"))
        .await
        .unwrap();

    network.set_online(&addresses[1], false);

    let mut req = update_request("RED");
    req.associated_buzzers = Some(vec![addresses[1]]);
    let err = teams::update_team_handler(State(state.clone()), Json(req))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);

    let mut req = update_request("RED");
    req.associated_buzzers = Some(vec![addresses[0]]);
    req.point = Some(3);
    req.primary_color = Some(Color::GREEN);
    let team = teams::update_team_handler(State(state.clone()), Json(req))
        .await
        .unwrap();
    let team = team.0.data.unwrap();
    assert_eq!(team.addresses, vec![addresses[0]]);
    assert_eq!(team.point, 3);
    assert_eq!(team.primary_color, Color::GREEN);

    let err = teams::update_team_handler(State(state), Json(update_request("NOPE")))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::NOT_FOUND);
}

#[tokio::test(start_paused = true)]
async fn test_rename_and_delete_team() {
    let network = SimulatedNetwork::new("BUZZERS-TEST", 1, LEDS);
    let state = create_test_server_state(&network).await;
    teams::make_team_handler(State(state.clone()), make_request("RED"))
        .await
        .unwrap();

    teams::change_name_handler(
        State(state.clone()),
        Json(ChangeNameRequest {
            old_name: "RED".to_string(),
            new_name: "CRIMSON".to_string(),
        }),
    )
    .await
    .unwrap();

    let deleted = teams::delete_team_handler(
        State(state.clone()),
        Json(DeleteTeamRequest {
            team_name: "CRIMSON".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(deleted.0.data.unwrap().name, "CRIMSON");
    assert!(state.roster().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_get_connected_lists_answering_buzzers() {
    let network = SimulatedNetwork::new("BUZZERS-TEST", 3, LEDS);
    let state = create_test_server_state(&network).await;

    let response = status::get_connected_handler(
        State(state.clone()),
        Query(ConnectedQuery { no_cache: false }),
    )
    .await
    .unwrap();
    assert_eq!(response.0.data.unwrap().connected, network.addresses());

    network.set_online(&network.addresses()[2], false);
    let response = status::get_connected_handler(
        State(state),
        Query(ConnectedQuery { no_cache: true }),
    )
    .await
    .unwrap();
    assert_eq!(response.0.data.unwrap().connected.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_check_led_nb() {
    let network = SimulatedNetwork::new("BUZZERS-TEST", 2, LEDS);
    let state = create_test_server_state(&network).await;
    let check = check::check_led_nb_handler(State(state)).await.unwrap();
    let check = check.0.data.unwrap();
    assert_eq!(check.expected, LEDS);
    assert_eq!(check.reported, vec![LEDS, LEDS]);

    let network = SimulatedNetwork::new("BUZZERS-TEST", 2, 12);
    let state = create_test_server_state(&network).await;
    let err = check::check_led_nb_handler(State(state)).await.unwrap_err();
    assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test(start_paused = true)]
async fn test_game_round_through_handlers() {
    let network = SimulatedNetwork::new("BUZZERS-TEST", 2, LEDS);
    let state = create_test_server_state(&network).await;
    let address = network.addresses()[0];

    teams::make_team_handler(State(state.clone()), make_request("RED"))
        .await
        .unwrap();
    let mut req = update_request("RED");
    req.associated_buzzers = Some(vec![address]);
    teams::update_team_handler(State(state.clone()), Json(req))
        .await
        .unwrap();

    let waiting = tokio::spawn(game::wait_handler(
        State(state.clone()),
        Query(WaitQuery { block: true }),
    ));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let err = game::wait_handler(State(state.clone()), Query(WaitQuery::default()))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::CONFLICT);

    network.press(&address).await.unwrap();
    let outcome = waiting.await.unwrap().unwrap();
    assert_eq!(
        outcome.0.data.unwrap(),
        Some(WaitOutcome::Team("RED".to_string()))
    );

    let current = status::get_state_handler(State(state.clone())).await.unwrap();
    let current = current.0.data.unwrap();
    assert_eq!(current.state, GameState::Check);
    assert_eq!(current.team_under_review.as_deref(), Some("RED"));

    let verdict = game::confirm_handler(State(state.clone())).await.unwrap();
    assert_eq!(
        verdict.0.data.unwrap(),
        Verdict::Confirmed {
            team: "RED".to_string(),
            point: 1
        }
    );
    assert_eq!(state.machine.state(), GameState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_background_wait_and_idle() {
    let network = SimulatedNetwork::new("BUZZERS-TEST", 1, LEDS);
    let state = create_test_server_state(&network).await;

    let started = game::wait_handler(State(state.clone()), Query(WaitQuery::default()))
        .await
        .unwrap();
    assert_eq!(started.0.data.unwrap(), None);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(state.machine.state(), GameState::Wait);

    let idle = game::idle_handler(State(state.clone())).await.unwrap();
    assert_eq!(idle.0.data.unwrap().state, GameState::Idle);

    let verdict = game::deny_handler(State(state)).await.unwrap();
    assert_eq!(verdict.0.data.unwrap(), Verdict::Ignored);
}

#[tokio::test(start_paused = true)]
async fn test_reset_led_default_and_reset_points() {
    let network = SimulatedNetwork::new("BUZZERS-TEST", 1, LEDS);
    let state = create_test_server_state(&network).await;
    let address = network.addresses()[0];

    teams::make_team_handler(State(state.clone()), make_request("RED"))
        .await
        .unwrap();
    let mut req = update_request("RED");
    req.associated_buzzers = Some(vec![address]);
    req.point = Some(2);
    teams::update_team_handler(State(state.clone()), Json(req))
        .await
        .unwrap();

    lights::reset_led_default_handler(State(state.clone()))
        .await
        .unwrap();
    let red = state.roster().get("RED").unwrap();
    assert_eq!(
        network.leds(&address).unwrap(),
        pattern::render_score(&red, LEDS)
    );

    teams::reset_points_handler(State(state.clone())).await.unwrap();
    assert_eq!(state.roster().get("RED").unwrap().point, 0);
    assert!(network
        .leds(&address)
        .unwrap()
        .colors()
        .iter()
        .all(|c| *c == Color::BLACK));
}
