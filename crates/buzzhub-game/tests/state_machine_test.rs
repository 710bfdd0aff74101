//! Game state machine driven through the simulated buzzer network.

use std::sync::Arc;
use std::time::Duration;

use buzzhub_core::{
    Color, CommandName, CommandTransport, Commands, DeviceAddress, LedFrame, ProtocolConfig,
    SimulatedNetwork,
};
use buzzhub_game::{
    pattern, GameConfig, GameError, GameState, GameStateMachine, PointLimit, TeamRoster,
    TeamUpdate, Verdict, WaitOutcome,
};
use tokio::task::JoinHandle;
use tokio::time::Instant;

const LEDS: usize = 24;

struct TestContext {
    network: SimulatedNetwork,
    machine: Arc<GameStateMachine>,
    red: DeviceAddress,
    blue: DeviceAddress,
    stranger: DeviceAddress,
}

impl TestContext {
    async fn new() -> Self {
        let network = SimulatedNetwork::new("BUZZERS-TEST", 3, LEDS);
        let config = ProtocolConfig {
            target_name: "BUZZERS-TEST".to_string(),
            ..Default::default()
        };
        let transport = Arc::new(CommandTransport::new(Arc::new(network.clone()), config));
        transport.connect().await.unwrap();

        let addresses = network.addresses();
        let (red, blue, stranger) = (addresses[0], addresses[1], addresses[2]);

        let roster = Arc::new(TeamRoster::new(PointLimit::Eight));
        roster.create("RED", Color::RED, Color::WHITE).unwrap();
        roster.create("BLUE", Color::new(0, 0, 255), Color::WHITE).unwrap();
        for (name, address) in [("RED", red), ("BLUE", blue)] {
            let update = TeamUpdate {
                addresses: Some(vec![address]),
                ..Default::default()
            };
            roster.update(name, update, &addresses).unwrap();
        }

        let machine = Arc::new(GameStateMachine::new(
            Commands::new(transport),
            roster,
            GameConfig {
                led_count: LEDS,
                ..Default::default()
            },
        ));

        Self {
            network,
            machine,
            red,
            blue,
            stranger,
        }
    }

    /// Start waiting and let the machine reach its press wait.
    async fn start_wait(&self) -> JoinHandle<Result<WaitOutcome, GameError>> {
        let machine = self.machine.clone();
        let handle = tokio::spawn(async move { machine.enter_wait().await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle
    }

    async fn challenge(&self, address: DeviceAddress) -> WaitOutcome {
        let handle = self.start_wait().await;
        assert_eq!(self.machine.state(), GameState::Wait);
        self.network.press(&address).await.unwrap();
        handle.await.unwrap().unwrap()
    }

    fn sled_writes(&self, target: DeviceAddress, frame: &LedFrame) -> usize {
        self.network
            .written_with(CommandName::SetLeds)
            .iter()
            .filter(|c| c.target == target && c.args == frame.to_bytes())
            .count()
    }
}

#[tokio::test(start_paused = true)]
async fn test_wait_shows_white_and_syncs_clocks() {
    let ctx = TestContext::new().await;
    let _handle = ctx.start_wait().await;

    assert_eq!(ctx.network.written_with(CommandName::AutoSyncClock).len(), 1);
    assert_eq!(
        ctx.network.leds(&ctx.stranger).unwrap(),
        pattern::waiting_frame(LEDS)
    );
}

#[tokio::test(start_paused = true)]
async fn test_press_moves_owning_team_to_check() {
    let ctx = TestContext::new().await;

    let outcome = ctx.challenge(ctx.red).await;
    assert_eq!(outcome, WaitOutcome::Team("RED".to_string()));

    let snapshot = ctx.machine.snapshot();
    assert_eq!(snapshot.state, GameState::Check);
    assert_eq!(snapshot.team_under_review.as_deref(), Some("RED"));

    assert_eq!(ctx.network.leds(&ctx.red).unwrap(), pattern::check_frame(LEDS));
    assert_eq!(ctx.network.leds(&ctx.blue).unwrap(), LedFrame::new(LEDS));
}

#[tokio::test(start_paused = true)]
async fn test_confirm_awards_one_point_and_returns_to_idle() {
    let ctx = TestContext::new().await;
    ctx.challenge(ctx.red).await;

    let start = Instant::now();
    let verdict = ctx.machine.confirm().await.unwrap();
    assert_eq!(
        verdict,
        Verdict::Confirmed {
            team: "RED".to_string(),
            point: 1
        }
    );
    assert!(start.elapsed() >= Duration::from_millis(2500));

    assert_eq!(ctx.machine.state(), GameState::Idle);
    assert_eq!(ctx.machine.snapshot().team_under_review, None);

    let red = ctx.machine.roster().get("RED").unwrap();
    assert_eq!(red.point, 1);
    assert_eq!(ctx.machine.roster().get("BLUE").unwrap().point, 0);

    assert_eq!(ctx.sled_writes(ctx.red, &pattern::flash_frame(LEDS, true)), 5);
    assert_eq!(
        ctx.network.leds(&ctx.red).unwrap(),
        pattern::render_score(&red, LEDS)
    );
}

#[tokio::test(start_paused = true)]
async fn test_deny_flashes_red_without_scoring() {
    let ctx = TestContext::new().await;
    ctx.challenge(ctx.blue).await;

    let verdict = ctx.machine.deny().await.unwrap();
    assert_eq!(
        verdict,
        Verdict::Denied {
            team: "BLUE".to_string()
        }
    );
    assert_eq!(ctx.machine.state(), GameState::Idle);
    assert_eq!(ctx.machine.roster().get("BLUE").unwrap().point, 0);
    assert_eq!(ctx.sled_writes(ctx.blue, &pattern::flash_frame(LEDS, false)), 5);
    assert_eq!(ctx.sled_writes(ctx.red, &pattern::flash_frame(LEDS, false)), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unassigned_press_returns_to_idle() {
    let ctx = TestContext::new().await;

    let outcome = ctx.challenge(ctx.stranger).await;
    assert_eq!(outcome, WaitOutcome::Unassigned(Some(ctx.stranger)));
    assert_eq!(ctx.machine.state(), GameState::Idle);
    assert_eq!(ctx.machine.snapshot().team_under_review, None);
}

#[tokio::test(start_paused = true)]
async fn test_confirm_while_waiting_is_a_no_op() {
    let ctx = TestContext::new().await;
    let handle = ctx.start_wait().await;
    ctx.network.clear_written();

    assert_eq!(ctx.machine.confirm().await.unwrap(), Verdict::Ignored);
    assert_eq!(ctx.machine.state(), GameState::Wait);
    assert!(ctx.machine.roster().list().iter().all(|t| t.point == 0));

    // Score LEDs were re-rendered for every team
    let red = ctx.machine.roster().get("RED").unwrap();
    assert_eq!(ctx.sled_writes(ctx.red, &pattern::render_score(&red, LEDS)), 1);

    ctx.machine.enter_idle().await.unwrap();
    assert_eq!(handle.await.unwrap().unwrap(), WaitOutcome::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_second_wait_is_rejected() {
    let ctx = TestContext::new().await;
    let _handle = ctx.start_wait().await;

    let err = ctx.machine.enter_wait().await.unwrap_err();
    assert!(matches!(err, GameError::AlreadyWaiting));
}

#[tokio::test(start_paused = true)]
async fn test_render_current_reapplies_check_pattern() {
    let ctx = TestContext::new().await;
    ctx.challenge(ctx.red).await;

    ctx.machine.commands().clear_leds(None).await.unwrap();
    ctx.machine.render_current().await.unwrap();
    assert_eq!(ctx.network.leds(&ctx.red).unwrap(), pattern::check_frame(LEDS));
}

#[tokio::test(start_paused = true)]
async fn test_reset_points_clears_scores_and_leds() {
    let ctx = TestContext::new().await;
    ctx.challenge(ctx.red).await;
    ctx.machine.confirm().await.unwrap();

    ctx.machine.reset_points().await.unwrap();
    assert_eq!(ctx.machine.roster().get("RED").unwrap().point, 0);
    assert_eq!(ctx.network.leds(&ctx.red).unwrap(), LedFrame::new(LEDS));
}

#[tokio::test(start_paused = true)]
async fn test_rename_during_check_keeps_the_team_under_review() {
    let ctx = TestContext::new().await;
    ctx.challenge(ctx.red).await;

    ctx.machine.roster().rename("RED", "CRIMSON").unwrap();
    assert_eq!(
        ctx.machine.snapshot().team_under_review.as_deref(),
        Some("CRIMSON")
    );

    let verdict = ctx.machine.confirm().await.unwrap();
    assert_eq!(
        verdict,
        Verdict::Confirmed {
            team: "CRIMSON".to_string(),
            point: 1
        }
    );
    assert_eq!(ctx.machine.roster().get("CRIMSON").unwrap().point, 1);
    assert_eq!(ctx.sled_writes(ctx.red, &pattern::flash_frame(LEDS, true)), 5);
}

#[tokio::test(start_paused = true)]
async fn test_deny_after_team_deleted_is_ignored() {
    let ctx = TestContext::new().await;
    ctx.challenge(ctx.blue).await;

    ctx.machine.roster().delete("BLUE").unwrap();
    assert_eq!(ctx.machine.snapshot().team_under_review, None);

    assert_eq!(ctx.machine.deny().await.unwrap(), Verdict::Ignored);
    assert_eq!(ctx.machine.state(), GameState::Idle);
}
