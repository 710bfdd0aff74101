//! Game state machine.
//!
//! ```text
//! IDLE --enter_wait--> WAIT --press from a team--> CHECK --confirm/deny--> IDLE
//!                        \--unknown buzzer / enter_idle--> IDLE
//! ```
//!
//! Every transition re-renders the buzzer LEDs. The state lock is never held
//! across a suspension point.

use std::fmt;
use std::sync::Arc;

use buzzhub_core::{Commands, DeviceAddress, LedFrame, PressAggregator};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::error::{GameError, GameResult, RosterError};
use crate::pattern;
use crate::roster::TeamRoster;

/// Game phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GameState {
    /// Scores are shown, nothing in progress
    Idle,
    /// Accepting the next press
    Wait,
    /// A press awaits the judge's verdict
    Check,
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Wait => write!(f, "WAIT"),
            Self::Check => write!(f, "CHECK"),
        }
    }
}

/// Point-in-time view of the machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub state: GameState,
    pub team_under_review: Option<String>,
}

/// How a wait for the next press ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum WaitOutcome {
    /// A team's buzzer won; the machine is in CHECK
    Team(String),
    /// The press came from a buzzer no team owns; back to IDLE
    Unassigned(Option<DeviceAddress>),
    /// The wait was abandoned by another transition
    Cancelled,
}

/// Result of a judge decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Confirmed { team: String, point: u32 },
    Denied { team: String },
    /// Nothing was under review
    Ignored,
}

struct Inner {
    state: GameState,
    /// Roster id of the team in CHECK, so renames do not lose it
    team_under_review: Option<u64>,
}

/// Drives the game from button presses and judge decisions.
pub struct GameStateMachine {
    commands: Commands,
    presses: Arc<PressAggregator>,
    roster: Arc<TeamRoster>,
    config: GameConfig,
    inner: Mutex<Inner>,
    /// Bumped whenever WAIT is left by something other than a press
    cancel_wait: watch::Sender<u64>,
}

impl GameStateMachine {
    pub fn new(commands: Commands, roster: Arc<TeamRoster>, config: GameConfig) -> Self {
        let presses = commands.transport().presses().clone();
        let (cancel_wait, _) = watch::channel(0);
        Self {
            commands,
            presses,
            roster,
            config,
            inner: Mutex::new(Inner {
                state: GameState::Idle,
                team_under_review: None,
            }),
            cancel_wait,
        }
    }

    pub fn state(&self) -> GameState {
        self.inner.lock().state
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let (state, team) = {
            let inner = self.inner.lock();
            (inner.state, inner.team_under_review)
        };
        GameSnapshot {
            state,
            team_under_review: team
                .and_then(|id| self.roster.get_by_id(id))
                .map(|t| t.name),
        }
    }

    pub fn roster(&self) -> &Arc<TeamRoster> {
        &self.roster
    }

    pub fn commands(&self) -> &Commands {
        &self.commands
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Go to IDLE and show every team's score. Abandons a running wait.
    pub async fn enter_idle(&self) -> GameResult<()> {
        self.set_state(GameState::Idle, None);
        debug!("Switching state to IDLE");
        self.render_scores().await
    }

    /// Go to WAIT and suspend until the next press is resolved.
    ///
    /// Clocks are synchronised first so press clocks are comparable.
    pub async fn enter_wait(&self) -> GameResult<WaitOutcome> {
        let mut cancelled = {
            let mut inner = self.inner.lock();
            if inner.state == GameState::Wait {
                return Err(GameError::AlreadyWaiting);
            }
            inner.state = GameState::Wait;
            inner.team_under_review = None;
            self.cancel_wait.subscribe()
        };
        debug!("Switching state to WAIT");

        let outcome = self.wait_for_challenger(&mut cancelled).await;
        if outcome.is_err() && self.state() == GameState::Wait {
            self.set_state(GameState::Idle, None);
        }
        outcome
    }

    async fn wait_for_challenger(
        &self,
        cancelled: &mut watch::Receiver<u64>,
    ) -> GameResult<WaitOutcome> {
        debug!("Performing automatic clock set");
        if !self.commands.auto_sync_clock(None).await? {
            warn!("Clock synchronisation was not acknowledged by the master buzzer");
        }

        if cancelled.has_changed().unwrap_or(true) {
            return Ok(WaitOutcome::Cancelled);
        }
        self.commands
            .set_leds(&pattern::waiting_frame(self.config.led_count), None)
            .await?;

        let press = tokio::select! {
            biased;
            _ = cancelled.changed() => return Ok(WaitOutcome::Cancelled),
            press = self.presses.wait_for_next_press(None) => press?,
        };

        let address = press.reporter();
        let team = address.and_then(|a| self.roster.team_for_address(&a));

        match team {
            Some(team) => {
                info!("Buzzer {} of team {} pressed first", press.field(0).unwrap_or("?"), team.name);
                self.review(team.id).await?;
                Ok(WaitOutcome::Team(team.name))
            }
            None => {
                info!("Press from unassociated buzzer {}", press.field(0).unwrap_or("?"));
                self.enter_idle().await?;
                Ok(WaitOutcome::Unassigned(address))
            }
        }
    }

    /// Put `team` under review: clear every strip, then show the check
    /// pattern on that team's buzzers only.
    pub async fn enter_check(&self, team: &str) -> GameResult<()> {
        let id = self
            .roster
            .get(team)
            .map(|t| t.id)
            .ok_or_else(|| RosterError::TeamNotFound(team.to_string()))?;
        self.review(id).await
    }

    async fn review(&self, team: u64) -> GameResult<()> {
        self.set_state(GameState::Check, Some(team));
        debug!("Switching state to CHECK");
        self.render_check(team).await
    }

    /// Accept the press under review: one point, green flashes, then IDLE.
    pub async fn confirm(&self) -> GameResult<Verdict> {
        let Some(id) = self.take_team_under_review() else {
            self.render_scores().await?;
            return Ok(Verdict::Ignored);
        };

        let Some(team) = self.roster.award_point_by_id(id) else {
            warn!("Cannot confirm press: team under review was deleted");
            self.enter_idle().await?;
            return Ok(Verdict::Ignored);
        };
        info!("Press for team {} confirmed, {} point(s)", team.name, team.point);

        self.flash(&team.addresses, true).await?;
        self.enter_idle().await?;
        Ok(Verdict::Confirmed {
            team: team.name,
            point: team.point,
        })
    }

    /// Reject the press under review: red flashes, then IDLE.
    pub async fn deny(&self) -> GameResult<Verdict> {
        let Some(id) = self.take_team_under_review() else {
            self.render_scores().await?;
            return Ok(Verdict::Ignored);
        };

        let Some(team) = self.roster.get_by_id(id) else {
            warn!("Cannot deny press: team under review was deleted");
            self.enter_idle().await?;
            return Ok(Verdict::Ignored);
        };
        info!("Press for team {} denied", team.name);

        self.flash(&team.addresses, false).await?;
        self.enter_idle().await?;
        Ok(Verdict::Denied { team: team.name })
    }

    /// Re-apply the LED output of the current state.
    pub async fn render_current(&self) -> GameResult<()> {
        let (state, team) = {
            let inner = self.inner.lock();
            (inner.state, inner.team_under_review)
        };
        match (state, team) {
            (GameState::Idle, _) => self.render_scores().await,
            (GameState::Wait, _) => Ok(self
                .commands
                .set_leds(&pattern::waiting_frame(self.config.led_count), None)
                .await?),
            (GameState::Check, Some(team)) => self.render_check(team).await,
            (GameState::Check, None) => Ok(self.commands.clear_leds(None).await?),
        }
    }

    /// Reset every score and turn all LEDs off.
    pub async fn reset_points(&self) -> GameResult<()> {
        self.roster.reset_points();
        Ok(self.commands.clear_leds(None).await?)
    }

    /// Take the team under review if the machine is in CHECK. The state
    /// stays CHECK until the verdict has been shown.
    fn take_team_under_review(&self) -> Option<u64> {
        let mut inner = self.inner.lock();
        let team = inner.team_under_review.take();
        if inner.state == GameState::Check {
            team
        } else {
            None
        }
    }

    fn set_state(&self, state: GameState, team: Option<u64>) {
        let left_wait = {
            let mut inner = self.inner.lock();
            let left_wait = inner.state == GameState::Wait && state != GameState::Wait;
            inner.state = state;
            inner.team_under_review = team;
            left_wait
        };
        if left_wait {
            self.cancel_wait.send_modify(|n| *n = n.wrapping_add(1));
        }
    }

    async fn render_scores(&self) -> GameResult<()> {
        for team in self.roster.list() {
            let frame = pattern::render_score(&team, self.config.led_count);
            for address in &team.addresses {
                self.commands.set_leds(&frame, Some(*address)).await?;
            }
        }
        Ok(())
    }

    async fn render_check(&self, team: u64) -> GameResult<()> {
        self.commands.clear_leds(None).await?;
        let frame = pattern::check_frame(self.config.led_count);
        let addresses = self
            .roster
            .get_by_id(team)
            .map(|t| t.addresses)
            .unwrap_or_default();
        self.show_on(&frame, &addresses).await
    }

    async fn flash(&self, addresses: &[DeviceAddress], confirmed: bool) -> GameResult<()> {
        let frame = pattern::flash_frame(self.config.led_count, confirmed);

        self.commands.clear_leds(None).await?;
        for _ in 0..self.config.flash_count {
            self.show_on(&frame, addresses).await?;
            tokio::time::sleep(self.config.flash_on()).await;
            self.commands.clear_leds(None).await?;
            tokio::time::sleep(self.config.flash_off()).await;
        }
        Ok(())
    }

    async fn show_on(&self, frame: &LedFrame, addresses: &[DeviceAddress]) -> GameResult<()> {
        for address in addresses {
            self.commands.set_leds(frame, Some(*address)).await?;
        }
        Ok(())
    }
}

