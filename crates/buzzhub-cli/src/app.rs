//! Wiring of the protocol engine, the game and the dashboard.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use buzzhub_api::ServerState;
use buzzhub_core::{
    CommandTransport, Commands, ConnectedCache, ConnectionStatus, SimulatedNetwork,
};
use buzzhub_game::{GameStateMachine, PointLimit, TeamRoster};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::AppConfig;

/// Every long-lived component of a running host.
pub struct App {
    pub network: SimulatedNetwork,
    pub transport: Arc<CommandTransport>,
    pub commands: Commands,
    pub machine: Arc<GameStateMachine>,
    pub connected: Arc<ConnectedCache>,
}

impl App {
    /// Build the stack and connect to the gateway.
    pub async fn start(config: &AppConfig) -> Result<Self> {
        let network = SimulatedNetwork::new(
            config.protocol.target_name.clone(),
            config.simulator.buzzers,
            config.simulated_led_count(),
        );

        let transport = Arc::new(CommandTransport::new(
            Arc::new(network.clone()),
            config.protocol.clone(),
        ));
        transport
            .connect()
            .await
            .with_context(|| format!("Failed to connect to {}", config.protocol.target_name))?;
        info!("Connected to {}", config.protocol.target_name);

        let limit = PointLimit::try_from(config.game.default_point_limit)
            .context("Invalid game.default_point_limit")?;
        let commands = Commands::new(transport.clone());
        let connected = Arc::new(ConnectedCache::new(
            commands.clone(),
            config.protocol.connected_cache_ttl(),
        ));
        let machine = Arc::new(GameStateMachine::new(
            commands.clone(),
            Arc::new(TeamRoster::new(limit)),
            config.game.clone(),
        ));

        Ok(Self {
            network,
            transport,
            commands,
            machine,
            connected,
        })
    }

    pub fn server_state(&self) -> ServerState {
        ServerState::new(self.machine.clone(), self.connected.clone())
    }

    /// Resolve once the link reports a disconnect.
    pub async fn link_lost(&self) {
        let mut status = self.transport.subscribe_status();
        if status
            .wait_for(|s| *s == ConnectionStatus::Disconnected)
            .await
            .is_err()
        {
            warn!("Link status channel closed");
        }
    }

    /// Press the simulated buzzers one after the other every `interval`.
    pub fn spawn_presser(&self, interval: Duration) -> JoinHandle<()> {
        let network = self.network.clone();
        tokio::spawn(async move {
            let addresses = network.addresses();
            for address in addresses.iter().cycle() {
                tokio::time::sleep(interval).await;
                debug!("Simulated press on {}", address);
                if let Err(e) = network.press(address).await {
                    warn!("Simulated press failed: {}", e);
                    return;
                }
            }
        })
    }
}
