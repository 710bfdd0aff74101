//! Command transport.
//!
//! Owns the single link to the gateway device, frames outbound commands and
//! routes inbound packets into the correlation store and the press
//! aggregator. Reconnection is left to the caller: a disconnect is published
//! on the status channel and every later send fails with
//! [`LinkError::NotConnected`].

use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::address::DeviceAddress;
use crate::config::ProtocolConfig;
use crate::error::{LinkError, LinkResult};
use crate::link::{ConnectionStatus, LinkConnector, LinkEvent, LinkHandle};
use crate::packet::{CommandName, InboundPacket, OutboundCommand};
use crate::press::PressAggregator;
use crate::store::CorrelationStore;

/// Capacity of the inbound event channel.
const INBOUND_CAPACITY: usize = 256;

/// Framing and demultiplexing layer over one link.
pub struct CommandTransport {
    config: ProtocolConfig,
    connector: Arc<dyn LinkConnector>,
    store: Arc<CorrelationStore>,
    presses: Arc<PressAggregator>,
    link: RwLock<Option<Arc<dyn LinkHandle>>>,
    /// Next command id to hand out
    next_id: tokio::sync::Mutex<u8>,
    status: watch::Sender<ConnectionStatus>,
    drain: Mutex<Option<JoinHandle<()>>>,
}

impl CommandTransport {
    /// Create a disconnected transport.
    pub fn new(connector: Arc<dyn LinkConnector>, config: ProtocolConfig) -> Self {
        let store = Arc::new(CorrelationStore::new(config.correlation_horizon()));
        let presses = Arc::new(PressAggregator::new(store.clone(), config.debounce()));
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);

        Self {
            config,
            connector,
            store,
            presses,
            link: RwLock::new(None),
            next_id: tokio::sync::Mutex::new(0),
            status,
            drain: Mutex::new(None),
        }
    }

    /// Discover the configured target and connect to it.
    ///
    /// The link only becomes visible to senders once it is fully set up;
    /// on failure the transport stays disconnected.
    pub async fn connect(self: &Arc<Self>) -> LinkResult<()> {
        self.status.send_replace(ConnectionStatus::Connecting);

        match self.try_connect().await {
            Ok(()) => {
                info!("Buzzer gateway connected");
                Ok(())
            }
            Err(e) => {
                self.status.send_replace(ConnectionStatus::Disconnected);
                error!("Couldn't connect to buzzer gateway: {}", e);
                Err(e)
            }
        }
    }

    async fn try_connect(self: &Arc<Self>) -> LinkResult<()> {
        info!("Discovering buzzer gateways...");
        let peers = self
            .connector
            .discover(self.config.discovery_timeout())
            .await?;

        for peer in &peers {
            debug!("Discovered device: {} - {}", peer.name, peer.address);
        }

        let target = peers
            .into_iter()
            .rev()
            .find(|p| p.name == self.config.target_name)
            .ok_or_else(|| LinkError::TargetNotFound(self.config.target_name.clone()))?;

        info!("Connecting to {} ({})...", target.name, target.address);

        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
        let handle = self.connector.open(&target, tx).await?;
        if !handle.is_connected() {
            return Err(LinkError::Connection(format!(
                "{} did not stay connected",
                target.address
            )));
        }

        // Publish before draining, so an early disconnect tears down this
        // link rather than being overwritten by it
        *self.link.write() = Some(handle);
        self.status.send_replace(ConnectionStatus::Connected);

        let drain = tokio::spawn(drain_inbound(Arc::downgrade(self), rx));
        if let Some(previous) = self.drain.lock().replace(drain) {
            previous.abort();
        }

        Ok(())
    }

    /// Frame and write a command. Returns the command id without waiting
    /// for any reply. `None` targets every device.
    pub async fn send(
        &self,
        name: CommandName,
        args: &[u8],
        target: Option<DeviceAddress>,
    ) -> LinkResult<u8> {
        let link = self.link.read().clone().ok_or(LinkError::NotConnected)?;

        let command_id = {
            let mut next = self.next_id.lock().await;
            let id = *next;
            *next = next.wrapping_add(1);
            id
        };

        let command = OutboundCommand {
            command_name: name.as_str().to_string(),
            args: args.to_vec(),
            target: DeviceAddress::or_broadcast(target),
            command_id,
        };

        debug!(
            "SEND: To {} command {} (id {}) with {} arg bytes",
            command.target,
            name,
            command_id,
            args.len()
        );

        link.write(&command.encode()).await?;
        Ok(command_id)
    }

    /// Handle one frame received from the link.
    pub fn on_receive(&self, raw: &[u8], received_at: DateTime<Utc>) {
        let mut packet = match InboundPacket::parse(raw) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("Dropping inbound frame: {}", e);
                return;
            }
        };
        packet.received_at = received_at;

        let is_press = packet.is(CommandName::ButtonPress);
        debug!("Added {} into pool", packet);
        self.store.insert(packet);

        if is_press {
            self.presses.notify();
        }
    }

    /// Drop the link after the peer went away.
    pub fn on_disconnect(&self) {
        if self.link.write().take().is_some() {
            error!("Buzzer gateway disconnected");
        }
        self.status.send_replace(ConnectionStatus::Disconnected);
    }

    /// Current connection state.
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Whether a link is installed and usable.
    pub fn is_connected(&self) -> bool {
        self.link
            .read()
            .as_ref()
            .is_some_and(|link| link.is_connected())
    }

    /// Follow connection state changes.
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// Received packet store.
    pub fn store(&self) -> &Arc<CorrelationStore> {
        &self.store
    }

    /// Press aggregator fed by this transport.
    pub fn presses(&self) -> &Arc<PressAggregator> {
        &self.presses
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }
}

impl Drop for CommandTransport {
    fn drop(&mut self) {
        if let Some(drain) = self.drain.get_mut().take() {
            drain.abort();
        }
    }
}

async fn drain_inbound(transport: Weak<CommandTransport>, mut rx: mpsc::Receiver<LinkEvent>) {
    while let Some(event) = rx.recv().await {
        let Some(transport) = transport.upgrade() else {
            return;
        };
        match event {
            LinkEvent::Frame { bytes, received_at } => transport.on_receive(&bytes, received_at),
            LinkEvent::Disconnected => {
                transport.on_disconnect();
                return;
            }
        }
    }

    // The backend dropped its sender without saying goodbye
    if let Some(transport) = transport.upgrade() {
        transport.on_disconnect();
    }
}
