//! In-process buzzer network.
//!
//! Emulates the gateway firmware and a set of buzzers behind it, so the
//! engine can run without radio hardware. The first buzzer is the elected
//! clock master.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::address::DeviceAddress;
use crate::error::{LinkError, LinkResult};
use crate::led::LedFrame;
use crate::link::{DiscoveredLink, LinkConnector, LinkEvent, LinkHandle};
use crate::packet::{CommandName, OutboundCommand};

/// Copies of each press report, as sent by the firmware.
const PRESS_REPEAT: usize = 3;

/// Zero bytes appended to each reply, as the radio link pads frames.
const REPLY_PADDING: usize = 4;

/// Most recent host commands kept for inspection.
const WRITE_LOG_CAPACITY: usize = 1024;

/// Address the simulated gateway advertises.
const GATEWAY_ADDRESS: &str = "SIM:GATEWAY";

/// State of one emulated buzzer.
#[derive(Debug, Clone)]
pub struct VirtualBuzzer {
    pub address: DeviceAddress,
    pub is_master: bool,
    pub leds: LedFrame,
    /// Whether the buzzer answers commands
    pub online: bool,
    /// `None` until the clock has been set
    clock_offset: Option<i64>,
    press_id: u8,
}

impl VirtualBuzzer {
    fn clock(&self, now_ms: i64) -> i64 {
        self.clock_offset.map_or(i64::MAX, |offset| now_ms - offset)
    }
}

struct NetworkInner {
    gateway_name: String,
    led_count: usize,
    order: Vec<DeviceAddress>,
    buzzers: DashMap<DeviceAddress, VirtualBuzzer>,
    inbound: Mutex<Option<mpsc::Sender<LinkEvent>>>,
    connected: AtomicBool,
    written: Mutex<VecDeque<OutboundCommand>>,
    epoch: Instant,
}

impl NetworkInner {
    fn now_ms(&self) -> i64 {
        i64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(i64::MAX)
    }

    fn sender(&self) -> LinkResult<mpsc::Sender<LinkEvent>> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(LinkError::NotConnected);
        }
        self.inbound.lock().clone().ok_or(LinkError::NotConnected)
    }

    /// Run one command on every addressed buzzer and collect the replies.
    fn dispatch(&self, command: &OutboundCommand) -> Vec<Vec<u8>> {
        let Some(name) = CommandName::from_tag(&command.command_name) else {
            debug!("Simulated buzzers ignore unknown command {}", command.command_name);
            return Vec::new();
        };

        let targets: Vec<DeviceAddress> = self
            .order
            .iter()
            .copied()
            .filter(|a| command.target.is_broadcast() || *a == command.target)
            .filter(|a| self.buzzers.get(a).is_some_and(|b| b.online))
            .collect();

        let now = self.now_ms();
        let mut replies = Vec::new();
        for address in targets {
            let payload = match name {
                CommandName::Ping => Some(address.to_string()),
                CommandName::GetClock => self
                    .buzzers
                    .get(&address)
                    .map(|b| format!("{} {}", address, b.clock(now))),
                CommandName::ResetClock => {
                    if let Some(mut b) = self.buzzers.get_mut(&address) {
                        b.clock_offset = b.is_master.then_some(now);
                    }
                    None
                }
                CommandName::SetClock => {
                    let value = std::str::from_utf8(&command.args)
                        .ok()
                        .and_then(|s| s.trim().parse::<i64>().ok());
                    if let (Some(value), Some(mut b)) = (value, self.buzzers.get_mut(&address)) {
                        if b.clock_offset.is_none() || value < b.clock(now) {
                            b.clock_offset = Some(now - value);
                        }
                    }
                    None
                }
                CommandName::AutoSyncClock => self.auto_sync(address, now),
                CommandName::GetLedCount => Some(self.led_count.to_string()),
                CommandName::SetLeds => {
                    if let Some(mut b) = self.buzzers.get_mut(&address) {
                        b.leds = LedFrame::from_bytes(&command.args);
                    }
                    None
                }
                CommandName::ClearLeds => {
                    if let Some(mut b) = self.buzzers.get_mut(&address) {
                        b.leds = LedFrame::new(self.led_count);
                    }
                    None
                }
                CommandName::ButtonPress => None,
            };

            if let Some(payload) = payload {
                replies.push(reply_frame(command.command_id, name, &payload));
            }
        }
        replies
    }

    /// Only the master answers: it resets its clock and hands it to the
    /// other buzzers.
    fn auto_sync(&self, address: DeviceAddress, now: i64) -> Option<String> {
        let is_master = self.buzzers.get(&address).is_some_and(|b| b.is_master);
        if !is_master {
            return None;
        }

        for mut buzzer in self.buzzers.iter_mut() {
            if buzzer.online {
                buzzer.clock_offset = Some(now);
            }
        }
        Some("success".to_string())
    }
}

fn reply_frame(command_id: u8, name: CommandName, payload: &str) -> Vec<u8> {
    let mut frame = vec![command_id];
    frame.extend_from_slice(name.as_str().as_bytes());
    frame.push(b' ');
    frame.extend_from_slice(payload.as_bytes());
    frame.extend_from_slice(&[0; REPLY_PADDING]);
    frame
}

/// Emulated gateway plus buzzers, usable as a [`LinkConnector`].
#[derive(Clone)]
pub struct SimulatedNetwork {
    inner: Arc<NetworkInner>,
}

impl SimulatedNetwork {
    /// Network with `buzzers` buzzers of `led_count` LEDs each.
    pub fn new(gateway_name: impl Into<String>, buzzers: usize, led_count: usize) -> Self {
        let addresses = (0..buzzers)
            .map(|i| {
                let [hi, lo] = u16::try_from(i + 1).unwrap_or(u16::MAX).to_be_bytes();
                DeviceAddress::new([0x24, 0x6F, 0x28, 0x00, hi, lo])
            })
            .collect();
        Self::with_addresses(gateway_name, addresses, led_count)
    }

    /// Network with explicit buzzer addresses. The first one is master.
    pub fn with_addresses(
        gateway_name: impl Into<String>,
        addresses: Vec<DeviceAddress>,
        led_count: usize,
    ) -> Self {
        let buzzers = DashMap::new();
        for (i, address) in addresses.iter().enumerate() {
            buzzers.insert(
                *address,
                VirtualBuzzer {
                    address: *address,
                    is_master: i == 0,
                    leds: LedFrame::new(led_count),
                    online: true,
                    clock_offset: None,
                    press_id: 0,
                },
            );
        }

        Self {
            inner: Arc::new(NetworkInner {
                gateway_name: gateway_name.into(),
                led_count,
                order: addresses,
                buzzers,
                inbound: Mutex::new(None),
                connected: AtomicBool::new(false),
                written: Mutex::new(VecDeque::new()),
                epoch: Instant::now(),
            }),
        }
    }

    /// Buzzer addresses, master first.
    pub fn addresses(&self) -> Vec<DeviceAddress> {
        self.inner.order.clone()
    }

    /// Snapshot of one buzzer.
    pub fn buzzer(&self, address: &DeviceAddress) -> Option<VirtualBuzzer> {
        self.inner.buzzers.get(address).map(|b| b.clone())
    }

    /// Current LED colours of one buzzer.
    pub fn leds(&self, address: &DeviceAddress) -> Option<LedFrame> {
        self.inner.buzzers.get(address).map(|b| b.leds.clone())
    }

    /// Current clock of one buzzer.
    pub fn clock(&self, address: &DeviceAddress) -> Option<i64> {
        let now = self.inner.now_ms();
        self.inner.buzzers.get(address).map(|b| b.clock(now))
    }

    /// Take a buzzer off the air or bring it back.
    pub fn set_online(&self, address: &DeviceAddress, online: bool) {
        if let Some(mut b) = self.inner.buzzers.get_mut(address) {
            b.online = online;
        }
    }

    /// Commands written by the host, oldest first. Only the most recent
    /// ones are kept.
    pub fn written(&self) -> Vec<OutboundCommand> {
        self.inner.written.lock().iter().cloned().collect()
    }

    /// Commands written by the host with the given verb.
    pub fn written_with(&self, name: CommandName) -> Vec<OutboundCommand> {
        self.inner
            .written
            .lock()
            .iter()
            .filter(|c| c.command_name == name.as_str())
            .cloned()
            .collect()
    }

    pub fn clear_written(&self) {
        self.inner.written.lock().clear();
    }

    /// Whether a host link is open.
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Press the button of one buzzer, reporting its current clock.
    pub async fn press(&self, address: &DeviceAddress) -> LinkResult<()> {
        let clock = self
            .clock(address)
            .ok_or_else(|| LinkError::Communication(format!("unknown buzzer {}", address)))?;
        self.press_at(address, clock).await
    }

    /// Press the button of one buzzer, reporting `clock`.
    pub async fn press_at(&self, address: &DeviceAddress, clock: i64) -> LinkResult<()> {
        let press_id = {
            let mut buzzer = self
                .inner
                .buzzers
                .get_mut(address)
                .ok_or_else(|| LinkError::Communication(format!("unknown buzzer {}", address)))?;
            let id = buzzer.press_id;
            buzzer.press_id = id.wrapping_add(1);
            id
        };

        let frame = reply_frame(
            press_id,
            CommandName::ButtonPress,
            &format!("{} {}", address, clock),
        );
        let sender = self.inner.sender()?;
        for _ in 0..PRESS_REPEAT {
            sender
                .send(LinkEvent::frame(frame.clone()))
                .await
                .map_err(|_| LinkError::Disconnected)?;
        }
        debug!("Simulated press from {} at clock {}", address, clock);
        Ok(())
    }

    /// Drop the host link, as if the gateway went out of range.
    pub async fn disconnect(&self) {
        self.inner.connected.store(false, Ordering::Release);
        let sender = self.inner.inbound.lock().take();
        if let Some(sender) = sender {
            let _ = sender.send(LinkEvent::Disconnected).await;
        }
        info!("Simulated gateway disconnected");
    }
}

#[async_trait]
impl LinkConnector for SimulatedNetwork {
    async fn discover(&self, timeout: Duration) -> LinkResult<Vec<DiscoveredLink>> {
        debug!("Simulated discovery ({:?})", timeout);
        Ok(vec![
            DiscoveredLink::new("Unrelated speaker", "SIM:OTHER"),
            DiscoveredLink::new(self.inner.gateway_name.clone(), GATEWAY_ADDRESS),
        ])
    }

    async fn open(
        &self,
        peer: &DiscoveredLink,
        inbound: mpsc::Sender<LinkEvent>,
    ) -> LinkResult<Arc<dyn LinkHandle>> {
        if peer.address != GATEWAY_ADDRESS {
            return Err(LinkError::Connection(format!(
                "{} is not a buzzer gateway",
                peer.address
            )));
        }

        *self.inner.inbound.lock() = Some(inbound);
        self.inner.connected.store(true, Ordering::Release);
        Ok(Arc::new(SimulatedLink {
            inner: self.inner.clone(),
        }))
    }
}

struct SimulatedLink {
    inner: Arc<NetworkInner>,
}

#[async_trait]
impl LinkHandle for SimulatedLink {
    async fn write(&self, frame: &[u8]) -> LinkResult<()> {
        let sender = self.inner.sender()?;
        let command = OutboundCommand::decode(frame)?;
        let replies = self.inner.dispatch(&command);
        {
            let mut written = self.inner.written.lock();
            if written.len() == WRITE_LOG_CAPACITY {
                written.pop_front();
            }
            written.push_back(command);
        }

        for reply in replies {
            sender
                .send(LinkEvent::frame(reply))
                .await
                .map_err(|_| LinkError::Disconnected)?;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_addresses_are_distinct() {
        let network = SimulatedNetwork::new("BUZZ", 4, 24);
        let mut addresses = network.addresses();
        addresses.dedup();
        assert_eq!(addresses.len(), 4);
        assert!(network.buzzer(&addresses[0]).unwrap().is_master);
        assert!(!network.buzzer(&addresses[1]).unwrap().is_master);
    }

    #[test]
    fn test_dispatch_replies() {
        let network = SimulatedNetwork::new("BUZZ", 2, 24);
        let inner = &network.inner;
        let ping = OutboundCommand {
            command_name: "PING".to_string(),
            args: Vec::new(),
            target: DeviceAddress::BROADCAST,
            command_id: 9,
        };
        let replies = inner.dispatch(&ping);
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0][0], 9);
        assert!(replies[0].ends_with(&[0; REPLY_PADDING]));

        let sync = OutboundCommand {
            command_name: "ACLK".to_string(),
            ..ping
        };
        let replies = inner.dispatch(&sync);
        assert_eq!(replies.len(), 1);
        assert!(replies[0].starts_with(b"\x09ACLK success"));
    }

    #[tokio::test]
    async fn test_write_log_keeps_most_recent_commands() {
        let network = SimulatedNetwork::new("BUZZ", 1, 24);
        let (tx, _rx) = mpsc::channel(8);
        let peer = DiscoveredLink::new("BUZZ", GATEWAY_ADDRESS);
        let link = network.open(&peer, tx).await.unwrap();

        let total = WRITE_LOG_CAPACITY + 10;
        for i in 0..total {
            let clear = OutboundCommand {
                command_name: "CLED".to_string(),
                args: Vec::new(),
                target: DeviceAddress::BROADCAST,
                command_id: (i % 256) as u8,
            };
            link.write(&clear.encode()).await.unwrap();
        }

        let written = network.written();
        assert_eq!(written.len(), WRITE_LOG_CAPACITY);
        assert_eq!(written[0].command_id, 10);
        assert_eq!(
            written.last().unwrap().command_id,
            ((total - 1) % 256) as u8
        );
    }

    #[test]
    fn test_clock_starts_unset() {
        let network = SimulatedNetwork::new("BUZZ", 1, 24);
        let address = network.addresses()[0];
        assert_eq!(network.clock(&address), Some(i64::MAX));
    }
}
