//! Command façade: one method per protocol verb.
//!
//! Request verbs wait for replies through the correlation store. A targeted
//! request returns as soon as the device answers, a broadcast request always
//! waits the full reply window because every device may answer.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::address::DeviceAddress;
use crate::error::{FormatError, LinkResult};
use crate::led::LedFrame;
use crate::packet::{CommandName, InboundPacket};
use crate::transport::CommandTransport;

/// Clock value reported by one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockReading {
    pub address: DeviceAddress,
    pub clock: i64,
}

impl ClockReading {
    /// Parse a GCLK reply (`<address> <clock>`).
    pub fn from_packet(packet: &InboundPacket) -> Option<Self> {
        Some(Self {
            address: packet.reporter()?,
            clock: packet.field(1)?.parse().ok()?,
        })
    }
}

/// Result of comparing every device's LED count with the expected one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedCountCheck {
    /// Expected LED count
    pub expected: usize,
    /// Count reported by each replying device
    pub reported: Vec<usize>,
}

impl LedCountCheck {
    /// Whether every replying device reported the expected count.
    pub fn is_consistent(&self) -> bool {
        self.reported.iter().all(|&n| n == self.expected)
    }
}

/// Typed access to the buzzer protocol verbs.
#[derive(Clone)]
pub struct Commands {
    transport: Arc<CommandTransport>,
    response_timeout: Duration,
}

impl Commands {
    pub fn new(transport: Arc<CommandTransport>) -> Self {
        let response_timeout = transport.config().response_timeout();
        Self {
            transport,
            response_timeout,
        }
    }

    /// Override the reply window.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn transport(&self) -> &Arc<CommandTransport> {
        &self.transport
    }

    /// PING: every addressed device answers with its address.
    pub async fn ping(&self, target: Option<DeviceAddress>) -> LinkResult<Vec<InboundPacket>> {
        self.request(CommandName::Ping, &[], target).await
    }

    /// GCLK: every addressed device answers with its address and clock.
    pub async fn get_clock(&self, target: Option<DeviceAddress>) -> LinkResult<Vec<InboundPacket>> {
        self.request(CommandName::GetClock, &[], target).await
    }

    /// RCLK: reset device clocks.
    pub async fn reset_clock(&self, target: Option<DeviceAddress>) -> LinkResult<()> {
        self.transport
            .send(CommandName::ResetClock, &[], target)
            .await
            .map(drop)
    }

    /// SCLK: set device clocks. The value must fit in an `i64`.
    pub async fn set_clock(&self, clock: u64, target: Option<DeviceAddress>) -> LinkResult<()> {
        if clock > i64::MAX as u64 {
            return Err(FormatError::ClockRange(clock).into());
        }
        self.transport
            .send(CommandName::SetClock, clock.to_string().as_bytes(), target)
            .await
            .map(drop)
    }

    /// ACLK: ask the elected master device to synchronise every clock.
    ///
    /// Only the master answers, so the wait ends on the first reply even
    /// when the command is broadcast. Succeeds when exactly one device
    /// answered.
    pub async fn auto_sync_clock(&self, target: Option<DeviceAddress>) -> LinkResult<bool> {
        let name = CommandName::AutoSyncClock;
        let command_id = self.transport.send(name, &[], target).await?;

        self.transport
            .store()
            .wait_for_at_least_one(command_id, name, self.response_timeout, false)
            .await;

        let replies = self
            .transport
            .store()
            .query_by_id_and_name(command_id, name.as_str());
        debug!("Clock sync answered by {} device(s)", replies.len());
        Ok(replies.len() == 1)
    }

    /// GLED: every addressed device answers with its LED count.
    pub async fn get_led_count(
        &self,
        target: Option<DeviceAddress>,
    ) -> LinkResult<Vec<InboundPacket>> {
        self.request(CommandName::GetLedCount, &[], target).await
    }

    /// SLED: set LED colours, 3 bytes (red, green, blue) per LED.
    pub async fn set_leds(&self, leds: &LedFrame, target: Option<DeviceAddress>) -> LinkResult<()> {
        if leds.is_empty() {
            return Err(FormatError::Argument("LED frame is empty".to_string()).into());
        }
        self.transport
            .send(CommandName::SetLeds, &leds.to_bytes(), target)
            .await
            .map(drop)
    }

    /// CLED: turn every LED off.
    pub async fn clear_leds(&self, target: Option<DeviceAddress>) -> LinkResult<()> {
        self.transport
            .send(CommandName::ClearLeds, &[], target)
            .await
            .map(drop)
    }

    /// Addresses of the devices answering a PING.
    pub async fn ping_addresses(&self, target: Option<DeviceAddress>) -> LinkResult<Vec<DeviceAddress>> {
        let replies = self.ping(target).await?;
        Ok(replies
            .iter()
            .filter_map(|p| {
                let address = p.reporter();
                if address.is_none() {
                    warn!("Ignoring malformed PING reply: {}", p);
                }
                address
            })
            .collect())
    }

    /// Clock readings of the devices answering a GCLK.
    pub async fn clock_readings(&self, target: Option<DeviceAddress>) -> LinkResult<Vec<ClockReading>> {
        let replies = self.get_clock(target).await?;
        Ok(replies
            .iter()
            .filter_map(|p| {
                let reading = ClockReading::from_packet(p);
                if reading.is_none() {
                    warn!("Ignoring malformed GCLK reply: {}", p);
                }
                reading
            })
            .collect())
    }

    /// LED counts reported by the devices answering a GLED.
    pub async fn led_counts(&self, target: Option<DeviceAddress>) -> LinkResult<Vec<usize>> {
        let replies = self.get_led_count(target).await?;
        Ok(replies
            .iter()
            .filter_map(|p| {
                let count = p.field(0).and_then(|f| f.parse().ok());
                if count.is_none() {
                    warn!("Ignoring malformed GLED reply: {}", p);
                }
                count
            })
            .collect())
    }

    /// Broadcast GLED and compare every reply with `expected`.
    pub async fn check_led_count(&self, expected: usize) -> LinkResult<LedCountCheck> {
        let reported = self.led_counts(None).await?;
        Ok(LedCountCheck { expected, reported })
    }

    async fn request(
        &self,
        name: CommandName,
        args: &[u8],
        target: Option<DeviceAddress>,
    ) -> LinkResult<Vec<InboundPacket>> {
        let broadcast = DeviceAddress::or_broadcast(target).is_broadcast();
        let command_id = self.transport.send(name, args, target).await?;

        let store = self.transport.store();
        store
            .wait_for_at_least_one(command_id, name, self.response_timeout, broadcast)
            .await;
        Ok(store.query_by_id_and_name(command_id, name.as_str()))
    }
}
