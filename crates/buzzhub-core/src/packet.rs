//! Wire frames.
//!
//! Outbound: `target(6) || command_id(1) || name [|| ' ' || args]`.
//! Inbound: `command_id(1) || name [|| ' ' || field (' ' field)*]`, possibly
//! followed by zero padding which is stripped before parsing.

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::address::DeviceAddress;
use crate::error::FormatError;

/// Protocol verbs. Every tag is 4 ASCII letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    /// Liveness probe, every addressed device answers with its address
    Ping,
    /// Read the device clock
    GetClock,
    /// Reset the device clock
    ResetClock,
    /// Set the device clock (decimal argument)
    SetClock,
    /// Clock synchronisation driven by the elected master device
    AutoSyncClock,
    /// Read the number of LEDs on the device
    GetLedCount,
    /// Set LED colours (packed RGB argument)
    SetLeds,
    /// Turn every LED off
    ClearLeds,
    /// Button press report sent by a device
    ButtonPress,
}

impl CommandName {
    pub const ALL: [CommandName; 9] = [
        CommandName::Ping,
        CommandName::GetClock,
        CommandName::ResetClock,
        CommandName::SetClock,
        CommandName::AutoSyncClock,
        CommandName::GetLedCount,
        CommandName::SetLeds,
        CommandName::ClearLeds,
        CommandName::ButtonPress,
    ];

    /// Wire tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandName::Ping => "PING",
            CommandName::GetClock => "GCLK",
            CommandName::ResetClock => "RCLK",
            CommandName::SetClock => "SCLK",
            CommandName::AutoSyncClock => "ACLK",
            CommandName::GetLedCount => "GLED",
            CommandName::SetLeds => "SLED",
            CommandName::ClearLeds => "CLED",
            CommandName::ButtonPress => "BPRS",
        }
    }

    /// Look a verb up by its wire tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == tag)
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remove trailing zero padding added by the link.
pub fn strip_padding(raw: &[u8]) -> &[u8] {
    let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &raw[..end]
}

/// A command ready to be written to the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCommand {
    pub command_name: String,
    pub args: Vec<u8>,
    pub target: DeviceAddress,
    pub command_id: u8,
}

impl OutboundCommand {
    /// Encode to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(8 + self.command_name.len() + self.args.len());
        frame.extend_from_slice(self.target.as_bytes());
        frame.push(self.command_id);
        frame.extend_from_slice(self.command_name.as_bytes());
        if !self.args.is_empty() {
            frame.push(b' ');
            frame.extend_from_slice(&self.args);
        }
        frame
    }

    /// Decode wire bytes, as a device would.
    pub fn decode(frame: &[u8]) -> Result<Self, FormatError> {
        if frame.len() < 7 {
            return Err(FormatError::EmptyFrame);
        }
        let target = DeviceAddress::from_slice(&frame[..6])?;
        let command_id = frame[6];
        let body = &frame[7..];
        let (name, args) = match body.iter().position(|&b| b == b' ') {
            Some(space) => (&body[..space], &body[space + 1..]),
            None => (body, &[][..]),
        };
        Ok(Self {
            command_name: String::from_utf8_lossy(name).into_owned(),
            args: args.to_vec(),
            target,
            command_id,
        })
    }
}

/// A packet received from the link.
///
/// Equality and hashing only consider the raw bytes.
#[derive(Debug, Clone)]
pub struct InboundPacket {
    /// Monotonic arrival time, used for expiry
    pub arrival: Instant,
    /// Wall-clock arrival time, for reporting
    pub received_at: DateTime<Utc>,
    pub command_id: u8,
    pub command_name: String,
    pub fields: Vec<String>,
    /// Frame bytes with padding removed
    pub raw: Vec<u8>,
}

impl InboundPacket {
    /// Parse a frame that arrived now.
    pub fn parse(raw: &[u8]) -> Result<Self, FormatError> {
        Self::parse_at(raw, Instant::now())
    }

    /// Parse a frame with an explicit arrival time.
    pub fn parse_at(raw: &[u8], arrival: Instant) -> Result<Self, FormatError> {
        let raw = strip_padding(raw);
        let (&command_id, rest) = raw.split_first().ok_or(FormatError::EmptyFrame)?;

        let (name, fields) = match rest.iter().position(|&b| b == b' ') {
            Some(space) => {
                let text = String::from_utf8_lossy(&rest[space + 1..]);
                (&rest[..space], text.split(' ').map(str::to_string).collect())
            }
            None => (rest, Vec::new()),
        };

        Ok(Self {
            arrival,
            received_at: Utc::now(),
            command_id,
            command_name: String::from_utf8_lossy(name).into_owned(),
            fields,
            raw: raw.to_vec(),
        })
    }

    /// Whether the packet carries the given verb.
    pub fn is(&self, name: CommandName) -> bool {
        self.command_name == name.as_str()
    }

    /// Payload field by position.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// Device address reported in the first payload field.
    pub fn reporter(&self) -> Option<DeviceAddress> {
        self.field(0)?.parse().ok()
    }

    /// Press clock of a button press report (second payload field).
    pub fn press_clock(&self) -> Option<i64> {
        self.field(1)?.parse().ok()
    }
}

impl PartialEq for InboundPacket {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for InboundPacket {}

impl Hash for InboundPacket {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl fmt::Display for InboundPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<InboundPacket id={} cmd={} data={:?}>",
            self.command_id, self.command_name, self.fields
        )
    }
}
