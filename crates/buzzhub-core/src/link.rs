//! Link abstraction.
//!
//! The radio stack (discovery, pairing, characteristic write/notify) lives
//! outside this crate. A backend implements [`LinkConnector`] and hands
//! inbound frames to the transport through an mpsc channel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::LinkResult;

/// Connection state of the link, as seen by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No connection
    Disconnected,
    /// Discovery or connection in progress
    Connecting,
    /// Connected and operational
    Connected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// A peer found during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    /// Advertised name
    pub name: String,
    /// Backend-specific address
    pub address: String,
}

impl DiscoveredLink {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// Event delivered by an open link.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// Notification payload, possibly zero padded
    Frame {
        bytes: Vec<u8>,
        received_at: DateTime<Utc>,
    },
    /// The peer went away
    Disconnected,
}

impl LinkEvent {
    /// Frame event stamped with the current time.
    pub fn frame(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Frame {
            bytes: bytes.into(),
            received_at: Utc::now(),
        }
    }
}

/// An open connection to the gateway device.
#[async_trait]
pub trait LinkHandle: Send + Sync {
    /// Write one framed command, without waiting for a reply.
    async fn write(&self, frame: &[u8]) -> LinkResult<()>;

    /// Whether the connection is still usable.
    fn is_connected(&self) -> bool;
}

/// Discovery and connection primitive.
#[async_trait]
pub trait LinkConnector: Send + Sync {
    /// Scan for peers for at most `timeout`.
    async fn discover(&self, timeout: Duration) -> LinkResult<Vec<DiscoveredLink>>;

    /// Connect to `peer`. Notifications and disconnects are delivered on
    /// `inbound` from the moment this returns.
    async fn open(
        &self,
        peer: &DiscoveredLink,
        inbound: mpsc::Sender<LinkEvent>,
    ) -> LinkResult<Arc<dyn LinkHandle>>;
}
