//! Buzzer protocol engine.
//!
//! Frames commands for buzzer devices reached through one gateway link,
//! correlates their replies and resolves bursts of button presses.
//!
//! ```text
//! link -> CommandTransport -> CorrelationStore <- Commands
//!                          \-> PressAggregator  <- game logic
//! ```

pub mod address;
pub mod commands;
pub mod config;
pub mod connected;
pub mod error;
pub mod led;
pub mod link;
pub mod packet;
pub mod press;
pub mod simulator;
pub mod store;
pub mod transport;

pub use address::DeviceAddress;
pub use commands::{ClockReading, Commands, LedCountCheck};
pub use config::ProtocolConfig;
pub use connected::ConnectedCache;
pub use error::{FormatError, LinkError, LinkResult, PressError};
pub use led::{Color, LedFrame};
pub use link::{ConnectionStatus, DiscoveredLink, LinkConnector, LinkEvent, LinkHandle};
pub use packet::{CommandName, InboundPacket, OutboundCommand};
pub use press::PressAggregator;
pub use simulator::{SimulatedNetwork, VirtualBuzzer};
pub use store::CorrelationStore;
pub use transport::CommandTransport;
