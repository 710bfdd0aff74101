//! Error types for the buzzer protocol engine.
//!
//! Absence of a reply is not an error: waits return `bool` or an empty `Vec`.

use thiserror::Error;

/// Result type for link and transport operations.
pub type LinkResult<T> = Result<T, LinkError>;

/// Malformed input rejected before any I/O happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Raw address with a length other than 6 bytes
    #[error("Device address must be 6 bytes, got {0}")]
    AddressLength(usize),

    /// Address string not in XX:XX:XX:XX:XX:XX form
    #[error("Device address must be in the form 00:11:22:33:44:55, got {0:?}")]
    AddressText(String),

    /// Colour string not in RRGGBB form
    #[error("Color must be given in #RRGGBB form, got {0:?}")]
    Color(String),

    /// Clock outside 0..=i64::MAX
    #[error("Clock must be in the range 0 - {max}, got {0}", max = i64::MAX)]
    ClockRange(u64),

    /// Frame with nothing left after padding removal
    #[error("Empty frame")]
    EmptyFrame,

    /// Command argument that cannot be framed
    #[error("Invalid command argument: {0}")]
    Argument(String),
}

/// Error type for link and transport operations.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Input validation failed
    #[error(transparent)]
    Format(#[from] FormatError),

    /// No connection has been established yet
    #[error("Link is not connected")]
    NotConnected,

    /// The connection was lost; reconnecting is up to the caller
    #[error("Link disconnected")]
    Disconnected,

    /// Discovery did not find the configured target
    #[error("Link target not found: {0}")]
    TargetNotFound(String),

    /// Connection could not be established
    #[error("Connection error: {0}")]
    Connection(String),

    /// Writing to the link failed
    #[error("Communication error: {0}")]
    Communication(String),

    /// Other error
    #[error("Link error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Error returned while waiting for a resolved button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PressError {
    /// No press was resolved within the timeout
    #[error("Timed out waiting for a button press")]
    Timeout,

    /// Another caller is already waiting for the next press
    #[error("Another caller is already waiting for a button press")]
    WaiterBusy,

    /// The signal fired but no batch was recorded
    #[error("No resolved button press available")]
    Empty,
}

impl LinkError {
    /// Whether the error leaves the session unusable until reconnected.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LinkError::Disconnected | LinkError::NotConnected)
    }
}
