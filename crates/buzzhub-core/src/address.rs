//! Physical device addresses.
//!
//! A buzzer is addressed by its 6-byte radio address. The all-ones address
//! is the broadcast sentinel meaning "every device".

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::FormatError;

/// Length of the canonical `XX:XX:XX:XX:XX:XX` text form.
const ADDRESS_TEXT_LEN: usize = 17;

/// 6-byte physical device address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceAddress([u8; 6]);

impl DeviceAddress {
    /// Broadcast sentinel (six 0xFF bytes).
    pub const BROADCAST: DeviceAddress = DeviceAddress([0xFF; 6]);

    /// Create an address from its raw bytes.
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Parse from a raw byte slice. The slice must be exactly 6 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, FormatError> {
        let raw: [u8; 6] = bytes
            .try_into()
            .map_err(|_| FormatError::AddressLength(bytes.len()))?;
        Ok(Self(raw))
    }

    /// Raw bytes in wire order.
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Check whether this is the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Resolve an optional target, `None` meaning broadcast.
    pub fn or_broadcast(target: Option<DeviceAddress>) -> DeviceAddress {
        target.unwrap_or(Self::BROADCAST)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for DeviceAddress {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != ADDRESS_TEXT_LEN {
            return Err(FormatError::AddressText(s.to_string()));
        }

        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        for byte in bytes.iter_mut() {
            let part = parts
                .next()
                .filter(|p| p.len() == 2 && p.bytes().all(|b| b.is_ascii_hexdigit()))
                .ok_or_else(|| FormatError::AddressText(s.to_string()))?;
            *byte = u8::from_str_radix(part, 16)
                .map_err(|_| FormatError::AddressText(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(FormatError::AddressText(s.to_string()));
        }

        Ok(Self(bytes))
    }
}

impl TryFrom<&[u8]> for DeviceAddress {
    type Error = FormatError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_slice(bytes)
    }
}

impl From<[u8; 6]> for DeviceAddress {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}

impl Serialize for DeviceAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DeviceAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
