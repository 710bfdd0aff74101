//! Teams and point limits.

use std::fmt;

use buzzhub_core::{Color, DeviceAddress};
use serde::{Deserialize, Serialize};

use crate::error::RosterError;

/// Maximum score of a team. Selects the LED fill table and whether the
/// score is shown in one or two laps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum PointLimit {
    Five,
    Eight,
    Ten,
    Sixteen,
}

impl PointLimit {
    pub fn value(self) -> u32 {
        match self {
            PointLimit::Five => 5,
            PointLimit::Eight => 8,
            PointLimit::Ten => 10,
            PointLimit::Sixteen => 16,
        }
    }
}

impl TryFrom<u32> for PointLimit {
    type Error = RosterError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            5 => Ok(PointLimit::Five),
            8 => Ok(PointLimit::Eight),
            10 => Ok(PointLimit::Ten),
            16 => Ok(PointLimit::Sixteen),
            other => Err(RosterError::InvalidPointLimit(other)),
        }
    }
}

impl From<PointLimit> for u32 {
    fn from(limit: PointLimit) -> Self {
        limit.value()
    }
}

impl fmt::Display for PointLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// A competing team and the buzzers it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Stable identity assigned by the roster; survives renames
    #[serde(skip)]
    pub id: u64,
    pub name: String,
    pub primary_color: Color,
    pub secondary_color: Color,
    /// Current score, `0..=point_limit`
    pub point: u32,
    pub point_limit: PointLimit,
    #[serde(rename = "associated_buzzers")]
    pub addresses: Vec<DeviceAddress>,
}

impl Team {
    pub fn new(
        name: impl Into<String>,
        primary_color: Color,
        secondary_color: Color,
        point_limit: PointLimit,
    ) -> Self {
        Self {
            id: 0,
            name: name.into(),
            primary_color,
            secondary_color,
            point: 0,
            point_limit,
            addresses: Vec::new(),
        }
    }

    /// Whether `address` belongs to this team.
    pub fn owns(&self, address: &DeviceAddress) -> bool {
        self.addresses.contains(address)
    }

    /// Add one point, saturating at the limit. Returns the new score.
    pub fn award_point(&mut self) -> u32 {
        self.point = (self.point + 1).min(self.point_limit.value());
        self.point
    }
}
