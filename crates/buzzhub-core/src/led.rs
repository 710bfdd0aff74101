//! LED colours and strip frames.
//!
//! A frame is encoded for the SLED command as 3 bytes per LED (red, green,
//! blue), concatenated in the device's fixed LED order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::FormatError;

/// RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const RED: Color = Color::new(255, 0, 0);
    pub const GREEN: Color = Color::new(0, 255, 0);

    /// Create a colour from its components.
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Wire encoding: red, green, blue.
    pub fn to_bytes(self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }

    /// Colour as a 24-bit `0xRRGGBB` integer.
    pub fn to_u32(self) -> u32 {
        (u32::from(self.red) << 16) | (u32::from(self.green) << 8) | u32::from(self.blue)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }
}

impl FromStr for Color {
    type Err = FormatError;

    /// Parse `RRGGBB` or `#RRGGBB`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(FormatError::Color(s.to_string()));
        }
        let component = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| FormatError::Color(s.to_string()))
        };
        Ok(Self::new(component(0..2)?, component(2..4)?, component(4..6)?))
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Colours for every LED of one buzzer strip. The length is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedFrame {
    leds: Vec<Color>,
}

impl LedFrame {
    /// All LEDs off.
    pub fn new(led_count: usize) -> Self {
        Self::filled(led_count, Color::BLACK)
    }

    /// All LEDs set to one colour.
    pub fn filled(led_count: usize, color: Color) -> Self {
        Self {
            leds: vec![color; led_count],
        }
    }

    /// Build a frame where each LED colour is chosen by its index.
    pub fn from_fn(led_count: usize, f: impl FnMut(usize) -> Color) -> Self {
        Self {
            leds: (0..led_count).map(f).collect(),
        }
    }

    /// Number of LEDs.
    pub fn len(&self) -> usize {
        self.leds.len()
    }

    /// Whether the strip has no LEDs.
    pub fn is_empty(&self) -> bool {
        self.leds.is_empty()
    }

    /// Colour at `index`.
    pub fn get(&self, index: usize) -> Option<Color> {
        self.leds.get(index).copied()
    }

    /// Set one LED. Indices past the end of the strip are ignored.
    pub fn set(&mut self, index: usize, color: Color) {
        if let Some(led) = self.leds.get_mut(index) {
            *led = color;
        }
    }

    /// All colours in LED order.
    pub fn colors(&self) -> &[Color] {
        &self.leds
    }

    /// SLED argument bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.leds.iter().flat_map(|c| c.to_bytes()).collect()
    }

    /// Decode SLED argument bytes. Trailing bytes that do not form a full
    /// colour are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            leds: bytes
                .chunks_exact(3)
                .map(|c| Color::new(c[0], c[1], c[2]))
                .collect(),
        }
    }
}

impl fmt::Display for LedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let colors: Vec<String> = self.leds.iter().map(|c| c.to_string()).collect();
        write!(f, "<LEDs {}>", colors.join(" "))
    }
}
