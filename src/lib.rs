//! # Hamface Core Library
//!
//! A single-screen watch face for amateur-radio operators. It shows local
//! time and date, UTC time and date, the outside temperature and an HF band
//! condition summary supplied by a paired companion process.
//!
//! ## Design Philosophy
//!
//! ### Bounded Memory
//! - **Fixed-capacity text**: every display field owns a `heapless::String`
//!   sized to its longest legal value; a write that would not fit is
//!   rejected instead of truncated
//! - **No history**: timestamps and temperature readings are projected into
//!   text and dropped immediately
//!
//! ### Event Flow
//! 1. **Tick**: once per minute the host posts a tick; the clock fields are
//!    reformatted from a fresh timestamp
//! 2. **Request**: on every 30th wall-clock minute one request is sent to the
//!    companion, fire-and-forget
//! 3. **Inbound**: companion dictionaries are decoded and written into the
//!    temperature and band fields
//!
//! All of this runs on one thread through the FIFO queue in [`watchface`].
//!
//! ## Core Types
//! - [`ClockStyle`]: the wearer's 12/24-hour preference
//! - [`TemperatureReading`]: one decoded temperature value with its unit

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod clock;
pub mod companion;
pub mod config;
pub mod display;
pub mod host;
pub mod message;
pub mod receiver;
pub mod renderer;
pub mod watchface;

#[cfg(test)]
mod tests;

/// The wearer's time display preference.
///
/// Owned by host configuration and read on every formatting pass, so a
/// change shows up on the next tick without a restart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockStyle {
    /// `13:05`
    #[default]
    #[serde(rename = "24h")]
    TwentyFourHour,
    /// `01:05`, never with an AM/PM suffix
    #[serde(rename = "12h")]
    TwelveHour,
}

/// Unit tag attached to an inbound temperature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Single letter shown after the value.
    pub fn letter(self) -> char {
        match self {
            TemperatureUnit::Celsius => 'C',
            TemperatureUnit::Fahrenheit => 'F',
        }
    }
}

/// A temperature decoded from a companion message.
///
/// Formats as `"<value><unit-letter>"`:
/// ```
/// use hamface::{TemperatureReading, TemperatureUnit};
///
/// let reading = TemperatureReading { value: 72, unit: TemperatureUnit::Fahrenheit };
/// assert_eq!(reading.to_string(), "72F");
///
/// let cold = TemperatureReading { value: -4, unit: TemperatureUnit::Celsius };
/// assert_eq!(cold.to_string(), "-4C");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TemperatureReading {
    pub value: i32,
    pub unit: TemperatureUnit,
}

impl fmt::Display for TemperatureReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.letter())
    }
}

/// Top-level error for callers that drive the face as a whole.
#[derive(thiserror::Error, Debug)]
pub enum FaceError {
    #[error(transparent)]
    Display(#[from] display::DisplayError),

    #[error(transparent)]
    Dictionary(#[from] message::DictionaryError),

    #[error(transparent)]
    Companion(#[from] companion::CompanionError),
}
