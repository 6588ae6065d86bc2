//! # Message Receiver
//!
//! Applies companion dictionaries to the [`Surface`] and builds the periodic
//! data request.
//!
//! ## Key Scheme
//!
//! | key | name                | value    | field              |
//! |-----|---------------------|----------|--------------------|
//! | 0   | `KEY_TEMPERATURE_F` | integer  | temperature, `72F` |
//! | 1   | `KEY_TEMPERATURE_C` | integer  | temperature, `22C` |
//! | 2   | `KEY_BANDS_DAY`     | text     | day band column    |
//! | 3   | `KEY_BANDS_NIGHT`   | text     | night band column  |
//!
//! Entries are applied in payload order. Anything unrecognized or
//! malformed is logged and skipped; the rest of the payload still applies.
//!
//! ## Requests
//! The request is a single tuple `(0, 0)`. It carries no parameters: the
//! companion answers it by sending its latest band and weather data.

use crate::display::{DisplayError, FieldId, Surface, BAND_LOADING};
use crate::message::{Dictionary, Tuple, TupleValue};
use crate::{TemperatureReading, TemperatureUnit};
use std::fmt::Write;

/// Left-hand labels of the band block once band data is shown.
pub const BAND_LABELS: &str = "80m-40m\n30m-20m\n17m-15m\n12m-10m";

/// Key of the single request tuple
pub const REQUEST_KEY: u32 = 0;

/// Known inbound keys
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppKey {
    TemperatureF = 0,
    TemperatureC = 1,
    BandsDay = 2,
    BandsNight = 3,
}

impl AppKey {
    pub const ALL: [AppKey; 4] = [
        AppKey::TemperatureF,
        AppKey::TemperatureC,
        AppKey::BandsDay,
        AppKey::BandsNight,
    ];

    pub fn from_key(key: u32) -> Option<Self> {
        AppKey::ALL.into_iter().find(|k| k.key() == key)
    }

    pub fn key(self) -> u32 {
        self as u32
    }

    /// Name used by the companion script
    pub fn name(self) -> &'static str {
        match self {
            AppKey::TemperatureF => "KEY_TEMPERATURE_F",
            AppKey::TemperatureC => "KEY_TEMPERATURE_C",
            AppKey::BandsDay => "KEY_BANDS_DAY",
            AppKey::BandsNight => "KEY_BANDS_NIGHT",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        AppKey::ALL.into_iter().find(|k| k.name() == name)
    }
}

/// What happened to one inbound dictionary
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Fields written, in the order they were written
    pub updated: Vec<FieldId>,
    /// Keys skipped because nothing handles them
    pub unrecognized: Vec<u32>,
    /// Recognized keys skipped because their value was unusable
    pub rejected: Vec<u32>,
}

/// Write every usable entry of `dict` into `surface`.
pub fn apply_inbound(dict: &Dictionary, surface: &mut Surface) -> ApplyReport {
    let mut report = ApplyReport::default();

    for tuple in dict.iter() {
        let Some(app_key) = AppKey::from_key(tuple.key) else {
            log::warn!("Key {} not recognized, skipping", tuple.key);
            report.unrecognized.push(tuple.key);
            continue;
        };

        match apply_tuple(app_key, tuple, surface) {
            Ok(fields) => report.updated.extend(fields),
            Err(reason) => {
                log::warn!("{} skipped: {}", app_key.name(), reason);
                report.rejected.push(tuple.key);
            }
        }
    }
    report
}

enum Rejection {
    WrongType(&'static str),
    Display(DisplayError),
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::WrongType(expected) => write!(f, "expected {}", expected),
            Rejection::Display(e) => write!(f, "{}", e),
        }
    }
}

impl From<DisplayError> for Rejection {
    fn from(e: DisplayError) -> Self {
        Rejection::Display(e)
    }
}

fn apply_tuple(
    key: AppKey,
    tuple: &Tuple,
    surface: &mut Surface,
) -> Result<Vec<FieldId>, Rejection> {
    match key {
        AppKey::TemperatureF | AppKey::TemperatureC => {
            let value = tuple
                .value
                .as_i32()
                .ok_or(Rejection::WrongType("a 32-bit integer"))?;
            let unit = if key == AppKey::TemperatureF {
                TemperatureUnit::Fahrenheit
            } else {
                TemperatureUnit::Celsius
            };
            let reading = TemperatureReading { value, unit };
            surface.format_into(FieldId::Temperature, |out| write!(out, "{}", reading))?;
            log::info!("Temperature {}", reading);
            Ok(vec![FieldId::Temperature])
        }
        AppKey::BandsDay | AppKey::BandsNight => {
            let text = tuple
                .value
                .as_str()
                .ok_or(Rejection::WrongType("text"))?;
            let column = if key == AppKey::BandsDay {
                FieldId::DayBandQuality
            } else {
                FieldId::NightBandQuality
            };
            surface.set_text(column, text)?;

            let mut fields = vec![column];
            if surface.text(FieldId::BandSummary) == BAND_LOADING {
                surface.set_text(FieldId::BandSummary, BAND_LABELS)?;
                fields.push(FieldId::BandSummary);
            }
            Ok(fields)
        }
    }
}

/// Whether a tick at this wall-clock minute should request fresh data.
///
/// Uses the minute value itself, not elapsed time: with the default
/// interval of 30, minutes 0 and 30 trigger.
pub fn request_due(minute: u32, interval: u32) -> bool {
    interval != 0 && minute % interval == 0
}

/// The fixed data request.
pub fn build_request() -> Dictionary {
    let mut dict = Dictionary::new();
    dict.push(REQUEST_KEY, TupleValue::Int(0));
    dict
}

/// Outbound request progress
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutboxState {
    #[default]
    Idle,
    RequestSent,
}
