//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the hamface.toml file.
//! It covers the clock preference, the companion request cadence and message
//! buffer sizes, and the screen dimensions.

use crate::clock::UtcFormat;
use crate::ClockStyle;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE: &str = "hamface.toml";

/// Errors reading or writing the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config encode: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("display {width}x{height} exceeds {max}x{max}")]
    DisplayTooLarge { width: u32, height: u32, max: u32 },
}

/// Application configuration loaded from hamface.toml
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Clock preferences
    pub clock: ClockConfig,
    /// Companion message channel settings
    pub companion: CompanionConfig,
    /// Screen configuration
    pub display: DisplayConfig,
}

/// Clock preferences
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ClockConfig {
    /// 12h or 24h; re-read from the file on every tick
    pub style: ClockStyle,
    /// What the bottom UTC banner shows
    pub utc_format: UtcFormat,
    /// Fixed local offset from UTC in minutes
    /// Omit to follow the system time zone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utc_offset_minutes: Option<i32>,
}

/// Companion channel settings
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CompanionConfig {
    /// Request fresh data whenever the wall-clock minute is a multiple of this
    /// 0 disables requests
    pub request_interval_minutes: u32,
    /// Largest inbound payload in bytes; bigger messages are dropped
    pub inbox_size: usize,
    /// Largest outbound payload in bytes
    pub outbox_size: usize,
}

/// Screen configuration
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Screen width in pixels
    pub width: u32,
    /// Screen height in pixels
    pub height: u32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        ClockConfig {
            style: ClockStyle::TwentyFourHour,
            utc_format: UtcFormat::TimeAndDate,
            utc_offset_minutes: None,
        }
    }
}

impl Default for CompanionConfig {
    fn default() -> Self {
        CompanionConfig {
            request_interval_minutes: 30,
            inbox_size: 128,
            outbox_size: 64,
        }
    }
}

impl DisplayConfig {
    /// Largest accepted width or height in pixels
    pub const MAX_SIDE: u32 = 2048;

    fn validate(&self) -> Result<(), ConfigError> {
        if self.width > Self::MAX_SIDE || self.height > Self::MAX_SIDE {
            return Err(ConfigError::DisplayTooLarge {
                width: self.width,
                height: self.height,
                max: Self::MAX_SIDE,
            });
        }
        Ok(())
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            width: 144,  // Rectangular watch screen
            height: 168, // Rectangular watch screen
        }
    }
}

impl Config {
    /// Load configuration from the given path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match Self::read_from_path(&path) {
            Ok(config) => {
                log::info!("Loaded configuration from {}", path.as_ref().display());
                config
            }
            Err(ConfigError::Io(_)) => {
                log::info!("No config file found, using default configuration");
                Self::default()
            }
            Err(e) => {
                log::warn!("{}", e);
                log::warn!("Using default configuration");
                Self::default()
            }
        }
    }

    /// Read configuration without any fallback
    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str::<Config>(&contents)?;
        config.display.validate()?;
        Ok(config)
    }

    /// Save current configuration to the given path
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        log::info!("Configuration saved to {}", path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.clock.style, ClockStyle::TwentyFourHour);
        assert_eq!(config.clock.utc_format, UtcFormat::TimeAndDate);
        assert_eq!(config.companion.request_interval_minutes, 30);
        assert_eq!(config.display.width, 144);
        assert_eq!(config.display.height, 168);
    }

    #[test]
    fn test_config_roundtrip() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.clock.style = ClockStyle::TwelveHour;
        config.clock.utc_offset_minutes = Some(60);
        config.save_to_path(file.path()).unwrap();

        let parsed = Config::read_from_path(file.path()).unwrap();
        assert_eq!(parsed.clock.style, ClockStyle::TwelveHour);
        assert_eq!(parsed.clock.utc_offset_minutes, Some(60));
        assert_eq!(parsed.companion.inbox_size, config.companion.inbox_size);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let parsed: Config = toml::from_str(
            "[clock]\nutc_format = \"time_only\"\n[companion]\nrequest_interval_minutes = 15\n",
        )
        .unwrap();
        assert_eq!(parsed.clock.utc_format, UtcFormat::TimeOnly);
        assert_eq!(parsed.clock.style, ClockStyle::TwentyFourHour);
        assert_eq!(parsed.companion.request_interval_minutes, 15);
        assert_eq!(parsed.companion.outbox_size, 64);
    }

    #[test]
    fn test_invalid_style_is_rejected() {
        let err = toml::from_str::<Config>("[clock]\nstyle = \"13h\"\n").unwrap_err();
        assert!(err.to_string().contains("13h"));
    }

    #[test]
    fn test_load_invalid_file_falls_back_to_default() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[clock\nstyle = 12h").unwrap();
        assert!(matches!(
            Config::read_from_path(file.path()),
            Err(ConfigError::Parse(_))
        ));

        let config = Config::load_from_path(file.path());
        assert_eq!(config.clock.style, ClockStyle::TwentyFourHour);
        assert_eq!(config.companion.inbox_size, 128);
    }

    #[test]
    fn test_oversized_display_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[display]\nwidth = 4000000000\nheight = 168").unwrap();
        assert!(matches!(
            Config::read_from_path(file.path()),
            Err(ConfigError::DisplayTooLarge { width: 4_000_000_000, .. })
        ));

        let config = Config::load_from_path(file.path());
        assert_eq!(config.display.width, 144);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = Config::load_from_path("/nonexistent/path");
        // Should fallback to default
        assert_eq!(config.companion.request_interval_minutes, 30);
    }
}
