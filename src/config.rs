//! # Configuration Module
//!
//! Handles loading and validating the monitor configuration from TOML files.
//!
//! Every section and every field is optional; missing values take their
//! defaults and the result is validated before use.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::adapter::calibration::{AxisCalibration, MAX_DEADZONE};
use crate::adapter::feedback::FeedbackProfile;
use crate::error::Result;
use crate::report::protocol::Connection;
use crate::report::state::{Color, LedBrightness, MicLed, PlayerLedMask};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub adapter: AdapterConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Transport the monitor should pick when several controllers are attached
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PreferredConnection {
    #[default]
    Any,
    Usb,
    Bluetooth,
}

impl PreferredConnection {
    /// Whether a device on `connection` satisfies this preference
    pub fn accepts(self, connection: Connection) -> bool {
        match self {
            PreferredConnection::Any => true,
            PreferredConnection::Usb => connection == Connection::Usb,
            PreferredConnection::Bluetooth => connection == Connection::Bluetooth,
        }
    }
}

/// Device polling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    #[serde(default = "default_poll_rate_hz")]
    pub poll_rate_hz: u32,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    #[serde(default)]
    pub preferred_connection: PreferredConnection,
}

/// Output report configuration
#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_lightbar")]
    pub lightbar: [u8; 3],

    #[serde(default = "default_player_leds")]
    pub player_leds: u8,

    #[serde(default)]
    pub player_led_brightness: LedBrightness,

    #[serde(default)]
    pub mic_led: MicLed,

    #[serde(default = "default_rumble_from_triggers")]
    pub rumble_from_triggers: bool,

    #[serde(default)]
    pub trigger_resistance: bool,
}

/// Analog input configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AdapterConfig {
    #[serde(default = "default_deadzone_stick")]
    pub deadzone_stick: f32,

    #[serde(default = "default_deadzone_trigger")]
    pub deadzone_trigger: f32,
}

/// Input capture configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CaptureConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_capture_dir")]
    pub directory: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Empty logs to stdout only
    #[serde(default)]
    pub directory: String,
}

// Default value functions
fn default_poll_rate_hz() -> u32 { 250 }
fn default_reconnect_interval_ms() -> u64 { 1000 }

fn default_lightbar() -> [u8; 3] { [0, 0, 64] }
fn default_player_leds() -> u8 { 0x04 }
fn default_rumble_from_triggers() -> bool { true }

fn default_deadzone_stick() -> f32 { 0.05 }
fn default_deadzone_trigger() -> f32 { 0.10 }

fn default_capture_dir() -> String { "captures".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

fn default_log_level() -> String { "info".to_string() }

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            poll_rate_hz: default_poll_rate_hz(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            preferred_connection: PreferredConnection::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            lightbar: default_lightbar(),
            player_leds: default_player_leds(),
            player_led_brightness: LedBrightness::default(),
            mic_led: MicLed::default(),
            rumble_from_triggers: default_rumble_from_triggers(),
            trigger_resistance: false,
        }
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            deadzone_stick: default_deadzone_stick(),
            deadzone_trigger: default_deadzone_trigger(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: default_capture_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, `Config` if it cannot be
    /// parsed or a value is out of range.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ds5w::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Examples
    ///
    /// ```
    /// use ds5w::config::Config;
    ///
    /// let config = Config::from_toml_str("[device]\npoll_rate_hz = 500\n")?;
    /// assert_eq!(config.device.poll_rate_hz, 500);
    /// assert_eq!(config.device.reconnect_interval_ms, 1000);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Static feedback settings from the `[output]` section
    pub fn feedback_profile(&self) -> FeedbackProfile {
        let [r, g, b] = self.output.lightbar;
        FeedbackProfile {
            lightbar: Color::new(r, g, b),
            player_leds: PlayerLedMask::from_bits_truncate(self.output.player_leds),
            player_led_brightness: self.output.player_led_brightness,
            mic_led: self.output.mic_led,
            rumble_from_triggers: self.output.rumble_from_triggers,
            trigger_resistance: self.output.trigger_resistance,
        }
    }

    /// Deadzones from the `[adapter]` section
    pub fn axis_calibration(&self) -> AxisCalibration {
        AxisCalibration::from_config(self.adapter.deadzone_stick, self.adapter.deadzone_trigger)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        // Validate device polling
        if self.device.poll_rate_hz == 0 || self.device.poll_rate_hz > 1000 {
            return Err(crate::error::Ds5Error::Config(
                toml::de::Error::custom("poll_rate_hz must be between 1 and 1000")
            ));
        }

        if self.device.reconnect_interval_ms == 0 || self.device.reconnect_interval_ms > 60000 {
            return Err(crate::error::Ds5Error::Config(
                toml::de::Error::custom("reconnect_interval_ms must be between 1 and 60000")
            ));
        }

        // Five player LEDs
        if self.output.player_leds > PlayerLedMask::all().bits() {
            return Err(crate::error::Ds5Error::Config(
                toml::de::Error::custom("player_leds must be a bitmask between 0x00 and 0x1F")
            ));
        }

        // Validate deadzones
        if !(0.0..=MAX_DEADZONE).contains(&self.adapter.deadzone_stick) {
            return Err(crate::error::Ds5Error::Config(
                toml::de::Error::custom("deadzone_stick must be between 0.0 and 0.25")
            ));
        }

        if !(0.0..=MAX_DEADZONE).contains(&self.adapter.deadzone_trigger) {
            return Err(crate::error::Ds5Error::Config(
                toml::de::Error::custom("deadzone_trigger must be between 0.0 and 0.25")
            ));
        }

        // Validate capture
        if self.capture.enabled && self.capture.directory.is_empty() {
            return Err(crate::error::Ds5Error::Config(
                toml::de::Error::custom("capture directory cannot be empty when enabled")
            ));
        }

        if self.capture.max_records_per_file == 0 {
            return Err(crate::error::Ds5Error::Config(
                toml::de::Error::custom("max_records_per_file must be greater than 0")
            ));
        }

        if self.capture.max_files_to_keep == 0 {
            return Err(crate::error::Ds5Error::Config(
                toml::de::Error::custom("max_files_to_keep must be greater than 0")
            ));
        }

        // Validate log level
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(crate::error::Ds5Error::Config(
                toml::de::Error::custom(format!(
                    "log level '{}' must be one of: trace, debug, info, warn, error",
                    self.logging.level
                ))
            ));
        }

        Ok(())
    }
}
