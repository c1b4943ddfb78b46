//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{HottError, Result};
use crate::hott::state_machine::{HottSettings, TimingPolicy};
use crate::hott::textmode::period_from_rate_hz;
use crate::serial::PortOptions;
use crate::telemetry::SensorSnapshot;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub serial: SerialConfig,
    pub hott: HottConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub textmode: TextModeConfig,

    /// Values served to the receiver
    #[serde(default)]
    pub sensors: SensorSnapshot,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    /// RX and TX share one wire
    #[serde(default = "default_half_duplex")]
    pub half_duplex: bool,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// How often a closed port is retried
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

/// HoTT protocol configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HottConfig {
    #[serde(default = "default_hott_enabled")]
    pub enabled: bool,

    #[serde(default = "default_task_rate_hz")]
    pub task_rate_hz: u32,

    /// Seconds between battery alarm checks (0 checks on every poll)
    #[serde(default = "default_alarm_sound_interval_s")]
    pub alarm_sound_interval_s: u64,

    /// Report an estimated position as a GPS fix
    #[serde(default)]
    pub gps_fix_estimation: bool,
}

/// Binary-mode wire timing
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct TimingConfig {
    #[serde(default = "default_rx_schedule_us")]
    pub rx_schedule_us: u64,

    #[serde(default = "default_tx_schedule_us")]
    pub tx_schedule_us: u64,

    #[serde(default = "default_tx_delay_us")]
    pub tx_delay_us: u64,
}

/// Text-mode (menu) configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct TextModeConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Task rate while a menu session is alive
    #[serde(default = "default_textmode_task_rate_hz")]
    pub task_rate_hz: u32,

    #[serde(default = "default_textmode_rx_schedule_us")]
    pub rx_schedule_us: u64,

    #[serde(default = "default_textmode_tx_delay_us")]
    pub tx_delay_us: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            rx_schedule_us: default_rx_schedule_us(),
            tx_schedule_us: default_tx_schedule_us(),
            tx_delay_us: default_tx_delay_us(),
        }
    }
}

impl Default for TextModeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            task_rate_hz: default_textmode_task_rate_hz(),
            rx_schedule_us: default_textmode_rx_schedule_us(),
            tx_delay_us: default_textmode_tx_delay_us(),
        }
    }
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_half_duplex() -> bool { true }
fn default_timeout_ms() -> u64 { 100 }
fn default_reconnect_interval_ms() -> u64 { 1000 }

fn default_hott_enabled() -> bool { true }
fn default_task_rate_hz() -> u32 { 500 }
fn default_alarm_sound_interval_s() -> u64 { 5 }

fn default_rx_schedule_us() -> u64 { 4000 }
fn default_tx_schedule_us() -> u64 { 5000 }
fn default_tx_delay_us() -> u64 { 2000 }

fn default_textmode_task_rate_hz() -> u32 { 1000 }
fn default_textmode_rx_schedule_us() -> u64 { 5000 }
fn default_textmode_tx_delay_us() -> u64 { 1000 }

fn config_error(msg: impl std::fmt::Display) -> HottError {
    HottError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use hott_telemetry::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(config_error("serial port cannot be empty"));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(config_error("timeout_ms must be between 1 and 10000"));
        }

        if self.serial.reconnect_interval_ms == 0 || self.serial.reconnect_interval_ms > 60000 {
            return Err(config_error("reconnect_interval_ms must be between 1 and 60000"));
        }

        // The inter-byte gap can't be honoured if the task runs slower than it
        if self.hott.task_rate_hz < 100 || self.hott.task_rate_hz > 2000 {
            return Err(config_error("hott task_rate_hz must be between 100 and 2000"));
        }

        if self.hott.alarm_sound_interval_s > 120 {
            return Err(config_error("alarm_sound_interval_s must be between 0 and 120"));
        }

        for (name, value) in [
            ("timing.rx_schedule_us", self.timing.rx_schedule_us),
            ("timing.tx_schedule_us", self.timing.tx_schedule_us),
            ("timing.tx_delay_us", self.timing.tx_delay_us),
            ("textmode.rx_schedule_us", self.textmode.rx_schedule_us),
            ("textmode.tx_delay_us", self.textmode.tx_delay_us),
        ] {
            if value == 0 || value > 100_000 {
                return Err(config_error(format!("{} must be between 1 and 100000", name)));
            }
        }

        if self.textmode.task_rate_hz < self.hott.task_rate_hz
            || self.textmode.task_rate_hz > 2000
        {
            return Err(config_error(
                "textmode task_rate_hz must be between the hott task_rate_hz and 2000",
            ));
        }

        Ok(())
    }

    /// Protocol settings derived from this configuration
    pub fn hott_settings(&self) -> HottSettings {
        HottSettings {
            port: PortOptions::hott(self.serial.half_duplex),
            timing: TimingPolicy {
                rx_timeout: Duration::from_micros(self.timing.rx_schedule_us),
                tx_delay: Duration::from_micros(self.timing.tx_delay_us),
            },
            text_timing: TimingPolicy {
                rx_timeout: Duration::from_micros(self.textmode.rx_schedule_us),
                tx_delay: Duration::from_micros(self.textmode.tx_delay_us),
            },
            tx_schedule: Duration::from_micros(self.timing.tx_schedule_us),
            alarm_interval: Duration::from_secs(self.hott.alarm_sound_interval_s),
            gps_fix_estimation: self.hott.gps_fix_estimation,
        }
    }

    /// Period of the telemetry task outside text mode
    pub fn task_period(&self) -> Duration {
        period_from_rate_hz(self.hott.task_rate_hz)
    }

    /// Period of the telemetry task while a menu session is alive
    pub fn textmode_task_period(&self) -> Duration {
        period_from_rate_hz(self.textmode.task_rate_hz)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.serial.reconnect_interval_ms)
    }

    pub fn port_timeout(&self) -> Duration {
        Duration::from_millis(self.serial.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::BatteryState;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> Config {
        Config {
            serial: SerialConfig {
                port: default_serial_port(),
                half_duplex: default_half_duplex(),
                timeout_ms: default_timeout_ms(),
                reconnect_interval_ms: default_reconnect_interval_ms(),
            },
            hott: HottConfig {
                enabled: default_hott_enabled(),
                task_rate_hz: default_task_rate_hz(),
                alarm_sound_interval_s: default_alarm_sound_interval_s(),
                gps_fix_estimation: false,
            },
            timing: TimingConfig::default(),
            textmode: TextModeConfig::default(),
            sensors: SensorSnapshot::default(),
        }
    }

    fn load_str(toml_content: &str) -> Result<Config> {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        Config::load(temp_file.path())
    }

    #[test]
    fn test_default_config() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_default_settings_match_protocol_timing() {
        let settings = create_valid_config().hott_settings();
        assert_eq!(settings, HottSettings::default());
    }

    #[test]
    fn test_load_minimal_config_from_file() {
        let config = load_str(
            r#"
[serial]
port = "/dev/ttyUSB0"

[hott]
"#,
        )
        .unwrap();

        assert!(config.hott.enabled);
        assert_eq!(config.hott.task_rate_hz, 500);
        assert_eq!(config.timing, TimingConfig::default());
        assert!(!config.textmode.enabled);
        assert_eq!(config.sensors, SensorSnapshot::default());
    }

    #[test]
    fn test_load_sensor_snapshot() {
        let config = load_str(
            r#"
[serial]
port = "/dev/ttyAMA0"
half_duplex = false

[hott]
gps_fix_estimation = true

[textmode]
enabled = true

[sensors]
battery_voltage_cv = 1260
amperage_ca = 1530
battery_state = "warning"
gps_present = true

[sensors.gps]
fix_type = "3d"
num_sat = 11
latitude = 473977420
"#,
        )
        .unwrap();

        assert!(!config.hott_settings().port.half_duplex);
        assert!(config.hott_settings().gps_fix_estimation);
        assert!(config.textmode.enabled);
        assert_eq!(config.sensors.battery_voltage_cv, 1260);
        assert_eq!(config.sensors.battery_state, BatteryState::Warning);
        assert_eq!(config.sensors.gps.num_sat, 11);
        assert_eq!(config.sensors.gps.latitude, 473_977_420);
    }

    #[test]
    fn test_missing_hott_section_is_rejected() {
        let result = load_str(
            r#"
[serial]
port = "/dev/ttyUSB0"
"#,
        );
        assert!(matches!(result, Err(HottError::Config(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = Config::load("/nonexistent/hott/config.toml");
        assert!(matches!(result, Err(HottError::Io(_))));
    }

    #[test]
    fn test_empty_serial_port() {
        let mut config = create_valid_config();
        config.serial.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_ms_zero() {
        let mut config = create_valid_config();
        config.serial.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reconnect_interval_too_high() {
        let mut config = create_valid_config();
        config.serial.reconnect_interval_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_task_rate_bounds() {
        let mut config = create_valid_config();
        config.hott.task_rate_hz = 50;
        assert!(config.validate().is_err());

        config.hott.task_rate_hz = 2001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_alarm_interval_zero_allowed() {
        let mut config = create_valid_config();
        config.hott.alarm_sound_interval_s = 0;
        assert!(config.validate().is_ok());

        config.hott.alarm_sound_interval_s = 121;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_tx_delay_rejected() {
        let mut config = create_valid_config();
        config.timing.tx_delay_us = 0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timing.tx_delay_us"));
    }

    #[test]
    fn test_textmode_rate_below_task_rate_rejected() {
        let mut config = create_valid_config();
        config.textmode.task_rate_hz = 250;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_task_periods() {
        let config = create_valid_config();
        assert_eq!(config.task_period(), Duration::from_micros(2000));
        assert_eq!(config.textmode_task_period(), Duration::from_micros(1000));
        assert_eq!(config.reconnect_interval(), Duration::from_secs(1));
        assert_eq!(config.port_timeout(), Duration::from_millis(100));
    }
}
