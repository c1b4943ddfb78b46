//! # Telemetry Sources
//!
//! Sensor values fed into HoTT response frames.
//!
//! The protocol driver does not compute battery, GPS or altitude values
//! itself; it asks a [`SensorSource`] for a [`SensorSnapshot`] each time a
//! poll is dispatched. Units follow the flight controller conventions the
//! frame builder converts from (centi-volts, centi-amps, centimetres, 1e-7
//! degrees).

use serde::Deserialize;

/// Battery health classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatteryState {
    #[default]
    Ok,
    Warning,
    Critical,
    NotPresent,
}

impl BatteryState {
    /// Whether the battery should raise an alarm on the transmitter
    pub fn is_alarm(self) -> bool {
        matches!(self, BatteryState::Warning | BatteryState::Critical)
    }
}

/// GPS fix type as reported by the receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpsFixType {
    #[default]
    None,
    #[serde(rename = "2d")]
    Fix2D,
    #[serde(rename = "3d")]
    Fix3D,
}

/// Latest GPS solution
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct GpsSolution {
    pub fix_type: GpsFixType,

    pub num_sat: u8,

    /// Latitude in 1e-7 degrees
    pub latitude: i32,

    /// Longitude in 1e-7 degrees
    pub longitude: i32,

    /// Altitude above sea level in cm
    pub altitude_cm: i32,

    /// Ground speed in cm/s
    pub ground_speed_cms: u32,

    pub distance_to_home_m: u32,

    /// Bearing to home in degrees
    pub direction_to_home_deg: i32,
}

impl GpsSolution {
    pub fn has_fix(&self) -> bool {
        self.fix_type != GpsFixType::None
    }
}

/// Everything a HoTT response needs, sampled at dispatch time
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct SensorSnapshot {
    /// Battery voltage in 10 mV
    pub battery_voltage_cv: u16,

    /// Current draw in 10 mA
    pub amperage_ca: i32,

    /// Consumed capacity in mAh
    pub mah_drawn: i32,

    pub battery_state: BatteryState,

    /// Estimated altitude in cm
    pub altitude_cm: i32,

    /// Estimated vertical speed in cm/s
    pub vertical_speed_cms: i32,

    /// A GPS receiver is configured and detected
    pub gps_present: bool,

    /// Navigation is running on an estimated (dead-reckoning) fix
    pub estimated_fix: bool,

    pub gps: GpsSolution,
}

/// Producer of sensor values
pub trait SensorSource {
    fn snapshot(&self) -> SensorSnapshot;
}

impl SensorSource for SensorSnapshot {
    fn snapshot(&self) -> SensorSnapshot {
        *self
    }
}
