//! # HoTT Frame Builder
//!
//! Fills the long-lived EAM and GPS messages from a [`SensorSnapshot`].
//!
//! Every dispatch rebuilds the addressed message in place. Signed values are
//! biased into unsigned ranges and floored at zero so the transmitter never
//! sees a wrapped negative.

use std::time::Duration;

use tracing::debug;

use super::protocol::*;
use crate::telemetry::{GpsFixType, SensorSnapshot};

/// 1e-7 degree units per degree
pub const GPS_DEGREES_DIVIDER: u32 = 10_000_000;

/// Builds response frames and tracks the battery alarm cadence
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    alarm_interval: Duration,
    gps_fix_estimation: bool,
    last_alarm_check: Option<Duration>,
}

impl FrameBuilder {
    /// Create a frame builder
    ///
    /// # Arguments
    ///
    /// * `alarm_interval` - Minimum time between battery alarm evaluations
    /// * `gps_fix_estimation` - Accept an estimated fix in place of a real one
    pub fn new(alarm_interval: Duration, gps_fix_estimation: bool) -> Self {
        Self {
            alarm_interval,
            gps_fix_estimation,
            last_alarm_check: None,
        }
    }

    /// Whether this device answers GPS polls
    pub fn gps_available(&self, sensors: &SensorSnapshot) -> bool {
        sensors.gps_present || self.estimated_fix_active(sensors)
    }

    fn estimated_fix_active(&self, sensors: &SensorSnapshot) -> bool {
        self.gps_fix_estimation && sensors.estimated_fix
    }

    /// Rebuild the EAM message from live values
    ///
    /// Alarm fields are cleared on every build and only raised when the alarm
    /// interval has elapsed since the previous battery evaluation.
    pub fn prepare_eam_response(
        &mut self,
        msg: &mut EamMessage,
        sensors: &SensorSnapshot,
        now: Duration,
    ) {
        msg.set_warning_beeps(HOTT_EAM_ALARM1_FLAG_NONE);
        msg.set_alarm_invers1(HOTT_EAM_ALARM1_FLAG_NONE);

        let decivolts = sensors.battery_voltage_cv / 10;
        msg.set_main_voltage(decivolts);
        msg.set_batt1_voltage(decivolts);
        self.update_alarm_battery_status(msg, sensors, now);

        msg.set_current(clamp_u16(sensors.amperage_ca / 10));
        msg.set_batt_cap(clamp_u16(sensors.mah_drawn / 10));

        msg.set_altitude(hott_altitude(sensors.altitude_cm));
        msg.set_climbrate(climbrate(sensors.vertical_speed_cms));
        msg.set_climbrate3s(climbrate_3s(sensors.vertical_speed_cms));
    }

    fn update_alarm_battery_status(
        &mut self,
        msg: &mut EamMessage,
        sensors: &SensorSnapshot,
        now: Duration,
    ) {
        let due = match self.last_alarm_check {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.alarm_interval,
        };
        if !due {
            return;
        }
        self.last_alarm_check = Some(now);

        if sensors.battery_state.is_alarm() {
            debug!(state = ?sensors.battery_state, "Raising EAM battery alarm");
            msg.set_warning_beeps(HOTT_EAM_WARNING_BEEP_BATTERY);
            msg.set_alarm_invers1(HOTT_EAM_ALARM1_FLAG_BATTERY_1);
        } else {
            msg.set_warning_beeps(HOTT_EAM_ALARM1_FLAG_NONE);
            msg.set_alarm_invers1(HOTT_EAM_ALARM1_FLAG_NONE);
        }
    }

    /// Rebuild the GPS message from live values
    ///
    /// Without a usable fix only the satellite count, climb rates and the fix
    /// character are refreshed; position fields keep their last values.
    pub fn prepare_gps_response(&self, msg: &mut GpsMessage, sensors: &SensorSnapshot) {
        let gps = &sensors.gps;
        msg.set_satellites(gps.num_sat);

        // Climb rate is reported regardless of fix
        msg.set_climbrate(climbrate(sensors.vertical_speed_cms));
        msg.set_climbrate3s(climbrate_3s(sensors.vertical_speed_cms));

        if !(gps.has_fix() || self.estimated_fix_active(sensors)) {
            msg.set_fix_char(GpsFixChar::None);
            return;
        }

        msg.set_fix_char(if gps.fix_type == GpsFixType::Fix3D {
            GpsFixChar::Fix3D
        } else {
            GpsFixChar::Fix2D
        });

        msg.set_latitude(encode_coordinate(gps.latitude));
        msg.set_longitude(encode_coordinate(gps.longitude));
        msg.set_speed(ground_speed_kmh(gps.ground_speed_cms));
        msg.set_home_distance(gps.distance_to_home_m.min(u16::MAX as u32) as u16);
        msg.set_altitude(hott_gps_altitude(gps.altitude_cm));
        msg.set_home_direction(home_direction(gps.direction_to_home_deg));
    }
}

fn clamp_u16(value: i32) -> u16 {
    value.clamp(0, u16::MAX as i32) as u16
}

/// Altitude in cm to biased HoTT metres
pub fn hott_altitude(altitude_cm: i32) -> u16 {
    clamp_u16(altitude_cm.div_euclid(100).saturating_add(HOTT_ALTITUDE_OFFSET))
}

/// GPS altitude in cm to biased HoTT metres
///
/// Whole metres truncate toward zero, unlike [`hott_altitude`] which rounds
/// down.
pub fn hott_gps_altitude(altitude_cm: i32) -> u16 {
    clamp_u16((altitude_cm / 100).saturating_add(HOTT_ALTITUDE_OFFSET))
}

/// Vertical speed in cm/s to biased HoTT climb rate
pub fn climbrate(vertical_speed_cms: i32) -> u16 {
    clamp_u16(vertical_speed_cms.saturating_add(HOTT_CLIMBRATE_OFFSET))
}

/// Vertical speed in cm/s to biased metres per 3 seconds
pub fn climbrate_3s(vertical_speed_cms: i32) -> u8 {
    let climb = vertical_speed_cms.saturating_mul(3).div_euclid(100) + HOTT_CLIMBRATE_3S_OFFSET;
    climb.clamp(0, u8::MAX as i32) as u8
}

/// Ground speed in cm/s to km/h
pub fn ground_speed_kmh(ground_speed_cms: u32) -> u16 {
    (ground_speed_cms as u64 * 36 / 1000).min(u16::MAX as u64) as u16
}

/// Bearing in degrees to HoTT 2 degree steps
pub fn home_direction(degrees: i32) -> u8 {
    (degrees.rem_euclid(360) / 2) as u8
}

/// Encode a 1e-7 degree coordinate into HoTT degrees/minutes form
///
/// The magnitude is split into whole degrees, whole minutes and
/// ten-thousandths of a minute; the sign goes into the hemisphere flag.
///
/// # Examples
///
/// ```
/// use hott_telemetry::hott::encoder::encode_coordinate;
///
/// let lat = encode_coordinate(471_234_567); // 47.1234567 N
/// assert!(!lat.negative);
/// assert_eq!(lat.degree_minutes, 4707);
/// assert_eq!(lat.minute_fraction, 4074);
/// ```
pub fn encode_coordinate(value: i32) -> HottCoordinate {
    let magnitude = value.unsigned_abs();
    let degrees = magnitude / GPS_DEGREES_DIVIDER;
    // Remainder in millionths of a minute
    let minutes_e6 = (magnitude % GPS_DEGREES_DIVIDER) * 6;
    let minutes = minutes_e6 / 1_000_000;
    let fraction = (minutes_e6 % 1_000_000) / 100;

    HottCoordinate {
        negative: value < 0,
        degree_minutes: (degrees * 100 + minutes) as u16,
        minute_fraction: fraction as u16,
    }
}

/// Decode a HoTT coordinate back into 1e-7 degrees
///
/// Resolution is 1/10000 minute, so the result can differ from the encoded
/// value by up to 17 units.
pub fn decode_coordinate(coordinate: HottCoordinate) -> i32 {
    let degrees = (coordinate.degree_minutes / 100) as i64;
    let minutes = (coordinate.degree_minutes % 100) as i64;
    let minutes_e6 = minutes * 1_000_000 + coordinate.minute_fraction as i64 * 100;
    let magnitude = degrees * GPS_DEGREES_DIVIDER as i64 + minutes_e6 / 6;

    if coordinate.negative {
        -magnitude as i32
    } else {
        magnitude as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{BatteryState, GpsSolution};

    const SECOND: Duration = Duration::from_secs(1);

    fn builder() -> FrameBuilder {
        FrameBuilder::new(Duration::from_secs(5), false)
    }

    fn fixed_gps() -> SensorSnapshot {
        SensorSnapshot {
            gps_present: true,
            vertical_speed_cms: 150,
            gps: GpsSolution {
                fix_type: GpsFixType::Fix3D,
                num_sat: 11,
                latitude: 471_234_567,
                longitude: -85_432_100,
                altitude_cm: 42_000,
                ground_speed_cms: 1_000,
                distance_to_home_m: 321,
                direction_to_home_deg: 270,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_eam_battery_and_current() {
        let sensors = SensorSnapshot {
            battery_voltage_cv: 1_684,
            amperage_ca: 1_255,
            mah_drawn: 1_337,
            ..Default::default()
        };
        let mut msg = EamMessage::new();
        builder().prepare_eam_response(&mut msg, &sensors, Duration::ZERO);

        assert_eq!(msg.main_voltage(), 168);
        assert_eq!(msg.batt1_voltage(), 168);
        assert_eq!(msg.current(), 125);
        assert_eq!(msg.batt_cap(), 133);
    }

    #[test]
    fn test_eam_negative_values_floor_at_zero() {
        let sensors = SensorSnapshot {
            amperage_ca: -500,
            altitude_cm: -80_000,
            vertical_speed_cms: -40_000,
            ..Default::default()
        };
        let mut msg = EamMessage::new();
        builder().prepare_eam_response(&mut msg, &sensors, Duration::ZERO);

        assert_eq!(msg.current(), 0);
        assert_eq!(msg.altitude(), 0);
        assert_eq!(msg.climbrate(), 0);
        assert_eq!(msg.climbrate3s(), 0);
    }

    #[test]
    fn test_eam_altitude_and_climb_bias() {
        let sensors = SensorSnapshot {
            altitude_cm: 12_345,
            vertical_speed_cms: 250,
            ..Default::default()
        };
        let mut msg = EamMessage::new();
        builder().prepare_eam_response(&mut msg, &sensors, Duration::ZERO);

        assert_eq!(msg.altitude(), 623);
        assert_eq!(msg.climbrate(), 30_250);
        assert_eq!(msg.climbrate3s(), 127);
    }

    #[test]
    fn test_alarm_raised_for_critical_battery() {
        let sensors = SensorSnapshot {
            battery_state: BatteryState::Critical,
            ..Default::default()
        };
        let mut msg = EamMessage::new();
        builder().prepare_eam_response(&mut msg, &sensors, 10 * SECOND);

        assert_eq!(msg.warning_beeps(), HOTT_EAM_WARNING_BEEP_BATTERY);
        assert_eq!(msg.alarm_invers1(), HOTT_EAM_ALARM1_FLAG_BATTERY_1);
    }

    #[test]
    fn test_alarm_cleared_for_healthy_battery() {
        let mut builder = builder();
        let mut msg = EamMessage::new();
        let critical = SensorSnapshot {
            battery_state: BatteryState::Critical,
            ..Default::default()
        };
        builder.prepare_eam_response(&mut msg, &critical, Duration::ZERO);

        let healthy = SensorSnapshot::default();
        builder.prepare_eam_response(&mut msg, &healthy, 5 * SECOND);

        assert_eq!(msg.warning_beeps(), 0);
        assert_eq!(msg.alarm_invers1(), 0);
    }

    #[test]
    fn test_alarm_respects_interval() {
        let mut builder = builder();
        let mut msg = EamMessage::new();
        let warning = SensorSnapshot {
            battery_state: BatteryState::Warning,
            ..Default::default()
        };

        builder.prepare_eam_response(&mut msg, &warning, Duration::ZERO);
        assert_eq!(msg.warning_beeps(), HOTT_EAM_WARNING_BEEP_BATTERY);

        // Inside the interval the alarm is reset and not re-evaluated
        builder.prepare_eam_response(&mut msg, &warning, 2 * SECOND);
        assert_eq!(msg.warning_beeps(), 0);
        assert_eq!(msg.alarm_invers1(), 0);

        builder.prepare_eam_response(&mut msg, &warning, 5 * SECOND);
        assert_eq!(msg.warning_beeps(), HOTT_EAM_WARNING_BEEP_BATTERY);
        assert_eq!(msg.alarm_invers1(), HOTT_EAM_ALARM1_FLAG_BATTERY_1);
    }

    #[test]
    fn test_gps_with_3d_fix() {
        let sensors = fixed_gps();
        let mut msg = GpsMessage::new();
        builder().prepare_gps_response(&mut msg, &sensors);

        assert_eq!(msg.fix_char(), b'3');
        assert_eq!(msg.satellites(), 11);
        assert_eq!(msg.speed(), 36);
        assert_eq!(msg.home_distance(), 321);
        assert_eq!(msg.altitude(), 920);
        assert_eq!(msg.home_direction(), 135);
        assert_eq!(msg.climbrate(), 30_150);
        assert_eq!(msg.climbrate3s(), 124);
        assert!(!msg.latitude().negative);
        assert!(msg.longitude().negative);
        assert_eq!(msg.latitude().degree_minutes, 4707);
    }

    #[test]
    fn test_gps_2d_fix_char() {
        let mut sensors = fixed_gps();
        sensors.gps.fix_type = GpsFixType::Fix2D;
        let mut msg = GpsMessage::new();
        builder().prepare_gps_response(&mut msg, &sensors);

        assert_eq!(msg.fix_char(), b'2');
    }

    #[test]
    fn test_gps_without_fix_keeps_last_position() {
        let builder = builder();
        let mut msg = GpsMessage::new();
        builder.prepare_gps_response(&mut msg, &fixed_gps());
        let last_lat = msg.latitude();

        let mut lost = fixed_gps();
        lost.gps.fix_type = GpsFixType::None;
        lost.gps.num_sat = 3;
        lost.gps.latitude = 0;
        builder.prepare_gps_response(&mut msg, &lost);

        assert_eq!(msg.fix_char(), b'-');
        assert_eq!(msg.satellites(), 3);
        assert_eq!(msg.latitude(), last_lat);
    }

    #[test]
    fn test_gps_estimated_fix_fallback() {
        let sensors = SensorSnapshot {
            estimated_fix: true,
            gps: GpsSolution {
                latitude: 100_000_000,
                ..Default::default()
            },
            ..Default::default()
        };

        let strict = FrameBuilder::new(Duration::from_secs(5), false);
        assert!(!strict.gps_available(&sensors));

        let estimating = FrameBuilder::new(Duration::from_secs(5), true);
        assert!(estimating.gps_available(&sensors));

        let mut msg = GpsMessage::new();
        estimating.prepare_gps_response(&mut msg, &sensors);
        assert_eq!(msg.fix_char(), b'2');
        assert_eq!(msg.latitude().degree_minutes, 1000);
    }

    #[test]
    fn test_coordinate_round_trip() {
        for value in [
            0,
            1,
            -1,
            471_234_567,
            -471_234_567,
            -85_432_100,
            899_999_999,
            -1_799_999_999,
            1_800_000_000,
        ] {
            let encoded = encode_coordinate(value);
            assert_eq!(encoded.negative, value < 0);

            let decoded = decode_coordinate(encoded);
            assert!(
                (decoded as i64 - value as i64).abs() <= 17,
                "{} decoded as {}",
                value,
                decoded
            );
        }
    }

    #[test]
    fn test_coordinate_split() {
        // 12.5 degrees = 12 degrees 30 minutes
        let encoded = encode_coordinate(125_000_000);
        assert_eq!(encoded.degree_minutes, 1230);
        assert_eq!(encoded.minute_fraction, 0);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(ground_speed_kmh(2_778), 100);
        assert_eq!(ground_speed_kmh(u32::MAX), u16::MAX);
        assert_eq!(home_direction(-90), 135);
        assert_eq!(home_direction(360), 0);
        assert_eq!(hott_altitude(-50), 499);
        assert_eq!(hott_altitude(-150), 498);
        assert_eq!(climbrate_3s(-10), 119);
        assert_eq!(climbrate(i32::MAX), u16::MAX);
    }

    #[test]
    fn test_gps_altitude_truncates_toward_zero() {
        assert_eq!(hott_gps_altitude(-150), 499);
        assert_eq!(hott_gps_altitude(-99), 500);
        assert_eq!(hott_gps_altitude(12_345), 623);
        assert_eq!(hott_gps_altitude(-100_000), 0);
    }
}
