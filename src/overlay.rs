//! # Status Overlay
//!
//! Built-in text-mode menu: a few read-only pages of live sensor values,
//! drawn into the 8x21 HoTT text grid.
//!
//! Keys: Up/Down (and Right) page through the screens, Left leaves the menu.

use tracing::debug;

use crate::hott::protocol::{TextModeMessage, HOTT_TEXTMODE_DISPLAY_ROWS};
use crate::hott::textmode::{MenuKey, TextOverlay};
use crate::telemetry::{BatteryState, GpsFixType, SensorSource};

/// Pages shown by [`StatusOverlay`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPage {
    Battery,
    Flight,
    Gps,
}

impl StatusPage {
    const ALL: [StatusPage; 3] = [StatusPage::Battery, StatusPage::Flight, StatusPage::Gps];

    fn index(self) -> usize {
        match self {
            StatusPage::Battery => 0,
            StatusPage::Flight => 1,
            StatusPage::Gps => 2,
        }
    }

    fn title(self) -> &'static str {
        match self {
            StatusPage::Battery => "BATTERY",
            StatusPage::Flight => "FLIGHT",
            StatusPage::Gps => "GPS",
        }
    }

    fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Read-only sensor status menu
pub struct StatusOverlay<S> {
    source: S,
    page: StatusPage,
}

impl<S: SensorSource> StatusOverlay<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            page: StatusPage::Battery,
        }
    }

    pub fn page(&self) -> StatusPage {
        self.page
    }

    fn render(&self, screen: &mut TextModeMessage) {
        let sensors = self.source.snapshot();
        screen.clear();

        screen.write_str(0, 0, self.page.title());
        screen.write_str(
            17,
            0,
            &format!("{}/{}", self.page.index() + 1, StatusPage::ALL.len()),
        );

        match self.page {
            StatusPage::Battery => {
                let volts = f32::from(sensors.battery_voltage_cv) / 100.0;
                let amps = sensors.amperage_ca as f32 / 100.0;
                screen.write_str(0, 2, &format!("Voltage {:>8.2} V", volts));
                screen.write_str(0, 3, &format!("Current {:>8.2} A", amps));
                screen.write_str(0, 4, &format!("Used    {:>6} mAh", sensors.mah_drawn));
                screen.write_str(0, 5, &format!("State   {:>8}", battery_label(sensors.battery_state)));
            }
            StatusPage::Flight => {
                let altitude = sensors.altitude_cm as f32 / 100.0;
                let vario = sensors.vertical_speed_cms as f32 / 100.0;
                screen.write_str(0, 2, &format!("Altitude {:>7.1} m", altitude));
                screen.write_str(0, 3, &format!("Vario    {:>7.2} m/s", vario));
            }
            StatusPage::Gps if !sensors.gps_present => {
                screen.write_str(0, 3, "No GPS");
            }
            StatusPage::Gps => {
                let gps = &sensors.gps;
                let fix = match gps.fix_type {
                    GpsFixType::None => "--",
                    GpsFixType::Fix2D => "2D",
                    GpsFixType::Fix3D => "3D",
                };
                screen.write_str(0, 2, &format!("Fix {}     Sats {:>3}", fix, gps.num_sat));
                screen.write_str(0, 3, &format!("Lat {:>13.7}", gps.latitude as f64 / 1e7));
                screen.write_str(0, 4, &format!("Lon {:>13.7}", gps.longitude as f64 / 1e7));
                screen.write_str(
                    0,
                    5,
                    &format!(
                        "Home {:>5} m {:>4} deg",
                        gps.distance_to_home_m, gps.direction_to_home_deg
                    ),
                );
            }
        }

        screen.write_str(0, HOTT_TEXTMODE_DISPLAY_ROWS - 1, "<EXIT   UP/DN PAGE");
    }
}

fn battery_label(state: BatteryState) -> &'static str {
    match state {
        BatteryState::Ok => "OK",
        BatteryState::Warning => "WARNING",
        BatteryState::Critical => "CRITICAL",
        BatteryState::NotPresent => "NONE",
    }
}

impl<S: SensorSource> TextOverlay for StatusOverlay<S> {
    fn open(&mut self, screen: &mut TextModeMessage) {
        self.render(screen);
    }

    fn key_press(&mut self, key: MenuKey, exiting: bool, screen: &mut TextModeMessage) {
        if exiting {
            return;
        }

        match key {
            MenuKey::Up => self.page = self.page.prev(),
            MenuKey::Down | MenuKey::Right => self.page = self.page.next(),
            MenuKey::Left => {
                debug!("Status menu closed");
                screen.exit();
                return;
            }
            MenuKey::Save | MenuKey::None => {}
        }
        self.render(screen);
    }
}
