//! # HoTT Protocol Constants and Message Layouts
//!
//! Core protocol definitions for Graupner HoTT sensor telemetry.
//!
//! Binary response frames are fixed 44-byte layouts. Every frame starts with
//! [`HOTT_START_BYTE`] and ends with [`HOTT_STOP_BYTE`]; 16-bit values are sent
//! little-endian as separate low/high bytes. The trailing checksum is not part
//! of a message, it is appended by the transmit cursor.

/// HoTT serial baud rate (fixed by the receiver)
pub const HOTT_BAUD_RATE: u32 = 19_200;

/// Poll leader byte selecting binary (numeric telemetry) mode
pub const HOTT_BINARY_MODE_REQUEST_ID: u8 = 0x80;

/// Poll leader byte selecting text (menu) mode
pub const HOTT_TEXT_MODE_REQUEST_ID: u8 = 0x7F;

/// GPS module address
pub const HOTT_TELEMETRY_GPS_SENSOR_ID: u8 = 0x8A;

/// Electric Air Module address
pub const HOTT_TELEMETRY_EAM_SENSOR_ID: u8 = 0x8E;

/// GPS module text id (high nibble of the text-mode address)
pub const HOTT_GPS_SENSOR_TEXT_ID: u8 = 0xA0;

/// Electric Air Module text id (high nibble of the text-mode address)
pub const HOTT_EAM_SENSOR_TEXT_ID: u8 = 0xE0;

/// Binary frame start marker
pub const HOTT_START_BYTE: u8 = 0x7C;

/// Binary frame stop marker
pub const HOTT_STOP_BYTE: u8 = 0x7D;

/// Text-mode frame start marker
pub const HOTT_TEXTMODE_START: u8 = 0x7B;

/// Text-mode frame stop marker
pub const HOTT_TEXTMODE_STOP: u8 = 0x7D;

/// Esc byte value telling the receiver to leave the sensor menu
pub const HOTT_TEXTMODE_ESC: u8 = 0x01;

/// Text-mode screen rows
pub const HOTT_TEXTMODE_DISPLAY_ROWS: usize = 8;

/// Text-mode screen columns
pub const HOTT_TEXTMODE_DISPLAY_COLUMNS: usize = 21;

/// No EAM alarm
pub const HOTT_EAM_ALARM1_FLAG_NONE: u8 = 0;
/// Battery 1 voltage alarm
pub const HOTT_EAM_ALARM1_FLAG_BATTERY_1: u8 = 1 << 1;

/// Warning tone code played for a low battery
pub const HOTT_EAM_WARNING_BEEP_BATTERY: u8 = 0x10;

/// Altitude bias: a transmitted value of 500 means 0 m
pub const HOTT_ALTITUDE_OFFSET: i32 = 500;

/// Climb rate bias: 30000 means 0.00 m/s
pub const HOTT_CLIMBRATE_OFFSET: i32 = 30_000;

/// 3-second climb rate bias: 120 means 0 m/3s
pub const HOTT_CLIMBRATE_3S_OFFSET: i32 = 120;

/// EAM message length (without checksum)
pub const HOTT_EAM_MSG_LEN: usize = 44;

/// GPS message length (without checksum)
pub const HOTT_GPS_MSG_LEN: usize = 44;

/// Text-mode message length: start + esc + warning + grid + stop
pub const HOTT_TEXTMODE_MSG_LEN: usize =
    3 + HOTT_TEXTMODE_DISPLAY_ROWS * HOTT_TEXTMODE_DISPLAY_COLUMNS + 1;

// Fields shared by both binary layouts
const START: usize = 0;
const SENSOR_ID: usize = 1;
const WARNING_BEEPS: usize = 2;
const SENSOR_TEXT_ID: usize = 3;
const ALARM_INVERS1: usize = 4;
const STOP: usize = 43;

fn put_u16(bytes: &mut [u8], offset: usize, value: u16) {
    bytes[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn get_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

/// Which long-lived frame buffer a response lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Electric Air Module telemetry
    Eam,
    /// GPS telemetry
    Gps,
    /// Text-mode character grid
    Text,
}

/// GPS fix quality character shown on the transmitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GpsFixChar {
    None = b'-',
    Fix2D = b'2',
    Fix3D = b'3',
}

/// Electric Air Module message
///
/// Byte layout (0-based):
///
/// ```text
///  0 start (0x7C)        1 sensor id (0x8E)     2 warning beeps
///  3 text id (0xE0)      4 alarm invers 1       5 alarm invers 2
///  6-12 cell 1..7 low    13-19 cell 1..7 high   20-21 battery 1 voltage
/// 22-23 battery 2        24 temp 1              25 temp 2
/// 26-27 altitude         28-29 current          30-31 main voltage
/// 32-33 capacity         34-35 climb rate       36 climb rate 3s
/// 37-38 rpm              39 electric min        40 electric sec
/// 41-42 speed            43 stop (0x7D)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EamMessage {
    bytes: [u8; HOTT_EAM_MSG_LEN],
}

impl EamMessage {
    const BATT1_VOLTAGE: usize = 20;
    const ALTITUDE: usize = 26;
    const CURRENT: usize = 28;
    const MAIN_VOLTAGE: usize = 30;
    const BATT_CAP: usize = 32;
    const CLIMBRATE: usize = 34;
    const CLIMBRATE_3S: usize = 36;

    /// Create a zeroed message with start/stop markers and ids set
    pub fn new() -> Self {
        let mut bytes = [0u8; HOTT_EAM_MSG_LEN];
        bytes[START] = HOTT_START_BYTE;
        bytes[SENSOR_ID] = HOTT_TELEMETRY_EAM_SENSOR_ID;
        bytes[SENSOR_TEXT_ID] = HOTT_EAM_SENSOR_TEXT_ID;
        bytes[STOP] = HOTT_STOP_BYTE;
        Self { bytes }
    }

    /// Wire bytes of the message
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn warning_beeps(&self) -> u8 {
        self.bytes[WARNING_BEEPS]
    }

    pub fn set_warning_beeps(&mut self, value: u8) {
        self.bytes[WARNING_BEEPS] = value;
    }

    pub fn alarm_invers1(&self) -> u8 {
        self.bytes[ALARM_INVERS1]
    }

    pub fn set_alarm_invers1(&mut self, value: u8) {
        self.bytes[ALARM_INVERS1] = value;
    }

    /// Main (drive) voltage in 0.1 V
    pub fn main_voltage(&self) -> u16 {
        get_u16(&self.bytes, Self::MAIN_VOLTAGE)
    }

    pub fn set_main_voltage(&mut self, decivolts: u16) {
        put_u16(&mut self.bytes, Self::MAIN_VOLTAGE, decivolts);
    }

    /// Battery 1 voltage in 0.1 V
    pub fn batt1_voltage(&self) -> u16 {
        get_u16(&self.bytes, Self::BATT1_VOLTAGE)
    }

    pub fn set_batt1_voltage(&mut self, decivolts: u16) {
        put_u16(&mut self.bytes, Self::BATT1_VOLTAGE, decivolts);
    }

    /// Current in 0.1 A
    pub fn current(&self) -> u16 {
        get_u16(&self.bytes, Self::CURRENT)
    }

    pub fn set_current(&mut self, deciamps: u16) {
        put_u16(&mut self.bytes, Self::CURRENT, deciamps);
    }

    /// Drawn capacity in 10 mAh
    pub fn batt_cap(&self) -> u16 {
        get_u16(&self.bytes, Self::BATT_CAP)
    }

    pub fn set_batt_cap(&mut self, tens_of_mah: u16) {
        put_u16(&mut self.bytes, Self::BATT_CAP, tens_of_mah);
    }

    /// Altitude in metres, biased by [`HOTT_ALTITUDE_OFFSET`]
    pub fn altitude(&self) -> u16 {
        get_u16(&self.bytes, Self::ALTITUDE)
    }

    pub fn set_altitude(&mut self, value: u16) {
        put_u16(&mut self.bytes, Self::ALTITUDE, value);
    }

    /// Climb rate in cm/s, biased by [`HOTT_CLIMBRATE_OFFSET`]
    pub fn climbrate(&self) -> u16 {
        get_u16(&self.bytes, Self::CLIMBRATE)
    }

    pub fn set_climbrate(&mut self, value: u16) {
        put_u16(&mut self.bytes, Self::CLIMBRATE, value);
    }

    /// Climb over 3 s in metres, biased by [`HOTT_CLIMBRATE_3S_OFFSET`]
    pub fn climbrate3s(&self) -> u8 {
        self.bytes[Self::CLIMBRATE_3S]
    }

    pub fn set_climbrate3s(&mut self, value: u8) {
        self.bytes[Self::CLIMBRATE_3S] = value;
    }
}

impl Default for EamMessage {
    fn default() -> Self {
        Self::new()
    }
}

/// GPS module message
///
/// Byte layout (0-based):
///
/// ```text
///  0 start (0x7C)        1 sensor id (0x8A)     2 warning beeps
///  3 text id (0xA0)      4 alarm invers 1       5 alarm invers 2
///  6 flight direction    7-8 speed (km/h)       9 N/S flag
/// 10-11 lat deg*100+min  12-13 lat 1/10000 min  14 E/W flag
/// 15-16 lon deg*100+min  17-18 lon 1/10000 min  19-20 home distance
/// 21-22 altitude         23-24 climb rate       25 climb rate 3s
/// 26 satellites          27 fix char            28 home direction
/// 29-31 angles           32-35 gps time         36-37 msl altitude
/// 38 vibration           39-41 free             42 version
/// 43 stop (0x7D)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpsMessage {
    bytes: [u8; HOTT_GPS_MSG_LEN],
}

impl GpsMessage {
    const SPEED: usize = 7;
    const POS_NS: usize = 9;
    const POS_EW: usize = 14;
    const HOME_DISTANCE: usize = 19;
    const ALTITUDE: usize = 21;
    const CLIMBRATE: usize = 23;
    const CLIMBRATE_3S: usize = 25;
    const SATELLITES: usize = 26;
    const FIX_CHAR: usize = 27;
    const HOME_DIRECTION: usize = 28;

    /// Create a zeroed message with start/stop markers and ids set
    pub fn new() -> Self {
        let mut bytes = [0u8; HOTT_GPS_MSG_LEN];
        bytes[START] = HOTT_START_BYTE;
        bytes[SENSOR_ID] = HOTT_TELEMETRY_GPS_SENSOR_ID;
        bytes[SENSOR_TEXT_ID] = HOTT_GPS_SENSOR_TEXT_ID;
        bytes[STOP] = HOTT_STOP_BYTE;
        Self { bytes }
    }

    /// Wire bytes of the message
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn satellites(&self) -> u8 {
        self.bytes[Self::SATELLITES]
    }

    pub fn set_satellites(&mut self, count: u8) {
        self.bytes[Self::SATELLITES] = count;
    }

    pub fn fix_char(&self) -> u8 {
        self.bytes[Self::FIX_CHAR]
    }

    pub fn set_fix_char(&mut self, fix: GpsFixChar) {
        self.bytes[Self::FIX_CHAR] = fix as u8;
    }

    pub fn climbrate(&self) -> u16 {
        get_u16(&self.bytes, Self::CLIMBRATE)
    }

    pub fn set_climbrate(&mut self, value: u16) {
        put_u16(&mut self.bytes, Self::CLIMBRATE, value);
    }

    pub fn climbrate3s(&self) -> u8 {
        self.bytes[Self::CLIMBRATE_3S]
    }

    pub fn set_climbrate3s(&mut self, value: u8) {
        self.bytes[Self::CLIMBRATE_3S] = value;
    }

    /// Latitude as written on the wire
    pub fn latitude(&self) -> HottCoordinate {
        self.coordinate(Self::POS_NS)
    }

    pub fn set_latitude(&mut self, coordinate: HottCoordinate) {
        self.set_coordinate(Self::POS_NS, coordinate);
    }

    /// Longitude as written on the wire
    pub fn longitude(&self) -> HottCoordinate {
        self.coordinate(Self::POS_EW)
    }

    pub fn set_longitude(&mut self, coordinate: HottCoordinate) {
        self.set_coordinate(Self::POS_EW, coordinate);
    }

    /// Ground speed in km/h
    pub fn speed(&self) -> u16 {
        get_u16(&self.bytes, Self::SPEED)
    }

    pub fn set_speed(&mut self, kmh: u16) {
        put_u16(&mut self.bytes, Self::SPEED, kmh);
    }

    /// Distance to home in metres
    pub fn home_distance(&self) -> u16 {
        get_u16(&self.bytes, Self::HOME_DISTANCE)
    }

    pub fn set_home_distance(&mut self, metres: u16) {
        put_u16(&mut self.bytes, Self::HOME_DISTANCE, metres);
    }

    /// Altitude in metres, biased by [`HOTT_ALTITUDE_OFFSET`]
    pub fn altitude(&self) -> u16 {
        get_u16(&self.bytes, Self::ALTITUDE)
    }

    pub fn set_altitude(&mut self, value: u16) {
        put_u16(&mut self.bytes, Self::ALTITUDE, value);
    }

    /// Direction to home in 2 degree steps
    pub fn home_direction(&self) -> u8 {
        self.bytes[Self::HOME_DIRECTION]
    }

    pub fn set_home_direction(&mut self, value: u8) {
        self.bytes[Self::HOME_DIRECTION] = value;
    }

    fn coordinate(&self, offset: usize) -> HottCoordinate {
        HottCoordinate {
            negative: self.bytes[offset] != 0,
            degree_minutes: get_u16(&self.bytes, offset + 1),
            minute_fraction: get_u16(&self.bytes, offset + 3),
        }
    }

    fn set_coordinate(&mut self, offset: usize, coordinate: HottCoordinate) {
        self.bytes[offset] = coordinate.negative as u8;
        put_u16(&mut self.bytes, offset + 1, coordinate.degree_minutes);
        put_u16(&mut self.bytes, offset + 3, coordinate.minute_fraction);
    }
}

impl Default for GpsMessage {
    fn default() -> Self {
        Self::new()
    }
}

/// One GPS axis in HoTT encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HottCoordinate {
    /// South / West hemisphere
    pub negative: bool,
    /// Whole degrees * 100 + whole minutes
    pub degree_minutes: u16,
    /// Fraction of a minute in 1/10000 minute
    pub minute_fraction: u16,
}

/// Text-mode (menu) message
///
/// `[0x7B, esc, warning, rows x columns characters, 0x7D]`. The overlay draws
/// into the grid through [`TextModeMessage::write_char`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextModeMessage {
    bytes: [u8; HOTT_TEXTMODE_MSG_LEN],
}

impl TextModeMessage {
    const ESC: usize = 1;
    const WARNING: usize = 2;
    const GRID: usize = 3;

    /// Create a blank screen owned by the EAM text id
    pub fn new() -> Self {
        let mut bytes = [b' '; HOTT_TEXTMODE_MSG_LEN];
        bytes[START] = HOTT_TEXTMODE_START;
        bytes[Self::ESC] = HOTT_EAM_SENSOR_TEXT_ID;
        bytes[Self::WARNING] = 0;
        bytes[HOTT_TEXTMODE_MSG_LEN - 1] = HOTT_TEXTMODE_STOP;
        Self { bytes }
    }

    /// Wire bytes of the message
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn esc(&self) -> u8 {
        self.bytes[Self::ESC]
    }

    /// Whether the escape sentinel is currently armed
    pub fn is_exiting(&self) -> bool {
        self.esc() == HOTT_TEXTMODE_ESC
    }

    /// Keep the receiver in our menu
    pub fn grab(&mut self) {
        self.bytes[Self::ESC] = HOTT_EAM_SENSOR_TEXT_ID;
    }

    /// Ask the receiver to leave our menu
    pub fn exit(&mut self) {
        self.bytes[Self::ESC] = HOTT_TEXTMODE_ESC;
    }

    pub fn warning(&self) -> u8 {
        self.bytes[Self::WARNING]
    }

    pub fn set_warning(&mut self, value: u8) {
        self.bytes[Self::WARNING] = value;
    }

    /// Put one character on the grid; out-of-range positions are ignored
    pub fn write_char(&mut self, column: usize, row: usize, c: u8) {
        if column < HOTT_TEXTMODE_DISPLAY_COLUMNS && row < HOTT_TEXTMODE_DISPLAY_ROWS {
            self.bytes[Self::GRID + row * HOTT_TEXTMODE_DISPLAY_COLUMNS + column] = c;
        }
    }

    /// Write a string starting at `column`, clipped to the row
    pub fn write_str(&mut self, column: usize, row: usize, text: &str) {
        for (i, c) in text.bytes().enumerate() {
            self.write_char(column + i, row, c);
        }
    }

    /// Characters of one row
    pub fn row(&self, row: usize) -> &[u8] {
        let start = Self::GRID + row * HOTT_TEXTMODE_DISPLAY_COLUMNS;
        &self.bytes[start..start + HOTT_TEXTMODE_DISPLAY_COLUMNS]
    }

    /// Blank the whole grid
    pub fn clear(&mut self) {
        self.bytes[Self::GRID..HOTT_TEXTMODE_MSG_LEN - 1].fill(b' ');
    }
}

impl Default for TextModeMessage {
    fn default() -> Self {
        Self::new()
    }
}
