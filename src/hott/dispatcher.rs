//! # HoTT Request Dispatcher
//!
//! Interprets a completed two-byte poll and decides what, if anything, this
//! device answers with.

use std::time::Duration;

use tracing::debug;

use super::encoder::FrameBuilder;
use super::protocol::*;
use super::textmode::TextModeAdapter;
use crate::telemetry::SensorSnapshot;

/// Addressing scheme selected by the poll leader byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    Binary,
    Text,
    /// Anything else; the link is out of sync
    Invalid(u8),
}

/// A complete poll from the receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poll {
    pub mode_selector: u8,
    pub address: u8,
}

impl Poll {
    pub fn from_bytes(bytes: [u8; 2]) -> Self {
        Self {
            mode_selector: bytes[0],
            address: bytes[1],
        }
    }

    /// Classify the leader byte
    ///
    /// Binary polls are `0x80` on the wire but some receivers' upper bit reads
    /// back as zero, so `0x00` is accepted as binary too. Text mode (`0x7F`)
    /// is unaffected.
    pub fn mode(&self) -> PollMode {
        match self.mode_selector {
            0x00 | HOTT_BINARY_MODE_REQUEST_ID => PollMode::Binary,
            HOTT_TEXT_MODE_REQUEST_ID => PollMode::Text,
            other => PollMode::Invalid(other),
        }
    }
}

/// What the state machine should do with a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Send the named frame
    Respond(FrameKind),
    /// Not our address; stay silent
    NoMatch,
    /// Malformed leader byte; resync
    Garbage,
}

/// Owns the binary frame buffers and fills them on demand
#[derive(Debug, Clone)]
pub struct Dispatcher {
    builder: FrameBuilder,
    eam: EamMessage,
    gps: GpsMessage,
}

impl Dispatcher {
    pub fn new(builder: FrameBuilder) -> Self {
        Self {
            builder,
            eam: EamMessage::new(),
            gps: GpsMessage::new(),
        }
    }

    pub fn eam_message(&self) -> &EamMessage {
        &self.eam
    }

    pub fn gps_message(&self) -> &GpsMessage {
        &self.gps
    }

    /// Interpret a poll
    ///
    /// # Arguments
    ///
    /// * `poll` - The two received bytes
    /// * `textmode` - Text-mode adapter, when the menu overlay is available
    /// * `sensors` - Live sensor values for the response
    /// * `now` - Current time, used for the alarm cadence
    pub fn dispatch(
        &mut self,
        poll: Poll,
        textmode: Option<&mut TextModeAdapter>,
        sensors: &SensorSnapshot,
        now: Duration,
    ) -> PollOutcome {
        match poll.mode() {
            PollMode::Binary => self.process_binary_request(poll.address, textmode, sensors, now),
            PollMode::Text => match textmode {
                Some(adapter) => {
                    if adapter.process_request(poll.address) {
                        PollOutcome::Respond(FrameKind::Text)
                    } else {
                        PollOutcome::NoMatch
                    }
                }
                None => PollOutcome::NoMatch,
            },
            PollMode::Invalid(leader) => {
                debug!("Invalid HoTT poll leader 0x{:02X}", leader);
                PollOutcome::Garbage
            }
        }
    }

    fn process_binary_request(
        &mut self,
        address: u8,
        textmode: Option<&mut TextModeAdapter>,
        sensors: &SensorSnapshot,
        now: Duration,
    ) -> PollOutcome {
        if let Some(adapter) = textmode {
            adapter.end_session();
        }

        match address {
            HOTT_TELEMETRY_GPS_SENSOR_ID if self.builder.gps_available(sensors) => {
                self.builder.prepare_gps_response(&mut self.gps, sensors);
                PollOutcome::Respond(FrameKind::Gps)
            }
            HOTT_TELEMETRY_EAM_SENSOR_ID => {
                self.builder.prepare_eam_response(&mut self.eam, sensors, now);
                PollOutcome::Respond(FrameKind::Eam)
            }
            _ => PollOutcome::NoMatch,
        }
    }
}
