//! # HoTT Telemetry Protocol
//!
//! Graupner HoTT sensor emulation on the receiver's single-wire telemetry
//! bus (19200 baud, half duplex).
//!
//! The receiver polls with two bytes: a mode selector (`0x80` binary, `0x7F`
//! text) and a sensor address. This device answers as the Electric Air
//! Module (EAM, `0x8E`), as the GPS module (`0x8A`) when a GPS is available,
//! and optionally with a text-mode menu screen.
//!
//! Response frames are sent one byte at a time with an inter-byte gap,
//! followed by a checksum byte (wrapping sum of the frame).

pub mod checksum;
pub mod dispatcher;
pub mod encoder;
pub mod protocol;
pub mod state_machine;
pub mod textmode;

pub use state_machine::{HottSettings, HottState, HottTelemetry, TimingPolicy};
