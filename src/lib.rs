//! # HoTT Telemetry Library
//!
//! Graupner HoTT sensor emulation for a single-wire receiver telemetry link.
//!
//! This library answers the receiver's polls as an Electric Air Module and a
//! GPS module, and can serve a text-mode status menu to the transmitter.

pub mod config;
pub mod error;
pub mod hott;
pub mod overlay;
pub mod serial;
pub mod telemetry;
