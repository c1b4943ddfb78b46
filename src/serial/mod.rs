//! # Serial Communication Module
//!
//! Handles the serial link to the HoTT receiver's telemetry port.
//!
//! This module handles:
//! - Opening the serial port at 19,200 baud (8N1)
//! - Non-blocking byte reads (only bytes already received are read)
//! - Single-byte writes paced by the protocol state machine
//! - Discarding received input after our own transmissions

pub mod port_trait;

use std::io::{self, Read, Write};
use std::time::Duration;

use tokio_serial::{ClearBuffer, SerialPort};
use tracing::{debug, info};

use crate::error::{HottError, Result};
use crate::hott::protocol::HOTT_BAUD_RATE;
use port_trait::{HottTransport, TransportProvider};

/// Line settings requested when the telemetry port is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortOptions {
    pub baud_rate: u32,
    /// Single wire shared for RX and TX
    pub half_duplex: bool,
    pub inverted: bool,
}

impl PortOptions {
    /// HoTT line settings: 19200 baud, not inverted
    pub fn hott(half_duplex: bool) -> Self {
        Self {
            baud_rate: HOTT_BAUD_RATE,
            half_duplex,
            inverted: false,
        }
    }
}

/// HoTT transport over a host serial port
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("name", &self.port.name())
            .finish_non_exhaustive()
    }
}

fn serial_io_error(e: tokio_serial::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

impl HottTransport for SerialTransport {
    fn bytes_available(&mut self) -> io::Result<usize> {
        self.port
            .bytes_to_read()
            .map(|n| n as usize)
            .map_err(serial_io_error)
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut byte = [0u8; 1];
        self.port.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.port.write_all(&[byte])
    }

    fn discard_input(&mut self) -> io::Result<()> {
        self.port.clear(ClearBuffer::Input).map_err(serial_io_error)
    }
}

/// Opens the configured serial device for HoTT telemetry
#[derive(Debug, Clone)]
pub struct SerialPortProvider {
    device_path: String,
    timeout: Duration,
}

impl SerialPortProvider {
    /// Create a provider for a device path
    ///
    /// # Arguments
    ///
    /// * `device_path` - Device path (e.g., "/dev/ttyUSB0")
    /// * `timeout` - Read/write timeout for the opened port
    pub fn new(device_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            device_path: device_path.into(),
            timeout,
        }
    }

    /// Get the configured device path
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

impl TransportProvider for SerialPortProvider {
    type Transport = SerialTransport;

    /// Open the serial port with HoTT settings
    ///
    /// `half_duplex` is informational only: a host UART cannot switch its
    /// line to single-wire mode, so RX and TX must be tied together (through
    /// a diode or resistor) outside the port. Our own echo is discarded by the
    /// protocol after each response.
    ///
    /// # Errors
    ///
    /// Returns `HottError::Serial` if the device cannot be opened or the
    /// options ask for an inverted line, which host UARTs cannot provide.
    fn open(&mut self, options: &PortOptions) -> Result<SerialTransport> {
        if options.inverted {
            return Err(HottError::Serial(format!(
                "Inverted signalling is not supported on {}",
                self.device_path
            )));
        }

        debug!(
            "Opening {} at {} baud ({})",
            self.device_path,
            options.baud_rate,
            if options.half_duplex { "half-duplex" } else { "full-duplex" }
        );

        let port = tokio_serial::new(&self.device_path, options.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(self.timeout)
            .open()
            .map_err(|e| HottError::Serial(format!("Failed to open {}: {}", self.device_path, e)))?;

        info!("Opened HoTT telemetry port {}", self.device_path);
        Ok(SerialTransport { port })
    }
}
