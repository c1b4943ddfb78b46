//! Trait abstraction for the HoTT byte transport to enable testing

use std::io;

use super::PortOptions;
use crate::error::Result;

/// Non-blocking byte transport on the shared HoTT wire
pub trait HottTransport {
    /// Number of received bytes that can be read without blocking
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Read one received byte
    fn read_byte(&mut self) -> io::Result<u8>;

    /// Write one byte
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;

    /// Drop everything received so far
    fn discard_input(&mut self) -> io::Result<()> {
        while self.bytes_available()? > 0 {
            self.read_byte()?;
        }
        Ok(())
    }
}

/// Opens transports on demand; dropping a transport closes it
pub trait TransportProvider {
    type Transport: HottTransport;

    fn open(&mut self, options: &PortOptions) -> Result<Self::Transport>;
}
