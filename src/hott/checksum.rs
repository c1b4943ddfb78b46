//! # HoTT Checksum and Transmit Cursor
//!
//! HoTT frames are followed by a single checksum byte: the 8-bit wraparound
//! sum of every frame byte. The receiver needs a gap between bytes, so a frame
//! is drained one byte per call through a [`TxCursor`] that accumulates the
//! checksum as it goes.

use super::protocol::FrameKind;

/// Calculate the HoTT checksum of a complete frame
///
/// # Arguments
///
/// * `data` - Frame bytes (start marker through stop marker)
///
/// # Returns
///
/// * `u8` - Wrapping sum of all bytes
///
/// # Examples
///
/// ```
/// use hott_telemetry::hott::checksum::checksum;
///
/// assert_eq!(checksum(&[0x7C, 0x8E, 0x7D]), 0x87);
/// ```
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, &byte| sum.wrapping_add(byte))
}

/// One unit of transmit progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStep {
    /// A frame byte; more bytes follow
    Data(u8),
    /// The trailing checksum; the frame is complete
    Checksum(u8),
}

impl TxStep {
    /// Byte to put on the wire for this step
    pub fn byte(self) -> u8 {
        match self {
            TxStep::Data(b) | TxStep::Checksum(b) => b,
        }
    }

    pub fn is_complete(self) -> bool {
        matches!(self, TxStep::Checksum(_))
    }
}

/// In-flight position inside one of the long-lived frame buffers
///
/// The cursor only names the buffer by [`FrameKind`]; the bytes are passed in
/// on every step so the buffer is never aliased while it is being rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxCursor {
    frame: FrameKind,
    offset: usize,
    crc: u8,
}

impl TxCursor {
    pub fn new(frame: FrameKind) -> Self {
        Self {
            frame,
            offset: 0,
            crc: 0,
        }
    }

    pub fn frame(&self) -> FrameKind {
        self.frame
    }

    /// Bytes of `frame` already written (checksum excluded)
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Checksum accumulated so far
    pub fn checksum(&self) -> u8 {
        self.crc
    }

    pub fn reset_checksum(&mut self) {
        self.crc = 0;
    }

    /// Produce the next byte to send
    ///
    /// Yields every byte of `frame` in order, folding each into the running
    /// checksum, then the checksum itself.
    pub fn advance(&mut self, frame: &[u8]) -> TxStep {
        match frame.get(self.offset) {
            Some(&byte) => {
                self.crc = self.crc.wrapping_add(byte);
                self.offset += 1;
                TxStep::Data(byte)
            }
            None => TxStep::Checksum(self.crc),
        }
    }
}
