//! Transport abstraction: the byte channel underneath the RS-485 transceiver.
//!
//! Concrete implementations:
//! - ESP32 UART2 (8N1) wired to a MAX485 ([`Rs485Uart`](crate::adapters::uart::Rs485Uart))
//! - In-memory fakes in tests
//!
//! The transport knows nothing about bus direction; the
//! [`HalfDuplexTransceiver`](super::transceiver::HalfDuplexTransceiver)
//! owns that.

/// Byte-oriented transport channel.
pub trait Transport {
    /// Error type for this transport.
    type Error: core::fmt::Debug;

    /// Read up to `buf.len()` bytes into `buf`.
    /// Returns the number of bytes actually read.
    /// Returns 0 if no data is available (non-blocking).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write `data` to the transport.
    /// Returns the number of bytes actually written.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Block until every written byte has left the transmit FIFO.
    fn flush(&mut self) -> Result<(), Self::Error>;
}
