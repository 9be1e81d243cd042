//! Unified error types for the VexBridge firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! scheduler loop's error handling uniform.  All variants are `Copy` so
//! they can be passed through the bridge service and logged without
//! allocation.
//!
//! None of these are fatal: the bridge degrades to a no-op for the tick
//! that produced the error and the scheduler keeps running.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The RS-485 bus could not be driven or read.
    Bus(BusError),
    /// The load cell could not be read.
    Sensor(SensorError),
    /// Network link or publish client failure.
    Comms(CommsError),
    /// A message could not be encoded onto the wire.
    Codec(CodecError),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Codec(e) => write!(f, "codec: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The DE/RE direction line could not be switched.
    DirectionPin,
    /// The UART rejected a write.
    WriteFailed,
    /// The UART accepted zero bytes of a non-empty write.
    WriteStalled,
    /// The UART could not drain its transmit FIFO.
    FlushFailed,
    /// The UART reported a receive error.
    ReadFailed,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectionPin => write!(f, "DE/RE pin write failed"),
            Self::WriteFailed => write!(f, "UART write failed"),
            Self::WriteStalled => write!(f, "UART write stalled"),
            Self::FlushFailed => write!(f, "UART flush failed"),
            Self::ReadFailed => write!(f, "UART read failed"),
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The HX711 did not signal data-ready within the allowed time.
    NotReady,
    /// A GPIO read or write on the HX711 clock/data lines failed.
    GpioFailed,
    /// Averaging was requested over zero samples.
    NoSamples,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => write!(f, "load cell not ready"),
            Self::GpioFailed => write!(f, "load cell GPIO failed"),
            Self::NoSamples => write!(f, "zero samples requested"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    NoCredentials,
    /// SSID or password fails WPA2 length/charset rules.
    InvalidCredentials,
    ConnectFailed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidCredentials => write!(f, "WiFi credentials invalid"),
            Self::ConnectFailed => write!(f, "MQTT connect failed"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Codec errors
// ---------------------------------------------------------------------------

/// Encoding failures.  In a validated configuration these never occur at
/// runtime; [`BridgeConfig::validate`](crate::config::BridgeConfig::validate)
/// rejects configurations where they could.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// The encoded frame would not fit the transmit buffer.
    Oversize,
    /// Status text contains a frame marker or the field separator.
    ReservedCharacter,
    /// Status text contains a byte outside printable ASCII.
    NonPrintable,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oversize => write!(f, "frame exceeds transmit buffer"),
            Self::ReservedCharacter => write!(f, "text contains '<', '>' or '|'"),
            Self::NonPrintable => write!(f, "text is not printable ASCII"),
        }
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
