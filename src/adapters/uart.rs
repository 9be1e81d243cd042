//! RS-485 UART adapter.
//!
//! Implements [`Transport`] over UART2 (8N1) wired to the MAX485 DI/RO
//! pins.  Direction control is not handled here; see
//! [`HalfDuplexTransceiver`](crate::protocol::transceiver::HalfDuplexTransceiver).
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::hal::uart::UartDriver`.
//!   Reads never block; `flush` waits for the TX FIFO to drain, which at
//!   115200 baud bounds the stall to ~11 ms for a full 128-byte frame.
//! - **all other targets**: an in-memory loopback for host-side tests.

use crate::protocol::transport::Transport;

#[cfg(target_os = "espidf")]
pub struct Rs485Uart {
    driver: esp_idf_svc::hal::uart::UartDriver<'static>,
}

#[cfg(target_os = "espidf")]
impl Rs485Uart {
    pub fn new(driver: esp_idf_svc::hal::uart::UartDriver<'static>) -> Self {
        Self { driver }
    }
}

#[cfg(target_os = "espidf")]
impl Transport for Rs485Uart {
    type Error = esp_idf_svc::sys::EspError;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.driver.read(buf, esp_idf_svc::hal::delay::NON_BLOCK)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        self.driver.write(data)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.driver.wait_tx_done(esp_idf_svc::hal::delay::BLOCK)
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation
// ───────────────────────────────────────────────────────────────

/// Host stand-in for UART2: bytes injected with [`sim_inject`](Self::sim_inject)
/// come back out of `read`; written bytes collect until taken.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct Rs485Uart {
    rx: std::collections::VecDeque<u8>,
    tx: Vec<u8>,
    flushes: u32,
}

#[cfg(not(target_os = "espidf"))]
impl Rs485Uart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes as if the peer had sent them.
    pub fn sim_inject(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    /// Take everything written so far.
    pub fn sim_take_tx(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.tx)
    }

    pub fn sim_flushes(&self) -> u32 {
        self.flushes
    }
}

#[cfg(not(target_os = "espidf"))]
impl Transport for Rs485Uart {
    type Error = core::convert::Infallible;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        self.tx.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.flushes += 1;
        Ok(())
    }
}
