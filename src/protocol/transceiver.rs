//! Half-duplex RS-485 transceiver control.
//!
//! The MAX485 shares one differential pair for both directions; its
//! DE/RE line selects which.  This controller owns that line together
//! with the UART so that a transmit window and a receive window can never
//! overlap:
//!
//! ```text
//!  transmit():  DE/RE ↑ ─ turnaround ─ write … flush ─ DE/RE ↓
//!  receive():   only while DE/RE is low
//! ```
//!
//! The drive window is a scoped acquisition: whatever happens between
//! raising and lowering the line (write error, stalled FIFO, panic), the
//! line is lowered before control leaves [`HalfDuplexTransceiver::transmit`].

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{error, warn};

use super::transport::Transport;
use crate::app::ports::BusPort;
use crate::error::BusError;

/// Which way the bus is currently pointed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Receiver enabled, driver high-impedance.
    Listen,
    /// Driver enabled, receiver disabled.
    Drive,
}

/// Owns the UART and the DE/RE line of one half-duplex bus.
pub struct HalfDuplexTransceiver<T, P, D> {
    transport: T,
    de_re: P,
    delay: D,
    turnaround_us: u32,
    direction: Direction,
}

impl<T, P, D> HalfDuplexTransceiver<T, P, D>
where
    T: Transport,
    P: OutputPin,
    D: DelayNs,
{
    /// Take ownership of the bus and put it in listen mode.
    pub fn new(transport: T, de_re: P, delay: D, turnaround_us: u32) -> Result<Self, BusError> {
        let mut this = Self {
            transport,
            de_re,
            delay,
            turnaround_us,
            direction: Direction::Drive,
        };
        this.release()?;
        Ok(this)
    }

    /// Drive `frame` onto the bus and return to listen mode.
    ///
    /// Blocks only until the UART reports its FIFO drained.  The bus is
    /// back in listen mode on return, on success and on failure alike;
    /// if the DE/RE line itself cannot be lowered the error is reported
    /// and the next bus operation retries the release.
    pub fn transmit(&mut self, frame: &[u8]) -> Result<usize, BusError> {
        if frame.is_empty() {
            return Ok(0);
        }
        self.release()?;

        let window = DriveWindow::open(&mut self.de_re, &mut self.direction)?;
        if self.turnaround_us > 0 {
            self.delay.delay_us(self.turnaround_us);
        }
        let outcome = write_all(&mut self.transport, frame).and_then(|n| {
            self.transport.flush().map(|()| n).map_err(|e| {
                warn!("RS485: flush failed: {:?}", e);
                BusError::FlushFailed
            })
        });
        let released = window.close();

        let written = outcome?;
        released?;
        Ok(written)
    }

    /// Non-blocking read of whatever the UART has buffered.
    pub fn receive(&mut self, buf: &mut [u8]) -> Result<usize, BusError> {
        self.release()?;
        self.transport.read(buf).map_err(|e| {
            warn!("RS485: read failed: {:?}", e);
            BusError::ReadFailed
        })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Ensure listen mode; a no-op when already listening.
    fn release(&mut self) -> Result<(), BusError> {
        if self.direction == Direction::Listen {
            return Ok(());
        }
        self.de_re.set_low().map_err(|e| {
            error!("RS485: cannot release bus: {:?}", e);
            BusError::DirectionPin
        })?;
        self.direction = Direction::Listen;
        Ok(())
    }
}

impl<T, P, D> BusPort for HalfDuplexTransceiver<T, P, D>
where
    T: Transport,
    P: OutputPin,
    D: DelayNs,
{
    fn transmit(&mut self, frame: &[u8]) -> Result<usize, BusError> {
        HalfDuplexTransceiver::transmit(self, frame)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, BusError> {
        HalfDuplexTransceiver::receive(self, buf)
    }
}

fn write_all<T: Transport>(transport: &mut T, mut data: &[u8]) -> Result<usize, BusError> {
    let total = data.len();
    while !data.is_empty() {
        match transport.write(data) {
            Ok(0) => return Err(BusError::WriteStalled),
            Ok(n) => data = &data[n.min(data.len())..],
            Err(e) => {
                warn!("RS485: write failed: {:?}", e);
                return Err(BusError::WriteFailed);
            }
        }
    }
    Ok(total)
}

// ───────────────────────────────────────────────────────────────
// Drive window guard
// ───────────────────────────────────────────────────────────────

/// Holds the bus in drive mode; lowers DE/RE on close or drop.
struct DriveWindow<'a, P: OutputPin> {
    de_re: &'a mut P,
    direction: &'a mut Direction,
    closed: bool,
}

impl<'a, P: OutputPin> DriveWindow<'a, P> {
    fn open(de_re: &'a mut P, direction: &'a mut Direction) -> Result<Self, BusError> {
        // Mark drive before touching the pin so a partial switch is
        // still released.
        *direction = Direction::Drive;
        let mut window = Self {
            de_re,
            direction,
            closed: false,
        };
        window.de_re.set_high().map_err(|e| {
            error!("RS485: cannot drive bus: {:?}", e);
            BusError::DirectionPin
        })?;
        Ok(window)
    }

    fn close(mut self) -> Result<(), BusError> {
        self.closed = true;
        self.lower()
    }

    fn lower(&mut self) -> Result<(), BusError> {
        self.de_re.set_low().map_err(|e| {
            error!("RS485: cannot release bus: {:?}", e);
            BusError::DirectionPin
        })?;
        *self.direction = Direction::Listen;
        Ok(())
    }
}

impl<P: OutputPin> Drop for DriveWindow<'_, P> {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.lower();
        }
    }
}
