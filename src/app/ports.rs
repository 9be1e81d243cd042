//! Port traits: the hexagonal boundary between bridge logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ BridgeService (domain)
//! ```
//!
//! Driven adapters (load cell, WiFi, MQTT, RS-485, clock, event sinks)
//! implement these traits.  The [`BridgeService`](super::service::BridgeService)
//! consumes them via generics, so the domain core never touches hardware
//! directly.
//!
//! Every port is non-blocking apart from the documented bounded waits
//! (sensor readiness timeout, bus flush, link reconnect budget).

use crate::error::{BusError, CommsError, SensorError};
use crate::scheduler::TaskId;

// ───────────────────────────────────────────────────────────────
// Weight sensor port (driven adapter: HX711 → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port for the load cell amplifier.
pub trait WeightSensorPort {
    /// Wait up to `timeout_ms` for a conversion to become available.
    fn is_ready(&mut self, timeout_ms: u32) -> bool;

    /// Average `samples` conversions and return kilograms.
    fn read_averaged(&mut self, samples: u8) -> Result<f32, SensorError>;

    /// Set the counts-per-kilogram factor.
    fn set_scale(&mut self, factor: f32);

    /// Record the current reading as zero.
    fn tare(&mut self, samples: u8) -> Result<(), SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Network link port (driven adapter: WiFi station)
// ───────────────────────────────────────────────────────────────

pub trait LinkPort {
    fn is_up(&self) -> bool;

    /// Try to re-establish the link.  Bounded by the adapter's own retry
    /// budget; returns whether the link is up afterwards.
    fn reconnect(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Publisher port (driven adapter: domain → MQTT broker)
// ───────────────────────────────────────────────────────────────

/// Fire-and-forget publish client.
pub trait PublisherPort {
    fn is_connected(&self) -> bool;

    /// Open a session with the broker under `client_id`.
    fn connect(&mut self, client_id: &str) -> Result<(), CommsError>;

    /// Service inbound traffic and keep-alives.  Called every publisher
    /// tick while connected.
    fn poll(&mut self);

    /// Publish `payload` on `topic`.  Returns `false` if the client
    /// refused the message; there is no delivery guarantee either way.
    fn publish(&mut self, topic: &str, payload: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Bus port (driven adapter: domain ↔ RS-485)
// ───────────────────────────────────────────────────────────────

/// Half-duplex bus access.  Implemented by
/// [`HalfDuplexTransceiver`](crate::protocol::transceiver::HalfDuplexTransceiver).
pub trait BusPort {
    /// Drive a complete frame onto the bus.  Returns in listen mode.
    fn transmit(&mut self, frame: &[u8]) -> Result<usize, BusError>;

    /// Non-blocking read; returns 0 when nothing is buffered.
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, BusError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock.  Wraps at `u32::MAX` like the device
/// uptime counter; consumers compare with `wrapping_sub`.
pub trait ClockPort {
    fn now_ms(&self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`BridgeEvent`](super::events::BridgeEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::BridgeEvent);
}

// ───────────────────────────────────────────────────────────────
// Task runner (decouples scheduler from the service)
// ───────────────────────────────────────────────────────────────

/// Callback the [`Scheduler`](crate::scheduler::Scheduler) invokes for
/// every due task.  The scheduler knows nothing about what a task does.
pub trait TaskRunner {
    fn run(&mut self, task: TaskId, now_ms: u32);
}
