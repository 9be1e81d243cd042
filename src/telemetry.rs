//! Telemetry store: last-known-good values waiting to be published.
//!
//! Written by the bus-read path (peer snapshot) and the sensor-sample
//! path (local reading); read by the publish task.  Each value is stored
//! together with its timestamp as one [`Stamped`] so a reader can never
//! observe fresh fields with a stale validity flag: validity is simply
//! `Option::is_some`.

use serde::Serialize;

use crate::protocol::codec::BrainSnapshot;

/// A value and the clock reading at which it was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stamped<T> {
    pub value: T,
    pub updated_ms: u32,
}

impl<T> Stamped<T> {
    /// Milliseconds since the value was recorded.
    pub fn age_ms(&self, now_ms: u32) -> u32 {
        now_ms.wrapping_sub(self.updated_ms)
    }
}

/// Copy of the store handed to the publish task.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TelemetrySnapshot {
    /// Most recent `BRAIN` frame, if one has arrived.
    pub peer: Option<Stamped<BrainSnapshot>>,
    /// Most recent load cell reading in kilograms, if any.
    pub local: Option<Stamped<f32>>,
}

impl TelemetrySnapshot {
    pub fn peer_valid(&self) -> bool {
        self.peer.is_some()
    }

    pub fn local_valid(&self) -> bool {
        self.local.is_some()
    }
}

#[derive(Debug, Default)]
pub struct TelemetryStore {
    current: TelemetrySnapshot,
    peer_updates: u32,
    local_updates: u32,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the peer snapshot; all four fields at once.
    pub fn record_peer_snapshot(&mut self, snapshot: BrainSnapshot, now_ms: u32) {
        self.current.peer = Some(Stamped {
            value: snapshot,
            updated_ms: now_ms,
        });
        self.peer_updates = self.peer_updates.wrapping_add(1);
    }

    pub fn record_local_reading(&mut self, kg: f32, now_ms: u32) {
        self.current.local = Some(Stamped {
            value: kg,
            updated_ms: now_ms,
        });
        self.local_updates = self.local_updates.wrapping_add(1);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.current
    }

    /// Number of peer snapshots recorded since startup.
    pub fn peer_updates(&self) -> u32 {
        self.peer_updates
    }

    pub fn local_updates(&self) -> u32 {
        self.local_updates
    }
}
