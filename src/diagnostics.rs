//! Runtime diagnostics.
//!
//! Counters maintained by the [`BridgeService`](crate::app::service::BridgeService)
//! so a misbehaving peer or a flaky link shows up as numbers rather than
//! as silence.  Every counter wraps; none of them is ever reset while the
//! firmware runs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeStats {
    // --- Receive path ---
    /// Frames delimited by the receiver (decoded or not).
    pub frames_received: u32,
    /// Frames that decoded into a known message.
    pub frames_decoded: u32,
    pub unknown_messages: u32,
    /// Recognised tags rejected for missing fields (strict mode only).
    pub malformed_messages: u32,
    /// Frames that overflowed the receive buffer and lost bytes.
    pub truncated_frames: u32,
    /// Frames superseded by a new start marker before terminating.
    pub frames_abandoned: u32,
    pub bus_read_errors: u32,

    // --- Transmit path ---
    pub frames_sent: u32,
    pub transmit_failures: u32,
    pub encode_failures: u32,

    // --- Publish path ---
    pub publish_attempts: u32,
    pub publish_failures: u32,
    pub publisher_connects: u32,
    pub link_drops: u32,

    // --- Load cell ---
    pub sensor_samples: u32,
    /// Sample ticks skipped because the HX711 was not ready in time.
    pub sensor_not_ready: u32,
    pub sensor_errors: u32,
}

/// Increment a wrapping counter.
pub(crate) fn bump(counter: &mut u32) {
    *counter = counter.wrapping_add(1);
}

impl BridgeStats {
    /// Frames that reached the codec but produced no message.
    pub fn rejected_frames(&self) -> u32 {
        self.unknown_messages
            .wrapping_add(self.malformed_messages)
    }
}
