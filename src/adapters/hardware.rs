//! Hardware adapter: bundles the bridge's collaborators behind port traits.
//!
//! [`BridgeService::run_task`](crate::app::service::BridgeService::run_task)
//! takes one `hw` value satisfying [`WeightSensorPort`], [`LinkPort`] and
//! [`PublisherPort`] at once.  This adapter owns the load cell, the WiFi
//! link and the MQTT client and forwards each port to its owner.

use crate::app::ports::{LinkPort, PublisherPort, WeightSensorPort};
use crate::error::{CommsError, SensorError};

/// Concrete adapter that combines the collaborators behind port traits.
pub struct BridgeHardware<S, L, P> {
    pub sensor: S,
    pub link: L,
    pub publisher: P,
}

impl<S, L, P> BridgeHardware<S, L, P> {
    pub fn new(sensor: S, link: L, publisher: P) -> Self {
        Self {
            sensor,
            link,
            publisher,
        }
    }
}

// ── WeightSensorPort ──────────────────────────────────────────

impl<S: WeightSensorPort, L, P> WeightSensorPort for BridgeHardware<S, L, P> {
    fn is_ready(&mut self, timeout_ms: u32) -> bool {
        self.sensor.is_ready(timeout_ms)
    }

    fn read_averaged(&mut self, samples: u8) -> Result<f32, SensorError> {
        self.sensor.read_averaged(samples)
    }

    fn set_scale(&mut self, factor: f32) {
        self.sensor.set_scale(factor);
    }

    fn tare(&mut self, samples: u8) -> Result<(), SensorError> {
        self.sensor.tare(samples)
    }
}

// ── LinkPort ──────────────────────────────────────────────────

impl<S, L: LinkPort, P> LinkPort for BridgeHardware<S, L, P> {
    fn is_up(&self) -> bool {
        self.link.is_up()
    }

    fn reconnect(&mut self) -> bool {
        self.link.reconnect()
    }
}

// ── PublisherPort ─────────────────────────────────────────────

impl<S, L, P: PublisherPort> PublisherPort for BridgeHardware<S, L, P> {
    fn is_connected(&self) -> bool {
        self.publisher.is_connected()
    }

    fn connect(&mut self, client_id: &str) -> Result<(), CommsError> {
        self.publisher.connect(client_id)
    }

    fn poll(&mut self) {
        self.publisher.poll();
    }

    fn publish(&mut self, topic: &str, payload: &str) -> bool {
        self.publisher.publish(topic, payload)
    }
}
