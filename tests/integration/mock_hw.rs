//! Mock collaborators for integration tests.
//!
//! Records every port call so tests can assert on the full history
//! without touching a UART, GPIO or a network stack.

use std::collections::VecDeque;

use vexbridge::app::events::BridgeEvent;
use vexbridge::app::ports::{BusPort, EventSink, LinkPort, PublisherPort, WeightSensorPort};
use vexbridge::error::{BusError, CommsError, SensorError};

// ── MockBus ───────────────────────────────────────────────────

/// In-memory bus: `rx` is drained by `receive`, transmitted frames
/// collect in `sent`.
#[derive(Debug, Default)]
pub struct MockBus {
    pub rx: VecDeque<u8>,
    pub sent: Vec<Vec<u8>>,
    /// Next `transmit` fails with this error.
    pub fail_next_transmit: Option<BusError>,
    /// Next `receive` fails with this error.
    pub fail_next_receive: Option<BusError>,
    /// Largest chunk handed out per `receive`.
    pub max_chunk: Option<usize>,
    pub receive_calls: u32,
}

#[allow(dead_code)]
impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    /// Transmitted frames rendered as text.
    pub fn sent_text(&self) -> Vec<String> {
        self.sent
            .iter()
            .map(|f| String::from_utf8_lossy(f).into_owned())
            .collect()
    }
}

impl BusPort for MockBus {
    fn transmit(&mut self, frame: &[u8]) -> Result<usize, BusError> {
        if let Some(e) = self.fail_next_transmit.take() {
            return Err(e);
        }
        self.sent.push(frame.to_vec());
        Ok(frame.len())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, BusError> {
        self.receive_calls += 1;
        if let Some(e) = self.fail_next_receive.take() {
            return Err(e);
        }
        let limit = self.max_chunk.unwrap_or(usize::MAX);
        let n = buf.len().min(self.rx.len()).min(limit);
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

// ── MockHw ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum HwCall {
    IsReady(u32),
    ReadAveraged(u8),
    SetScale(f32),
    Tare(u8),
    Reconnect,
    Connect(String),
    Poll,
    Publish(String, String),
}

/// Load cell, WiFi link and MQTT client in one value.
pub struct MockHw {
    pub calls: Vec<HwCall>,
    pub sensor_present: bool,
    pub weight_kg: f32,
    pub sensor_error: Option<SensorError>,
    pub link_up: bool,
    /// Whether `reconnect` brings the link back.
    pub link_recovers: bool,
    pub broker_available: bool,
    pub connected: bool,
    pub refuse_publish: bool,
}

#[allow(dead_code)]
impl MockHw {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            sensor_present: true,
            weight_kg: 0.0,
            sensor_error: None,
            link_up: true,
            link_recovers: true,
            broker_available: true,
            connected: false,
            refuse_publish: false,
        }
    }

    pub fn offline() -> Self {
        Self {
            link_up: false,
            link_recovers: false,
            ..Self::new()
        }
    }

    /// Every `(topic, payload)` published, in order.
    pub fn published(&self) -> Vec<(String, String)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::Publish(t, p) => Some((t.clone(), p.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn connects(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, HwCall::Connect(_)))
            .count()
    }

    pub fn count(&self, call: &HwCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl Default for MockHw {
    fn default() -> Self {
        Self::new()
    }
}

impl WeightSensorPort for MockHw {
    fn is_ready(&mut self, timeout_ms: u32) -> bool {
        self.calls.push(HwCall::IsReady(timeout_ms));
        self.sensor_present
    }

    fn read_averaged(&mut self, samples: u8) -> Result<f32, SensorError> {
        self.calls.push(HwCall::ReadAveraged(samples));
        match self.sensor_error {
            Some(e) => Err(e),
            None => Ok(self.weight_kg),
        }
    }

    fn set_scale(&mut self, factor: f32) {
        self.calls.push(HwCall::SetScale(factor));
    }

    fn tare(&mut self, samples: u8) -> Result<(), SensorError> {
        self.calls.push(HwCall::Tare(samples));
        Ok(())
    }
}

impl LinkPort for MockHw {
    fn is_up(&self) -> bool {
        self.link_up
    }

    fn reconnect(&mut self) -> bool {
        self.calls.push(HwCall::Reconnect);
        self.link_up = self.link_recovers;
        self.link_up
    }
}

impl PublisherPort for MockHw {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connect(&mut self, client_id: &str) -> Result<(), CommsError> {
        self.calls.push(HwCall::Connect(client_id.to_owned()));
        self.connected = self.link_up && self.broker_available;
        if self.connected {
            Ok(())
        } else {
            Err(CommsError::ConnectFailed)
        }
    }

    fn poll(&mut self) {
        self.calls.push(HwCall::Poll);
    }

    fn publish(&mut self, topic: &str, payload: &str) -> bool {
        self.calls
            .push(HwCall::Publish(topic.to_owned(), payload.to_owned()));
        self.connected && !self.refuse_publish
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<BridgeEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, event: &BridgeEvent) -> bool {
        self.events.contains(event)
    }

    pub fn count(&self, pred: impl Fn(&BridgeEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &BridgeEvent) {
        self.events.push(event.clone());
    }
}
