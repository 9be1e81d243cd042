//! Bridge service: the hexagonal core.
//!
//! [`BridgeService`] owns the frame receiver, the telemetry store, the
//! bus controller and the connectivity flags.  The scheduler tells it
//! which task is due; everything else flows through port traits injected
//! at call sites, making the whole service testable with mock adapters.
//!
//! ```text
//!  WeightSensorPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!  LinkPort         ──▶ │      BridgeService       │
//!  PublisherPort   ◀──▶ │ receiver · store · stats │ ◀─▶ BusPort (RS-485)
//!                       └──────────────────────────┘
//! ```
//!
//! Nothing here is fatal.  A task whose preconditions are not met (link
//! down, sensor not ready, publisher disconnected) does nothing for that
//! tick and the next tick tries again.

use core::fmt::{self, Write};

use log::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::diagnostics::{BridgeStats, bump};
use crate::error::{Error, Result};
use crate::protocol::codec::{self, DecodeError, DecodeMode, Message};
use crate::protocol::receiver::{CompletedFrame, FrameReceiver};
use crate::scheduler::TaskId;
use crate::telemetry::{TelemetrySnapshot, TelemetryStore};

use super::events::BridgeEvent;
use super::ports::{BusPort, EventSink, LinkPort, PublisherPort, TaskRunner, WeightSensorPort};

/// Status text sent to the peer when a publisher session opens.
pub const CONNECTED_STATUS: &str = "MQTT Connected";

/// Bytes pulled from the bus per `receive` call.
const BUS_CHUNK: usize = 64;

/// Longest rendered publish payload.
const PAYLOAD_CAPACITY: usize = 64;

type ClientId = heapless::String<24>;

// ───────────────────────────────────────────────────────────────
// BridgeService
// ───────────────────────────────────────────────────────────────

/// The bridge service orchestrates all domain logic.
pub struct BridgeService<B: BusPort> {
    config: BridgeConfig,
    decode_mode: DecodeMode,
    bus: B,
    receiver: FrameReceiver,
    store: TelemetryStore,
    stats: BridgeStats,
    client_id: ClientId,
    /// Cleared for good if the load cell is missing at startup.
    sensor_enabled: bool,
    link_up: bool,
    publisher_connected: bool,
    last_connect_attempt_ms: Option<u32>,
}

impl<B: BusPort> BridgeService<B> {
    /// Validate `config` and take ownership of the bus.
    ///
    /// `client_suffix` becomes the four hex digits appended to the
    /// configured client-id prefix; pass a random value on device.
    pub fn new(config: BridgeConfig, bus: B, client_suffix: u16) -> Result<Self> {
        config.validate()?;
        let mut client_id = ClientId::new();
        write!(client_id, "{}{:04X}", config.client_id_prefix, client_suffix)
            .map_err(|_| Error::Config("client_id_prefix too long"))?;

        Ok(Self {
            decode_mode: config.decode_mode(),
            config,
            bus,
            receiver: FrameReceiver::new(),
            store: TelemetryStore::new(),
            stats: BridgeStats::default(),
            client_id,
            sensor_enabled: false,
            link_up: false,
            publisher_connected: false,
            last_connect_attempt_ms: None,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Bring up the load cell, record the link state and open the first
    /// publisher session if the link is already up.
    pub fn start(
        &mut self,
        now_ms: u32,
        hw: &mut (impl WeightSensorPort + LinkPort + PublisherPort),
        sink: &mut impl EventSink,
    ) {
        self.sensor_enabled = self.init_sensor(hw);
        self.link_up = hw.is_up();
        if self.link_up {
            self.try_connect(now_ms, hw, sink);
        }
        sink.emit(&BridgeEvent::Started {
            sensor_ready: self.sensor_enabled,
            link_up: self.link_up,
        });
        info!(
            "BridgeService started (sensor={}, link={}, client={})",
            self.sensor_enabled, self.link_up, self.client_id
        );
    }

    fn init_sensor(&mut self, hw: &mut impl WeightSensorPort) -> bool {
        if !hw.is_ready(self.config.sensor_init_timeout_ms) {
            warn!("LoadCell: not found, weight sampling disabled");
            return false;
        }
        hw.set_scale(self.config.calibration_factor);
        match hw.tare(self.config.tare_samples) {
            Ok(()) => {
                info!("LoadCell: tared (scale {})", self.config.calibration_factor);
                true
            }
            Err(e) => {
                warn!("LoadCell: tare failed: {}, weight sampling disabled", e);
                false
            }
        }
    }

    // ── Task dispatch ─────────────────────────────────────────

    /// Run one scheduler task.
    ///
    /// The `hw` parameter satisfies every collaborator port at once; this
    /// avoids juggling several mutable borrows while keeping the port
    /// boundary explicit.
    pub fn run_task(
        &mut self,
        task: TaskId,
        now_ms: u32,
        hw: &mut (impl WeightSensorPort + LinkPort + PublisherPort),
        sink: &mut impl EventSink,
    ) {
        match task {
            TaskId::LinkCheck => self.check_link(hw, sink),
            TaskId::PublisherService => self.service_publisher(now_ms, hw, sink),
            TaskId::SensorSample => self.sample_sensor(now_ms, hw, sink),
            TaskId::BusRead => self.read_bus(now_ms, sink),
            TaskId::Publish => self.publish(hw, sink),
        }
    }

    fn check_link(&mut self, hw: &mut (impl LinkPort + PublisherPort), sink: &mut impl EventSink) {
        let was_up = self.link_up;
        if hw.is_up() {
            if !was_up {
                sink.emit(&BridgeEvent::LinkChanged { up: true });
            }
            self.link_up = true;
            return;
        }

        // A drop counts even when the reconnect below succeeds at once.
        self.mark_publisher_down(sink);
        if was_up {
            bump(&mut self.stats.link_drops);
            sink.emit(&BridgeEvent::LinkChanged { up: false });
        }
        info!("Link: down, reconnecting");
        let up = hw.reconnect();
        if up {
            sink.emit(&BridgeEvent::LinkChanged { up: true });
        }
        self.link_up = up;
    }

    fn service_publisher(
        &mut self,
        now_ms: u32,
        hw: &mut impl PublisherPort,
        sink: &mut impl EventSink,
    ) {
        if !self.link_up {
            return;
        }
        if hw.is_connected() {
            self.publisher_connected = true;
            hw.poll();
            return;
        }
        self.mark_publisher_down(sink);

        if let Some(last) = self.last_connect_attempt_ms {
            if now_ms.wrapping_sub(last) < self.config.publisher_retry_ms {
                return;
            }
        }
        self.try_connect(now_ms, hw, sink);
    }

    fn try_connect(&mut self, now_ms: u32, hw: &mut impl PublisherPort, sink: &mut impl EventSink) {
        self.last_connect_attempt_ms = Some(now_ms);
        info!("Publisher: connecting as {}", self.client_id);
        match hw.connect(&self.client_id) {
            Ok(()) => {
                self.publisher_connected = true;
                bump(&mut self.stats.publisher_connects);
                sink.emit(&BridgeEvent::PublisherConnected);
                let _ = self.send_status(CONNECTED_STATUS, sink);
            }
            Err(e) => {
                warn!("Publisher: {}, will retry", e);
                sink.emit(&BridgeEvent::PublisherConnectFailed);
            }
        }
    }

    fn mark_publisher_down(&mut self, sink: &mut impl EventSink) {
        if self.publisher_connected {
            self.publisher_connected = false;
            sink.emit(&BridgeEvent::PublisherDisconnected);
        }
    }

    fn sample_sensor(
        &mut self,
        now_ms: u32,
        hw: &mut impl WeightSensorPort,
        sink: &mut impl EventSink,
    ) {
        if !self.sensor_enabled {
            return;
        }
        if !hw.is_ready(self.config.sensor_ready_timeout_ms) {
            bump(&mut self.stats.sensor_not_ready);
            return;
        }
        match hw.read_averaged(self.config.sensor_samples) {
            Ok(kg) => {
                self.store.record_local_reading(kg, now_ms);
                bump(&mut self.stats.sensor_samples);
                sink.emit(&BridgeEvent::WeightSampled(kg));
                let _ = self.send(&Message::Weight(kg), sink);
            }
            Err(e) => {
                bump(&mut self.stats.sensor_errors);
                warn!("LoadCell: read failed: {}", e);
            }
        }
    }

    fn read_bus(&mut self, now_ms: u32, sink: &mut impl EventSink) {
        let budget = self.config.bus_read_budget;
        let mut chunk = [0u8; BUS_CHUNK];
        let mut drained = 0;

        while drained < budget {
            let want = (budget - drained).min(BUS_CHUNK);
            let n = match self.bus.receive(&mut chunk[..want]) {
                Ok(0) => break,
                Ok(n) => n.min(want),
                Err(e) => {
                    bump(&mut self.stats.bus_read_errors);
                    warn!("RS485: {}", e);
                    break;
                }
            };
            drained += n;

            let mode = self.decode_mode;
            let store = &mut self.store;
            let stats = &mut self.stats;
            self.receiver.feed(&chunk[..n], |frame| {
                dispatch_frame(frame, mode, now_ms, store, stats, sink);
            });
        }
        self.stats.frames_abandoned = self.receiver.abandoned_frames();
    }

    fn publish(&mut self, hw: &mut impl PublisherPort, sink: &mut impl EventSink) {
        if !hw.is_connected() {
            return;
        }
        let snap = self.store.snapshot();
        let cfg = &self.config;
        let stats = &mut self.stats;
        let mut count = 0u8;

        if let Some(local) = snap.local {
            count += u8::from(publish_one(
                hw,
                stats,
                &cfg.topic_weight,
                format_args!("{:.2}", local.value),
            ));
        }
        if let Some(peer) = snap.peer {
            let b = peer.value;
            count += u8::from(publish_one(
                hw,
                stats,
                &cfg.topic_battery,
                format_args!("{:.1}", b.battery_percent),
            ));
            count += u8::from(publish_one(
                hw,
                stats,
                &cfg.topic_voltage,
                format_args!("{:.2}", b.battery_voltage),
            ));
            count += u8::from(publish_one(
                hw,
                stats,
                &cfg.topic_status,
                format_args!(
                    "Batt:{:.1}% Volt:{:.2}V Curr:{:.2}A",
                    b.battery_percent, b.battery_voltage, b.battery_current
                ),
            ));
        }
        if count > 0 {
            sink.emit(&BridgeEvent::Published { count });
        }
    }

    // ── Outbound frames ───────────────────────────────────────

    /// Encode `message` and drive it onto the bus.
    pub fn send(&mut self, message: &Message, sink: &mut impl EventSink) -> Result<usize> {
        let frame = codec::encode(message).map_err(|e| {
            bump(&mut self.stats.encode_failures);
            Error::from(e)
        });
        let frame = match frame {
            Ok(f) => f,
            Err(e) => {
                warn!("RS485: cannot encode {}: {}", message.tag(), e);
                sink.emit(&BridgeEvent::TransmitFailed(e));
                return Err(e);
            }
        };

        match self.bus.transmit(&frame) {
            Ok(len) => {
                bump(&mut self.stats.frames_sent);
                sink.emit(&BridgeEvent::FrameSent {
                    tag: message.tag(),
                    len,
                });
                Ok(len)
            }
            Err(e) => {
                bump(&mut self.stats.transmit_failures);
                warn!("RS485: {} not sent: {}", message.tag(), e);
                let e = Error::from(e);
                sink.emit(&BridgeEvent::TransmitFailed(e));
                Err(e)
            }
        }
    }

    /// Send a `STATUS` frame carrying `text`.
    pub fn send_status(&mut self, text: &str, sink: &mut impl EventSink) -> Result<usize> {
        match Message::status(text) {
            Ok(message) => self.send(&message, sink),
            Err(e) => {
                bump(&mut self.stats.encode_failures);
                warn!("RS485: status rejected: {}", e);
                let e = Error::from(e);
                sink.emit(&BridgeEvent::TransmitFailed(e));
                Err(e)
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.store.snapshot()
    }

    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn is_sensor_enabled(&self) -> bool {
        self.sensor_enabled
    }

    pub fn is_link_up(&self) -> bool {
        self.link_up
    }

    pub fn is_publisher_connected(&self) -> bool {
        self.publisher_connected
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }
}

// ───────────────────────────────────────────────────────────────
// Receive path
// ───────────────────────────────────────────────────────────────

fn dispatch_frame(
    frame: CompletedFrame<'_>,
    mode: DecodeMode,
    now_ms: u32,
    store: &mut TelemetryStore,
    stats: &mut BridgeStats,
    sink: &mut impl EventSink,
) {
    bump(&mut stats.frames_received);
    if frame.is_truncated() {
        bump(&mut stats.truncated_frames);
        warn!(
            "RS485: frame truncated ({} bytes dropped)",
            frame.dropped_bytes
        );
    }
    sink.emit(&BridgeEvent::FrameReceived {
        len: frame.payload.len(),
        truncated: frame.is_truncated(),
    });

    match codec::decode(frame.payload, mode) {
        Ok(Message::Brain(snapshot)) => {
            bump(&mut stats.frames_decoded);
            store.record_peer_snapshot(snapshot, now_ms);
            sink.emit(&BridgeEvent::PeerSnapshot(snapshot));
        }
        Ok(other) => {
            bump(&mut stats.frames_decoded);
            debug!("RS485: {} frame from peer", other.tag());
            sink.emit(&BridgeEvent::PeerMessage(other));
        }
        Err(e) => {
            match e {
                DecodeError::UnknownMessage { .. } => bump(&mut stats.unknown_messages),
                DecodeError::Malformed { .. } => bump(&mut stats.malformed_messages),
            }
            info!("RS485: frame dropped: {}", e);
            sink.emit(&BridgeEvent::FrameRejected(e));
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Publish path
// ───────────────────────────────────────────────────────────────

/// Render and publish one payload.  Returns whether the client took it.
fn publish_one(
    hw: &mut impl PublisherPort,
    stats: &mut BridgeStats,
    topic: &str,
    payload: fmt::Arguments<'_>,
) -> bool {
    bump(&mut stats.publish_attempts);
    let mut text = heapless::String::<PAYLOAD_CAPACITY>::new();
    if text.write_fmt(payload).is_err() {
        bump(&mut stats.publish_failures);
        warn!("Publisher: payload for {} too long", topic);
        return false;
    }
    let accepted = hw.publish(topic, &text);
    if !accepted {
        bump(&mut stats.publish_failures);
        debug!("Publisher: {} refused", topic);
    }
    accepted
}

// ───────────────────────────────────────────────────────────────
// Scheduler glue
// ───────────────────────────────────────────────────────────────

/// Binds the service to its collaborators for one scheduler poll.
pub struct TickDriver<'a, B: BusPort, H, E> {
    pub service: &'a mut BridgeService<B>,
    pub hw: &'a mut H,
    pub sink: &'a mut E,
}

impl<B, H, E> TaskRunner for TickDriver<'_, B, H, E>
where
    B: BusPort,
    H: WeightSensorPort + LinkPort + PublisherPort,
    E: EventSink,
{
    fn run(&mut self, task: TaskId, now_ms: u32) {
        self.service.run_task(task, now_ms, &mut *self.hw, &mut *self.sink);
    }
}
