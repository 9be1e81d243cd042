//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured bridge events to the
//! ESP-IDF logger (which goes to UART0 / USB-CDC in production).

use log::{debug, info, warn};

use crate::app::events::BridgeEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`BridgeEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &BridgeEvent) {
        match event {
            BridgeEvent::Started {
                sensor_ready,
                link_up,
            } => {
                info!(
                    "START | load_cell={} | link={}",
                    if *sensor_ready { "OK" } else { "MISSING" },
                    if *link_up { "UP" } else { "DOWN" },
                );
            }
            BridgeEvent::FrameReceived { len, truncated } => {
                debug!("RX | {} bytes{}", len, if *truncated { " (truncated)" } else { "" });
            }
            BridgeEvent::PeerSnapshot(b) => {
                info!(
                    "RX | BRAIN | t={:.2}s | batt={:.1}% | {:.2}V | {:.2}A",
                    b.system_time, b.battery_percent, b.battery_voltage, b.battery_current
                );
            }
            BridgeEvent::PeerMessage(m) => {
                info!("RX | {:?}", m);
            }
            BridgeEvent::FrameRejected(e) => {
                warn!("RX | dropped | {}", e);
            }
            BridgeEvent::WeightSampled(kg) => {
                debug!("SENSOR | {:.2} kg", kg);
            }
            BridgeEvent::FrameSent { tag, len } => {
                debug!("TX | {} | {} bytes", tag, len);
            }
            BridgeEvent::TransmitFailed(e) => {
                warn!("TX | failed | {}", e);
            }
            BridgeEvent::LinkChanged { up } => {
                info!("LINK | {}", if *up { "up" } else { "down" });
            }
            BridgeEvent::PublisherConnected => info!("LINK | publisher connected"),
            BridgeEvent::PublisherConnectFailed => warn!("LINK | publisher connect failed"),
            BridgeEvent::PublisherDisconnected => warn!("LINK | publisher disconnected"),
            BridgeEvent::Published { count } => {
                debug!("PUB | {} messages", count);
            }
        }
    }
}
