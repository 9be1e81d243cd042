//! Outbound bridge events.
//!
//! The [`BridgeService`](super::service::BridgeService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them; on device they become log lines.

use crate::error::Error;
use crate::protocol::codec::{BrainSnapshot, DecodeError, Message};

/// Structured events emitted by the bridge core.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    /// The service has started.
    Started { sensor_ready: bool, link_up: bool },

    /// The receiver delimited a frame.
    FrameReceived { len: usize, truncated: bool },

    /// A `BRAIN` frame updated the telemetry store.
    PeerSnapshot(BrainSnapshot),

    /// Any other known message arrived from the peer.
    PeerMessage(Message),

    /// A frame was dropped by the codec.
    FrameRejected(DecodeError),

    /// A fresh load cell reading.
    WeightSampled(f32),

    /// A frame left on the bus.
    FrameSent { tag: &'static str, len: usize },

    /// A frame could not be encoded or transmitted.
    TransmitFailed(Error),

    LinkChanged { up: bool },

    PublisherConnected,
    PublisherConnectFailed,
    PublisherDisconnected,

    /// A publish task completed; `count` messages accepted by the client.
    Published { count: u8 },
}
