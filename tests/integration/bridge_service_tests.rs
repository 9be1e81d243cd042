//! End-to-end tests for the BridgeService task handlers.
//!
//! Bus bytes go in through `MockBus`, port calls and events are recorded
//! by `MockHw` and `RecordingSink`.

use crate::mock_hw::{HwCall, MockBus, MockHw, RecordingSink};

use vexbridge::app::events::BridgeEvent;
use vexbridge::app::service::{BridgeService, CONNECTED_STATUS};
use vexbridge::config::BridgeConfig;
use vexbridge::error::{BusError, CodecError, Error, SensorError};
use vexbridge::protocol::codec::{BrainSnapshot, DecodeError, Message};
use vexbridge::scheduler::TaskId;

fn make_service(config: BridgeConfig) -> BridgeService<MockBus> {
    BridgeService::new(config, MockBus::new(), 0x0A3F).unwrap()
}

/// Started service with sensor present and the publisher connected.
fn started() -> (BridgeService<MockBus>, MockHw, RecordingSink) {
    let mut svc = make_service(BridgeConfig::default());
    let mut hw = MockHw::new();
    let mut sink = RecordingSink::new();
    svc.start(0, &mut hw, &mut sink);
    svc.bus_mut().sent.clear();
    hw.clear();
    sink.clear();
    (svc, hw, sink)
}

fn feed(svc: &mut BridgeService<MockBus>, hw: &mut MockHw, sink: &mut RecordingSink, bytes: &[u8], now: u32) {
    svc.bus_mut().inject(bytes);
    svc.run_task(TaskId::BusRead, now, hw, sink);
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn start_tares_sensor_and_announces_connection() {
    let mut svc = make_service(BridgeConfig::default());
    let mut hw = MockHw::new();
    let mut sink = RecordingSink::new();

    svc.start(0, &mut hw, &mut sink);

    assert_eq!(
        hw.calls,
        vec![
            HwCall::IsReady(1000),
            HwCall::SetScale(106.53),
            HwCall::Tare(10),
            HwCall::Connect("ESP32-VexBridge-0A3F".to_owned()),
        ]
    );
    assert_eq!(svc.bus().sent_text(), vec!["<STATUS|MQTT Connected>"]);
    assert!(sink.contains(&BridgeEvent::PublisherConnected));
    assert!(sink.contains(&BridgeEvent::Started {
        sensor_ready: true,
        link_up: true,
    }));
    assert!(svc.is_sensor_enabled());
    assert!(svc.is_publisher_connected());
    assert_eq!(svc.stats().publisher_connects, 1);
}

#[test]
fn missing_sensor_disables_sampling_for_good() {
    let mut svc = make_service(BridgeConfig::default());
    let mut hw = MockHw::new();
    hw.sensor_present = false;
    let mut sink = RecordingSink::new();

    svc.start(0, &mut hw, &mut sink);
    assert!(!svc.is_sensor_enabled());
    assert!(sink.contains(&BridgeEvent::Started {
        sensor_ready: false,
        link_up: true,
    }));
    assert_eq!(hw.count(&HwCall::Tare(10)), 0);

    // Even if the sensor shows up later, it is never sampled.
    hw.sensor_present = true;
    hw.clear();
    for t in [50, 100, 150] {
        svc.run_task(TaskId::SensorSample, t, &mut hw, &mut sink);
    }
    assert!(hw.calls.is_empty());
    assert!(svc.telemetry().local.is_none());
}

#[test]
fn offline_start_skips_publisher() {
    let mut svc = make_service(BridgeConfig::default());
    let mut hw = MockHw::offline();
    let mut sink = RecordingSink::new();

    svc.start(0, &mut hw, &mut sink);
    assert_eq!(hw.connects(), 0);
    assert!(svc.bus().sent.is_empty());
    assert!(!svc.is_link_up());
}

// ── Sensor task ───────────────────────────────────────────────

#[test]
fn sample_records_reading_and_sends_weight_frame() {
    let (mut svc, mut hw, mut sink) = started();
    hw.weight_kg = 12.34;

    svc.run_task(TaskId::SensorSample, 50, &mut hw, &mut sink);

    assert_eq!(hw.calls, vec![HwCall::IsReady(100), HwCall::ReadAveraged(5)]);
    assert_eq!(svc.bus().sent_text(), vec!["<WEIGHT|12.34>"]);
    let local = svc.telemetry().local.unwrap();
    assert_eq!(local.value, 12.34);
    assert_eq!(local.updated_ms, 50);
    assert!(sink.contains(&BridgeEvent::WeightSampled(12.34)));
    assert_eq!(svc.stats().frames_sent, 1);
}

#[test]
fn sensor_not_ready_skips_tick() {
    let (mut svc, mut hw, mut sink) = started();
    hw.sensor_present = false;

    svc.run_task(TaskId::SensorSample, 50, &mut hw, &mut sink);

    assert_eq!(hw.count(&HwCall::ReadAveraged(5)), 0);
    assert!(svc.bus().sent.is_empty());
    assert_eq!(svc.stats().sensor_not_ready, 1);
}

#[test]
fn sensor_read_error_is_counted_not_sent() {
    let (mut svc, mut hw, mut sink) = started();
    hw.sensor_error = Some(SensorError::GpioFailed);

    svc.run_task(TaskId::SensorSample, 50, &mut hw, &mut sink);

    assert!(svc.bus().sent.is_empty());
    assert!(svc.telemetry().local.is_none());
    assert_eq!(svc.stats().sensor_errors, 1);
}

// ── Bus read task ─────────────────────────────────────────────

#[test]
fn weight_frame_from_peer_is_decoded() {
    let (mut svc, mut hw, mut sink) = started();

    feed(&mut svc, &mut hw, &mut sink, b"<WEIGHT|12.34>", 20);

    assert!(sink.contains(&BridgeEvent::FrameReceived {
        len: 12,
        truncated: false,
    }));
    assert!(sink.contains(&BridgeEvent::PeerMessage(Message::Weight(12.34))));
    assert_eq!(svc.stats().frames_decoded, 1);
    // Only BRAIN frames touch the store.
    assert!(svc.telemetry().local.is_none());
    assert!(svc.telemetry().peer.is_none());
}

#[test]
fn brain_frame_updates_store() {
    let (mut svc, mut hw, mut sink) = started();

    feed(&mut svc, &mut hw, &mut sink, b"noise<BRAIN|100.0|87.5|12.34|1.5>", 40);

    let expected = BrainSnapshot {
        system_time: 100.0,
        battery_percent: 87.5,
        battery_voltage: 12.34,
        battery_current: 1.5,
    };
    let peer = svc.telemetry().peer.unwrap();
    assert_eq!(peer.value, expected);
    assert_eq!(peer.updated_ms, 40);
    assert!(sink.contains(&BridgeEvent::PeerSnapshot(expected)));
}

#[test]
fn frame_split_across_reads_is_reassembled() {
    let (mut svc, mut hw, mut sink) = started();

    feed(&mut svc, &mut hw, &mut sink, b"<BRAIN|1.0|50", 20);
    assert!(svc.telemetry().peer.is_none());

    feed(&mut svc, &mut hw, &mut sink, b".0|7.2|0.3>", 40);
    let peer = svc.telemetry().peer.unwrap();
    assert_eq!(peer.value.battery_percent, 50.0);
    assert_eq!(peer.updated_ms, 40);
}

#[test]
fn interrupted_brain_frame_yields_only_status() {
    let (mut svc, mut hw, mut sink) = started();

    feed(&mut svc, &mut hw, &mut sink, b"<BRAIN|100.0|87.5|12.34|<STATUS|ok>", 20);

    let status = Message::status("ok").unwrap();
    assert!(sink.contains(&BridgeEvent::PeerMessage(status)));
    assert_eq!(sink.count(|e| matches!(e, BridgeEvent::PeerSnapshot(_))), 0);
    assert!(svc.telemetry().peer.is_none());
    assert_eq!(svc.stats().frames_received, 1);
    assert_eq!(svc.stats().frames_abandoned, 1);
}

#[test]
fn unknown_tag_leaves_store_untouched() {
    let (mut svc, mut hw, mut sink) = started();
    feed(&mut svc, &mut hw, &mut sink, b"<BRAIN|1|2|3|4>", 20);
    let before = svc.telemetry();

    feed(&mut svc, &mut hw, &mut sink, b"<FOO|1|2>", 40);

    assert_eq!(svc.telemetry(), before);
    assert!(sink.events.iter().any(|e| matches!(
        e,
        BridgeEvent::FrameRejected(DecodeError::UnknownMessage { tag }) if tag.as_str() == "FOO"
    )));
    assert_eq!(svc.stats().unknown_messages, 1);
}

#[test]
fn short_brain_frame_zero_fills_by_default() {
    let (mut svc, mut hw, mut sink) = started();

    feed(&mut svc, &mut hw, &mut sink, b"<BRAIN|5.0|50.0>", 20);

    let peer = svc.telemetry().peer.unwrap().value;
    assert_eq!(peer.system_time, 5.0);
    assert_eq!(peer.battery_percent, 50.0);
    assert_eq!(peer.battery_voltage, 0.0);
    assert_eq!(peer.battery_current, 0.0);
}

#[test]
fn short_brain_frame_rejected_in_strict_mode() {
    let config = BridgeConfig {
        strict_decode: true,
        ..BridgeConfig::default()
    };
    let mut svc = make_service(config);
    let mut hw = MockHw::offline();
    let mut sink = RecordingSink::new();
    svc.start(0, &mut hw, &mut sink);

    feed(&mut svc, &mut hw, &mut sink, b"<BRAIN|5.0|50.0>", 20);

    assert!(svc.telemetry().peer.is_none());
    assert!(sink.contains(&BridgeEvent::FrameRejected(DecodeError::Malformed {
        tag: "BRAIN",
        expected: 4,
        found: 2,
    })));
    assert_eq!(svc.stats().malformed_messages, 1);
}

#[test]
fn oversize_frame_is_truncated_and_flagged() {
    let (mut svc, mut hw, mut sink) = started();
    let mut frame = b"<STATUS|".to_vec();
    frame.extend(std::iter::repeat_n(b'a', 300));
    frame.push(b'>');

    feed(&mut svc, &mut hw, &mut sink, &frame, 20);

    assert!(sink.contains(&BridgeEvent::FrameReceived {
        len: 255,
        truncated: true,
    }));
    assert_eq!(svc.stats().truncated_frames, 1);
    assert_eq!(sink.count(|e| matches!(e, BridgeEvent::PeerMessage(Message::Status(_)))), 1);
}

#[test]
fn bus_read_respects_budget() {
    let config = BridgeConfig {
        bus_read_budget: 64,
        ..BridgeConfig::default()
    };
    let mut svc = make_service(config);
    let mut hw = MockHw::offline();
    let mut sink = RecordingSink::new();

    svc.bus_mut().inject(&[b'x'; 200]);
    svc.run_task(TaskId::BusRead, 20, &mut hw, &mut sink);
    assert_eq!(svc.bus().rx.len(), 136);

    svc.run_task(TaskId::BusRead, 40, &mut hw, &mut sink);
    assert_eq!(svc.bus().rx.len(), 72);
}

#[test]
fn bus_read_error_is_counted() {
    let (mut svc, mut hw, mut sink) = started();
    svc.bus_mut().fail_next_receive = Some(BusError::ReadFailed);
    svc.bus_mut().inject(b"<BRAIN|1|2|3|4>");

    svc.run_task(TaskId::BusRead, 20, &mut hw, &mut sink);
    assert_eq!(svc.stats().bus_read_errors, 1);
    assert!(svc.telemetry().peer.is_none());

    // Bytes stay queued for the next tick.
    svc.run_task(TaskId::BusRead, 40, &mut hw, &mut sink);
    assert!(svc.telemetry().peer.is_some());
}

// ── Outbound frames ───────────────────────────────────────────

#[test]
fn transmit_failure_is_reported_and_recovers() {
    let (mut svc, _hw, mut sink) = started();
    svc.bus_mut().fail_next_transmit = Some(BusError::WriteFailed);

    let err = svc.send(&Message::Weight(1.0), &mut sink).unwrap_err();
    assert_eq!(err, Error::Bus(BusError::WriteFailed));
    assert!(sink.contains(&BridgeEvent::TransmitFailed(err)));
    assert_eq!(svc.stats().transmit_failures, 1);

    assert_eq!(svc.send(&Message::Weight(1.0), &mut sink).unwrap(), 13);
    assert_eq!(svc.bus().sent_text(), vec!["<WEIGHT|1.00>"]);
}

#[test]
fn status_with_reserved_character_is_refused() {
    let (mut svc, _hw, mut sink) = started();

    let err = svc.send_status("a|b", &mut sink).unwrap_err();
    assert_eq!(err, Error::Codec(CodecError::ReservedCharacter));
    assert!(svc.bus().sent.is_empty());
    assert_eq!(svc.stats().encode_failures, 1);
}

// ── Publish task ──────────────────────────────────────────────

#[test]
fn publish_renders_payloads_in_order() {
    let (mut svc, mut hw, mut sink) = started();
    hw.weight_kg = 2.5;
    svc.run_task(TaskId::SensorSample, 50, &mut hw, &mut sink);
    feed(&mut svc, &mut hw, &mut sink, b"<BRAIN|100.0|87.5|12.34|1.5>", 60);
    hw.clear();

    svc.run_task(TaskId::Publish, 1000, &mut hw, &mut sink);

    assert_eq!(
        hw.published(),
        vec![
            ("ESP32/loadCell/weight".to_owned(), "2.50".to_owned()),
            ("ESP32/vexBrain/battery".to_owned(), "87.5".to_owned()),
            ("ESP32/vexBrain/voltage".to_owned(), "12.34".to_owned()),
            (
                "ESP32/vexBrain/status".to_owned(),
                "Batt:87.5% Volt:12.34V Curr:1.50A".to_owned()
            ),
        ]
    );
    assert!(sink.contains(&BridgeEvent::Published { count: 4 }));
    assert_eq!(svc.stats().publish_attempts, 4);
}

#[test]
fn publish_skips_missing_sources() {
    let (mut svc, mut hw, mut sink) = started();

    svc.run_task(TaskId::Publish, 1000, &mut hw, &mut sink);
    assert!(hw.published().is_empty());
    assert_eq!(sink.count(|e| matches!(e, BridgeEvent::Published { .. })), 0);

    hw.weight_kg = 1.0;
    svc.run_task(TaskId::SensorSample, 1050, &mut hw, &mut sink);
    svc.run_task(TaskId::Publish, 2000, &mut hw, &mut sink);
    assert_eq!(
        hw.published(),
        vec![("ESP32/loadCell/weight".to_owned(), "1.00".to_owned())]
    );
}

#[test]
fn publish_requires_connected_client() {
    let (mut svc, mut hw, mut sink) = started();
    feed(&mut svc, &mut hw, &mut sink, b"<BRAIN|1|2|3|4>", 20);
    hw.connected = false;

    svc.run_task(TaskId::Publish, 1000, &mut hw, &mut sink);
    assert!(hw.published().is_empty());
}

#[test]
fn refused_publishes_are_counted() {
    let (mut svc, mut hw, mut sink) = started();
    feed(&mut svc, &mut hw, &mut sink, b"<BRAIN|1|2|3|4>", 20);
    hw.refuse_publish = true;

    svc.run_task(TaskId::Publish, 1000, &mut hw, &mut sink);
    assert_eq!(svc.stats().publish_attempts, 3);
    assert_eq!(svc.stats().publish_failures, 3);
    assert_eq!(sink.count(|e| matches!(e, BridgeEvent::Published { .. })), 0);
}

// ── Link and publisher tasks ──────────────────────────────────

#[test]
fn link_drop_marks_publisher_down_and_reconnects() {
    let (mut svc, mut hw, mut sink) = started();
    hw.link_up = false;
    hw.link_recovers = false;
    hw.connected = false;

    svc.run_task(TaskId::LinkCheck, 5000, &mut hw, &mut sink);

    assert_eq!(hw.count(&HwCall::Reconnect), 1);
    assert!(sink.contains(&BridgeEvent::LinkChanged { up: false }));
    assert!(sink.contains(&BridgeEvent::PublisherDisconnected));
    assert!(!svc.is_link_up());
    assert!(!svc.is_publisher_connected());
    assert_eq!(svc.stats().link_drops, 1);

    // No publisher traffic while the link is down.
    svc.run_task(TaskId::PublisherService, 5001, &mut hw, &mut sink);
    assert_eq!(hw.connects(), 0);

    hw.link_recovers = true;
    svc.run_task(TaskId::LinkCheck, 10_000, &mut hw, &mut sink);
    assert!(sink.contains(&BridgeEvent::LinkChanged { up: true }));
    assert!(svc.is_link_up());

    svc.run_task(TaskId::PublisherService, 10_001, &mut hw, &mut sink);
    assert_eq!(hw.connects(), 1);
    assert!(svc.is_publisher_connected());
    assert_eq!(
        svc.bus().sent_text().last().map(String::as_str),
        Some("<STATUS|MQTT Connected>")
    );
}

#[test]
fn drop_counted_when_reconnect_succeeds_at_once() {
    let (mut svc, mut hw, mut sink) = started();
    hw.link_up = false;
    hw.link_recovers = true;
    hw.connected = false;

    svc.run_task(TaskId::LinkCheck, 5000, &mut hw, &mut sink);

    assert_eq!(hw.count(&HwCall::Reconnect), 1);
    assert!(svc.is_link_up());
    assert_eq!(svc.stats().link_drops, 1);
    assert_eq!(
        sink.events,
        vec![
            BridgeEvent::PublisherDisconnected,
            BridgeEvent::LinkChanged { up: false },
            BridgeEvent::LinkChanged { up: true },
        ]
    );

    svc.run_task(TaskId::PublisherService, 5001, &mut hw, &mut sink);
    assert_eq!(hw.connects(), 1);
    assert!(svc.is_publisher_connected());
}

#[test]
fn healthy_link_check_is_silent() {
    let (mut svc, mut hw, mut sink) = started();

    svc.run_task(TaskId::LinkCheck, 5000, &mut hw, &mut sink);

    assert!(hw.calls.is_empty());
    assert!(sink.events.is_empty());
}

#[test]
fn connected_publisher_is_polled() {
    let (mut svc, mut hw, mut sink) = started();

    svc.run_task(TaskId::PublisherService, 1, &mut hw, &mut sink);
    svc.run_task(TaskId::PublisherService, 2, &mut hw, &mut sink);

    assert_eq!(hw.count(&HwCall::Poll), 2);
    assert_eq!(hw.connects(), 0);
}

#[test]
fn connect_retries_are_spaced() {
    let mut svc = make_service(BridgeConfig::default());
    let mut hw = MockHw::new();
    hw.broker_available = false;
    let mut sink = RecordingSink::new();

    svc.start(0, &mut hw, &mut sink);
    assert!(sink.contains(&BridgeEvent::PublisherConnectFailed));
    assert_eq!(hw.connects(), 1);

    svc.run_task(TaskId::PublisherService, 500, &mut hw, &mut sink);
    svc.run_task(TaskId::PublisherService, 1999, &mut hw, &mut sink);
    assert_eq!(hw.connects(), 1);

    hw.broker_available = true;
    svc.run_task(TaskId::PublisherService, 2000, &mut hw, &mut sink);
    assert_eq!(hw.connects(), 2);
    assert!(svc.is_publisher_connected());
    assert_eq!(svc.bus().sent_text(), vec![format!("<STATUS|{CONNECTED_STATUS}>")]);
}

#[test]
fn dropped_session_is_reopened() {
    let (mut svc, mut hw, mut sink) = started();
    hw.connected = false;

    svc.run_task(TaskId::PublisherService, 3000, &mut hw, &mut sink);

    assert!(sink.contains(&BridgeEvent::PublisherDisconnected));
    assert!(sink.contains(&BridgeEvent::PublisherConnected));
    assert_eq!(hw.connects(), 1);
    assert_eq!(svc.stats().publisher_connects, 2);
}
