//! Bridge configuration parameters
//!
//! All tunable parameters for the VexBridge firmware.  Built once at
//! startup, checked with [`BridgeConfig::validate`], and never mutated
//! afterwards.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::codec::{self, DecodeMode, Message, STATUS_TEXT_CAPACITY};

/// MQTT 3.1 limits client identifiers to 23 bytes.
pub const MAX_CLIENT_ID_LEN: usize = 23;
/// Hex digits appended to the client-id prefix.
pub const CLIENT_ID_SUFFIX_LEN: usize = 4;

pub type Topic = heapless::String<64>;

/// Core bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    // --- Scheduler intervals ---
    /// Network link check interval (milliseconds)
    pub link_check_interval_ms: u32,
    /// Publish client service interval (milliseconds, 0 = every iteration)
    pub publisher_service_interval_ms: u32,
    /// Load cell sample interval (milliseconds)
    pub sensor_sample_interval_ms: u32,
    /// RS-485 receive drain interval (milliseconds)
    pub bus_read_interval_ms: u32,
    /// Telemetry publish interval (milliseconds)
    pub publish_interval_ms: u32,
    /// Minimum spacing between publish client connection attempts (milliseconds)
    pub publisher_retry_ms: u32,

    // --- RS-485 ---
    pub bus_baud: u32,
    /// Settling delay after raising DE/RE, before the first byte (microseconds)
    pub bus_turnaround_us: u32,
    /// Most bytes drained from the UART in one bus-read task
    pub bus_read_budget: usize,
    /// Reject recognised frames with missing fields instead of zero-filling
    pub strict_decode: bool,

    // --- Load cell ---
    /// HX711 counts per kilogram
    pub calibration_factor: f32,
    /// Readings averaged per sample
    pub sensor_samples: u8,
    /// Readings averaged when taring at startup
    pub tare_samples: u8,
    /// Per-sample data-ready timeout (milliseconds)
    pub sensor_ready_timeout_ms: u32,
    /// Data-ready timeout at startup (milliseconds)
    pub sensor_init_timeout_ms: u32,

    // --- Network link ---
    pub wifi_ssid: heapless::String<32>,
    pub wifi_password: heapless::String<64>,
    /// Association attempts per reconnect
    pub link_retry_attempts: u8,
    pub link_retry_delay_ms: u32,

    // --- Publish client ---
    pub broker_host: heapless::String<64>,
    pub broker_port: u16,
    pub client_id_prefix: heapless::String<24>,
    pub topic_weight: Topic,
    pub topic_battery: Topic,
    pub topic_voltage: Topic,
    pub topic_status: Topic,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            // Scheduler
            link_check_interval_ms: 5000,
            publisher_service_interval_ms: 0,
            sensor_sample_interval_ms: 50, // 20 Hz
            bus_read_interval_ms: 20,      // 50 Hz
            publish_interval_ms: 1000,     // 1 Hz
            publisher_retry_ms: 2000,

            // RS-485
            bus_baud: 115_200,
            bus_turnaround_us: 100,
            bus_read_budget: 512,
            strict_decode: false,

            // Load cell
            calibration_factor: 106.53,
            sensor_samples: 5,
            tare_samples: 10,
            sensor_ready_timeout_ms: 100,
            sensor_init_timeout_ms: 1000,

            // Network link
            wifi_ssid: heapless::String::new(),
            wifi_password: heapless::String::new(),
            link_retry_attempts: 10,
            link_retry_delay_ms: 500,

            // Publish client
            broker_host: bounded("broker.hivemq.com"),
            broker_port: 1883,
            client_id_prefix: bounded("ESP32-VexBridge-"),
            topic_weight: bounded("ESP32/loadCell/weight"),
            topic_battery: bounded("ESP32/vexBrain/battery"),
            topic_voltage: bounded("ESP32/vexBrain/voltage"),
            topic_status: bounded("ESP32/vexBrain/status"),
        }
    }
}

impl BridgeConfig {
    /// Reject parameter sets the bridge cannot run with.
    ///
    /// Also encodes the worst-case outbound frames, so an oversize frame
    /// is a startup error rather than a runtime one.
    pub fn validate(&self) -> Result<()> {
        let nonzero = [
            (self.link_check_interval_ms, "link_check_interval_ms must be > 0"),
            (self.sensor_sample_interval_ms, "sensor_sample_interval_ms must be > 0"),
            (self.bus_read_interval_ms, "bus_read_interval_ms must be > 0"),
            (self.publish_interval_ms, "publish_interval_ms must be > 0"),
            (self.bus_baud, "bus_baud must be > 0"),
        ];
        if let Some((_, msg)) = nonzero.iter().find(|(v, _)| *v == 0) {
            return Err(Error::Config(*msg));
        }
        if self.bus_read_budget == 0 {
            return Err(Error::Config("bus_read_budget must be > 0"));
        }
        if self.sensor_samples == 0 || self.tare_samples == 0 {
            return Err(Error::Config("sample counts must be > 0"));
        }
        if !self.calibration_factor.is_finite() || self.calibration_factor == 0.0 {
            return Err(Error::Config("calibration_factor must be finite and non-zero"));
        }
        if self.broker_host.is_empty() || self.broker_port == 0 {
            return Err(Error::Config("broker address incomplete"));
        }
        if self.client_id_prefix.len() + CLIENT_ID_SUFFIX_LEN > MAX_CLIENT_ID_LEN {
            return Err(Error::Config("client_id_prefix too long"));
        }
        let topics = [
            &self.topic_weight,
            &self.topic_battery,
            &self.topic_voltage,
            &self.topic_status,
        ];
        if topics.iter().any(|t| t.is_empty()) {
            return Err(Error::Config("topics must not be empty"));
        }

        let longest_status = [b'x'; STATUS_TEXT_CAPACITY];
        let longest_status = core::str::from_utf8(&longest_status)
            .map_err(|_| Error::Config("status text"))?;
        codec::encode(&Message::status(longest_status)?)?;
        codec::encode(&Message::Weight(f32::MIN))?;
        Ok(())
    }

    pub fn decode_mode(&self) -> DecodeMode {
        if self.strict_decode {
            DecodeMode::Strict
        } else {
            DecodeMode::Lenient
        }
    }
}

/// Copy `s` into a bounded string, truncating at capacity.
fn bounded<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
