//! MQTT publish client adapter.
//!
//! Implements [`PublisherPort`].  Publishes are QoS 0, not retained:
//! the bridge is a best-effort telemetry path and a lost sample is
//! replaced by the next one a second later.
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client::EspMqttClient`.
//!   The ESP-IDF client runs its own task; connection state is tracked
//!   from its event callback through an atomic flag.
//! - **all other targets**: an in-memory broker for host-side tests.

use core::fmt::Write;

use log::{info, warn};

use crate::app::ports::PublisherPort;
use crate::config::BridgeConfig;
use crate::error::CommsError;

type BrokerUrl = heapless::String<80>;

fn broker_url(config: &BridgeConfig) -> Result<BrokerUrl, CommsError> {
    let mut url = BrokerUrl::new();
    write!(url, "mqtt://{}:{}", config.broker_host, config.broker_port)
        .map_err(|_| CommsError::ConnectFailed)?;
    Ok(url)
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF client
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod platform {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use esp_idf_svc::mqtt::client::{
        EspMqttClient, EventPayload, MqttClientConfiguration, QoS,
    };
    use log::{info, warn};

    use crate::error::CommsError;

    /// How long `connect` waits for the broker's CONNACK.
    const CONNECT_TIMEOUT_MS: u32 = 3000;
    const CONNECT_POLL_MS: u32 = 50;

    pub struct Client {
        client: Option<EspMqttClient<'static>>,
        connected: Arc<AtomicBool>,
    }

    impl Client {
        pub fn new() -> Self {
            Self {
                client: None,
                connected: Arc::new(AtomicBool::new(false)),
            }
        }

        pub fn connect(&mut self, url: &str, client_id: &str) -> Result<(), CommsError> {
            // Dropping the old client stops its task.
            self.client = None;
            self.connected.store(false, Ordering::Release);

            let conf = MqttClientConfiguration {
                client_id: Some(client_id),
                ..Default::default()
            };
            let flag = Arc::clone(&self.connected);
            let client = EspMqttClient::new_cb(url, &conf, move |event| match event.payload() {
                EventPayload::Connected(_) => flag.store(true, Ordering::Release),
                EventPayload::Disconnected => flag.store(false, Ordering::Release),
                EventPayload::Error(e) => warn!("Publisher: client error: {:?}", e),
                _ => {}
            })
            .map_err(|e| {
                warn!("Publisher: client init failed: {:?}", e);
                CommsError::ConnectFailed
            })?;
            self.client = Some(client);

            let mut waited = 0;
            while waited < CONNECT_TIMEOUT_MS {
                if self.is_connected() {
                    info!("Publisher: connected to {}", url);
                    return Ok(());
                }
                esp_idf_svc::hal::delay::FreeRtos::delay_ms(CONNECT_POLL_MS);
                waited += CONNECT_POLL_MS;
            }
            Err(CommsError::ConnectFailed)
        }

        pub fn is_connected(&self) -> bool {
            self.client.is_some() && self.connected.load(Ordering::Acquire)
        }

        pub fn publish(&mut self, topic: &str, payload: &str) -> bool {
            let Some(client) = self.client.as_mut() else {
                return false;
            };
            client
                .enqueue(topic, QoS::AtMostOnce, false, payload.as_bytes())
                .is_ok()
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Simulated broker
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod platform {
    use crate::error::CommsError;

    /// In-memory broker: records sessions and published messages.
    #[derive(Debug)]
    pub struct Client {
        pub broker_available: bool,
        pub connected: bool,
        pub client_ids: Vec<String>,
        pub published: Vec<(String, String)>,
    }

    impl Client {
        pub fn new() -> Self {
            Self {
                broker_available: true,
                connected: false,
                client_ids: Vec::new(),
                published: Vec::new(),
            }
        }

        pub fn connect(&mut self, _url: &str, client_id: &str) -> Result<(), CommsError> {
            self.client_ids.push(client_id.to_owned());
            self.connected = self.broker_available;
            if self.connected {
                Ok(())
            } else {
                Err(CommsError::ConnectFailed)
            }
        }

        pub fn is_connected(&self) -> bool {
            self.connected
        }

        pub fn publish(&mut self, topic: &str, payload: &str) -> bool {
            if !self.connected {
                return false;
            }
            self.published.push((topic.to_owned(), payload.to_owned()));
            true
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Adapter
// ───────────────────────────────────────────────────────────────

pub struct MqttAdapter {
    url: BrokerUrl,
    client: platform::Client,
    polls: u32,
}

impl MqttAdapter {
    pub fn new(config: &BridgeConfig) -> Result<Self, CommsError> {
        let url = broker_url(config)?;
        info!("Publisher: broker {}", url);
        Ok(Self {
            url,
            client: platform::Client::new(),
            polls: 0,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of `poll` calls serviced.
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Simulation: make the broker reachable or not.  Unreachable also
    /// drops the current session.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_broker_available(&mut self, available: bool) {
        self.client.broker_available = available;
        if !available {
            self.client.connected = false;
        }
    }

    /// Simulation: every `(topic, payload)` accepted so far.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_published(&self) -> &[(String, String)] {
        &self.client.published
    }

    /// Simulation: client ids used for each connection attempt.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_client_ids(&self) -> &[String] {
        &self.client.client_ids
    }
}

impl PublisherPort for MqttAdapter {
    fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    fn connect(&mut self, client_id: &str) -> Result<(), CommsError> {
        let result = self.client.connect(&self.url, client_id);
        if let Err(e) = result {
            warn!("Publisher: {} ({})", e, self.url);
        }
        result
    }

    fn poll(&mut self) {
        // The ESP-IDF client services its socket on its own task; this
        // only keeps count for diagnostics.
        self.polls = self.polls.wrapping_add(1);
    }

    fn publish(&mut self, topic: &str, payload: &str) -> bool {
        self.client.publish(topic, payload)
    }
}
