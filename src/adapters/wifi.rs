//! WiFi station-mode adapter.
//!
//! Implements [`LinkPort`]: the hexagonal boundary for network
//! connectivity.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver calls via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## Reconnection policy
//!
//! A reconnect makes at most `link_retry_attempts` association attempts
//! spaced `link_retry_delay_ms` apart, then gives up until the next link
//! check.  With the defaults that bounds one reconnect at ~5 s.

use log::{info, warn};

use crate::app::ports::LinkPort;
use crate::config::BridgeConfig;
use crate::error::CommsError;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), CommsError> {
    if ssid.is_empty() {
        return Err(CommsError::NoCredentials);
    }
    if ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(CommsError::InvalidCredentials);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), CommsError> {
    // Empty = open network.
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(CommsError::InvalidCredentials);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    retry_attempts: u8,
    retry_delay_ms: u32,
    #[cfg(target_os = "espidf")]
    wifi: esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>,
    /// Simulation: whether an access point is reachable.
    #[cfg(not(target_os = "espidf"))]
    sim_ap_available: bool,
    #[cfg(not(target_os = "espidf"))]
    sim_associated: bool,
    /// Simulation: association attempts made so far.
    #[cfg(not(target_os = "espidf"))]
    sim_attempts: u32,
}

impl WifiAdapter {
    fn validated(config: &BridgeConfig) -> Result<(heapless::String<32>, heapless::String<64>), CommsError> {
        validate_ssid(&config.wifi_ssid)?;
        validate_password(&config.wifi_password)?;
        Ok((config.wifi_ssid.clone(), config.wifi_password.clone()))
    }

    /// Associate with the configured access point, retrying within the
    /// configured budget.  Used at boot and by [`LinkPort::reconnect`].
    pub fn connect(&mut self) -> bool {
        info!("Link: connecting to '{}'", self.ssid);
        for attempt in 1..=self.retry_attempts {
            if self.platform_associate() {
                info!("Link: connected (attempt {})", attempt);
                return true;
            }
            if attempt < self.retry_attempts {
                self.platform_delay(self.retry_delay_ms);
            }
        }
        warn!(
            "Link: '{}' unreachable after {} attempts",
            self.ssid, self.retry_attempts
        );
        false
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    pub fn new(
        mut wifi: esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>,
        config: &BridgeConfig,
    ) -> Result<Self, CommsError> {
        use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};

        let (ssid, password) = Self::validated(config)?;
        let auth_method = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let client = ClientConfiguration {
            ssid: ssid.clone(),
            password: password.clone(),
            auth_method,
            ..Default::default()
        };
        wifi.set_configuration(&Configuration::Client(client))
            .map_err(|e| {
                warn!("Link: configuration rejected: {:?}", e);
                CommsError::InvalidCredentials
            })?;
        wifi.start().map_err(|e| {
            warn!("Link: driver start failed: {:?}", e);
            CommsError::ConnectFailed
        })?;

        Ok(Self {
            ssid,
            password,
            retry_attempts: config.link_retry_attempts.max(1),
            retry_delay_ms: config.link_retry_delay_ms,
            wifi,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(config: &BridgeConfig) -> Result<Self, CommsError> {
        let (ssid, password) = Self::validated(config)?;
        Ok(Self {
            ssid,
            password,
            retry_attempts: config.link_retry_attempts.max(1),
            retry_delay_ms: config.link_retry_delay_ms,
            sim_ap_available: true,
            sim_associated: false,
            sim_attempts: 0,
        })
    }

    #[cfg(target_os = "espidf")]
    fn platform_associate(&mut self) -> bool {
        let _ = self.wifi.disconnect();
        match self.wifi.connect().and_then(|()| self.wifi.wait_netif_up()) {
            Ok(()) => true,
            Err(e) => {
                warn!("Link: association failed: {:?}", e);
                false
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_associate(&mut self) -> bool {
        self.sim_attempts = self.sim_attempts.wrapping_add(1);
        self.sim_associated = self.sim_ap_available;
        self.sim_associated
    }

    #[cfg(target_os = "espidf")]
    fn platform_delay(&self, ms: u32) {
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(ms);
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_delay(&self, _ms: u32) {}

    #[cfg(target_os = "espidf")]
    fn platform_is_up(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_up(&self) -> bool {
        self.sim_associated
    }

    /// Simulation: make the access point appear or vanish.  Vanishing
    /// also drops the current association.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_ap_available(&mut self, available: bool) {
        self.sim_ap_available = available;
        if !available {
            self.sim_associated = false;
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_attempts(&self) -> u32 {
        self.sim_attempts
    }

    /// True when the configured network is open (no password).
    pub fn is_open_network(&self) -> bool {
        self.password.is_empty()
    }
}

// ───────────────────────────────────────────────────────────────
// LinkPort
// ───────────────────────────────────────────────────────────────

impl LinkPort for WifiAdapter {
    fn is_up(&self) -> bool {
        self.platform_is_up()
    }

    fn reconnect(&mut self) -> bool {
        self.connect()
    }
}
