//! VexBridge Firmware: Main Entry Point
//!
//! Hexagonal architecture driven by a cooperative scheduler.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  LoadCell (HX711)  WifiAdapter   MqttAdapter   Esp32Clock      │
//! │  (WeightSensor)    (Link)        (Publisher)   (Clock)         │
//! │  HalfDuplexTransceiver + Rs485Uart (Bus)   LogEventSink        │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            BridgeService (pure logic)                  │    │
//! │  │  FrameReceiver · Codec · TelemetryStore · Stats        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Scheduler: link → publisher → sensor → bus → publish          │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::{Ets, FreeRtos};
use esp_idf_svc::hal::gpio::{AnyIOPin, PinDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::uart::{UartDriver, config::Config as UartConfig};
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

use vexbridge::adapters::hardware::BridgeHardware;
use vexbridge::adapters::log_sink::LogEventSink;
use vexbridge::adapters::mqtt::MqttAdapter;
use vexbridge::adapters::time::Esp32Clock;
use vexbridge::adapters::uart::Rs485Uart;
use vexbridge::adapters::wifi::WifiAdapter;
use vexbridge::app::ports::ClockPort;
use vexbridge::app::service::{BridgeService, TickDriver};
use vexbridge::config::BridgeConfig;
use vexbridge::drivers::watchdog::{self, Watchdog};
use vexbridge::error::Error;
use vexbridge::pins;
use vexbridge::protocol::transceiver::HalfDuplexTransceiver;
use vexbridge::scheduler::Scheduler;
use vexbridge::sensors::load_cell::LoadCell;

/// Main loop yield between scheduler polls.
const LOOP_SLEEP_MS: u32 = 1;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  VexBridge v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration (immutable from here on) ─────────────
    let config = build_config();
    config.validate()?;

    let peripherals = Peripherals::take()?;

    // ── 3. RS-485 bus: UART2 8N1 + DE/RE ──────────────────────
    info!(
        "RS485: UART{} TX=GPIO{} RX=GPIO{} DE/RE=GPIO{} @ {} baud",
        pins::RS485_UART_NUM,
        pins::RS485_TX_GPIO,
        pins::RS485_RX_GPIO,
        pins::RS485_DE_RE_GPIO,
        config.bus_baud
    );
    let uart = UartDriver::new(
        peripherals.uart2,
        peripherals.pins.gpio17,
        peripherals.pins.gpio16,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::default().baudrate(Hertz(config.bus_baud)),
    )?;
    let de_re = PinDriver::output(peripherals.pins.gpio4)?;
    let bus = HalfDuplexTransceiver::new(Rs485Uart::new(uart), de_re, Ets, config.bus_turnaround_us)
        .map_err(Error::from)?;

    // ── 4. Load cell (HX711) ──────────────────────────────────
    info!(
        "LoadCell: DOUT=GPIO{} SCK=GPIO{}",
        pins::HX711_DOUT_GPIO,
        pins::HX711_SCK_GPIO
    );
    let load_cell = LoadCell::new(
        PinDriver::input(peripherals.pins.gpio25)?,
        PinDriver::output(peripherals.pins.gpio26)?,
        Ets,
        config.sensor_ready_timeout_ms,
    )
    .map_err(Error::from)?;

    // ── 5. Network link + publish client ──────────────────────
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let esp_wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?,
        sysloop,
    )?;
    let mut wifi = WifiAdapter::new(esp_wifi, &config).map_err(Error::from)?;
    if !wifi.connect() {
        warn!("Link: starting offline, will retry");
    }
    let mqtt = MqttAdapter::new(&config).map_err(Error::from)?;

    // ── 6. Service + scheduler ────────────────────────────────
    let clock = Esp32Clock::new();
    let mut sink = LogEventSink::new();
    let mut hw = BridgeHardware::new(load_cell, wifi, mqtt);
    // SAFETY: esp_random has no preconditions.
    let client_suffix = unsafe { esp_idf_svc::sys::esp_random() } as u16;
    let mut service = BridgeService::new(config, bus, client_suffix)?;
    service.start(clock.now_ms(), &mut hw, &mut sink);

    let mut scheduler = Scheduler::from_config(service.config(), clock.now_ms());
    let mut wdt = Watchdog::new(watchdog::DEFAULT_TIMEOUT_MS);
    info!("System ready - entering main loop");

    // ── 7. Main loop ──────────────────────────────────────────
    loop {
        let now = clock.now_ms();
        let mut driver = TickDriver {
            service: &mut service,
            hw: &mut hw,
            sink: &mut sink,
        };
        scheduler.poll(now, &mut driver);
        wdt.feed(now);
        FreeRtos::delay_ms(LOOP_SLEEP_MS);
    }
}

/// Defaults plus WiFi credentials baked in at build time
/// (`VEXBRIDGE_WIFI_SSID`, `VEXBRIDGE_WIFI_PASS`).
fn build_config() -> BridgeConfig {
    let mut config = BridgeConfig::default();
    if let Some(ssid) = option_env!("VEXBRIDGE_WIFI_SSID") {
        if config.wifi_ssid.push_str(ssid).is_err() {
            warn!("Link: VEXBRIDGE_WIFI_SSID longer than 32 bytes, ignored");
        }
    }
    if let Some(pass) = option_env!("VEXBRIDGE_WIFI_PASS") {
        if config.wifi_password.push_str(pass).is_err() {
            warn!("Link: VEXBRIDGE_WIFI_PASS longer than 64 bytes, ignored");
        }
    }
    config
}
