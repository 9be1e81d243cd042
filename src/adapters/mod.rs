//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements        | Connects to                   |
//! |------------|-------------------|-------------------------------|
//! | `hardware` | WeightSensorPort  | Load cell driver              |
//! |            | LinkPort          | WiFi adapter                  |
//! |            | PublisherPort     | MQTT adapter                  |
//! | `log_sink` | EventSink         | Serial log output             |
//! | `mqtt`     | PublisherPort     | ESP-IDF MQTT client           |
//! | `time`     | ClockPort         | ESP32 system timer            |
//! | `uart`     | Transport         | UART2 → MAX485                |
//! | `wifi`     | LinkPort          | ESP-IDF WiFi STA              |

pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod time;
pub mod uart;
pub mod wifi;
