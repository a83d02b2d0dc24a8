//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements   | Connects to                     |
//! |-------------|--------------|---------------------------------|
//! | `pcf8574`   | BankIo       | PCF8574 expanders over I²C      |
//! | `mqtt`      | MessageBus   | ESP-IDF MQTT client             |
//! | `log_sink`  | EventSink    | Serial log output               |
//! | `time`      | Delay        | `async-io-mini` timers (ESP-IDF) |
//! | `executor`  | TaskSpawner  | `edge-executor` local executor  |
//! | `inbox`     | (none)       | transport thread → executor     |
//! | `device_id` | (none)       | eFuse MAC → session token       |
//! | `wifi`      | (none)       | ESP-IDF WiFi STA                |

pub mod device_id;
pub mod executor;
pub mod inbox;
pub mod log_sink;
#[cfg(target_os = "espidf")]
pub mod mqtt;
pub mod pcf8574;
#[cfg(target_os = "espidf")]
pub mod time;
pub mod wifi;
