//! SmartLocker firmware entry point.
//!
//! Hexagonal architecture on a single cooperative executor.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  Pcf8574Banks   EspMqttBus   LogEventSink   TimerDelay         │
//! │  (BankIo)       (MessageBus) (EventSink)    (Delay)            │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  CommandRouter → Registry · RelayActuator · Monitor    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  MQTT event thread ──Inbox──▶ LocalExecutor (main thread)      │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use edge_executor::LocalExecutor;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::mqtt::client::{EspMqttClient, MqttClientConfiguration};
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{info, warn};

use smartlocker::adapters::device_id;
use smartlocker::adapters::inbox::Inbox;
use smartlocker::adapters::log_sink::LogEventSink;
use smartlocker::adapters::mqtt::{self, EspMqttBus};
use smartlocker::adapters::pcf8574::Pcf8574Banks;
use smartlocker::adapters::time::TimerDelay;
use smartlocker::adapters::wifi::{self, WifiCredentials};
use smartlocker::app::router::{CommandRouter, LockerPorts};
use smartlocker::app::topics::{SessionToken, Topics};
use smartlocker::config::LockerConfig;

/// Broker → executor hand-off. Filled by the MQTT event thread.
static INBOX: Inbox<CriticalSectionRawMutex> = Inbox::new();

/// Build-time overrides on top of the defaults.
fn load_config() -> LockerConfig {
    let mut config = match option_env!("LOCKER_CONFIG_JSON") {
        Some(json) => LockerConfig::from_json(json).unwrap_or_else(|e| {
            warn!("Config: LOCKER_CONFIG_JSON rejected ({}), using defaults", e);
            LockerConfig::default()
        }),
        None => LockerConfig::default(),
    };
    if let Some(url) = option_env!("LOCKER_BROKER_URL") {
        config.broker_url = url.to_string();
    }
    config
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  SmartLocker v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = load_config();
    config.validate()?;

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // ── 2. Port expanders ─────────────────────────────────────
    // SDA/SCL match pins::I2C_SDA_GPIO / pins::I2C_SCL_GPIO.
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio8,
        peripherals.pins.gpio9,
        &I2cConfig::new().baudrate(Hertz(config.i2c_freq_hz)),
    )?;
    let banks = Rc::new(Pcf8574Banks::new(i2c, &config));
    if let Err(e) = banks.release_switch_inputs() {
        warn!("Switch expanders not released ({}), door reads may be stale", e);
    }

    // ── 3. Network ────────────────────────────────────────────
    let creds = WifiCredentials::from_build_env()?;
    let _wifi = wifi::connect_station(peripherals.modem, sysloop, nvs, &creds)?;

    let mac = device_id::read_mac();
    let token = SessionToken::new(device_id::session_token(&mac).as_str())?;
    info!("Device {} session token {}", device_id::mac_string(&mac), token);

    let (client, connection) = EspMqttClient::new(
        &config.broker_url,
        &MqttClientConfiguration {
            client_id: Some(token.as_str()),
            keep_alive_interval: Some(Duration::from_secs(u64::from(config.broker_keepalive_secs))),
            ..Default::default()
        },
    )?;
    std::thread::Builder::new()
        .name("mqtt-events".into())
        .stack_size(6 * 1024)
        .spawn(move || mqtt::pump_connection(connection, &INBOX))?;

    // ── 4. Locker core ────────────────────────────────────────
    let executor: Rc<LocalExecutor<'static>> = Rc::new(LocalExecutor::new());
    let router = Rc::new(CommandRouter::new(
        &config,
        Topics::new(token),
        LockerPorts {
            io: banks,
            bus: Rc::new(EspMqttBus::new(client)),
            sink: Rc::new(LogEventSink::new()),
            spawner: executor.clone(),
            relay_delay: TimerDelay,
            poll_delay: TimerDelay,
        },
    ));

    info!("Locker core ready, broker {}", config.broker_url);

    let main_task = async move {
        if let Err(e) = router.actuator().reset_outputs().await {
            warn!("Relay reset failed ({}), continuing", e);
        }
        INBOX.serve(&router).await;
    };
    futures_lite::future::block_on(executor.run(main_task));
    Ok(())
}
