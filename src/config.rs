//! System configuration parameters
//!
//! All tunable parameters for the locker controller. Timings drive the
//! relay actuator and the switch monitor; addresses locate the four
//! port expanders; the broker settings are handed to the MQTT adapter.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pins;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockerConfig {
    // --- Relay actuation ---
    /// How long a latch stays energised (milliseconds)
    pub settle_ms: u32,
    /// Pause after a pulse before the next request is serviced (milliseconds)
    pub dwell_ms: u32,

    // --- Switch monitor ---
    /// Door-switch poll interval (milliseconds)
    pub poll_interval_ms: u32,
    /// How long a commanded compartment stays armed waiting for its door
    /// to open (milliseconds)
    pub open_window_ms: u32,

    // --- Port expanders ---
    pub relay_bank_a_addr: u8,
    pub relay_bank_b_addr: u8,
    pub switch_bank_a_addr: u8,
    pub switch_bank_b_addr: u8,
    pub i2c_freq_hz: u32,

    // --- Transport ---
    /// MQTT broker URL, e.g. `mqtt://172.20.10.7:1883`
    pub broker_url: String,
    /// MQTT keep-alive (seconds)
    pub broker_keepalive_secs: u16,
}

impl Default for LockerConfig {
    fn default() -> Self {
        Self {
            // Relay actuation
            settle_ms: 500,
            dwell_ms: 3000,

            // Switch monitor
            poll_interval_ms: 100, // 10 Hz
            open_window_ms: 30_000,

            // Port expanders
            relay_bank_a_addr: pins::RELAY_BANK_A_ADDR,
            relay_bank_b_addr: pins::RELAY_BANK_B_ADDR,
            switch_bank_a_addr: pins::SWITCH_BANK_A_ADDR,
            switch_bank_b_addr: pins::SWITCH_BANK_B_ADDR,
            i2c_freq_hz: pins::I2C_FREQ_HZ,

            // Transport
            broker_url: String::from("mqtt://172.20.10.7:1883"),
            broker_keepalive_secs: 60,
        }
    }
}

impl LockerConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would wedge the actuator or the monitor.
    /// Invalid ranges are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.settle_ms == 0 {
            return Err(ConfigError::ValidationFailed("settle_ms must be > 0"));
        }
        if self.dwell_ms == 0 {
            return Err(ConfigError::ValidationFailed("dwell_ms must be > 0"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("poll_interval_ms must be > 0"));
        }
        if self.poll_interval_ms > self.settle_ms {
            return Err(ConfigError::ValidationFailed(
                "poll_interval_ms must not exceed settle_ms",
            ));
        }
        if self.open_window_ms < self.poll_interval_ms {
            return Err(ConfigError::ValidationFailed(
                "open_window_ms must cover at least one poll",
            ));
        }

        let addrs = [
            self.relay_bank_a_addr,
            self.relay_bank_b_addr,
            self.switch_bank_a_addr,
            self.switch_bank_b_addr,
        ];
        for (i, a) in addrs.iter().enumerate() {
            if *a > 0x7F {
                return Err(ConfigError::ValidationFailed("I2C address must be 7-bit"));
            }
            if addrs[i + 1..].contains(a) {
                return Err(ConfigError::ValidationFailed("I2C addresses must be distinct"));
            }
        }

        if self.broker_url.is_empty() {
            return Err(ConfigError::ValidationFailed("broker_url must be set"));
        }
        Ok(())
    }

    /// Number of polls an armed compartment waits before expiring.
    pub fn open_window_polls(&self) -> u32 {
        (self.open_window_ms / self.poll_interval_ms.max(1)).max(1)
    }
}
