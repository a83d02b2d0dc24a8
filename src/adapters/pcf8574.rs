//! PCF8574 port-expander adapter: bridges the I²C bus to [`BankIo`].
//!
//! Four expanders share one bus: two drive the relay banks, two read the
//! door-switch banks. Each register access is a single one-byte I²C
//! transaction. This is the only module in the system that touches the
//! expanders.
//!
//! The PCF8574 has quasi-bidirectional pins: a pin reads its input only
//! after a `1` has been written to it, so the switch expanders must be
//! released with [`Pcf8574Banks::release_switch_inputs`] once at boot.

use core::cell::RefCell;

use embedded_hal::i2c::{Error as _, I2c};
use log::warn;

use crate::app::compartment::Bank;
use crate::app::ports::BankIo;
use crate::config::LockerConfig;
use crate::error::IoError;

/// All four expanders behind one I²C bus.
pub struct Pcf8574Banks<I2C> {
    bus: RefCell<I2C>,
    /// Indexed by [`Bank::index`].
    relay_addrs: [u8; 2],
    switch_addrs: [u8; 2],
}

impl<I2C: I2c> Pcf8574Banks<I2C> {
    pub fn new(i2c: I2C, config: &LockerConfig) -> Self {
        Self {
            bus: RefCell::new(i2c),
            relay_addrs: [config.relay_bank_a_addr, config.relay_bank_b_addr],
            switch_addrs: [config.switch_bank_a_addr, config.switch_bank_b_addr],
        }
    }

    /// Write all-ones to both switch expanders so every pin reads its input.
    pub fn release_switch_inputs(&self) -> Result<(), IoError> {
        for bank in Bank::ALL {
            let addr = self.switch_addrs[bank.index()];
            self.bus.borrow_mut().write(addr, &[0xFF]).map_err(|e| {
                warn!("PCF8574 0x{:02X}: release failed: {:?}", addr, e.kind());
                IoError::SwitchReadFailed(bank)
            })?;
        }
        Ok(())
    }

    /// Give the bus back (tests, shutdown).
    pub fn into_inner(self) -> I2C {
        self.bus.into_inner()
    }
}

impl<I2C: I2c> BankIo for Pcf8574Banks<I2C> {
    fn read_switches(&self, bank: Bank) -> Result<u8, IoError> {
        let addr = self.switch_addrs[bank.index()];
        let mut buf = [0u8; 1];
        self.bus.borrow_mut().read(addr, &mut buf).map_err(|e| {
            warn!("PCF8574 0x{:02X}: read failed: {:?}", addr, e.kind());
            IoError::SwitchReadFailed(bank)
        })?;
        Ok(buf[0])
    }

    fn write_relays(&self, bank: Bank, value: u8) -> Result<(), IoError> {
        let addr = self.relay_addrs[bank.index()];
        self.bus.borrow_mut().write(addr, &[value]).map_err(|e| {
            warn!("PCF8574 0x{:02X}: write failed: {:?}", addr, e.kind());
            IoError::RelayWriteFailed(bank)
        })
    }
}
