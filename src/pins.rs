//! I²C bus and port-expander assignments for the locker controller board.
//!
//! Single source of truth: the config defaults and the PCF8574 adapter
//! reference this module rather than hard-coding addresses.
//!
//! Two relay boards and two switch boards hang off one I²C bus, each driven
//! by a PCF8574 8-bit quasi-bidirectional expander.

// ---------------------------------------------------------------------------
// Relay drivers (active-low relay boards)
// ---------------------------------------------------------------------------

/// PCF8574 driving the latch relays of compartments 1–8.
pub const RELAY_BANK_A_ADDR: u8 = 0x20;
/// PCF8574 driving the latch relays of compartments 9–16.
pub const RELAY_BANK_B_ADDR: u8 = 0x21;

/// Relay register value with every latch de-energised.
pub const RELAY_RESTING_MASK: u8 = 0xFF;

// ---------------------------------------------------------------------------
// Door switches
// ---------------------------------------------------------------------------

/// PCF8574 reading the door switches of compartments 1–8.
/// LOW = door closed, HIGH = door open.
pub const SWITCH_BANK_A_ADDR: u8 = 0x23;
/// PCF8574 reading the door switches of compartments 9–16.
pub const SWITCH_BANK_B_ADDR: u8 = 0x22;

// ---------------------------------------------------------------------------
// I²C master
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 8;
pub const I2C_SCL_GPIO: i32 = 9;
/// Standard-mode I²C; the PCF8574 tops out at 100 kHz.
pub const I2C_FREQ_HZ: u32 = 100_000;
