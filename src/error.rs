//! Unified error types for the locker firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! router's and actuator's error handling uniform. All variants are `Copy`
//! so they can be logged, stored in events, and passed between tasks
//! without allocation.

use core::fmt;

use crate::app::compartment::Bank;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A command referenced a compartment with no current mapping.
    UnknownCompartment(u8),
    /// Port-expander read or write failed.
    Io(IoError),
    /// The actuation queue is saturated.
    QueueFull,
    /// Configuration is invalid.
    Config(ConfigError),
    /// A session token contains characters that would break topic routing.
    InvalidToken,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCompartment(id) => write!(f, "unknown compartment {id}"),
            Self::Io(e) => write!(f, "io: {e}"),
            Self::QueueFull => write!(f, "actuation queue full"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::InvalidToken => write!(f, "invalid session token"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Hardware I/O errors
// ---------------------------------------------------------------------------

/// Failure talking to a bank's port expander.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoError {
    /// Reading the switch register of `Bank` failed.
    SwitchReadFailed(Bank),
    /// Writing the relay register of `Bank` failed.
    RelayWriteFailed(Bank),
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SwitchReadFailed(bank) => write!(f, "switch read failed on bank {bank}"),
            Self::RelayWriteFailed(bank) => write!(f, "relay write failed on bank {bank}"),
        }
    }
}

impl core::error::Error for IoError {}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config could not be parsed.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl core::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
