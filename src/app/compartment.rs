//! Compartment identity and its fixed hardware location.
//!
//! ```text
//!   id:    1  2  3  4  5  6  7  8 │  9 10 11 12 13 14 15 16
//!   bank:  A  A  A  A  A  A  A  A │  B  B  B  B  B  B  B  B
//!   bit:   0  1  2  3  4  5  6  7 │  0  1  2  3  4  5  6  7
//! ```
//!
//! The mapping is a pure function of the id; nothing at runtime can move a
//! compartment to another bank or bit.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Number of compartments in one locker unit.
pub const COMPARTMENT_COUNT: usize = 16;

/// Compartments per bank (one 8-bit expander register).
pub const BANK_WIDTH: u8 = 8;

// ───────────────────────────────────────────────────────────────
// Bank
// ───────────────────────────────────────────────────────────────

/// One of the two 8-compartment hardware groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Bank {
    /// Compartments 1–8.
    A,
    /// Compartments 9–16.
    B,
}

impl Bank {
    pub const ALL: [Bank; 2] = [Bank::A, Bank::B];

    /// Array index for per-bank tables.
    pub const fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }

    /// Lowest compartment id on this bank.
    pub const fn first_id(self) -> u8 {
        match self {
            Self::A => 1,
            Self::B => 1 + BANK_WIDTH,
        }
    }

    /// Compartments on this bank, ascending.
    pub fn compartments(self) -> impl Iterator<Item = CompartmentId> {
        (0..BANK_WIDTH).map(move |bit| CompartmentId(self.first_id() + bit))
    }
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// CompartmentId
// ───────────────────────────────────────────────────────────────

/// A validated compartment id in `1..=16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct CompartmentId(u8);

impl CompartmentId {
    pub fn new(raw: u8) -> Result<Self, Error> {
        if (1..=COMPARTMENT_COUNT as u8).contains(&raw) {
            Ok(Self(raw))
        } else {
            Err(Error::UnknownCompartment(raw))
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// Zero-based slot for per-compartment tables.
    pub const fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    pub const fn bank(self) -> Bank {
        if self.0 <= BANK_WIDTH { Bank::A } else { Bank::B }
    }

    /// Inverse of [`index`](Self::index) for table construction.
    pub(crate) const fn from_index(index: usize) -> Self {
        debug_assert!(index < COMPARTMENT_COUNT);
        Self(index as u8 + 1)
    }

    /// Bank and bit position of this compartment.
    pub const fn location(self) -> Location {
        let bank = self.bank();
        Location {
            bank,
            bit: self.0 - bank.first_id(),
        }
    }

    /// All sixteen ids, bank A first, ascending.
    pub fn all() -> impl Iterator<Item = CompartmentId> {
        (1..=COMPARTMENT_COUNT as u8).map(CompartmentId)
    }
}

impl TryFrom<u8> for CompartmentId {
    type Error = Error;

    fn try_from(raw: u8) -> Result<Self, Error> {
        Self::new(raw)
    }
}

impl From<CompartmentId> for u8 {
    fn from(id: CompartmentId) -> u8 {
        id.0
    }
}

/// Parses the decimal id segment of a command topic.
impl FromStr for CompartmentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        // Reject signs, padding and leading zeros: the topic must match what
        // we subscribed to byte-for-byte.
        if s.is_empty() || s.starts_with('0') || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::UnknownCompartment(0));
        }
        let raw: u8 = s.parse().map_err(|_| Error::UnknownCompartment(0))?;
        Self::new(raw)
    }
}

impl fmt::Display for CompartmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ───────────────────────────────────────────────────────────────
// Location
// ───────────────────────────────────────────────────────────────

/// Physical address of a compartment's latch relay and door switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub bank: Bank,
    /// Bit position 0–7 within the bank register.
    pub bit: u8,
}

impl Location {
    /// Single-bit mask for this compartment within its bank register.
    pub const fn mask(self) -> u8 {
        1 << self.bit
    }
}

// ───────────────────────────────────────────────────────────────
// DoorState
// ───────────────────────────────────────────────────────────────

/// Debounced door position.
///
/// Switch polarity: bit LOW = closed, bit HIGH = open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DoorState {
    Closed,
    Open,
}

impl DoorState {
    /// Decode the door position of `loc` from its bank's switch register.
    pub const fn from_register(register: u8, loc: Location) -> Self {
        if register & loc.mask() != 0 {
            Self::Open
        } else {
            Self::Closed
        }
    }

    /// Status payload published on a door edge.
    pub const fn as_status(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSE",
        }
    }
}
