//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules for one locker unit:
//! compartment addressing, availability, latch sequencing, door edge
//! detection and command routing. All interaction with hardware and the
//! broker happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod actuator;
pub mod commands;
pub mod compartment;
pub mod events;
pub mod monitor;
pub mod ports;
pub mod registry;
pub mod router;
pub mod topics;
