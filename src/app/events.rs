//! Outbound application events.
//!
//! The actuator, monitor and router emit these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them: log to serial, count them, forward them.
//! Door status payloads for clients go over the
//! [`MessageBus`](super::ports::MessageBus), not through here.

use super::compartment::CompartmentId;
use crate::error::IoError;

/// Structured events emitted by the locker core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockerEvent {
    /// The registry re-read both switch banks.
    RegistryRefreshed { available: u8 },

    /// A latch pulse was queued behind `depth - 1` others.
    ActuationQueued { id: CompartmentId, depth: usize },

    /// The relay for `id` was energised.
    ActuationStarted(CompartmentId),

    /// The relay for `id` returned to rest.
    ActuationCompleted(CompartmentId),

    /// A relay write failed; the request was abandoned.
    ActuationFailed { id: CompartmentId, error: IoError },

    /// Rising door-switch edge.
    DoorOpened(CompartmentId),

    /// Falling door-switch edge.
    DoorClosed(CompartmentId),

    /// A commanded compartment was never opened within its window.
    OpenWindowExpired(CompartmentId),

    MonitorStarted,
    MonitorStopped,
}
