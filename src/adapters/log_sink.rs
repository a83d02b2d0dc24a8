//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured locker events to the
//! ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{debug, info, warn};

use crate::app::events::LockerEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`LockerEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &LockerEvent) {
        match event {
            LockerEvent::RegistryRefreshed { available } => {
                debug!("REG   | refreshed, {} available", available);
            }
            LockerEvent::ActuationQueued { id, depth } => {
                info!("ACT   | queued compartment={} depth={}", id, depth);
            }
            LockerEvent::ActuationStarted(id) => {
                info!("ACT   | energised compartment={}", id);
            }
            LockerEvent::ActuationCompleted(id) => {
                info!("ACT   | released compartment={}", id);
            }
            LockerEvent::ActuationFailed { id, error } => {
                warn!("ACT   | FAILED compartment={} ({})", id, error);
            }
            LockerEvent::DoorOpened(id) => {
                info!("DOOR  | compartment={} OPEN", id);
            }
            LockerEvent::DoorClosed(id) => {
                info!("DOOR  | compartment={} CLOSE", id);
            }
            LockerEvent::OpenWindowExpired(id) => {
                warn!("DOOR  | compartment={} never opened", id);
            }
            LockerEvent::MonitorStarted => {
                info!("MON   | started");
            }
            LockerEvent::MonitorStopped => {
                info!("MON   | stopped");
            }
        }
    }
}
