//! Port traits: the hexagonal boundary between locker logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Registry · Actuator · Monitor · Router
//! ```
//!
//! Driven adapters (port expanders, message bus, timers, event sinks)
//! implement these traits. The core holds them behind `Rc<dyn …>` or
//! generics, so it never touches the I²C bus or the broker directly.
//!
//! All ports take `&self`: the core runs on one cooperative executor and
//! several tasks share each adapter. Implementations use interior
//! mutability where they need it.

use core::future::Future;
use core::pin::Pin;

use super::compartment::Bank;
use super::events::LockerEvent;
use crate::error::IoError;

// ───────────────────────────────────────────────────────────────
// Bank I/O port (driven adapter: domain ↔ port expanders)
// ───────────────────────────────────────────────────────────────

/// Raw register access for both banks. Each call is one atomic bus
/// transaction; the core adds no retries.
pub trait BankIo {
    /// Read the 8 door-switch bits of `bank` (bit HIGH = door open).
    fn read_switches(&self, bank: Bank) -> Result<u8, IoError>;

    /// Drive the 8 relay outputs of `bank` (bit LOW = latch energised).
    fn write_relays(&self, bank: Bank, value: u8) -> Result<(), IoError>;
}

// ───────────────────────────────────────────────────────────────
// Message bus port (driven adapter: domain ↔ pub/sub transport)
// ───────────────────────────────────────────────────────────────

/// The publish/subscribe capability of the transport.
///
/// Connection management, retries and delivery failures are the
/// adapter's business. From the core's point of view these calls
/// cannot fail.
pub trait MessageBus {
    fn publish(&self, topic: &str, payload: &[u8]);

    fn subscribe(&self, topic: &str);

    fn unsubscribe(&self, topic: &str);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`LockerEvent`]s through this port.
pub trait EventSink {
    fn emit(&self, event: &LockerEvent);
}

// ───────────────────────────────────────────────────────────────
// Delay port (driven adapter: domain → timer)
// ───────────────────────────────────────────────────────────────

/// Suspends the calling task. The only suspension points in the core
/// besides gate acquisition.
pub trait Delay {
    fn delay_ms(&self, ms: u32) -> impl Future<Output = ()>;
}

// ───────────────────────────────────────────────────────────────
// Task spawner port (driven adapter: domain → executor)
// ───────────────────────────────────────────────────────────────

/// A detached, single-threaded background task.
pub type LocalTask = Pin<Box<dyn Future<Output = ()>>>;

/// Starts background tasks on the local executor. The router calls this
/// from inside the transport callback, so it must not block.
pub trait TaskSpawner {
    fn spawn_local(&self, task: LocalTask);
}
