//! Relay actuator: serialised latch pulses for all sixteen compartments.
//!
//! ```text
//!   enqueue ──▶ [ FIFO, cap 32 ] ──▶ processor task
//!                                      │
//!                                      ├─ gate ─▶ write resting & !bit   (energise)
//!                                      ├─ delay settle_ms                (gate free)
//!                                      ├─ gate ─▶ write resting          (release)
//!                                      └─ delay dwell_ms                 (gate free)
//! ```
//!
//! Relays are active-low: a bank at rest reads `0xFF`. Every write is an
//! absolute pattern derived from the resting mask, never a toggle of the
//! last value, so a failed write cannot leave the next pulse inverted.
//!
//! The gate is an async mutex guarding the last driven pattern of both
//! banks. It is held only for the single bus write; both delays run with
//! it released so nothing else that touches the relay outputs is starved.

use core::cell::Cell;
use std::rc::Rc;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use embassy_sync::mutex::Mutex;
use log::{debug, error, info, warn};

use super::compartment::{Bank, CompartmentId, Location};
use super::events::LockerEvent;
use super::ports::{BankIo, Delay, EventSink, TaskSpawner};
use crate::config::LockerConfig;
use crate::error::{Error, IoError, Result};
use crate::pins::RELAY_RESTING_MASK;

/// Pending pulses beyond this are refused with [`Error::QueueFull`].
pub const ACTUATION_QUEUE_DEPTH: usize = 32;

/// One latch pulse for one compartment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuationRequest {
    pub id: CompartmentId,
    pub location: Location,
}

impl ActuationRequest {
    pub const fn new(id: CompartmentId) -> Self {
        Self {
            id,
            location: id.location(),
        }
    }
}

/// Where the request currently being serviced is in its pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuationPhase {
    Queued,
    PulsingOpen,
    Settling,
    PulsingClosed,
    Done,
}

/// Pulse timing, taken from [`LockerConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuationTiming {
    /// Relay energised time.
    pub settle_ms: u32,
    /// Pause after a pulse before the next request starts.
    pub dwell_ms: u32,
}

impl From<&LockerConfig> for ActuationTiming {
    fn from(cfg: &LockerConfig) -> Self {
        Self {
            settle_ms: cfg.settle_ms,
            dwell_ms: cfg.dwell_ms,
        }
    }
}

/// Told when a compartment's latch is about to be energised, i.e. when
/// its request leaves the queue.
pub trait LatchObserver {
    fn latch_energising(&self, id: CompartmentId);
}

/// Lifetime counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActuatorStats {
    pub completed: u32,
    pub failed: u32,
}

/// Relay state behind the gate.
struct RelayOutputs {
    resting: [u8; 2],
    /// Last pattern successfully written per bank, `None` until the first write.
    driven: [Option<u8>; 2],
}

pub struct RelayActuator<D: Delay> {
    io: Rc<dyn BankIo>,
    sink: Rc<dyn EventSink>,
    delay: D,
    timing: ActuationTiming,
    observer: Option<Rc<dyn LatchObserver>>,
    gate: Mutex<NoopRawMutex, RelayOutputs>,
    queue: Channel<NoopRawMutex, ActuationRequest, ACTUATION_QUEUE_DEPTH>,
    /// A processor task exists and will drain the queue.
    active: Cell<bool>,
    in_flight: Cell<Option<(CompartmentId, ActuationPhase)>>,
    stats: Cell<ActuatorStats>,
}

impl<D: Delay + 'static> RelayActuator<D> {
    pub fn new(
        io: Rc<dyn BankIo>,
        sink: Rc<dyn EventSink>,
        delay: D,
        timing: ActuationTiming,
    ) -> Self {
        Self {
            io,
            sink,
            delay,
            timing,
            observer: None,
            gate: Mutex::new(RelayOutputs {
                resting: [RELAY_RESTING_MASK; 2],
                driven: [None; 2],
            }),
            queue: Channel::new(),
            active: Cell::new(false),
            in_flight: Cell::new(None),
            stats: Cell::new(ActuatorStats::default()),
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Rc<dyn LatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Drive both banks to their resting pattern. Called once at boot so
    /// no latch is left energised by whatever the expanders powered up with.
    pub async fn reset_outputs(&self) -> core::result::Result<(), IoError> {
        let mut first_err = None;
        for bank in Bank::ALL {
            if let Err(e) = self.drive(bank, |out| out.resting[bank.index()]).await {
                error!("Relay: reset of bank {} failed: {}", bank, e);
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => {
                info!("Relay: both banks at rest");
                Ok(())
            }
        }
    }

    /// Queue a pulse and make sure a processor task is draining the queue.
    ///
    /// Never blocks. Requests are serviced strictly in arrival order.
    pub fn enqueue(self: &Rc<Self>, request: ActuationRequest, spawner: &dyn TaskSpawner) -> Result<()> {
        match self.queue.try_send(request) {
            Ok(()) => {}
            Err(TrySendError::Full(rejected)) => {
                warn!("Relay: queue full, dropping pulse for {}", rejected.id);
                return Err(Error::QueueFull);
            }
        }

        let depth = self.queue.len();
        debug!("Relay: queued {} (depth {})", request.id, depth);
        self.sink.emit(&LockerEvent::ActuationQueued { id: request.id, depth });

        if !self.active.replace(true) {
            spawner.spawn_local(Box::pin(Rc::clone(self).process_queue()));
        }
        Ok(())
    }

    async fn process_queue(self: Rc<Self>) {
        debug!("Relay: processor started");
        while let Ok(request) = self.queue.try_receive() {
            self.service(request).await;
        }
        self.in_flight.set(None);
        self.active.set(false);
        debug!("Relay: queue drained, processor idle");
    }

    /// One full pulse plus dwell. A failure abandons only this request.
    async fn service(&self, request: ActuationRequest) {
        let id = request.id;
        self.in_flight.set(Some((id, ActuationPhase::Queued)));

        let mut stats = self.stats.get();
        match self.pulse(request).await {
            Ok(()) => {
                stats.completed += 1;
                info!("Relay: pulse for compartment {} complete", id);
                self.sink.emit(&LockerEvent::ActuationCompleted(id));
            }
            Err(e) => {
                stats.failed += 1;
                error!("Relay: pulse for compartment {} abandoned: {}", id, e);
                self.sink.emit(&LockerEvent::ActuationFailed { id, error: e });
            }
        }
        self.stats.set(stats);

        self.delay.delay_ms(self.timing.dwell_ms).await;
        self.in_flight.set(Some((id, ActuationPhase::Done)));
    }

    async fn pulse(&self, request: ActuationRequest) -> core::result::Result<(), IoError> {
        let ActuationRequest { id, location } = request;
        let bank = location.bank;

        self.in_flight.set(Some((id, ActuationPhase::PulsingOpen)));
        if let Some(observer) = &self.observer {
            observer.latch_energising(id);
        }
        self.drive(bank, |out| out.resting[bank.index()] & !location.mask())
            .await?;
        self.sink.emit(&LockerEvent::ActuationStarted(id));

        self.in_flight.set(Some((id, ActuationPhase::Settling)));
        self.delay.delay_ms(self.timing.settle_ms).await;

        self.in_flight.set(Some((id, ActuationPhase::PulsingClosed)));
        self.drive(bank, |out| out.resting[bank.index()]).await
    }

    /// Write one absolute pattern to `bank` under the gate. The guard is
    /// dropped on return, before the caller's next suspension point.
    async fn drive(
        &self,
        bank: Bank,
        pattern: impl FnOnce(&RelayOutputs) -> u8,
    ) -> core::result::Result<(), IoError> {
        let mut outputs = self.gate.lock().await;
        let value = pattern(&*outputs);
        self.io.write_relays(bank, value)?;
        outputs.driven[bank.index()] = Some(value);
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    /// No processor task is running and nothing is queued.
    pub fn is_idle(&self) -> bool {
        !self.active.get() && self.queue.is_empty()
    }

    /// Requests waiting behind the one in flight.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn in_flight(&self) -> Option<(CompartmentId, ActuationPhase)> {
        self.in_flight.get()
    }

    pub fn stats(&self) -> ActuatorStats {
        self.stats.get()
    }

    /// True when nobody holds the relay gate right now.
    pub fn is_gate_free(&self) -> bool {
        self.gate.try_lock().is_ok()
    }

    /// Last pattern written to `bank`, or `None` if never written or the
    /// gate is currently held.
    pub fn driven(&self, bank: Bank) -> Option<u8> {
        self.gate
            .try_lock()
            .ok()
            .and_then(|outputs| outputs.driven[bank.index()])
    }
}
