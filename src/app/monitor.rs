//! Switch monitor: door edge detection for commanded compartments.
//!
//! ```text
//!            ensure_running(id)                    working set empty
//!   Stopped ────────────────────▶ Running ─────────────────────────▶ Stopped
//!                                   │  ▲
//!                                   └──┘ poll, delay(poll_interval)
//! ```
//!
//! A compartment enters the working set *queued* when its latch is
//! commanded and becomes *armed* once the actuator starts its pulse. A
//! rising switch bit turns it *open*; the matching falling bit publishes
//! `CLOSE` and removes it. An armed compartment that never opens expires
//! after `open_window_ms`; a queued one waits for its pulse however long the
//! actuator backlog is. Edges are reported for every tracked compartment:
//! the working set plus everything currently subscribed.
//!
//! At most one poll loop exists at a time. Each loop starts by adopting
//! the current switch registers as its baseline without reporting them.

use core::cell::{Cell, RefCell};
use std::rc::Rc;

use log::{debug, info, warn};

use super::actuator::LatchObserver;
use super::compartment::{Bank, COMPARTMENT_COUNT, CompartmentId, DoorState};
use super::events::LockerEvent;
use super::ports::{BankIo, Delay, EventSink, MessageBus, TaskSpawner};
use super::registry::CompartmentRegistry;
use super::topics::Topics;
use crate::config::LockerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Stopped,
    Running,
}

/// Why a compartment is in the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    /// Pulse still waiting in the actuator queue; the window has not started.
    Queued,
    /// Latch driven, door not yet seen open.
    Armed { polls_left: u32 },
    /// Door seen open, waiting for it to close.
    Open,
}

/// Compartments the poll loop is waiting on.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    slots: [Option<Interest>; COMPARTMENT_COUNT],
    /// Pulses requested but not yet started, per compartment.
    queued: [u8; COMPARTMENT_COUNT],
}

impl WorkingSet {
    /// Record one more pending pulse for `id`.
    pub fn queue(&mut self, id: CompartmentId) {
        let i = id.index();
        self.queued[i] = self.queued[i].saturating_add(1);
        if self.slots[i].is_none() {
            self.slots[i] = Some(Interest::Queued);
        }
    }

    /// A pulse for `id` has started: arm it, restarting its window. An
    /// already-open door stays open.
    pub fn arm(&mut self, id: CompartmentId, polls: u32) {
        let i = id.index();
        self.queued[i] = self.queued[i].saturating_sub(1);
        if self.slots[i] != Some(Interest::Open) {
            self.slots[i] = Some(Interest::Armed { polls_left: polls });
        }
    }

    pub fn mark_open(&mut self, id: CompartmentId) {
        self.slots[id.index()] = Some(Interest::Open);
    }

    /// Drop the current interest in `id`. With another pulse still pending
    /// it falls back to queued.
    pub fn remove(&mut self, id: CompartmentId) -> Option<Interest> {
        let i = id.index();
        let previous = self.slots[i].take();
        self.slots[i] = self.fallback(i);
        previous
    }

    fn fallback(&self, i: usize) -> Option<Interest> {
        (self.queued[i] > 0).then_some(Interest::Queued)
    }

    pub fn get(&self, id: CompartmentId) -> Option<Interest> {
        self.slots[id.index()]
    }

    pub fn contains(&self, id: CompartmentId) -> bool {
        self.slots[id.index()].is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Count one poll off every armed entry; drop and return those whose
    /// window ran out. Queued entries do not count down.
    fn tick_armed(&mut self) -> heapless::Vec<CompartmentId, COMPARTMENT_COUNT> {
        let mut expired = heapless::Vec::new();
        for id in CompartmentId::all() {
            let i = id.index();
            let Some(Interest::Armed { polls_left }) = self.slots[i] else {
                continue;
            };
            let polls_left = polls_left.saturating_sub(1);
            if polls_left > 0 {
                self.slots[i] = Some(Interest::Armed { polls_left });
            } else {
                self.slots[i] = self.fallback(i);
                // One entry per compartment at most; push cannot fail.
                let _ = expired.push(id);
            }
        }
        expired
    }
}

/// A door edge found by one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Edge {
    id: CompartmentId,
    door: DoorState,
}

pub struct SwitchMonitor<D: Delay> {
    registry: Rc<RefCell<CompartmentRegistry>>,
    io: Rc<dyn BankIo>,
    bus: Rc<dyn MessageBus>,
    sink: Rc<dyn EventSink>,
    topics: Topics,
    delay: D,
    poll_interval_ms: u32,
    open_window_polls: u32,
    state: Cell<MonitorState>,
    working: RefCell<WorkingSet>,
    /// Last switch register per bank in this run; `None` until the baseline.
    previous: Cell<[Option<u8>; 2]>,
    polls: Cell<u64>,
}

impl<D: Delay + 'static> SwitchMonitor<D> {
    pub fn new(
        config: &LockerConfig,
        topics: Topics,
        registry: Rc<RefCell<CompartmentRegistry>>,
        io: Rc<dyn BankIo>,
        bus: Rc<dyn MessageBus>,
        sink: Rc<dyn EventSink>,
        delay: D,
    ) -> Self {
        Self {
            registry,
            io,
            bus,
            sink,
            topics,
            delay,
            poll_interval_ms: config.poll_interval_ms,
            open_window_polls: config.open_window_polls(),
            state: Cell::new(MonitorState::Stopped),
            working: RefCell::new(WorkingSet::default()),
            previous: Cell::new([None; 2]),
            polls: Cell::new(0),
        }
    }

    /// Track `id` as queued and start the poll loop if none is running.
    /// Idempotent with respect to the loop: a second call only adds another
    /// pending pulse. The open window starts in [`LatchObserver::latch_energising`].
    pub fn ensure_running(self: &Rc<Self>, id: CompartmentId, spawner: &dyn TaskSpawner) {
        self.working.borrow_mut().queue(id);
        debug!("Monitor: compartment {} queued", id);

        if self.state.get() == MonitorState::Running {
            return;
        }
        self.state.set(MonitorState::Running);
        self.previous.set([None; 2]);
        self.sink.emit(&LockerEvent::MonitorStarted);
        spawner.spawn_local(Box::pin(Rc::clone(self).run()));
    }

    async fn run(self: Rc<Self>) {
        info!("Monitor: started ({} ms poll)", self.poll_interval_ms);
        loop {
            self.poll_once();
            if self.working.borrow().is_empty() {
                break;
            }
            self.delay.delay_ms(self.poll_interval_ms).await;
        }
        self.state.set(MonitorState::Stopped);
        self.sink.emit(&LockerEvent::MonitorStopped);
        info!("Monitor: stopped after {} polls", self.polls.get());
    }

    /// One sample of both banks: edge detection, publication and window
    /// accounting. A bank that fails to read counts as unchanged.
    pub fn poll_once(&self) {
        self.polls.set(self.polls.get() + 1);
        let mut previous = self.previous.get();
        let mut edges: heapless::Vec<Edge, COMPARTMENT_COUNT> = heapless::Vec::new();

        for bank in Bank::ALL {
            let register = match self.io.read_switches(bank) {
                Ok(r) => r,
                Err(e) => {
                    warn!("Monitor: {}, treating as no transition", e);
                    continue;
                }
            };
            match previous[bank.index()] {
                None => self.registry.borrow_mut().sync_door_states(bank, register),
                Some(last) if last != register => self.detect_edges(bank, register, &mut edges),
                Some(_) => {}
            }
            previous[bank.index()] = Some(register);
        }
        self.previous.set(previous);

        for edge in &edges {
            self.report(*edge);
        }

        let expired = self.working.borrow_mut().tick_armed();
        for id in expired {
            warn!("Monitor: compartment {} was never opened", id);
            self.sink.emit(&LockerEvent::OpenWindowExpired(id));
        }
    }

    fn detect_edges(
        &self,
        bank: Bank,
        register: u8,
        edges: &mut heapless::Vec<Edge, COMPARTMENT_COUNT>,
    ) {
        let mut registry = self.registry.borrow_mut();
        let mut working = self.working.borrow_mut();

        for id in bank.compartments() {
            let door = DoorState::from_register(register, id.location());
            if registry.door_state(id) == door {
                continue;
            }
            registry.set_door_state(id, door);

            if !(working.contains(id) || registry.is_subscribed(id)) {
                debug!("Monitor: untracked compartment {} now {:?}", id, door);
                continue;
            }
            match door {
                DoorState::Open => working.mark_open(id),
                DoorState::Closed => {
                    working.remove(id);
                }
            }
            // At most one edge per compartment per poll; push cannot fail.
            let _ = edges.push(Edge { id, door });
        }
    }

    fn report(&self, edge: Edge) {
        let status = edge.door.as_status();
        info!("Monitor: compartment {} {}", edge.id, status);
        self.bus
            .publish(&self.topics.status(edge.id), status.as_bytes());
        self.sink.emit(&match edge.door {
            DoorState::Open => LockerEvent::DoorOpened(edge.id),
            DoorState::Closed => LockerEvent::DoorClosed(edge.id),
        });
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> MonitorState {
        self.state.get()
    }

    pub fn interest(&self, id: CompartmentId) -> Option<Interest> {
        self.working.borrow().get(id)
    }

    pub fn tracked_len(&self) -> usize {
        self.working.borrow().len()
    }

    /// Polls taken since boot.
    pub fn polls(&self) -> u64 {
        self.polls.get()
    }
}

impl<D: Delay + 'static> LatchObserver for SwitchMonitor<D> {
    fn latch_energising(&self, id: CompartmentId) {
        if self.state.get() == MonitorState::Stopped {
            debug!("Monitor: compartment {} pulsed while stopped, not watched", id);
            return;
        }
        self.working.borrow_mut().arm(id, self.open_window_polls);
        debug!("Monitor: armed compartment {}", id);
    }
}
