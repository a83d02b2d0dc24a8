//! Mock hardware and transport adapters for integration tests.
//!
//! Every bus write, delay and broker call lands in one shared [`CallLog`],
//! so tests can assert on the interleaving across tasks, not just on each
//! adapter's own history.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use edge_executor::LocalExecutor;
use futures_lite::future;
use smartlocker::app::compartment::Bank;
use smartlocker::app::events::LockerEvent;
use smartlocker::app::monitor::MonitorState;
use smartlocker::app::ports::{BankIo, Delay, EventSink, MessageBus};
use smartlocker::app::router::{CommandRouter, LockerPorts};
use smartlocker::app::topics::{SessionToken, Topics};
use smartlocker::config::LockerConfig;
use smartlocker::error::IoError;

pub const TOKEN: &str = "tok";

// ── Call log ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HwCall {
    Write(Bank, u8),
    Delay { tag: &'static str, ms: u32 },
    Publish(String, String),
    Subscribe(String),
    Unsubscribe(String),
}

#[derive(Default)]
pub struct CallLog(RefCell<Vec<HwCall>>);

#[allow(dead_code)]
impl CallLog {
    pub fn push(&self, call: HwCall) {
        self.0.borrow_mut().push(call);
    }

    pub fn all(&self) -> Vec<HwCall> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    pub fn writes(&self) -> Vec<(Bank, u8)> {
        self.0
            .borrow()
            .iter()
            .filter_map(|c| match c {
                HwCall::Write(b, v) => Some((*b, *v)),
                _ => None,
            })
            .collect()
    }

    pub fn publishes(&self) -> Vec<(String, String)> {
        self.0
            .borrow()
            .iter()
            .filter_map(|c| match c {
                HwCall::Publish(t, p) => Some((t.clone(), p.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn publishes_on(&self, topic: &str) -> Vec<String> {
        self.publishes()
            .into_iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p)
            .collect()
    }
}

// ── MockBankIo ────────────────────────────────────────────────

/// Four port expanders: switch registers are set by the test, relay
/// writes are logged. Individual writes and reads can be made to fail.
pub struct MockBankIo {
    log: Rc<CallLog>,
    switches: Cell<[u8; 2]>,
    fail_reads: Cell<[bool; 2]>,
    /// Each entry fails exactly one matching write.
    fail_writes: RefCell<Vec<(Bank, u8)>>,
}

#[allow(dead_code)]
impl MockBankIo {
    pub fn new(log: Rc<CallLog>, switches: [u8; 2]) -> Self {
        Self {
            log,
            switches: Cell::new(switches),
            fail_reads: Cell::new([false; 2]),
            fail_writes: RefCell::new(Vec::new()),
        }
    }

    pub fn set_switches(&self, regs: [u8; 2]) {
        self.switches.set(regs);
    }

    /// Flip one door: `open = true` sets its switch bit.
    pub fn set_door(&self, id: u8, open: bool) {
        let idx = usize::from(id - 1);
        let (bank, bit) = (idx / 8, idx % 8);
        let mut regs = self.switches.get();
        if open {
            regs[bank] |= 1 << bit;
        } else {
            regs[bank] &= !(1 << bit);
        }
        self.switches.set(regs);
    }

    pub fn fail_reads(&self, bank: Bank, fail: bool) {
        let mut f = self.fail_reads.get();
        f[bank.index()] = fail;
        self.fail_reads.set(f);
    }

    pub fn fail_next_write(&self, bank: Bank, value: u8) {
        self.fail_writes.borrow_mut().push((bank, value));
    }
}

impl BankIo for MockBankIo {
    fn read_switches(&self, bank: Bank) -> Result<u8, IoError> {
        if self.fail_reads.get()[bank.index()] {
            return Err(IoError::SwitchReadFailed(bank));
        }
        Ok(self.switches.get()[bank.index()])
    }

    fn write_relays(&self, bank: Bank, value: u8) -> Result<(), IoError> {
        let mut fails = self.fail_writes.borrow_mut();
        if let Some(pos) = fails.iter().position(|f| *f == (bank, value)) {
            fails.remove(pos);
            return Err(IoError::RelayWriteFailed(bank));
        }
        self.log.push(HwCall::Write(bank, value));
        Ok(())
    }
}

// ── RecordingBus ──────────────────────────────────────────────

pub struct RecordingBus {
    log: Rc<CallLog>,
}

impl RecordingBus {
    pub fn new(log: Rc<CallLog>) -> Self {
        Self { log }
    }
}

impl MessageBus for RecordingBus {
    fn publish(&self, topic: &str, payload: &[u8]) {
        self.log.push(HwCall::Publish(
            topic.to_owned(),
            String::from_utf8_lossy(payload).into_owned(),
        ));
    }

    fn subscribe(&self, topic: &str) {
        self.log.push(HwCall::Subscribe(topic.to_owned()));
    }

    fn unsubscribe(&self, topic: &str) {
        self.log.push(HwCall::Unsubscribe(topic.to_owned()));
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink(RefCell<Vec<LockerEvent>>);

#[allow(dead_code)]
impl RecordingSink {
    pub fn events(&self) -> Vec<LockerEvent> {
        self.0.borrow().clone()
    }

    pub fn count(&self, pred: impl Fn(&LockerEvent) -> bool) -> usize {
        self.0.borrow().iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &LockerEvent) {
        self.0.borrow_mut().push(*event);
    }
}

// ── ScriptedDelay ─────────────────────────────────────────────

type DelayHook = Box<dyn FnMut(usize, u32)>;

struct DelayState {
    tag: &'static str,
    log: Rc<CallLog>,
    calls: Cell<usize>,
    hook: RefCell<Option<DelayHook>>,
}

/// Returns after one executor yield instead of sleeping. A hook runs on
/// every call with the 1-based call number, so tests can move switches
/// "while" a task is suspended.
#[derive(Clone)]
pub struct ScriptedDelay(Rc<DelayState>);

#[allow(dead_code)]
impl ScriptedDelay {
    pub fn new(tag: &'static str, log: Rc<CallLog>) -> Self {
        Self(Rc::new(DelayState {
            tag,
            log,
            calls: Cell::new(0),
            hook: RefCell::new(None),
        }))
    }

    pub fn on_delay(&self, hook: impl FnMut(usize, u32) + 'static) {
        *self.0.hook.borrow_mut() = Some(Box::new(hook));
    }

    pub fn calls(&self) -> usize {
        self.0.calls.get()
    }
}

impl Delay for ScriptedDelay {
    async fn delay_ms(&self, ms: u32) {
        let s = &self.0;
        s.log.push(HwCall::Delay { tag: s.tag, ms });
        let n = s.calls.get() + 1;
        s.calls.set(n);
        if let Some(hook) = s.hook.borrow_mut().as_mut() {
            hook(n, ms);
        }
        future::yield_now().await;
    }
}

// ── Locker rig ────────────────────────────────────────────────

/// A complete locker core over mocks, on a real local executor.
pub struct Rig {
    pub log: Rc<CallLog>,
    pub io: Rc<MockBankIo>,
    pub sink: Rc<RecordingSink>,
    pub relay_delay: ScriptedDelay,
    pub poll_delay: ScriptedDelay,
    pub executor: Rc<LocalExecutor<'static>>,
    pub router: Rc<CommandRouter<ScriptedDelay>>,
}

#[allow(dead_code)]
impl Rig {
    pub fn new(switches: [u8; 2]) -> Self {
        Self::with_config(switches, &LockerConfig::default())
    }

    pub fn with_config(switches: [u8; 2], config: &LockerConfig) -> Self {
        let log = Rc::new(CallLog::default());
        let io = Rc::new(MockBankIo::new(log.clone(), switches));
        let sink = Rc::new(RecordingSink::default());
        let relay_delay = ScriptedDelay::new("relay", log.clone());
        let poll_delay = ScriptedDelay::new("poll", log.clone());
        let executor: Rc<LocalExecutor<'static>> = Rc::new(LocalExecutor::new());

        let router = Rc::new(CommandRouter::new(
            config,
            Topics::new(SessionToken::new(TOKEN).unwrap()),
            LockerPorts {
                io: io.clone(),
                bus: Rc::new(RecordingBus::new(log.clone())),
                sink: sink.clone(),
                spawner: executor.clone(),
                relay_delay: relay_delay.clone(),
                poll_delay: poll_delay.clone(),
            },
        ));

        Self { log, io, sink, relay_delay, poll_delay, executor, router }
    }

    /// Connect and clear the subscription noise from the log.
    pub fn connected(self) -> Self {
        self.router.on_connected();
        self.log.clear();
        self
    }

    pub fn send(&self, topic: &str) {
        self.router.handle(topic, b"");
    }

    /// Drive the executor until the actuator is idle and the monitor has
    /// stopped.
    pub fn run_until_idle(&self) {
        let router = self.router.clone();
        future::block_on(self.executor.run(async move {
            for _ in 0..100_000 {
                future::yield_now().await;
                if router.actuator().is_idle()
                    && router.monitor().state() == MonitorState::Stopped
                {
                    return;
                }
            }
            panic!("locker never went idle");
        }));
    }

    pub fn status_topic(id: u8) -> String {
        format!("{TOKEN}/borrow/{id}/status")
    }
}
