//! Command router: maps inbound topics onto locker operations.
//!
//! Every handler runs to completion inside the transport's message
//! callback and never waits: slow work (latch pulses, door monitoring) is
//! handed to the actuator and monitor tasks.
//!
//! | Topic                               | Reply topic                         | Payload                              |
//! |-------------------------------------|-------------------------------------|--------------------------------------|
//! | `request/locker`                    | `respond/locker`                    | `{"token":…,"compartments":"1,2"}`   |
//! | `<token>/check`                     | `<token>/check/respond`             | `ACK`                                |
//! | `<token>/check/compartment`         | `<token>/check/compartment/respond` | `{"compartments":"1,2"}`             |
//! | `<token>/{borrow,return}/<id>/open` | `<token>/borrow/<id>/status`        | `OPEN` / `CLOSE` (from the monitor)  |

use core::cell::RefCell;
use std::rc::Rc;

use log::{debug, info, warn};
use serde::Serialize;

use super::actuator::{ActuationRequest, ActuationTiming, RelayActuator};
use super::commands::LockerCommand;
use super::compartment::{COMPARTMENT_COUNT, CompartmentId};
use super::events::LockerEvent;
use super::monitor::SwitchMonitor;
use super::ports::{BankIo, Delay, EventSink, MessageBus, TaskSpawner};
use super::registry::CompartmentRegistry;
use super::topics::{OpenKind, RESPOND_LOCKER, Topics};
use crate::config::LockerConfig;
use crate::error::Result;

/// Liveness reply on `<token>/check/respond`.
pub const CHECK_ACK: &[u8] = b"ACK";

/// Reply to `request/locker`.
#[derive(Debug, Serialize)]
struct LockerAnnouncement<'a> {
    token: &'a str,
    compartments: &'a str,
}

/// Reply to `<token>/check/compartment`.
#[derive(Debug, Serialize)]
struct CompartmentReport<'a> {
    compartments: &'a str,
}

/// Everything the router needs from the outside world.
pub struct LockerPorts<D> {
    pub io: Rc<dyn BankIo>,
    pub bus: Rc<dyn MessageBus>,
    pub sink: Rc<dyn EventSink>,
    pub spawner: Rc<dyn TaskSpawner>,
    /// Drives the relay settle and dwell timers.
    pub relay_delay: D,
    /// Drives the switch monitor's poll interval.
    pub poll_delay: D,
}

pub struct CommandRouter<D: Delay> {
    topics: Topics,
    registry: Rc<RefCell<CompartmentRegistry>>,
    io: Rc<dyn BankIo>,
    bus: Rc<dyn MessageBus>,
    sink: Rc<dyn EventSink>,
    spawner: Rc<dyn TaskSpawner>,
    actuator: Rc<RelayActuator<D>>,
    monitor: Rc<SwitchMonitor<D>>,
}

impl<D: Delay + 'static> CommandRouter<D> {
    /// Wire the registry, actuator and monitor together over `ports`.
    pub fn new(config: &LockerConfig, topics: Topics, ports: LockerPorts<D>) -> Self {
        let LockerPorts {
            io,
            bus,
            sink,
            spawner,
            relay_delay,
            poll_delay,
        } = ports;

        let registry = Rc::new(RefCell::new(CompartmentRegistry::new()));
        let monitor = Rc::new(SwitchMonitor::new(
            config,
            topics.clone(),
            registry.clone(),
            io.clone(),
            bus.clone(),
            sink.clone(),
            poll_delay,
        ));
        // The open window starts when the latch is driven, not when queued.
        let actuator = Rc::new(
            RelayActuator::new(
                io.clone(),
                sink.clone(),
                relay_delay,
                ActuationTiming::from(config),
            )
            .with_observer(monitor.clone()),
        );

        Self {
            topics,
            registry,
            io,
            bus,
            sink,
            spawner,
            actuator,
            monitor,
        }
    }

    /// Called on every (re)connection: subscribe to the fixed topics, then
    /// refresh availability and subscribe to every free compartment.
    pub fn on_connected(&self) {
        info!("Router: connected as {}", self.topics.token());
        for topic in self.topics.fixed_subscriptions() {
            self.bus.subscribe(&topic);
        }
        self.refresh_and_resubscribe();
    }

    /// Dispatch one inbound message. Unknown topics are ignored.
    pub fn handle(&self, topic: &str, _payload: &[u8]) {
        let Some(command) = LockerCommand::parse(&self.topics, topic) else {
            debug!("Router: ignoring '{}'", topic);
            return;
        };

        match command {
            LockerCommand::ListLockers => self.announce(),
            LockerCommand::Check => {
                self.bus.publish(&self.topics.check_respond(), CHECK_ACK);
            }
            LockerCommand::CheckCompartments => self.report_compartments(),
            LockerCommand::Open { kind, id } => {
                if let Err(e) = self.open(kind, id) {
                    debug!("Router: {:?} {} dropped: {}", kind, id, e);
                }
            }
        }
    }

    fn announce(&self) {
        self.refresh_and_resubscribe();
        let csv = self.registry.borrow().available_csv();
        let reply = LockerAnnouncement {
            token: self.topics.token().as_str(),
            compartments: &csv,
        };
        self.publish_json(RESPOND_LOCKER, &reply);
    }

    fn report_compartments(&self) {
        self.refresh_and_resubscribe();
        let csv = self.registry.borrow().available_csv();
        self.publish_json(
            &self.topics.check_compartment_respond(),
            &CompartmentReport { compartments: &csv },
        );
    }

    /// Queue the latch pulse for `id`, then make sure its door is watched.
    fn open(&self, kind: OpenKind, id: CompartmentId) -> Result<()> {
        let location = self.registry.borrow().location_of(id.get())?;
        info!("Router: {:?} compartment {} (bank {}, bit {})", kind, id, location.bank, location.bit);

        self.actuator
            .enqueue(ActuationRequest { id, location }, self.spawner.as_ref())?;
        self.monitor.ensure_running(id, self.spawner.as_ref());
        Ok(())
    }

    /// Re-read the switches and bring the compartment subscriptions in
    /// line with the result. On a failed read the last known state is
    /// kept and re-announced.
    fn refresh_and_resubscribe(&self) {
        let mut registry = self.registry.borrow_mut();
        let before: heapless::Vec<CompartmentId, COMPARTMENT_COUNT> =
            registry.subscribed().iter().copied().collect();

        if let Err(e) = registry.refresh(self.io.as_ref()) {
            warn!("Router: refresh failed ({}), keeping last known compartments", e);
        }

        for id in before.iter().filter(|id| !registry.is_subscribed(**id)) {
            for topic in self.topics.compartment_subscriptions(*id) {
                self.bus.unsubscribe(&topic);
            }
        }
        for id in registry.subscribed() {
            for topic in self.topics.compartment_subscriptions(*id) {
                self.bus.subscribe(&topic);
            }
        }

        self.sink.emit(&LockerEvent::RegistryRefreshed {
            available: registry.available_count(),
        });
    }

    fn publish_json<T: Serialize>(&self, topic: &str, reply: &T) {
        match serde_json::to_vec(reply) {
            Ok(payload) => self.bus.publish(topic, &payload),
            Err(e) => warn!("Router: failed to encode reply for {}: {}", topic, e),
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn registry(&self) -> &Rc<RefCell<CompartmentRegistry>> {
        &self.registry
    }

    pub fn actuator(&self) -> &Rc<RelayActuator<D>> {
        &self.actuator
    }

    pub fn monitor(&self) -> &Rc<SwitchMonitor<D>> {
        &self.monitor
    }
}
