//! Compartment registry: the single source of truth for availability.
//!
//! Holds one [`Compartment`] per id plus the set of compartments whose
//! open topics are currently subscribed. Only [`CompartmentRegistry::refresh`]
//! changes availability; only the switch monitor changes door state.

use log::{debug, info};

use super::compartment::{Bank, COMPARTMENT_COUNT, CompartmentId, DoorState, Location};
use super::ports::BankIo;
use crate::error::{Error, IoError, Result};

/// Live state of one compartment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compartment {
    pub id: CompartmentId,
    pub location: Location,
    pub door: DoorState,
    pub available: bool,
}

/// Registry of all sixteen compartments.
pub struct CompartmentRegistry {
    compartments: [Compartment; COMPARTMENT_COUNT],
    /// Compartments whose open topics were handed out on the last refresh.
    subscribed: heapless::Vec<CompartmentId, COMPARTMENT_COUNT>,
    /// Switch registers seen by the last successful refresh.
    last_registers: Option<[u8; 2]>,
}

impl Default for CompartmentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CompartmentRegistry {
    /// Every door closed, nothing available until the first refresh.
    pub fn new() -> Self {
        let compartments = core::array::from_fn(|i| {
            let id = CompartmentId::from_index(i);
            Compartment {
                id,
                location: id.location(),
                door: DoorState::Closed,
                available: false,
            }
        });
        Self {
            compartments,
            subscribed: heapless::Vec::new(),
            last_registers: None,
        }
    }

    // ── Refresh ───────────────────────────────────────────────

    /// Re-read both switch banks and recompute availability.
    ///
    /// Both banks are read before anything is mutated, so a failed read
    /// leaves the previous state untouched.
    pub fn refresh(&mut self, io: &dyn BankIo) -> core::result::Result<(), IoError> {
        let a = io.read_switches(Bank::A)?;
        let b = io.read_switches(Bank::B)?;
        self.apply_switch_registers([a, b]);
        Ok(())
    }

    /// Recompute availability and the subscription set from raw switch
    /// registers (index 0 = bank A).
    ///
    /// Door state is left alone: it belongs to the switch monitor, which
    /// would otherwise miss an edge that a refresh had already absorbed.
    pub fn apply_switch_registers(&mut self, registers: [u8; 2]) {
        self.subscribed.clear();
        for c in &mut self.compartments {
            let register = registers[c.location.bank.index()];
            c.available = DoorState::from_register(register, c.location) == DoorState::Closed;
            if c.available {
                // Capacity equals the compartment count; push cannot fail.
                let _ = self.subscribed.push(c.id);
            }
        }

        if self.last_registers != Some(registers) {
            info!(
                "Registry: switches A=0b{:08b} B=0b{:08b}, available [{}]",
                registers[0],
                registers[1],
                self.available_csv()
            );
        }
        self.last_registers = Some(registers);
    }

    // ── Queries ───────────────────────────────────────────────

    /// Available ids: bank A then bank B, ascending. Clients parse this
    /// positionally, so the order is part of the protocol.
    pub fn available_ids(&self) -> impl Iterator<Item = CompartmentId> + '_ {
        self.compartments.iter().filter(|c| c.available).map(|c| c.id)
    }

    /// Comma-joined available ids, e.g. `"1,3,9"`; empty when none.
    pub fn available_csv(&self) -> String {
        let mut csv = String::new();
        for id in self.available_ids() {
            if !csv.is_empty() {
                csv.push(',');
            }
            csv.push_str(&id.to_string());
        }
        csv
    }

    pub fn available_count(&self) -> u8 {
        self.available_ids().count() as u8
    }

    /// Resolve a commanded id to its latch location.
    ///
    /// Fails with [`Error::UnknownCompartment`] when the id is outside
    /// 1–16 or its topics were not handed out on the last refresh.
    pub fn location_of(&self, raw: u8) -> Result<Location> {
        let id = CompartmentId::new(raw)?;
        if !self.is_subscribed(id) {
            debug!("Registry: compartment {} not subscribed", id);
            return Err(Error::UnknownCompartment(raw));
        }
        Ok(id.location())
    }

    pub fn is_subscribed(&self, id: CompartmentId) -> bool {
        self.subscribed.contains(&id)
    }

    /// Compartments whose open topics are currently subscribed, ascending.
    pub fn subscribed(&self) -> &[CompartmentId] {
        &self.subscribed
    }

    pub fn compartment(&self, id: CompartmentId) -> &Compartment {
        &self.compartments[id.index()]
    }

    pub fn door_state(&self, id: CompartmentId) -> DoorState {
        self.compartments[id.index()].door
    }

    /// Record a debounced door edge observed by the switch monitor.
    pub fn set_door_state(&mut self, id: CompartmentId, door: DoorState) {
        self.compartments[id.index()].door = door;
    }

    /// Adopt `register` as the door baseline for every compartment of
    /// `bank`, without reporting anything.
    pub fn sync_door_states(&mut self, bank: Bank, register: u8) {
        for c in self.compartments.iter_mut().filter(|c| c.location.bank == bank) {
            c.door = DoorState::from_register(register, c.location);
        }
    }
}
