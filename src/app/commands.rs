//! Inbound commands to the command router.
//!
//! The transport hands the router a raw topic string; [`LockerCommand::parse`]
//! turns it into one of these. Payloads are ignored by every command.
//! Anything that does not parse is dropped without a reply.

use super::compartment::CompartmentId;
use super::topics::{OpenKind, REQUEST_LOCKER, Topics};

/// Commands that external clients can send into the locker core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockerCommand {
    /// Global discovery: who is out there and what is free.
    ListLockers,

    /// Liveness check for this unit.
    Check,

    /// Re-read the switches and report the free compartments.
    CheckCompartments,

    /// Pulse the latch of one compartment.
    Open { kind: OpenKind, id: CompartmentId },
}

impl LockerCommand {
    /// Parse a topic addressed to this unit.
    ///
    /// Returns `None` for foreign tokens, unknown verbs, and ids outside
    /// 1–16. Whether the id is currently subscribed is the router's call.
    pub fn parse(topics: &Topics, topic: &str) -> Option<Self> {
        if topic == REQUEST_LOCKER {
            return Some(Self::ListLockers);
        }

        let rest = topic
            .strip_prefix(topics.token().as_str())?
            .strip_prefix('/')?;

        let mut parts = rest.split('/');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some("check"), None, None, None) => Some(Self::Check),
            (Some("check"), Some("compartment"), None, None) => Some(Self::CheckCompartments),
            (Some(verb), Some(id), Some("open"), None) => {
                let kind = match verb {
                    "borrow" => OpenKind::Borrow,
                    "return" => OpenKind::Return,
                    _ => return None,
                };
                let id = id.parse().ok()?;
                Some(Self::Open { kind, id })
            }
            _ => None,
        }
    }
}
