//! Topic namespace for one locker unit.
//!
//! Every per-unit topic is prefixed with the session token so several
//! lockers can share one broker. Only the discovery pair
//! (`request/locker` → `respond/locker`) is global.
//!
//! | Direction | Topic                               | Payload            |
//! |-----------|-------------------------------------|--------------------|
//! | in        | `request/locker`                    | ignored            |
//! | out       | `respond/locker`                    | `{token, compartments}` |
//! | in        | `<token>/check`                     | ignored            |
//! | out       | `<token>/check/respond`             | `ACK`              |
//! | in        | `<token>/check/compartment`         | ignored            |
//! | out       | `<token>/check/compartment/respond` | `{compartments}`   |
//! | in        | `<token>/borrow/<id>/open`          | ignored            |
//! | in        | `<token>/return/<id>/open`          | ignored            |
//! | out       | `<token>/borrow/<id>/status`        | `OPEN` / `CLOSE`   |

use core::fmt;

use super::compartment::CompartmentId;
use crate::error::Error;

/// Global discovery request.
pub const REQUEST_LOCKER: &str = "request/locker";
/// Global discovery response.
pub const RESPOND_LOCKER: &str = "respond/locker";

/// Opaque per-process identifier namespacing this unit's topics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a token, rejecting anything that would split or wildcard a
    /// topic (`/`, `+`, `#`), whitespace, and the empty string.
    pub fn new(token: impl Into<String>) -> Result<Self, Error> {
        let token = token.into();
        let valid = !token.is_empty()
            && token
                .chars()
                .all(|c| !c.is_whitespace() && !matches!(c, '/' | '+' | '#'));
        if valid { Ok(Self(token)) } else { Err(Error::InvalidToken) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which request opened a compartment. Both drive the same latch pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenKind {
    Borrow,
    Return,
}

impl OpenKind {
    const fn segment(self) -> &'static str {
        match self {
            Self::Borrow => "borrow",
            Self::Return => "return",
        }
    }
}

/// Builds every topic string for one session token.
#[derive(Debug, Clone)]
pub struct Topics {
    token: SessionToken,
}

impl Topics {
    pub fn new(token: SessionToken) -> Self {
        Self { token }
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn check(&self) -> String {
        format!("{}/check", self.token)
    }

    pub fn check_respond(&self) -> String {
        format!("{}/check/respond", self.token)
    }

    pub fn check_compartment(&self) -> String {
        format!("{}/check/compartment", self.token)
    }

    pub fn check_compartment_respond(&self) -> String {
        format!("{}/check/compartment/respond", self.token)
    }

    /// Command topic that pulses the latch of `id`.
    pub fn open(&self, kind: OpenKind, id: CompartmentId) -> String {
        format!("{}/{}/{}/open", self.token, kind.segment(), id)
    }

    /// Door edges are reported on the borrow status topic for both kinds.
    pub fn status(&self, id: CompartmentId) -> String {
        format!("{}/borrow/{}/status", self.token, id)
    }

    /// Fixed command topics subscribed once per connection.
    pub fn fixed_subscriptions(&self) -> [String; 3] {
        [
            REQUEST_LOCKER.to_string(),
            self.check(),
            self.check_compartment(),
        ]
    }

    /// Both open topics for `id`.
    pub fn compartment_subscriptions(&self, id: CompartmentId) -> [String; 2] {
        [self.open(OpenKind::Borrow, id), self.open(OpenKind::Return, id)]
    }
}
