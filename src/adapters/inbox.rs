//! Inbound message channel between the transport thread and the core.
//!
//! ```text
//! ┌──────────────────┐  InboundMsg  ┌─────────────────────────┐
//! │ MQTT event thread│─────────────▶│ executor (router tasks) │
//! │   (blocking)     │  reconnected │   (async, single core)  │
//! └──────────────────┘─────────────▶└─────────────────────────┘
//! ```
//!
//! The transport callback only copies the topic into a fixed-size message
//! and returns; the router runs on the executor thread where the rest of
//! the core lives. Messages go through an `embassy-sync` bounded channel,
//! so a burst beyond [`INBOX_DEPTH`] is dropped at the producer instead of
//! blocking the transport. A (re)connection is latched in a separate
//! `Signal` and is never dropped: it is handled before any queued message.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use futures_lite::future;
use heapless::{String, Vec};
use log::{info, warn};

use crate::app::ports::Delay;
use crate::app::router::CommandRouter;

/// Longest topic accepted from the broker.
pub const MAX_TOPIC_LEN: usize = 96;

/// Payload bytes kept per message; the router ignores payloads today.
pub const MAX_PAYLOAD_LEN: usize = 64;

/// Channel depth for inbound messages.
pub const INBOX_DEPTH: usize = 8;

/// A message that arrived on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMsg {
    pub topic: String<MAX_TOPIC_LEN>,
    pub payload: Vec<u8, MAX_PAYLOAD_LEN>,
}

enum Wake {
    Reconnected,
    Message(InboundMsg),
}

/// Bounded inbound queue plus a reconnection latch. Use
/// `CriticalSectionRawMutex` when the producer is another thread.
pub struct Inbox<M: RawMutex> {
    channel: Channel<M, InboundMsg, INBOX_DEPTH>,
    reconnected: Signal<M, ()>,
}

impl<M: RawMutex> Default for Inbox<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> Inbox<M> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            reconnected: Signal::new(),
        }
    }

    /// Producer side: report a (re)connection. Several reports before the
    /// consumer runs collapse into one.
    pub fn post_connected(&self) {
        self.reconnected.signal(());
    }

    /// Producer side: queue one message. Oversized topics are dropped;
    /// oversized payloads are truncated to empty.
    pub fn post_message(&self, topic: &str, payload: &[u8]) -> bool {
        let Ok(topic) = String::try_from(topic) else {
            warn!("Inbox: topic too long ({} bytes), dropped", topic.len());
            return false;
        };
        let payload = Vec::from_slice(payload).unwrap_or_default();
        if self.channel.try_send(InboundMsg { topic, payload }).is_err() {
            warn!("Inbox: full, message dropped");
            return false;
        }
        true
    }

    /// Dispatch everything pending right now, a latched reconnection first.
    /// Returns how many items were handled.
    pub fn dispatch_pending<D: Delay + 'static>(&self, router: &CommandRouter<D>) -> usize {
        let mut handled = 0;
        if self.reconnected.try_take().is_some() {
            reconnect(router);
            handled += 1;
        }
        while let Ok(msg) = self.channel.try_receive() {
            router.handle(&msg.topic, &msg.payload);
            handled += 1;
        }
        handled
    }

    /// Consumer side: feed the router forever.
    pub async fn serve<D: Delay + 'static>(&self, router: &CommandRouter<D>) {
        loop {
            // The latch is polled first, so a reconnection overtakes a backlog.
            let wake = future::or(
                async {
                    self.reconnected.wait().await;
                    Wake::Reconnected
                },
                async { Wake::Message(self.channel.receive().await) },
            )
            .await;
            match wake {
                Wake::Reconnected => reconnect(router),
                Wake::Message(msg) => router.handle(&msg.topic, &msg.payload),
            }
        }
    }
}

fn reconnect<D: Delay + 'static>(router: &CommandRouter<D>) {
    info!("Inbox: broker session (re)established");
    router.on_connected();
}
