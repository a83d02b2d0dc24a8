//! Timer adapter.
//!
//! Implements the [`Delay`] port on top of the `async-io-mini` timer
//! reactor. Only built for ESP-IDF: the reactor's clock comes from the
//! `embassy-time` driver that `esp-idf-svc` registers, and a host build has
//! no such driver to link against. Host tests drive the core with scripted
//! delays instead.

use core::time::Duration;

use async_io_mini::Timer;

use crate::app::ports::Delay;

/// Suspends the calling task for wall-clock milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimerDelay;

impl Delay for TimerDelay {
    async fn delay_ms(&self, ms: u32) {
        Timer::after(Duration::from_millis(u64::from(ms))).await;
    }
}
