//! Activity timestamps shared by every subsystem.
//!
//! The input task, the configuration link and the power manager all write
//! here concurrently. Each write is a single atomic operation on a
//! millisecond timestamp, so no lock is needed.

use embassy_time::{Duration, Instant};
use portable_atomic::{AtomicBool, AtomicU64, Ordering};

/// Timestamps of the last user, radio and keep-alive events, shared between tasks.
pub struct ActivityClock {
    last_activity: AtomicU64,
    last_radio_activity: AtomicU64,
    keep_alive_until: AtomicU64,
    inputs_held: AtomicBool,
}

impl ActivityClock {
    /// Create a clock with every timestamp at boot.
    pub const fn new() -> Self {
        Self {
            last_activity: AtomicU64::new(0),
            last_radio_activity: AtomicU64::new(0),
            keep_alive_until: AtomicU64::new(0),
            inputs_held: AtomicBool::new(false),
        }
    }

    /// Record user interaction at `now`.
    ///
    /// Timestamps only move forward, so a late write from a slower task
    /// cannot rewind the clock.
    pub fn record(&self, now: Instant) {
        self.last_activity.fetch_max(now.as_millis(), Ordering::AcqRel);
    }

    /// Record traffic on the wireless link.
    pub fn record_radio(&self, now: Instant) {
        self.last_radio_activity
            .fetch_max(now.as_millis(), Ordering::AcqRel);
    }

    /// Keep-alive ping from the peer: allow inactivity until `now + grace`.
    ///
    /// Counts as radio traffic but not as user interaction. A ping never
    /// shortens a window granted by an earlier one.
    pub fn keep_alive(&self, now: Instant, grace: Duration) {
        let until = (now + grace).as_millis();
        self.keep_alive_until.fetch_max(until, Ordering::AcqRel);
        self.record_radio(now);
    }

    /// Time of the last user interaction.
    pub fn last_activity(&self) -> Instant {
        Instant::from_millis(self.last_activity.load(Ordering::Acquire))
    }

    /// Time of the last traffic on the wireless link.
    pub fn last_radio_activity(&self) -> Instant {
        Instant::from_millis(self.last_radio_activity.load(Ordering::Acquire))
    }

    /// End of the current keep-alive grace window.
    pub fn keep_alive_until(&self) -> Instant {
        Instant::from_millis(self.keep_alive_until.load(Ordering::Acquire))
    }

    /// Check if a keep-alive grace window is still open at `now`.
    pub fn keep_alive_active(&self, now: Instant) -> bool {
        now < self.keep_alive_until()
    }

    /// Time since the last user interaction.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity())
    }

    /// Published by the input task every cycle.
    pub fn set_inputs_held(&self, held: bool) {
        self.inputs_held.store(held, Ordering::Release);
    }

    /// Check if any lever, push, key or the touch pad is currently held.
    pub fn inputs_held(&self) -> bool {
        self.inputs_held.load(Ordering::Acquire)
    }
}

impl Default for ActivityClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Flag raised from the touch wake interrupt.
///
/// The interrupt only ever sets it; the power manager consumes it.
pub struct WakeSignal {
    raised: AtomicBool,
}

impl WakeSignal {
    /// Create a lowered flag.
    pub const fn new() -> Self {
        Self {
            raised: AtomicBool::new(false),
        }
    }

    /// Interrupt-safe.
    pub fn signal(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Consume the flag.
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::AcqRel)
    }

    /// Check the flag without consuming it.
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}

impl Default for WakeSignal {
    fn default() -> Self {
        Self::new()
    }
}
