//! Fixed-rate task pacing.
//!
//! Portable pacing without async or platform timers: the task calls
//! [`TaskPacer::pace`] once per cycle and sleeps for the returned duration.

use embassy_time::{Duration, Instant};

/// Input sampling period.
pub const INPUT_PERIOD: Duration = Duration::from_millis(10);

/// LED rendering period.
pub const OUTPUT_PERIOD: Duration = Duration::from_millis(1);

/// Fixed-rate pacer for a periodic task.
#[derive(Debug, Clone, Copy)]
pub struct TaskPacer {
    next: Instant,
    period: Duration,
}

impl TaskPacer {
    /// Create a pacer for the given period.
    pub const fn new(period: Duration) -> Self {
        Self {
            next: Instant::from_millis(0),
            period,
        }
    }

    /// Period between cycles.
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Deadline of the next cycle.
    pub const fn next_deadline(&self) -> Instant {
        self.next
    }

    /// Account for one cycle run at `now` and return how long to wait.
    ///
    /// Falling more than two periods behind (after a sleep, say) resets the
    /// schedule to `now` instead of running a burst of catch-up cycles.
    pub fn pace(&mut self, now: Instant) -> Duration {
        let max_drift = self.period.as_millis() * 2;
        if now.as_millis() > self.next.as_millis() + max_drift {
            self.next = now;
        }

        self.next += self.period;

        if self.next > now {
            self.next.saturating_duration_since(now)
        } else {
            Duration::from_millis(0)
        }
    }
}
