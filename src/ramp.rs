//! Time-based easing shared by every analog-feeling control.
//!
//! A [`RampedValue`] moves an integer from a start point to a target point
//! over a fixed duration under a selectable [`Curve`]. Levers, lever pushes
//! and PWM LEDs all render through it.

use embassy_time::{Duration, Instant};

/// Shape applied to the linear progress of a ramp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Curve {
    /// Constant rate.
    #[default]
    Linear,
    /// `progress²`, slow start.
    Accelerating,
    /// `1 - (1 - progress)²`, slow end.
    Decelerating,
}

impl Curve {
    /// Decode the wire representation.
    pub const fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Linear),
            1 => Some(Self::Accelerating),
            2 => Some(Self::Decelerating),
            _ => None,
        }
    }

    /// Wire representation.
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Linear => 0,
            Self::Accelerating => 1,
            Self::Decelerating => 2,
        }
    }

    /// Shape a linear progress value. Input is clamped to `[0, 1]`.
    pub fn shape(self, progress: f32) -> f32 {
        let progress = progress.clamp(0.0, 1.0);
        match self {
            Self::Linear => progress,
            Self::Accelerating => progress * progress,
            Self::Decelerating => {
                let remaining = 1.0 - progress;
                1.0 - remaining * remaining
            }
        }
    }
}

/// Integer value easing from `start` to `target`.
#[derive(Debug, Clone)]
pub struct RampedValue {
    /// Value rendered by the last [`tick`](Self::tick).
    current: u8,
    /// Value at the moment the ramp was armed.
    start: u8,
    /// Value reached once the duration has elapsed.
    target: u8,
    /// Time at which the ramp was armed.
    start_time: Instant,
    /// Total ramp duration, zero snaps.
    duration: Duration,
    curve: Curve,
    ramping: bool,
}

impl RampedValue {
    /// Create a settled value.
    pub const fn new(initial: u8) -> Self {
        Self {
            current: initial,
            start: initial,
            target: initial,
            start_time: Instant::from_millis(0),
            duration: Duration::from_millis(0),
            curve: Curve::Linear,
            ramping: false,
        }
    }

    /// Value rendered by the last tick.
    pub const fn current(&self) -> u8 {
        self.current
    }

    /// Value the ramp ends at.
    pub const fn target(&self) -> u8 {
        self.target
    }

    /// Value the ramp started from.
    pub const fn start_value(&self) -> u8 {
        self.start
    }

    /// Curve of the current ramp.
    pub const fn curve(&self) -> Curve {
        self.curve
    }

    /// Check if the last tick left the ramp unfinished.
    pub const fn is_ramping(&self) -> bool {
        self.ramping
    }

    /// Arm a ramp from an explicit start value.
    pub fn start(&mut self, from: u8, target: u8, duration: Duration, curve: Curve, now: Instant) {
        self.start = from;
        self.target = target;
        self.start_time = now;
        self.duration = duration;
        self.curve = curve;
        if duration.as_millis() == 0 {
            self.current = target;
            self.ramping = false;
        } else {
            self.current = from;
            self.ramping = from != target;
        }
    }

    /// Arm a ramp towards a new target from wherever the value sits at `now`.
    ///
    /// Re-targeting mid-flight captures the interpolated value as the new
    /// start, so the rendered output never jumps.
    pub fn retarget(&mut self, target: u8, duration: Duration, curve: Curve, now: Instant) {
        let from = self.value_at(now);
        self.start(from, target, duration, curve, now);
    }

    /// Jump to a value without ramping.
    pub fn snap(&mut self, value: u8) {
        self.current = value;
        self.start = value;
        self.target = value;
        self.duration = Duration::from_millis(0);
        self.ramping = false;
    }

    /// Value of the ramp at `now`, without mutating state.
    pub fn value_at(&self, now: Instant) -> u8 {
        if self.duration.as_millis() == 0 {
            return self.target;
        }

        let elapsed = now.saturating_duration_since(self.start_time);
        if elapsed >= self.duration {
            return self.target;
        }

        let progress = elapsed.as_millis() as f32 / self.duration.as_millis() as f32;
        let shaped = self.curve.shape(progress);
        let delta = f32::from(self.target) - f32::from(self.start);

        // Truncation towards zero keeps the value between start and target
        let offset = (shaped * delta) as i16;
        (i16::from(self.start) + offset) as u8
    }

    /// Advance the ramp to `now` and return the rendered value.
    pub fn tick(&mut self, now: Instant) -> u8 {
        self.current = self.value_at(now);
        if self.ramping && now.saturating_duration_since(self.start_time) >= self.duration {
            self.ramping = false;
        }
        self.current
    }
}

impl Default for RampedValue {
    fn default() -> Self {
        Self::new(0)
    }
}
