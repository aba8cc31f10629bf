//! LED rendering.
//!
//! Each LED is either a PWM pin, where brightness ramps smoothly, or an
//! active-low expander pin, which can only be on or off. The renderer keeps
//! one [`RampedValue`] per LED and writes hardware only when the level changes.

use embassy_time::{Duration, Instant};

use crate::bus::SharedBus;
use crate::hal::{ExpanderPin, GpioExpander, PwmOutput};
use crate::ramp::{Curve, RampedValue};

/// Number of indicator LEDs.
pub const LED_COUNT: usize = 4;

/// One of the indicator LEDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedId {
    Pink,
    Blue,
    OctaveUp,
    OctaveDown,
}

impl LedId {
    /// Every LED, in index order.
    pub const ALL: [Self; LED_COUNT] = [Self::Pink, Self::Blue, Self::OctaveUp, Self::OctaveDown];

    /// Slot of the LED in per-LED tables.
    pub const fn index(self) -> usize {
        match self {
            Self::Pink => 0,
            Self::Blue => 1,
            Self::OctaveUp => 2,
            Self::OctaveDown => 3,
        }
    }
}

/// Where an LED is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedOutput {
    Pwm(u8),
    /// Active-low expander pin.
    Expander(ExpanderPin),
}

/// Request to change an LED, sent from the input task to the output task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedCommand {
    /// Ramp to `brightness` over `duration`, zero is immediate.
    Set {
        led: LedId,
        brightness: u8,
        duration: Duration,
    },
    /// Blink with `period` until `total` elapses, zero total blinks forever.
    Pulse {
        led: LedId,
        period: Duration,
        total: Duration,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LedMode {
    Static,
    Pulse {
        period: Duration,
        total: Duration,
        started: Instant,
    },
}

#[derive(Debug, Clone)]
struct LedState {
    output: Option<LedOutput>,
    mode: LedMode,
    brightness: RampedValue,
    /// Level last written to hardware.
    written: Option<u8>,
}

impl LedState {
    const fn new() -> Self {
        Self {
            output: None,
            mode: LedMode::Static,
            brightness: RampedValue::new(0),
            written: None,
        }
    }
}

/// Per-LED brightness state and the hardware writes that follow from it.
pub struct LedRenderer {
    leds: [LedState; LED_COUNT],
}

impl LedRenderer {
    /// Create a renderer with every LED dark and unbound.
    pub const fn new() -> Self {
        Self {
            leds: [const { LedState::new() }; LED_COUNT],
        }
    }

    /// Bind an LED to its output. Unbound LEDs are never rendered.
    pub fn attach(&mut self, led: LedId, output: LedOutput) {
        let state = &mut self.leds[led.index()];
        state.output = Some(output);
        state.written = None;
    }

    /// Current brightness of an LED.
    pub fn brightness(&self, led: LedId) -> u8 {
        self.leds[led.index()].brightness.current()
    }

    /// Check if an LED is in pulse mode.
    pub fn is_pulsing(&self, led: LedId) -> bool {
        matches!(self.leds[led.index()].mode, LedMode::Pulse { .. })
    }

    /// Ramp an LED to a brightness, starting from wherever it is now.
    pub fn set(&mut self, led: LedId, brightness: u8, duration: Duration, now: Instant) {
        let state = &mut self.leds[led.index()];
        if let LedMode::Pulse { .. } = state.mode {
            state.brightness.snap(state.written.unwrap_or(0));
        }
        state.mode = LedMode::Static;
        state
            .brightness
            .retarget(brightness, duration, Curve::Linear, now);
    }

    /// Blink an LED with `period` until `total` elapses, zero total blinks forever.
    pub fn pulse(&mut self, led: LedId, period: Duration, total: Duration, now: Instant) {
        let period = if period.as_millis() == 0 {
            Duration::from_millis(1)
        } else {
            period
        };
        self.leds[led.index()].mode = LedMode::Pulse {
            period,
            total,
            started: now,
        };
    }

    /// Apply one queued command at `now`.
    pub fn apply(&mut self, command: LedCommand, now: Instant) {
        match command {
            LedCommand::Set {
                led,
                brightness,
                duration,
            } => self.set(led, brightness, duration, now),
            LedCommand::Pulse { led, period, total } => self.pulse(led, period, total, now),
        }
    }

    /// Forget what was written so the next render rewrites every LED.
    ///
    /// Needed after sleep, when pins may have lost their state.
    pub fn invalidate(&mut self) {
        for state in &mut self.leds {
            state.written = None;
        }
    }

    /// Set an LED immediately and write it to hardware right away.
    pub fn show<P: PwmOutput, E: GpioExpander>(
        &mut self,
        led: LedId,
        brightness: u8,
        pwm: &mut P,
        bus: &SharedBus<E>,
    ) {
        let state = &mut self.leds[led.index()];
        state.mode = LedMode::Static;
        state.brightness.snap(brightness);
        Self::write(state, brightness, pwm, bus);
    }

    /// Render every LED's state at `now` to hardware.
    pub fn render<P: PwmOutput, E: GpioExpander>(
        &mut self,
        now: Instant,
        pwm: &mut P,
        bus: &SharedBus<E>,
    ) {
        for state in &mut self.leds {
            let Some(output) = state.output else {
                continue;
            };
            let level = match state.mode {
                LedMode::Static => Self::static_level(state, output, now),
                LedMode::Pulse {
                    period,
                    total,
                    started,
                } => {
                    let elapsed = now.saturating_duration_since(started);
                    if total.as_millis() != 0 && elapsed >= total {
                        state.mode = LedMode::Static;
                        state.brightness.snap(0);
                        0
                    } else {
                        Self::pulse_level(output, elapsed, period)
                    }
                }
            };
            Self::write(state, level, pwm, bus);
        }
    }

    fn static_level(state: &mut LedState, output: LedOutput, now: Instant) -> u8 {
        let value = state.brightness.tick(now);
        match output {
            LedOutput::Pwm(_) => value,
            // Expander pins cannot dim: hold the old level until the ramp ends
            LedOutput::Expander(_) if state.brightness.is_ramping() => {
                state.written.unwrap_or(0)
            }
            LedOutput::Expander(_) => value,
        }
    }

    fn pulse_level(output: LedOutput, elapsed: Duration, period: Duration) -> u8 {
        let period_ms = period.as_millis();
        let phase = (elapsed.as_millis() % period_ms) as f32 / period_ms as f32;
        match output {
            LedOutput::Pwm(_) => {
                let triangle = if phase < 0.5 {
                    2.0 * phase
                } else {
                    2.0 * (1.0 - phase)
                };
                (triangle * 255.0) as u8
            }
            LedOutput::Expander(_) => {
                if phase < 0.5 {
                    u8::MAX
                } else {
                    0
                }
            }
        }
    }

    fn write<P: PwmOutput, E: GpioExpander>(
        state: &mut LedState,
        level: u8,
        pwm: &mut P,
        bus: &SharedBus<E>,
    ) {
        let Some(output) = state.output else {
            return;
        };
        let level = match output {
            LedOutput::Pwm(_) => level,
            LedOutput::Expander(_) if level > 0 => u8::MAX,
            LedOutput::Expander(_) => 0,
        };
        if state.written == Some(level) {
            return;
        }
        match output {
            LedOutput::Pwm(pin) => pwm.set_duty(pin, level),
            LedOutput::Expander(pin) => bus.write(pin, level == 0),
        }
        state.written = Some(level);
    }
}

impl Default for LedRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Direct, immediate LED access used while the scheduler is paused for sleep.
pub trait StatusLights {
    fn show(&mut self, led: LedId, brightness: u8);
}

/// [`StatusLights`] over the output task's renderer and hardware.
pub struct LedHardware<'r, 'b, P, E> {
    /// Renderer whose state is kept in sync.
    pub renderer: &'r mut LedRenderer,
    /// PWM driver of the colour LEDs.
    pub pwm: &'r mut P,
    /// Bus of the expander LEDs.
    pub bus: &'b SharedBus<E>,
}

impl<P: PwmOutput, E: GpioExpander> StatusLights for LedHardware<'_, '_, P, E> {
    fn show(&mut self, led: LedId, brightness: u8) {
        self.renderer.show(led, brightness, self.pwm, self.bus);
    }
}
