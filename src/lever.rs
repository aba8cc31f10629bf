//! Two-way lever state machine.
//!
//! A lever has two momentary contacts, left and right. Depending on the
//! configured [`LeverMode`] the contacts step, jump or glide a control
//! change value, which is transmitted only when it changes.

use embassy_time::Instant;

use crate::hal::{MIDI_CHANNEL, MidiOutput};
use crate::logging::log;
use crate::ramp::RampedValue;
use crate::settings::{CC_MAX, LeverMode, LeverSettings, SettingsCell};

/// Callback receiving a lever value routed to the keybed velocity.
pub type VelocityHook = fn(u8);

/// Sampled contact state of one lever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeverInput {
    /// Left contact closed.
    pub left: bool,
    /// Right contact closed.
    pub right: bool,
}

impl LeverInput {
    /// Check if either contact is closed.
    pub const fn any(self) -> bool {
        self.left || self.right
    }
}

/// Keybed velocity routing: lever values on `cc_number` are pushed to `hook`.
#[derive(Debug, Clone, Copy)]
pub struct VelocityRoute {
    /// Control change number whose values are routed.
    pub cc_number: u8,
    /// Receiver of the routed values.
    pub hook: VelocityHook,
}

/// Turns the contacts of one lever into control changes.
pub struct LeverController<'a> {
    settings: &'a SettingsCell<LeverSettings>,
    ramp: RampedValue,
    pressed_left: bool,
    pressed_right: bool,
    /// Edge latch: a press has been consumed and not yet released.
    latched: bool,
    last_sent: u8,
    velocity: Option<VelocityRoute>,
}

impl<'a> LeverController<'a> {
    /// Create a lever resting at its configured rest value.
    pub fn new(settings: &'a SettingsCell<LeverSettings>) -> Self {
        let rest = settings.get().rest_value();
        Self {
            settings,
            ramp: RampedValue::new(rest),
            pressed_left: false,
            pressed_right: false,
            latched: false,
            last_sent: rest,
            velocity: None,
        }
    }

    /// Route values sent on `cc_number` into the keybed velocity.
    #[must_use]
    pub fn with_velocity_route(mut self, cc_number: u8, hook: VelocityHook) -> Self {
        self.velocity = Some(VelocityRoute { cc_number, hook });
        self
    }

    /// Current rendered value.
    pub const fn value(&self) -> u8 {
        self.ramp.current()
    }

    /// Value the lever is heading to.
    pub const fn target(&self) -> u8 {
        self.ramp.target()
    }

    /// Last value transmitted.
    pub const fn last_sent(&self) -> u8 {
        self.last_sent
    }

    /// Control change number the lever sends on.
    pub fn cc_number(&self) -> u8 {
        self.settings.get().cc_number
    }

    /// Check if either contact is held.
    pub const fn is_held(&self) -> bool {
        self.pressed_left || self.pressed_right
    }

    /// Overwrite the value from outside, without ramping.
    ///
    /// The change is transmitted on the next [`update`](Self::update).
    pub fn set_value(&mut self, value: u8) {
        self.ramp.snap(value);
    }

    /// Run one control cycle.
    ///
    /// Returns the value if a control change went out (or would have, for a
    /// silenced lever).
    pub fn update<M: MidiOutput>(
        &mut self,
        input: LeverInput,
        now: Instant,
        midi: &mut M,
    ) -> Option<u8> {
        let settings = self.settings.get();
        self.handle_input(input, &settings, now);
        self.pressed_left = input.left;
        self.pressed_right = input.right;

        let value = self.ramp.tick(now);
        self.transmit(value, settings.cc_number, midi)
    }

    fn handle_input(&mut self, input: LeverInput, settings: &LeverSettings, now: Instant) {
        let min = settings.min_cc_value;
        let max = settings.max_cc_value;

        match settings.mode {
            LeverMode::Incremental => {
                let current = self.ramp.current();
                if input.left && !self.latched {
                    let value = current.saturating_sub(settings.step_size).max(min).min(max);
                    self.ramp.snap(value);
                    self.latched = true;
                } else if input.right && !self.latched {
                    let value = current.saturating_add(settings.step_size).min(max).max(min);
                    self.ramp.snap(value);
                    self.latched = true;
                } else if !input.any() {
                    self.latched = false;
                }
            }
            LeverMode::PeakAndDecay => {
                if input.any() {
                    let peak = if input.left { min } else { max };
                    if !self.latched || self.ramp.target() != peak {
                        self.ramp
                            .start(peak, peak, settings.onset_time, settings.onset_curve, now);
                    }
                    self.latched = true;
                } else if self.latched {
                    self.ramp.retarget(
                        settings.rest_value(),
                        settings.offset_time,
                        settings.offset_curve,
                        now,
                    );
                    self.latched = false;
                }
            }
            LeverMode::Interpolated => {
                let target = if input.left {
                    min
                } else if input.right {
                    max
                } else {
                    settings.rest_value()
                };
                if target != self.ramp.target() {
                    if input.any() {
                        self.ramp
                            .retarget(target, settings.onset_time, settings.onset_curve, now);
                    } else {
                        self.ramp
                            .retarget(target, settings.offset_time, settings.offset_curve, now);
                    }
                }
                self.latched = input.any();
            }
        }
    }

    fn transmit<M: MidiOutput>(&mut self, value: u8, cc_number: u8, midi: &mut M) -> Option<u8> {
        if value == self.last_sent {
            return None;
        }

        if cc_number <= CC_MAX {
            log!("[lever] cc {} value {}", cc_number, value);
            midi.send_control_change(cc_number, value, MIDI_CHANNEL);
        }
        if let Some(route) = self.velocity {
            if route.cc_number == cc_number {
                (route.hook)(value);
            }
        }
        self.last_sent = value;
        Some(value)
    }
}
