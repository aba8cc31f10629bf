//! Lever centre-push state machine.
//!
//! Shares the ramp mechanics of the lever. The paired [`LeverController`]
//! is passed into each update so a reset can pull its value down.

use embassy_time::Instant;

use crate::hal::{MIDI_CHANNEL, MidiOutput};
use crate::lever::LeverController;
use crate::logging::log;
use crate::ramp::RampedValue;
use crate::settings::{CC_MAX, LeverPushMode, LeverPushSettings, SettingsCell};

/// Turns the centre button of one lever into control changes.
pub struct LeverPushController<'a> {
    settings: &'a SettingsCell<LeverPushSettings>,
    ramp: RampedValue,
    pressed: bool,
    last_sent: u8,
}

impl<'a> LeverPushController<'a> {
    /// Create a push resting at its minimum.
    pub fn new(settings: &'a SettingsCell<LeverPushSettings>) -> Self {
        let floor = settings.get().min_cc_value;
        Self {
            settings,
            ramp: RampedValue::new(floor),
            pressed: false,
            last_sent: floor,
        }
    }

    /// Current rendered value.
    pub const fn value(&self) -> u8 {
        self.ramp.current()
    }

    /// Check if the button was held at the last update.
    pub const fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Control change number the push sends on.
    pub fn cc_number(&self) -> u8 {
        self.settings.get().cc_number
    }

    /// Run one control cycle with the sampled button state.
    pub fn update<M: MidiOutput>(
        &mut self,
        pressed: bool,
        lever: &mut LeverController<'_>,
        now: Instant,
        midi: &mut M,
    ) -> Option<u8> {
        let settings = self.settings.get();
        let pressed_edge = pressed && !self.pressed;
        let released_edge = !pressed && self.pressed;
        let min = settings.min_cc_value;
        let max = settings.max_cc_value;

        match settings.mode {
            LeverPushMode::Reset => {
                if pressed {
                    if pressed_edge {
                        log!("[push] reset lever cc {} to {}", lever.cc_number(), min);
                    }
                    self.ramp.snap(min);
                    lever.set_value(min);
                }
            }
            LeverPushMode::Static => {
                if pressed_edge {
                    self.ramp.snap(max);
                } else if released_edge {
                    self.ramp.snap(min);
                }
            }
            LeverPushMode::PeakAndDecay => {
                if pressed_edge {
                    self.ramp
                        .start(max, max, settings.onset_time, settings.onset_curve, now);
                } else if released_edge {
                    self.ramp
                        .retarget(min, settings.offset_time, settings.offset_curve, now);
                }
            }
            LeverPushMode::Interpolated => {
                if pressed_edge {
                    self.ramp
                        .retarget(max, settings.onset_time, settings.onset_curve, now);
                } else if released_edge {
                    self.ramp
                        .retarget(min, settings.offset_time, settings.offset_curve, now);
                }
            }
        }
        self.pressed = pressed;

        let value = self.ramp.tick(now);
        if value == self.last_sent {
            return None;
        }
        if settings.cc_number <= CC_MAX {
            log!("[push] cc {} value {}", settings.cc_number, value);
            midi.send_control_change(settings.cc_number, value, MIDI_CHANNEL);
        }
        self.last_sent = value;
        Some(value)
    }
}
