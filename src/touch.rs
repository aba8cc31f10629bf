//! Capacitive touch strip.
//!
//! The raw reading is noisy, so it is exponentially smoothed and compared
//! against a hysteresis band: the pad turns on above the configured
//! threshold `T` and off only below `max(sensor_min, 0.75·T)`, capped at `T`
//! so the band never inverts.

use crate::hal::{MIDI_CHANNEL, MidiOutput};
use crate::logging::log;
use crate::settings::{CC_MAX, SettingsCell, TouchMode, TouchSettings};

/// Ratio of the release threshold to the touch threshold.
pub const RELEASE_RATIO: f32 = 0.75;

/// Sensor range and smoothing of a touch pad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchCalibration {
    /// Reading of an untouched pad.
    pub sensor_min: u32,
    /// Reading of a fully covered pad.
    pub sensor_max: u32,
    /// Weight of a new sample, `0 < α ≤ 1`.
    pub smoothing: f32,
}

impl Default for TouchCalibration {
    fn default() -> Self {
        Self {
            sensor_min: 26_000,
            sensor_max: 155_000,
            smoothing: 0.1,
        }
    }
}

/// Turns raw touch readings into control changes.
pub struct TouchSensor<'a> {
    settings: &'a SettingsCell<TouchSettings>,
    calibration: TouchCalibration,
    smoothed: Option<f32>,
    active: bool,
    toggled: bool,
    last_sent: Option<u8>,
}

impl<'a> TouchSensor<'a> {
    /// Create an untouched sensor.
    pub const fn new(
        settings: &'a SettingsCell<TouchSettings>,
        calibration: TouchCalibration,
    ) -> Self {
        Self {
            settings,
            calibration,
            smoothed: None,
            active: false,
            toggled: false,
            last_sent: None,
        }
    }

    /// Debounced touch state from the last update, no hardware access.
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Persisted toggle state.
    pub const fn is_toggled(&self) -> bool {
        self.toggled
    }

    /// Smoothed reading, `None` before the first sample.
    pub fn smoothed(&self) -> Option<f32> {
        self.smoothed
    }

    /// Last value transmitted.
    pub const fn last_sent(&self) -> Option<u8> {
        self.last_sent
    }

    /// Reading above which the pad turns on.
    pub fn on_threshold(&self) -> f32 {
        self.settings.get().threshold as f32
    }

    /// Reading below which the pad turns off.
    pub fn off_threshold(&self) -> f32 {
        let scaled = self.on_threshold() * RELEASE_RATIO;
        scaled
            .max(self.calibration.sensor_min as f32)
            .min(self.on_threshold())
    }

    /// Feed one raw sample.
    ///
    /// Returns the value if a control change went out.
    pub fn update<M: MidiOutput>(&mut self, raw: u32, midi: &mut M) -> Option<u8> {
        let settings = self.settings.get();
        let sample = raw as f32;
        let alpha = self.calibration.smoothing;
        let smoothed = match self.smoothed {
            Some(previous) => alpha * sample + (1.0 - alpha) * previous,
            None => sample,
        };
        self.smoothed = Some(smoothed);

        let was_active = self.active;
        if !self.active && smoothed > self.on_threshold() {
            self.active = true;
        } else if self.active && smoothed < self.off_threshold() {
            self.active = false;
        }

        match settings.mode {
            TouchMode::Hold => {
                if self.active != was_active {
                    let value = if self.active {
                        settings.max_cc_value
                    } else {
                        settings.min_cc_value
                    };
                    return self.emit(settings.cc_number, value, midi);
                }
                None
            }
            TouchMode::Toggle => {
                if self.active && !was_active {
                    self.toggled = !self.toggled;
                    let value = if self.toggled {
                        settings.max_cc_value
                    } else {
                        settings.min_cc_value
                    };
                    return self.emit(settings.cc_number, value, midi);
                }
                None
            }
            TouchMode::Continuous => {
                let value = self.rescale(smoothed, &settings);
                if self.last_sent == Some(value) {
                    return None;
                }
                self.emit(settings.cc_number, value, midi)
            }
        }
    }

    /// Map a smoothed reading from the sensor range to the output range.
    fn rescale(&self, smoothed: f32, settings: &TouchSettings) -> u8 {
        let low = self.calibration.sensor_min as f32;
        let high = self.calibration.sensor_max as f32;
        if high <= low {
            return settings.min_cc_value;
        }

        let clamped = smoothed.clamp(low, high);
        let ratio = (clamped - low) / (high - low);
        let span = f32::from(settings.max_cc_value) - f32::from(settings.min_cc_value);
        let offset = libm::truncf(ratio * span) as i16;
        (i16::from(settings.min_cc_value) + offset) as u8
    }

    fn emit<M: MidiOutput>(&mut self, cc_number: u8, value: u8, midi: &mut M) -> Option<u8> {
        if cc_number <= CC_MAX {
            log!("[touch] cc {} value {}", cc_number, value);
            midi.send_control_change(cc_number, value, MIDI_CHANNEL);
        }
        self.last_sent = Some(value);
        Some(value)
    }
}
