//! Shared device state, reference pin map and hardware bring-up.

use embassy_time::{Duration, Instant};

use crate::activity::{ActivityClock, WakeSignal};
use crate::bus::SharedBus;
use crate::channel::{CommandQueue, LedQueue};
use crate::error::InitError;
use crate::hal::{ExpanderPin, GpioExpander, PinMode, SettingsStore};
use crate::indicator::IndicatorConfig;
use crate::logging::log;
use crate::power::PowerConfig;
use crate::scheduler::{INPUT_PERIOD, OUTPUT_PERIOD};
use crate::settings::{
    LeverPushSettings, LeverSettings, MAX_RECORD_SIZE, SettingsCell, SettingsRecord, TouchSettings,
};
use crate::touch::TouchCalibration;

/// Storage key of each persisted record.
pub const LEVER1_KEY: &str = "lever1";
/// Storage key of the first lever push.
pub const LEVER_PUSH1_KEY: &str = "leverpush1";
/// Storage key of the second lever.
pub const LEVER2_KEY: &str = "lever2";
/// Storage key of the second lever push.
pub const LEVER_PUSH2_KEY: &str = "leverpush2";
/// Storage key of the touch pad.
pub const TOUCH_KEY: &str = "touch";

/// Bus address of the first I/O expander.
pub const EXPANDER_U1: u8 = 0x20;
/// Bus address of the second I/O expander.
pub const EXPANDER_U2: u8 = 0x21;

/// Expander pins of one lever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeverPins {
    /// Contact that moves the lever value down.
    pub left: ExpanderPin,
    /// Contact that moves the lever value up.
    pub right: ExpanderPin,
    /// Centre switch.
    pub push: ExpanderPin,
}

/// Pin map and tunables of a board.
#[derive(Debug, Clone, Copy)]
pub struct DeviceConfig {
    /// Bus addresses of both expanders.
    pub expanders: [u8; 2],
    /// Pins of each lever.
    pub levers: [LeverPins; 2],
    /// Expander pin of the octave-up LED.
    pub octave_up_led: ExpanderPin,
    /// Expander pin of the octave-down LED.
    pub octave_down_led: ExpanderPin,
    /// PWM pin of the pink LED.
    pub pink_led: u8,
    /// PWM pin of the blue LED.
    pub blue_led: u8,
    /// Lever values on this CC also set keybed velocity.
    pub velocity_cc: u8,
    /// Input sampling period.
    pub input_period: Duration,
    /// LED rendering period.
    pub output_period: Duration,
    /// Range and smoothing of the touch pad.
    pub touch: TouchCalibration,
    /// Lever feedback on the colour LEDs.
    pub indicators: IndicatorConfig,
    /// Idle and sleep timings.
    pub power: PowerConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            expanders: [EXPANDER_U1, EXPANDER_U2],
            levers: [
                LeverPins {
                    left: ExpanderPin::new(EXPANDER_U1, 5),
                    right: ExpanderPin::new(EXPANDER_U2, 0),
                    push: ExpanderPin::new(EXPANDER_U1, 6),
                },
                LeverPins {
                    left: ExpanderPin::new(EXPANDER_U2, 1),
                    right: ExpanderPin::new(EXPANDER_U2, 3),
                    push: ExpanderPin::new(EXPANDER_U2, 2),
                },
            ],
            octave_up_led: ExpanderPin::new(EXPANDER_U2, 7),
            octave_down_led: ExpanderPin::new(EXPANDER_U2, 5),
            pink_led: 8,
            blue_led: 7,
            velocity_cc: 7,
            input_period: INPUT_PERIOD,
            output_period: OUTPUT_PERIOD,
            touch: TouchCalibration::default(),
            indicators: IndicatorConfig::default(),
            power: PowerConfig::default(),
        }
    }
}

/// State shared by both tasks and the configuration link.
///
/// Create it once, usually in a `static`, and hand out references.
pub struct DeviceContext<const N: usize> {
    /// Settings of the first lever.
    pub lever1: SettingsCell<LeverSettings>,
    /// Settings of the first lever push.
    pub lever_push1: SettingsCell<LeverPushSettings>,
    /// Settings of the second lever.
    pub lever2: SettingsCell<LeverSettings>,
    /// Settings of the second lever push.
    pub lever_push2: SettingsCell<LeverPushSettings>,
    /// Settings of the touch pad.
    pub touch: SettingsCell<TouchSettings>,
    /// Last activity timestamps.
    pub activity: ActivityClock,
    /// Raised by the touch wake interrupt.
    pub wake: WakeSignal,
    /// LED commands from the input task to the output task.
    pub leds: LedQueue<N>,
}

impl<const N: usize> DeviceContext<N> {
    /// Context holding factory settings.
    pub const fn new() -> Self {
        Self {
            lever1: SettingsCell::new(LeverSettings::PRIMARY),
            lever_push1: SettingsCell::new(LeverPushSettings::PRIMARY),
            lever2: SettingsCell::new(LeverSettings::SECONDARY),
            lever_push2: SettingsCell::new(LeverPushSettings::SECONDARY),
            touch: SettingsCell::new(TouchSettings::FACTORY),
            activity: ActivityClock::new(),
            wake: WakeSignal::new(),
            leds: CommandQueue::new(),
        }
    }

    /// Put every record back to factory values.
    pub fn reset_to_factory(&self) {
        self.lever1.set(LeverSettings::PRIMARY);
        self.lever_push1.set(LeverPushSettings::PRIMARY);
        self.lever2.set(LeverSettings::SECONDARY);
        self.lever_push2.set(LeverPushSettings::SECONDARY);
        self.touch.set(TouchSettings::FACTORY);
    }

    /// Replace the factory records with whatever the store holds.
    ///
    /// A missing or malformed blob leaves that record alone. Returns how many
    /// records were loaded.
    pub fn load_settings<S: SettingsStore>(&self, store: &mut S) -> usize {
        [
            load_record(store, LEVER1_KEY, &self.lever1),
            load_record(store, LEVER_PUSH1_KEY, &self.lever_push1),
            load_record(store, LEVER2_KEY, &self.lever2),
            load_record(store, LEVER_PUSH2_KEY, &self.lever_push2),
            load_record(store, TOUCH_KEY, &self.touch),
        ]
        .into_iter()
        .filter(|loaded| *loaded)
        .count()
    }

    /// Mark boot as the first activity.
    pub fn start(&self, now: Instant) {
        self.activity.record(now);
        self.activity.record_radio(now);
    }
}

impl<const N: usize> Default for DeviceContext<N> {
    fn default() -> Self {
        Self::new()
    }
}

fn load_record<S, T>(store: &mut S, key: &str, cell: &SettingsCell<T>) -> bool
where
    S: SettingsStore,
    T: SettingsRecord,
{
    let mut buf = [0u8; MAX_RECORD_SIZE];
    let Some(len) = store.get_bytes(key, &mut buf) else {
        log!("[settings] no stored {}, keeping defaults", key);
        return false;
    };
    let Some(bytes) = buf.get(..len) else {
        log!("[settings] stored {} overflows the record buffer", key);
        return false;
    };
    match T::decode_exact(bytes) {
        Ok(record) => {
            cell.set(record);
            log!("[settings] loaded {}", key);
            true
        }
        Err(error) => {
            log!("[settings] stored {} rejected: {}", key, error);
            false
        }
    }
}

/// Probe both expanders and configure every pin the core touches.
///
/// Lever inputs get pull-ups. Octave LED pins become outputs driven high,
/// which is off for these active-low LEDs.
pub fn bring_up<E: GpioExpander>(
    bus: &SharedBus<E>,
    config: &DeviceConfig,
) -> Result<(), InitError> {
    for address in config.expanders {
        if !bus.begin(address) {
            log!("[init] expander {:#04x} not responding", address);
            return Err(InitError::ExpanderNotResponding { address });
        }
    }

    for pins in &config.levers {
        for pin in [pins.left, pins.right, pins.push] {
            bus.pin_mode(pin, PinMode::InputPullUp);
        }
    }

    for pin in [config.octave_up_led, config.octave_down_led] {
        bus.pin_mode(pin, PinMode::Output);
        bus.write(pin, true);
    }

    log!("[init] expanders ready");
    Ok(())
}
