//! Hardware capabilities the core is generic over.
//!
//! Implement these per target platform. Tests implement them with mocks.

use embassy_time::{Duration, Instant};

/// A pin on one of the I/O expander chips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExpanderPin {
    /// Bus address of the chip.
    pub chip: u8,
    /// Pin index on the chip.
    pub pin: u8,
}

impl ExpanderPin {
    /// Create a pin reference.
    pub const fn new(chip: u8, pin: u8) -> Self {
        Self { chip, pin }
    }
}

/// Direction and pull of an expander pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    InputPullUp,
    Output,
}

/// Digital I/O expander sitting on the shared bus.
pub trait GpioExpander {
    /// Probe and initialise the chip at `chip`. Returns `false` if it does not answer.
    fn begin(&mut self, chip: u8) -> bool;

    fn pin_mode(&mut self, pin: ExpanderPin, mode: PinMode);

    /// Read the pin level, `true` is high.
    fn digital_read(&mut self, pin: ExpanderPin) -> bool;

    fn digital_write(&mut self, pin: ExpanderPin, high: bool);
}

/// PWM-capable LED pins.
pub trait PwmOutput {
    fn set_duty(&mut self, pin: u8, duty: u8);
}

/// MIDI output transport.
pub trait MidiOutput {
    fn send_control_change(&mut self, cc: u8, value: u8, channel: u8);
}

/// Raw capacitive touch reading.
pub trait TouchInput {
    fn read(&mut self) -> u32;
}

/// Keybed scanner, owned by the input task.
pub trait Keybed {
    /// Scan the keys, returns `true` while any key is down.
    fn scan(&mut self, now: Instant) -> bool;
}

/// Why the processor came back from light sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeCause {
    Touch,
    Timer,
    /// Anything else, carrying the raw platform code.
    Other(u8),
}

/// Halting sleep backend.
///
/// Real implementations stop every task on the core. Fakes advance a clock.
pub trait SleepController {
    fn now(&self) -> Instant;

    /// Busy or blocking wait.
    fn delay(&mut self, duration: Duration);

    /// Arm the touch pad as a wake source with the given threshold.
    fn arm_touch_wake(&mut self, threshold: u16);

    /// Halt until the touch pad fires or `duration` elapses.
    fn enter_light(&mut self, duration: Duration) -> WakeCause;

    /// Halt until touch. On hardware this never returns; wake is a restart.
    fn enter_deep(&mut self);
}

/// Wireless radio power control.
pub trait RadioControl {
    fn is_enabled(&self) -> bool;
    fn enable(&mut self);
    fn disable(&mut self);
    fn set_low_power(&mut self, enabled: bool);
}

/// Key-value persistence for settings blobs.
pub trait SettingsStore {
    /// Copy the blob stored under `key` into `buf`, returning its length.
    fn get_bytes(&mut self, key: &str, buf: &mut [u8]) -> Option<usize>;

    /// Store a blob, returns `false` on failure.
    fn put_bytes(&mut self, key: &str, bytes: &[u8]) -> bool;
}

/// MIDI channel every control change goes out on.
pub const MIDI_CHANNEL: u8 = 1;
