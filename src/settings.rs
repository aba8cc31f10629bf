//! Settings records shared between the controllers and the configuration link.
//!
//! Records are plain `Copy` structs held in a [`SettingsCell`]. Controllers
//! borrow the cell and read it every cycle, so a write from the configuration
//! link is picked up on the next control cycle without any ownership transfer.

use core::cell::Cell;

use critical_section::Mutex;
use embassy_time::Duration;

use crate::error::ConfigError;
use crate::ramp::Curve;

/// Rest value of a bipolar lever.
pub const BIPOLAR_REST: u8 = 64;

/// Highest valid control change number or value.
pub const CC_MAX: u8 = 127;

/// Largest encoded record.
pub const MAX_RECORD_SIZE: usize = LeverSettings::SIZE;

/// Interior-mutable settings slot, safe to share between tasks.
pub struct SettingsCell<T: Copy> {
    inner: Mutex<Cell<T>>,
}

impl<T: Copy> SettingsCell<T> {
    /// Create a slot holding `value`.
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(Cell::new(value)),
        }
    }

    /// Snapshot the current record.
    pub fn get(&self) -> T {
        critical_section::with(|cs| self.inner.borrow(cs).get())
    }

    /// Replace the whole record.
    pub fn set(&self, value: T) {
        critical_section::with(|cs| self.inner.borrow(cs).set(value));
    }

    /// Modify the record in place.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        critical_section::with(|cs| {
            let cell = self.inner.borrow(cs);
            let mut value = cell.get();
            f(&mut value);
            cell.set(value);
        });
    }
}

/// Fixed-layout binary record exchanged with the configuration link.
///
/// Fields are little-endian 32-bit integers in declaration order.
pub trait SettingsRecord: Copy + Sized {
    /// Encoded length in bytes.
    const SIZE: usize;
    /// Record name used in diagnostics.
    const NAME: &'static str;

    /// Decode a blob of exactly [`SIZE`](Self::SIZE) bytes.
    fn decode(bytes: &[u8]) -> Result<Self, ConfigError>;

    /// Encode into `out`, returning the written length.
    fn encode(&self, out: &mut [u8]) -> Option<usize>;

    /// Check the length, then decode. Nothing is applied on failure.
    fn decode_exact(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() != Self::SIZE {
            return Err(ConfigError::InvalidLength {
                record: Self::NAME,
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }
        Self::decode(bytes)
    }
}

/// Lever operating mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LeverMode {
    /// Value glides towards the held extreme and back to rest.
    #[default]
    Interpolated,
    /// Value jumps to the held extreme and decays back to rest on release.
    PeakAndDecay,
    /// Each press edge steps the value.
    Incremental,
}

/// Rest position of a lever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Polarity {
    /// Rests at the minimum.
    Unipolar,
    /// Rests at the centre, 64.
    #[default]
    Bipolar,
}

impl Polarity {
    /// Value a lever rests at given its minimum.
    pub const fn rest_value(self, min: u8) -> u8 {
        match self {
            Self::Unipolar => min,
            Self::Bipolar => BIPOLAR_REST,
        }
    }
}

/// Lever push (centre button) operating mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LeverPushMode {
    #[default]
    Interpolated,
    PeakAndDecay,
    /// Press is max, release is min.
    Static,
    /// Press snaps the paired lever to the minimum.
    Reset,
}

/// Touch pad operating mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TouchMode {
    /// Output follows the touch state.
    Hold,
    /// Each touch flips the output.
    Toggle,
    /// Output tracks the smoothed reading.
    #[default]
    Continuous,
}

/// Settings record of one lever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeverSettings {
    /// Control change number, above 127 the lever is silent.
    pub cc_number: u8,
    /// Lowest value sent.
    pub min_cc_value: u8,
    /// Highest value sent.
    pub max_cc_value: u8,
    /// Step per press edge in incremental mode.
    pub step_size: u8,
    /// How the contacts move the value.
    pub mode: LeverMode,
    /// Where the value rests.
    pub polarity: Polarity,
    /// Ramp time towards a held extreme.
    pub onset_time: Duration,
    /// Ramp time back to rest.
    pub offset_time: Duration,
    /// Curve towards a held extreme.
    pub onset_curve: Curve,
    /// Curve back to rest.
    pub offset_curve: Curve,
}

impl LeverSettings {
    /// Value the lever rests at.
    pub const fn rest_value(&self) -> u8 {
        self.polarity.rest_value(self.min_cc_value)
    }
}

impl LeverSettings {
    /// Factory record of the first lever.
    pub const PRIMARY: Self = Self {
        cc_number: 3,
        min_cc_value: 0,
        max_cc_value: CC_MAX,
        step_size: 1,
        mode: LeverMode::Interpolated,
        polarity: Polarity::Bipolar,
        onset_time: Duration::from_millis(100),
        offset_time: Duration::from_millis(100),
        onset_curve: Curve::Linear,
        offset_curve: Curve::Linear,
    };

    /// Factory record of the second lever, silent until configured.
    pub const SECONDARY: Self = Self {
        cc_number: 128,
        step_size: 8,
        mode: LeverMode::Incremental,
        ..Self::PRIMARY
    };
}

impl Default for LeverSettings {
    fn default() -> Self {
        Self::PRIMARY
    }
}

impl SettingsRecord for LeverSettings {
    const SIZE: usize = 40;
    const NAME: &'static str = "LeverSettings";

    fn decode(bytes: &[u8]) -> Result<Self, ConfigError> {
        let fields = Fields(bytes);
        let (min_cc_value, max_cc_value) = fields.range(1, 2)?;
        Ok(Self {
            cc_number: fields.cc_number(0)?,
            min_cc_value,
            max_cc_value,
            step_size: fields.cc_value(3, "stepSize")?,
            mode: match fields.raw(4) {
                0 => LeverMode::Interpolated,
                1 => LeverMode::PeakAndDecay,
                2 => LeverMode::Incremental,
                value => return Err(invalid("functionMode", value)),
            },
            polarity: match fields.raw(5) {
                0 => Polarity::Unipolar,
                1 => Polarity::Bipolar,
                value => return Err(invalid("valueMode", value)),
            },
            onset_time: fields.duration(6),
            offset_time: fields.duration(7),
            onset_curve: fields.curve(8, "onsetType")?,
            offset_curve: fields.curve(9, "offsetType")?,
        })
    }

    fn encode(&self, out: &mut [u8]) -> Option<usize> {
        let mut writer = FieldWriter::new(out, Self::SIZE)?;
        writer.push(i32::from(self.cc_number));
        writer.push(i32::from(self.min_cc_value));
        writer.push(i32::from(self.max_cc_value));
        writer.push(i32::from(self.step_size));
        writer.push(match self.mode {
            LeverMode::Interpolated => 0,
            LeverMode::PeakAndDecay => 1,
            LeverMode::Incremental => 2,
        });
        writer.push(match self.polarity {
            Polarity::Unipolar => 0,
            Polarity::Bipolar => 1,
        });
        writer.push_duration(self.onset_time);
        writer.push_duration(self.offset_time);
        writer.push(self.onset_curve.as_raw());
        writer.push(self.offset_curve.as_raw());
        Some(writer.finish())
    }
}

/// Settings record of one lever push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeverPushSettings {
    /// Control change number, above 127 the push is silent.
    pub cc_number: u8,
    /// Value sent at rest.
    pub min_cc_value: u8,
    /// Value sent while pressed.
    pub max_cc_value: u8,
    /// How the button moves the value.
    pub mode: LeverPushMode,
    /// Ramp time after a press.
    pub onset_time: Duration,
    /// Ramp time after a release.
    pub offset_time: Duration,
    /// Curve after a press.
    pub onset_curve: Curve,
    /// Curve after a release.
    pub offset_curve: Curve,
}

impl LeverPushSettings {
    /// Factory record of the first lever push.
    pub const PRIMARY: Self = Self {
        cc_number: 24,
        min_cc_value: 32,
        max_cc_value: CC_MAX,
        mode: LeverPushMode::Interpolated,
        onset_time: Duration::from_millis(100),
        offset_time: Duration::from_millis(100),
        onset_curve: Curve::Linear,
        offset_curve: Curve::Linear,
    };

    /// Factory record of the second lever push, resets its lever.
    pub const SECONDARY: Self = Self {
        cc_number: 128,
        min_cc_value: 81,
        mode: LeverPushMode::Reset,
        ..Self::PRIMARY
    };
}

impl Default for LeverPushSettings {
    fn default() -> Self {
        Self::PRIMARY
    }
}

impl SettingsRecord for LeverPushSettings {
    const SIZE: usize = 32;
    const NAME: &'static str = "LeverPushSettings";

    fn decode(bytes: &[u8]) -> Result<Self, ConfigError> {
        let fields = Fields(bytes);
        let (min_cc_value, max_cc_value) = fields.range(1, 2)?;
        Ok(Self {
            cc_number: fields.cc_number(0)?,
            min_cc_value,
            max_cc_value,
            mode: match fields.raw(3) {
                0 => LeverPushMode::Interpolated,
                1 => LeverPushMode::PeakAndDecay,
                2 => LeverPushMode::Static,
                3 => LeverPushMode::Reset,
                value => return Err(invalid("functionMode", value)),
            },
            onset_time: fields.duration(4),
            offset_time: fields.duration(5),
            onset_curve: fields.curve(6, "onsetType")?,
            offset_curve: fields.curve(7, "offsetType")?,
        })
    }

    fn encode(&self, out: &mut [u8]) -> Option<usize> {
        let mut writer = FieldWriter::new(out, Self::SIZE)?;
        writer.push(i32::from(self.cc_number));
        writer.push(i32::from(self.min_cc_value));
        writer.push(i32::from(self.max_cc_value));
        writer.push(match self.mode {
            LeverPushMode::Interpolated => 0,
            LeverPushMode::PeakAndDecay => 1,
            LeverPushMode::Static => 2,
            LeverPushMode::Reset => 3,
        });
        writer.push_duration(self.onset_time);
        writer.push_duration(self.offset_time);
        writer.push(self.onset_curve.as_raw());
        writer.push(self.offset_curve.as_raw());
        Some(writer.finish())
    }
}

/// Settings record of the touch pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchSettings {
    /// Control change number, above 127 the pad is silent.
    pub cc_number: u8,
    /// Value sent when released or at the bottom of the sensor range.
    pub min_cc_value: u8,
    /// Value sent when touched or at the top of the sensor range.
    pub max_cc_value: u8,
    /// How the reading turns into control changes.
    pub mode: TouchMode,
    /// Raw reading above which the pad counts as touched.
    pub threshold: u32,
}

impl TouchSettings {
    /// Threshold armed for waking from sleep: half the detection threshold.
    pub fn wake_threshold(&self) -> u16 {
        u16::try_from(self.threshold / 2)
            .unwrap_or(u16::MAX)
            .min(0x7FFF)
    }

    /// Factory record of the touch pad.
    pub const FACTORY: Self = Self {
        cc_number: 1,
        min_cc_value: 64,
        max_cc_value: CC_MAX,
        mode: TouchMode::Continuous,
        threshold: 40_000,
    };
}

impl Default for TouchSettings {
    fn default() -> Self {
        Self::FACTORY
    }
}

impl SettingsRecord for TouchSettings {
    const SIZE: usize = 20;
    const NAME: &'static str = "TouchSettings";

    fn decode(bytes: &[u8]) -> Result<Self, ConfigError> {
        let fields = Fields(bytes);
        let (min_cc_value, max_cc_value) = fields.range(1, 2)?;
        let threshold = match fields.raw(4) {
            value if value > 0 => value as u32,
            value => return Err(invalid("threshold", value)),
        };
        Ok(Self {
            cc_number: fields.cc_number(0)?,
            min_cc_value,
            max_cc_value,
            mode: match fields.raw(3) {
                0 => TouchMode::Hold,
                1 => TouchMode::Toggle,
                2 => TouchMode::Continuous,
                value => return Err(invalid("functionMode", value)),
            },
            threshold,
        })
    }

    fn encode(&self, out: &mut [u8]) -> Option<usize> {
        let mut writer = FieldWriter::new(out, Self::SIZE)?;
        writer.push(i32::from(self.cc_number));
        writer.push(i32::from(self.min_cc_value));
        writer.push(i32::from(self.max_cc_value));
        writer.push(match self.mode {
            TouchMode::Hold => 0,
            TouchMode::Toggle => 1,
            TouchMode::Continuous => 2,
        });
        writer.push(i32::try_from(self.threshold).unwrap_or(i32::MAX));
        Some(writer.finish())
    }
}

const fn invalid(field: &'static str, value: i32) -> ConfigError {
    ConfigError::InvalidValue { field, value }
}

/// Little-endian field reader over a length-checked blob.
struct Fields<'a>(&'a [u8]);

impl Fields<'_> {
    fn raw(&self, index: usize) -> i32 {
        let offset = index * 4;
        let mut word = [0u8; 4];
        if let Some(bytes) = self.0.get(offset..offset + 4) {
            word.copy_from_slice(bytes);
        }
        i32::from_le_bytes(word)
    }

    fn cc_number(&self, index: usize) -> Result<u8, ConfigError> {
        let value = self.raw(index);
        u8::try_from(value).map_err(|_| invalid("ccNumber", value))
    }

    fn cc_value(&self, index: usize, field: &'static str) -> Result<u8, ConfigError> {
        let value = self.raw(index);
        match u8::try_from(value) {
            Ok(cc) if cc <= CC_MAX => Ok(cc),
            _ => Err(invalid(field, value)),
        }
    }

    fn range(&self, min: usize, max: usize) -> Result<(u8, u8), ConfigError> {
        let low = self.cc_value(min, "minCCValue")?;
        let high = self.cc_value(max, "maxCCValue")?;
        if low > high {
            return Err(invalid("maxCCValue", i32::from(high)));
        }
        Ok((low, high))
    }

    /// Times travel as unsigned milliseconds.
    fn duration(&self, index: usize) -> Duration {
        Duration::from_millis(u64::from(self.raw(index) as u32))
    }

    fn curve(&self, index: usize, field: &'static str) -> Result<Curve, ConfigError> {
        let value = self.raw(index);
        Curve::from_raw(value).ok_or(invalid(field, value))
    }
}

struct FieldWriter<'a> {
    out: &'a mut [u8],
    offset: usize,
}

impl<'a> FieldWriter<'a> {
    fn new(out: &'a mut [u8], size: usize) -> Option<Self> {
        if out.len() < size {
            return None;
        }
        Some(Self { out, offset: 0 })
    }

    fn push(&mut self, value: i32) {
        self.out[self.offset..self.offset + 4].copy_from_slice(&value.to_le_bytes());
        self.offset += 4;
    }

    fn push_duration(&mut self, duration: Duration) {
        let millis = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        self.push(millis as i32);
    }

    fn finish(self) -> usize {
        self.offset
    }
}
