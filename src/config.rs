//! Wireless configuration write and read path.
//!
//! Each settings record arrives as a fixed-size blob. A write is checked,
//! swapped into its [`SettingsCell`], persisted under its storage key and
//! counted as radio traffic. Controllers pick the new record up on their
//! next cycle.

use embassy_time::{Duration, Instant};

use crate::device::{
    DeviceContext, LEVER_PUSH1_KEY, LEVER_PUSH2_KEY, LEVER1_KEY, LEVER2_KEY, TOUCH_KEY,
};
use crate::error::ConfigError;
use crate::hal::SettingsStore;
use crate::logging::log;
use crate::settings::{
    CC_MAX, LeverPushSettings, LeverSettings, SettingsCell, SettingsRecord, TouchSettings,
};

/// Writable endpoints of the configuration link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigTarget {
    Lever1,
    LeverPush1,
    Lever2,
    LeverPush2,
    Touch,
    /// Peer is foregrounded and polling.
    KeepAlive,
    /// ASCII `"<cc>,<value>"` forwarded as a control change.
    MidiCc,
}

impl ConfigTarget {
    /// Storage key, for targets that persist.
    pub const fn key(self) -> Option<&'static str> {
        match self {
            Self::Lever1 => Some(LEVER1_KEY),
            Self::LeverPush1 => Some(LEVER_PUSH1_KEY),
            Self::Lever2 => Some(LEVER2_KEY),
            Self::LeverPush2 => Some(LEVER_PUSH2_KEY),
            Self::Touch => Some(TOUCH_KEY),
            Self::KeepAlive | Self::MidiCc => None,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::KeepAlive => "keepalive",
            Self::MidiCc => "midicc",
            Self::Lever1 => LEVER1_KEY,
            Self::LeverPush1 => LEVER_PUSH1_KEY,
            Self::Lever2 => LEVER2_KEY,
            Self::LeverPush2 => LEVER_PUSH2_KEY,
            Self::Touch => TOUCH_KEY,
        }
    }
}

/// What an accepted write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A settings record was replaced.
    Applied {
        /// The store accepted the record.
        persisted: bool,
    },
    /// The keep-alive window was extended.
    KeepAlive { until: Instant },
    /// Send this control change on the MIDI output.
    ControlChange { cc: u8, value: u8 },
}

/// Configuration link endpoint over the shared device context.
pub struct ConfigurationPort<'a, S, const N: usize> {
    ctx: &'a DeviceContext<N>,
    store: S,
    keep_alive_grace: Duration,
}

impl<'a, S: SettingsStore, const N: usize> ConfigurationPort<'a, S, N> {
    /// Create a port over the shared context, persisting accepted records into `store`.
    pub const fn new(ctx: &'a DeviceContext<N>, store: S, keep_alive_grace: Duration) -> Self {
        Self {
            ctx,
            store,
            keep_alive_grace,
        }
    }

    /// Settings store the port writes to.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Handle a write from the peer at `now`.
    ///
    /// Rejected writes change nothing, not even the activity clock.
    pub fn write(
        &mut self,
        target: ConfigTarget,
        bytes: &[u8],
        now: Instant,
    ) -> Result<WriteOutcome, ConfigError> {
        let ctx = self.ctx;
        let outcome = match target {
            ConfigTarget::Lever1 => self.apply(target, bytes, &ctx.lever1),
            ConfigTarget::LeverPush1 => self.apply(target, bytes, &ctx.lever_push1),
            ConfigTarget::Lever2 => self.apply(target, bytes, &ctx.lever2),
            ConfigTarget::LeverPush2 => self.apply(target, bytes, &ctx.lever_push2),
            ConfigTarget::Touch => self.apply(target, bytes, &ctx.touch),
            ConfigTarget::KeepAlive => {
                ctx.activity.keep_alive(now, self.keep_alive_grace);
                log!("[config] keep-alive");
                return Ok(WriteOutcome::KeepAlive {
                    until: ctx.activity.keep_alive_until(),
                });
            }
            ConfigTarget::MidiCc => parse_control_change(bytes)
                .map(|(cc, value)| WriteOutcome::ControlChange { cc, value }),
        };

        match outcome {
            Ok(outcome) => {
                ctx.activity.record_radio(now);
                Ok(outcome)
            }
            Err(error) => {
                log!("[config] {} write rejected: {}", target.name(), error);
                Err(error)
            }
        }
    }

    /// Encode the current record of `target` into `out`.
    pub fn read(&self, target: ConfigTarget, out: &mut [u8]) -> Result<usize, ConfigError> {
        let written = match target {
            ConfigTarget::Lever1 => self.ctx.lever1.get().encode(out),
            ConfigTarget::LeverPush1 => self.ctx.lever_push1.get().encode(out),
            ConfigTarget::Lever2 => self.ctx.lever2.get().encode(out),
            ConfigTarget::LeverPush2 => self.ctx.lever_push2.get().encode(out),
            ConfigTarget::Touch => self.ctx.touch.get().encode(out),
            ConfigTarget::KeepAlive | ConfigTarget::MidiCc => {
                return Err(ConfigError::NoRecord(target.name()));
            }
        };
        written.ok_or(ConfigError::InvalidLength {
            record: target.name(),
            expected: record_size(target),
            actual: out.len(),
        })
    }

    fn apply<T: SettingsRecord>(
        &mut self,
        target: ConfigTarget,
        bytes: &[u8],
        cell: &SettingsCell<T>,
    ) -> Result<WriteOutcome, ConfigError> {
        let record = T::decode_exact(bytes)?;
        cell.set(record);

        let persisted = target.key().is_some_and(|key| self.store.put_bytes(key, bytes));
        if persisted {
            log!("[config] {} updated", target.name());
        } else {
            log!("[config] {} applied but not persisted", target.name());
        }
        Ok(WriteOutcome::Applied { persisted })
    }
}

const fn record_size(target: ConfigTarget) -> usize {
    match target {
        ConfigTarget::Lever1 | ConfigTarget::Lever2 => LeverSettings::SIZE,
        ConfigTarget::LeverPush1 | ConfigTarget::LeverPush2 => LeverPushSettings::SIZE,
        ConfigTarget::Touch => TouchSettings::SIZE,
        ConfigTarget::KeepAlive | ConfigTarget::MidiCc => 0,
    }
}

/// Parse `"<cc>,<value>"`, both within 0..=127.
fn parse_control_change(bytes: &[u8]) -> Result<(u8, u8), ConfigError> {
    let text = core::str::from_utf8(bytes).map_err(|_| ConfigError::MalformedCommand)?;
    let (cc, value) = text.trim().split_once(',').ok_or(ConfigError::MalformedCommand)?;
    let cc = parse_midi_byte(cc, "cc")?;
    let value = parse_midi_byte(value, "value")?;
    Ok((cc, value))
}

fn parse_midi_byte(text: &str, field: &'static str) -> Result<u8, ConfigError> {
    let parsed: i32 = text.trim().parse().map_err(|_| ConfigError::MalformedCommand)?;
    match u8::try_from(parsed) {
        Ok(byte) if byte <= CC_MAX => Ok(byte),
        _ => Err(ConfigError::InvalidValue { field, value: parsed }),
    }
}
