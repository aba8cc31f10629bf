//! Lever feedback on the indicator LEDs.
//!
//! Runs in the input task. It only computes LED targets and queues them;
//! the output task does the actual rendering.

use embassy_time::{Duration, Instant};

use crate::channel::LedSender;
use crate::led::{LedCommand, LedId};

/// Brightness levels and timings of the lever feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorConfig {
    /// Pink level while a lever is pushed right.
    pub pink_max: u8,
    /// Blue level while a lever is pushed left.
    pub blue_max: u8,
    /// Blue level while a lever push is held.
    pub push_level: u8,
    /// Ramp time when an LED brightens.
    pub rise: Duration,
    /// Ramp time when an LED dims.
    pub fall: Duration,
    /// Delay between a push release and the pink blink.
    pub blink_delay: Duration,
    /// Pink level of the blink after a push release.
    pub blink_level: u8,
    /// Fade time of that blink.
    pub blink_decay: Duration,
    /// Pulse period announcing the radio was switched on.
    pub radio_on_period: Duration,
    /// Pulse period announcing the radio was switched off.
    pub radio_off_period: Duration,
    /// How long a radio pulse lasts.
    pub radio_pulse_total: Duration,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            pink_max: 63,
            blue_max: 255,
            push_level: 127,
            rise: Duration::from_millis(50),
            fall: Duration::from_millis(150),
            blink_delay: Duration::from_millis(100),
            blink_level: 15,
            blink_decay: Duration::from_millis(40),
            radio_on_period: Duration::from_millis(333),
            radio_off_period: Duration::from_millis(1000),
            radio_pulse_total: Duration::from_millis(2000),
        }
    }
}

/// Lever state the indicators react to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndicatorInputs {
    /// A lever is pushed right.
    pub any_right: bool,
    /// A lever is pushed left.
    pub any_left: bool,
    /// A lever push is held.
    pub any_push: bool,
}

/// Turns lever state into LED commands for the output task.
pub struct IndicatorAnimator {
    config: IndicatorConfig,
    /// Last queued target per LED.
    pink: Option<u8>,
    blue: Option<u8>,
    push_was_held: bool,
    blink_at: Option<Instant>,
}

impl IndicatorAnimator {
    /// Create an animator that has queued nothing yet.
    pub const fn new(config: IndicatorConfig) -> Self {
        Self {
            config,
            pink: None,
            blue: None,
            push_was_held: false,
            blink_at: None,
        }
    }

    /// Queue LED targets that changed since the last cycle.
    ///
    /// A command that does not fit the queue is retried on the next cycle.
    pub fn update<const N: usize>(
        &mut self,
        inputs: IndicatorInputs,
        now: Instant,
        leds: &LedSender<'_, N>,
    ) {
        let config = self.config;

        if !inputs.any_push && self.push_was_held {
            self.blink_at = Some(now + config.blink_delay);
        }
        self.push_was_held = inputs.any_push;

        let pink_target = if inputs.any_right { config.pink_max } else { 0 };
        match self.blink_at {
            Some(at) if now >= at && pink_target == 0 => {
                self.blink_at = None;
                let flash = LedCommand::Set {
                    led: LedId::Pink,
                    brightness: config.blink_level,
                    duration: Duration::from_millis(0),
                };
                if leds.try_send(flash).is_ok() {
                    self.pink = Some(config.blink_level);
                    let decay = LedCommand::Set {
                        led: LedId::Pink,
                        brightness: 0,
                        duration: config.blink_decay,
                    };
                    if leds.try_send(decay).is_ok() {
                        self.pink = Some(0);
                    }
                }
            }
            _ => {
                let duration = if inputs.any_right { config.rise } else { config.fall };
                Self::request(&mut self.pink, LedId::Pink, pink_target, duration, leds);
            }
        }

        let (blue_target, duration) = if inputs.any_left {
            (config.blue_max, config.rise)
        } else if inputs.any_push {
            (config.push_level, Duration::from_millis(0))
        } else if self.blue == Some(config.push_level) {
            (0, Duration::from_millis(0))
        } else {
            (0, config.fall)
        };
        Self::request(&mut self.blue, LedId::Blue, blue_target, duration, leds);
    }

    /// Pulse both colour LEDs: fast when the radio came on, slow when it went off.
    ///
    /// Returns `false` if the queue had no room for both commands.
    pub fn announce_radio<const N: usize>(
        &mut self,
        enabled: bool,
        leds: &LedSender<'_, N>,
    ) -> bool {
        let period = if enabled {
            self.config.radio_on_period
        } else {
            self.config.radio_off_period
        };
        let total = self.config.radio_pulse_total;
        [LedId::Blue, LedId::Pink]
            .into_iter()
            .all(|led| leds.try_send(LedCommand::Pulse { led, period, total }).is_ok())
    }

    fn request<const N: usize>(
        last: &mut Option<u8>,
        led: LedId,
        target: u8,
        duration: Duration,
        leds: &LedSender<'_, N>,
    ) {
        if *last == Some(target) {
            return;
        }
        let command = LedCommand::Set {
            led,
            brightness: target,
            duration,
        };
        if leds.try_send(command).is_ok() {
            *last = Some(target);
        }
    }
}
