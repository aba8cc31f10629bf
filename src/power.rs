//! Idle detection and tiered sleep.
//!
//! ```text
//! Active ──quiet──▶ IdleConfirming ──idle_confirm──▶ (confirmed)
//!    ▲                                                   │ deep_sleep_idle
//!    └────────────── any activity ◀── LightSleep ◀───────┘
//!                                        │ light_sleep_window, no activity
//!                                        ▼
//!                                    DeepSleep (wake restarts the device)
//! ```
//!
//! All transitions are elapsed-time comparisons against the
//! [`ActivityClock`]. The blocking halts go through a [`SleepController`],
//! so the state machine runs unchanged against a fake clock in tests.
//!
//! Independently, the radio drops into a low-power receive mode once the
//! wireless link has been quiet for `radio_idle`.

use embassy_time::{Duration, Instant};

use crate::activity::{ActivityClock, WakeSignal};
use crate::hal::{RadioControl, SleepController, WakeCause};
use crate::led::{LedId, StatusLights};
use crate::logging::log;

/// Where the device is on the way to sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepState {
    Active,
    /// No activity since the last poll; the confirmation window or the
    /// deep-sleep countdown is running.
    IdleConfirming,
    LightSleep,
    /// Terminal: the process image does not survive the wake.
    DeepSleep,
}

/// How a light-sleep loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightSleepOutcome {
    /// Activity was seen before halting.
    Aborted,
    /// The touch pad woke the processor.
    TouchWake,
    /// The window ran out but an input was held.
    ActivityAfterWindow,
    /// The window ran out quietly and the device went into deep sleep.
    DeepSleep,
}

/// Idle, sleep and status light timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerConfig {
    /// Quiet period before the idle is trusted.
    pub idle_confirm: Duration,
    /// Further idle after confirmation before light sleep.
    pub deep_sleep_idle: Duration,
    /// Longest light-sleep loop before deep sleep.
    pub light_sleep_window: Duration,
    /// Timer wake interval inside the light-sleep loop.
    pub light_sleep_probe: Duration,
    /// Activity this recent aborts the light-sleep loop.
    pub recent_activity: Duration,
    /// Wireless quiet time before the radio goes low-power.
    pub radio_idle: Duration,
    /// Extension granted by a keep-alive ping.
    pub keep_alive_grace: Duration,
    /// Heartbeat flash length during light sleep.
    pub heartbeat_on: Duration,
    /// Dark time after each heartbeat flash.
    pub heartbeat_gap: Duration,
    /// Flash length of the deep-sleep farewell blink.
    pub blink_on: Duration,
    /// Dark time between farewell flashes.
    pub blink_gap: Duration,
    /// Pink brightness during heartbeat and blink.
    pub pink_level: u8,
    /// Blue brightness during heartbeat and blink.
    pub blue_level: u8,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            idle_confirm: Duration::from_secs(2),
            deep_sleep_idle: Duration::from_secs(300),
            light_sleep_window: Duration::from_secs(90),
            light_sleep_probe: Duration::from_secs(2),
            recent_activity: Duration::from_secs(1),
            radio_idle: Duration::from_secs(60),
            keep_alive_grace: Duration::from_secs(600),
            heartbeat_on: Duration::from_millis(150),
            heartbeat_gap: Duration::from_millis(5),
            blink_on: Duration::from_millis(80),
            blink_gap: Duration::from_millis(5),
            pink_level: 63,
            blue_level: 255,
        }
    }
}

/// Idle detection and sleep sequencing over the shared activity clock.
pub struct PowerManager<'a> {
    config: PowerConfig,
    activity: &'a ActivityClock,
    wake: &'a WakeSignal,
    state: SleepState,
    /// Latest activity timestamp already acted on.
    observed: Instant,
    /// Start of the current quiet period.
    idle_since: Option<Instant>,
    /// Moment the idle was confirmed, start of the deep-sleep countdown.
    confirmed_at: Option<Instant>,
    radio_low_power: bool,
}

impl<'a> PowerManager<'a> {
    /// Create a manager; boot at `now` counts as activity.
    pub fn new(
        config: PowerConfig,
        activity: &'a ActivityClock,
        wake: &'a WakeSignal,
        now: Instant,
    ) -> Self {
        activity.record(now);
        Self {
            config,
            activity,
            wake,
            state: SleepState::Active,
            observed: activity.last_activity(),
            idle_since: None,
            confirmed_at: None,
            radio_low_power: false,
        }
    }

    /// State reached by the last poll.
    pub const fn state(&self) -> SleepState {
        self.state
    }

    /// Timings the manager runs with.
    pub const fn config(&self) -> &PowerConfig {
        &self.config
    }

    /// Check if the quiet period has outlasted `idle_confirm`.
    pub const fn idle_confirmed(&self) -> bool {
        self.confirmed_at.is_some()
    }

    /// Time elapsed on the deep-sleep countdown, zero until idle is confirmed.
    pub fn deep_sleep_countdown(&self, now: Instant) -> Duration {
        self.confirmed_at
            .map(|confirmed| now.saturating_duration_since(confirmed))
            .unwrap_or(Duration::from_millis(0))
    }

    /// Check if the radio is in its low-power receive mode.
    pub const fn radio_low_power(&self) -> bool {
        self.radio_low_power
    }

    /// Advance the idle state machine to `now` without halting.
    pub fn poll(&mut self, now: Instant) -> SleepState {
        if self.state == SleepState::DeepSleep {
            return self.state;
        }

        if self.wake.take() {
            log!("[power] touch wake signalled");
            self.activity.record(now);
        }

        let last = self.activity.last_activity();
        if last > self.observed || self.activity.inputs_held() {
            if last > self.observed {
                self.observed = last;
            }
            self.mark_active();
            return self.state;
        }

        if self.state == SleepState::LightSleep {
            return self.state;
        }

        let quiet_since = *self.idle_since.get_or_insert(self.observed);
        self.state = SleepState::IdleConfirming;

        if self.confirmed_at.is_none()
            && now.saturating_duration_since(quiet_since) >= self.config.idle_confirm
        {
            log!("[power] idle confirmed");
            self.confirmed_at = Some(quiet_since + self.config.idle_confirm);
        }

        if self.confirmed_at.is_some()
            && self.deep_sleep_countdown(now) >= self.config.deep_sleep_idle
        {
            if self.activity.keep_alive_active(now) {
                return self.state;
            }
            log!(
                "[power] idle for {} ms, entering light sleep",
                self.activity.idle_for(now).as_millis()
            );
            self.state = SleepState::LightSleep;
        }

        self.state
    }

    /// Gate the radio's low-power receive mode on wireless activity.
    pub fn poll_radio<R: RadioControl>(&mut self, now: Instant, radio: &mut R) {
        let quiet = now.saturating_duration_since(self.activity.last_radio_activity());
        let idle = quiet >= self.config.radio_idle;

        if idle && !self.radio_low_power && radio.is_enabled() {
            log!("[power] radio idle, entering low-power receive");
            radio.set_low_power(true);
            self.radio_low_power = true;
        } else if !idle && self.radio_low_power {
            log!("[power] radio activity, leaving low-power receive");
            radio.set_low_power(false);
            self.radio_low_power = false;
        }
    }

    /// Poll both state machines and run the light-sleep loop when due.
    ///
    /// Returns how the loop ended if one ran.
    pub fn service<S, R, L>(
        &mut self,
        sleep: &mut S,
        radio: &mut R,
        lights: &mut L,
        wake_threshold: u16,
    ) -> Option<LightSleepOutcome>
    where
        S: SleepController,
        R: RadioControl,
        L: StatusLights,
    {
        let now = sleep.now();
        self.poll_radio(now, radio);
        if self.poll(now) != SleepState::LightSleep {
            return None;
        }
        Some(self.run_light_sleep(sleep, radio, lights, wake_threshold))
    }

    /// Bounded light-sleep loop.
    ///
    /// Each iteration checks for activity, shows a heartbeat, arms the touch
    /// and timer wake sources and halts. A touch wake returns to `Active`.
    /// When the window runs out quietly the device goes into deep sleep.
    pub fn run_light_sleep<S, R, L>(
        &mut self,
        sleep: &mut S,
        radio: &mut R,
        lights: &mut L,
        wake_threshold: u16,
    ) -> LightSleepOutcome
    where
        S: SleepController,
        R: RadioControl,
        L: StatusLights,
    {
        self.state = SleepState::LightSleep;
        let started = sleep.now();
        log!("[power] light sleep, wake threshold {}", wake_threshold);

        sleep.arm_touch_wake(wake_threshold);
        lights.show(LedId::OctaveUp, 0);
        lights.show(LedId::OctaveDown, 0);

        let radio_was_enabled = radio.is_enabled();
        if radio_was_enabled {
            radio.disable();
        }

        let woken = loop {
            let now = sleep.now();
            if now.saturating_duration_since(started) >= self.config.light_sleep_window {
                break None;
            }
            if self.activity.inputs_held()
                || self.activity.idle_for(now) < self.config.recent_activity
            {
                log!("[power] activity before light sleep, aborting");
                break Some(LightSleepOutcome::Aborted);
            }

            self.heartbeat(sleep, lights);

            sleep.arm_touch_wake(wake_threshold);
            let cause = sleep.enter_light(self.config.light_sleep_probe);
            let signalled = self.wake.take();
            match cause {
                WakeCause::Touch => {
                    log!("[power] woke from light sleep: touch");
                    self.activity.record(sleep.now());
                    break Some(LightSleepOutcome::TouchWake);
                }
                _ if signalled => {
                    log!("[power] woke from light sleep: touch signal");
                    self.activity.record(sleep.now());
                    break Some(LightSleepOutcome::TouchWake);
                }
                WakeCause::Timer => log!("[power] woke from light sleep: timer"),
                WakeCause::Other(code) => {
                    log!("[power] unexpected wake cause {}, treating as timer", code);
                }
            }

            sleep.delay(Duration::from_millis(10));
        };

        if radio_was_enabled {
            radio.enable();
        }
        self.radio_low_power = false;

        if let Some(outcome) = woken {
            self.resume();
            return outcome;
        }

        if self.activity.inputs_held() {
            log!("[power] input held after light sleep window, staying awake");
            self.resume();
            return LightSleepOutcome::ActivityAfterWindow;
        }

        log!("[power] no activity during light sleep window");
        self.enter_deep_sleep(sleep, lights, wake_threshold);
        LightSleepOutcome::DeepSleep
    }

    /// Arm touch as the only wake source, blink once and halt.
    pub fn enter_deep_sleep<S, L>(&mut self, sleep: &mut S, lights: &mut L, wake_threshold: u16)
    where
        S: SleepController,
        L: StatusLights,
    {
        self.state = SleepState::DeepSleep;
        let now = sleep.now();
        log!("[power] deep sleep report");
        log!("[power]   uptime {} ms", now.as_millis());
        log!("[power]   idle {} ms", self.activity.idle_for(now).as_millis());
        log!("[power]   wake threshold {}", wake_threshold);

        sleep.arm_touch_wake(wake_threshold);
        self.blink_once(sleep, lights);

        log!("[power] entering deep sleep");
        sleep.delay(Duration::from_millis(50));
        sleep.enter_deep();
    }

    fn mark_active(&mut self) {
        if self.state != SleepState::Active {
            log!("[power] activity, back to active");
        }
        self.state = SleepState::Active;
        self.idle_since = None;
        self.confirmed_at = None;
    }

    fn resume(&mut self) {
        self.observed = self.activity.last_activity();
        self.mark_active();
    }

    fn heartbeat<S: SleepController, L: StatusLights>(&self, sleep: &mut S, lights: &mut L) {
        let steps = [
            (LedId::Pink, self.config.pink_level),
            (LedId::Blue, self.config.blue_level),
        ];
        for (led, level) in steps {
            lights.show(led, level);
            sleep.delay(self.config.heartbeat_on);
            lights.show(led, 0);
            sleep.delay(self.config.heartbeat_gap);
        }
    }

    fn blink_once<S: SleepController, L: StatusLights>(&self, sleep: &mut S, lights: &mut L) {
        let steps = [
            (LedId::Pink, self.config.pink_level),
            (LedId::Blue, self.config.blue_level),
            (LedId::OctaveDown, u8::MAX),
            (LedId::OctaveUp, u8::MAX),
        ];
        for (led, level) in steps {
            lights.show(led, level);
            sleep.delay(self.config.blink_on);
            lights.show(led, 0);
            sleep.delay(self.config.blink_gap);
        }
    }
}
