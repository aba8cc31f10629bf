//! The two real-time tasks and how they share hardware.
//!
//! [`InputTask`] samples every input on a 10 ms cadence, advances the
//! controllers and queues LED targets. [`OutputTask`] runs every millisecond,
//! drains the LED queue and renders, which makes it the only writer of LED
//! hardware. The expander bus is the one resource both touch; every access
//! goes through [`SharedBus`] for a single read or write. Everything else is
//! owned by one task and crosses over only through the [`ActivityClock`] and
//! the LED queue.
//!
//! ```ignore
//! // core 1
//! loop {
//!     let report = input.tick(Instant::now(), &mut midi);
//!     Timer::after(report.sleep).await;
//! }
//!
//! // core 0
//! loop {
//!     output.service_power(&mut power, &mut sleep, &mut radio, ctx.touch.get().wake_threshold());
//!     let wait = output.tick(Instant::now());
//!     Timer::after(wait).await;
//! }
//! ```

use embassy_time::{Duration, Instant};

use crate::activity::ActivityClock;
use crate::bus::SharedBus;
use crate::channel::{LedReceiver, LedSender};
use crate::device::{DeviceConfig, DeviceContext, LeverPins};
use crate::hal::{
    GpioExpander, Keybed, MidiOutput, PwmOutput, RadioControl, SleepController, TouchInput,
};
use crate::indicator::{IndicatorAnimator, IndicatorInputs};
use crate::led::{LedHardware, LedId, LedOutput, LedRenderer};
use crate::lever::{LeverController, LeverInput, VelocityHook};
use crate::lever_push::LeverPushController;
use crate::power::{LightSleepOutcome, PowerManager};
use crate::scheduler::TaskPacer;
use crate::touch::TouchSensor;

/// Result of one input cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputReport {
    /// How long to wait before the next cycle.
    pub sleep: Duration,
    /// Some control produced a new value.
    pub changed: bool,
    /// Some input is held.
    pub held: bool,
}

/// Input sampling task.
pub struct InputTask<'a, E, T, K, const N: usize> {
    bus: &'a SharedBus<E>,
    pins: [LeverPins; 2],
    levers: [LeverController<'a>; 2],
    pushes: [LeverPushController<'a>; 2],
    touch: TouchSensor<'a>,
    touch_input: T,
    keybed: K,
    indicators: IndicatorAnimator,
    leds: LedSender<'a, N>,
    activity: &'a ActivityClock,
    pacer: TaskPacer,
}

impl<'a, E, T, K, const N: usize> InputTask<'a, E, T, K, N>
where
    E: GpioExpander,
    T: TouchInput,
    K: Keybed,
{
    /// Create the task with every controller resting at its configured value.
    pub fn new(
        ctx: &'a DeviceContext<N>,
        bus: &'a SharedBus<E>,
        config: &DeviceConfig,
        touch_input: T,
        keybed: K,
    ) -> Self {
        Self {
            bus,
            pins: config.levers,
            levers: [LeverController::new(&ctx.lever1), LeverController::new(&ctx.lever2)],
            pushes: [
                LeverPushController::new(&ctx.lever_push1),
                LeverPushController::new(&ctx.lever_push2),
            ],
            touch: TouchSensor::new(&ctx.touch, config.touch),
            touch_input,
            keybed,
            indicators: IndicatorAnimator::new(config.indicators),
            leds: ctx.leds.sender(),
            activity: &ctx.activity,
            pacer: TaskPacer::new(config.input_period),
        }
    }

    /// Route lever values on the velocity CC into the keybed.
    #[must_use]
    pub fn with_velocity_hook(mut self, velocity_cc: u8, hook: VelocityHook) -> Self {
        self.levers = self.levers.map(|lever| lever.with_velocity_route(velocity_cc, hook));
        self
    }

    /// Lever controller at `index`, if the board has one.
    pub fn lever(&self, index: usize) -> Option<&LeverController<'a>> {
        self.levers.get(index)
    }

    /// Lever push controller at `index`, if the board has one.
    pub fn lever_push(&self, index: usize) -> Option<&LeverPushController<'a>> {
        self.pushes.get(index)
    }

    /// Touch pad controller.
    pub const fn touch(&self) -> &TouchSensor<'a> {
        &self.touch
    }

    /// Queue the radio on/off pulse on the indicator LEDs.
    pub fn announce_radio(&mut self, enabled: bool) -> bool {
        self.indicators.announce_radio(enabled, &self.leds)
    }

    /// Run one input cycle at `now`.
    pub fn tick<M: MidiOutput>(&mut self, now: Instant, midi: &mut M) -> InputReport {
        let raw = self.touch_input.read();
        let mut changed = self.touch.update(raw, midi).is_some();
        let mut held = self.touch.is_active();
        let mut indicators = IndicatorInputs::default();

        let controls = self.levers.iter_mut().zip(self.pushes.iter_mut());
        for ((lever, push), pins) in controls.zip(self.pins.iter()) {
            let input = LeverInput {
                left: self.bus.is_pressed(pins.left),
                right: self.bus.is_pressed(pins.right),
            };
            let pushed = self.bus.is_pressed(pins.push);

            changed |= lever.update(input, now, midi).is_some();
            changed |= push.update(pushed, lever, now, midi).is_some();

            held |= input.any() || pushed;
            indicators.any_left |= input.left;
            indicators.any_right |= input.right;
            indicators.any_push |= pushed;
        }

        held |= self.keybed.scan(now);

        if held || changed {
            self.activity.record(now);
        }
        self.activity.set_inputs_held(held);
        self.indicators.update(indicators, now, &self.leds);

        InputReport {
            sleep: self.pacer.pace(now),
            changed,
            held,
        }
    }
}

/// LED rendering task, sole writer of LED hardware.
pub struct OutputTask<'a, P, E, const N: usize> {
    renderer: LedRenderer,
    commands: LedReceiver<'a, N>,
    pwm: P,
    bus: &'a SharedBus<E>,
    pacer: TaskPacer,
}

impl<'a, P, E, const N: usize> OutputTask<'a, P, E, N>
where
    P: PwmOutput,
    E: GpioExpander,
{
    /// Create the task and bind every LED to its output.
    pub fn new(
        ctx: &'a DeviceContext<N>,
        bus: &'a SharedBus<E>,
        config: &DeviceConfig,
        pwm: P,
    ) -> Self {
        let mut renderer = LedRenderer::new();
        renderer.attach(LedId::Pink, LedOutput::Pwm(config.pink_led));
        renderer.attach(LedId::Blue, LedOutput::Pwm(config.blue_led));
        renderer.attach(LedId::OctaveUp, LedOutput::Expander(config.octave_up_led));
        renderer.attach(LedId::OctaveDown, LedOutput::Expander(config.octave_down_led));
        Self {
            renderer,
            commands: ctx.leds.receiver(),
            pwm,
            bus,
            pacer: TaskPacer::new(config.output_period),
        }
    }

    /// LED state as last rendered.
    pub const fn renderer(&self) -> &LedRenderer {
        &self.renderer
    }

    /// PWM driver of the colour LEDs.
    pub const fn pwm(&self) -> &P {
        &self.pwm
    }

    /// Drain queued LED commands, render, and return the wait until the next cycle.
    pub fn tick(&mut self, now: Instant) -> Duration {
        for command in self.commands.drain() {
            self.renderer.apply(command, now);
        }
        self.renderer.render(now, &mut self.pwm, self.bus);
        self.pacer.pace(now)
    }

    /// Let the power manager run, lending it the LEDs for the sleep heartbeat.
    pub fn service_power<S, R>(
        &mut self,
        power: &mut PowerManager<'_>,
        sleep: &mut S,
        radio: &mut R,
        wake_threshold: u16,
    ) -> Option<LightSleepOutcome>
    where
        S: SleepController,
        R: RadioControl,
    {
        let mut lights = LedHardware {
            renderer: &mut self.renderer,
            pwm: &mut self.pwm,
            bus: self.bus,
        };
        let outcome = power.service(sleep, radio, &mut lights, wake_threshold);
        if outcome.is_some() {
            self.renderer.invalidate();
        }
        outcome
    }
}
