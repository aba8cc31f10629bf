mod tests {
    use std::cell::Cell;
    use std::collections::HashMap;

    use embassy_time::{Duration, Instant};
    use kb1_control::bus::SharedBus;
    use kb1_control::coordinator::{InputTask, OutputTask};
    use kb1_control::device::{DeviceConfig, DeviceContext};
    use kb1_control::hal::{
        ExpanderPin, GpioExpander, Keybed, MidiOutput, PinMode, PwmOutput, RadioControl, SleepController, TouchInput,
        WakeCause,
    };
    use kb1_control::power::{LightSleepOutcome, PowerManager};

    #[derive(Default)]
    struct Expander {
        levels: HashMap<ExpanderPin, bool>,
    }

    impl GpioExpander for Expander {
        fn begin(&mut self, _chip: u8) -> bool {
            true
        }

        fn pin_mode(&mut self, _pin: ExpanderPin, _mode: PinMode) {}

        fn digital_read(&mut self, pin: ExpanderPin) -> bool {
            self.levels.get(&pin).copied().unwrap_or(true)
        }

        fn digital_write(&mut self, pin: ExpanderPin, high: bool) {
            self.levels.insert(pin, high);
        }
    }

    #[derive(Default)]
    struct MidiLog {
        sent: Vec<(u8, u8, u8)>,
    }

    impl MidiOutput for MidiLog {
        fn send_control_change(&mut self, cc: u8, value: u8, channel: u8) {
            self.sent.push((cc, value, channel));
        }
    }

    #[derive(Default)]
    struct Pwm {
        duty: HashMap<u8, u8>,
        writes: usize,
    }

    impl PwmOutput for Pwm {
        fn set_duty(&mut self, pin: u8, duty: u8) {
            self.duty.insert(pin, duty);
            self.writes += 1;
        }
    }

    struct Pad<'a>(&'a Cell<u32>);

    impl TouchInput for Pad<'_> {
        fn read(&mut self) -> u32 {
            self.0.get()
        }
    }

    struct Keys<'a>(&'a Cell<bool>);

    impl Keybed for Keys<'_> {
        fn scan(&mut self, _now: Instant) -> bool {
            self.0.get()
        }
    }

    struct FakeSleep {
        now: u64,
    }

    impl SleepController for FakeSleep {
        fn now(&self) -> Instant {
            Instant::from_millis(self.now)
        }

        fn delay(&mut self, duration: Duration) {
            self.now += duration.as_millis();
        }

        fn arm_touch_wake(&mut self, _threshold: u16) {}

        fn enter_light(&mut self, _duration: Duration) -> WakeCause {
            self.now += 100;
            WakeCause::Touch
        }

        fn enter_deep(&mut self) {}
    }

    struct Radio;

    impl RadioControl for Radio {
        fn is_enabled(&self) -> bool {
            false
        }

        fn enable(&mut self) {}

        fn disable(&mut self) {}

        fn set_low_power(&mut self, _enabled: bool) {}
    }

    fn ms(value: u64) -> Instant {
        Instant::from_millis(value)
    }

    fn press(bus: &SharedBus<Expander>, pin: ExpanderPin, pressed: bool) {
        bus.with(|expander| expander.levels.insert(pin, !pressed));
    }

    fn lever_sends(midi: &MidiLog, cc: u8) -> Vec<u8> {
        midi.sent
            .iter()
            .filter(|(number, _, _)| *number == cc)
            .map(|(_, value, _)| *value)
            .collect()
    }

    #[test]
    fn test_lever_press_flows_to_midi_activity_and_leds() {
        let ctx: DeviceContext<16> = DeviceContext::new();
        let bus = SharedBus::new(Expander::default());
        let config = DeviceConfig::default();
        let reading = Cell::new(26_000);
        let keys = Cell::new(false);
        let mut input = InputTask::new(&ctx, &bus, &config, Pad(&reading), Keys(&keys));
        let mut output = OutputTask::new(&ctx, &bus, &config, Pwm::default());
        let mut midi = MidiLog::default();

        input.tick(ms(0), &mut midi);
        assert!(!ctx.activity.inputs_held());

        press(&bus, config.levers[0].right, true);
        let report = input.tick(ms(10), &mut midi);
        assert!(report.held);
        assert!(ctx.activity.inputs_held());
        assert_eq!(ctx.activity.last_activity(), ms(10));

        input.tick(ms(60), &mut midi);
        assert_eq!(lever_sends(&midi, 3), vec![95]);
        assert_eq!(input.lever(0).map(|lever| lever.value()), Some(95));

        output.tick(ms(60));
        output.tick(ms(110));
        assert_eq!(output.pwm().duty.get(&config.pink_led), Some(&63));
        assert!(ctx.leds.is_empty());
    }

    #[test]
    fn test_quiet_inputs_leave_activity_alone() {
        let ctx: DeviceContext<16> = DeviceContext::new();
        let bus = SharedBus::new(Expander::default());
        let config = DeviceConfig::default();
        let reading = Cell::new(26_000);
        let keys = Cell::new(false);
        let mut input = InputTask::new(&ctx, &bus, &config, Pad(&reading), Keys(&keys));
        let mut midi = MidiLog::default();

        input.tick(ms(0), &mut midi);
        let report = input.tick(ms(10), &mut midi);
        assert!(!report.changed);
        assert!(!report.held);
        assert_eq!(ctx.activity.last_activity(), ms(0));

        keys.set(true);
        let report = input.tick(ms(20), &mut midi);
        assert!(report.held);
        assert_eq!(ctx.activity.last_activity(), ms(20));
    }

    #[test]
    fn test_touch_counts_as_held_input() {
        let ctx: DeviceContext<16> = DeviceContext::new();
        let bus = SharedBus::new(Expander::default());
        let config = DeviceConfig::default();
        let reading = Cell::new(60_000);
        let keys = Cell::new(false);
        let mut input = InputTask::new(&ctx, &bus, &config, Pad(&reading), Keys(&keys));
        let mut midi = MidiLog::default();

        let report = input.tick(ms(0), &mut midi);
        assert!(input.touch().is_active());
        assert!(report.held);
        assert_eq!(lever_sends(&midi, 1), vec![80]);
    }

    #[test]
    fn test_push_reset_reaches_paired_lever() {
        let ctx: DeviceContext<16> = DeviceContext::new();
        let bus = SharedBus::new(Expander::default());
        let config = DeviceConfig::default();
        let reading = Cell::new(26_000);
        let keys = Cell::new(false);
        let mut input = InputTask::new(&ctx, &bus, &config, Pad(&reading), Keys(&keys));
        let mut midi = MidiLog::default();
        let pins = config.levers[1];

        press(&bus, pins.right, true);
        input.tick(ms(0), &mut midi);
        assert_eq!(input.lever(1).map(|lever| lever.value()), Some(72));
        press(&bus, pins.right, false);
        input.tick(ms(10), &mut midi);

        press(&bus, pins.push, true);
        input.tick(ms(20), &mut midi);
        assert_eq!(input.lever(1).map(|lever| lever.value()), Some(81));
        input.tick(ms(30), &mut midi);
        assert_eq!(input.lever(1).map(|lever| lever.last_sent()), Some(81));
        assert!(input.lever_push(1).is_some_and(|push| push.is_pressed()));
    }

    #[test]
    fn test_task_pacing() {
        let ctx: DeviceContext<16> = DeviceContext::new();
        let bus = SharedBus::new(Expander::default());
        let config = DeviceConfig::default();
        let reading = Cell::new(26_000);
        let keys = Cell::new(false);
        let mut input = InputTask::new(&ctx, &bus, &config, Pad(&reading), Keys(&keys));
        let mut output = OutputTask::new(&ctx, &bus, &config, Pwm::default());
        let mut midi = MidiLog::default();

        assert_eq!(input.tick(ms(0), &mut midi).sleep, Duration::from_millis(10));
        assert_eq!(input.tick(ms(13), &mut midi).sleep, Duration::from_millis(7));
        assert_eq!(output.tick(ms(0)), Duration::from_millis(1));
    }

    #[test]
    fn test_power_service_rewrites_leds_after_sleep() {
        let ctx: DeviceContext<16> = DeviceContext::new();
        let bus = SharedBus::new(Expander::default());
        let config = DeviceConfig::default();
        let mut output = OutputTask::new(&ctx, &bus, &config, Pwm::default());
        let mut power = PowerManager::new(config.power, &ctx.activity, &ctx.wake, ms(0));
        let mut radio = Radio;

        output.tick(ms(0));
        let mut sleep = FakeSleep { now: 1_000 };
        let wake_threshold = ctx.touch.get().wake_threshold();
        assert_eq!(output.service_power(&mut power, &mut sleep, &mut radio, wake_threshold), None);

        let mut sleep = FakeSleep { now: 302_000 };
        let outcome = output.service_power(&mut power, &mut sleep, &mut radio, wake_threshold);
        assert_eq!(outcome, Some(LightSleepOutcome::TouchWake));
        assert_eq!(ctx.activity.last_activity(), sleep.now());

        let before = output.pwm().writes;
        output.tick(sleep.now());
        assert_eq!(output.pwm().writes, before + 2);
        assert_eq!(output.renderer().brightness(kb1_control::led::LedId::Pink), 0);
    }
}
