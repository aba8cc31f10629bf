mod tests {
    use core::sync::atomic::{AtomicU8, Ordering};

    use embassy_time::{Duration, Instant};
    use kb1_control::hal::MidiOutput;
    use kb1_control::lever::{LeverController, LeverInput};
    use kb1_control::ramp::Curve;
    use kb1_control::settings::{LeverMode, LeverSettings, Polarity, SettingsCell};

    #[derive(Default)]
    struct MidiLog {
        sent: Vec<(u8, u8, u8)>,
    }

    impl MidiOutput for MidiLog {
        fn send_control_change(&mut self, cc: u8, value: u8, channel: u8) {
            self.sent.push((cc, value, channel));
        }
    }

    const RELEASED: LeverInput = LeverInput { left: false, right: false };
    const LEFT: LeverInput = LeverInput { left: true, right: false };
    const RIGHT: LeverInput = LeverInput { left: false, right: true };

    fn ms(value: u64) -> Instant {
        Instant::from_millis(value)
    }

    fn incremental(min: u8, max: u8, step: u8) -> LeverSettings {
        LeverSettings {
            cc_number: 20,
            min_cc_value: min,
            max_cc_value: max,
            step_size: step,
            mode: LeverMode::Incremental,
            ..LeverSettings::PRIMARY
        }
    }

    #[test]
    fn test_interpolated_lever_reaches_midpoint() {
        let settings = SettingsCell::new(LeverSettings::PRIMARY);
        let mut lever = LeverController::new(&settings);
        let mut midi = MidiLog::default();
        assert_eq!(lever.value(), 64);

        assert_eq!(lever.update(RIGHT, ms(0), &mut midi), None);
        assert_eq!(lever.target(), 127);

        assert_eq!(lever.update(RIGHT, ms(50), &mut midi), Some(95));
        assert_eq!(midi.sent, vec![(3, 95, 1)]);

        assert_eq!(lever.update(RIGHT, ms(100), &mut midi), Some(127));
        assert_eq!(lever.update(RIGHT, ms(110), &mut midi), None);

        assert_eq!(lever.update(RELEASED, ms(200), &mut midi), None);
        assert_eq!(lever.target(), 64);
        assert_eq!(lever.update(RELEASED, ms(250), &mut midi), Some(96));
        assert_eq!(lever.update(RELEASED, ms(300), &mut midi), Some(64));
    }

    #[test]
    fn test_interpolated_lever_uses_offset_timing_on_release() {
        let settings = SettingsCell::new(LeverSettings {
            offset_time: Duration::from_millis(400),
            ..LeverSettings::PRIMARY
        });
        let mut lever = LeverController::new(&settings);
        let mut midi = MidiLog::default();

        lever.update(LEFT, ms(0), &mut midi);
        assert_eq!(lever.update(LEFT, ms(100), &mut midi), Some(0));

        lever.update(RELEASED, ms(100), &mut midi);
        assert_eq!(lever.update(RELEASED, ms(300), &mut midi), Some(32));
        assert_eq!(lever.update(RELEASED, ms(500), &mut midi), Some(64));
    }

    #[test]
    fn test_incremental_steps_on_edges() {
        let settings = SettingsCell::new(incremental(0, 127, 8));
        let mut lever = LeverController::new(&settings);
        let mut midi = MidiLog::default();

        assert_eq!(lever.update(RIGHT, ms(0), &mut midi), Some(72));
        assert!(lever.is_held());
        assert_eq!(lever.update(RIGHT, ms(10), &mut midi), None);
        assert_eq!(lever.update(RELEASED, ms(20), &mut midi), None);
        assert!(!lever.is_held());
        assert_eq!(lever.update(RIGHT, ms(30), &mut midi), Some(80));
        lever.update(RELEASED, ms(40), &mut midi);
        assert_eq!(lever.update(LEFT, ms(50), &mut midi), Some(72));

        let values: Vec<u8> = midi.sent.iter().map(|(_, value, _)| *value).collect();
        assert_eq!(values, vec![72, 80, 72]);
    }

    #[test]
    fn test_incremental_clamps_to_range() {
        let settings = SettingsCell::new(incremental(60, 70, 8));
        let mut lever = LeverController::new(&settings);
        let mut midi = MidiLog::default();

        assert_eq!(lever.update(RIGHT, ms(0), &mut midi), Some(70));
        lever.update(RELEASED, ms(10), &mut midi);
        assert_eq!(lever.update(RIGHT, ms(20), &mut midi), None);
        lever.update(RELEASED, ms(30), &mut midi);

        assert_eq!(lever.update(LEFT, ms(40), &mut midi), Some(62));
        lever.update(RELEASED, ms(50), &mut midi);
        assert_eq!(lever.update(LEFT, ms(60), &mut midi), Some(60));
        lever.update(RELEASED, ms(70), &mut midi);
        assert_eq!(lever.update(LEFT, ms(80), &mut midi), None);

        assert!(midi.sent.iter().all(|(_, value, _)| (60..=70).contains(value)));
    }

    #[test]
    fn test_peak_and_decay_jumps_then_decays() {
        let settings = SettingsCell::new(LeverSettings {
            mode: LeverMode::PeakAndDecay,
            ..LeverSettings::PRIMARY
        });
        let mut lever = LeverController::new(&settings);
        let mut midi = MidiLog::default();

        assert_eq!(lever.update(RIGHT, ms(0), &mut midi), Some(127));
        assert_eq!(lever.update(RIGHT, ms(60), &mut midi), None);

        assert_eq!(lever.update(RELEASED, ms(100), &mut midi), None);
        assert_eq!(lever.update(RELEASED, ms(150), &mut midi), Some(96));
        assert_eq!(lever.update(RELEASED, ms(200), &mut midi), Some(64));

        assert_eq!(lever.update(LEFT, ms(300), &mut midi), Some(0));
    }

    #[test]
    fn test_unipolar_rests_at_minimum() {
        let settings = SettingsCell::new(LeverSettings {
            min_cc_value: 10,
            polarity: Polarity::Unipolar,
            onset_curve: Curve::Accelerating,
            ..LeverSettings::PRIMARY
        });
        let lever = LeverController::new(&settings);
        assert_eq!(lever.value(), 10);
        assert_eq!(lever.last_sent(), 10);
    }

    #[test]
    fn test_silenced_lever_sends_nothing() {
        let settings = SettingsCell::new(LeverSettings::SECONDARY);
        let mut lever = LeverController::new(&settings);
        let mut midi = MidiLog::default();

        assert_eq!(lever.update(RIGHT, ms(0), &mut midi), Some(72));
        assert!(midi.sent.is_empty());
    }

    #[test]
    fn test_settings_change_applies_next_cycle() {
        let settings = SettingsCell::new(incremental(0, 127, 1));
        let mut lever = LeverController::new(&settings);
        let mut midi = MidiLog::default();

        lever.update(RIGHT, ms(0), &mut midi);
        lever.update(RELEASED, ms(10), &mut midi);
        settings.update(|record| record.step_size = 10);
        assert_eq!(lever.update(RIGHT, ms(20), &mut midi), Some(75));
    }

    static VELOCITY: AtomicU8 = AtomicU8::new(0);

    fn set_velocity(value: u8) {
        VELOCITY.store(value, Ordering::SeqCst);
    }

    #[test]
    fn test_velocity_hook_follows_matching_cc() {
        let settings = SettingsCell::new(LeverSettings {
            cc_number: 7,
            ..LeverSettings::PRIMARY
        });
        let mut lever = LeverController::new(&settings).with_velocity_route(7, set_velocity);
        let mut midi = MidiLog::default();

        lever.update(RIGHT, ms(0), &mut midi);
        lever.update(RIGHT, ms(100), &mut midi);
        assert_eq!(VELOCITY.load(Ordering::SeqCst), 127);
        assert_eq!(midi.sent.last(), Some(&(7, 127, 1)));
    }
}
