mod tests {
    use embassy_time::Instant;
    use kb1_control::hal::MidiOutput;
    use kb1_control::lever::{LeverController, LeverInput};
    use kb1_control::lever_push::LeverPushController;
    use kb1_control::settings::{LeverMode, LeverPushMode, LeverPushSettings, LeverSettings, SettingsCell};

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
    const RIGHT: LeverInput = LeverInput { left: false, right: true };

    fn ms(value: u64) -> Instant {
        Instant::from_millis(value)
    }

    fn push_settings(mode: LeverPushMode) -> LeverPushSettings {
        LeverPushSettings {
            mode,
            ..LeverPushSettings::PRIMARY
        }
    }

    #[test]
    fn test_interpolated_push_ramps_both_ways() {
        let lever_settings = SettingsCell::new(LeverSettings::PRIMARY);
        let settings = SettingsCell::new(push_settings(LeverPushMode::Interpolated));
        let mut lever = LeverController::new(&lever_settings);
        let mut push = LeverPushController::new(&settings);
        let mut midi = MidiLog::default();
        assert_eq!(push.value(), 32);

        assert_eq!(push.update(true, &mut lever, ms(0), &mut midi), None);
        assert_eq!(push.update(true, &mut lever, ms(50), &mut midi), Some(79));
        assert_eq!(push.update(true, &mut lever, ms(100), &mut midi), Some(127));
        assert!(push.is_pressed());

        assert_eq!(push.update(false, &mut lever, ms(200), &mut midi), None);
        assert_eq!(push.update(false, &mut lever, ms(300), &mut midi), Some(32));
        assert_eq!(midi.sent, vec![(24, 79, 1), (24, 127, 1), (24, 32, 1)]);
    }

    #[test]
    fn test_peak_and_decay_push() {
        let lever_settings = SettingsCell::new(LeverSettings::PRIMARY);
        let settings = SettingsCell::new(push_settings(LeverPushMode::PeakAndDecay));
        let mut lever = LeverController::new(&lever_settings);
        let mut push = LeverPushController::new(&settings);
        let mut midi = MidiLog::default();

        assert_eq!(push.update(true, &mut lever, ms(0), &mut midi), Some(127));
        assert_eq!(push.update(false, &mut lever, ms(20), &mut midi), None);
        assert_eq!(push.update(false, &mut lever, ms(70), &mut midi), Some(80));
        assert_eq!(push.update(false, &mut lever, ms(120), &mut midi), Some(32));
    }

    #[test]
    fn test_static_push_toggles_without_ramp() {
        let lever_settings = SettingsCell::new(LeverSettings::PRIMARY);
        let settings = SettingsCell::new(push_settings(LeverPushMode::Static));
        let mut lever = LeverController::new(&lever_settings);
        let mut push = LeverPushController::new(&settings);
        let mut midi = MidiLog::default();

        assert_eq!(push.update(true, &mut lever, ms(0), &mut midi), Some(127));
        assert_eq!(push.update(true, &mut lever, ms(10), &mut midi), None);
        assert_eq!(push.update(false, &mut lever, ms(20), &mut midi), Some(32));
    }

    #[test]
    fn test_reset_push_pulls_lever_to_floor() {
        let lever_settings = SettingsCell::new(LeverSettings {
            cc_number: 30,
            step_size: 8,
            mode: LeverMode::Incremental,
            ..LeverSettings::PRIMARY
        });
        let settings = SettingsCell::new(LeverPushSettings::SECONDARY);
        let mut lever = LeverController::new(&lever_settings);
        let mut push = LeverPushController::new(&settings);
        let mut midi = MidiLog::default();

        assert_eq!(lever.update(RIGHT, ms(0), &mut midi), Some(72));
        lever.update(RELEASED, ms(10), &mut midi);

        assert_eq!(push.update(true, &mut lever, ms(20), &mut midi), None);
        assert_eq!(lever.value(), 81);
        assert_eq!(lever.update(RELEASED, ms(30), &mut midi), Some(81));
        assert_eq!(midi.sent.last(), Some(&(30, 81, 1)));

        lever.update(RIGHT, ms(40), &mut midi);
        assert_eq!(lever.value(), 89);
        push.update(true, &mut lever, ms(50), &mut midi);
        assert_eq!(lever.value(), 81);
    }
}
