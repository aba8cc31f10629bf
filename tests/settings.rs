mod tests {
    use embassy_time::Duration;
    use kb1_control::error::ConfigError;
    use kb1_control::ramp::Curve;
    use kb1_control::settings::{
        LeverMode, LeverPushMode, LeverPushSettings, LeverSettings, Polarity, SettingsRecord, TouchMode,
        TouchSettings,
    };

    fn blob(fields: &[i32]) -> Vec<u8> {
        fields.iter().flat_map(|field| field.to_le_bytes()).collect()
    }

    #[test]
    fn test_decode_lever_record() {
        let bytes = blob(&[11, 10, 100, 4, 1, 0, 250, 1000, 1, 2]);
        let settings = LeverSettings::decode_exact(&bytes).unwrap();

        assert_eq!(settings.cc_number, 11);
        assert_eq!(settings.min_cc_value, 10);
        assert_eq!(settings.max_cc_value, 100);
        assert_eq!(settings.step_size, 4);
        assert_eq!(settings.mode, LeverMode::PeakAndDecay);
        assert_eq!(settings.polarity, Polarity::Unipolar);
        assert_eq!(settings.onset_time, Duration::from_millis(250));
        assert_eq!(settings.offset_time, Duration::from_millis(1000));
        assert_eq!(settings.onset_curve, Curve::Accelerating);
        assert_eq!(settings.offset_curve, Curve::Decelerating);
        assert_eq!(settings.rest_value(), 10);
    }

    #[test]
    fn test_encode_matches_wire_layout() {
        let mut out = [0u8; 40];
        assert_eq!(LeverSettings::SECONDARY.encode(&mut out), Some(40));
        assert_eq!(out.to_vec(), blob(&[128, 0, 127, 8, 2, 1, 100, 100, 0, 0]));

        let mut short = [0u8; 19];
        assert_eq!(TouchSettings::FACTORY.encode(&mut short), None);
    }

    #[test]
    fn test_push_and_touch_records() {
        let push = LeverPushSettings::decode_exact(&blob(&[24, 32, 127, 3, 100, 100, 0, 0])).unwrap();
        assert_eq!(push.mode, LeverPushMode::Reset);

        let touch = TouchSettings::decode_exact(&blob(&[1, 0, 127, 1, 52_000])).unwrap();
        assert_eq!(touch.mode, TouchMode::Toggle);
        assert_eq!(touch.threshold, 52_000);
    }

    #[test]
    fn test_wrong_length_is_rejected() {
        let mut bytes = blob(&[3, 0, 127, 1, 0, 1, 100, 100, 0, 0]);
        bytes.pop();
        assert_eq!(
            LeverSettings::decode_exact(&bytes),
            Err(ConfigError::InvalidLength {
                record: "LeverSettings",
                expected: 40,
                actual: 39,
            })
        );

        let long = blob(&[1, 0, 127, 0, 40_000, 0]);
        assert!(matches!(
            TouchSettings::decode_exact(&long),
            Err(ConfigError::InvalidLength { actual: 24, .. })
        ));
    }

    #[test]
    fn test_out_of_domain_fields_are_rejected() {
        let bad_mode = blob(&[3, 0, 127, 1, 7, 1, 100, 100, 0, 0]);
        assert_eq!(
            LeverSettings::decode_exact(&bad_mode),
            Err(ConfigError::InvalidValue {
                field: "functionMode",
                value: 7,
            })
        );

        let inverted = blob(&[3, 100, 20, 1, 0, 1, 100, 100, 0, 0]);
        assert!(LeverSettings::decode_exact(&inverted).is_err());

        let bad_curve = blob(&[24, 32, 127, 0, 100, 100, 0, 5]);
        assert_eq!(
            LeverPushSettings::decode_exact(&bad_curve),
            Err(ConfigError::InvalidValue {
                field: "offsetType",
                value: 5,
            })
        );

        let value_too_high = blob(&[1, 0, 200, 2, 40_000]);
        assert!(TouchSettings::decode_exact(&value_too_high).is_err());
    }

    #[test]
    fn test_high_cc_number_silences_control() {
        let lever = LeverSettings::decode_exact(&blob(&[200, 0, 127, 1, 0, 1, 100, 100, 0, 0])).unwrap();
        assert_eq!(lever.cc_number, 200);
    }

    #[test]
    fn test_factory_defaults() {
        assert_eq!(LeverSettings::default(), LeverSettings::PRIMARY);
        assert_eq!(LeverSettings::PRIMARY.cc_number, 3);
        assert_eq!(LeverSettings::PRIMARY.rest_value(), 64);
        assert_eq!(LeverPushSettings::SECONDARY.min_cc_value, 81);
        assert_eq!(TouchSettings::default().mode, TouchMode::Continuous);
    }
}
