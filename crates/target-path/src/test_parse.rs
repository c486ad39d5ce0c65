#[cfg(test)]
mod tests {
    use crate::{CrossfadeAssign, MonitorState, ParameterType, TargetDescriptor, parse};

    /// Descriptor with only `input` set, to be filled with expected fields.
    fn expect(input: &str) -> TargetDescriptor {
        TargetDescriptor::new(input)
    }

    #[test]
    fn special_keywords() {
        assert!(parse("NONE").is_empty());
        assert!(parse("none").is_empty());
        assert_eq!(parse("selp").parameter_type, Some(ParameterType::Selp));
        assert_eq!(parse("XFADER").parameter_type, Some(ParameterType::Xfader));
    }

    #[test]
    fn selected_track_volume() {
        let mut want = expect("SEL / VOL");
        want.track = Some("SEL".into());
        want.parameter_type = Some(ParameterType::Vol);
        assert_eq!(parse("SEL / VOL"), want);
    }

    #[test]
    fn ring_track() {
        let mut want = expect("RING(2) / VOL");
        want.ring_track = Some(2);
        want.parameter_type = Some(ParameterType::Vol);
        assert_eq!(parse("RING(2) / VOL"), want);

        assert_eq!(parse("ring(0)").ring_track, Some(0));
        assert!(parse("ring(x) / VOL").error.is_some());
    }

    #[test]
    fn quoted_track_names() {
        let d = parse("\"my cool track\" / PAN");
        assert_eq!(d.track.as_deref(), Some("my cool track"));
        assert_eq!(d.parameter_type, Some(ParameterType::Pan));

        let d = parse("\"a/b\" / VOL");
        assert_eq!(d.track.as_deref(), Some("a/b"));
        assert_eq!(d.parameter_type, Some(ParameterType::Vol));

        let d = parse("\"drums\"");
        assert_eq!(d.track.as_deref(), Some("drums"));
    }

    #[test]
    fn send_track_letters() {
        // A lone letter is a track name.
        let d = parse("A");
        assert_eq!(d.track.as_deref(), Some("A"));
        assert_eq!(d.send_track, None);

        // Before a slash it names a return track.
        let d = parse("A / VOL");
        assert_eq!(d.send_track.as_deref(), Some("A"));
        assert_eq!(d.track, None);
        assert_eq!(d.parameter_type, Some(ParameterType::Vol));

        let d = parse("b / VOL");
        assert_eq!(d.send_track.as_deref(), Some("b"));
        assert_eq!(d.parameter_type, Some(ParameterType::Vol));

        // Quoting keeps a one-letter track name.
        let d = parse("\"A\" / VOL");
        assert_eq!(d.track.as_deref(), Some("A"));
        assert_eq!(d.send_track, None);
    }

    #[test]
    fn mixer_keywords() {
        for (s, ty) in [
            ("1 / PANL", ParameterType::PanL),
            ("1 / panr", ParameterType::PanR),
            ("1 / CUE", ParameterType::Cue),
            ("MST / XFADER", ParameterType::Xfader),
        ] {
            let d = parse(s);
            assert_eq!(d.parameter_type, Some(ty), "{s}");
            assert_eq!(d.error, None, "{s}");
        }
        let d = parse("1 / SEND F");
        assert_eq!(d.parameter_type, Some(ParameterType::Send));
        assert_eq!(d.send.as_deref(), Some("F"));
    }

    #[test]
    fn track_attributes() {
        let d = parse("SEL / ARM");
        assert!(d.arm);
        assert_eq!(d.parameter_type, Some(ParameterType::Arm));

        let d = parse("SEL / SEL");
        assert!(d.track_select);
        assert_eq!(d.parameter_type, Some(ParameterType::Sel));

        assert!(parse("SEL / mute").mute);
        assert!(parse("SEL / SOLO").solo);
        assert!(parse("SEL / PLAY").play);
        assert!(parse("SEL / STOP").stop);

        let d = parse("SEL / MON IN");
        assert_eq!(d.monitor, Some(MonitorState::In));
        assert_eq!(d.parameter_type, Some(ParameterType::Mon));

        assert_eq!(parse("SEL / XFADE A").x_fade_assign, Some(CrossfadeAssign::A));
        assert_eq!(
            parse("SEL / xfade off").x_fade_assign,
            Some(CrossfadeAssign::Off)
        );
        assert!(parse("SEL / XFADE C").error.is_some());
        assert!(parse("SEL / MON").error.is_some());
    }

    #[test]
    fn device_selectors() {
        let d = parse("1 / DEV(SEL) CS");
        assert_eq!(d.track.as_deref(), Some("1"));
        assert_eq!(d.device.as_deref(), Some("SEL"));
        assert_eq!(d.parameter_type, Some(ParameterType::Cs));

        let d = parse("\"my cool track\" / DEV(1) P40");
        assert_eq!(d.device.as_deref(), Some("1"));
        assert_eq!(d.parameter_number, Some(40));

        let d = parse("\"my cool track\" / DEV(\"my device\") \"my param\"");
        assert_eq!(d.device.as_deref(), Some("my device"));
        assert_eq!(d.parameter_name.as_deref(), Some("my param"));

        let d = parse("SEL / DEV(SEL) B1 P2");
        assert_eq!(d.bank, Some(1));
        assert_eq!(d.parameter_number, Some(2));

        let d = parse("SEL / DEV(1)");
        assert_eq!(d.device.as_deref(), Some("1"));
        assert_eq!(d.parameter_type, None);
        assert_eq!(d.error, None);

        let d = parse("SEL / DEV(1) SEL");
        assert_eq!(d.parameter_type, Some(ParameterType::Sel));
        assert!(!d.track_select);
    }

    #[test]
    fn device_without_track() {
        let d = parse("DEV(2) P3");
        assert_eq!(d.track, None);
        assert_eq!(d.device.as_deref(), Some("2"));
        assert_eq!(d.parameter_number, Some(3));
    }

    #[test]
    fn chain_paths() {
        let d = parse("SEL / DEV(1.\"my chain\") PAN");
        let mut want = expect("SEL / DEV(1.\"my chain\") PAN");
        want.track = Some("SEL".into());
        want.chain_map = Some(vec!["1".into(), "my chain".into()]);
        want.parameter_type = Some(ParameterType::Pan);
        assert_eq!(d, want);

        let d = parse("SEL / DEV(1.1) SEND A");
        assert_eq!(d.chain_map, Some(vec!["1".into(), "1".into()]));
        assert_eq!(d.parameter_type, Some(ParameterType::Send));
        assert_eq!(d.send.as_deref(), Some("A"));

        // Dots inside quotes do not split.
        let d = parse("SEL / DEV(\"v1.2\") P1");
        assert_eq!(d.device.as_deref(), Some("v1.2"));
        assert_eq!(d.chain_map, None);
    }

    #[test]
    fn sel_position_in_chain_path() {
        assert_eq!(parse("SEL / DEV(SEL.SEL) VOL").error, None);
        let d = parse("SEL / DEV(1.1.SEL) VOL");
        assert!(d.error.as_deref().unwrap().contains("position 1 or 2"));
        assert_eq!(d.chain_map, None);
    }

    #[test]
    fn chain_narrowing() {
        let d = parse("SEL / DEV(1) CH(drums) SEND B");
        assert_eq!(d.chain.as_deref(), Some("drums"));
        assert_eq!(d.parameter_type, Some(ParameterType::ChainSend));
        assert_eq!(d.send.as_deref(), Some("B"));

        let d = parse("SEL / DEV(1) CH(\"kick\") vol");
        assert_eq!(d.chain.as_deref(), Some("kick"));
        assert_eq!(d.parameter_type, Some(ParameterType::Vol));

        assert!(parse("SEL / DEV(1) CH(kick)").error.is_some());
    }

    #[test]
    fn grammar_violations() {
        for s in [
            "SEL / FOO",
            "SEL /",
            "/ VOL",
            "SEL / DEV(1",
            "SEL / DEV() VOL",
            "SEL / DEV(1) Q9",
            "SEL / DEV(1) B1 X2",
            "SEL / DEV(1) P0",
            "SEL / SEND",
            "SEL / SEND AB",
            "SEL / DEV(1..2) VOL",
        ] {
            assert!(parse(s).error.is_some(), "{s} should be rejected");
        }
    }
}
