#[cfg(test)]
mod tests {
    use crossbeam_channel::{Receiver, Sender, unbounded};
    use surface_config::ModeSnapshot;
    use target_path::{CrossfadeAssign, MonitorState, parse};

    use crate::{
        BindError, BindOptions, Binding, BindingTable, DeviceParent, Error, Feed, FeedEvent,
        FeedbackState, LiveSet, MixerSlot, Notifier, Target, Topic, TrackAttribute, TrackFlag,
        mock::MockSet,
    };

    struct Rig {
        set: MockSet,
        tx: Sender<FeedEvent>,
        rx: Receiver<FeedEvent>,
    }

    impl Rig {
        fn new() -> Self {
            let (tx, rx) = unbounded();
            Self {
                set: MockSet::new(),
                tx,
                rx,
            }
        }

        fn binding(&self, slots: &[(&str, &str)], options: BindOptions) -> Binding {
            let table = BindingTable::new(
                slots
                    .iter()
                    .map(|(k, p)| ((*k).to_string(), parse(p))),
            );
            Binding::new(table, options, Notifier::new("pad", self.tx.clone()))
        }

        /// Bind `path` as the only slot.
        fn bound(&self, path: &str) -> Binding {
            let mut b = self.binding(&[("default", path)], BindOptions::default());
            b.modes_changed(&ModeSnapshot::default(), &self.set);
            b
        }

        /// Deliver queued notifications; returns the last feedback.
        fn pump(&self, b: &mut Binding) -> Option<FeedbackState> {
            let mut last = None;
            while let Ok(ev) = self.rx.try_recv() {
                assert_eq!(ev.owner, "pad");
                last = Some(b.notify(ev.topic, &self.set));
            }
            last
        }
    }

    #[test]
    fn follows_the_selected_track() {
        let rig = Rig::new();
        let t = rig.set.add_track("Drums");
        let mut b = rig.bound("SEL / VOL");
        assert!(b.is_disabled());
        assert_eq!(b.update_feedback(&rig.set), FeedbackState::Disabled);
        assert_eq!(b.topics(), [Topic::set(Feed::SelectedTrack)]);

        rig.set.select_track(t);
        assert_eq!(rig.pump(&mut b), Some(FeedbackState::Off));
        let vol = rig.set.mixer_parameter(t, MixerSlot::Volume).unwrap();
        assert_eq!(b.target().and_then(|t| t.parameter()), Some(vol));
        assert_eq!(
            b.topics(),
            [Topic::set(Feed::SelectedTrack), Topic::value(vol)]
        );

        rig.set.set_parameter_value(vol, 1.0);
        assert_eq!(rig.pump(&mut b), Some(FeedbackState::On));
        rig.set.set_parameter_value(vol, 0.5);
        assert_eq!(rig.pump(&mut b), Some(FeedbackState::On));
        rig.set.set_parameter_value(vol, 0.0);
        assert_eq!(rig.pump(&mut b), Some(FeedbackState::Off));
    }

    #[test]
    fn failure_unbinds_and_disables() {
        let rig = Rig::new();
        let t = rig.set.add_track("Drums");
        let mut b = rig.bound("Drums / MUTE");
        assert_eq!(
            b.target(),
            Some(Target::Track {
                track: t,
                attribute: TrackAttribute::Mute
            })
        );
        rig.set.set_flag(t, TrackFlag::Mute, true);
        assert_eq!(rig.pump(&mut b), Some(FeedbackState::On));

        rig.set.remove_track(t);
        assert_eq!(rig.pump(&mut b), Some(FeedbackState::Disabled));
        assert_eq!(b.target(), None);
        assert_eq!(b.topics(), [Topic::set(Feed::TrackList)]);
    }

    #[test]
    fn keeping_the_target_on_failure() {
        let rig = Rig::new();
        let t = rig.set.add_track("Drums");
        let options = BindOptions {
            unbind_on_fail: false,
            ..Default::default()
        };
        let mut b = rig.binding(&[("default", "Drums / SOLO")], options);
        b.modes_changed(&ModeSnapshot::default(), &rig.set);
        rig.set.set_flag(t, TrackFlag::Solo, true);
        rig.pump(&mut b);

        rig.set.remove_track(t);
        assert_eq!(rig.pump(&mut b), Some(FeedbackState::On));
        assert!(!b.is_disabled());
        assert!(b.target().is_some());
    }

    #[test]
    fn missing_numbered_device_waits_for_the_device_list() {
        let rig = Rig::new();
        let t = rig.set.add_track("Drums");
        rig.set.add_device(DeviceParent::Track(t), "EQ", &["Gain"]);
        let mut b = rig.bound("Drums / DEV(2) P1");
        assert!(b.is_deferred());
        assert!(b.is_disabled());
        assert!(b.topics().contains(&Topic::track(Feed::DeviceList, t)));

        rig.set.add_device(DeviceParent::Track(t), "Comp", &["Threshold"]);
        assert_eq!(rig.pump(&mut b), Some(FeedbackState::Off));
        assert!(!b.is_deferred());
        let p = b.target().and_then(|t| t.parameter()).unwrap();
        assert_eq!(rig.set.parameter(p).unwrap().name, "Threshold");
    }

    #[test]
    fn mode_slots_pick_the_best_match() {
        let rig = Rig::new();
        let t = rig.set.add_track("Drums");
        rig.set.select_track(t);
        let mut b = rig.binding(
            &[("default", "SEL / VOL"), ("shift", "1 / PAN")],
            BindOptions::default(),
        );
        let modes = |on: &[&str]| ModeSnapshot::with_active(["shift", "select"], on);

        assert!(b.modes_changed(&modes(&[]), &rig.set).is_some());
        assert_eq!(b.mode_key(), Some("default"));
        assert!(b.modes_changed(&modes(&["shift"]), &rig.set).is_some());
        assert_eq!(b.mode_key(), Some("shift"));
        let pan = rig.set.mixer_parameter(t, MixerSlot::Pan).unwrap();
        assert_eq!(b.target().and_then(|t| t.parameter()), Some(pan));
        assert_eq!(
            b.topics(),
            [Topic::set(Feed::TrackList), Topic::value(pan)]
        );
        // Unrelated mode changes leave the binding alone.
        assert!(b.modes_changed(&modes(&["shift", "select"]), &rig.set).is_none());
    }

    #[test]
    fn rebinding_replaces_every_subscription() {
        let rig = Rig::new();
        let t = rig.set.add_track("Drums");
        rig.set.select_track(t);
        let mut b = rig.bound("SEL / VOL");
        let before = b.topics();
        assert_eq!(rig.set.subscriber_count(), 2);
        b.bind_to_active(&rig.set);
        b.bind_to_active(&rig.set);
        assert_eq!(b.topics(), before);
        assert_eq!(rig.set.topics_of("pad"), before);
        drop(b);
        assert_eq!(rig.set.subscriber_count(), 0);
    }

    #[test]
    fn toggling_parameters_and_switches() {
        let rig = Rig::new();
        let t = rig.set.add_track("Drums");

        let b = rig.bound("1 / VOL");
        let vol = rig.set.mixer_parameter(t, MixerSlot::Volume).unwrap();
        b.toggle(&rig.set).unwrap();
        assert_eq!(rig.set.parameter(vol).unwrap().value, 1.0);
        b.toggle(&rig.set).unwrap();
        assert_eq!(rig.set.parameter(vol).unwrap().value, 0.0);
        rig.set.set_parameter_value(vol, 0.4);
        b.toggle(&rig.set).unwrap();
        assert_eq!(rig.set.parameter(vol).unwrap().value, 0.0);

        let mut b = rig.bound("1 / MUTE");
        b.toggle(&rig.set).unwrap();
        assert_eq!(rig.set.flag(t, TrackFlag::Mute), Some(true));
        assert_eq!(rig.pump(&mut b), Some(FeedbackState::On));

        let mut b = rig.bound("1 / SEL");
        assert_eq!(b.update_feedback(&rig.set), FeedbackState::Off);
        b.toggle(&rig.set).unwrap();
        assert_eq!(rig.set.selected_track(), Some(t));
        assert_eq!(rig.pump(&mut b), Some(FeedbackState::On));
    }

    #[test]
    fn toggling_positions() {
        let rig = Rig::new();
        let t = rig.set.add_track("Drums");

        let b = rig.bound("1 / MON IN");
        assert_eq!(b.update_feedback(&rig.set), FeedbackState::Off);
        b.toggle(&rig.set).unwrap();
        assert_eq!(rig.set.monitoring(t), Some(MonitorState::In));
        assert_eq!(b.update_feedback(&rig.set), FeedbackState::On);
        b.toggle(&rig.set).unwrap();
        assert_eq!(rig.set.monitoring(t), Some(MonitorState::Off));

        let b = rig.bound("1 / MON OFF");
        assert_eq!(b.update_feedback(&rig.set), FeedbackState::On);
        b.toggle(&rig.set).unwrap();
        assert_eq!(rig.set.monitoring(t), Some(MonitorState::Auto));

        let b = rig.bound("1 / XFADE A");
        b.toggle(&rig.set).unwrap();
        assert_eq!(rig.set.crossfade_assign(t), Some(CrossfadeAssign::A));
        assert_eq!(b.update_feedback(&rig.set), FeedbackState::On);
        b.toggle(&rig.set).unwrap();
        assert_eq!(rig.set.crossfade_assign(t), Some(CrossfadeAssign::Off));
    }

    #[test]
    fn device_selection() {
        let rig = Rig::new();
        let t = rig.set.add_track("Drums");
        rig.set.add_device(DeviceParent::Track(t), "EQ", &[]);
        let d = rig.set.add_device(DeviceParent::Track(t), "Comp", &[]);
        let mut b = rig.bound("1 / DEV(2) SEL");
        assert_eq!(b.target(), Some(Target::DeviceSelect { track: t, device: d }));
        assert!(
            b.topics()
                .contains(&Topic::track(Feed::MappedDeviceSelected, t))
        );
        assert_eq!(b.update_feedback(&rig.set), FeedbackState::Off);
        b.toggle(&rig.set).unwrap();
        assert_eq!(rig.pump(&mut b), Some(FeedbackState::On));
    }

    #[test]
    fn group_tracks_refuse_arm_and_monitor() {
        let rig = Rig::new();
        rig.set.add_group_track("Group");
        let b = rig.bound("Group / ARM");
        assert!(b.is_disabled());
        assert_eq!(b.toggle(&rig.set), Err(BindError::NoTarget));
        assert!(rig.bound("Group / MON IN").is_disabled());
        assert!(!rig.bound("Group / MUTE").is_disabled());
    }

    #[test]
    fn racks_and_chains() {
        let rig = Rig::new();
        let t = rig.set.add_track("Keys");
        let rack = rig.set.add_device(DeviceParent::Track(t), "Rack", &[]);
        let chain = rig.set.add_chain(rack, "my chain");
        rig.set
            .add_device(DeviceParent::Chain(chain), "Reverb", &["Decay"]);
        rig.set.select_track(t);

        let param = |b: &Binding| b.target().and_then(|t| t.parameter()).unwrap();
        let name = |b: &Binding| rig.set.parameter(param(b)).unwrap().name;

        let b = rig.bound(r#"SEL / DEV(1."my chain") PAN"#);
        assert_eq!(
            Some(param(&b)),
            rig.set.chain_mixer_parameter(chain, MixerSlot::Pan)
        );
        let b = rig.bound(r#"SEL / DEV(1) CH("my chain") VOL"#);
        assert_eq!(
            Some(param(&b)),
            rig.set.chain_mixer_parameter(chain, MixerSlot::Volume)
        );
        assert_eq!(name(&rig.bound(r#"SEL / DEV("Reverb") "Decay""#)), "Decay");
        assert_eq!(name(&rig.bound("SEL / DEV(1.1.1) P1")), "Decay");
        assert_eq!(name(&rig.bound("SEL / DEV(1) CS")), "Chain Selector");
        assert_eq!(name(&rig.bound("SEL / DEV(1)")), "Device On");

        assert!(rig.bound("SEL / DEV(SEL.SEL.1) P1").is_disabled());
        rig.set.select_device(rack);
        assert_eq!(name(&rig.bound("SEL / DEV(SEL.SEL.1) P1")), "Decay");
    }

    #[test]
    fn banked_parameters() {
        let rig = Rig::new();
        let t = rig.set.add_track("Synth");
        let d = rig.set.add_device(
            DeviceParent::Track(t),
            "Operator",
            &["Filter Freq", "Filter Res", "Osc-A Level"],
        );
        rig.set
            .set_banks(d, &[&["Osc-A Level", "", "Filter Freq"], &["Filter Res"]]);
        let name = |path: &str| {
            let b = rig.bound(path);
            b.target()
                .and_then(|t| t.parameter())
                .and_then(|p| rig.set.parameter(p))
                .map(|p| p.name)
        };
        assert_eq!(name("1 / DEV(1) B1 P2").as_deref(), Some("Filter Freq"));
        assert_eq!(name("1 / DEV(1) B2 P1").as_deref(), Some("Filter Res"));
        assert_eq!(name("1 / DEV(1) B3 P1"), None);
    }

    #[test]
    fn sends_and_return_tracks() {
        let rig = Rig::new();
        let t = rig.set.add_track("Drums");
        let a = rig.set.add_return_track("A-Reverb");

        let mut b = rig.bound("1 / SEND B");
        assert!(b.is_disabled());
        assert!(b.topics().contains(&Topic::set(Feed::ReturnTracks)));
        rig.set.add_return_track("B-Delay");
        rig.pump(&mut b);
        assert_eq!(
            b.target().and_then(|t| t.parameter()),
            rig.set.mixer_parameter(t, MixerSlot::Send(1))
        );

        let b = rig.bound("A / VOL");
        assert_eq!(b.target().and_then(|t| t.track()), Some(a));
    }

    #[test]
    fn ring_and_selected_parameter() {
        let rig = Rig::new();
        rig.set.add_track("1");
        let t2 = rig.set.add_track("2");
        let t3 = rig.set.add_track("3");

        let mut b = rig.bound("RING(1) / VOL");
        assert_eq!(b.target().and_then(|t| t.track()), Some(t2));
        rig.set.set_ring_offset(1);
        rig.pump(&mut b);
        assert_eq!(b.target().and_then(|t| t.track()), Some(t3));

        let mut b = rig.bound("SELP");
        assert!(b.is_disabled());
        let p = rig.set.mixer_parameter(t3, MixerSlot::Cue).unwrap();
        rig.set.select_parameter(Some(p));
        rig.pump(&mut b);
        assert_eq!(b.target().and_then(|t| t.parameter()), Some(p));
        assert_eq!(
            b.topics(),
            [Topic::set(Feed::SelectedParameter), Topic::value(p)]
        );

        let b = rig.bound("XFADER");
        let master = rig.set.master_track().unwrap();
        assert_eq!(
            b.target().and_then(|t| t.parameter()),
            rig.set.mixer_parameter(master, MixerSlot::Crossfader)
        );
    }

    #[test]
    fn overrides_and_ad_hoc_targets() {
        let rig = Rig::new();
        let t = rig.set.add_track("Drums");
        let mut b = rig.binding(
            &[("default", "1 / VOL"), ("shift", "1 / PAN")],
            BindOptions::default(),
        );
        b.modes_changed(&ModeSnapshot::default(), &rig.set);

        b.override_binding(parse("1 / CUE"), "default", &rig.set)
            .unwrap();
        assert_eq!(
            b.target().and_then(|t| t.parameter()),
            rig.set.mixer_parameter(t, MixerSlot::Cue)
        );
        assert_eq!(
            b.override_binding(parse("1 / CUE"), "user", &rig.set),
            Err(Error::UnknownSlot {
                mode: "user".into()
            })
        );

        assert_eq!(
            b.bind_ad_hoc(parse("1 / MUTE"), &rig.set),
            FeedbackState::Off
        );
        assert_eq!(
            b.target(),
            Some(Target::Track {
                track: t,
                attribute: TrackAttribute::Mute
            })
        );
    }
}
