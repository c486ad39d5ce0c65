#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use resolver::{ActionHost, ExecOptions, Resolver};
    use serde_json::{Value, json};
    use surface_config::{Context, ControlSettings, Map, ModeSnapshot};

    use crate::{
        Animation, AnimationHandle, AnimationSlot, Animator, Dispatch, Dispatcher, Gesture,
        GestureTable, Invocation,
    };

    /// Shared log of everything the fakes saw.
    type Log = Rc<RefCell<Vec<String>>>;

    struct Host(Log);

    impl ActionHost for Host {
        fn trigger_action(&mut self, action: &str) {
            self.0.borrow_mut().push(action.to_string());
        }
        fn show_message(&mut self, text: &str) {
            self.0.borrow_mut().push(format!("msg {text}"));
        }
        fn request_page(&mut self, _page: &str) -> bool {
            false
        }
        fn return_to_last_page(&mut self) {}
        fn refresh(&mut self) {}
        fn add_mode(&mut self, _mode: &str) -> Result<(), String> {
            Ok(())
        }
        fn remove_mode(&mut self, _mode: &str) -> Result<(), String> {
            Ok(())
        }
        fn toggle_mode(&mut self, _mode: &str) -> Result<(), String> {
            Ok(())
        }
    }

    struct Handle(Log, Animation);

    impl AnimationHandle for Handle {
        fn cancel(&mut self) {
            self.0.borrow_mut().push(format!("cancel {:?}", self.1));
        }
    }

    struct Lights(Log);

    impl Animator for Lights {
        fn start(&mut self, control: &str, kind: Animation) -> Box<dyn AnimationHandle> {
            self.0.borrow_mut().push(format!("{control} {kind:?}"));
            Box::new(Handle(self.0.clone(), kind))
        }
        fn set_attention(&mut self, control: &str, on: bool) {
            self.0.borrow_mut().push(format!("{control} attention {on}"));
        }
    }

    fn modes(active: &[&str]) -> ModeSnapshot {
        ModeSnapshot::with_active(["shift", "select"], active)
    }

    fn dispatcher(settings: Value) -> Dispatcher {
        let settings: ControlSettings = serde_json::from_value(settings).unwrap();
        let table = GestureTable::from_config(&settings.gestures, &modes(&[])).unwrap();
        Dispatcher::with_defaults("pad", table, &settings)
    }

    struct Rig {
        resolver: Resolver,
        log: Log,
        context: Context,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                resolver: Resolver::new().unwrap(),
                log: Log::default(),
                context: Context::new(json!({"index": 4}).as_object().unwrap().clone()),
            }
        }

        fn send(
            &self,
            d: &mut Dispatcher,
            g: Gesture,
            v: u8,
            active: &[&str],
        ) -> Result<Dispatch, resolver::ExecError> {
            let mut host = Host(self.log.clone());
            let mut lights = Lights(self.log.clone());
            let vars = Map::new();
            d.handle(
                g,
                v,
                &modes(active),
                Invocation {
                    resolver: &self.resolver,
                    host: &mut host,
                    vars: &vars,
                    context: &self.context,
                    options: ExecOptions::default(),
                },
                &mut lights,
            )
        }

        fn take(&self) -> Vec<String> {
            self.log.borrow_mut().drain(..).collect()
        }
    }

    #[test]
    fn press_and_release_run_bundles() {
        let rig = Rig::new();
        let mut d = dispatcher(json!({
            "gestures": {"pressed": "PAD ${me.index}", "released": {"msg": "up"}}
        }));
        assert_eq!(
            rig.send(&mut d, Gesture::Pressed, 100, &[]).unwrap(),
            Dispatch::Fired { fired: 1 }
        );
        assert!(d.is_pressed());
        assert_eq!(d.velocity(), 100);
        assert_eq!(rig.take(), ["PAD 4", "pad Success"]);

        rig.send(&mut d, Gesture::Released, 0, &[]).unwrap();
        assert!(!d.is_pressed());
        // The earlier success animation is cancelled by the new one.
        assert_eq!(rig.take(), ["msg up", "cancel Success", "pad Success"]);
    }

    #[test]
    fn animation_slot_cancels_once_before_starting() {
        let log = Log::default();
        let mut lights = Lights(log.clone());
        let mut slot = AnimationSlot::default();
        slot.replace(|| lights.start("pad", Animation::Success));
        slot.replace(|| lights.start("pad", Animation::Failure));
        assert!(slot.is_running());
        assert_eq!(
            log.borrow().as_slice(),
            ["pad Success", "cancel Success", "pad Failure"]
        );

        slot.cancel();
        slot.cancel();
        assert!(!slot.is_running());
        assert_eq!(log.borrow().last().map(String::as_str), Some("cancel Failure"));
        assert_eq!(log.borrow().len(), 4);
    }

    #[test]
    fn threshold_gates_presses_and_their_releases() {
        let rig = Rig::new();
        let mut d = dispatcher(json!({
            "on_threshold": 50,
            "gestures": {"pressed": "down", "released": "up", "double_clicked": "dbl"}
        }));
        assert_eq!(
            rig.send(&mut d, Gesture::Pressed, 49, &[]).unwrap(),
            Dispatch::Ignored
        );
        assert_eq!(
            rig.send(&mut d, Gesture::Released, 0, &[]).unwrap(),
            Dispatch::Ignored
        );
        assert_eq!(
            rig.send(&mut d, Gesture::DoubleClicked, 10, &[]).unwrap(),
            Dispatch::Ignored
        );
        assert!(rig.take().is_empty());

        rig.send(&mut d, Gesture::Pressed, 50, &[]).unwrap();
        d.force_release();
        assert!(!d.is_pressed());
        assert_eq!(
            rig.send(&mut d, Gesture::Released, 0, &[]).unwrap(),
            Dispatch::Ignored
        );
    }

    #[test]
    fn unmatched_gestures_do_nothing() {
        let rig = Rig::new();
        let mut d = dispatcher(json!({"gestures": {"pressed__shift": "x"}}));
        assert_eq!(
            rig.send(&mut d, Gesture::Pressed, 127, &[]).unwrap(),
            Dispatch::Unmatched
        );
        assert_eq!(
            rig.send(&mut d, Gesture::Pressed, 127, &["shift"]).unwrap(),
            Dispatch::Fired { fired: 1 }
        );
    }

    #[test]
    fn fake_momentary_collapses_to_pressed() {
        let rig = Rig::new();
        let mut d = dispatcher(json!({
            "fake_momentary": true,
            "gestures": {"pressed": "toggle", "released": "never", "double_clicked": "never"}
        }));
        rig.send(&mut d, Gesture::Pressed, 127, &[]).unwrap();
        rig.send(&mut d, Gesture::Released, 0, &[]).unwrap();
        assert_eq!(
            rig.send(&mut d, Gesture::DoubleClicked, 127, &[]).unwrap(),
            Dispatch::Ignored
        );
        let fired: Vec<_> = rig.take().into_iter().filter(|s| !s.starts_with("pad") && !s.starts_with("cancel")).collect();
        assert_eq!(fired, ["toggle", "toggle"]);
    }

    #[test]
    fn cascade_runs_every_match() {
        let rig = Rig::new();
        let mut d = dispatcher(json!({
            "cascade": "up",
            "suppress_animations": true,
            "gestures": {"pressed": "base", "pressed__shift": "shifted", "pressed__select": "selected"}
        }));
        assert_eq!(
            rig.send(&mut d, Gesture::Pressed, 127, &["shift", "select"]).unwrap(),
            Dispatch::Fired { fired: 3 }
        );
        assert_eq!(rig.take(), ["selected", "shifted", "base"]);
    }

    #[test]
    fn failures_animate_and_stop() {
        let rig = Rig::new();
        let mut d = dispatcher(json!({
            "cascade": true,
            "gestures": {"pressed": "${me.missing}", "pressed__shift": "later"}
        }));
        assert!(rig.send(&mut d, Gesture::Pressed, 127, &["shift"]).is_err());
        assert_eq!(rig.take(), ["pad Failure"]);
    }

    #[test]
    fn attention_follows_concerned_modes() {
        let log = Log::default();
        let mut lights = Lights(log.clone());
        let mut d = dispatcher(json!({"gestures": {"pressed": "a", "pressed__shift": "b"}}));

        assert!(!d.modes_changed(&modes(&["select"]), &mut lights));
        assert_eq!(d.mode_string(), "");
        assert!(d.modes_changed(&modes(&["select", "shift"]), &mut lights));
        assert_eq!(d.mode_string(), "shift");
        assert!(d.modes_changed(&modes(&[]), &mut lights));
        assert_eq!(*log.borrow(), ["pad attention true", "pad attention false"]);
    }

    #[test]
    fn dry_run_is_repeatable() {
        let d = dispatcher(json!({"gestures": {"pressed": "a", "pressed__shift": "b"}}));
        let snap = modes(&["shift"]);
        let first: Vec<_> = d.dry_run(Gesture::Pressed, &snap).iter().map(|e| e.key.clone()).collect();
        let second: Vec<_> = d.dry_run(Gesture::Pressed, &snap).iter().map(|e| e.key.clone()).collect();
        assert_eq!(first, ["pressed__shift"]);
        assert_eq!(first, second);
    }
}
