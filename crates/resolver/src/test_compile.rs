#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use serde_json::{Value, json};
    use surface_config::{ActionBundle, Callback, Context, Map};

    use crate::{
        ActionHost, Command, ExecError, ExecOptions, ExprError, Resolver, compile_with_status,
        execute_command_bundle, flatten, parse_command_bundle,
    };

    fn ctx(me: Value) -> Context {
        Context::new(me.as_object().unwrap().clone())
    }

    fn vars(v: Value) -> Map {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn substitutes_context_fields() {
        let r = Resolver::new().unwrap();
        let c = ctx(json!({"message": "Hello"}));
        let (out, status) = compile_with_status(&r, "${me.message}, world!", &Map::new(), &c);
        assert_eq!(status, 0);
        assert_eq!(out, "Hello, world!");
    }

    #[test]
    fn plain_strings_are_untouched() {
        let r = Resolver::new().unwrap();
        // Broken declarations are never evaluated without a marker.
        let decls = vars(json!({"x": "this is not valid ((("}));
        let s = "SEL/MUTE ; $ {not a marker}";
        assert_eq!(r.compile(s, &decls, &Context::default()).unwrap(), s);
    }

    #[test]
    fn dependent_variables_resolve_in_order() {
        let r = Resolver::new().unwrap();
        let c = ctx(json!({"index": 2, "name": "pad"}));
        let decls = vars(json!({
            "a": "me.index + 1",
            "b": "a * 2",
            "label": "me.name + \"_\" + b"
        }));
        assert_eq!(r.compile("${b} ${label}", &decls, &c).unwrap(), "6 pad_6");

        let resolved = r.resolve_vars(&decls, &c).unwrap();
        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved.text("label").as_deref(), Some("pad_6"));
    }

    #[test]
    fn scalar_declarations_are_expressions() {
        let r = Resolver::new().unwrap();
        let decls = vars(json!({"n": 3, "on": true}));
        let out = r.compile("${n + 1} ${on}", &decls, &Context::default()).unwrap();
        assert_eq!(out, "4 true");
    }

    #[test]
    fn leading_dollar_is_ignored() {
        let r = Resolver::new().unwrap();
        let c = ctx(json!({"index": 5}));
        assert_eq!(r.compile("${$me.index}", &Map::new(), &c).unwrap(), "5");
    }

    #[test]
    fn escaped_markers_stay_literal() {
        let r = Resolver::new().unwrap();
        let c = ctx(json!({"index": 5}));
        let s = r"\${me.index} and $\{me.index} and ${me.index}";
        assert_eq!(
            r.compile(s, &Map::new(), &c).unwrap(),
            r"\${me.index} and $\{me.index} and 5"
        );
    }

    #[test]
    fn one_failure_returns_the_original() {
        let r = Resolver::new().unwrap();
        let c = ctx(json!({"index": 5}));
        let s = "${me.index} then ${me.missing}";
        let err = r.compile(s, &Map::new(), &c).unwrap_err();
        assert_eq!(err.original(), s);
        assert_eq!(err.status(), 2);

        let (out, status) = compile_with_status(&r, s, &Map::new(), &c);
        assert_eq!((out.as_str(), status), (s, 2));
    }

    #[test]
    fn failing_variable_aborts_compile() {
        let r = Resolver::new().unwrap();
        let decls = vars(json!({"ok": "1", "bad": "nope + 1"}));
        let err = r.compile("${ok}", &decls, &Context::default()).unwrap_err();
        assert!(matches!(err.error, ExprError::Variable { ref name, .. } if name == "bad"));
        assert!(r.resolve_vars(&decls, &Context::default()).is_err());

        let decls = vars(json!({"obj": {"a": 1}}));
        assert!(matches!(
            r.resolve_vars(&decls, &Context::default()),
            Err(ExprError::NotAnExpression { .. })
        ));
    }

    #[test]
    fn flattening_nested_bundles() {
        let cmds = parse_command_bundle(&json!([
            "A",
            ["B", [{"msg": "C"}]],
            {"pseq": ["D", "E"]}
        ]))
        .unwrap();
        assert_eq!(cmds.len(), 4);
        assert_eq!(cmds[0], Command::Literal("A".into()));
        assert_eq!(cmds[3], Command::Literal("D".into()));
        assert!(parse_command_bundle(&json!({"a": 1, "b": 2})).is_err());
    }

    #[test]
    fn sequencer_advances_per_flatten() {
        let b = ActionBundle::from_value(&json!({"pseq": ["one", "two"]})).unwrap();
        let picks: Vec<_> = (0..3).map(|_| flatten(&b)).collect();
        assert_eq!(picks[0], vec![Command::Literal("one".into())]);
        assert_eq!(picks[1], vec![Command::Literal("two".into())]);
        assert_eq!(picks[2], vec![Command::Literal("one".into())]);
    }

    /// Records every collaborator call as a string.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
        pages: Vec<&'static str>,
    }

    impl ActionHost for Recorder {
        fn trigger_action(&mut self, action: &str) {
            self.calls.push(format!("cxp {action}"));
        }
        fn log(&mut self, text: &str) {
            self.calls.push(format!("log {text}"));
        }
        fn show_message(&mut self, text: &str) {
            self.calls.push(format!("msg {text}"));
        }
        fn request_page(&mut self, page: &str) -> bool {
            self.calls.push(format!("page {page}"));
            self.pages.iter().any(|p| *p == page)
        }
        fn return_to_last_page(&mut self) {
            self.calls.push("page last".into());
        }
        fn refresh(&mut self) {
            self.calls.push("refresh".into());
        }
        fn add_mode(&mut self, mode: &str) -> Result<(), String> {
            self.calls.push(format!("mode_on {mode}"));
            Ok(())
        }
        fn remove_mode(&mut self, mode: &str) -> Result<(), String> {
            self.calls.push(format!("mode_off {mode}"));
            Ok(())
        }
        fn toggle_mode(&mut self, mode: &str) -> Result<(), String> {
            if mode == "shift" {
                self.calls.push(format!("mode {mode}"));
                Ok(())
            } else {
                Err(format!("unknown mode {mode}"))
            }
        }
    }

    #[test]
    fn executes_every_directive() {
        let r = Resolver::new().unwrap();
        let mut host = Recorder {
            pages: vec!["drums"],
            ..Default::default()
        };
        let c = ctx(json!({"index": 1}));
        let bundle = ActionBundle::from_value(&json!([
            "SEL/MUTE ${me.index}",
            {"cxp": "METRO"},
            {"log": "pad ${me.index}"},
            {"msg": "hi"},
            {"page": "drums"},
            {"page": "last"},
            {"mode": "shift"},
            {"mode_on": "select"},
            {"mode_off": "select"},
            {"refresh": true}
        ]))
        .unwrap();
        let report =
            execute_command_bundle(&r, &mut host, &bundle, &Map::new(), &c, ExecOptions::default())
                .unwrap();
        assert!(report.is_clean());
        assert_eq!(report.executed, 10);
        assert_eq!(
            host.calls,
            [
                "cxp SEL/MUTE 1",
                "cxp METRO",
                "log pad 1",
                "msg hi",
                "page drums",
                "page last",
                "mode shift",
                "mode_on select",
                "mode_off select",
                "refresh",
            ]
        );
    }

    #[test]
    fn abort_policy_stops_at_first_failure() {
        let r = Resolver::new().unwrap();
        let bundle = ActionBundle::from_value(&json!([
            "first",
            {"overlay": "x"},
            "${me.missing}",
            {"page": "nowhere"},
            "last"
        ]))
        .unwrap();

        let mut host = Recorder::default();
        let err = execute_command_bundle(
            &r,
            &mut host,
            &bundle,
            &Map::new(),
            &Context::default(),
            ExecOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ExecError::UnknownDirective {
                tag: "overlay".into()
            }
        );
        assert_eq!(host.calls, ["cxp first"]);

        let mut host = Recorder::default();
        let report = execute_command_bundle(
            &r,
            &mut host,
            &bundle,
            &Map::new(),
            &Context::default(),
            ExecOptions {
                abort_on_failure: false,
            },
        )
        .unwrap();
        assert_eq!(report.executed, 2);
        assert_eq!(report.failures.len(), 3);
        assert!(matches!(report.failures[1], ExecError::Compile(_)));
        assert!(matches!(report.failures[2], ExecError::PageChange { .. }));
        assert_eq!(host.calls, ["cxp first", "page nowhere", "cxp last"]);
    }

    #[test]
    fn host_refusals_and_callbacks() {
        let r = Resolver::new().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let bundle = ActionBundle::Sequence(vec![
            ActionBundle::Callback(Callback::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            })),
            ActionBundle::from_value(&json!({"mode": "user"})).unwrap(),
        ]);
        let mut host = Recorder::default();
        let err = execute_command_bundle(
            &r,
            &mut host,
            &bundle,
            &Map::new(),
            &Context::default(),
            ExecOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ExecError::Host { ref tag, .. } if tag == "mode"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // Default host hooks refuse control-scoped directives.
        let bundle = ActionBundle::from_value(&json!({"do_toggle": true})).unwrap();
        let err = execute_command_bundle(
            &r,
            &mut host,
            &bundle,
            &Map::new(),
            &Context::default(),
            ExecOptions::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("param"));
    }
}
