#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use crate::{
        Map, Policy, Section, TemplateCompiler, TemplateLibrary,
        definition::ControlDefinition,
    };

    fn obj(v: Value) -> Map {
        match v {
            Value::Object(m) => m,
            other => panic!("expected object, got {other}"),
        }
    }

    fn library() -> TemplateLibrary {
        TemplateLibrary::new(
            obj(json!({
                "on_threshold": 20,
                "color": 127,
                "props": {"global_template": true}
            })),
            obj(json!({
                "test_1": {
                    "color": 2,
                    "gestures": {"pressed": "test_1", "released": "test_1"},
                    "props": {"test_1": true}
                },
                "test_2": {
                    "color": 3,
                    "gestures": {"pressed": "test_2", "double_clicked": "test_2"},
                    "props": {"test_2": true}
                }
            })),
        )
        .unwrap()
    }

    fn compile(section: &Section, raw: Value) -> Vec<ControlDefinition> {
        let lib = library();
        TemplateCompiler::new(&lib, Policy::default())
            .compile_section(section, None, &raw)
            .unwrap()
    }

    #[test]
    fn global_template_applies() {
        let s = Section::rect("test", (0, 0), (0, 0)).unwrap();
        let c = &compile(&s, json!([{}]))[0];
        assert_eq!(c.context.get("me.props.global_template"), Some(&json!(true)));
        assert_eq!(c.settings.on_threshold, Some(20));
        assert_eq!(c.settings.color, Some(json!(127)));
    }

    #[test]
    fn stacked_templates_apply_in_order() {
        let s = Section::rect("test", (0, 0), (0, 0)).unwrap();
        let c = &compile(
            &s,
            json!([{
                "template": ["test_1", "test_2"],
                "gestures": {"pressed": "control_def", "released_delayed": "control_def"},
                "props": {"control_def": true}
            }]),
        )[0];
        assert_eq!(c.settings.color, Some(json!(3)));
        let g = &c.settings.gestures;
        assert_eq!(g["pressed"], "control_def");
        assert_eq!(g["released"], "test_1");
        assert_eq!(g["released_delayed"], "control_def");
        assert_eq!(g["double_clicked"], "test_2");
        for prop in ["me.props.test_1", "me.props.test_2", "me.props.control_def"] {
            assert_eq!(c.context.get(prop), Some(&json!(true)), "{prop}");
        }
        // Template keys never reach the final config.
        assert!(!c.raw.contains_key("template"));
    }

    #[test]
    fn null_template_skips_global() {
        let s = Section::rect("test", (0, 0), (0, 1)).unwrap();
        let out = compile(
            &s,
            json!([
                {"template": null},
                {"template": [null, "test_1"]}
            ]),
        );
        assert_eq!(out[0].context.get("me.props.global_template"), None);
        assert_eq!(out[1].context.get("me.props.global_template"), None);
        assert_eq!(out[1].context.get("me.props.test_1"), Some(&json!(true)));
    }

    #[test]
    fn section_template_sits_between_global_and_control() {
        let lib = library();
        let s = Section::rect("test", (0, 0), (0, 1)).unwrap();
        let section_template = obj(json!({"color": 9, "on_threshold": 40}));
        let out = TemplateCompiler::new(&lib, Policy::default())
            .compile_section(
                &s,
                Some(&section_template),
                &json!([{"color": 5}, {"skip_section_template": true}]),
            )
            .unwrap();
        assert_eq!(out[0].settings.color, Some(json!(5)));
        assert_eq!(out[0].settings.on_threshold, Some(40));
        assert_eq!(out[1].settings.color, Some(json!(127)));
        assert_eq!(out[1].settings.on_threshold, Some(20));
    }

    #[test]
    fn pad_groups_expand_members() {
        let s = Section::rect("grid", (0, 0), (0, 3)).unwrap();
        let out = compile(
            &s,
            json!([
                {"gestures": {"pressed": "first"}},
                {
                    "pad_group": "scenes",
                    "gestures": {"pressed": "scene ${me.group_Index}"},
                    "controls": [null, {"color": 4}]
                },
                {"pad_group": true, "props": {"tail": true}}
            ]),
        );
        assert_eq!(out.len(), 4);
        assert!(out[0].group.is_none());

        let g = out[1].group.as_ref().unwrap();
        assert_eq!((g.name.as_str(), g.index, g.count), ("scenes", 0, 2));
        assert_eq!(out[1].context.get("me.group_Index"), Some(&json!(1)));
        assert_eq!(out[2].settings.color, Some(json!(4)));
        assert_eq!(out[2].settings.gestures["pressed"], "scene ${me.group_Index}");
        assert!(!out[2].raw.contains_key("pad_group"));

        // Unsized, unnamed groups take the remaining coordinates.
        let g = out[3].group.as_ref().unwrap();
        assert_eq!((g.name.as_str(), g.count), ("grid_group_0", 1));
        assert_eq!(out[3].context.get("me.props.tail"), Some(&json!(true)));
        assert_eq!(out[3].context.get("me.index"), Some(&json!(3)));
    }

    #[test]
    fn whole_section_shorthand() {
        let s = Section::rect("grid", (0, 1), (0, 1)).unwrap();
        let out = compile(
            &s,
            json!({
                "color": 8,
                "gestures": {"pressed": "pad ${me.Index}"},
                "controls": [null, {"color": 1}]
            }),
        );
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].settings.color, Some(json!(8)));
        assert_eq!(out[1].settings.color, Some(json!(1)));
        assert!(out.iter().all(|c| !c.is_placeholder()));
        assert_eq!(out[3].context.get("me.y"), Some(&json!(1)));
    }

    #[test]
    fn too_many_entries_is_critical() {
        let lib = library();
        let s = Section::rect("tiny", (0, 0), (0, 0)).unwrap();
        let err = TemplateCompiler::new(&lib, Policy::default())
            .compile_section(&s, None, &json!([{}, {}]))
            .unwrap_err();
        assert!(err.is_critical());
        assert_eq!(err.location(), Some("tiny"));
    }

    #[test]
    fn too_few_entries_are_padded() {
        let s = Section::rect("pads", (0, 0), (0, 2)).unwrap();
        let out = compile(&s, json!([{}]));
        assert_eq!(out.len(), 3);
        assert!(!out[0].is_placeholder());
        assert!(out[1].is_placeholder());
        assert_eq!(out[2].name, "pads_2");
        assert_eq!(out[2].context.get("me.index"), Some(&json!(2)));
    }

    #[test]
    fn bad_template_reference_is_local() {
        let s = Section::rect("pads", (0, 0), (0, 1)).unwrap();
        let out = compile(&s, json!([{"template": "nope"}, {"color": 5}]));
        assert!(out[0].is_placeholder());
        let err = out[0].error.as_ref().unwrap();
        assert_eq!(err.location(), Some("pads_0"));
        assert!(err.message().contains("nope"));
        assert_eq!(out[1].settings.color, Some(json!(5)));
    }

    #[test]
    fn strict_policy_aborts_on_bad_reference() {
        let lib = library();
        let s = Section::rect("pads", (0, 0), (0, 0)).unwrap();
        let err = TemplateCompiler::new(&lib, Policy { strict: true })
            .compile_section(&s, None, &json!([{"template": "nope"}]))
            .unwrap_err();
        assert!(err.is_critical());
    }

    #[test]
    fn malformed_section_list_is_critical() {
        let lib = library();
        let s = Section::rect("pads", (0, 0), (0, 1)).unwrap();
        let c = TemplateCompiler::new(&lib, Policy::default());
        assert!(c.compile_section(&s, None, &json!(["x"])).unwrap_err().is_critical());
        assert!(c.compile_section(&s, None, &json!(4)).unwrap_err().is_critical());
    }

    #[test]
    fn named_controls_and_groups() {
        let lib = library();
        let c = TemplateCompiler::new(&lib, Policy::default());
        let raw = obj(json!({
            "play": {"gestures": {"pressed": "PLAY"}},
            "__nav": {
                "includes": ["left", "right"],
                "template": "test_1",
                "gestures": {"pressed": "nav ${me.group_index}"},
                "buttons": {"right": {"color": 6}}
            }
        }));
        let out = c.compile_named("named", &raw).unwrap();
        assert_eq!(
            out.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
            ["play", "left", "right"]
        );
        assert_eq!(out[0].settings.on_threshold, Some(20));
        assert_eq!(out[1].settings.gestures["released"], "test_1");
        assert_eq!(out[1].settings.gestures["pressed"], "nav ${me.group_index}");
        assert_eq!(out[1].context.get("me.group_name"), Some(&json!("nav")));
        assert_eq!(out[2].settings.color, Some(json!(6)));
        assert_eq!(out[2].context.get("me.group_Index"), Some(&json!(2)));
    }

    #[test]
    fn duplicate_named_controls_are_critical() {
        let lib = library();
        let c = TemplateCompiler::new(&lib, Policy::default());
        let raw = obj(json!({
            "play": {},
            "__transport": {"includes": ["play", "stop"]}
        }));
        assert!(c.compile_named("named", &raw).unwrap_err().is_critical());
    }

    #[test]
    fn encoder_groups() {
        let lib = library();
        let c = TemplateCompiler::new(&lib, Policy::default());
        let raw = obj(json!({
            "enc_master": {"binding": "MST/VOL"},
            "__row": {
                "includes": ["enc_1", "enc_2", "enc_3"],
                "binding": "${me.Index}/VOL",
                "encoders": [null, {"binding": "SEL/PAN"}]
            }
        }));
        let out = c.compile_encoders(&raw).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].settings.binding, Some(json!("MST/VOL")));
        assert_eq!(out[1].settings.binding, Some(json!("${me.Index}/VOL")));
        assert_eq!(out[2].settings.binding, Some(json!("SEL/PAN")));
        assert_eq!(out[3].context.get("me.Index"), Some(&json!(3)));
        assert_eq!(out[3].context.get("me.group_name"), Some(&json!("row")));
        assert!(!out[3].raw.contains_key("includes"));
    }

    #[test]
    fn encoder_group_without_includes_is_critical() {
        let lib = library();
        let c = TemplateCompiler::new(&lib, Policy::default());
        let raw = obj(json!({"__row": {"binding": "1/VOL"}}));
        assert!(c.compile_encoders(&raw).unwrap_err().is_critical());
    }
}
