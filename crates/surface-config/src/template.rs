//! Template layering and section expansion.
//!
//! A control's final config is built by merging, in order:
//!
//! ```text
//! global ∘ section ∘ group templates ∘ group ∘ control templates ∘ control
//! ```
//!
//! `template: null`, or a template list whose first element is `null`, drops
//! the global layer; `skip_global_template` and `skip_section_template` drop
//! their layers explicitly.

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    ControlDefinition, EncoderDefinition, Error, Policy, Result,
    definition::GroupContext,
    named,
    section::Section,
    value::{Map, merge_layers, merge_maps},
};

/// Keys that steer expansion and never reach a final config.
const META_KEYS: &[&str] = &[
    "template",
    "pad_group",
    "controls",
    "pads",
    "includes",
    "buttons",
    "encoders",
    "skip_global_template",
    "skip_section_template",
];

/// Remove expansion keys from a config layer.
pub(crate) fn strip_meta(entry: &Map) -> Map {
    entry
        .iter()
        .filter(|(k, _)| !META_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Read a boolean flag, treating anything else as false.
fn flag(entry: &Map, key: &str) -> bool {
    entry.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Templates named by one config entry.
#[derive(Debug, Default)]
pub(crate) struct TemplateRefs<'a> {
    /// Drop the global layer.
    pub skip_global: bool,
    /// Drop the section layer.
    pub skip_section: bool,
    /// Referenced templates, in application order.
    pub layers: Vec<&'a Map>,
}

/// The global template plus the library of named templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    /// Applied beneath every control.
    global: Map,
    /// Named templates.
    templates: Map,
}

impl TemplateLibrary {
    /// Build a library. Every named template must be a mapping.
    pub fn new(global: Map, templates: Map) -> Result<Self> {
        if let Some((name, _)) = templates.iter().find(|(_, v)| !v.is_object()) {
            return Err(Error::critical(format!("template {name} must be a mapping")));
        }
        Ok(Self { global, templates })
    }

    /// The global template.
    pub fn global(&self) -> &Map {
        &self.global
    }

    /// Look up a named template.
    fn template(&self, name: &str) -> Result<&Map> {
        self.templates
            .get(name)
            .and_then(Value::as_object)
            .ok_or_else(|| Error::config(format!("unknown template \"{name}\"")))
    }

    /// Resolve the `template` field and skip flags of `entry`.
    pub(crate) fn refs(&self, entry: &Map) -> Result<TemplateRefs<'_>> {
        let mut refs = TemplateRefs {
            skip_global: flag(entry, "skip_global_template"),
            skip_section: flag(entry, "skip_section_template"),
            layers: Vec::new(),
        };
        match entry.get("template") {
            None => {}
            Some(Value::Null) => refs.skip_global = true,
            Some(Value::String(name)) => refs.layers.push(self.template(name)?),
            Some(Value::Array(items)) => {
                let leading_null = matches!(items.first(), Some(Value::Null));
                refs.skip_global |= leading_null;
                for item in items.iter().skip(usize::from(leading_null)) {
                    match item {
                        Value::String(name) => refs.layers.push(self.template(name)?),
                        other => {
                            return Err(Error::config(format!(
                                "template names must be strings, got {other}"
                            )));
                        }
                    }
                }
            }
            Some(other) => {
                return Err(Error::config(format!(
                    "template must be a name, a list of names or null, got {other}"
                )));
            }
        }
        Ok(refs)
    }
}

/// One expanded entry awaiting a position.
struct Pending {
    /// Merged config, or the error that replaces it with a placeholder.
    raw: Result<Map>,
    /// Group membership.
    group: Option<GroupContext>,
}

/// Turns raw section, named-control and encoder configs into definitions.
#[derive(Debug, Clone)]
pub struct TemplateCompiler<'a> {
    /// Templates available to every control.
    library: &'a TemplateLibrary,
    /// Error promotion policy.
    policy: Policy,
}

impl<'a> TemplateCompiler<'a> {
    /// Build a compiler over `library`.
    pub fn new(library: &'a TemplateLibrary, policy: Policy) -> Self {
        Self { library, policy }
    }

    /// The template library in use.
    pub fn library(&self) -> &'a TemplateLibrary {
        self.library
    }

    /// Compile one section's raw control list.
    ///
    /// `raw` is a list of entries (controls or `pad_group`s), or a single
    /// mapping applied to every coordinate with optional per-pad overrides
    /// under `controls`. More entries than coordinates is critical; fewer
    /// pads the remainder with placeholders.
    pub fn compile_section(
        &self,
        section: &Section,
        section_template: Option<&Map>,
        raw: &Value,
    ) -> Result<Vec<ControlDefinition>> {
        let entries = normalize_section(section, raw).map_err(|e| e.at(section.name.clone()))?;
        let empty = Map::new();
        let section_template = section_template.unwrap_or(&empty);

        let mut pending: Vec<Pending> = Vec::new();
        let mut unnamed_groups = 0;
        for entry in &entries {
            if entry.contains_key("pad_group") {
                let remaining = section.len().saturating_sub(pending.len());
                let members = self
                    .expand_group(section, section_template, entry, remaining, &mut unnamed_groups)
                    .map_err(|e| e.at(section.name.clone()))?;
                pending.extend(members);
            } else {
                let raw = self.library.refs(entry).map(|refs| {
                    let body = strip_meta(entry);
                    self.layer(&refs, section_template, &[], &[&body])
                });
                pending.push(Pending { raw, group: None });
            }
        }

        if pending.len() > section.len() {
            return Err(Error::critical(format!(
                "section {} defines {} controls but owns only {} coordinates",
                section.name,
                pending.len(),
                section.len()
            ))
            .at(section.name.clone()));
        }

        let mut out = Vec::with_capacity(section.len());
        for (i, p) in pending.into_iter().enumerate() {
            let position = section.position(i);
            let name = p
                .raw
                .as_ref()
                .ok()
                .and_then(|m| m.get("name"))
                .and_then(Value::as_str)
                .map_or_else(|| format!("{}_{i}", section.name), str::to_string);
            let built = p.raw.and_then(|raw| {
                ControlDefinition::from_raw(name.clone(), &section.name, position, p.group, raw)
            });
            out.push(self.recover(built, &name, &section.name, position)?);
        }

        if out.len() < section.len() {
            warn!(
                section = %section.name,
                defined = out.len(),
                coordinates = section.len(),
                "section_underfilled"
            );
            for i in out.len()..section.len() {
                let name = format!("{}_{i}", section.name);
                out.push(ControlDefinition::placeholder(
                    name.clone(),
                    &section.name,
                    section.position(i),
                    Error::config("missing control").at(name),
                ));
            }
        }
        debug!(section = %section.name, controls = out.len(), "section_compiled");
        Ok(out)
    }

    /// Compile named controls: plain entries plus `__group`s with `includes`.
    pub fn compile_named(&self, section: &str, raw: &Map) -> Result<Vec<ControlDefinition>> {
        let entries = named::expand_named(self, raw)?;
        let mut out = Vec::with_capacity(entries.len());
        for (name, group, merged) in entries {
            let built = merged
                .and_then(|raw| ControlDefinition::from_raw(name.clone(), section, None, group, raw));
            out.push(self.recover(built, &name, section, None)?);
        }
        Ok(out)
    }

    /// Compile encoder definitions: plain entries plus `__group`s.
    pub fn compile_encoders(&self, raw: &Map) -> Result<Vec<EncoderDefinition>> {
        let entries = named::expand_encoders(raw)?;
        let mut out = Vec::with_capacity(entries.len());
        for (i, (name, group, merged)) in entries.into_iter().enumerate() {
            match EncoderDefinition::from_raw(name.clone(), i, group.clone(), merged) {
                Ok(def) => out.push(def),
                Err(e) => {
                    let e = self.policy.escalate(e.at(name.clone()));
                    if e.is_critical() {
                        return Err(e);
                    }
                    warn!(encoder = %name, error = %e, "encoder_disabled");
                    out.push(EncoderDefinition::from_raw(name, i, group, Map::new())?);
                }
            }
        }
        Ok(out)
    }

    /// Stack layers for one control.
    ///
    /// `group` holds the group's template and body layers; `own` holds the
    /// control's template and body layers.
    pub(crate) fn layer(
        &self,
        refs: &TemplateRefs<'_>,
        section_template: &Map,
        group: &[&Map],
        own: &[&Map],
    ) -> Map {
        let global = (!refs.skip_global).then_some(self.library.global());
        let section = (!refs.skip_section).then_some(section_template);
        merge_layers(
            global
                .into_iter()
                .chain(section)
                .chain(group.iter().copied())
                .chain(refs.layers.iter().copied())
                .chain(own.iter().copied()),
        )
    }

    /// Expand one `pad_group` entry into its members.
    fn expand_group(
        &self,
        section: &Section,
        section_template: &Map,
        entry: &Map,
        remaining: usize,
        unnamed_groups: &mut usize,
    ) -> Result<Vec<Pending>> {
        let name = match entry.get("pad_group") {
            Some(Value::String(s)) => s.clone(),
            _ => {
                let n = *unnamed_groups;
                *unnamed_groups += 1;
                format!("{}_group_{n}", section.name)
            }
        };
        let members: Vec<Value> = match entry.get("controls").or_else(|| entry.get("pads")) {
            None => vec![Value::Null; remaining],
            Some(Value::Array(items)) => items.clone(),
            Some(other) => {
                return Err(Error::critical(format!(
                    "pad group {name}: `controls` must be a list, got {other}"
                )));
            }
        };
        let count = members.len();

        let group_refs = match self.library.refs(entry) {
            Ok(r) => r,
            Err(e) => {
                return Ok((0..count)
                    .map(|index| Pending {
                        raw: Err(e.clone()),
                        group: Some(GroupContext {
                            name: name.clone(),
                            index,
                            count,
                        }),
                    })
                    .collect());
            }
        };
        let group_body = strip_meta(entry);
        let group_layers: Vec<&Map> = group_refs
            .layers
            .iter()
            .copied()
            .chain(std::iter::once(&group_body))
            .collect();

        let mut out = Vec::with_capacity(count);
        for (index, member) in members.iter().enumerate() {
            let empty = Map::new();
            let member = match member {
                Value::Null => &empty,
                Value::Object(m) => m,
                other => {
                    return Err(Error::critical(format!(
                        "pad group {name}: member {index} must be a mapping or null, got {other}"
                    )));
                }
            };
            let raw = self.library.refs(member).map(|mut refs| {
                refs.skip_global |= group_refs.skip_global;
                refs.skip_section |= group_refs.skip_section;
                let body = strip_meta(member);
                self.layer(&refs, section_template, &group_layers, &[&body])
            });
            out.push(Pending {
                raw,
                group: Some(GroupContext {
                    name: name.clone(),
                    index,
                    count,
                }),
            });
        }
        Ok(out)
    }

    /// Apply the error policy to one built definition.
    fn recover(
        &self,
        built: Result<ControlDefinition>,
        name: &str,
        section: &str,
        position: Option<crate::section::Position>,
    ) -> Result<ControlDefinition> {
        match built {
            Ok(def) => Ok(def),
            Err(e) => {
                let e = self.policy.escalate(e.at(name));
                if e.is_critical() {
                    return Err(e);
                }
                warn!(control = %name, error = %e, "control_replaced_with_placeholder");
                Ok(ControlDefinition::placeholder(
                    name.to_string(),
                    section,
                    position,
                    e,
                ))
            }
        }
    }
}

/// Turn a section's raw config into a flat list of entries.
fn normalize_section(section: &Section, raw: &Value) -> Result<Vec<Map>> {
    match raw {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(m) => Ok(m.clone()),
                other => Err(Error::critical(format!(
                    "entry {i} must be a mapping, got {other}"
                ))),
            })
            .collect(),
        Value::Object(m) if m.contains_key("pad_group") => Ok(vec![m.clone()]),
        Value::Object(m) => {
            let overrides = match m.get("controls").or_else(|| m.get("pads")) {
                None => Vec::new(),
                Some(Value::Array(items)) => items.clone(),
                Some(other) => {
                    return Err(Error::critical(format!(
                        "`controls` must be a list, got {other}"
                    )));
                }
            };
            let body: Map = m
                .iter()
                .filter(|(k, _)| k.as_str() != "controls" && k.as_str() != "pads")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            (0..section.len())
                .map(|i| match overrides.get(i) {
                    None | Some(Value::Null) => Ok(body.clone()),
                    Some(Value::Object(o)) => Ok(merge_maps(&body, o)),
                    Some(other) => Err(Error::critical(format!(
                        "override {i} must be a mapping or null, got {other}"
                    ))),
                })
                .collect()
        }
        other => Err(Error::critical(format!(
            "section config must be a list or a mapping, got {other}"
        ))),
    }
}
