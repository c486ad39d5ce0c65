//! Expansion of named controls and encoders, including `__group` blocks.

use std::collections::HashSet;

use serde_json::Value;

use crate::{
    Error, Result,
    definition::GroupContext,
    template::{TemplateCompiler, strip_meta},
    value::{Map, merge_maps},
};

/// A named entry after group expansion: name, group, merged config.
pub(crate) type NamedEntry = (String, Option<GroupContext>, Result<Map>);

/// An encoder after group expansion.
pub(crate) type EncoderEntry = (String, Option<GroupContext>, Map);

/// Group name with the `__` marker removed.
fn group_name(key: &str) -> Option<&str> {
    key.strip_prefix("__")
}

/// Read a group's `includes` list.
fn includes(group: &str, body: &Map) -> Result<Vec<String>> {
    let Some(Value::Array(items)) = body.get("includes") else {
        return Err(Error::critical(format!(
            "group __{group} needs an `includes` list"
        )));
    };
    items
        .iter()
        .map(|v| {
            v.as_str().map(str::to_string).ok_or_else(|| {
                Error::critical(format!("group __{group}: includes must be names, got {v}"))
            })
        })
        .collect()
}

/// Record `name`, failing on a second definition.
fn claim(seen: &mut HashSet<String>, name: &str) -> Result<()> {
    if seen.insert(name.to_string()) {
        Ok(())
    } else {
        Err(Error::critical(format!("multiple definitions for {name}")).at(name))
    }
}

/// Mapping at `key`, or an empty map when absent.
fn object_at(body: &Map, key: &str, group: &str) -> Result<Map> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(m)) => Ok(m.clone()),
        Some(other) => Err(Error::critical(format!(
            "group __{group}: `{key}` must be a mapping, got {other}"
        ))),
    }
}

/// Expand named controls in declaration order.
///
/// A `__name` key holds a group: its body applies to every control in
/// `includes`, and per-control overrides come from `controls` (or
/// `buttons`) keyed by name.
pub(crate) fn expand_named(compiler: &TemplateCompiler<'_>, raw: &Map) -> Result<Vec<NamedEntry>> {
    let empty = Map::new();
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (key, value) in raw {
        let Value::Object(body) = value else {
            return Err(Error::critical(format!("{key} must be a mapping, got {value}")).at(key));
        };
        let Some(group) = group_name(key) else {
            claim(&mut seen, key)?;
            let merged = compiler.library().refs(body).map(|refs| {
                let own = strip_meta(body);
                compiler.layer(&refs, &empty, &[], &[&own])
            });
            out.push((key.clone(), None, merged));
            continue;
        };

        let members = includes(group, body)?;
        let mut overrides = object_at(body, "controls", group)?;
        overrides.extend(object_at(body, "buttons", group)?);
        let group_refs = compiler.library().refs(body);
        let group_body = strip_meta(body);
        let count = members.len();
        for (index, name) in members.into_iter().enumerate() {
            claim(&mut seen, &name)?;
            let member = match overrides.get(&name) {
                None | Some(Value::Null) => Map::new(),
                Some(Value::Object(m)) => m.clone(),
                Some(other) => {
                    return Err(Error::critical(format!(
                        "group __{group}: override for {name} must be a mapping, got {other}"
                    ))
                    .at(name));
                }
            };
            let merged = match &group_refs {
                Err(e) => Err(e.clone()),
                Ok(gr) => compiler.library().refs(&member).map(|mut refs| {
                    refs.skip_global |= gr.skip_global;
                    let layers: Vec<&Map> = gr
                        .layers
                        .iter()
                        .copied()
                        .chain(std::iter::once(&group_body))
                        .collect();
                    let own = strip_meta(&member);
                    compiler.layer(&refs, &empty, &layers, &[&own])
                }),
            };
            let ctx = GroupContext {
                name: group.to_string(),
                index,
                count,
            };
            out.push((name, Some(ctx), merged));
        }
    }
    Ok(out)
}

/// Expand encoders in declaration order.
///
/// A `__name` key holds a group whose body applies to every encoder in
/// `includes`; `encoders` is a positional list of per-encoder overrides
/// where `null` means no override. Encoders take no templates.
pub(crate) fn expand_encoders(raw: &Map) -> Result<Vec<EncoderEntry>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (key, value) in raw {
        let body = match value {
            Value::Object(m) => m.clone(),
            Value::Null => Map::new(),
            other => {
                return Err(Error::critical(format!("{key} must be a mapping, got {other}")).at(key));
            }
        };
        let Some(group) = group_name(key) else {
            claim(&mut seen, key)?;
            out.push((key.clone(), None, body));
            continue;
        };

        let members = includes(group, &body)?;
        let overrides = match body.get("encoders") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(other) => {
                return Err(Error::critical(format!(
                    "group __{group}: `encoders` must be a list, got {other}"
                )));
            }
        };
        let group_body = strip_meta(&body);
        let count = members.len();
        for (index, name) in members.into_iter().enumerate() {
            claim(&mut seen, &name)?;
            let merged = match overrides.get(index) {
                None | Some(Value::Null) => group_body.clone(),
                Some(Value::Object(o)) => merge_maps(&group_body, o),
                Some(other) => {
                    return Err(Error::critical(format!(
                        "group __{group}: encoder override {index} must be a mapping or null, got {other}"
                    ))
                    .at(name));
                }
            };
            let ctx = GroupContext {
                name: group.to_string(),
                index,
                count,
            };
            out.push((name, Some(ctx), merged));
        }
    }
    Ok(out)
}
