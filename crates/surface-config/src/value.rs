//! Parsed configuration values and the deep merge used by template layering.

use serde_json::Value;

/// A configuration mapping in declaration order.
pub type Map = serde_json::Map<String, Value>;

/// Deep-merge `over` onto `base`. Mappings merge key by key; any other
/// conflict is won by `over`.
///
/// Color keys (`color` and `*_color`) are special: two color mappings are
/// merged only when both name the same single animation tag (for instance
/// both `blink`); otherwise `over` replaces `base` wholesale.
pub fn merge(base: &Value, over: &Value) -> Value {
    match (base, over) {
        (Value::Object(b), Value::Object(o)) => Value::Object(merge_maps(b, o)),
        _ => over.clone(),
    }
}

/// Merge two mappings, see [`merge`].
pub fn merge_maps(base: &Map, over: &Map) -> Map {
    let mut out = base.clone();
    for (key, value) in over {
        let merged = match out.get(key) {
            Some(existing) if is_color_key(key) => merge_color(existing, value),
            Some(existing) => merge(existing, value),
            None => value.clone(),
        };
        out.insert(key.clone(), merged);
    }
    out
}

/// Apply `layers` in order onto an empty mapping.
pub fn merge_layers<'a>(layers: impl IntoIterator<Item = &'a Map>) -> Map {
    layers
        .into_iter()
        .fold(Map::new(), |acc, layer| merge_maps(&acc, layer))
}

/// True for keys holding a color spec.
fn is_color_key(key: &str) -> bool {
    key == "color" || key.ends_with("_color")
}

/// The animation tag of a color spec like `{blink: {...}}`.
fn animation_tag(v: &Value) -> Option<&str> {
    match v {
        Value::Object(m) if m.len() == 1 => m.keys().next().map(String::as_str),
        _ => None,
    }
}

/// Union sub-keys when both sides share a tag, else replace.
fn merge_color(base: &Value, over: &Value) -> Value {
    match (animation_tag(base), animation_tag(over)) {
        (Some(a), Some(b)) if a == b => merge(base, over),
        _ => over.clone(),
    }
}

/// Render a scalar as the text an action string would see.
pub fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
