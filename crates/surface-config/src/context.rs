//! Per-control evaluation namespace.

use serde::Serialize;
use serde_json::Value;

use crate::value::Map;

/// Read-only namespace used when evaluating a control's expressions.
///
/// Everything lives under `me` (`me.index`, `me.group_name`, `me.props.*`,
/// ...). After setup the only mutation is through the named runtime
/// setters below.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Context {
    /// The `me` object.
    me: Map,
}

impl Context {
    /// A context whose `me` object is `me`.
    pub fn new(me: Map) -> Self {
        Self { me }
    }

    /// Build from a full namespace mapping such as `{"me": {...}}`. Anything
    /// other than an `me` object is ignored.
    pub fn from_map(mut root: Map) -> Self {
        match root.remove("me") {
            Some(Value::Object(me)) => Self { me },
            _ => Self::default(),
        }
    }

    /// The `me` object.
    pub fn me(&self) -> &Map {
        &self.me
    }

    /// Look up a dotted path such as `me.props.color`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        if parts.next()? != "me" {
            return None;
        }
        let mut cur = self.me.get(parts.next()?)?;
        for p in parts {
            cur = cur.as_object()?.get(p)?;
        }
        Some(cur)
    }

    /// Record the intensity of the most recent press.
    pub fn set_velocity(&mut self, velocity: u8) {
        self.me.insert("velocity".into(), Value::from(velocity));
    }

    /// Record the name of the track a control currently follows.
    pub fn set_track_name(&mut self, name: Option<&str>) {
        self.me
            .insert("track".into(), name.map_or(Value::Null, Value::from));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn dotted_lookup_and_setters() {
        let me = json!({"index": 2, "props": {"hue": "red"}});
        let mut ctx = Context::new(me.as_object().unwrap().clone());
        assert_eq!(ctx.get("me.props.hue"), Some(&json!("red")));
        assert_eq!(ctx.get("me.props.missing"), None);
        assert_eq!(ctx.get("me.index.deeper"), None);

        ctx.set_velocity(99);
        assert_eq!(ctx.me()["velocity"], 99);
        ctx.set_track_name(Some("Bass"));
        assert_eq!(ctx.get("me.track"), Some(&json!("Bass")));
    }

    #[test]
    fn from_map_reads_me() {
        assert!(Context::from_map(Map::new()).me().is_empty());
        let root = json!({"me": {"message": "Hello"}, "other": 1});
        let ctx = Context::from_map(root.as_object().unwrap().clone());
        assert_eq!(ctx.get("me.message"), Some(&json!("Hello")));
        assert_eq!(ctx.get("other"), None);
    }
}
