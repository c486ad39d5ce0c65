//! Fully merged control and encoder definitions.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};

use crate::{Context, Error, section::Position, value::Map};

/// Dispatch direction for controls that fire every matching gesture entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cascade {
    /// Fire only the most specific entry.
    #[default]
    Off,
    /// Fire all entries, most specific first.
    Up,
    /// Fire all entries, least specific first.
    Down,
}

impl<'de> Deserialize<'de> for Cascade {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        /// Accepted spellings: a boolean or a direction name.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            /// `true` cascades downwards.
            Flag(bool),
            /// `"up"`, `"down"` or `"off"`.
            Dir(String),
        }
        match Raw::deserialize(d)? {
            Raw::Flag(false) => Ok(Self::Off),
            Raw::Flag(true) => Ok(Self::Down),
            Raw::Dir(s) => match s.to_ascii_lowercase().as_str() {
                "up" => Ok(Self::Up),
                "down" => Ok(Self::Down),
                "off" | "false" | "none" => Ok(Self::Off),
                other => Err(serde::de::Error::custom(format!(
                    "cascade must be up, down or false, got {other}"
                ))),
            },
        }
    }
}

/// Membership of a control in a named group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupContext {
    /// Group name (`{section}_group_{n}` for unnamed pad groups).
    pub name: String,
    /// Zero-based index within the group.
    pub index: usize,
    /// Number of members.
    pub count: usize,
}

impl GroupContext {
    /// Group fields as they appear under `me`.
    pub fn to_context(&self) -> Value {
        json!({
            "group_name": self.name,
            "group_index": self.index,
            "group_Index": self.index + 1,
            "group_count": self.count,
        })
    }
}

/// Typed view of the keys the engine reads from a merged control config.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    /// Control type; `basic` when absent.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Idle color spec.
    pub color: Option<Value>,
    /// Gesture table: `gesture[__mode...]` to action bundle.
    pub gestures: Map,
    /// Variable declarations, evaluated in order.
    pub vars: Map,
    /// Free-form user properties exposed as `me.props`.
    pub props: Map,
    /// Minimum velocity for on-class gestures.
    pub on_threshold: Option<u8>,
    /// Cascade dispatch direction.
    pub cascade: Cascade,
    /// Collapse press/release into a single `pressed`.
    pub fake_momentary: bool,
    /// Skip success/failure animations.
    pub suppress_animations: Option<bool>,
    /// Binding target(s) for `param` controls.
    pub binding: Option<Value>,
    /// Clear the target when a rebind fails.
    pub unbind_on_fail: Option<bool>,
    /// Toggle the bound target on `pressed`.
    pub toggle_param: Option<bool>,
    /// Feedback color when the bound target is on.
    pub on_color: Option<Value>,
    /// Feedback color when the bound target is off.
    pub off_color: Option<Value>,
    /// Feedback color when no target is bound.
    pub disabled_color: Option<Value>,
}

/// The final configuration of one control instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlDefinition {
    /// Unique control name (`{section}_{index}` for matrix pads).
    pub name: String,
    /// Owning section.
    pub section: String,
    /// Position within the section, for matrix pads.
    pub position: Option<Position>,
    /// Group membership.
    pub group: Option<GroupContext>,
    /// Typed settings read from `raw`.
    pub settings: ControlSettings,
    /// Evaluation namespace.
    pub context: Context,
    /// The merged configuration.
    pub raw: Map,
    /// Set when this control replaces one whose configuration failed.
    pub error: Option<Error>,
}

impl ControlDefinition {
    /// Build a definition from a merged config.
    pub fn from_raw(
        name: String,
        section: &str,
        position: Option<Position>,
        group: Option<GroupContext>,
        raw: Map,
    ) -> crate::Result<Self> {
        let settings: ControlSettings = serde_json::from_value(Value::Object(raw.clone()))
            .map_err(|e| Error::config(format!("invalid control config: {e}")).at(name.clone()))?;
        let context = build_context(&name, section, position, group.as_ref(), &settings.props);
        Ok(Self {
            name,
            section: section.to_string(),
            position,
            group,
            settings,
            context,
            raw,
            error: None,
        })
    }

    /// An inert stand-in that flashes an error when pressed.
    pub fn placeholder(
        name: String,
        section: &str,
        position: Option<Position>,
        error: Error,
    ) -> Self {
        let context = build_context(&name, section, position, None, &Map::new());
        let mut gestures = Map::new();
        gestures.insert(
            "pressed".into(),
            json!({"msg": format!("{name}: {}", error.message())}),
        );
        let mut raw = Map::new();
        raw.insert("gestures".into(), Value::Object(gestures.clone()));
        Self {
            name,
            section: section.to_string(),
            position,
            group: None,
            settings: ControlSettings {
                gestures,
                ..Default::default()
            },
            context,
            raw,
            error: Some(error),
        }
    }

    /// True for stand-ins created after a configuration error.
    pub fn is_placeholder(&self) -> bool {
        self.error.is_some()
    }

    /// Control type, defaulting to `basic`.
    pub fn kind(&self) -> &str {
        self.settings.kind.as_deref().unwrap_or("basic")
    }
}

/// Assemble the `me` namespace for a control.
fn build_context(
    name: &str,
    section: &str,
    position: Option<Position>,
    group: Option<&GroupContext>,
    props: &Map,
) -> Context {
    let mut me = Map::new();
    me.insert("name".into(), Value::from(name));
    me.insert("section".into(), Value::from(section));
    if let Some(Value::Object(pos)) = position.map(Position::to_context) {
        me.extend(pos);
    }
    match group.map(GroupContext::to_context) {
        Some(Value::Object(g)) => me.extend(g),
        _ => {
            me.insert("group_name".into(), Value::Null);
            me.insert("group_index".into(), Value::Null);
        }
    }
    me.insert("props".into(), Value::Object(props.clone()));
    Context::new(me)
}

/// Typed view of an encoder's merged config.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    /// Binding target(s): a string, or a mapping from mode key to target.
    pub binding: Option<Value>,
    /// Variable declarations, evaluated in order.
    pub vars: Map,
    /// Clear the target when a rebind fails.
    pub unbind_on_fail: Option<bool>,
    /// Prefer the left-hand parameter of banked pairs.
    pub prefer_left: Option<bool>,
}

/// The final configuration of one encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderDefinition {
    /// Encoder name as the hardware exposes it.
    pub name: String,
    /// Group membership, for encoders declared in a `__group`.
    pub group: Option<GroupContext>,
    /// Typed settings read from `raw`.
    pub settings: EncoderSettings,
    /// Evaluation namespace.
    pub context: Context,
    /// The merged configuration.
    pub raw: Map,
}

impl EncoderDefinition {
    /// Build a definition; `index` is the encoder's position among all encoders.
    pub(crate) fn from_raw(
        name: String,
        index: usize,
        group: Option<GroupContext>,
        raw: Map,
    ) -> crate::Result<Self> {
        let settings: EncoderSettings = serde_json::from_value(Value::Object(raw.clone()))
            .map_err(|e| Error::config(format!("invalid encoder config: {e}")).at(name.clone()))?;
        let mut me = Map::new();
        me.insert("name".into(), Value::from(name.as_str()));
        let (group_index, group_name) = match &group {
            Some(g) => (g.index, Value::from(g.name.as_str())),
            None => (index, Value::Null),
        };
        me.insert("index".into(), Value::from(group_index));
        me.insert("Index".into(), Value::from(group_index + 1));
        me.insert("group_index".into(), Value::from(group_index));
        me.insert("group_Index".into(), Value::from(group_index + 1));
        me.insert("group_name".into(), group_name);
        if let Some(g) = &group {
            me.insert("group_count".into(), Value::from(g.count));
        }
        Ok(Self {
            name,
            group,
            settings,
            context: Context::new(me),
            raw,
        })
    }
}
