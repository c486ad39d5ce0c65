//! Action bundles: what a gesture does.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use rand::Rng;
use serde_json::Value;
use thiserror::Error;

use crate::value::scalar_text;

/// Raised when a value cannot be read as an action bundle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid action bundle: {0}")]
pub struct BundleError(pub String);

/// A tagged directive. Text payloads are templates compiled at execution time.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Trigger an external action list.
    Cxp(String),
    /// Write to the log.
    Log(String),
    /// Show a status message.
    Msg(String),
    /// Change page; `last` returns to the previous page.
    Page(String),
    /// Toggle a mode.
    Mode(String),
    /// Enable a mode.
    ModeOn(String),
    /// Disable a mode.
    ModeOff(String),
    /// Redraw the whole surface.
    Refresh,
    /// Set the calling control's color; `initial` restores the configured one.
    Color(Value),
    /// Toggle the calling control's bound target.
    Toggle,
    /// A tag nothing knows how to run. Kept so execution can report it.
    Unrecognized(String),
}

impl Directive {
    /// The tag this directive was written with.
    pub fn tag(&self) -> &str {
        match self {
            Self::Cxp(_) => "cxp",
            Self::Log(_) => "log",
            Self::Msg(_) => "msg",
            Self::Page(_) => "page",
            Self::Mode(_) => "mode",
            Self::ModeOn(_) => "mode_on",
            Self::ModeOff(_) => "mode_off",
            Self::Refresh => "refresh",
            Self::Color(_) => "color",
            Self::Toggle => "do_toggle",
            Self::Unrecognized(tag) => tag,
        }
    }

    /// Read a `{tag: payload}` pair.
    fn from_tagged(tag: &str, payload: &Value) -> Result<Self, BundleError> {
        let text = || {
            scalar_text(payload)
                .ok_or_else(|| BundleError(format!("`{tag}` expects a string, got {payload}")))
        };
        Ok(match tag {
            "cxp" => Self::Cxp(text()?),
            "log" => Self::Log(text()?),
            "msg" => Self::Msg(text()?),
            "page" => Self::Page(text()?),
            "mode" => Self::Mode(text()?),
            "mode_on" => Self::ModeOn(text()?),
            "mode_off" => Self::ModeOff(text()?),
            "refresh" => Self::Refresh,
            "color" => Self::Color(payload.clone()),
            "do_toggle" => Self::Toggle,
            other => Self::Unrecognized(other.to_string()),
        })
    }
}

/// How a [`Sequencer`] picks its next item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Cycle through items in order.
    RoundRobin,
    /// Pick uniformly at random.
    Random,
}

/// A picker over a fixed list of bundles, advancing on every use.
#[derive(Debug)]
pub struct Sequencer {
    /// Items to pick from; never empty.
    items: Vec<ActionBundle>,
    /// Picking order.
    order: Order,
    /// Next round-robin position.
    cursor: AtomicUsize,
}

impl Sequencer {
    /// Build a sequencer. An empty item list is rejected.
    pub fn new(items: Vec<ActionBundle>, order: Order) -> Result<Self, BundleError> {
        if items.is_empty() {
            return Err(BundleError("sequencer needs at least one item".into()));
        }
        Ok(Self {
            items,
            order,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Picking order.
    pub fn order(&self) -> Order {
        self.order
    }

    /// Items in declaration order.
    pub fn items(&self) -> &[ActionBundle] {
        &self.items
    }

    /// Pick the next item and advance.
    pub fn next_item(&self) -> &ActionBundle {
        let n = self.items.len();
        let i = match self.order {
            Order::RoundRobin => self.cursor.fetch_add(1, Ordering::Relaxed) % n,
            Order::Random => rand::thread_rng().gen_range(0..n),
        };
        &self.items[i]
    }
}

impl Clone for Sequencer {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            order: self.order,
            cursor: AtomicUsize::new(self.cursor.load(Ordering::Relaxed)),
        }
    }
}

impl PartialEq for Sequencer {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order && self.items == other.items
    }
}

/// A callback supplied from code rather than configuration.
#[derive(Clone)]
pub struct Callback(pub Arc<dyn Fn() + Send + Sync>);

impl Callback {
    /// Wrap a closure.
    pub fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Run the callback.
    pub fn call(&self) {
        (self.0)()
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback")
    }
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// What a gesture runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionBundle {
    /// A bare action string, sent to the action trigger.
    Literal(String),
    /// Bundles run in order.
    Sequence(Vec<ActionBundle>),
    /// A tagged directive.
    Directive(Directive),
    /// One item picked per use.
    Sequencer(Sequencer),
    /// Code-supplied callback.
    Callback(Callback),
}

impl ActionBundle {
    /// Read a bundle from a configuration value.
    ///
    /// Strings become literals, sequences recurse, and a mapping must have
    /// exactly one key naming its tag. `pseq` and `rpseq` build round-robin
    /// and random sequencers. Any other shape is an error.
    pub fn from_value(v: &Value) -> Result<Self, BundleError> {
        match v {
            Value::String(s) => Ok(Self::Literal(s.clone())),
            Value::Array(items) => Ok(Self::Sequence(
                items.iter().map(Self::from_value).collect::<Result<_, _>>()?,
            )),
            Value::Object(m) => {
                let mut entries = m.iter();
                let (Some((tag, payload)), None) = (entries.next(), entries.next()) else {
                    return Err(BundleError(format!(
                        "a tagged action needs exactly one key, got {}",
                        m.len()
                    )));
                };
                match tag.as_str() {
                    "pseq" | "rpseq" => {
                        let order = if tag == "pseq" {
                            Order::RoundRobin
                        } else {
                            Order::Random
                        };
                        let Value::Array(items) = payload else {
                            return Err(BundleError(format!("`{tag}` expects a list")));
                        };
                        let items = items
                            .iter()
                            .map(Self::from_value)
                            .collect::<Result<_, _>>()?;
                        Ok(Self::Sequencer(Sequencer::new(items, order)?))
                    }
                    _ => Ok(Self::Directive(Directive::from_tagged(tag, payload)?)),
                }
            }
            other => Err(BundleError(format!("unsupported action value: {other}"))),
        }
    }

    /// The bundle that runs nothing.
    pub fn empty() -> Self {
        Self::Sequence(Vec::new())
    }
}
