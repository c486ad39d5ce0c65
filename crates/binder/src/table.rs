use resolver::Resolver;
use serde_json::Value;
use surface_config::{Context, DEFAULT_KEY, Map, ModeSnapshot, mode_key, split_key};
use target_path::TargetDescriptor;

use crate::{Error, Result};

/// Compile a templated target string and parse it.
pub fn compile_target(
    resolver: &Resolver,
    raw: &str,
    vars: &Map,
    context: &Context,
) -> Result<TargetDescriptor> {
    let raw = raw.trim_end_matches('\n');
    let compiled = resolver
        .compile(raw, vars, context)
        .map_err(|_| Error::Unparseable {
            target: raw.to_string(),
        })?;
    let desc = target_path::parse(&compiled);
    match &desc.error {
        Some(message) => Err(Error::BadTarget {
            target: compiled,
            message: message.clone(),
        }),
        None => Ok(desc),
    }
}

/// Mode-scoped alternative targets for one binding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingTable {
    /// `(canonical mode key, descriptor)` in declaration order.
    slots: Vec<(String, TargetDescriptor)>,
    /// Every mode named by a slot key, sorted.
    concerned: Vec<String>,
}

impl BindingTable {
    /// Build a table from already parsed descriptors.
    ///
    /// Keys are canonicalised; `default` stays as is.
    pub fn new(slots: impl IntoIterator<Item = (String, TargetDescriptor)>) -> Self {
        let slots: Vec<(String, TargetDescriptor)> = slots
            .into_iter()
            .map(|(k, d)| (canonical(&k), d))
            .collect();
        let mut concerned: Vec<String> = slots
            .iter()
            .filter(|(k, _)| k != DEFAULT_KEY)
            .flat_map(|(k, _)| split_key(k).into_iter().map(str::to_string))
            .collect();
        concerned.sort_unstable();
        concerned.dedup();
        Self { slots, concerned }
    }

    /// Build a table from a `binding` value.
    ///
    /// A string is the default target. A mapping goes from mode key to a
    /// target string, or to a mapping with a `target` key.
    pub fn from_config(
        binding: &Value,
        resolver: &Resolver,
        vars: &Map,
        context: &Context,
        modes: &ModeSnapshot,
    ) -> Result<Self> {
        let entries: Vec<(&str, &Value)> = match binding {
            Value::String(_) => vec![(DEFAULT_KEY, binding)],
            Value::Object(map) => map.iter().map(|(k, v)| (k.as_str(), v)).collect(),
            other => {
                return Err(Error::InvalidBinding {
                    message: format!("`binding` must be a string or a mapping, got {other}"),
                });
            }
        };

        let mut slots = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            if key != DEFAULT_KEY {
                for mode in split_key(key) {
                    if !modes.is_declared(mode) {
                        return Err(Error::UnknownMode {
                            key: key.to_string(),
                            mode: mode.to_string(),
                        });
                    }
                }
            }
            let raw = match value {
                Value::String(s) => s.as_str(),
                Value::Object(m) => match m.get("target") {
                    Some(Value::String(s)) => s.as_str(),
                    _ => {
                        return Err(Error::InvalidBinding {
                            message: format!("binding '{key}' has no `target` string"),
                        });
                    }
                },
                other => {
                    return Err(Error::InvalidBinding {
                        message: format!("binding '{key}' must be a string or a mapping, got {other}"),
                    });
                }
            };
            slots.push((key.to_string(), compile_target(resolver, raw, vars, context)?));
        }
        Ok(Self::new(slots))
    }

    /// Modes any slot depends on.
    pub fn concerned_modes(&self) -> &[String] {
        &self.concerned
    }

    /// Slots in declaration order.
    pub fn slots(&self) -> &[(String, TargetDescriptor)] {
        &self.slots
    }

    /// True when the table has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The best matching slot key for `snapshot`.
    ///
    /// The slot whose modes are all active and which names the most modes
    /// wins; ties go to the lexically smallest key. `default` when no
    /// mode-scoped slot matches.
    pub fn best_key(&self, snapshot: &ModeSnapshot) -> String {
        self.slots
            .iter()
            .map(|(k, _)| k)
            .filter(|k| k.as_str() != DEFAULT_KEY)
            .map(|k| (k, split_key(k)))
            .filter(|(_, modes)| modes.iter().all(|m| snapshot.is_active(m)))
            .min_by(|(ka, ma), (kb, mb)| mb.len().cmp(&ma.len()).then_with(|| ka.cmp(kb)))
            .map_or_else(|| DEFAULT_KEY.to_string(), |(k, _)| k.clone())
    }

    /// The descriptor for `key`.
    ///
    /// A missing `default` falls back to the first declared slot.
    pub fn lookup(&self, key: &str) -> Option<&TargetDescriptor> {
        let hit = self.slots.iter().find(|(k, _)| k == key).map(|(_, d)| d);
        if hit.is_none() && key == DEFAULT_KEY {
            return self.slots.first().map(|(_, d)| d);
        }
        hit
    }

    /// Replace the descriptor of an existing slot.
    pub fn replace(&mut self, key: &str, desc: TargetDescriptor) -> Result<()> {
        let key = canonical(key);
        match self.slots.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => {
                *slot = desc;
                Ok(())
            }
            None => Err(Error::UnknownSlot { mode: key }),
        }
    }
}

/// Canonical slot key: `default`, or the sorted mode set.
fn canonical(key: &str) -> String {
    if key == DEFAULT_KEY {
        key.to_string()
    } else {
        mode_key(split_key(key))
    }
}
