//! Mode snapshots and canonical mode keys.

use std::collections::BTreeMap;

use serde::Serialize;

/// Separator between gesture names and mode names in configuration keys.
pub const KEY_SEPARATOR: &str = "__";

/// Binding-table key used when no mode-specific entry applies.
pub const DEFAULT_KEY: &str = "default";

/// An immutable copy of the mode map, taken once per triggering event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModeSnapshot {
    /// Every declared mode and whether it is active.
    modes: BTreeMap<String, bool>,
}

impl ModeSnapshot {
    /// A snapshot of `states`.
    pub fn new(states: impl IntoIterator<Item = (String, bool)>) -> Self {
        Self {
            modes: states.into_iter().collect(),
        }
    }

    /// A snapshot where exactly the modes in `active` are on.
    pub fn with_active<'a>(
        declared: impl IntoIterator<Item = &'a str>,
        active: &[&str],
    ) -> Self {
        Self::new(
            declared
                .into_iter()
                .map(|m| (m.to_string(), active.contains(&m))),
        )
    }

    /// True if `mode` is declared and on.
    pub fn is_active(&self, mode: &str) -> bool {
        self.modes.get(mode).copied().unwrap_or(false)
    }

    /// True if `mode` is declared.
    pub fn is_declared(&self, mode: &str) -> bool {
        self.modes.contains_key(mode)
    }

    /// Declared modes, sorted.
    pub fn declared(&self) -> impl Iterator<Item = &str> {
        self.modes.keys().map(String::as_str)
    }

    /// Active modes, sorted.
    pub fn active(&self) -> impl Iterator<Item = &str> {
        self.modes
            .iter()
            .filter(|(_, on)| **on)
            .map(|(m, _)| m.as_str())
    }

    /// The canonical string for the active subset of `concerned`.
    ///
    /// Empty when none of them is active.
    pub fn mode_string<S: AsRef<str>>(&self, concerned: &[S]) -> String {
        mode_key(
            concerned
                .iter()
                .map(AsRef::as_ref)
                .filter(|m| self.is_active(m)),
        )
    }
}

/// Canonical key for a set of mode names: sorted, de-duplicated, `__`-joined.
pub fn mode_key<'a>(modes: impl IntoIterator<Item = &'a str>) -> String {
    let mut v: Vec<&str> = modes.into_iter().filter(|m| !m.is_empty()).collect();
    v.sort_unstable();
    v.dedup();
    v.join(KEY_SEPARATOR)
}

/// Split a canonical (or unsorted) key into its mode names.
pub fn split_key(key: &str) -> Vec<&str> {
    key.split(KEY_SEPARATOR).filter(|m| !m.is_empty()).collect()
}
