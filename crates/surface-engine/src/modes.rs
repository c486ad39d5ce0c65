use std::collections::BTreeSet;

use crossbeam_channel::{Receiver, Sender, unbounded};
use surface_config::ModeSnapshot;
use tracing::{debug, trace};

use crate::{Error, Result};

/// Owner of the mode map.
///
/// The only writer of mode state. Every change is pushed to all subscribers
/// before the writing call returns; readers work from snapshots.
#[derive(Debug, Default)]
pub struct ModeManager {
    /// Declared modes, sorted.
    declared: Vec<String>,
    /// Modes currently on.
    active: BTreeSet<String>,
    /// Change subscribers.
    subscribers: Vec<Sender<ModeSnapshot>>,
}

impl ModeManager {
    /// A manager for `declared` modes, all off.
    pub fn new<S: Into<String>>(declared: impl IntoIterator<Item = S>) -> Self {
        let mut declared: Vec<String> = declared.into_iter().map(Into::into).collect();
        declared.sort_unstable();
        declared.dedup();
        Self {
            declared,
            ..Default::default()
        }
    }

    /// Declared modes, sorted.
    pub fn declared(&self) -> &[String] {
        &self.declared
    }

    /// True if `mode` is on.
    pub fn is_active(&self, mode: &str) -> bool {
        self.active.contains(mode)
    }

    /// An immutable copy of the current state.
    pub fn snapshot(&self) -> ModeSnapshot {
        ModeSnapshot::new(
            self.declared
                .iter()
                .map(|m| (m.clone(), self.active.contains(m))),
        )
    }

    /// Receive a snapshot after every change.
    pub fn subscribe(&mut self) -> Receiver<ModeSnapshot> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Turn `mode` on. Returns true if it was off.
    pub fn add(&mut self, mode: &str) -> Result<bool> {
        self.check(mode)?;
        let changed = self.active.insert(mode.to_string());
        self.changed(mode, changed);
        Ok(changed)
    }

    /// Turn `mode` off. Returns true if it was on.
    pub fn remove(&mut self, mode: &str) -> Result<bool> {
        self.check(mode)?;
        let changed = self.active.remove(mode);
        self.changed(mode, changed);
        Ok(changed)
    }

    /// Flip `mode`. Returns its new state.
    pub fn toggle(&mut self, mode: &str) -> Result<bool> {
        if self.is_active(mode) {
            self.remove(mode).map(|_| false)
        } else {
            self.add(mode).map(|_| true)
        }
    }

    /// Reject undeclared modes.
    fn check(&self, mode: &str) -> Result<()> {
        if self.declared.iter().any(|m| m == mode) {
            Ok(())
        } else {
            Err(Error::UnknownMode {
                mode: mode.to_string(),
            })
        }
    }

    /// Notify subscribers after a write, dropping closed ones.
    fn changed(&mut self, mode: &str, changed: bool) {
        if !changed {
            trace!(mode, "mode_unchanged");
            return;
        }
        debug!(mode, on = self.is_active(mode), "mode_changed");
        let snapshot = self.snapshot();
        self.subscribers
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}
