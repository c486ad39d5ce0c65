//! The action host and animator handed to a dispatching control.

use binder::{Binding, LiveSet};
use gestures::{Animation, AnimationHandle, Animator};
use resolver::{ActionHost, ExecOptions, Resolver};
use serde_json::Value;

use crate::{Effects, ModeManager};

/// Engine state a control borrows while it handles one event.
pub struct Env<'a> {
    /// Expression engine.
    pub resolver: &'a Resolver,
    /// The mode map's single writer.
    pub modes: &'a mut ModeManager,
    /// The live object graph.
    pub live: &'a dyn LiveSet,
    /// Outbound side effects.
    pub effects: &'a dyn Effects,
    /// Bundle failure policy.
    pub options: ExecOptions,
    /// Set when a bundle asked for a full redraw.
    pub refresh: bool,
}

/// [`ActionHost`] for one control.
pub struct SurfaceHost<'a> {
    /// Outbound side effects.
    pub effects: &'a dyn Effects,
    /// Mode writer for `mode`, `mode_on` and `mode_off`.
    pub modes: &'a mut ModeManager,
    /// The dispatching control.
    pub control: &'a str,
    /// Its binding, for `do_toggle`.
    pub binding: Option<&'a Binding>,
    /// The live object graph.
    pub live: &'a dyn LiveSet,
    /// Color restored by `{"color": "initial"}`.
    pub initial_color: Option<&'a Value>,
    /// Set by `refresh`.
    pub refresh: bool,
}

impl ActionHost for SurfaceHost<'_> {
    fn trigger_action(&mut self, action: &str) {
        self.effects.trigger_action(action);
    }

    fn show_message(&mut self, text: &str) {
        self.effects.show_message(text);
    }

    fn request_page(&mut self, page: &str) -> bool {
        self.effects.request_page(page)
    }

    fn return_to_last_page(&mut self) {
        self.effects.return_to_last_page();
    }

    fn refresh(&mut self) {
        self.refresh = true;
        self.effects.refresh();
    }

    fn add_mode(&mut self, mode: &str) -> Result<(), String> {
        self.modes.add(mode).map(drop).map_err(|e| e.to_string())
    }

    fn remove_mode(&mut self, mode: &str) -> Result<(), String> {
        self.modes.remove(mode).map(drop).map_err(|e| e.to_string())
    }

    fn toggle_mode(&mut self, mode: &str) -> Result<(), String> {
        self.modes.toggle(mode).map(drop).map_err(|e| e.to_string())
    }

    fn set_color(&mut self, color: &Value) -> Result<(), String> {
        if color.as_str() == Some("initial") {
            let initial = self
                .initial_color
                .ok_or_else(|| format!("{} has no initial color", self.control))?;
            self.effects.set_color(self.control, initial);
        } else {
            self.effects.set_color(self.control, color);
        }
        Ok(())
    }

    fn toggle_target(&mut self) -> Result<(), String> {
        match self.binding {
            Some(b) => b.toggle(self.live).map_err(|e| e.to_string()),
            None => Err("`do_toggle` is only available on `param` controls".into()),
        }
    }
}

/// [`Animator`] over the engine's effects.
pub struct Lights<'a>(pub &'a dyn Effects);

impl Animator for Lights<'_> {
    fn start(&mut self, control: &str, kind: Animation) -> Box<dyn AnimationHandle> {
        self.0.start_animation(control, kind)
    }

    fn set_attention(&mut self, control: &str, on: bool) {
        self.0.set_attention(control, on);
    }
}
