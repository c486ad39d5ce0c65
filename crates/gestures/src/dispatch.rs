use std::fmt;

use resolver::{ActionHost, ExecError, ExecOptions, Resolver, execute_command_bundle};
use surface_config::{Cascade, Context, ControlSettings, DEFAULT_ON_THRESHOLD, Map, ModeSnapshot};
use tracing::{debug, trace};

use crate::{Entry, Gesture, GestureTable};

/// Transient visual feedback after a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Animation {
    /// Every selected bundle ran.
    Success,
    /// A bundle failed.
    Failure,
}

/// A running animation that can be stopped early.
pub trait AnimationHandle {
    /// Stop the animation.
    fn cancel(&mut self);
}

/// Drives a control's lights.
pub trait Animator {
    /// Start a transient animation for `control`.
    fn start(&mut self, control: &str, kind: Animation) -> Box<dyn AnimationHandle>;

    /// Show or clear the "mode active" attention state.
    fn set_attention(&mut self, control: &str, on: bool);
}

/// Holds at most one running animation.
#[derive(Default)]
pub struct AnimationSlot {
    /// The running animation, if any.
    current: Option<Box<dyn AnimationHandle>>,
}

impl AnimationSlot {
    /// Cancel any running animation, then start and hold the next one.
    pub fn replace(&mut self, start: impl FnOnce() -> Box<dyn AnimationHandle>) {
        self.cancel();
        self.current = Some(start());
    }

    /// Cancel the running animation.
    pub fn cancel(&mut self) {
        if let Some(mut h) = self.current.take() {
            h.cancel();
        }
    }

    /// True while an animation is held.
    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }
}

impl fmt::Debug for AnimationSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationSlot")
            .field("running", &self.is_running())
            .finish()
    }
}

/// Everything a dispatch needs to run its bundles.
pub struct Invocation<'a> {
    /// Expression engine.
    pub resolver: &'a Resolver,
    /// Collaborators directives act on.
    pub host: &'a mut dyn ActionHost,
    /// The control's variable declarations.
    pub vars: &'a Map,
    /// The control's evaluation namespace.
    pub context: &'a Context,
    /// Failure policy.
    pub options: ExecOptions,
}

/// Result of feeding one gesture to a dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// The gesture did not register (threshold, no press, dropped).
    Ignored,
    /// The gesture registered but no entry matched.
    Unmatched,
    /// `fired` bundles ran.
    Fired {
        /// Number of bundles executed.
        fired: usize,
    },
}

/// Per-control gesture state and dispatch.
#[derive(Debug)]
pub struct Dispatcher {
    /// Control name, for logs and animations.
    name: String,
    /// The control's gesture table.
    table: GestureTable,
    /// Physically held.
    pressed: bool,
    /// Last press registered above threshold; gates off-class gestures.
    armed: bool,
    /// Intensity of the most recent press.
    velocity: u8,
    /// Canonical string of active concerned modes.
    mode_string: String,
    /// Cascade direction.
    cascade: Cascade,
    /// Minimum intensity for on-class gestures.
    threshold: u8,
    /// Collapse on/off into a single `pressed`.
    fake_momentary: bool,
    /// Skip success/failure animations.
    suppress_animations: bool,
    /// The running animation.
    animation: AnimationSlot,
}

impl Dispatcher {
    /// Build a dispatcher for `name` from its table and settings.
    ///
    /// `default_threshold` applies when the settings name no threshold.
    pub fn new(
        name: impl Into<String>,
        table: GestureTable,
        settings: &ControlSettings,
        default_threshold: u8,
    ) -> Self {
        Self {
            name: name.into(),
            table,
            pressed: false,
            armed: false,
            velocity: 0,
            mode_string: String::new(),
            cascade: settings.cascade,
            threshold: settings.on_threshold.unwrap_or(default_threshold),
            fake_momentary: settings.fake_momentary,
            suppress_animations: settings.suppress_animations.unwrap_or(false),
            animation: AnimationSlot::default(),
        }
    }

    /// A dispatcher using the default threshold.
    pub fn with_defaults(
        name: impl Into<String>,
        table: GestureTable,
        settings: &ControlSettings,
    ) -> Self {
        Self::new(name, table, settings, DEFAULT_ON_THRESHOLD)
    }

    /// Control name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The gesture table.
    pub fn table(&self) -> &GestureTable {
        &self.table
    }

    /// True while the control is held.
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Intensity of the most recent registered press.
    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    /// Canonical string of active concerned modes.
    pub fn mode_string(&self) -> &str {
        &self.mode_string
    }

    /// Cascade direction.
    pub fn cascade(&self) -> Cascade {
        self.cascade
    }

    /// Change the cascade direction.
    pub fn set_cascade(&mut self, cascade: Cascade) {
        self.cascade = cascade;
    }

    /// Recompute the mode string. Returns true when attention flipped.
    pub fn modes_changed(&mut self, snapshot: &ModeSnapshot, animator: &mut dyn Animator) -> bool {
        let next = snapshot.mode_string(self.table.concerned_modes());
        let flipped = next.is_empty() != self.mode_string.is_empty();
        if next != self.mode_string {
            trace!(control = %self.name, modes = %next, "mode_string");
        }
        self.mode_string = next;
        if flipped {
            animator.set_attention(&self.name, !self.mode_string.is_empty());
        }
        flipped
    }

    /// Drop any outstanding press, as when the control leaves view.
    pub fn force_release(&mut self) {
        self.pressed = false;
        self.armed = false;
        self.animation.cancel();
    }

    /// Apply press tracking, threshold and fake-momentary rules.
    ///
    /// Returns the gesture to dispatch, or `None` when it does not register.
    pub fn register(&mut self, gesture: Gesture, velocity: u8) -> Option<Gesture> {
        if self.fake_momentary {
            return match gesture {
                Gesture::Pressed => {
                    self.velocity = velocity;
                    Some(Gesture::Pressed)
                }
                Gesture::Released => Some(Gesture::Pressed),
                _ => None,
            };
        }
        if gesture.is_on() {
            if velocity < self.threshold {
                if gesture == Gesture::Pressed {
                    self.armed = false;
                }
                return None;
            }
            if gesture == Gesture::Pressed {
                self.pressed = true;
                self.armed = true;
                self.velocity = velocity;
            }
            return Some(gesture);
        }
        if gesture == Gesture::Released {
            self.pressed = false;
        }
        self.armed.then_some(gesture)
    }

    /// Entries that would fire, without running anything.
    pub fn dry_run(&self, gesture: Gesture, snapshot: &ModeSnapshot) -> Vec<&Entry> {
        self.table.select(gesture, snapshot, self.cascade)
    }

    /// Feed one gesture: register it, select entries and run their bundles.
    ///
    /// The snapshot is taken by the caller once for the whole event. On
    /// failure the error from the first failing bundle is returned after the
    /// failure animation starts.
    pub fn handle(
        &mut self,
        gesture: Gesture,
        velocity: u8,
        snapshot: &ModeSnapshot,
        inv: Invocation<'_>,
        animator: &mut dyn Animator,
    ) -> Result<Dispatch, ExecError> {
        let Some(gesture) = self.register(gesture, velocity) else {
            return Ok(Dispatch::Ignored);
        };
        let selected = self.table.select(gesture, snapshot, self.cascade);
        if selected.is_empty() {
            return Ok(Dispatch::Unmatched);
        }

        let Invocation {
            resolver,
            host,
            vars,
            context,
            options,
        } = inv;
        let mut fired = 0;
        for entry in selected {
            debug!(control = %self.name, key = %entry.key, "gesture_fired");
            if let Err(e) =
                execute_command_bundle(resolver, host, &entry.bundle, vars, context, options)
            {
                if !self.suppress_animations {
                    self.animation
                        .replace(|| animator.start(&self.name, Animation::Failure));
                }
                return Err(e);
            }
            fired += 1;
        }
        if !self.suppress_animations {
            self.animation
                .replace(|| animator.start(&self.name, Animation::Success));
        }
        Ok(Dispatch::Fired { fired })
    }
}
