//! Surface Engine
//!
//! The surface engine is the application context for one control surface:
//! - builds every control and encoder from a compiled configuration
//! - owns the mode map and pushes mode changes to dispatchers and bindings
//! - routes gestures to controls and live-set notifications to bindings
//! - lights controls through an [`Effects`] implementation
//! - keeps the expression globals (`this_cs`, `sel_track`, `ring`) in step
//!   with the live set
//!
//! Everything runs on the caller's thread. [`Engine::handle_gesture`] takes
//! one mode snapshot for the whole dispatch, then [`Engine::pump`]s queued
//! mode changes and binding notifications until both queues are empty.
use std::{collections::HashMap, sync::Arc};

mod control;
mod effects;
mod error;
mod host;
mod modes;

use binder::{FeedEvent, FeedbackState, LiveSet};
use crossbeam_channel::{Receiver, Sender, unbounded};
use gestures::{Dispatch, Gesture};
use resolver::{ExecOptions, Globals, Resolver};
use surface_config::{CompiledSurface, ModeSnapshot, Preferences, SurfaceConfig};
use tracing::{debug, info};

pub use control::{Control, Encoder, FeedbackColors, ParamControl, Setup};
pub use effects::{ChannelEffects, Effects, SurfaceEvent};
pub use error::{Error, Result};
pub use host::{Env, Lights, SurfaceHost};
pub use modes::ModeManager;

/// Where a name lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Index into the control table.
    Control(usize),
    /// Index into the encoder table.
    Encoder(usize),
}

/// Engine coordinates modes, controls, encoders and their live bindings.
///
/// Construct via [`Engine::new`], then feed gestures through
/// [`Engine::handle_gesture`] and call [`Engine::pump`] whenever the live set
/// may have changed.
pub struct Engine {
    /// Expression engine shared by every control.
    resolver: Resolver,
    /// Behavior switches.
    preferences: Preferences,
    /// Mode map owner.
    modes: ModeManager,
    /// Mode change queue.
    mode_rx: Receiver<ModeSnapshot>,
    /// The live object graph.
    live: Arc<dyn LiveSet>,
    /// Outbound side effects.
    effects: Box<dyn Effects>,
    /// Binding notification queue, sending half kept for retargeting.
    feed_tx: Sender<FeedEvent>,
    /// Binding notification queue.
    feed_rx: Receiver<FeedEvent>,
    /// Controls, sections first.
    controls: Vec<Control>,
    /// Encoders in declaration order.
    encoders: Vec<Encoder>,
    /// Name lookup for controls and encoders.
    index: HashMap<String, Slot>,
}

impl Engine {
    /// Compile `config` and build an engine over `live`.
    pub fn new(
        config: &SurfaceConfig,
        live: Arc<dyn LiveSet>,
        effects: Box<dyn Effects>,
    ) -> Result<Self> {
        let surface = config.compile()?;
        Self::from_compiled(
            surface,
            &config.modes,
            config.preferences,
            live,
            effects,
        )
    }

    /// Build an engine from already compiled definitions.
    ///
    /// Every binding is resolved once and every control lit before this
    /// returns.
    pub fn from_compiled(
        surface: CompiledSurface,
        modes: &[String],
        preferences: Preferences,
        live: Arc<dyn LiveSet>,
        effects: Box<dyn Effects>,
    ) -> Result<Self> {
        let mut resolver = Resolver::new()?;
        resolver.set_globals(live_globals(&surface.name, live.as_ref()));
        let mut modes = ModeManager::new(modes.iter().cloned());
        let mode_rx = modes.subscribe();
        let (feed_tx, feed_rx) = unbounded();
        let snapshot = modes.snapshot();

        let setup = Setup {
            resolver: &resolver,
            modes: &snapshot,
            feed_tx: &feed_tx,
            preferences,
        };
        let controls = surface
            .controls
            .into_iter()
            .map(|def| Control::build(def, &setup))
            .collect::<surface_config::Result<Vec<_>>>()?;
        let encoders = surface
            .encoders
            .into_iter()
            .map(|def| Encoder::build(def, &setup))
            .collect::<surface_config::Result<Vec<_>>>()?;

        let mut index = HashMap::new();
        let names = controls
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name().to_string(), Slot::Control(i)))
            .chain(
                encoders
                    .iter()
                    .enumerate()
                    .map(|(i, e)| (e.name().to_string(), Slot::Encoder(i))),
            );
        for (name, slot) in names {
            if index.insert(name.clone(), slot).is_some() {
                return Err(surface_config::Error::critical(format!(
                    "multiple definitions for {name}"
                ))
                .at(name)
                .into());
            }
        }

        let mut engine = Self {
            resolver,
            preferences,
            modes,
            mode_rx,
            live,
            effects,
            feed_tx,
            feed_rx,
            controls,
            encoders,
            index,
        };
        engine.apply_modes(&snapshot);
        engine.redraw();
        engine.pump();
        info!(
            controls = engine.controls.len(),
            encoders = engine.encoders.len(),
            modes = engine.modes.declared().len(),
            "engine_ready"
        );
        Ok(engine)
    }

    /// Surface name, as expressions see it in `this_cs`.
    pub fn name(&self) -> &str {
        &self.resolver.globals().surface
    }

    /// Behavior switches.
    pub fn preferences(&self) -> Preferences {
        self.preferences
    }

    /// The mode map.
    pub fn modes(&self) -> &ModeManager {
        &self.modes
    }

    /// The live object graph.
    pub fn live(&self) -> &dyn LiveSet {
        self.live.as_ref()
    }

    /// Every control, sections first.
    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    /// Every encoder.
    pub fn encoders(&self) -> &[Encoder] {
        &self.encoders
    }

    /// Look up a control.
    pub fn control(&self, name: &str) -> Option<&Control> {
        match self.index.get(name)? {
            Slot::Control(i) => self.controls.get(*i),
            Slot::Encoder(_) => None,
        }
    }

    /// Look up an encoder.
    pub fn encoder(&self, name: &str) -> Option<&Encoder> {
        match self.index.get(name)? {
            Slot::Encoder(i) => self.encoders.get(*i),
            Slot::Control(_) => None,
        }
    }

    /// A fresh sender for the binding notification queue.
    pub fn feed_sender(&self) -> Sender<FeedEvent> {
        self.feed_tx.clone()
    }

    /// Find a name.
    fn slot(&self, name: &str) -> Result<Slot> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownControl {
                name: name.to_string(),
            })
    }

    /// Feed one gesture to `control`.
    ///
    /// Queued notifications are pumped afterwards, whether or not the
    /// dispatch succeeded.
    pub fn handle_gesture(
        &mut self,
        control: &str,
        gesture: Gesture,
        velocity: u8,
    ) -> Result<Dispatch> {
        let Slot::Control(i) = self.slot(control)? else {
            return Err(Error::UnknownControl {
                name: control.to_string(),
            });
        };
        debug!(control, %gesture, velocity, "gesture");
        self.sync_globals();
        let snapshot = self.modes.snapshot();
        let mut env = Env {
            resolver: &self.resolver,
            modes: &mut self.modes,
            live: self.live.as_ref(),
            effects: self.effects.as_ref(),
            options: ExecOptions {
                abort_on_failure: self.preferences.abort_on_failure,
            },
            refresh: false,
        };
        let outcome = self.controls[i].handle(gesture, velocity, &snapshot, &mut env);
        let refresh = env.refresh;
        if refresh {
            self.redraw();
        }
        self.pump();
        Ok(outcome?)
    }

    /// Drop any outstanding press on `control`, as when it leaves view.
    pub fn force_release(&mut self, control: &str) -> Result<()> {
        if let Slot::Control(i) = self.slot(control)? {
            self.controls[i].force_release();
        }
        Ok(())
    }

    /// Turn a mode on. Returns true if it was off.
    pub fn add_mode(&mut self, mode: &str) -> Result<bool> {
        let changed = self.modes.add(mode)?;
        self.pump();
        Ok(changed)
    }

    /// Turn a mode off. Returns true if it was on.
    pub fn remove_mode(&mut self, mode: &str) -> Result<bool> {
        let changed = self.modes.remove(mode)?;
        self.pump();
        Ok(changed)
    }

    /// Flip a mode. Returns its new state.
    pub fn toggle_mode(&mut self, mode: &str) -> Result<bool> {
        let on = self.modes.toggle(mode)?;
        self.pump();
        Ok(on)
    }

    /// Replace the target of an existing mode slot and rebind.
    ///
    /// `target` is compiled against the owner's variables and context.
    pub fn override_binding(
        &mut self,
        owner: &str,
        target: &str,
        mode: &str,
    ) -> Result<FeedbackState> {
        self.retarget(owner, target, Some(mode))
    }

    /// Bind a one-off target until the next mode change.
    pub fn bind_ad_hoc(&mut self, owner: &str, target: &str) -> Result<FeedbackState> {
        self.retarget(owner, target, None)
    }

    /// Shared body of [`Self::override_binding`] and [`Self::bind_ad_hoc`].
    fn retarget(&mut self, owner: &str, target: &str, slot: Option<&str>) -> Result<FeedbackState> {
        self.sync_globals();
        let live = self.live.as_ref();
        let state = match self.slot(owner)? {
            Slot::Control(i) => self.controls[i].retarget(
                &self.resolver,
                target,
                slot,
                live,
                self.effects.as_ref(),
            )?,
            Slot::Encoder(i) => self.encoders[i].retarget(&self.resolver, target, slot, live)?,
        };
        self.pump();
        Ok(state)
    }

    /// Relight every control with its idle color.
    pub fn redraw(&self) {
        for c in &self.controls {
            c.redraw(self.effects.as_ref());
        }
    }

    /// Deliver queued mode changes and binding notifications.
    ///
    /// Runs until both queues are empty and returns the number of items
    /// handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        loop {
            self.sync_globals();
            let mut progressed = false;
            while let Ok(snapshot) = self.mode_rx.try_recv() {
                self.apply_modes(&snapshot);
                handled += 1;
                progressed = true;
            }
            while let Ok(event) = self.feed_rx.try_recv() {
                self.route(event);
                handled += 1;
                progressed = true;
            }
            if !progressed {
                return handled;
            }
        }
    }

    /// Refresh the expression globals from the live set.
    fn sync_globals(&mut self) {
        let globals = live_globals(self.name(), self.live.as_ref());
        self.resolver.set_globals(globals);
    }

    /// Push a mode snapshot to every control and encoder.
    fn apply_modes(&mut self, snapshot: &ModeSnapshot) {
        let live = self.live.as_ref();
        let effects = self.effects.as_ref();
        for c in &mut self.controls {
            c.modes_changed(snapshot, live, effects);
        }
        for e in &mut self.encoders {
            e.modes_changed(snapshot, live);
        }
    }

    /// Deliver one binding notification to its owner.
    fn route(&mut self, event: FeedEvent) {
        let live = self.live.as_ref();
        match self.index.get(&event.owner) {
            Some(Slot::Control(i)) => {
                self.controls[*i].notify(event.topic, live, self.effects.as_ref());
            }
            Some(Slot::Encoder(i)) => {
                self.encoders[*i].notify(event.topic, live);
            }
            None => debug!(owner = %event.owner, "feed_event_without_owner"),
        }
    }
}

/// Expression globals for surface `name` as `live` stands now.
fn live_globals(name: &str, live: &dyn LiveSet) -> Globals {
    Globals {
        surface: name.to_string(),
        selected_track: live.selected_track().and_then(|t| live.track_name(t)),
        ring_offset: live.ring_offset(),
    }
}
