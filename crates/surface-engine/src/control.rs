//! Per-control and per-encoder runtime state.

use std::result::Result as StdResult;

use binder::{
    BindOptions, Binding, BindingTable, FeedEvent, FeedbackState, LiveSet, Notifier, Topic,
    compile_target,
};
use crossbeam_channel::Sender;
use gestures::{Dispatch, Dispatcher, Gesture, GestureTable, Invocation};
use resolver::{ExecError, Resolver};
use serde_json::Value;
use surface_config::{
    Context, ControlDefinition, ControlSettings, EncoderDefinition, Error as ConfigError, Map,
    ModeSnapshot, Preferences,
};
use tracing::{debug, trace, warn};

use crate::{
    Effects, Error, Result,
    host::{Env, Lights, SurfaceHost},
};

/// Shared inputs for building controls and encoders.
pub struct Setup<'a> {
    /// Expression engine for templated binding targets.
    pub resolver: &'a Resolver,
    /// Declared modes, all off.
    pub modes: &'a ModeSnapshot,
    /// Queue binding notifications are delivered to.
    pub feed_tx: &'a Sender<FeedEvent>,
    /// Behavior switches.
    pub preferences: Preferences,
}

/// Colors a bound control shows for each feedback state.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackColors {
    /// Target on or at max.
    pub on: Value,
    /// Target off or at min.
    pub off: Value,
    /// Nothing bound.
    pub disabled: Value,
}

impl FeedbackColors {
    /// `on_color` (else `color`, else 127), `off_color` (else 1) and
    /// `disabled_color` (else 0).
    pub fn from_settings(s: &ControlSettings) -> Self {
        Self {
            on: s
                .on_color
                .clone()
                .or_else(|| s.color.clone())
                .unwrap_or_else(|| Value::from(127)),
            off: s.off_color.clone().unwrap_or_else(|| Value::from(1)),
            disabled: s.disabled_color.clone().unwrap_or_else(|| Value::from(0)),
        }
    }

    /// The color for `state`.
    pub fn for_state(&self, state: FeedbackState) -> &Value {
        match state {
            FeedbackState::On => &self.on,
            FeedbackState::Off => &self.off,
            FeedbackState::Disabled => &self.disabled,
        }
    }
}

/// The binding half of a `param` control.
#[derive(Debug)]
pub struct ParamControl {
    /// Live binding.
    binding: Binding,
    /// Toggle the target on `pressed`.
    toggle_on_press: bool,
    /// Feedback colors.
    colors: FeedbackColors,
    /// Last state shown.
    feedback: Option<FeedbackState>,
}

impl ParamControl {
    /// Live binding.
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// True when `pressed` toggles the target.
    pub fn toggles_on_press(&self) -> bool {
        self.toggle_on_press
    }

    /// Feedback colors.
    pub fn colors(&self) -> &FeedbackColors {
        &self.colors
    }
}

/// One control: a gesture dispatcher, plus a binding for `param` controls.
#[derive(Debug)]
pub struct Control {
    /// Merged definition.
    definition: ControlDefinition,
    /// Evaluation namespace, updated with runtime properties.
    context: Context,
    /// Gesture state.
    dispatcher: Dispatcher,
    /// Binding state, for `param` controls.
    param: Option<ParamControl>,
}

impl Control {
    /// Build a control, replacing it with a placeholder on a recoverable error.
    pub fn build(def: ControlDefinition, setup: &Setup<'_>) -> surface_config::Result<Self> {
        match parts(&def, setup) {
            Ok((dispatcher, param)) => Ok(Self::assemble(def, dispatcher, param)),
            Err(e) => {
                let e = setup.preferences.policy().escalate(e.at(def.name.clone()));
                if e.is_critical() {
                    return Err(e);
                }
                warn!(control = %def.name, error = %e, "control_replaced_with_placeholder");
                let def = ControlDefinition::placeholder(def.name, &def.section, def.position, e);
                let (dispatcher, param) = parts(&def, setup)?;
                Ok(Self::assemble(def, dispatcher, param))
            }
        }
    }

    /// Put the pieces together.
    fn assemble(
        definition: ControlDefinition,
        dispatcher: Dispatcher,
        param: Option<ParamControl>,
    ) -> Self {
        Self {
            context: definition.context.clone(),
            definition,
            dispatcher,
            param,
        }
    }

    /// Control name.
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Merged definition.
    pub fn definition(&self) -> &ControlDefinition {
        &self.definition
    }

    /// Current evaluation namespace.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Gesture state.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Binding state, for `param` controls.
    pub fn param(&self) -> Option<&ParamControl> {
        self.param.as_ref()
    }

    /// The live binding, for `param` controls.
    pub fn binding(&self) -> Option<&Binding> {
        self.param.as_ref().map(|p| &p.binding)
    }

    /// Last feedback shown, for `param` controls.
    pub fn feedback(&self) -> Option<FeedbackState> {
        self.param.as_ref().and_then(|p| p.feedback)
    }

    /// True for stand-ins created after a configuration error.
    pub fn is_placeholder(&self) -> bool {
        self.definition.is_placeholder()
    }

    /// The color shown while idle: feedback for bound controls, else `color`.
    pub fn idle_color(&self) -> Option<Value> {
        match &self.param {
            Some(p) => Some(
                p.colors
                    .for_state(p.feedback.unwrap_or(FeedbackState::Disabled))
                    .clone(),
            ),
            None => self.definition.settings.color.clone(),
        }
    }

    /// Relight with the idle color.
    pub fn redraw(&self, effects: &dyn Effects) {
        if let Some(color) = self.idle_color() {
            effects.set_color(self.name(), &color);
        }
    }

    /// Handle one gesture under `snapshot`.
    ///
    /// A registered `pressed` on a toggling `param` control also flips the
    /// bound target once the bundles have run.
    pub fn handle(
        &mut self,
        gesture: Gesture,
        velocity: u8,
        snapshot: &ModeSnapshot,
        env: &mut Env<'_>,
    ) -> StdResult<Dispatch, ExecError> {
        if gesture.is_on() {
            self.context.set_velocity(velocity);
        }
        let initial = self.idle_color();
        let mut host = SurfaceHost {
            effects: env.effects,
            modes: &mut *env.modes,
            control: &self.definition.name,
            binding: self.param.as_ref().map(|p| &p.binding),
            live: env.live,
            initial_color: initial.as_ref(),
            refresh: false,
        };
        let inv = Invocation {
            resolver: env.resolver,
            host: &mut host,
            vars: &self.definition.settings.vars,
            context: &self.context,
            options: env.options,
        };
        let outcome =
            self.dispatcher
                .handle(gesture, velocity, snapshot, inv, &mut Lights(env.effects));
        env.refresh |= host.refresh;

        let registered = matches!(outcome, Ok(Dispatch::Unmatched | Dispatch::Fired { .. }));
        // A fake-momentary release is the switch's second press and toggles too.
        let press = gesture == Gesture::Pressed
            || (self.definition.settings.fake_momentary && gesture == Gesture::Released);
        if registered
            && press
            && let Some(p) = &self.param
            && p.toggle_on_press
            && let Err(e) = p.binding.toggle(env.live)
        {
            debug!(control = %self.definition.name, error = %e, "toggle_skipped");
        }
        outcome
    }

    /// Drop any outstanding press.
    pub fn force_release(&mut self) {
        self.dispatcher.force_release();
    }

    /// React to a mode change: attention state, then binding slot.
    pub fn modes_changed(
        &mut self,
        snapshot: &ModeSnapshot,
        live: &dyn LiveSet,
        effects: &dyn Effects,
    ) {
        self.dispatcher.modes_changed(snapshot, &mut Lights(effects));
        let state = self
            .param
            .as_mut()
            .and_then(|p| p.binding.modes_changed(snapshot, live));
        if let Some(state) = state {
            self.show(state, live, effects);
        }
    }

    /// Deliver a live-set notification. Returns false for stale topics.
    pub fn notify(&mut self, topic: Topic, live: &dyn LiveSet, effects: &dyn Effects) -> bool {
        let Some(p) = &mut self.param else {
            return false;
        };
        if !p.binding.topics().contains(&topic) {
            trace!(control = %self.definition.name, ?topic, "stale_feed_event");
            return false;
        }
        let state = p.binding.notify(topic, live);
        self.show(state, live, effects);
        true
    }

    /// Compile `raw` and bind it into `slot`, or ad hoc when `slot` is `None`.
    pub fn retarget(
        &mut self,
        resolver: &Resolver,
        raw: &str,
        slot: Option<&str>,
        live: &dyn LiveSet,
        effects: &dyn Effects,
    ) -> Result<FeedbackState> {
        let Some(p) = &mut self.param else {
            return Err(Error::Unbound {
                name: self.definition.name.clone(),
            });
        };
        let state = retarget(
            &mut p.binding,
            resolver,
            raw,
            &self.definition.settings.vars,
            &self.context,
            slot,
            live,
        )?;
        self.show(state, live, effects);
        Ok(state)
    }

    /// Record a feedback state, relighting the control when it changed.
    fn show(&mut self, state: FeedbackState, live: &dyn LiveSet, effects: &dyn Effects) {
        let Some(p) = &mut self.param else {
            return;
        };
        self.context.set_track_name(bound_track_name(&p.binding, live).as_deref());
        if p.feedback == Some(state) {
            return;
        }
        debug!(control = %self.definition.name, ?state, "feedback_changed");
        p.feedback = Some(state);
        effects.set_color(&self.definition.name, p.colors.for_state(state));
    }
}

/// Build the dispatcher and, for `param` controls, the binding.
fn parts(
    def: &ControlDefinition,
    setup: &Setup<'_>,
) -> surface_config::Result<(Dispatcher, Option<ParamControl>)> {
    let s = &def.settings;
    let table = GestureTable::from_config(&s.gestures, setup.modes)
        .map_err(|e| ConfigError::from(e).at(def.name.clone()))?;
    let dispatcher = Dispatcher::new(
        def.name.clone(),
        table,
        s,
        setup.preferences.on_threshold,
    );
    let param = match def.kind() {
        "basic" => None,
        "param" => {
            let Some(raw) = &s.binding else {
                return Err(
                    ConfigError::config("`param` controls need a `binding`").at(def.name.clone())
                );
            };
            let table =
                BindingTable::from_config(raw, setup.resolver, &s.vars, &def.context, setup.modes)
                    .map_err(|e| ConfigError::from(e).at(def.name.clone()))?;
            let options = BindOptions {
                unbind_on_fail: s.unbind_on_fail.unwrap_or(true),
                log_failed_bindings: setup.preferences.log_failed_bindings,
                ..Default::default()
            };
            Some(ParamControl {
                binding: Binding::new(
                    table,
                    options,
                    Notifier::new(def.name.clone(), setup.feed_tx.clone()),
                ),
                toggle_on_press: s.toggle_param.unwrap_or(true),
                colors: FeedbackColors::from_settings(s),
                feedback: None,
            })
        }
        other => {
            return Err(
                ConfigError::config(format!("unknown control type `{other}`")).at(def.name.clone())
            );
        }
    };
    Ok((dispatcher, param))
}

/// Name of the track a binding is on.
fn bound_track_name(binding: &Binding, live: &dyn LiveSet) -> Option<String> {
    binding
        .target()
        .and_then(|t| t.track())
        .and_then(|t| live.track_name(t))
}

/// Compile a target and install it in `binding`.
fn retarget(
    binding: &mut Binding,
    resolver: &Resolver,
    raw: &str,
    vars: &Map,
    context: &Context,
    slot: Option<&str>,
    live: &dyn LiveSet,
) -> Result<FeedbackState> {
    let desc = compile_target(resolver, raw, vars, context)?;
    Ok(match slot {
        Some(mode) => binding.override_binding(desc, mode, live)?,
        None => binding.bind_ad_hoc(desc, live),
    })
}

/// One encoder and its binding.
#[derive(Debug)]
pub struct Encoder {
    /// Merged definition.
    definition: EncoderDefinition,
    /// Evaluation namespace, updated with runtime properties.
    context: Context,
    /// Live binding.
    binding: Binding,
}

impl Encoder {
    /// Build an encoder. A recoverable error leaves it with no targets.
    pub fn build(def: EncoderDefinition, setup: &Setup<'_>) -> surface_config::Result<Self> {
        let s = &def.settings;
        let table = match &s.binding {
            None => Ok(BindingTable::default()),
            Some(raw) => {
                BindingTable::from_config(raw, setup.resolver, &s.vars, &def.context, setup.modes)
            }
        };
        let table = match table {
            Ok(t) => t,
            Err(e) => {
                let e = setup
                    .preferences
                    .policy()
                    .escalate(ConfigError::from(e).at(def.name.clone()));
                if e.is_critical() {
                    return Err(e);
                }
                warn!(encoder = %def.name, error = %e, "encoder_unbound");
                BindingTable::default()
            }
        };
        let options = BindOptions {
            unbind_on_fail: s.unbind_on_fail.unwrap_or(true),
            log_failed_bindings: setup.preferences.log_failed_bindings,
            prefer_left: s.prefer_left.unwrap_or(true),
        };
        let binding = Binding::new(
            table,
            options,
            Notifier::new(def.name.clone(), setup.feed_tx.clone()),
        );
        Ok(Self {
            context: def.context.clone(),
            definition: def,
            binding,
        })
    }

    /// Encoder name.
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Merged definition.
    pub fn definition(&self) -> &EncoderDefinition {
        &self.definition
    }

    /// Current evaluation namespace.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Live binding.
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// React to a mode change.
    pub fn modes_changed(&mut self, snapshot: &ModeSnapshot, live: &dyn LiveSet) {
        if let Some(state) = self.binding.modes_changed(snapshot, live) {
            self.bound(state, live);
        }
    }

    /// Deliver a live-set notification. Returns false for stale topics.
    pub fn notify(&mut self, topic: Topic, live: &dyn LiveSet) -> bool {
        if !self.binding.topics().contains(&topic) {
            trace!(encoder = %self.definition.name, ?topic, "stale_feed_event");
            return false;
        }
        let state = self.binding.notify(topic, live);
        self.bound(state, live);
        true
    }

    /// Compile `raw` and bind it into `slot`, or ad hoc when `slot` is `None`.
    pub fn retarget(
        &mut self,
        resolver: &Resolver,
        raw: &str,
        slot: Option<&str>,
        live: &dyn LiveSet,
    ) -> Result<FeedbackState> {
        let state = retarget(
            &mut self.binding,
            resolver,
            raw,
            &self.definition.settings.vars,
            &self.context,
            slot,
            live,
        )?;
        self.bound(state, live);
        Ok(state)
    }

    /// Record a rebind result.
    fn bound(&mut self, state: FeedbackState, live: &dyn LiveSet) {
        self.context
            .set_track_name(bound_track_name(&self.binding, live).as_deref());
        debug!(encoder = %self.definition.name, ?state, "encoder_feedback");
    }
}
