use std::collections::BTreeSet;

use surface_config::{DEFAULT_KEY, ModeSnapshot};
use target_path::{CrossfadeAssign, MonitorState, TargetDescriptor};
use tracing::{debug, warn};

use crate::{
    BindError, BindingTable, Error, Feed, LiveSet, Notifier, Subject, Subscription, Target, Topic,
    TrackAttribute, TrackFlag, TrackRef, assess_dynamism, resolve,
};

/// What a bound control should display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedbackState {
    /// Target is on, at max, or in the bound position.
    On,
    /// Target is off, at min, or elsewhere.
    Off,
    /// Nothing is bound.
    Disabled,
}

/// Failure and logging policy for one binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindOptions {
    /// Clear the target when a rebind fails.
    pub unbind_on_fail: bool,
    /// Log failed binds at `warn` instead of `debug`.
    pub log_failed_bindings: bool,
    /// Prefer the left-hand parameter of banked pairs.
    pub prefer_left: bool,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            unbind_on_fail: true,
            log_failed_bindings: false,
            prefer_left: true,
        }
    }
}

/// A live association between a control or encoder and a target.
#[derive(Debug)]
pub struct Binding {
    /// Owning control or encoder.
    owner: String,
    /// Mode-scoped descriptors.
    table: BindingTable,
    /// Slot key picked by the last mode change; `None` before the first.
    mode_key: Option<String>,
    /// Descriptor currently bound.
    active: Option<TargetDescriptor>,
    /// The resolved target.
    target: Option<Target>,
    /// Track of the target, kept across a deferred device lookup.
    mapped_track: Option<TrackRef>,
    /// Set while unbound.
    disabled: bool,
    /// Waiting for a device list to load.
    deferred: bool,
    /// Failure policy.
    options: BindOptions,
    /// Live subscriptions, rebuilt whole on every bind.
    subscriptions: Vec<(Topic, Subscription)>,
    /// Delivery handle passed to the live set.
    notifier: Notifier,
}

impl Binding {
    /// A new, unbound binding.
    pub fn new(table: BindingTable, options: BindOptions, notifier: Notifier) -> Self {
        Self {
            owner: notifier.owner().to_string(),
            table,
            mode_key: None,
            active: None,
            target: None,
            mapped_track: None,
            disabled: true,
            deferred: false,
            options,
            subscriptions: Vec::new(),
            notifier,
        }
    }

    /// Owning control or encoder.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The mode table.
    pub fn table(&self) -> &BindingTable {
        &self.table
    }

    /// Slot key currently in effect.
    pub fn mode_key(&self) -> Option<&str> {
        self.mode_key.as_deref()
    }

    /// Descriptor currently bound.
    pub fn active(&self) -> Option<&TargetDescriptor> {
        self.active.as_ref()
    }

    /// The resolved target.
    pub fn target(&self) -> Option<Target> {
        self.target
    }

    /// True while unbound.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// True while waiting for a device list.
    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    /// Topics currently subscribed.
    pub fn topics(&self) -> Vec<Topic> {
        self.subscriptions.iter().map(|(t, _)| *t).collect()
    }

    /// Pick the slot for `snapshot` and rebind if it changed.
    ///
    /// The first call always binds. Returns the new feedback when a bind ran.
    pub fn modes_changed(
        &mut self,
        snapshot: &ModeSnapshot,
        set: &dyn LiveSet,
    ) -> Option<FeedbackState> {
        let key = self.table.best_key(snapshot);
        if self.mode_key.as_deref() == Some(key.as_str()) {
            return None;
        }
        self.active = self.table.lookup(&key).cloned();
        self.mode_key = Some(key);
        Some(self.bind_to_active(set))
    }

    /// Re-resolve the slot in effect, as after an override.
    pub fn refresh(&mut self, set: &dyn LiveSet) -> FeedbackState {
        let key = self
            .mode_key
            .clone()
            .unwrap_or_else(|| DEFAULT_KEY.to_string());
        self.active = self.table.lookup(&key).cloned();
        self.bind_to_active(set)
    }

    /// Resolve the active descriptor against `set`.
    ///
    /// Always finishes by re-subscribing to exactly the feeds the descriptor
    /// needs and recomputing feedback, whether or not resolution worked.
    pub fn bind_to_active(&mut self, set: &dyn LiveSet) -> FeedbackState {
        let outcome = match &self.active {
            Some(desc) => resolve(set, desc, self.options.prefer_left),
            None => Err(BindError::NoTarget),
        };
        match outcome {
            Ok(target) => {
                debug!(owner = %self.owner, ?target, "binding_bound");
                self.mapped_track = target.track();
                self.target = Some(target);
                self.disabled = false;
                self.deferred = false;
            }
            Err(err) => self.fail(&err),
        }
        let feeds = self.active.as_ref().map(assess_dynamism).unwrap_or_default();
        self.apply_listeners(set, &feeds);
        self.update_feedback(set)
    }

    /// Record a failed resolution.
    fn fail(&mut self, err: &BindError) {
        let input = self.active.as_ref().map_or("", |d| d.input.as_str());
        if let BindError::DeviceMissing { track, .. } = *err {
            debug!(owner = %self.owner, target = input, %err, "binding_deferred");
            self.target = None;
            self.mapped_track = Some(track);
            self.disabled = true;
            self.deferred = true;
            return;
        }
        self.deferred = false;
        if self.options.log_failed_bindings {
            warn!(owner = %self.owner, target = input, %err, "binding_failed");
        } else {
            debug!(owner = %self.owner, target = input, %err, "binding_failed");
        }
        if self.options.unbind_on_fail {
            self.target = None;
            self.mapped_track = None;
            self.disabled = true;
        }
    }

    /// Subscribe to exactly `feeds` plus the target's feedback topics.
    ///
    /// Every previous subscription is dropped first.
    pub fn apply_listeners(&mut self, set: &dyn LiveSet, feeds: &BTreeSet<Feed>) {
        self.subscriptions.clear();
        let mut topics = BTreeSet::new();
        for feed in feeds {
            let subject = match feed {
                Feed::DeviceList | Feed::MappedDeviceSelected => match self.mapped_track {
                    Some(t) => Subject::Track(t),
                    None => continue,
                },
                _ => Subject::Set,
            };
            topics.insert(Topic {
                feed: *feed,
                subject,
            });
        }
        if let Some(target) = &self.target {
            topics.extend(target.feedback_topics());
        }
        for topic in topics {
            let sub = set.subscribe(topic, self.notifier.clone());
            self.subscriptions.push((topic, sub));
        }
    }

    /// React to a notification for `topic`.
    ///
    /// Structural feeds rebind; the rest only refresh feedback.
    pub fn notify(&mut self, topic: Topic, set: &dyn LiveSet) -> FeedbackState {
        if topic.feed.is_structural() {
            self.bind_to_active(set)
        } else {
            self.update_feedback(set)
        }
    }

    /// Derive the feedback state from the live value. Never mutates.
    pub fn update_feedback(&self, set: &dyn LiveSet) -> FeedbackState {
        if self.disabled {
            return FeedbackState::Disabled;
        }
        let Some(target) = self.target else {
            return FeedbackState::Off;
        };
        let on = match target {
            Target::Parameter { parameter, .. } => match set.parameter(parameter) {
                Some(p) => p.value == p.max || p.value != p.min,
                None => return FeedbackState::Disabled,
            },
            Target::DeviceSelect { track, device } => set.selected_device(track) == Some(device),
            Target::Track { track, attribute } => match attribute {
                TrackAttribute::Arm => set.flag(track, TrackFlag::Arm).unwrap_or(false),
                TrackAttribute::Mute => set.flag(track, TrackFlag::Mute).unwrap_or(false),
                TrackAttribute::Solo => set.flag(track, TrackFlag::Solo).unwrap_or(false),
                TrackAttribute::Select => set.selected_track() == Some(track),
                TrackAttribute::Play | TrackAttribute::Stop => set.is_playing(track),
                TrackAttribute::Monitor(state) => set.monitoring(track) == Some(state),
                TrackAttribute::Crossfade(side) => set.crossfade_assign(track) == Some(side),
            },
        };
        if on {
            FeedbackState::On
        } else {
            FeedbackState::Off
        }
    }

    /// Flip the bound target.
    ///
    /// Parameters jump between min and max (anything in between goes to
    /// min). Monitoring and crossfade positions toggle between the bound
    /// position and the neutral one.
    pub fn toggle(&self, set: &dyn LiveSet) -> Result<(), BindError> {
        let target = match self.target {
            Some(t) if !self.disabled => t,
            _ => return Err(BindError::NoTarget),
        };
        match target {
            Target::Parameter { parameter, .. } => {
                let Some(p) = set.parameter(parameter) else {
                    return Err(BindError::ParameterNotFound {
                        parameter: format!("{parameter:?}"),
                    });
                };
                let next = if p.value == p.min { p.max } else { p.min };
                set.set_parameter_value(parameter, next);
            }
            Target::DeviceSelect { device, .. } => set.select_device(device),
            Target::Track { track, attribute } => toggle_attribute(set, track, attribute),
        }
        Ok(())
    }

    /// Replace the descriptor in an existing mode slot and rebind.
    pub fn override_binding(
        &mut self,
        desc: TargetDescriptor,
        mode: &str,
        set: &dyn LiveSet,
    ) -> Result<FeedbackState, Error> {
        self.table.replace(mode, desc)?;
        Ok(self.refresh(set))
    }

    /// Bind a one-off descriptor outside the mode table.
    ///
    /// It stays until the next mode change picks a different slot.
    pub fn bind_ad_hoc(&mut self, desc: TargetDescriptor, set: &dyn LiveSet) -> FeedbackState {
        self.active = Some(desc);
        self.bind_to_active(set)
    }
}

/// Toggle a track attribute.
fn toggle_attribute(set: &dyn LiveSet, track: TrackRef, attribute: TrackAttribute) {
    let flip = |flag| {
        if let Some(on) = set.flag(track, flag) {
            set.set_flag(track, flag, !on);
        }
    };
    match attribute {
        TrackAttribute::Arm => flip(TrackFlag::Arm),
        TrackAttribute::Mute => flip(TrackFlag::Mute),
        TrackAttribute::Solo => flip(TrackFlag::Solo),
        TrackAttribute::Select => set.select_track(track),
        TrackAttribute::Play => set.fire(track),
        TrackAttribute::Stop => set.stop(track),
        TrackAttribute::Monitor(bound) => {
            let current = set.monitoring(track);
            let next = match bound {
                MonitorState::Off if current == Some(bound) => MonitorState::Auto,
                _ if current == Some(bound) => MonitorState::Off,
                _ => bound,
            };
            set.set_monitoring(track, next);
        }
        TrackAttribute::Crossfade(bound) => {
            let current = set.crossfade_assign(track);
            let next = match bound {
                CrossfadeAssign::Off => CrossfadeAssign::Off,
                _ if current == Some(bound) => CrossfadeAssign::Off,
                _ => bound,
            };
            set.set_crossfade_assign(track, next);
        }
    }
}
