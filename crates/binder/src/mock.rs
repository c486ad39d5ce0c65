//! In-memory live set for tests.
//!
//! Builders add tracks, devices, chains and parameters; the [`LiveSet`]
//! writers and a few extra mutators notify subscribers synchronously through
//! their [`Notifier`]s.

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use parking_lot::Mutex;
use target_path::{CrossfadeAssign, MonitorState};

use crate::{
    ChainRef, DeviceParent, DeviceRef, Feed, LiveSet, MixerSlot, Notifier, ParamRef,
    ParameterState, Subscription, Topic, TrackFlag, TrackRef,
};

/// Mixer slots every track and chain gets, in creation order.
const MIXER: [MixerSlot; 6] = [
    MixerSlot::Volume,
    MixerSlot::Pan,
    MixerSlot::Cue,
    MixerSlot::Crossfader,
    MixerSlot::PanLeft,
    MixerSlot::PanRight,
];

/// One track.
#[derive(Debug, Default)]
struct Track {
    /// Name.
    name: String,
    /// Top-level devices.
    devices: Vec<DeviceRef>,
    /// Mixer parameters by slot.
    mixer: HashMap<MixerSlot, ParamRef>,
    /// `None` when the track cannot be armed.
    arm: Option<bool>,
    /// Mute.
    mute: bool,
    /// Solo.
    solo: bool,
    /// `None` for group tracks.
    monitoring: Option<MonitorState>,
    /// Crossfade side.
    crossfade: Option<CrossfadeAssign>,
    /// Clip playing.
    playing: bool,
    /// Selected device.
    selected_device: Option<DeviceRef>,
}

/// One device.
#[derive(Debug, Default)]
struct Device {
    /// Name.
    name: String,
    /// Owning track.
    track: Option<TrackRef>,
    /// Parameters; index 0 is the on/off switch.
    parameters: Vec<ParamRef>,
    /// Rack chains.
    chains: Vec<ChainRef>,
    /// Selected chain.
    selected_chain: Option<ChainRef>,
    /// Chain selector, for racks.
    chain_selector: Option<ParamRef>,
    /// Bank layout: parameter names per bank.
    banks: Vec<Vec<String>>,
}

/// One rack chain.
#[derive(Debug, Default)]
struct Chain {
    /// Name.
    name: String,
    /// Devices in the chain.
    devices: Vec<DeviceRef>,
    /// Mixer parameters by slot.
    mixer: HashMap<MixerSlot, ParamRef>,
}

/// Everything behind the lock.
#[derive(Default)]
struct State {
    /// Next id for any object.
    next_id: u32,
    /// Regular tracks in order.
    tracks: Vec<TrackRef>,
    /// Return tracks in order.
    returns: Vec<TrackRef>,
    /// Master track.
    master: Option<TrackRef>,
    /// Track data.
    track_data: HashMap<TrackRef, Track>,
    /// Device data.
    devices: HashMap<DeviceRef, Device>,
    /// Chain data.
    chains: HashMap<ChainRef, Chain>,
    /// Parameter data.
    params: HashMap<ParamRef, ParameterState>,
    /// Selected track.
    selected_track: Option<TrackRef>,
    /// Selected parameter.
    selected_parameter: Option<ParamRef>,
    /// Session ring left edge.
    ring_offset: u32,
    /// Live subscriptions.
    subscribers: Vec<(u64, Topic, Notifier)>,
    /// Next subscription id.
    next_sub: u64,
}

impl State {
    /// A fresh id.
    fn id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// A new parameter spanning `0.0..=1.0` at `value`.
    fn param(&mut self, name: &str, value: f64) -> ParamRef {
        let p = ParamRef(self.id());
        self.params.insert(
            p,
            ParameterState {
                name: name.to_string(),
                value,
                min: 0.0,
                max: 1.0,
            },
        );
        p
    }

    /// Mixer parameters plus one send per return track.
    fn mixer(&mut self) -> HashMap<MixerSlot, ParamRef> {
        let mut mixer: HashMap<MixerSlot, ParamRef> = MIXER
            .iter()
            .map(|slot| (*slot, self.param(&format!("{slot:?}"), 0.0)))
            .collect();
        for i in 0..self.returns.len() {
            mixer.insert(MixerSlot::Send(i), self.param(&format!("Send {i}"), 0.0));
        }
        mixer
    }

    /// Notifiers subscribed to `topic`.
    fn listeners(&self, topic: Topic) -> Vec<Notifier> {
        self.subscribers
            .iter()
            .filter(|(_, t, _)| *t == topic)
            .map(|(_, _, n)| n.clone())
            .collect()
    }
}

/// A thread-safe in-memory [`LiveSet`].
#[derive(Clone, Default)]
pub struct MockSet {
    /// Shared state.
    state: Arc<Mutex<State>>,
}

impl MockSet {
    /// An empty set with a master track.
    pub fn new() -> Self {
        let set = Self::default();
        {
            let mut s = set.state.lock();
            let id = TrackRef(s.id());
            let mixer = s.mixer();
            s.track_data.insert(
                id,
                Track {
                    name: "Master".into(),
                    mixer,
                    ..Default::default()
                },
            );
            s.master = Some(id);
        }
        set
    }

    /// Send `topics` to their subscribers, outside the lock.
    fn emit(&self, topics: &[Topic]) {
        let listeners: Vec<(Topic, Notifier)> = {
            let s = self.state.lock();
            topics
                .iter()
                .flat_map(|t| s.listeners(*t).into_iter().map(move |n| (*t, n)))
                .collect()
        };
        for (topic, n) in listeners {
            n.notify(topic);
        }
    }

    /// Append an armable, monitorable track.
    pub fn add_track(&self, name: &str) -> TrackRef {
        let id = {
            let mut s = self.state.lock();
            let id = TrackRef(s.id());
            let mixer = s.mixer();
            s.track_data.insert(
                id,
                Track {
                    name: name.into(),
                    mixer,
                    arm: Some(false),
                    monitoring: Some(MonitorState::Auto),
                    crossfade: Some(CrossfadeAssign::Off),
                    ..Default::default()
                },
            );
            s.tracks.push(id);
            id
        };
        self.emit(&[Topic::set(Feed::TrackList)]);
        id
    }

    /// Append a group track: no arm, no monitoring.
    pub fn add_group_track(&self, name: &str) -> TrackRef {
        let id = self.add_track(name);
        let mut s = self.state.lock();
        if let Some(t) = s.track_data.get_mut(&id) {
            t.arm = None;
            t.monitoring = None;
        }
        id
    }

    /// Remove a regular track.
    pub fn remove_track(&self, track: TrackRef) {
        {
            let mut s = self.state.lock();
            s.tracks.retain(|t| *t != track);
            if s.selected_track == Some(track) {
                s.selected_track = None;
            }
        }
        self.emit(&[Topic::set(Feed::TrackList)]);
    }

    /// Append a return track; every track gains a send.
    pub fn add_return_track(&self, name: &str) -> TrackRef {
        let id = {
            let mut s = self.state.lock();
            let index = s.returns.len();
            let owners: Vec<TrackRef> = s.track_data.keys().copied().collect();
            for owner in owners {
                let p = s.param(&format!("Send {index}"), 0.0);
                if let Some(t) = s.track_data.get_mut(&owner) {
                    t.mixer.insert(MixerSlot::Send(index), p);
                }
            }
            let chains: Vec<ChainRef> = s.chains.keys().copied().collect();
            for chain in chains {
                let p = s.param(&format!("Send {index}"), 0.0);
                if let Some(c) = s.chains.get_mut(&chain) {
                    c.mixer.insert(MixerSlot::Send(index), p);
                }
            }
            let id = TrackRef(s.id());
            let mixer = s.mixer();
            s.track_data.insert(
                id,
                Track {
                    name: name.into(),
                    mixer,
                    ..Default::default()
                },
            );
            s.returns.push(id);
            id
        };
        self.emit(&[Topic::set(Feed::ReturnTracks)]);
        id
    }

    /// Append a device with `parameters` after its on/off switch.
    pub fn add_device(&self, parent: DeviceParent, name: &str, parameters: &[&str]) -> DeviceRef {
        let (id, track) = {
            let mut s = self.state.lock();
            let id = DeviceRef(s.id());
            let mut params = vec![s.param("Device On", 1.0)];
            for p in parameters {
                params.push(s.param(p, 0.0));
            }
            let track = match parent {
                DeviceParent::Track(t) => {
                    if let Some(t) = s.track_data.get_mut(&t) {
                        t.devices.push(id);
                    }
                    Some(t)
                }
                DeviceParent::Chain(c) => {
                    if let Some(c) = s.chains.get_mut(&c) {
                        c.devices.push(id);
                    }
                    None
                }
            };
            s.devices.insert(
                id,
                Device {
                    name: name.into(),
                    track,
                    parameters: params,
                    ..Default::default()
                },
            );
            (id, track)
        };
        match track {
            Some(t) => self.emit(&[Topic::track(Feed::DeviceList, t)]),
            None => self.emit(&[Topic::set(Feed::ChainList)]),
        }
        id
    }

    /// Append a chain to a rack device, giving the rack a chain selector.
    pub fn add_chain(&self, device: DeviceRef, name: &str) -> ChainRef {
        let id = {
            let mut s = self.state.lock();
            let id = ChainRef(s.id());
            let mixer = s.mixer();
            s.chains.insert(
                id,
                Chain {
                    name: name.into(),
                    mixer,
                    ..Default::default()
                },
            );
            let needs_selector = s
                .devices
                .get(&device)
                .is_some_and(|d| d.chain_selector.is_none());
            let selector = needs_selector.then(|| s.param("Chain Selector", 0.0));
            if let Some(d) = s.devices.get_mut(&device) {
                d.chains.push(id);
                if d.selected_chain.is_none() {
                    d.selected_chain = Some(id);
                }
                if selector.is_some() {
                    d.chain_selector = selector;
                }
            }
            id
        };
        self.emit(&[Topic::set(Feed::ChainList)]);
        id
    }

    /// Give a device a bank layout: parameter names per bank.
    pub fn set_banks(&self, device: DeviceRef, banks: &[&[&str]]) {
        let mut s = self.state.lock();
        if let Some(d) = s.devices.get_mut(&device) {
            d.banks = banks
                .iter()
                .map(|b| b.iter().map(|n| (*n).to_string()).collect())
                .collect();
        }
    }

    /// Select a chain inside a rack.
    pub fn select_chain(&self, device: DeviceRef, chain: ChainRef) {
        {
            let mut s = self.state.lock();
            if let Some(d) = s.devices.get_mut(&device) {
                d.selected_chain = Some(chain);
            }
        }
        self.emit(&[Topic::set(Feed::ChainList)]);
    }

    /// Select a parameter in the host.
    pub fn select_parameter(&self, parameter: Option<ParamRef>) {
        self.state.lock().selected_parameter = parameter;
        self.emit(&[Topic::set(Feed::SelectedParameter)]);
    }

    /// Move the session ring.
    pub fn set_ring_offset(&self, offset: u32) {
        self.state.lock().ring_offset = offset;
        self.emit(&[Topic::set(Feed::RingTracks)]);
    }

    /// Set a parameter's range.
    pub fn set_range(&self, parameter: ParamRef, min: f64, max: f64) {
        if let Some(p) = self.state.lock().params.get_mut(&parameter) {
            p.min = min;
            p.max = max;
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    /// Live subscriptions of `owner`, sorted.
    pub fn topics_of(&self, owner: &str) -> Vec<Topic> {
        let mut v: Vec<Topic> = self
            .state
            .lock()
            .subscribers
            .iter()
            .filter(|(_, _, n)| n.owner() == owner)
            .map(|(_, t, _)| *t)
            .collect();
        v.sort();
        v
    }

    /// Read a value from one track.
    fn with_track<T>(&self, track: TrackRef, f: impl FnOnce(&Track) -> T) -> Option<T> {
        self.state.lock().track_data.get(&track).map(f)
    }

    /// Change one track and notify `feed` on it.
    fn update_track(&self, track: TrackRef, feed: Feed, f: impl FnOnce(&mut Track)) {
        if let Some(t) = self.state.lock().track_data.get_mut(&track) {
            f(t);
        }
        self.emit(&[Topic::track(feed, track)]);
    }
}

impl LiveSet for MockSet {
    fn tracks(&self) -> Vec<TrackRef> {
        self.state.lock().tracks.clone()
    }

    fn return_tracks(&self) -> Vec<TrackRef> {
        self.state.lock().returns.clone()
    }

    fn master_track(&self) -> Option<TrackRef> {
        self.state.lock().master
    }

    fn selected_track(&self) -> Option<TrackRef> {
        self.state.lock().selected_track
    }

    fn select_track(&self, track: TrackRef) {
        self.state.lock().selected_track = Some(track);
        self.emit(&[Topic::set(Feed::SelectedTrack), Topic::set(Feed::SelectedDevice)]);
    }

    fn ring_track(&self, offset: u32) -> Option<TrackRef> {
        let s = self.state.lock();
        let index = s.ring_offset.checked_add(offset)? as usize;
        s.tracks.get(index).copied()
    }

    fn ring_offset(&self) -> u32 {
        self.state.lock().ring_offset
    }

    fn track_name(&self, track: TrackRef) -> Option<String> {
        self.with_track(track, |t| t.name.clone())
    }

    fn mixer_parameter(&self, track: TrackRef, slot: MixerSlot) -> Option<ParamRef> {
        self.with_track(track, |t| t.mixer.get(&slot).copied())
            .flatten()
    }

    fn flag(&self, track: TrackRef, flag: TrackFlag) -> Option<bool> {
        self.with_track(track, |t| match flag {
            TrackFlag::Arm => t.arm,
            TrackFlag::Mute => Some(t.mute),
            TrackFlag::Solo => Some(t.solo),
        })
        .flatten()
    }

    fn set_flag(&self, track: TrackRef, flag: TrackFlag, on: bool) {
        let feed = match flag {
            TrackFlag::Arm => Feed::Arm,
            TrackFlag::Mute => Feed::Mute,
            TrackFlag::Solo => Feed::Solo,
        };
        self.update_track(track, feed, |t| match flag {
            TrackFlag::Arm => {
                if t.arm.is_some() {
                    t.arm = Some(on);
                }
            }
            TrackFlag::Mute => t.mute = on,
            TrackFlag::Solo => t.solo = on,
        });
    }

    fn monitoring(&self, track: TrackRef) -> Option<MonitorState> {
        self.with_track(track, |t| t.monitoring).flatten()
    }

    fn set_monitoring(&self, track: TrackRef, state: MonitorState) {
        self.update_track(track, Feed::Monitoring, |t| {
            if t.monitoring.is_some() {
                t.monitoring = Some(state);
            }
        });
    }

    fn crossfade_assign(&self, track: TrackRef) -> Option<CrossfadeAssign> {
        self.with_track(track, |t| t.crossfade).flatten()
    }

    fn set_crossfade_assign(&self, track: TrackRef, side: CrossfadeAssign) {
        self.update_track(track, Feed::Crossfade, |t| t.crossfade = Some(side));
    }

    fn is_playing(&self, track: TrackRef) -> bool {
        self.with_track(track, |t| t.playing).unwrap_or(false)
    }

    fn fire(&self, track: TrackRef) {
        self.update_track(track, Feed::Playing, |t| t.playing = true);
    }

    fn stop(&self, track: TrackRef) {
        self.update_track(track, Feed::Playing, |t| t.playing = false);
    }

    fn devices(&self, parent: DeviceParent) -> Vec<DeviceRef> {
        let s = self.state.lock();
        match parent {
            DeviceParent::Track(t) => s.track_data.get(&t).map(|t| t.devices.clone()),
            DeviceParent::Chain(c) => s.chains.get(&c).map(|c| c.devices.clone()),
        }
        .unwrap_or_default()
    }

    fn device_name(&self, device: DeviceRef) -> Option<String> {
        self.state.lock().devices.get(&device).map(|d| d.name.clone())
    }

    fn chains(&self, device: DeviceRef) -> Vec<ChainRef> {
        self.state
            .lock()
            .devices
            .get(&device)
            .map(|d| d.chains.clone())
            .unwrap_or_default()
    }

    fn chain_name(&self, chain: ChainRef) -> Option<String> {
        self.state.lock().chains.get(&chain).map(|c| c.name.clone())
    }

    fn selected_device(&self, track: TrackRef) -> Option<DeviceRef> {
        self.with_track(track, |t| t.selected_device).flatten()
    }

    fn selected_chain(&self, device: DeviceRef) -> Option<ChainRef> {
        self.state
            .lock()
            .devices
            .get(&device)
            .and_then(|d| d.selected_chain)
    }

    fn select_device(&self, device: DeviceRef) {
        let track = self.state.lock().devices.get(&device).and_then(|d| d.track);
        let Some(track) = track else {
            return;
        };
        self.update_track(track, Feed::MappedDeviceSelected, |t| {
            t.selected_device = Some(device);
        });
        if self.selected_track() == Some(track) {
            self.emit(&[Topic::set(Feed::SelectedDevice)]);
        }
    }

    fn chain_selector(&self, device: DeviceRef) -> Option<ParamRef> {
        self.state
            .lock()
            .devices
            .get(&device)
            .and_then(|d| d.chain_selector)
    }

    fn chain_mixer_parameter(&self, chain: ChainRef, slot: MixerSlot) -> Option<ParamRef> {
        self.state
            .lock()
            .chains
            .get(&chain)
            .and_then(|c| c.mixer.get(&slot).copied())
    }

    fn parameters(&self, device: DeviceRef) -> Vec<ParamRef> {
        self.state
            .lock()
            .devices
            .get(&device)
            .map(|d| d.parameters.clone())
            .unwrap_or_default()
    }

    fn banked_parameter(
        &self,
        device: DeviceRef,
        bank: u32,
        number: u32,
        _prefer_left: bool,
    ) -> Option<ParamRef> {
        let s = self.state.lock();
        let d = s.devices.get(&device)?;
        let name = d
            .banks
            .get((bank as usize).checked_sub(1)?)?
            .iter()
            .filter(|n| !n.is_empty())
            .nth((number as usize).checked_sub(1)?)?;
        d.parameters
            .iter()
            .copied()
            .find(|p| s.params.get(p).is_some_and(|st| &st.name == name))
    }

    fn selected_parameter(&self) -> Option<ParamRef> {
        self.state.lock().selected_parameter
    }

    fn parameter(&self, parameter: ParamRef) -> Option<ParameterState> {
        self.state.lock().params.get(&parameter).cloned()
    }

    fn set_parameter_value(&self, parameter: ParamRef, value: f64) {
        if let Some(p) = self.state.lock().params.get_mut(&parameter) {
            p.value = value.clamp(p.min, p.max);
        }
        self.emit(&[Topic::value(parameter)]);
    }

    fn subscribe(&self, topic: Topic, notifier: Notifier) -> Subscription {
        let id = {
            let mut s = self.state.lock();
            s.next_sub += 1;
            let id = s.next_sub;
            s.subscribers.push((id, topic, notifier));
            id
        };
        let weak: Weak<Mutex<State>> = Arc::downgrade(&self.state);
        Subscription::new(move || {
            if let Some(state) = weak.upgrade() {
                state.lock().subscribers.retain(|(i, _, _)| *i != id);
            }
        })
    }
}
