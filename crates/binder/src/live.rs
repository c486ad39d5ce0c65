//! The live object graph a binding resolves against.
//!
//! The host owns the graph; bindings only hold opaque references into it and
//! re-resolve whenever a subscribed feed fires.

use target_path::{CrossfadeAssign, MonitorState};

use crate::{Notifier, Subscription, Topic};

/// Opaque reference to a track (regular, return or master).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackRef(pub u32);

/// Opaque reference to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceRef(pub u32);

/// Opaque reference to a rack chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChainRef(pub u32);

/// Opaque reference to an automatable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParamRef(pub u32);

/// Where a device list lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceParent {
    /// Top-level devices of a track.
    Track(TrackRef),
    /// Devices inside a rack chain.
    Chain(ChainRef),
}

/// A mixer parameter on a track or rack chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MixerSlot {
    /// Volume.
    Volume,
    /// Pan.
    Pan,
    /// Cue volume.
    Cue,
    /// Crossfader.
    Crossfader,
    /// Left split-stereo pan.
    PanLeft,
    /// Right split-stereo pan.
    PanRight,
    /// Send to the zero-based return track.
    Send(usize),
}

/// A boolean track switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackFlag {
    /// Record arm.
    Arm,
    /// Mute.
    Mute,
    /// Solo.
    Solo,
}

/// Snapshot of one parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterState {
    /// Display name.
    pub name: String,
    /// Current value.
    pub value: f64,
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

/// Read and write access to the host's tracks, devices and parameters.
///
/// Every lookup is by value and may fail; a missing object is `None` or an
/// empty list. Writers notify subscribers of the affected topics.
pub trait LiveSet: Send + Sync {
    /// Regular tracks in display order.
    fn tracks(&self) -> Vec<TrackRef>;

    /// Return tracks in display order.
    fn return_tracks(&self) -> Vec<TrackRef>;

    /// The master track.
    fn master_track(&self) -> Option<TrackRef>;

    /// The selected track.
    fn selected_track(&self) -> Option<TrackRef>;

    /// Select a track.
    fn select_track(&self, track: TrackRef);

    /// The track at `offset` from the session ring's left edge.
    fn ring_track(&self, offset: u32) -> Option<TrackRef>;

    /// The session ring's left edge, as a track index.
    fn ring_offset(&self) -> u32;

    /// Track name.
    fn track_name(&self, track: TrackRef) -> Option<String>;

    /// A mixer parameter of a track.
    fn mixer_parameter(&self, track: TrackRef, slot: MixerSlot) -> Option<ParamRef>;

    /// A boolean switch; `None` when the track does not have it.
    fn flag(&self, track: TrackRef, flag: TrackFlag) -> Option<bool>;

    /// Set a boolean switch.
    fn set_flag(&self, track: TrackRef, flag: TrackFlag, on: bool);

    /// Monitoring state; `None` for tracks that cannot monitor.
    fn monitoring(&self, track: TrackRef) -> Option<MonitorState>;

    /// Set the monitoring state.
    fn set_monitoring(&self, track: TrackRef, state: MonitorState);

    /// Crossfade assignment.
    fn crossfade_assign(&self, track: TrackRef) -> Option<CrossfadeAssign>;

    /// Set the crossfade assignment.
    fn set_crossfade_assign(&self, track: TrackRef, side: CrossfadeAssign);

    /// True while a clip plays on the track.
    fn is_playing(&self, track: TrackRef) -> bool;

    /// Launch the track's clip in the selected scene.
    fn fire(&self, track: TrackRef);

    /// Stop every clip on the track.
    fn stop(&self, track: TrackRef);

    /// Devices of a track or chain, in order.
    fn devices(&self, parent: DeviceParent) -> Vec<DeviceRef>;

    /// Device name.
    fn device_name(&self, device: DeviceRef) -> Option<String>;

    /// Chains of a rack device; empty for plain devices.
    fn chains(&self, device: DeviceRef) -> Vec<ChainRef>;

    /// Chain name.
    fn chain_name(&self, chain: ChainRef) -> Option<String>;

    /// The device selected on a track.
    fn selected_device(&self, track: TrackRef) -> Option<DeviceRef>;

    /// The chain selected in a rack device.
    fn selected_chain(&self, device: DeviceRef) -> Option<ChainRef>;

    /// Select a device on its track.
    fn select_device(&self, device: DeviceRef);

    /// A rack's chain selector.
    fn chain_selector(&self, device: DeviceRef) -> Option<ParamRef>;

    /// A mixer parameter of a rack chain.
    fn chain_mixer_parameter(&self, chain: ChainRef, slot: MixerSlot) -> Option<ParamRef>;

    /// Device parameters; index 0 is the device on/off switch.
    fn parameters(&self, device: DeviceRef) -> Vec<ParamRef>;

    /// The `number`th parameter of `bank` (both 1-based) in the host's bank layout.
    fn banked_parameter(
        &self,
        device: DeviceRef,
        bank: u32,
        number: u32,
        prefer_left: bool,
    ) -> Option<ParamRef>;

    /// The parameter selected in the host.
    fn selected_parameter(&self) -> Option<ParamRef>;

    /// Current state of a parameter.
    fn parameter(&self, parameter: ParamRef) -> Option<ParameterState>;

    /// Set a parameter's value.
    fn set_parameter_value(&self, parameter: ParamRef, value: f64);

    /// Deliver `topic` notifications to `notifier` until the handle drops.
    fn subscribe(&self, topic: Topic, notifier: Notifier) -> Subscription;
}
