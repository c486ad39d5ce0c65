//! Change feeds, subscriptions and the static dynamism analysis.

use std::{collections::BTreeSet, fmt};

use crossbeam_channel::Sender;
use target_path::{ParameterType, TargetDescriptor};
use tracing::trace;

use crate::{DeviceRef, ParamRef, TrackRef};

/// A change notification stream in the live set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feed {
    /// The selected track changed.
    SelectedTrack,
    /// Tracks were added, removed or reordered.
    TrackList,
    /// A track's device list changed.
    DeviceList,
    /// Rack chains changed, or a rack's selected chain moved.
    ChainList,
    /// Return tracks were added or removed.
    ReturnTracks,
    /// The host's selected parameter changed.
    SelectedParameter,
    /// The session ring moved.
    RingTracks,
    /// The selected track's selected device changed.
    SelectedDevice,
    /// A specific track's selected device changed.
    MappedDeviceSelected,
    /// A parameter's value changed.
    Value,
    /// Arm changed.
    Arm,
    /// Mute changed.
    Mute,
    /// Solo changed.
    Solo,
    /// Monitoring changed.
    Monitoring,
    /// Crossfade assignment changed.
    Crossfade,
    /// Play state changed.
    Playing,
}

impl Feed {
    /// Feeds whose firing invalidates the resolved target, forcing a rebind.
    ///
    /// The rest only change what the target looks like.
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            Self::SelectedTrack
                | Self::TrackList
                | Self::DeviceList
                | Self::ChainList
                | Self::ReturnTracks
                | Self::SelectedParameter
                | Self::RingTracks
                | Self::SelectedDevice
        )
    }
}

/// What a feed is observed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Subject {
    /// The whole set (selection, track lists, ring).
    Set,
    /// One track.
    Track(TrackRef),
    /// One device.
    Device(DeviceRef),
    /// One parameter.
    Parameter(ParamRef),
}

/// A feed on a subject: the unit of subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Topic {
    /// The feed.
    pub feed: Feed,
    /// Where it is observed.
    pub subject: Subject,
}

impl Topic {
    /// A set-wide topic.
    pub fn set(feed: Feed) -> Self {
        Self {
            feed,
            subject: Subject::Set,
        }
    }

    /// A topic on one track.
    pub fn track(feed: Feed, track: TrackRef) -> Self {
        Self {
            feed,
            subject: Subject::Track(track),
        }
    }

    /// The value topic of one parameter.
    pub fn value(parameter: ParamRef) -> Self {
        Self {
            feed: Feed::Value,
            subject: Subject::Parameter(parameter),
        }
    }
}

/// One delivered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEvent {
    /// Name of the subscribing control or encoder.
    pub owner: String,
    /// The topic that fired.
    pub topic: Topic,
}

/// Sending half handed to the live set with each subscription.
#[derive(Debug, Clone)]
pub struct Notifier {
    /// Subscriber name stamped on every event.
    owner: String,
    /// Event queue drained by the host loop.
    tx: Sender<FeedEvent>,
}

impl Notifier {
    /// A notifier for `owner` feeding `tx`.
    pub fn new(owner: impl Into<String>, tx: Sender<FeedEvent>) -> Self {
        Self {
            owner: owner.into(),
            tx,
        }
    }

    /// Subscriber name.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Queue an event for `topic`. A closed queue drops it.
    pub fn notify(&self, topic: Topic) {
        let event = FeedEvent {
            owner: self.owner.clone(),
            topic,
        };
        if self.tx.send(event).is_err() {
            trace!(owner = %self.owner, ?topic, "feed_dropped");
        }
    }
}

/// Subscription handle; unsubscribes when dropped.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    /// Unsubscribe hook, run once.
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// A handle that runs `cancel` on drop.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle with nothing to undo.
    pub fn inert() -> Self {
        Self { cancel: None }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("live", &self.cancel.is_some())
            .finish()
    }
}

/// True when a selector names the selected object.
fn is_sel(s: &str) -> bool {
    s.eq_ignore_ascii_case("SEL")
}

/// The structural feeds a binding to `desc` must observe to stay valid.
///
/// Depends on the descriptor alone.
pub fn assess_dynamism(desc: &TargetDescriptor) -> BTreeSet<Feed> {
    let mut feeds = BTreeSet::new();
    if desc.error.is_some() || desc.is_empty() {
        return feeds;
    }
    if desc.parameter_type == Some(ParameterType::Selp) {
        feeds.insert(Feed::SelectedParameter);
        return feeds;
    }

    match &desc.track {
        Some(t) if is_sel(t) => {
            feeds.insert(Feed::SelectedTrack);
        }
        Some(_) => {
            feeds.insert(Feed::TrackList);
        }
        None if desc.ring_track.is_none() && desc.send_track.is_none() => {
            // Device paths without a track follow the selected track. A bare
            // crossfader is the master's.
            if desc.targets_device() || desc.parameter_type != Some(ParameterType::Xfader) {
                feeds.insert(Feed::SelectedTrack);
            }
        }
        None => {}
    }

    if let Some(device) = &desc.device {
        feeds.insert(Feed::DeviceList);
        if desc.parameter_type == Some(ParameterType::Sel) {
            feeds.insert(Feed::MappedDeviceSelected);
        }
        if is_sel(device) {
            feeds.insert(Feed::SelectedDevice);
        }
    }

    if let Some(path) = &desc.chain_map {
        feeds.insert(Feed::ChainList);
        feeds.insert(Feed::DeviceList);
        if path.first().is_some_and(|s| is_sel(s)) {
            feeds.insert(Feed::SelectedDevice);
        }
    }

    if desc.send_track.is_some() || desc.send.is_some() {
        feeds.insert(Feed::ReturnTracks);
    }
    if desc.ring_track.is_some() {
        feeds.insert(Feed::RingTracks);
    }
    feeds
}
