//! Resolution of descriptors against the live set.

use target_path::{CrossfadeAssign, MonitorState, ParameterType, TargetDescriptor};

use crate::{
    BindError, ChainRef, DeviceParent, DeviceRef, Feed, LiveSet, MixerSlot, ParamRef, Topic,
    TrackFlag, TrackRef,
};

/// A track attribute a control can reflect and toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackAttribute {
    /// Record arm.
    Arm,
    /// Mute.
    Mute,
    /// Solo.
    Solo,
    /// Track selection.
    Select,
    /// Clip launch.
    Play,
    /// Clip stop.
    Stop,
    /// One monitoring position.
    Monitor(MonitorState),
    /// One crossfade side.
    Crossfade(CrossfadeAssign),
}

impl TrackAttribute {
    /// The feed carrying changes to this attribute.
    fn feedback_topic(self, track: TrackRef) -> Topic {
        match self {
            Self::Arm => Topic::track(Feed::Arm, track),
            Self::Mute => Topic::track(Feed::Mute, track),
            Self::Solo => Topic::track(Feed::Solo, track),
            Self::Select => Topic::set(Feed::SelectedTrack),
            Self::Play | Self::Stop => Topic::track(Feed::Playing, track),
            Self::Monitor(_) => Topic::track(Feed::Monitoring, track),
            Self::Crossfade(_) => Topic::track(Feed::Crossfade, track),
        }
    }
}

/// A resolved live target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// A continuous parameter.
    Parameter {
        /// Owning track, when known.
        track: Option<TrackRef>,
        /// Owning device, for device parameters.
        device: Option<DeviceRef>,
        /// The parameter.
        parameter: ParamRef,
    },
    /// A track attribute.
    Track {
        /// The track.
        track: TrackRef,
        /// The attribute.
        attribute: TrackAttribute,
    },
    /// A device's selection state.
    DeviceSelect {
        /// Owning track.
        track: TrackRef,
        /// The device.
        device: DeviceRef,
    },
}

impl Target {
    /// The track this target lives on.
    pub fn track(&self) -> Option<TrackRef> {
        match *self {
            Self::Parameter { track, .. } => track,
            Self::Track { track, .. } | Self::DeviceSelect { track, .. } => Some(track),
        }
    }

    /// The bound parameter, for parameter targets.
    pub fn parameter(&self) -> Option<ParamRef> {
        match *self {
            Self::Parameter { parameter, .. } => Some(parameter),
            _ => None,
        }
    }

    /// Topics whose firing changes this target's feedback.
    pub fn feedback_topics(&self) -> Vec<Topic> {
        match *self {
            Self::Parameter { parameter, .. } => vec![Topic::value(parameter)],
            Self::Track { track, attribute } => vec![attribute.feedback_topic(track)],
            Self::DeviceSelect { track, .. } => {
                vec![Topic::track(Feed::MappedDeviceSelected, track)]
            }
        }
    }
}

/// Zero-based index of a send or return letter.
fn send_index(letter: &str) -> Option<usize> {
    let c = letter.chars().next()?.to_ascii_uppercase();
    c.is_ascii_uppercase().then(|| (c as u8 - b'A') as usize)
}

/// A checked send slot.
fn send_slot(set: &dyn LiveSet, letter: &str) -> Result<MixerSlot, BindError> {
    let count = set.return_tracks().len();
    match send_index(letter) {
        Some(i) if i < count => Ok(MixerSlot::Send(i)),
        _ => Err(BindError::InvalidSend {
            send: letter.to_string(),
            count,
        }),
    }
}

/// Track mixer slot for a plain mixer keyword.
fn mixer_slot(ty: ParameterType) -> Option<MixerSlot> {
    match ty {
        ParameterType::Vol => Some(MixerSlot::Volume),
        ParameterType::Pan => Some(MixerSlot::Pan),
        ParameterType::Cue => Some(MixerSlot::Cue),
        ParameterType::Xfader => Some(MixerSlot::Crossfader),
        ParameterType::PanL => Some(MixerSlot::PanLeft),
        ParameterType::PanR => Some(MixerSlot::PanRight),
        _ => None,
    }
}

/// Resolve a track selector: 1-based index, `SEL`, `MST` or a name.
pub fn resolve_track(set: &dyn LiveSet, selector: &str) -> Option<TrackRef> {
    let tracks = set.tracks();
    if let Ok(n) = selector.parse::<usize>()
        && let Some(t) = n.checked_sub(1).and_then(|i| tracks.get(i))
    {
        return Some(*t);
    }
    if selector.eq_ignore_ascii_case("SEL") {
        return set.selected_track();
    }
    if selector.eq_ignore_ascii_case("MST") {
        return set.master_track();
    }
    tracks
        .into_iter()
        .find(|t| set.track_name(*t).as_deref() == Some(selector))
}

/// Search `devices` and, recursively, the chains of any racks among them.
pub fn find_device(set: &dyn LiveSet, devices: &[DeviceRef], name: &str) -> Option<DeviceRef> {
    for d in devices {
        if set.device_name(*d).as_deref() == Some(name) {
            return Some(*d);
        }
        for chain in set.chains(*d) {
            let inner = set.devices(DeviceParent::Chain(chain));
            if let Some(found) = find_device(set, &inner, name) {
                return Some(found);
            }
        }
    }
    None
}

/// Where a chain path ended.
#[derive(Debug, Clone, Copy)]
enum PathEnd {
    /// On a device segment.
    Device(DeviceRef),
    /// On a chain segment.
    Chain(ChainRef),
}

/// Pick an item by 1-based index or by name.
fn pick<T: Copy>(items: &[T], segment: &str, name: impl Fn(T) -> Option<String>) -> Option<T> {
    match segment.parse::<usize>() {
        Ok(n) => n.checked_sub(1).and_then(|i| items.get(i)).copied(),
        Err(_) => items
            .iter()
            .copied()
            .find(|i| name(*i).as_deref() == Some(segment)),
    }
}

/// Walk an alternating device/chain path from a track's devices.
fn traverse(set: &dyn LiveSet, track: TrackRef, path: &[String]) -> Result<PathEnd, BindError> {
    let mut device: Option<DeviceRef> = None;
    let mut chain: Option<ChainRef> = None;
    for (i, segment) in path.iter().enumerate() {
        let sel = segment.eq_ignore_ascii_case("SEL");
        if i % 2 == 0 {
            let parent = match chain {
                Some(c) => DeviceParent::Chain(c),
                None => DeviceParent::Track(track),
            };
            let found = if sel && i == 0 {
                set.selected_device(track)
            } else {
                pick(&set.devices(parent), segment, |d| set.device_name(d))
            };
            device = Some(found.ok_or_else(|| BindError::DeviceNotFound {
                device: segment.clone(),
            })?);
            chain = None;
        } else {
            let Some(d) = device else {
                return Err(BindError::ChainNotFound {
                    chain: segment.clone(),
                });
            };
            let found = if sel {
                set.selected_chain(d)
            } else {
                pick(&set.chains(d), segment, |c| set.chain_name(c))
            };
            chain = Some(found.ok_or_else(|| BindError::ChainNotFound {
                chain: segment.clone(),
            })?);
        }
    }
    match (chain, device) {
        (Some(c), _) => Ok(PathEnd::Chain(c)),
        (None, Some(d)) => Ok(PathEnd::Device(d)),
        (None, None) => Err(BindError::NoTarget),
    }
}

/// A chain mixer parameter: `VOL`, `PAN` or a send.
fn chain_parameter(
    set: &dyn LiveSet,
    chain: ChainRef,
    desc: &TargetDescriptor,
) -> Result<ParamRef, BindError> {
    let slot = match desc.parameter_type {
        Some(ParameterType::Vol) => MixerSlot::Volume,
        Some(ParameterType::Pan) => MixerSlot::Pan,
        Some(ParameterType::Send | ParameterType::ChainSend) => {
            send_slot(set, desc.send.as_deref().unwrap_or_default())?
        }
        _ => {
            return Err(BindError::Unsupported {
                what: format!("{} on a chain", desc.input),
            });
        }
    };
    set.chain_mixer_parameter(chain, slot)
        .ok_or_else(|| BindError::ParameterNotFound {
            parameter: desc.input.clone(),
        })
}

/// Resolve `desc` to a live target.
pub fn resolve(
    set: &dyn LiveSet,
    desc: &TargetDescriptor,
    prefer_left: bool,
) -> Result<Target, BindError> {
    if let Some(message) = &desc.error {
        return Err(BindError::Malformed {
            message: message.clone(),
        });
    }
    if desc.is_empty() {
        return Err(BindError::NoTarget);
    }
    if desc.parameter_type == Some(ParameterType::Selp) {
        return set
            .selected_parameter()
            .map(|parameter| Target::Parameter {
                track: None,
                device: None,
                parameter,
            })
            .ok_or(BindError::NoTarget);
    }
    if desc.targets_device() {
        resolve_device_target(set, desc, prefer_left)
    } else {
        resolve_track_target(set, desc)
    }
}

/// The track named by `desc`, falling back to `fallback` when it names none.
fn descriptor_track(
    set: &dyn LiveSet,
    desc: &TargetDescriptor,
    fallback: impl FnOnce() -> Option<TrackRef>,
) -> Result<TrackRef, BindError> {
    if let Some(selector) = &desc.track {
        return resolve_track(set, selector).ok_or_else(|| BindError::TrackNotFound {
            track: selector.clone(),
        });
    }
    if let Some(offset) = desc.ring_track {
        return set
            .ring_track(offset)
            .ok_or(BindError::RingTrackMissing { offset });
    }
    if let Some(letter) = &desc.send_track {
        let returns = set.return_tracks();
        return send_index(letter)
            .and_then(|i| returns.get(i).copied())
            .ok_or_else(|| BindError::InvalidSend {
                send: letter.clone(),
                count: returns.len(),
            });
    }
    fallback().ok_or_else(|| BindError::TrackNotFound {
        track: "SEL".into(),
    })
}

/// Mixer parameters and attributes of a track.
fn resolve_track_target(set: &dyn LiveSet, desc: &TargetDescriptor) -> Result<Target, BindError> {
    let bare_crossfader = desc.parameter_type == Some(ParameterType::Xfader);
    let track = descriptor_track(set, desc, || {
        if bare_crossfader {
            set.master_track()
        } else {
            set.selected_track()
        }
    })?;

    let Some(ty) = desc.parameter_type else {
        return Err(BindError::Unsupported {
            what: "missing parameter type".into(),
        });
    };
    let attribute = |attribute: TrackAttribute| -> Result<Target, BindError> {
        Ok(Target::Track { track, attribute })
    };

    if let Some(slot) = mixer_slot(ty) {
        return set
            .mixer_parameter(track, slot)
            .map(|parameter| Target::Parameter {
                track: Some(track),
                device: None,
                parameter,
            })
            .ok_or_else(|| BindError::ParameterNotFound {
                parameter: ty.to_string(),
            });
    }
    match ty {
        ParameterType::Send => {
            let slot = send_slot(set, desc.send.as_deref().unwrap_or_default())?;
            set.mixer_parameter(track, slot)
                .map(|parameter| Target::Parameter {
                    track: Some(track),
                    device: None,
                    parameter,
                })
                .ok_or_else(|| BindError::ParameterNotFound {
                    parameter: desc.input.clone(),
                })
        }
        ParameterType::Arm => match set.flag(track, TrackFlag::Arm) {
            Some(_) => attribute(TrackAttribute::Arm),
            None => Err(BindError::Unavailable { what: "arm" }),
        },
        ParameterType::Mute => attribute(TrackAttribute::Mute),
        ParameterType::Solo => attribute(TrackAttribute::Solo),
        ParameterType::Sel => attribute(TrackAttribute::Select),
        ParameterType::Play => attribute(TrackAttribute::Play),
        ParameterType::Stop => attribute(TrackAttribute::Stop),
        ParameterType::Mon => match (desc.monitor, set.monitoring(track)) {
            (Some(state), Some(_)) => attribute(TrackAttribute::Monitor(state)),
            _ => Err(BindError::Unavailable { what: "monitoring" }),
        },
        ParameterType::Xfade => match desc.x_fade_assign {
            Some(side) => attribute(TrackAttribute::Crossfade(side)),
            None => Err(BindError::Unsupported {
                what: desc.input.clone(),
            }),
        },
        other => Err(BindError::Unsupported {
            what: other.to_string(),
        }),
    }
}

/// A top-level device of `track` by `SEL`, 1-based index or name.
///
/// Names are searched through rack chains too. A missing numbered device is
/// reported as deferrable.
fn track_device(
    set: &dyn LiveSet,
    track: TrackRef,
    selector: &str,
) -> Result<DeviceRef, BindError> {
    let devices = set.devices(DeviceParent::Track(track));
    let found = if selector.eq_ignore_ascii_case("SEL") {
        set.selected_device(track)
    } else if let Ok(index) = selector.parse::<u32>() {
        let at = (index as usize)
            .checked_sub(1)
            .and_then(|i| devices.get(i).copied());
        return at.ok_or(BindError::DeviceMissing { track, index });
    } else {
        find_device(set, &devices, selector)
    };
    found.ok_or_else(|| BindError::DeviceNotFound {
        device: selector.to_string(),
    })
}

/// Device, chain and device-parameter targets.
fn resolve_device_target(
    set: &dyn LiveSet,
    desc: &TargetDescriptor,
    prefer_left: bool,
) -> Result<Target, BindError> {
    let track = descriptor_track(set, desc, || set.selected_track())?;

    let device = if let Some(selector) = &desc.device {
        track_device(set, track, selector)?
    } else {
        let path = desc.chain_map.as_deref().unwrap_or_default();
        match traverse(set, track, path)? {
            PathEnd::Device(d) => d,
            PathEnd::Chain(chain) => {
                let parameter = chain_parameter(set, chain, desc)?;
                return Ok(Target::Parameter {
                    track: Some(track),
                    device: None,
                    parameter,
                });
            }
        }
    };

    let found = |parameter: Option<ParamRef>, what: String| {
        parameter
            .map(|parameter| Target::Parameter {
                track: Some(track),
                device: Some(device),
                parameter,
            })
            .ok_or(BindError::ParameterNotFound { parameter: what })
    };

    if let Some(name) = &desc.chain {
        let chain = pick(&set.chains(device), name, |c| set.chain_name(c)).ok_or_else(|| {
            BindError::ChainNotFound {
                chain: name.clone(),
            }
        })?;
        let parameter = chain_parameter(set, chain, desc)?;
        return Ok(Target::Parameter {
            track: Some(track),
            device: Some(device),
            parameter,
        });
    }

    match desc.parameter_type {
        Some(ParameterType::Sel) => return Ok(Target::DeviceSelect { track, device }),
        Some(ParameterType::Cs) => {
            return found(set.chain_selector(device), "chain selector".into());
        }
        Some(other) => {
            return Err(BindError::Unsupported {
                what: format!("{other} on a device"),
            });
        }
        None => {}
    }

    if let (Some(bank), Some(number)) = (desc.bank, desc.parameter_number) {
        return found(
            set.banked_parameter(device, bank, number, prefer_left),
            format!("B{bank} P{number}"),
        );
    }

    let parameters = set.parameters(device);
    if let Some(name) = &desc.parameter_name {
        let p = parameters
            .iter()
            .copied()
            .find(|p| set.parameter(*p).is_some_and(|s| &s.name == name));
        return found(p, name.clone());
    }
    // P<n> counts past the on/off switch at index 0; no parameter means the switch.
    let index = desc.parameter_number.unwrap_or(0) as usize;
    found(parameters.get(index).copied(), format!("P{index}"))
}
