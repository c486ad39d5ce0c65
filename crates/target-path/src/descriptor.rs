use std::fmt;

use serde::Serialize;

/// The kind of target addressed by a parsed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParameterType {
    /// Currently selected parameter in the host.
    Selp,
    /// Master crossfader.
    Xfader,
    /// Mixer volume.
    Vol,
    /// Mixer pan.
    Pan,
    /// Cue (preview) volume.
    Cue,
    /// Left split-stereo pan.
    PanL,
    /// Right split-stereo pan.
    PanR,
    /// Mixer send.
    Send,
    /// Send on a rack chain's mixer.
    #[serde(rename = "CHAIN_SEND")]
    ChainSend,
    /// Chain selector of a rack device.
    Cs,
    /// Track arm.
    Arm,
    /// Track mute.
    Mute,
    /// Track solo.
    Solo,
    /// Track (or device, after `DEV(...)`) selection.
    Sel,
    /// Launch playing clip.
    Play,
    /// Stop track clips.
    Stop,
    /// Monitoring state.
    Mon,
    /// Crossfade assignment.
    Xfade,
}

impl ParameterType {
    /// Parse one of the plain mixer keywords accepted after a track selector.
    pub(crate) fn mixer_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "VOL" => Some(Self::Vol),
            "PAN" => Some(Self::Pan),
            "CUE" => Some(Self::Cue),
            "XFADER" => Some(Self::Xfader),
            "PANL" => Some(Self::PanL),
            "PANR" => Some(Self::PanR),
            _ => None,
        }
    }

    /// True for types that address a continuous parameter rather than a track attribute.
    pub fn is_parameter(self) -> bool {
        matches!(
            self,
            Self::Selp
                | Self::Xfader
                | Self::Vol
                | Self::Pan
                | Self::Cue
                | Self::PanL
                | Self::PanR
                | Self::Send
                | Self::ChainSend
                | Self::Cs
        )
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Selp => "SELP",
            Self::Xfader => "XFADER",
            Self::Vol => "VOL",
            Self::Pan => "PAN",
            Self::Cue => "CUE",
            Self::PanL => "PANL",
            Self::PanR => "PANR",
            Self::Send => "SEND",
            Self::ChainSend => "CHAIN_SEND",
            Self::Cs => "CS",
            Self::Arm => "ARM",
            Self::Mute => "MUTE",
            Self::Solo => "SOLO",
            Self::Sel => "SEL",
            Self::Play => "PLAY",
            Self::Stop => "STOP",
            Self::Mon => "MON",
            Self::Xfade => "XFADE",
        };
        f.write_str(s)
    }
}

/// Track monitoring position, in the order the host enumerates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    /// Always monitor input.
    In,
    /// Monitor when armed.
    Auto,
    /// Never monitor.
    Off,
}

impl MonitorState {
    /// All states, indexed by the host's integer representation.
    pub const ALL: [Self; 3] = [Self::In, Self::Auto, Self::Off];

    /// Parse a case-insensitive keyword.
    pub(crate) fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "IN" => Some(Self::In),
            "AUTO" => Some(Self::Auto),
            "OFF" => Some(Self::Off),
            _ => None,
        }
    }

    /// Host index of this state.
    pub fn index(self) -> usize {
        match self {
            Self::In => 0,
            Self::Auto => 1,
            Self::Off => 2,
        }
    }
}

/// Crossfader side assignment, in the order the host enumerates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossfadeAssign {
    /// Side A.
    A,
    /// Unassigned.
    Off,
    /// Side B.
    B,
}

impl CrossfadeAssign {
    /// All assignments, indexed by the host's integer representation.
    pub const ALL: [Self; 3] = [Self::A, Self::Off, Self::B];

    /// Parse a case-insensitive keyword.
    pub(crate) fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "A" => Some(Self::A),
            "OFF" => Some(Self::Off),
            "B" => Some(Self::B),
            _ => None,
        }
    }

    /// Host index of this assignment.
    pub fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::Off => 1,
            Self::B => 2,
        }
    }
}

/// Structured result of parsing a target path.
///
/// Fields are flat and mostly optional; exactly one interpretation is
/// populated for a well-formed path. A malformed path sets [`error`] and
/// leaves whatever was parsed before the violation.
///
/// [`error`]: TargetDescriptor::error
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TargetDescriptor {
    /// The original input string.
    pub input: String,
    /// Track selector: a name, a 1-based index, `SEL` or `MST`.
    pub track: Option<String>,
    /// Zero-based offset into the session ring.
    pub ring_track: Option<u32>,
    /// Device selector: a name, a 1-based index, or `SEL`.
    pub device: Option<String>,
    /// What kind of target this addresses.
    pub parameter_type: Option<ParameterType>,
    /// Device parameter addressed by name.
    pub parameter_name: Option<String>,
    /// 1-based parameter bank.
    pub bank: Option<u32>,
    /// 1-based parameter number (within `bank` when one is given).
    pub parameter_number: Option<u32>,
    /// Rack chain name narrowed with `CH(...)`.
    pub chain: Option<String>,
    /// Send letter.
    pub send: Option<String>,
    /// Alternating device/chain path through nested racks.
    pub chain_map: Option<Vec<String>>,
    /// Set when the path could not be parsed.
    pub error: Option<String>,
    /// Return track letter.
    pub send_track: Option<String>,
    /// Target is the track's arm state.
    pub arm: bool,
    /// Target is the track's mute state.
    pub mute: bool,
    /// Target is the track's solo state.
    pub solo: bool,
    /// Target is the track's selection state.
    pub track_select: bool,
    /// Target is the track's play state.
    pub play: bool,
    /// Target is the track's stop state.
    pub stop: bool,
    /// Monitoring position addressed by `MON`.
    pub monitor: Option<MonitorState>,
    /// Crossfade assignment addressed by `XFADE`.
    pub x_fade_assign: Option<CrossfadeAssign>,
}

impl TargetDescriptor {
    /// An empty descriptor remembering its input.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
            ..Default::default()
        }
    }

    /// True when the path was `NONE` or otherwise names nothing.
    pub fn is_empty(&self) -> bool {
        self.track.is_none()
            && self.ring_track.is_none()
            && self.device.is_none()
            && self.parameter_type.is_none()
            && self.parameter_name.is_none()
            && self.parameter_number.is_none()
            && self.chain_map.is_none()
            && self.send_track.is_none()
            && self.error.is_none()
    }

    /// True when the path reaches into a device or rack chain.
    pub fn targets_device(&self) -> bool {
        self.device.is_some() || self.chain_map.is_some()
    }

    /// True when the path addresses a boolean or enumerated track attribute.
    pub fn targets_track_attribute(&self) -> bool {
        self.arm
            || self.mute
            || self.solo
            || self.track_select
            || self.play
            || self.stop
            || self.monitor.is_some()
            || self.x_fade_assign.is_some()
    }

    /// Record a grammar violation.
    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }
}
