use std::result::Result as StdResult;

use thiserror::Error;

use crate::TrackRef;

/// Why a descriptor could not be resolved against the live set.
///
/// These are expected at runtime and drive "disabled" feedback; they are
/// never configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindError {
    /// Nothing to bind: no active descriptor, or `NONE`.
    #[error("no target")]
    NoTarget,
    /// The descriptor carries a parse error.
    #[error("malformed target: {message}")]
    Malformed {
        /// Parser message.
        message: String,
    },
    /// No track matches the selector.
    #[error("no track found for {track}")]
    TrackNotFound {
        /// The selector as written.
        track: String,
    },
    /// The session ring has no track at this offset.
    #[error("no ring track at offset {offset}")]
    RingTrackMissing {
        /// Zero-based ring offset.
        offset: u32,
    },
    /// A send or return letter is out of range.
    #[error("invalid send {send} ({count} return tracks)")]
    InvalidSend {
        /// The letter as written.
        send: String,
        /// Number of return tracks in the set.
        count: usize,
    },
    /// A numbered device is not there yet; rebinding waits for the device list.
    #[error("device {index} missing")]
    DeviceMissing {
        /// Track whose device list is awaited.
        track: TrackRef,
        /// 1-based device index.
        index: u32,
    },
    /// No device matches the selector.
    #[error("no device found for {device}")]
    DeviceNotFound {
        /// The selector as written.
        device: String,
    },
    /// A chain path segment matched nothing.
    #[error("no chain found for {chain}")]
    ChainNotFound {
        /// The segment as written.
        chain: String,
    },
    /// The device has no such parameter.
    #[error("parameter {parameter} not found")]
    ParameterNotFound {
        /// Name, number or bank/number as written.
        parameter: String,
    },
    /// The track cannot take this target (a group track's monitor, a return's arm).
    #[error("{what} is unavailable on this track")]
    Unavailable {
        /// The attribute.
        what: &'static str,
    },
    /// The descriptor shape has no live interpretation.
    #[error("unsupported target: {what}")]
    Unsupported {
        /// What was asked for.
        what: String,
    },
}

impl BindError {
    /// True for the recoverable "device list not loaded yet" case.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::DeviceMissing { .. })
    }
}

/// Error type for building binding tables.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// `binding` is neither a string nor a mapping of strings.
    #[error("invalid binding config: {message}")]
    InvalidBinding {
        /// What was wrong.
        message: String,
    },
    /// The target string failed to compile.
    #[error("unparseable target: {target}")]
    Unparseable {
        /// The target as written.
        target: String,
    },
    /// The compiled target string failed to parse.
    #[error("bad target {target}: {message}")]
    BadTarget {
        /// The compiled target.
        target: String,
        /// Parser message.
        message: String,
    },
    /// A binding key names an undeclared mode.
    #[error("unknown mode '{mode}' in binding '{key}'")]
    UnknownMode {
        /// The binding key.
        key: String,
        /// The undeclared mode.
        mode: String,
    },
    /// An override named a mode slot the binding was not built with.
    #[error("no binding for mode `{mode}`; slots are fixed at startup")]
    UnknownSlot {
        /// The requested mode key.
        mode: String,
    },
}

impl From<Error> for surface_config::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidBinding { .. } => Self::critical(e.to_string()),
            _ => Self::config(e.to_string()),
        }
    }
}

/// Result alias for binding-table construction.
pub type Result<T> = StdResult<T, Error>;
