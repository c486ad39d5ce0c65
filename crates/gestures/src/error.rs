use surface_config::BundleError;
use thiserror::Error;

/// Error type for gesture table construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GestureError {
    /// The key does not start with a known gesture name.
    #[error("unknown gesture '{gesture}' in '{key}'")]
    UnknownGesture {
        /// The full gesture key.
        key: String,
        /// The gesture part of the key.
        gesture: String,
    },
    /// The key names a mode that was never declared.
    #[error("unknown mode '{mode}' in '{key}'")]
    UnknownMode {
        /// The full gesture key.
        key: String,
        /// The undeclared mode.
        mode: String,
    },
    /// The action bundle for a key is malformed.
    #[error("gesture '{key}': {source}")]
    Bundle {
        /// The full gesture key.
        key: String,
        /// Bundle parse failure.
        source: BundleError,
    },
}

impl From<GestureError> for surface_config::Error {
    fn from(e: GestureError) -> Self {
        Self::config(e.to_string())
    }
}
