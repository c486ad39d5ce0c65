//! Error types for configuration compilation.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Errors produced while compiling a configuration tree into control definitions.
pub enum Error {
    #[error("{message}")]
    /// A recoverable problem confined to one control: the control is replaced
    /// with an inert placeholder unless strict mode is on.
    Configuration {
        /// Section, control or encoder the error is attached to.
        location: Option<String>,
        /// Human-readable error message.
        message: String,
    },
    #[error("{message}")]
    /// A structural problem that aborts startup.
    Critical {
        /// Section, control or encoder the error is attached to.
        location: Option<String>,
        /// Human-readable error message.
        message: String,
    },
}

impl Error {
    /// A recoverable configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            location: None,
            message: message.into(),
        }
    }

    /// A fatal configuration error.
    pub fn critical(message: impl Into<String>) -> Self {
        Self::Critical {
            location: None,
            message: message.into(),
        }
    }

    /// Attach a location, keeping any location already present.
    pub fn at(self, loc: impl Into<String>) -> Self {
        match self {
            Self::Configuration { location, message } => Self::Configuration {
                location: location.or_else(|| Some(loc.into())),
                message,
            },
            Self::Critical { location, message } => Self::Critical {
                location: location.or_else(|| Some(loc.into())),
                message,
            },
        }
    }

    /// True for errors that abort startup.
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::Critical { .. })
    }

    /// The location attached to this error, if any.
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Configuration { location, .. } | Self::Critical { location, .. } => {
                location.as_deref()
            }
        }
    }

    /// The bare message.
    pub fn message(&self) -> &str {
        match self {
            Self::Configuration { message, .. } | Self::Critical { message, .. } => message,
        }
    }

    /// Render a human-friendly error message including the location when available.
    pub fn pretty(&self) -> String {
        let kind = if self.is_critical() {
            "Critical configuration error"
        } else {
            "Configuration error"
        };
        match self.location() {
            Some(loc) => format!("{kind} in {loc}\n{}", self.message()),
            None => format!("{kind}\n{}", self.message()),
        }
    }
}

/// Policy applied when a recoverable configuration error is found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    /// Promote every configuration error to critical.
    pub strict: bool,
}

impl Policy {
    /// Promote `err` to critical when strict mode is on.
    pub fn escalate(&self, err: Error) -> Error {
        match err {
            Error::Configuration { location, message } if self.strict => {
                Error::Critical { location, message }
            }
            other => other,
        }
    }
}
