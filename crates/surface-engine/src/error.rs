use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for the surface engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be turned into controls.
    #[error(transparent)]
    Config(#[from] surface_config::Error),

    /// An action bundle failed while handling a gesture.
    #[error(transparent)]
    Exec(#[from] resolver::ExecError),

    /// A binding operation was rejected.
    #[error(transparent)]
    Binding(#[from] binder::Error),

    /// The expression engine could not be built.
    #[error(transparent)]
    Resolver(#[from] resolver::Error),

    /// A mode name that was never declared.
    #[error("unknown mode: {mode}")]
    UnknownMode {
        /// The requested mode.
        mode: String,
    },

    /// The control has no binding to retarget.
    #[error("{name} is not a `param` control")]
    Unbound {
        /// Control name.
        name: String,
    },

    /// No control or encoder has this name.
    #[error("unknown control: {name}")]
    UnknownControl {
        /// The requested name.
        name: String,
    },
}
