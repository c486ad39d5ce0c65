//! Error handling for the surface CLI.

use std::{io, path::PathBuf, result};

use thiserror::Error;

/// Convenient result type for CLI operations.
pub type Result<T> = result::Result<T, Error>;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration file could not be read.
    #[error("reading {path}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// Configuration errors that stop the engine from starting.
    #[error("{}", .0.pretty())]
    Config(#[from] surface_config::Error),
    /// Engine setup errors.
    #[error(transparent)]
    Engine(#[from] surface_engine::Error),
    /// A JSON argument did not parse, or was not an object.
    #[error("invalid JSON for --{flag}: {message}")]
    Json {
        /// The offending flag.
        flag: &'static str,
        /// Parser message.
        message: String,
    },
    /// Output could not be rendered.
    #[error("rendering output: {0}")]
    Render(#[from] serde_json::Error),
    /// The expression engine failed.
    #[error(transparent)]
    Resolver(#[from] resolver::Error),
    /// A template did not compile.
    #[error(transparent)]
    Compile(#[from] resolver::CompileError),
    /// A target path did not parse.
    #[error("bad target `{path}`: {message}")]
    BadTarget {
        /// The input.
        path: String,
        /// Parser message.
        message: String,
    },
}
