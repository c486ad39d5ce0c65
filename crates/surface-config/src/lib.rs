//! Configuration trees for control surfaces: layered templates, section
//! expansion, per-control definitions and the action bundles they carry.
//!
//! The entry point is [`SurfaceConfig::compile`], which turns a raw
//! configuration document into a [`CompiledSurface`]. Recoverable problems
//! replace the offending control with an inert placeholder; structural
//! problems abort with a critical [`Error`].

use std::result::Result as StdResult;

mod action;
mod context;
mod definition;
mod error;
mod modes;
mod named;
mod section;
mod surface;
mod template;
pub mod value;

#[cfg(test)]
mod test_template;

pub use action::{ActionBundle, BundleError, Callback, Directive, Order, Sequencer};
pub use context::Context;
pub use definition::{
    Cascade, ControlDefinition, ControlSettings, EncoderDefinition, EncoderSettings, GroupContext,
};
pub use error::{Error, Policy};
pub use modes::{DEFAULT_KEY, KEY_SEPARATOR, ModeSnapshot, mode_key, split_key};
pub use section::{Bounds, Coord, Position, Section};
pub use surface::{
    CompiledSurface, DEFAULT_ON_THRESHOLD, DEFAULT_SURFACE_NAME, NAMED_SECTION, Preferences,
    SectionConfig, SurfaceConfig,
};
pub use template::{TemplateCompiler, TemplateLibrary};
pub use value::Map;

/// Result alias for configuration operations.
pub type Result<T> = StdResult<T, Error>;
