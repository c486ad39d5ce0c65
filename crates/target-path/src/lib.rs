//! Compact target paths naming a track, device, parameter or track attribute.
//!
//! `parse` is total: malformed input yields a descriptor with its `error`
//! field set rather than a panic or a `Result`.

mod descriptor;
mod parse;

#[cfg(test)]
mod test_parse;

pub use descriptor::{CrossfadeAssign, MonitorState, ParameterType, TargetDescriptor};
pub use parse::parse;
