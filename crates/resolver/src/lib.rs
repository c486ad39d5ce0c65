//! Expression evaluation for control-surface configuration.
//!
//! [`Resolver`] evaluates `${expr}` placeholders against a control's
//! [`Context`](surface_config::Context), its declared variables and the
//! surface-wide [`Globals`]. [`execute_command_bundle`] runs a flattened
//! action bundle against an [`ActionHost`]. Expression failures never panic or abort the caller; they
//! surface as values carrying a non-zero [`status`](ExprError::status).

mod command;
mod error;
mod globals;
mod resolve;

#[cfg(test)]
mod test_compile;

pub use command::{
    ActionHost, Command, ExecOptions, ExecReport, execute_command_bundle, flatten,
    parse_command_bundle,
};
pub use error::{CompileError, Error, ExecError, ExprError, FAILURE_STATUS, Result};
pub use globals::Globals;
pub use resolve::{ResolvedVars, Resolver, compile_with_status};
