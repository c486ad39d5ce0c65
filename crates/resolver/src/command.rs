//! Flattening and executing action bundles.

use serde_json::Value;
use surface_config::{ActionBundle, BundleError, Callback, Context, Directive, Map};
use tracing::{debug, info, warn};

use crate::{
    error::{CompileError, ExecError},
    resolve::Resolver,
};

/// A primitive action item, after flattening.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// A bare action string for the action trigger.
    Literal(String),
    /// A tagged directive.
    Directive(Directive),
    /// A code-supplied callback.
    Callback(Callback),
}

/// Flatten a bundle into primitive items, in order.
///
/// Sequencers pick (and advance) once per flatten.
pub fn flatten(bundle: &ActionBundle) -> Vec<Command> {
    let mut out = Vec::new();
    flatten_into(bundle, &mut out);
    out
}

/// Recursive worker for [`flatten`].
fn flatten_into(bundle: &ActionBundle, out: &mut Vec<Command>) {
    match bundle {
        ActionBundle::Literal(s) => out.push(Command::Literal(s.clone())),
        ActionBundle::Directive(d) => out.push(Command::Directive(d.clone())),
        ActionBundle::Callback(c) => out.push(Command::Callback(c.clone())),
        ActionBundle::Sequence(items) => {
            for item in items {
                flatten_into(item, out);
            }
        }
        ActionBundle::Sequencer(seq) => flatten_into(seq.next_item(), out),
    }
}

/// Read a configuration value and flatten it.
pub fn parse_command_bundle(value: &Value) -> Result<Vec<Command>, BundleError> {
    Ok(flatten(&ActionBundle::from_value(value)?))
}

/// Collaborators that directives act on.
///
/// Methods returning `Result` report refusal as a message; the executor
/// turns it into an [`ExecError`].
pub trait ActionHost {
    /// Run an external action list.
    fn trigger_action(&mut self, action: &str);

    /// Write a user log line.
    fn log(&mut self, text: &str) {
        info!(target: "surface::user", "{}", text);
    }

    /// Show a transient status message.
    fn show_message(&mut self, text: &str);

    /// Switch page. Returns false when the page does not exist.
    fn request_page(&mut self, page: &str) -> bool;

    /// Return to the previously shown page.
    fn return_to_last_page(&mut self);

    /// Redraw the whole surface.
    fn refresh(&mut self);

    /// Enable a mode.
    fn add_mode(&mut self, mode: &str) -> Result<(), String>;

    /// Disable a mode.
    fn remove_mode(&mut self, mode: &str) -> Result<(), String>;

    /// Flip a mode.
    fn toggle_mode(&mut self, mode: &str) -> Result<(), String>;

    /// Set the calling control's color. `"initial"` restores the configured one.
    fn set_color(&mut self, _color: &Value) -> Result<(), String> {
        Err("this control has no color".into())
    }

    /// Toggle the calling control's bound target.
    fn toggle_target(&mut self) -> Result<(), String> {
        Err("`do_toggle` is only available on `param` controls".into())
    }
}

/// Execution settings for one bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOptions {
    /// Stop at the first failing item and return its error.
    pub abort_on_failure: bool,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            abort_on_failure: true,
        }
    }
}

/// What happened when a bundle ran without aborting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecReport {
    /// Items that completed.
    pub executed: usize,
    /// Items that failed and were skipped.
    pub failures: Vec<ExecError>,
}

impl ExecReport {
    /// True when every item completed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run every item of `bundle` against `host`.
///
/// Template text is compiled item by item against `decls` and `context`.
/// With `abort_on_failure` the first failure is returned and the rest of
/// the bundle is skipped; otherwise failures are logged and collected.
pub fn execute_command_bundle(
    resolver: &Resolver,
    host: &mut dyn ActionHost,
    bundle: &ActionBundle,
    decls: &Map,
    context: &Context,
    options: ExecOptions,
) -> Result<ExecReport, ExecError> {
    let mut report = ExecReport::default();
    for command in flatten(bundle) {
        match execute_command(resolver, host, &command, decls, context) {
            Ok(()) => report.executed += 1,
            Err(e) => {
                warn!(error = %e, abort = options.abort_on_failure, "command_failed");
                if options.abort_on_failure {
                    return Err(e);
                }
                report.failures.push(e);
            }
        }
    }
    Ok(report)
}

/// Run one primitive item.
fn execute_command(
    resolver: &Resolver,
    host: &mut dyn ActionHost,
    command: &Command,
    decls: &Map,
    context: &Context,
) -> Result<(), ExecError> {
    let compile = |text: &str| -> Result<String, CompileError> {
        resolver.compile(text, decls, context)
    };
    let host_err = |tag: &str| {
        let tag = tag.to_string();
        move |message: String| ExecError::Host { tag, message }
    };
    match command {
        Command::Literal(text) => host.trigger_action(&compile(text)?),
        Command::Callback(cb) => cb.call(),
        Command::Directive(d) => match d {
            Directive::Cxp(text) => host.trigger_action(&compile(text)?),
            Directive::Log(text) => host.log(&compile(text)?),
            Directive::Msg(text) => host.show_message(&compile(text)?),
            Directive::Page(text) => {
                let page = compile(text)?;
                if page == "last" {
                    host.return_to_last_page();
                } else if !host.request_page(&page) {
                    return Err(ExecError::PageChange { page });
                }
            }
            Directive::Mode(text) => host
                .toggle_mode(&compile(text)?)
                .map_err(host_err(d.tag()))?,
            Directive::ModeOn(text) => {
                host.add_mode(&compile(text)?).map_err(host_err(d.tag()))?;
            }
            Directive::ModeOff(text) => host
                .remove_mode(&compile(text)?)
                .map_err(host_err(d.tag()))?,
            Directive::Refresh => host.refresh(),
            Directive::Color(spec) => {
                let spec = match spec {
                    Value::String(s) => Value::String(compile(s)?),
                    other => other.clone(),
                };
                host.set_color(&spec).map_err(host_err(d.tag()))?;
            }
            Directive::Toggle => host.toggle_target().map_err(host_err(d.tag()))?,
            Directive::Unrecognized(tag) => {
                return Err(ExecError::UnknownDirective { tag: tag.clone() });
            }
        },
    }
    debug!(?command, "command_executed");
    Ok(())
}
