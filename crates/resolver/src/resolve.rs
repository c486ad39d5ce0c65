//! Variable resolution and `${...}` template compilation.

use std::fmt;

use regex::{Captures, Regex};
use rhai::{Dynamic, Engine, INT, Scope, serde::to_dynamic};
use serde_json::Value;
use surface_config::{Context, Map, value::scalar_text};
use tracing::{debug, info, warn};

use crate::{
    error::{CompileError, Error, ExprError},
    globals::Globals,
};

/// Placeholder pattern: three escaped spellings, then `${expr}`.
const PLACEHOLDER: &str = r"\\\$\\\{|\\\$\{|\$\\\{|\$\{([^{}\\]*)\}";

/// Marker whose presence makes a string a template.
const MARKER: &str = "${";

/// Variables resolved for one compile, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ResolvedVars {
    /// Name and value pairs.
    vars: Vec<(String, Dynamic)>,
}

impl ResolvedVars {
    /// Look up a variable; later declarations shadow earlier ones.
    pub fn get(&self, name: &str) -> Option<&Dynamic> {
        self.vars.iter().rev().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Text of a variable as it would be substituted.
    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name).map(stringify)
    }

    /// Number of resolved variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// True when nothing was declared.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Append a resolved variable.
    fn push(&mut self, name: String, value: Dynamic) {
        self.vars.push((name, value));
    }
}

/// Render an evaluation result the way it is substituted into text.
fn stringify(d: &Dynamic) -> String {
    if d.is_unit() {
        return String::new();
    }
    d.to_string()
}

/// Evaluates expressions against a control's context and compiles templates.
pub struct Resolver {
    /// Sandboxed expression engine.
    engine: Engine,
    /// Compiled placeholder pattern.
    pattern: Regex,
    /// Surface-wide names.
    globals: Globals,
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver").finish_non_exhaustive()
    }
}

impl Resolver {
    /// Build a resolver with a sandboxed engine.
    pub fn new() -> Result<Self, Error> {
        let mut engine = Engine::new();
        configure_engine(&mut engine);
        Ok(Self {
            engine,
            pattern: Regex::new(PLACEHOLDER)?,
            globals: Globals::default(),
        })
    }

    /// Surface-wide names currently visible to expressions.
    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    /// Replace the surface-wide names.
    pub fn set_globals(&mut self, globals: Globals) {
        if self.globals != globals {
            debug!(
                surface = %globals.surface,
                selected_track = ?globals.selected_track,
                ring = globals.ring_offset,
                "globals_changed"
            );
            self.globals = globals;
        }
    }

    /// Evaluate one expression against `context` and `resolved`.
    ///
    /// A leading `$` is ignored, so `${$me.index}` and `${me.index}` agree.
    pub fn eval(
        &self,
        expr: &str,
        context: &Context,
        resolved: &ResolvedVars,
    ) -> Result<Dynamic, ExprError> {
        let expr = expr.strip_prefix('$').unwrap_or(expr).trim();
        let fail = |message: String| ExprError::Eval {
            expr: expr.to_string(),
            message,
        };
        let mut scope = self.scope(context, resolved).map_err(fail)?;
        self.engine
            .eval_expression_with_scope::<Dynamic>(&mut scope, expr)
            .map_err(|e| {
                debug!(expr, error = %e, "expression_failed");
                fail(e.to_string())
            })
    }

    /// Resolve variable declarations in order. Each may use earlier ones.
    pub fn resolve_vars(
        &self,
        decls: &Map,
        context: &Context,
    ) -> Result<ResolvedVars, ExprError> {
        let mut resolved = ResolvedVars::default();
        for (name, decl) in decls {
            let expr = match decl {
                Value::String(s) => s.clone(),
                other => scalar_text(other).ok_or_else(|| ExprError::NotAnExpression {
                    name: name.clone(),
                })?,
            };
            let value = self.eval(&expr, context, &resolved).map_err(|e| {
                let message = match e {
                    ExprError::Eval { message, .. } => message,
                    other => other.to_string(),
                };
                ExprError::Variable {
                    name: name.clone(),
                    message,
                }
            })?;
            resolved.push(name.clone(), value);
        }
        Ok(resolved)
    }

    /// Substitute every `${expr}` in `template`.
    ///
    /// Strings without a marker come back unchanged. Escaped markers stay as
    /// written. One failing expression fails the whole compile.
    pub fn compile(
        &self,
        template: &str,
        decls: &Map,
        context: &Context,
    ) -> Result<String, CompileError> {
        if !template.contains(MARKER) {
            return Ok(template.to_string());
        }
        let fail = |error: ExprError| CompileError {
            template: template.to_string(),
            error,
        };
        let resolved = self.resolve_vars(decls, context).map_err(fail)?;

        let mut out = String::with_capacity(template.len());
        let mut last = 0;
        for caps in self.pattern.captures_iter(template) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            out.push_str(&template[last..whole.start()]);
            out.push_str(&self.replacement(&caps, context, &resolved).map_err(fail)?);
            last = whole.end();
        }
        out.push_str(&template[last..]);
        Ok(out)
    }

    /// Text substituted for one placeholder match.
    fn replacement(
        &self,
        caps: &Captures<'_>,
        context: &Context,
        resolved: &ResolvedVars,
    ) -> Result<String, ExprError> {
        let whole = caps.get(0).map_or("", |m| m.as_str());
        let Some(expr) = caps.get(1).map(|m| m.as_str()).filter(|e| !e.is_empty()) else {
            return Ok(whole.to_string());
        };
        if let Some(text) = resolved.text(expr) {
            return Ok(text);
        }
        self.eval(expr, context, resolved).map(|v| stringify(&v))
    }

    /// Scope holding the globals, `me` and the resolved variables.
    fn scope(
        &self,
        context: &Context,
        resolved: &ResolvedVars,
    ) -> Result<Scope<'static>, String> {
        let mut scope = Scope::new();
        let g = &self.globals;
        scope.push_constant_dynamic("this_cs", Dynamic::from(g.surface.clone()));
        let sel = g.selected_track.clone().map_or(Dynamic::UNIT, Dynamic::from);
        scope.push_constant_dynamic("sel_track", sel);
        scope.push_constant_dynamic("ring", Dynamic::from(INT::from(g.ring_offset)));
        let me = to_dynamic(Value::Object(context.me().clone()))
            .map_err(|e| e.to_string())?;
        scope.push_dynamic("me", me);
        for (name, value) in &resolved.vars {
            scope.push_dynamic(name.clone(), value.clone());
        }
        Ok(scope)
    }
}

/// Sandbox limits and logging hooks for the expression engine.
fn configure_engine(engine: &mut Engine) {
    engine.on_print(|s| info!(target: "resolver::expr", "{}", s));
    engine.on_debug(|s, src, pos| {
        debug!(target: "resolver::expr", "{} @ {:?}:{:?}", s, src, pos);
    });
    engine.set_fail_on_invalid_map_property(true);

    engine.set_max_operations(200_000);
    engine.set_max_call_levels(64);
    engine.set_max_expr_depths(128, 64);
    engine.set_max_string_size(64 * 1024);
    engine.set_max_array_size(10_000);
    engine.set_max_map_size(10_000);
}

/// Compile `template`, logging and reporting failure as a status code.
///
/// Returns the compiled string with status 0, or the original with a
/// non-zero status.
pub fn compile_with_status(
    resolver: &Resolver,
    template: &str,
    decls: &Map,
    context: &Context,
) -> (String, i32) {
    match resolver.compile(template, decls, context) {
        Ok(s) => (s, 0),
        Err(e) => {
            warn!(template, error = %e.error, "compile_failed");
            let status = e.status();
            (e.template, status)
        }
    }
}
