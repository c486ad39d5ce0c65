//! Subcommand bodies. Each returns the text to print.

use std::{fs, path::Path, sync::Arc};

use binder::mock::MockSet;
use crossbeam_channel::unbounded;
use resolver::{Globals, Resolver};
use serde_json::Value;
use surface_config::{Context, DEFAULT_SURFACE_NAME, Map, SurfaceConfig};
use surface_engine::{ChannelEffects, Engine, Error as EngineError};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Load a configuration file and build an engine from it.
pub fn check(path: &Path) -> Result<String> {
    let text = fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = SurfaceConfig::from_json(&text)?;
    info!(path = %path.display(), "checking_config");
    check_config(&config)
}

/// Build `config` against an empty live set and summarize the result.
fn check_config(config: &SurfaceConfig) -> Result<String> {
    let (tx, rx) = unbounded();
    let engine = Engine::new(
        config,
        Arc::new(MockSet::new()),
        Box::new(ChannelEffects::new(tx)),
    )
    .map_err(|e| match e {
        EngineError::Config(e) => Error::Config(e),
        other => Error::Engine(other),
    })?;
    debug!(events = rx.try_iter().count(), "startup_events");

    let broken: Vec<String> = engine
        .controls()
        .iter()
        .filter_map(|c| c.definition().error.as_ref())
        .map(|e| e.pretty())
        .collect();
    let mut out = vec![format!(
        "{} controls, {} encoders, {} modes",
        engine.controls().len(),
        engine.encoders().len(),
        engine.modes().declared().len(),
    )];
    if broken.is_empty() {
        out.push("ok".into());
    } else {
        out.push(format!("{} control(s) replaced by placeholders:", broken.len()));
        out.extend(broken);
    }
    Ok(out.join("\n"))
}

/// Parse a target path and render its descriptor.
pub fn parse_target(path: &str) -> Result<String> {
    let desc = target_path::parse(path);
    if let Some(message) = &desc.error {
        return Err(Error::BadTarget {
            path: path.to_string(),
            message: message.clone(),
        });
    }
    Ok(serde_json::to_string_pretty(&desc)?)
}

/// Compile `template` against an optional context and variable declarations.
pub fn compile(template: &str, context: Option<&str>, vars: Option<&str>) -> Result<String> {
    let context = match context {
        Some(text) => {
            let map = json_object("context", text)?;
            if matches!(map.get("me"), Some(Value::Object(_))) {
                Context::from_map(map)
            } else {
                Context::new(map)
            }
        }
        None => Context::default(),
    };
    let vars = match vars {
        Some(text) => json_object("vars", text)?,
        None => Map::new(),
    };
    let mut resolver = Resolver::new()?;
    resolver.set_globals(Globals::new(DEFAULT_SURFACE_NAME));
    Ok(resolver.compile(template, &vars, &context)?)
}

/// Parse a flag value that must be a JSON object.
fn json_object(flag: &'static str, text: &str) -> Result<Map> {
    match serde_json::from_str(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(Error::Json {
            flag,
            message: format!("expected an object, got {other}"),
        }),
        Err(e) => Err(Error::Json {
            flag,
            message: e.to_string(),
        }),
    }
}
