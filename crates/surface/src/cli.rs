//! Command-line interface definitions for the `surface` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use logging::LogArgs;

/// Command-line interface for the `surface` binary.
#[derive(Parser, Debug)]
#[command(
    name = "surface",
    about = "Check control-surface configurations and their parts",
    version
)]
pub struct Cli {
    /// Logging controls shared across surface binaries.
    #[command(flatten)]
    pub log: LogArgs,

    /// What to check.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build every control and encoder of a configuration against an empty live set.
    Check(CheckArgs),
    /// Parse a binding target path and print its descriptor as JSON.
    ParseTarget(ParseTargetArgs),
    /// Compile a `${...}` template against a context.
    Compile(CompileArgs),
}

/// Arguments for the `check` subcommand.
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Path to a JSON configuration file.
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

/// Arguments for the `parse-target` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ParseTargetArgs {
    /// Target path, e.g. `SEL / DEV(1) P2`.
    #[arg(value_name = "PATH")]
    pub path: String,
}

/// Arguments for the `compile` subcommand.
#[derive(Args, Debug, Clone)]
pub struct CompileArgs {
    /// Template text, e.g. `track ${me.Index}`.
    #[arg(value_name = "TEMPLATE")]
    pub template: String,

    /// Context as a JSON object, either `{"me": {...}}` or the bare `me` object.
    #[arg(long, value_name = "JSON")]
    pub context: Option<String>,

    /// Variable declarations as a JSON object, evaluated in order.
    #[arg(long, value_name = "JSON")]
    pub vars: Option<String>,
}
