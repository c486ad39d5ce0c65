#![warn(missing_docs)]

//! Entry point for the `surface` binary.

mod cli;
mod commands;
mod error;

use std::process;

use clap::Parser;
use tracing::error;

use crate::{
    cli::{Cli, Commands},
    error::Result,
};

fn main() {
    if let Err(err) = run() {
        error!("{err}");
        eprintln!("error: {err}");
        process::exit(1);
    }
}

/// Parse CLI arguments, install logging, and dispatch to the chosen subcommand.
fn run() -> Result<()> {
    let Cli { log, command } = Cli::parse();
    logging::init(&log);

    let out = match command {
        Commands::Check(args) => commands::check(&args.config)?,
        Commands::ParseTarget(args) => commands::parse_target(&args.path)?,
        Commands::Compile(args) => commands::compile(
            &args.template,
            args.context.as_deref(),
            args.vars.as_deref(),
        )?,
    };
    println!("{out}");
    Ok(())
}
