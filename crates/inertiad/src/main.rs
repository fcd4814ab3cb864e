#![warn(missing_docs)]

//! Entry point for the `inertiad` binary.

mod cli;
mod curve;
mod error;
mod run;
mod settings;

use std::process;

use clap::Parser;
use inertia_engine::Config;
use tracing::{error, info};

use crate::{
    cli::{Cli, Commands, InitConfigArgs},
    error::Result,
};

fn main() {
    if let Err(err) = dispatch() {
        error!("{err}");
        eprintln!("error: {err}");
        process::exit(1);
    }
}

/// Parse CLI arguments, install logging, and dispatch to the chosen subcommand.
fn dispatch() -> Result<()> {
    let Cli {
        log,
        log_file,
        command,
    } = Cli::parse();
    logging::init(&log.spec(), log_file.as_deref())?;

    match command {
        Commands::Run(args) => run::run(&args),
        Commands::Check => {
            check();
            Ok(())
        }
        Commands::Curve(args) => {
            let path = settings::resolve_path(args.config.config.as_deref())?;
            let config = settings::load(&path)?;
            print!("{}", curve::render(&config, args.count));
            Ok(())
        }
        Commands::InitConfig(args) => init_config(&args),
    }
}

/// Print permission status.
fn check() {
    let status = permissions::check_permissions();
    let mark = |ok: bool| if ok { "granted" } else { "missing" };
    println!("Accessibility:    {}", mark(status.accessibility_ok));
    println!("Input Monitoring: {}", mark(status.input_ok));
    if !status.all_granted() {
        println!(
            "Grant {} in System Settings > Privacy & Security.",
            status.missing().join(" and ")
        );
    }
}

/// Write the default settings file.
fn init_config(args: &InitConfigArgs) -> Result<()> {
    let path = settings::resolve_path(args.config.config.as_deref())?;
    settings::write(&path, &Config::default(), args.force)?;
    info!(path = %path.display(), "settings_written");
    println!("{}", path.display());
    Ok(())
}
