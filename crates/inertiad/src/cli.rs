//! Command-line interface definitions for inertiad.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use logging::LogArgs;

/// Command-line interface for the `inertiad` binary.
#[derive(Parser, Debug)]
#[command(
    name = "inertiad",
    about = "Accelerating key repeat for macOS",
    version
)]
pub struct Cli {
    /// Logging controls shared across inertia binaries.
    #[command(flatten)]
    pub log: LogArgs,

    /// Also append logs to this file.
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// What to do.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the engine until interrupted. SIGHUP reloads settings.
    Run(ConfigArgs),
    /// Report Accessibility and Input Monitoring permission status.
    Check,
    /// Print the repeat interval for each step of the configured curve.
    Curve(CurveArgs),
    /// Write a default settings file.
    InitConfig(InitConfigArgs),
}

/// Settings file location.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Settings file (RON). Defaults to ~/.config/inertia/settings.ron.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Arguments for the `curve` subcommand.
#[derive(Args, Debug, Clone)]
pub struct CurveArgs {
    /// Settings file location.
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Number of repeats to print.
    #[arg(long, default_value_t = 32)]
    pub count: u32,
}

/// Arguments for the `init-config` subcommand.
#[derive(Args, Debug, Clone)]
pub struct InitConfigArgs {
    /// Settings file location.
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}
