// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `rulewatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rulewatch",
    version,
    about = "Run commands when files matching watch rules change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Rulewatch.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Build mode: run the initial pass once, no watching.
    #[arg(long)]
    pub once: bool,

    /// Base directory for relative patterns (overrides `[config].cwd`).
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<String>,

    /// Disable change-loop warnings.
    #[arg(long)]
    pub no_cycle_detection: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RULEWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print rules, roots and current matches, but don't
    /// run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
