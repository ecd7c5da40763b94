// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `taskbench`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskbench",
    version,
    about = "Run technician toolkit actions defined in a config file.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Taskbench.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Taskbench.toml")]
    pub config: String,

    /// Actions to run, in order. Ignored with `--all`.
    #[arg(value_name = "ACTION")]
    pub actions: Vec<String>,

    /// Run every configured action.
    #[arg(long)]
    pub all: bool,

    /// List the configured actions and exit.
    #[arg(long)]
    pub list: bool,

    /// Parse + validate, print what would run, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKBENCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
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
