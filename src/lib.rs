// src/lib.rs

pub mod action;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod executor;
pub mod logbook;
pub mod logging;
pub mod registry;

use std::io::Write as _;
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::action::run_command_action;
use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::{ActionConfig, ConfigFile};
use crate::errors::ToolkitError;
use crate::executor::{ActionExecutor, ActionHandle, ProgressSink};
use crate::logbook::{LogEntry, LogSink, Logbook};
use crate::registry::TaskRegistry;

/// High-level entry point used by `main.rs`.
///
/// This is the console shell around the core: it wires together
/// - config loading
/// - the logbook + a console sink
/// - the task registry
/// - the action executor with a console busy indicator
/// and guarantees exactly one shutdown sweep before returning. Returns an
/// error when any selected action failed, so the process exits non-zero.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    if args.list {
        print_action_list(&cfg);
        return Ok(());
    }

    let selected = select_actions(&cfg, &args)?;

    if args.dry_run {
        print_dry_run(&cfg, &selected);
        return Ok(());
    }

    let logbook = Arc::new(Logbook::new());
    logbook.add_sink(Box::new(ConsoleSink));

    let registry = Arc::new(TaskRegistry::new(cfg.config.shutdown_grace()));
    let executor = ActionExecutor::new(
        Arc::clone(&logbook),
        Arc::clone(&registry),
        Box::new(ConsoleProgress),
    );

    // Foreground actions run in order; background ones are joined afterwards
    // so their completion lines still land before shutdown.
    let mut handles: Vec<ActionHandle> = Vec::new();
    let mut failed: Vec<String> = Vec::new();
    for (name, action) in selected {
        if action.effective_background(cfg.config.background_default) {
            let handle = executor
                .run_detached(&name, move |ctx| run_command_action(ctx, action))?;
            handles.push(handle);
        } else {
            let outcome = executor
                .run(&name, move |ctx| run_command_action(ctx, action))
                .await;
            if !outcome.is_success() {
                failed.push(name);
            }
        }
    }

    for handle in handles {
        let name = handle.name().to_string();
        let outcome = handle.join().await;
        debug!(action = %name, ?outcome, "background action joined");
        if !outcome.is_success() {
            failed.push(name);
        }
    }

    // Exactly once, before the process exits.
    registry.shutdown_all().await;

    // Failures were already reported line by line; here they only decide the
    // exit status, so `taskbench some-action && ...` behaves in scripts.
    if !failed.is_empty() {
        anyhow::bail!(
            "{} action(s) failed: {}",
            failed.len(),
            failed.join(", ")
        );
    }
    Ok(())
}

/// Resolve the action names from the CLI against the config, preserving
/// order. `--all` takes every configured action in config order.
fn select_actions(cfg: &ConfigFile, args: &CliArgs) -> errors::Result<Vec<(String, ActionConfig)>> {
    if args.all {
        return Ok(cfg
            .action
            .iter()
            .map(|(name, action)| (name.clone(), action.clone()))
            .collect());
    }

    let mut selected = Vec::with_capacity(args.actions.len());
    for name in &args.actions {
        let action = cfg
            .action
            .get(name)
            .ok_or_else(|| ToolkitError::ActionNotFound(name.clone()))?;
        selected.push((name.clone(), action.clone()));
    }
    Ok(selected)
}

/// Console renderer for logbook entries: `[LEVEL] message` on stdout.
struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn publish(&self, entry: &LogEntry) -> anyhow::Result<()> {
        // A closed stdout (e.g. the output is piped into `head`) must come
        // back as an Err so the logbook's stderr fallback engages, not as
        // the panic `println!` would raise.
        let mut out = std::io::stdout().lock();
        writeln!(out, "[{}] {}", entry.level.tag(), entry.message)?;
        Ok(())
    }
}

/// Console stand-in for a GUI busy indicator.
struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn set_busy(&self, busy: bool) {
        debug!(busy, "busy indicator");
    }
}

/// Simple `--list` output: names, commands and descriptions.
fn print_action_list(cfg: &ConfigFile) {
    println!("configured actions ({}):", cfg.action.len());
    for (name, action) in cfg.action.iter() {
        match &action.description {
            Some(desc) => println!("  - {name}: {desc}"),
            None => println!("  - {name}"),
        }
        println!("      command: {} {}", action.command, action.args.join(" "));
    }
}

/// Simple dry-run output: what would run, and how.
fn print_dry_run(cfg: &ConfigFile, selected: &[(String, ActionConfig)]) {
    println!("taskbench dry-run");
    println!("  config.shutdown_grace_ms = {}", cfg.config.shutdown_grace_ms);
    println!("  config.background_default = {}", cfg.config.background_default);
    println!();

    println!("would run ({}):", selected.len());
    for (name, action) in selected {
        println!("  - {name}");
        println!("      command: {} {}", action.command, action.args.join(" "));
        if action.effective_background(cfg.config.background_default) {
            println!("      background: true");
        }
        if let Some(ref p) = action.pass_on_output {
            println!("      pass_on_output: {p}");
        }
        if let Some(ref p) = action.warn_on_output {
            println!("      warn_on_output: {p}");
        }
        if let Some(ref p) = action.fail_on_output {
            println!("      fail_on_output: {p}");
        }
    }

    debug!("dry-run complete (no execution)");
}
