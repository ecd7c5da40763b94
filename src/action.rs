// src/action.rs

//! Command-backed toolkit actions.
//!
//! The toolkit's bread and butter: an action that runs one external
//! diagnostic/repair command and classifies its output lines into
//! PASS/WARN/FAIL logbook entries via regexes from the config.

use anyhow::bail;
use regex::Regex;

use crate::config::model::ActionConfig;
use crate::errors::{Result, ToolkitError};
use crate::executor::ActionContext;
use crate::logbook::LogLevel;

/// Compiled output classifiers for one action.
#[derive(Debug)]
pub struct OutputRules {
    pass: Option<Regex>,
    warn: Option<Regex>,
    fail: Option<Regex>,
}

impl OutputRules {
    /// Compile the patterns from an action's config.
    ///
    /// Also used by config validation, so a bad pattern is rejected at load
    /// time rather than mid-action.
    pub fn compile(action: &ActionConfig) -> Result<Self> {
        Ok(Self {
            pass: compile_rule("pass_on_output", &action.pass_on_output)?,
            warn: compile_rule("warn_on_output", &action.warn_on_output)?,
            fail: compile_rule("fail_on_output", &action.fail_on_output)?,
        })
    }

    /// Level for one output line. FAIL wins over WARN wins over PASS;
    /// unmatched lines stay INFO.
    pub fn classify(&self, line: &str) -> LogLevel {
        if matches(&self.fail, line) {
            LogLevel::Fail
        } else if matches(&self.warn, line) {
            LogLevel::Warn
        } else if matches(&self.pass, line) {
            LogLevel::Pass
        } else {
            LogLevel::Info
        }
    }
}

fn matches(rule: &Option<Regex>, line: &str) -> bool {
    rule.as_ref().is_some_and(|re| re.is_match(line))
}

fn compile_rule(field: &str, pattern: &Option<String>) -> Result<Option<Regex>> {
    match pattern {
        Some(p) => Regex::new(p).map(Some).map_err(|e| {
            ToolkitError::ConfigError(format!("invalid {field} regex '{p}': {e}"))
        }),
        None => Ok(None),
    }
}

/// Work body for a config-defined command action.
///
/// Runs the command through the context's runner, logs every captured line at
/// its classified level, and fails when the fail rule matched or the exit
/// code is non-zero. Intended to be handed to
/// [`ActionExecutor::run`](crate::executor::ActionExecutor::run) /
/// [`run_detached`](crate::executor::ActionExecutor::run_detached) as
/// `move |ctx| run_command_action(ctx, action)`.
pub async fn run_command_action(ctx: ActionContext, action: ActionConfig) -> anyhow::Result<()> {
    if ctx.is_cancelled() {
        bail!("cancelled before start");
    }

    let rules = OutputRules::compile(&action)?;
    let output = ctx.runner().run(&action.command, &action.args).await;

    let mut fail_matched = false;
    for line in output.output_lines() {
        let level = rules.classify(line);
        fail_matched |= level == LogLevel::Fail;
        ctx.logbook().append(level, line);
    }

    if let Some(err) = output.error {
        return Err(err.into());
    }
    if fail_matched {
        bail!("output matched the fail pattern");
    }
    if output.exit_code != 0 {
        bail!("exit code {}", output.exit_code);
    }
    Ok(())
}
