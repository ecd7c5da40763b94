// src/exec/command.rs

//! Individual external command execution.

use std::ffi::OsString;
use std::process::Stdio;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::logbook::Logbook;
use crate::registry::{CancelSignal, TaskRegistry};

use super::resolve::resolve_command;

/// Exit code reported when the command could not be resolved.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit code reported when the OS refused to start the process.
pub const EXIT_LAUNCH_FAILED: i32 = 1;
/// Exit code reported when no status could be collected (killed, signalled).
pub const EXIT_UNKNOWN: i32 = -1;

/// Why a command produced no useful exit status of its own.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("command not found: {0}")]
    NotFound(String),

    #[error("failed to launch '{command}': {cause}")]
    Launch { command: String, cause: String },

    #[error("'{0}' was terminated by the shutdown sweep")]
    Terminated(String),
}

/// Captured result of one external command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub error: Option<CommandError>,
}

impl CommandOutput {
    /// All captured lines, stdout first, then stderr, terminators stripped.
    pub fn output_lines(&self) -> impl Iterator<Item = &str> {
        self.stdout
            .iter()
            .chain(self.stderr.iter())
            .map(String::as_str)
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0 && self.error.is_none()
    }

    fn refused(exit_code: i32, error: CommandError) -> Self {
        Self {
            exit_code,
            stdout: Vec::new(),
            stderr: Vec::new(),
            error: Some(error),
        }
    }
}

/// Runs one external program to completion, capturing its output.
///
/// Every spawned process is registered in the [`TaskRegistry`] before it is
/// started, so the shutdown sweep can kill it; `run` observes the kill signal
/// and returns a best-effort result instead of hanging.
#[derive(Clone)]
pub struct CommandRunner {
    registry: Arc<TaskRegistry>,
    logbook: Arc<Logbook>,
}

impl CommandRunner {
    pub fn new(registry: Arc<TaskRegistry>, logbook: Arc<Logbook>) -> Self {
        Self { registry, logbook }
    }

    /// Execute `command` with `args`, blocking the caller (asynchronously)
    /// until the child exits and both output streams are drained.
    ///
    /// This method is infallible by contract: resolution and launch failures
    /// are logged at FAIL and carried in the returned [`CommandOutput`].
    pub async fn run<I, S>(&self, command: &str, args: I) -> CommandOutput
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let args: Vec<OsString> = args
            .into_iter()
            .map(|a| a.as_ref().to_os_string())
            .collect();

        let Some(resolved) = resolve_command(command) else {
            self.logbook.fail(format!("Command not found: {command}"));
            return CommandOutput::refused(
                EXIT_NOT_FOUND,
                CommandError::NotFound(command.to_string()),
            );
        };

        let command_line = display_command_line(command, &args);
        let (proc_id, mut kill_rx) = self.registry.register_process(&command_line);

        let mut cmd = Command::new(&resolved);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Diagnostic commands must never pop a console window on Windows.
        #[cfg(windows)]
        cmd.creation_flags(0x0800_0000); // CREATE_NO_WINDOW

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                self.registry.unregister_process(proc_id);
                self.logbook
                    .fail(format!("Failed to launch '{command}': {err}"));
                return CommandOutput::refused(
                    EXIT_LAUNCH_FAILED,
                    CommandError::Launch {
                        command: command.to_string(),
                        cause: err.to_string(),
                    },
                );
            }
        };

        if let Some(pid) = child.id() {
            self.registry.set_process_pid(proc_id, pid);
        }
        debug!(command = %command_line, pid = ?child.id(), "spawned external command");

        // Drain both pipes concurrently so neither side can fill its OS
        // buffer and stall the child.
        let stdout_task = spawn_line_collector(child.stdout.take());
        let stderr_task = spawn_line_collector(child.stderr.take());

        let mut error = None;
        let exit_code = tokio::select! {
            status_res = child.wait() => match status_res {
                Ok(status) => status.code().unwrap_or(EXIT_UNKNOWN),
                Err(err) => {
                    warn!(command = %command_line, error = %err, "failed waiting for external command");
                    error = Some(CommandError::Launch {
                        command: command.to_string(),
                        cause: err.to_string(),
                    });
                    EXIT_UNKNOWN
                }
            },
            _ = kill_requested(&mut kill_rx) => {
                info!(command = %command_line, "kill requested; terminating external command");
                if let Err(err) = child.start_kill() {
                    warn!(command = %command_line, error = %err, "failed to kill external command");
                }
                error = Some(CommandError::Terminated(command.to_string()));
                // Bound the residual wait so shutdown cannot hang on a stuck
                // child.
                match timeout(self.registry.grace(), child.wait()).await {
                    Ok(Ok(status)) => status.code().unwrap_or(EXIT_UNKNOWN),
                    Ok(Err(_)) | Err(_) => EXIT_UNKNOWN,
                }
            }
        };

        // After a kill the pipes may be held open by surviving grandchildren,
        // so the drain is bounded too; a clean exit closes them promptly and
        // gets a full drain.
        let (stdout, stderr) = if matches!(error, Some(CommandError::Terminated(_))) {
            let grace = self.registry.grace();
            (
                timeout(grace, join_lines(stdout_task))
                    .await
                    .unwrap_or_default(),
                timeout(grace, join_lines(stderr_task))
                    .await
                    .unwrap_or_default(),
            )
        } else {
            (join_lines(stdout_task).await, join_lines(stderr_task).await)
        };

        self.registry.unregister_process(proc_id);
        debug!(command = %command_line, exit_code, "external command finished");

        CommandOutput {
            exit_code,
            stdout,
            stderr,
            error,
        }
    }
}

/// Completes once the kill signal fires; a closed channel counts as a kill
/// request (the registry has been torn down).
async fn kill_requested(rx: &mut CancelSignal) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

fn spawn_line_collector<R>(pipe: Option<R>) -> Option<JoinHandle<Vec<String>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pipe.map(|pipe| {
        tokio::spawn(async move {
            let reader = BufReader::new(pipe);
            let mut lines = reader.lines();
            let mut collected = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                collected.push(line);
            }
            collected
        })
    })
}

async fn join_lines(task: Option<JoinHandle<Vec<String>>>) -> Vec<String> {
    match task {
        Some(handle) => handle.await.unwrap_or_default(),
        None => Vec::new(),
    }
}

fn display_command_line(command: &str, args: &[OsString]) -> String {
    let mut line = command.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}
