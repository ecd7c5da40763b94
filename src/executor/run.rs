// src/executor/run.rs

//! The action executor: start/terminal log pairing, busy tracking,
//! registration, and the single failure boundary for all actions.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error};

use crate::errors::{Result, ToolkitError};
use crate::exec::CommandRunner;
use crate::logbook::Logbook;
use crate::registry::{TaskId, TaskRegistry};

use super::busy::{BusyGuard, BusyTracker, ProgressSink};
use super::context::ActionContext;

/// Terminal state of one executed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Succeeded,
    Failed(String),
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Succeeded)
    }
}

/// Handle to a detached (background) action.
///
/// Dropping the handle does not cancel the action; cancellation goes through
/// the registry's shutdown sweep.
#[derive(Debug)]
pub struct ActionHandle {
    name: String,
    id: TaskId,
    join: tokio::task::JoinHandle<ActionOutcome>,
}

impl ActionHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Wait for the action's completion bookkeeping (terminal log line, busy
    /// decrement, deregistration) to finish.
    pub async fn join(self) -> ActionOutcome {
        self.join
            .await
            .unwrap_or_else(|err| ActionOutcome::Failed(format!("completion watcher failed: {err}")))
    }
}

/// Runs named units of work with consistent log/busy/registry bookkeeping.
pub struct ActionExecutor {
    logbook: Arc<Logbook>,
    registry: Arc<TaskRegistry>,
    busy: Arc<BusyTracker>,
    runner: CommandRunner,
}

impl ActionExecutor {
    pub fn new(
        logbook: Arc<Logbook>,
        registry: Arc<TaskRegistry>,
        progress: Box<dyn ProgressSink>,
    ) -> Self {
        let runner = CommandRunner::new(Arc::clone(&registry), Arc::clone(&logbook));
        Self {
            logbook,
            registry,
            busy: Arc::new(BusyTracker::new(progress)),
            runner,
        }
    }

    pub fn logbook(&self) -> &Arc<Logbook> {
        &self.logbook
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Number of invocations currently holding the busy indicator.
    pub fn in_flight(&self) -> usize {
        self.busy.active()
    }

    /// Run `work` inline; the caller waits for the outcome.
    ///
    /// An `Err` from the work is caught here, logged at FAIL with the action
    /// name, and returned as [`ActionOutcome::Failed`]; it never propagates.
    /// A panic inside the work is caught the same way, so the Starting line
    /// still gets its terminal counterpart.
    pub async fn run<F, Fut>(&self, name: &str, work: F) -> ActionOutcome
    where
        F: FnOnce(ActionContext) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let (ctx, cleanup) = match self.begin(name) {
            Ok(pair) => pair,
            Err(err) => return ActionOutcome::Failed(err.to_string()),
        };

        let result = match AssertUnwindSafe(work(ctx)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(anyhow::anyhow!(
                "worker panicked: {}",
                panic_message(panic.as_ref())
            )),
        };
        let outcome = finish(&self.logbook, name, result);
        drop(cleanup);
        outcome
    }

    /// Hand `work` to a background worker and return immediately.
    ///
    /// The "Starting" line and busy-on transition happen before this returns;
    /// the terminal line and the cleanup run on a watcher task once the work
    /// finishes. A panic inside the work is caught at the join boundary and
    /// logged as a failure.
    pub fn run_detached<F, Fut>(&self, name: &str, work: F) -> Result<ActionHandle>
    where
        F: FnOnce(ActionContext) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let (ctx, cleanup) = self.begin(name)?;
        let id = cleanup.id;

        let worker = tokio::spawn(work(ctx));

        let name_owned = name.to_string();
        let logbook = Arc::clone(&self.logbook);
        let join = tokio::spawn(async move {
            let result = match worker.await {
                Ok(result) => result,
                Err(err) if err.is_panic() => Err(anyhow::anyhow!("worker panicked: {err}")),
                Err(err) => Err(anyhow::anyhow!("worker was cancelled: {err}")),
            };
            let outcome = finish(&logbook, &name_owned, result);
            drop(cleanup);
            outcome
        });

        Ok(ActionHandle {
            name: name.to_string(),
            id,
            join,
        })
    }

    /// Shared Starting transition: validate, log, busy on, register.
    fn begin(&self, name: &str) -> Result<(ActionContext, CompletionGuard)> {
        if name.trim().is_empty() {
            // Refuse before any state transition so Starting/cleanup stay
            // paired for real invocations.
            self.logbook.fail("Cannot run an action without a name");
            return Err(ToolkitError::InvalidAction(
                "action name is empty".to_string(),
            ));
        }

        self.logbook.info(format!("Starting: {name}"));
        let busy = self.busy.acquire();
        let (id, cancel) = self.registry.register_task(name);
        debug!(action = %name, ?id, "action began");

        let ctx = ActionContext::new(Arc::clone(&self.logbook), self.runner.clone(), cancel);
        let cleanup = CompletionGuard {
            id,
            registry: Arc::clone(&self.registry),
            _busy: busy,
        };
        Ok((ctx, cleanup))
    }
}

/// Runs the Idle cleanup exactly once, panics included.
struct CompletionGuard {
    id: TaskId,
    registry: Arc<TaskRegistry>,
    _busy: BusyGuard,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.registry.unregister_task(self.id);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn finish(logbook: &Logbook, name: &str, result: anyhow::Result<()>) -> ActionOutcome {
    match result {
        Ok(()) => {
            logbook.info(format!("Done: {name}"));
            ActionOutcome::Succeeded
        }
        Err(err) => {
            error!(action = %name, error = %err, "action failed");
            logbook.fail(format!("{name} failed: {err}"));
            ActionOutcome::Failed(err.to_string())
        }
    }
}
