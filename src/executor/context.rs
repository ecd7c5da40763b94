// src/executor/context.rs

//! Explicit dependencies handed to each action's work closure.

use std::sync::Arc;

use crate::exec::CommandRunner;
use crate::logbook::Logbook;
use crate::registry::CancelSignal;

/// Everything a work closure may touch.
///
/// Actions receive their collaborators explicitly instead of closing over
/// shell state; the logbook handle works from any worker, and the cancel
/// signal lets long work cooperate with the shutdown sweep.
#[derive(Clone)]
pub struct ActionContext {
    logbook: Arc<Logbook>,
    runner: CommandRunner,
    cancel: CancelSignal,
}

impl ActionContext {
    pub(crate) fn new(logbook: Arc<Logbook>, runner: CommandRunner, cancel: CancelSignal) -> Self {
        Self {
            logbook,
            runner,
            cancel,
        }
    }

    pub fn logbook(&self) -> &Logbook {
        &self.logbook
    }

    pub fn runner(&self) -> &CommandRunner {
        &self.runner
    }

    /// True once shutdown has requested cooperative cancellation.
    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Completes when cancellation is requested. A torn-down registry counts
    /// as a request.
    pub async fn cancelled(&mut self) {
        while !*self.cancel.borrow_and_update() {
            if self.cancel.changed().await.is_err() {
                return;
            }
        }
    }
}
