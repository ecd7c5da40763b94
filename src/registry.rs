// src/registry.rs

//! Central bookkeeping for in-flight actions and spawned processes.
//!
//! Every background action and every external child process is registered
//! here for its lifetime, so the application can inspect what is running and
//! cleanly cancel/kill everything during shutdown without leaking handles.
//!
//! Removal is idempotent by construction: handles are keyed by ids from a
//! shared counter, and removing an absent id is a no-op. Completion handlers
//! may therefore race with the shutdown sweep safely.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Identifier of a registered action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

/// Identifier of a registered external process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(u64);

/// Receiver side of a cooperative cancellation/kill signal.
///
/// The value flips to `true` exactly once, when the shutdown sweep runs. A
/// closed channel (registry torn down) must be treated the same as `true`.
pub type CancelSignal = watch::Receiver<bool>;

struct ActiveTask {
    name: String,
    started_at: Instant,
    cancel: watch::Sender<bool>,
}

struct ActiveProcess {
    command_line: String,
    pid: Option<u32>,
    kill: watch::Sender<bool>,
}

/// Tracks all in-flight background actions and spawned processes.
pub struct TaskRegistry {
    tasks: Mutex<HashMap<u64, ActiveTask>>,
    processes: Mutex<HashMap<u64, ActiveProcess>>,
    next_id: AtomicU64,
    grace: Duration,
}

impl TaskRegistry {
    /// `grace` bounds how long the shutdown sweep waits for a process to die
    /// after being killed, and how long it waits for tasks to drain overall.
    pub fn new(grace: Duration) -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            processes: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            grace,
        }
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Register a background action; returns its id and the cancellation
    /// signal its work should observe.
    pub fn register_task(&self, name: &str) -> (TaskId, CancelSignal) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = ActiveTask {
            name: name.to_string(),
            started_at: Instant::now(),
            cancel: cancel_tx,
        };
        self.lock_tasks().insert(id, task);
        debug!(task = %name, id, "task registered");
        (TaskId(id), cancel_rx)
    }

    /// Remove a task; a no-op if it is already gone.
    pub fn unregister_task(&self, id: TaskId) {
        match self.lock_tasks().remove(&id.0) {
            Some(task) => debug!(
                task = %task.name,
                id = id.0,
                elapsed_ms = task.started_at.elapsed().as_millis() as u64,
                "task unregistered"
            ),
            None => debug!(id = id.0, "task already unregistered"),
        }
    }

    /// Register an external process before it is started; returns its id and
    /// the kill signal the runner must select on.
    pub fn register_process(&self, command_line: &str) -> (ProcessId, CancelSignal) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (kill_tx, kill_rx) = watch::channel(false);
        let process = ActiveProcess {
            command_line: command_line.to_string(),
            pid: None,
            kill: kill_tx,
        };
        self.lock_processes().insert(id, process);
        debug!(command = %command_line, id, "process registered");
        (ProcessId(id), kill_rx)
    }

    /// Record the OS pid once the process has actually been spawned.
    pub fn set_process_pid(&self, id: ProcessId, pid: u32) {
        if let Some(process) = self.lock_processes().get_mut(&id.0) {
            process.pid = Some(pid);
        }
    }

    /// Remove a process handle; a no-op if it is already gone.
    pub fn unregister_process(&self, id: ProcessId) {
        match self.lock_processes().remove(&id.0) {
            Some(process) => {
                debug!(command = %process.command_line, pid = ?process.pid, "process unregistered");
            }
            None => debug!(id = id.0, "process already unregistered"),
        }
    }

    pub fn active_task_count(&self) -> usize {
        self.lock_tasks().len()
    }

    pub fn active_process_count(&self) -> usize {
        self.lock_processes().len()
    }

    /// Names of the actions currently in flight, registration order not
    /// guaranteed.
    pub fn active_task_names(&self) -> Vec<String> {
        self.lock_tasks().values().map(|t| t.name.clone()).collect()
    }

    /// Cancel every active task and kill every active process, then wait
    /// (bounded by the grace period plus margin) for both sets to drain.
    ///
    /// Best-effort throughout: a handle whose receiver is gone is skipped, a
    /// task that ignores cancellation is abandoned once the wait expires, and
    /// its child processes die via `kill_on_drop`. Calling this a second time
    /// finds both sets empty and returns immediately.
    pub async fn shutdown_all(&self) {
        let (task_count, process_count) = (self.active_task_count(), self.active_process_count());
        if task_count == 0 && process_count == 0 {
            debug!("shutdown sweep: nothing in flight");
            return;
        }

        info!(
            tasks = task_count,
            processes = process_count,
            "shutdown sweep: signalling all in-flight work"
        );

        {
            let tasks = self.lock_tasks();
            for task in tasks.values() {
                if task.cancel.send(true).is_err() {
                    debug!(task = %task.name, "cancel receiver already gone");
                }
            }
        }
        {
            let processes = self.lock_processes();
            for process in processes.values() {
                if process.kill.send(true).is_err() {
                    debug!(command = %process.command_line, "kill receiver already gone");
                }
            }
        }

        // Runners deregister themselves once they observe the signal; give
        // them the grace period plus a margin before abandoning stragglers.
        let deadline = Instant::now() + self.grace + Duration::from_millis(500);
        while Instant::now() < deadline {
            if self.active_task_count() == 0 && self.active_process_count() == 0 {
                break;
            }
            sleep(Duration::from_millis(25)).await;
        }

        let leftover_tasks: Vec<String> = self.lock_tasks().drain().map(|(_, t)| t.name).collect();
        for name in &leftover_tasks {
            warn!(task = %name, "task did not stop within the grace period; abandoning handle");
        }
        let leftover_processes: Vec<String> = self
            .lock_processes()
            .drain()
            .map(|(_, p)| p.command_line)
            .collect();
        for command in &leftover_processes {
            warn!(command = %command, "process did not exit within the grace period; abandoning handle");
        }

        info!(
            abandoned_tasks = leftover_tasks.len(),
            abandoned_processes = leftover_processes.len(),
            "shutdown sweep finished"
        );
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, HashMap<u64, ActiveTask>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_processes(&self) -> std::sync::MutexGuard<'_, HashMap<u64, ActiveProcess>> {
        self.processes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistering_an_absent_task_is_a_no_op() {
        let registry = TaskRegistry::new(Duration::from_secs(2));
        let (id, _cancel) = registry.register_task("probe");
        registry.unregister_task(id);
        assert_eq!(registry.active_task_count(), 0);

        // Second removal of the same id must not disturb anything.
        registry.unregister_task(id);
        assert_eq!(registry.active_task_count(), 0);
    }

    #[test]
    fn process_handles_are_tracked_until_unregistered() {
        let registry = TaskRegistry::new(Duration::from_secs(2));
        let (id, _kill) = registry.register_process("ipconfig /all");
        registry.set_process_pid(id, 4242);
        assert_eq!(registry.active_process_count(), 1);

        registry.unregister_process(id);
        registry.unregister_process(id);
        assert_eq!(registry.active_process_count(), 0);
    }

    #[tokio::test]
    async fn cancel_signal_flips_on_shutdown() {
        let registry = TaskRegistry::new(Duration::from_millis(50));
        let (_id, cancel) = registry.register_task("slow");
        assert!(!*cancel.borrow());

        registry.shutdown_all().await;

        assert!(*cancel.borrow());
        assert_eq!(registry.active_task_count(), 0);
    }

    #[tokio::test]
    async fn shutdown_twice_is_a_no_op() {
        let registry = TaskRegistry::new(Duration::from_millis(50));
        let (_id, _cancel) = registry.register_task("once");

        registry.shutdown_all().await;
        assert_eq!(registry.active_task_count(), 0);
        assert_eq!(registry.active_process_count(), 0);

        registry.shutdown_all().await;
        assert_eq!(registry.active_task_count(), 0);
        assert_eq!(registry.active_process_count(), 0);
    }
}
