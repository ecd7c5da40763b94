// src/executor/mod.rs

//! Action execution layer.
//!
//! Every user-triggered action funnels through [`ActionExecutor::run`] or
//! [`ActionExecutor::run_detached`], which own the per-invocation lifecycle:
//!
//! - exactly one "Starting: {name}" logbook line and exactly one terminal
//!   line (Done or a FAIL) per invocation;
//! - exactly one busy-indicator show/hide cycle, reference-counted across
//!   overlapping actions so one finishing never hides the indicator while
//!   another still runs;
//! - registration in the [`TaskRegistry`](crate::registry::TaskRegistry) so
//!   the shutdown sweep can reach in-flight work;
//! - a single failure boundary: an error or a panic inside the work is
//!   logged at FAIL and never crashes the host.
//!
//! Work closures receive an [`ActionContext`] with their collaborators
//! injected explicitly; nothing is captured from shell state, and all log
//! writes go through the thread-safe logbook regardless of which worker the
//! action lands on.

pub mod busy;
pub mod context;
pub mod run;

pub use busy::{BusyTracker, NullProgressSink, ProgressSink};
pub use context::ActionContext;
pub use run::{ActionExecutor, ActionHandle, ActionOutcome};
