// src/exec/mod.rs

//! External process execution layer.
//!
//! Toolkit actions mostly shell out to OS diagnostic/repair utilities; this
//! module runs those commands with `tokio::process::Command` and captures
//! stdout/stderr/exit code deterministically.
//!
//! - [`resolve`] implements host command lookup (qualified path first, then
//!   `PATH`).
//! - [`command`] owns [`CommandRunner`], which registers every spawned process
//!   in the [`TaskRegistry`](crate::registry::TaskRegistry) so the shutdown
//!   sweep can terminate it.
//!
//! "The command failed" is never an error here; only "the command could not
//! be launched" is, and even that is carried inside the result rather than
//! propagated.

pub mod command;
pub mod resolve;

pub use command::{CommandError, CommandOutput, CommandRunner};
pub use resolve::resolve_command;
