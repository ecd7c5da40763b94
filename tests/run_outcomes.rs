// tests/run_outcomes.rs

//! The console shell surfaces action failures through `run`'s result, so the
//! process exit code is usable in scripts.

mod common;
use crate::common::init_tracing;

use std::fs;

use tempfile::TempDir;

use taskbench::cli::CliArgs;

fn args_for(dir: &TempDir, toml: &str) -> CliArgs {
    let path = dir.path().join("Taskbench.toml");
    fs::write(&path, toml).expect("failed to write config file");
    CliArgs {
        config: path.to_string_lossy().into_owned(),
        actions: Vec::new(),
        all: true,
        list: false,
        dry_run: false,
        log_level: None,
    }
}

#[cfg(unix)]
#[tokio::test]
async fn a_failing_action_fails_the_run() {
    init_tracing();

    let dir = TempDir::new().expect("tempdir");
    let args = args_for(
        &dir,
        r#"
[action.always-fails]
command = "false"

[action.noop]
command = "true"
"#,
    );

    let err = taskbench::run(args).await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("always-fails"), "got: {msg}");
    assert!(!msg.contains("noop"), "got: {msg}");
}

#[cfg(unix)]
#[tokio::test]
async fn a_failing_background_action_fails_the_run() {
    init_tracing();

    let dir = TempDir::new().expect("tempdir");
    let args = args_for(
        &dir,
        r#"
[action.detached-failure]
command = "false"
background = true
"#,
    );

    let err = taskbench::run(args).await.unwrap_err();
    assert!(err.to_string().contains("detached-failure"));
}

#[cfg(unix)]
#[tokio::test]
async fn passing_actions_keep_the_run_ok() {
    init_tracing();

    let dir = TempDir::new().expect("tempdir");
    let args = args_for(
        &dir,
        r#"
[action.noop]
command = "true"

[action.greets]
command = "echo"
args = ["hi"]
background = true
"#,
    );

    assert!(taskbench::run(args).await.is_ok());
}
