// tests/busy_balance.rs

//! The busy indicator is visible iff at least one action is in flight,
//! including under overlapping background actions.

mod common;
use crate::common::builders::test_core;
use crate::common::init_tracing;

use tokio::sync::oneshot;

use taskbench_test_utils::sinks::CountingProgressSink;
use taskbench_test_utils::with_timeout;

#[tokio::test]
async fn overlapping_actions_share_one_indicator_cycle() {
    init_tracing();

    let progress = CountingProgressSink::new();
    let core = test_core(Box::new(progress.clone()));

    let (release_a, gate_a) = oneshot::channel::<()>();
    let (release_b, gate_b) = oneshot::channel::<()>();

    let handle_a = core
        .executor
        .run_detached("slow-a", |_ctx| async move {
            let _ = gate_a.await;
            Ok(())
        })
        .expect("valid action");
    let handle_b = core
        .executor
        .run_detached("slow-b", |_ctx| async move {
            let _ = gate_b.await;
            Ok(())
        })
        .expect("valid action");

    assert!(progress.visible());
    assert_eq!(progress.shows(), 1, "second action must not re-show");
    assert_eq!(core.executor.in_flight(), 2);

    // Finishing the first action must not hide the indicator: the second is
    // still running. This is exactly the bug a boolean indicator would have.
    release_a.send(()).expect("worker is waiting");
    with_timeout(handle_a.join()).await;
    assert!(progress.visible());
    assert_eq!(progress.hides(), 0);

    release_b.send(()).expect("worker is waiting");
    with_timeout(handle_b.join()).await;
    assert!(!progress.visible());
    assert_eq!(progress.shows(), 1);
    assert_eq!(progress.hides(), 1);
    assert_eq!(core.executor.in_flight(), 0);
}

#[tokio::test]
async fn sequential_actions_each_get_a_full_cycle() {
    init_tracing();

    let progress = CountingProgressSink::new();
    let core = test_core(Box::new(progress.clone()));

    for name in ["printer-queue", "dns-flush", "time-sync"] {
        let outcome = core
            .executor
            .run(name, |_ctx| async move { Ok(()) })
            .await;
        assert!(outcome.is_success());
        assert!(!progress.visible());
    }

    assert_eq!(progress.shows(), 3);
    assert_eq!(progress.hides(), 3);
}

/// A failing action still releases the indicator.
#[tokio::test]
async fn failure_still_hides_the_indicator() {
    init_tracing();

    let progress = CountingProgressSink::new();
    let core = test_core(Box::new(progress.clone()));

    let outcome = core
        .executor
        .run("broken", |_ctx| async move { anyhow::bail!("nope") })
        .await;

    assert!(!outcome.is_success());
    assert!(!progress.visible());
    assert_eq!(progress.shows(), 1);
    assert_eq!(progress.hides(), 1);
}
