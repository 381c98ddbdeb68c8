//! Demo driver for the spindle scheduler.
//!
//! Submits a handful of tasks that exercise priorities, retries,
//! dependencies, and cancellation, then drains and exits. Failed tasks are
//! appended to `failed_tasks.jsonl` in the working directory.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::time::sleep;

use spindle_core::{
    JsonLineSink, LogLevel, Scheduler, SchedulerConfig, TaskError, TaskKind, TaskSpec,
};

/// Log level: `SPINDLE_LOG` env var wins over the scheduler config.
fn init_logging(config_level: LogLevel) {
    let level = std::env::var("SPINDLE_LOG")
        .ok()
        .and_then(|s| LogLevel::parse(&s))
        .unwrap_or(config_level);

    tracing_subscriber::fmt()
        .with_max_level(level.as_tracing())
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let config = SchedulerConfig::default();
    init_logging(config.log_level);

    let sink = Arc::new(JsonLineSink::new("failed_tasks.jsonl"));
    let scheduler = Scheduler::new(config, sink);

    // (A) drive the engine in the background
    let runner = tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.run().await }
    });

    // (B) a task that succeeds immediately
    let hello = scheduler
        .submit(TaskSpec::new(|| Ok(serde_json::json!("hello from spindle"))))
        .await;

    // (C) flaky: fails twice with a network error, then recovers
    let remaining_failures = Arc::new(AtomicU32::new(2));
    let flaky = scheduler
        .submit(TaskSpec::new({
            let remaining = remaining_failures.clone();
            move || {
                let left = remaining.load(Ordering::Relaxed);
                if left > 0 {
                    remaining.fetch_sub(1, Ordering::Relaxed);
                    return Err(TaskError::Network(format!("intentional failure (left={left})")));
                }
                Ok(serde_json::json!("recovered"))
            }
        }))
        .await;

    // (D) critical: outranks everything queued at normal priority
    let urgent = scheduler
        .submit(
            TaskSpec::new(|| Ok(serde_json::json!("jumped the queue")))
                .with_kind(TaskKind::critical()),
        )
        .await;

    // (E) dependent: held back until `hello` completes
    let follow_up = scheduler
        .submit(
            TaskSpec::new(|| Ok(serde_json::json!("after hello")))
                .with_dependencies(vec![hello]),
        )
        .await;

    // (F) doomed: always fails, ends up in failed_tasks.jsonl
    let doomed = scheduler
        .submit(
            TaskSpec::new(|| Err(TaskError::Database("table on fire".into()))).with_priority(-10),
        )
        .await;

    // Poll until everything settles, like a caller watching job progress.
    for (name, id) in [
        ("hello", hello),
        ("flaky", flaky),
        ("urgent", urgent),
        ("follow_up", follow_up),
        ("doomed", doomed),
    ] {
        loop {
            if let Some(meta) = scheduler.status(id).await
                && meta.status.is_terminal()
            {
                println!(
                    "{name} ({id}): {:?} retries={} last_error={:?}",
                    meta.status, meta.retries, meta.last_error
                );
                break;
            }
            sleep(Duration::from_millis(50)).await;
        }
    }

    println!("counts: {:?}", scheduler.counts().await);

    scheduler.shutdown();
    let _ = runner.await;
}
