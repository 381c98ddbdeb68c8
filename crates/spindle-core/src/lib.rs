//! spindle-core
//!
//! In-process asynchronous task scheduler: priority dispatch under a
//! bounded concurrency budget, dependency gating, retries with jittered
//! exponential backoff, cooperative cancellation, and graceful drain on
//! shutdown.
//!
//! # Module layout
//! - **domain**: task model (ids, kinds, statuses, errors, records)
//! - **queue**: ready/retry priority queues
//! - **limiter**: resizable bounded-permit gate
//! - **retry**: retry/backoff policy
//! - **store**: lifecycle store and expiry sweep
//! - **deps**: dependency readiness predicate
//! - **sink**: failed-task sink port and implementations
//! - **scheduler**: the dispatch loop, executor, and shutdown coordination
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use spindle_core::{MemorySink, Scheduler, SchedulerConfig, TaskSpec};
//!
//! # async fn demo() {
//! let scheduler = Scheduler::new(SchedulerConfig::default(), Arc::new(MemorySink::new()));
//! let runner = tokio::spawn({
//!     let scheduler = scheduler.clone();
//!     async move { scheduler.run().await }
//! });
//!
//! let id = scheduler
//!     .submit(TaskSpec::new(|| Ok(serde_json::json!("done"))))
//!     .await;
//!
//! scheduler.shutdown();
//! let _ = runner.await;
//! # let _ = id;
//! # }
//! ```

pub mod config;
pub mod deps;
pub mod domain;
pub mod limiter;
pub mod queue;
pub mod retry;
pub mod scheduler;
pub mod sink;
pub mod store;

pub use config::{LogLevel, SchedulerConfig};
pub use domain::{ErrorKind, TaskError, TaskId, TaskKind, TaskMeta, TaskSpec, TaskStatus};
pub use scheduler::Scheduler;
pub use sink::{FailedTaskSink, JsonLineSink, MemorySink, SinkError};
pub use store::StatusCounts;
