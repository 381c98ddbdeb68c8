//! The scheduling engine: priority dispatch loop, task executor, periodic
//! maintenance, and shutdown coordination.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::deps::deps_satisfied;
use crate::domain::{TaskError, TaskId, TaskMeta, TaskRecord, TaskSpec, TaskStatus};
use crate::limiter::Limiter;
use crate::queue::{ReadyQueue, RetryQueue};
use crate::retry::{RetryDecision, RetryPolicy};
use crate::sink::FailedTaskSink;
use crate::store::{StatusCounts, StatusStore};

/// Handle to the scheduling engine. Cheap to clone; all clones share the
/// same engine, so one clone can `run` while others submit and query.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    config: SchedulerConfig,
    policy: RetryPolicy,
    limiter: Limiter,
    sink: Arc<dyn FailedTaskSink>,
    state: Mutex<State>,

    /// Tasks currently executing a body attempt.
    in_flight: AtomicUsize,

    /// Set once by `shutdown`; the dispatch tick is a no-op while draining.
    draining: AtomicBool,
}

/// Queue, store, and bookkeeping. Mutated only under the lock, held across
/// no await points longer than the operation itself.
struct State {
    ready: ReadyQueue,
    retries: RetryQueue,
    store: StatusStore,

    /// Ids submitted but not yet published to the store. Together with the
    /// store this is the set of ids the engine still knows about.
    pending: HashSet<TaskId>,

    /// Cooperative cancellation flags, observed pre-dispatch and
    /// pre-execute. A body that is already running is never interrupted.
    cancel_requested: HashSet<TaskId>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, sink: Arc<dyn FailedTaskSink>) -> Self {
        let policy = RetryPolicy {
            max_retries: config.max_retries,
            enabled: config.enable_retry,
        };
        let limiter = Limiter::new(config.max_concurrent_tasks);
        Self {
            inner: Arc::new(Inner {
                config,
                policy,
                limiter,
                sink,
                state: Mutex::new(State {
                    ready: ReadyQueue::new(),
                    retries: RetryQueue::new(),
                    store: StatusStore::new(),
                    pending: HashSet::new(),
                    cancel_requested: HashSet::new(),
                }),
                in_flight: AtomicUsize::new(0),
                draining: AtomicBool::new(false),
            }),
        }
    }

    /// Submit a unit of work. Never fails; outcomes are observed via
    /// `status` or the failed-task sink. Submissions during drain are
    /// accepted but never dispatched.
    pub async fn submit(&self, spec: TaskSpec) -> TaskId {
        let id = TaskId::generate();
        let record = TaskRecord::from_spec(id, spec, Utc::now());
        debug!(
            task = %id,
            priority = record.meta.priority,
            kind = %record.meta.kind,
            deps = record.meta.depends_on.len(),
            "task submitted"
        );
        let mut state = self.inner.state.lock().await;
        state.pending.insert(id);
        state.ready.push(record);
        id
    }

    /// Request cooperative cancellation. Best effort: observed at the
    /// pre-dispatch and pre-execute checkpoints only. Unknown ids log a
    /// warning and are otherwise a no-op. Idempotent.
    pub async fn cancel(&self, id: TaskId) {
        let mut state = self.inner.state.lock().await;
        if state.pending.contains(&id) || state.store.contains(id) {
            state.cancel_requested.insert(id);
            info!(task = %id, "cancellation requested");
        } else {
            warn!(task = %id, "cancellation requested for unknown task");
        }
    }

    /// Latest published snapshot for `id`, or `None` if the engine has not
    /// published one (unknown id, or queued and never dispatched).
    pub async fn status(&self, id: TaskId) -> Option<TaskMeta> {
        self.inner.state.lock().await.store.get(id).cloned()
    }

    /// Per-status totals over the published snapshots.
    pub async fn counts(&self) -> StatusCounts {
        self.inner.state.lock().await.store.counts()
    }

    /// Current concurrency ceiling (initially `max_concurrent_tasks`, may
    /// be raised by the periodic adjustment).
    pub fn concurrency_ceiling(&self) -> usize {
        self.inner.limiter.ceiling()
    }

    /// Begin graceful drain: no new dispatches, in-flight tasks run to
    /// completion, then `run` returns. Idempotent.
    pub fn shutdown(&self) {
        if !self.inner.draining.swap(true, Ordering::SeqCst) {
            info!("scheduler draining, waiting for in-flight tasks");
        }
    }

    /// Drive the engine until shutdown completes.
    ///
    /// Runs the dispatch tick, the expiry sweep, the concurrency
    /// adjustment, and the drain check on their configured periods.
    pub async fn run(&self) {
        let cfg = &self.inner.config;
        info!(
            max_concurrent = cfg.max_concurrent_tasks,
            max_retries = cfg.max_retries,
            retry_enabled = cfg.enable_retry,
            "scheduler started"
        );

        let mut dispatch = time::interval(cfg.dispatch_interval);
        let mut sweep = time::interval_at(Instant::now() + cfg.sweep_interval, cfg.sweep_interval);
        let mut adjust =
            time::interval_at(Instant::now() + cfg.adjust_interval, cfg.adjust_interval);
        let mut drain = time::interval(cfg.drain_check_interval);

        loop {
            tokio::select! {
                _ = dispatch.tick() => self.dispatch_tick().await,
                _ = sweep.tick() => self.sweep_tick().await,
                _ = adjust.tick() => self.adjust_tick(),
                _ = drain.tick() => {
                    if self.inner.draining.load(Ordering::SeqCst)
                        && self.inner.in_flight.load(Ordering::SeqCst) == 0
                    {
                        info!("all in-flight tasks finished, scheduler stopped");
                        break;
                    }
                }
            }
        }
    }

    /// One pass of the dispatch loop.
    ///
    /// Promotes due retries, then extracts candidates in priority order
    /// while capacity remains. Each queued entry is considered at most once
    /// per tick: dependency-gated tasks are deferred to the next tick
    /// instead of being re-examined in the same pass, so an unmet
    /// dependency cannot spin the loop.
    async fn dispatch_tick(&self) {
        if self.inner.draining.load(Ordering::SeqCst) {
            return;
        }

        let mut state = self.inner.state.lock().await;

        for mut record in state.retries.pop_due(Instant::now()) {
            record.meta.status = TaskStatus::Pending;
            debug!(task = %record.meta.id, retry = record.meta.retries, "retry backoff elapsed, re-queued");
            state.ready.push(record);
        }

        let mut deferred = Vec::new();
        let mut admitted = 0usize;
        let candidates = state.ready.len();

        for _ in 0..candidates {
            if self.inner.in_flight.load(Ordering::SeqCst) + admitted
                >= self.inner.limiter.ceiling()
            {
                break;
            }
            let Some(record) = state.ready.pop() else {
                break;
            };
            let id = record.meta.id;

            if !deps_satisfied(&record.meta.depends_on, &state.store) {
                // Deferred, not failed: waits for its predecessors.
                deferred.push(record);
                continue;
            }

            if state.cancel_requested.remove(&id) {
                let mut meta = record.meta;
                meta.status = TaskStatus::Cancelled;
                info!(task = %id, "task cancelled before dispatch");
                state.pending.remove(&id);
                state.store.publish(meta);
                continue;
            }

            // Permit acquisition suspends only this record's admission
            // task, never the tick.
            admitted += 1;
            let engine = self.clone();
            tokio::spawn(async move {
                let permit = engine.inner.limiter.acquire().await;
                engine.inner.execute(record, permit).await;
            });
        }

        for record in deferred {
            state.ready.push(record);
        }
    }

    async fn sweep_tick(&self) {
        let mut state = self.inner.state.lock().await;
        let swept = state
            .store
            .sweep_expired(self.inner.config.retention, Utc::now());
        for id in swept {
            state.cancel_requested.remove(&id);
            warn!(task = %id, "task record expired and swept");
        }
    }

    /// Additive auto-scale-up: if the engine is not saturated, raise the
    /// ceiling by one. There is no scale-down path.
    fn adjust_tick(&self) {
        let limiter = &self.inner.limiter;
        if self.inner.in_flight.load(Ordering::SeqCst) < limiter.ceiling() {
            let ceiling = limiter.ceiling() + 1;
            limiter.resize(ceiling);
            info!(ceiling, "concurrency ceiling raised");
        }
    }
}

impl Inner {
    /// Run one admitted attempt. The permit is held for the whole call and
    /// released on drop, exactly once, on every exit path.
    ///
    /// `in_flight` is incremented before the drain re-check and decremented
    /// on every exit path, so a drain-tick read of zero means every admitted
    /// attempt has already published its snapshot or re-queued its record.
    async fn execute(&self, mut record: TaskRecord, _permit: crate::limiter::Permit) {
        let id = record.meta.id;
        self.in_flight.fetch_add(1, Ordering::SeqCst);

        {
            let mut state = self.state.lock().await;
            // Cancellation re-checked after the permit wait.
            if state.cancel_requested.remove(&id) {
                let mut meta = record.meta;
                meta.status = TaskStatus::Cancelled;
                info!(task = %id, "task cancelled");
                state.pending.remove(&id);
                state.store.publish(meta);
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                return;
            }
            // Admission won the permit after drain began: put the record
            // back, un-run, like any other queued task.
            if self.draining.load(Ordering::SeqCst) {
                state.ready.push(record);
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                return;
            }
        }

        record.meta.status = TaskStatus::Running;

        match run_attempt(&record) {
            Ok(result) => {
                let mut meta = record.meta;
                meta.status = TaskStatus::Completed;
                info!(task = %id, %result, "task completed");
                let mut state = self.state.lock().await;
                state.pending.remove(&id);
                state.cancel_requested.remove(&id);
                state.store.publish(meta);
            }
            Err(error) => self.handle_failure(record, error).await,
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// Route a failed attempt through the retry policy.
    async fn handle_failure(&self, mut record: TaskRecord, error: TaskError) {
        let id = record.meta.id;
        match self.policy.on_failure(&mut record.meta, &error) {
            RetryDecision::Retry { delay } => {
                warn!(
                    task = %id,
                    kind = %error.kind(),
                    retry = record.meta.retries,
                    delay_secs = delay.as_secs(),
                    error = %error,
                    "task failed, retry scheduled"
                );
                let meta = record.meta.clone();
                let due = Instant::now() + delay;
                let mut state = self.state.lock().await;
                state.store.publish(meta);
                state.retries.push(due, record);
            }
            RetryDecision::GiveUp => {
                error!(
                    task = %id,
                    kind = %error.kind(),
                    retries = record.meta.retries,
                    error = %error,
                    "task failed permanently"
                );
                let meta = record.meta;
                {
                    let mut state = self.state.lock().await;
                    state.pending.remove(&id);
                    state.cancel_requested.remove(&id);
                    state.store.publish(meta.clone());
                }
                if let Err(err) = self.sink.append(&meta).await {
                    error!(task = %id, %err, "could not record failed task");
                }
            }
        }
    }
}

/// One attempt: enforce the submission-relative timeout, then invoke the
/// body synchronously within this turn.
fn run_attempt(record: &TaskRecord) -> Result<serde_json::Value, TaskError> {
    if let Some(timeout) = record.meta.timeout
        && record.meta.timed_out_at(Utc::now())
    {
        return Err(TaskError::Timeout(timeout));
    }
    (record.body)()
}
