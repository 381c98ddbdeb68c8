//! Task records: submission spec, serializable snapshot, and the owned
//! record the scheduler dispatches.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{TaskError, TaskId, TaskStatus};

/// Priority offset added at submission time for `critical` tasks.
///
/// A critical task outranks every ordinary task whose base priority is less
/// than its own base + 100, but not critical tasks with a higher base.
pub const CRITICAL_PRIORITY_OFFSET: i64 = 100;

/// The callable unit of work.
///
/// Bodies run synchronously to completion within one scheduling turn and
/// must be re-invocable, since a failed attempt may be retried.
pub type TaskBody = Arc<dyn Fn() -> Result<serde_json::Value, TaskError> + Send + Sync>;

/// Classification of a task, used only to compute the priority offset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskKind(String);

impl TaskKind {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn normal() -> Self {
        Self::new("normal")
    }

    pub fn critical() -> Self {
        Self::new("critical")
    }

    pub fn is_critical(&self) -> bool {
        self.0 == "critical"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Everything a caller provides when submitting work.
///
/// Defaults: priority 0, no timeout, kind `normal`, no dependencies.
pub struct TaskSpec {
    pub body: TaskBody,
    pub priority: i64,
    pub timeout: Option<Duration>,
    pub kind: TaskKind,
    pub depends_on: Vec<TaskId>,
}

impl TaskSpec {
    pub fn new<F>(body: F) -> Self
    where
        F: Fn() -> Result<serde_json::Value, TaskError> + Send + Sync + 'static,
    {
        Self {
            body: Arc::new(body),
            priority: 0,
            timeout: None,
            kind: TaskKind::normal(),
            depends_on: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_kind(mut self, kind: TaskKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_dependencies(mut self, depends_on: Vec<TaskId>) -> Self {
        self.depends_on = depends_on;
        self
    }
}

/// Serializable snapshot of a task's metadata and lifecycle state.
///
/// This is what the lifecycle store holds, what `status` returns, and what
/// the failed-task sink receives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMeta {
    pub id: TaskId,

    /// Effective priority (base + critical offset); higher dispatches first.
    pub priority: i64,

    pub timeout: Option<Duration>,
    pub status: TaskStatus,

    /// Attempts beyond the first; starts at 0.
    pub retries: u32,

    /// Backoff unit in seconds; starts at 1 and doubles on each failure.
    pub backoff: u64,

    pub kind: TaskKind,

    /// Wall-clock submission time; the anchor for both the timeout check
    /// and the expiry sweep.
    pub submitted_at: DateTime<Utc>,

    pub depends_on: Vec<TaskId>,
    pub last_error: Option<String>,
}

impl TaskMeta {
    /// Has the submission-relative timeout elapsed at `now`?
    pub fn timed_out_at(&self, now: DateTime<Utc>) -> bool {
        let Some(timeout) = self.timeout else {
            return false;
        };
        (now - self.submitted_at)
            .to_std()
            .is_ok_and(|elapsed| elapsed > timeout)
    }
}

/// Snapshot plus the body: the full record the scheduler owns.
///
/// Callers never hold a `TaskRecord`; they only get the `TaskId` back from
/// `submit`.
#[derive(Clone)]
pub struct TaskRecord {
    pub meta: TaskMeta,
    pub body: TaskBody,
}

impl TaskRecord {
    /// Build a fresh record from a submission, applying the critical offset.
    pub fn from_spec(id: TaskId, spec: TaskSpec, submitted_at: DateTime<Utc>) -> Self {
        let mut priority = spec.priority;
        if spec.kind.is_critical() {
            priority += CRITICAL_PRIORITY_OFFSET;
        }
        Self {
            meta: TaskMeta {
                id,
                priority,
                timeout: spec.timeout,
                status: TaskStatus::Pending,
                retries: 0,
                backoff: 1,
                kind: spec.kind,
                submitted_at,
                depends_on: spec.depends_on,
                last_error: None,
            },
            body: spec.body,
        }
    }
}

impl fmt::Debug for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRecord")
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn record(spec: TaskSpec) -> TaskRecord {
        TaskRecord::from_spec(TaskId::generate(), spec, Utc::now())
    }

    #[test]
    fn defaults_are_normal_priority_zero() {
        let r = record(TaskSpec::new(|| Ok(serde_json::json!(null))));
        assert_eq!(r.meta.priority, 0);
        assert_eq!(r.meta.status, TaskStatus::Pending);
        assert_eq!(r.meta.retries, 0);
        assert_eq!(r.meta.backoff, 1);
        assert_eq!(r.meta.kind, TaskKind::normal());
        assert!(r.meta.depends_on.is_empty());
    }

    #[rstest]
    #[case::normal(TaskKind::normal(), 7, 7)]
    #[case::critical(TaskKind::critical(), 0, 100)]
    #[case::critical_with_base(TaskKind::critical(), 25, 125)]
    #[case::other_kind(TaskKind::new("batch"), 3, 3)]
    fn critical_offset_applied_at_submission(
        #[case] kind: TaskKind,
        #[case] base: i64,
        #[case] expected: i64,
    ) {
        let r = record(
            TaskSpec::new(|| Ok(serde_json::json!(null)))
                .with_priority(base)
                .with_kind(kind),
        );
        assert_eq!(r.meta.priority, expected);
    }

    #[test]
    fn timeout_is_relative_to_submission() {
        let submitted = Utc::now();
        let mut r = record(
            TaskSpec::new(|| Ok(serde_json::json!(null))).with_timeout(Duration::from_secs(5)),
        );
        r.meta.submitted_at = submitted;

        assert!(!r.meta.timed_out_at(submitted + chrono::Duration::seconds(4)));
        assert!(r.meta.timed_out_at(submitted + chrono::Duration::seconds(6)));
    }

    #[test]
    fn no_timeout_never_times_out() {
        let r = record(TaskSpec::new(|| Ok(serde_json::json!(null))));
        assert!(!r.meta.timed_out_at(Utc::now() + chrono::Duration::days(365)));
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let r = record(
            TaskSpec::new(|| Ok(serde_json::json!(null)))
                .with_priority(3)
                .with_timeout(Duration::from_secs(30)),
        );
        let json = serde_json::to_string(&r.meta).unwrap();
        let back: TaskMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, r.meta.id);
        assert_eq!(back.priority, 3);
        assert_eq!(back.timeout, Some(Duration::from_secs(30)));
    }
}
