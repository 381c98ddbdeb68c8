//! Lifecycle store: the latest published snapshot per task, plus the
//! periodic expiry sweep.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{TaskId, TaskMeta, TaskStatus};

/// Mapping from task id to its latest published snapshot.
///
/// Design:
/// - Entries are written only when a task reaches a terminal-for-this-attempt
///   state or is re-queued as Retrying. A task that is still queued and has
///   never been dispatched has no entry, which is exactly what the dependency
///   check relies on (unknown id counts as not-ready).
/// - This is the single source of truth for dependency checks, status
///   queries, and the expiry sweep.
#[derive(Debug, Default)]
pub struct StatusStore {
    entries: HashMap<TaskId, TaskMeta>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the entry for `meta.id` with this snapshot.
    pub fn publish(&mut self, meta: TaskMeta) {
        self.entries.insert(meta.id, meta);
    }

    pub fn get(&self, id: TaskId) -> Option<&TaskMeta> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove entries older than `retention` that are in `Pending` or
    /// `Failed`. Completed, Cancelled, and Retrying entries are kept, so
    /// Completed entries accumulate for the process lifetime.
    ///
    /// Returns the removed ids so the caller can log them.
    pub fn sweep_expired(&mut self, retention: Duration, now: DateTime<Utc>) -> Vec<TaskId> {
        let expired: Vec<TaskId> = self
            .entries
            .values()
            .filter(|meta| matches!(meta.status, TaskStatus::Pending | TaskStatus::Failed))
            .filter(|meta| {
                (now - meta.submitted_at)
                    .to_std()
                    .is_ok_and(|age| age > retention)
            })
            .map(|meta| meta.id)
            .collect();
        for id in &expired {
            self.entries.remove(id);
        }
        expired
    }

    /// Per-status totals for observability.
    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for meta in self.entries.values() {
            match meta.status {
                TaskStatus::Pending => counts.pending += 1,
                TaskStatus::Running => counts.running += 1,
                TaskStatus::Retrying => counts.retrying += 1,
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Failed => counts.failed += 1,
                TaskStatus::Cancelled => counts.cancelled += 1,
            }
        }
        counts
    }
}

/// Snapshot totals by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub running: usize,
    pub retrying: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}
