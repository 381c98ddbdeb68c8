//! Dependency gating: is a task ready to run?

use crate::domain::{TaskId, TaskStatus};
use crate::store::StatusStore;

/// True iff every declared predecessor has reached `Completed`.
///
/// Ids with no store entry count as not ready. Note that a queued task
/// which has never been dispatched has no entry either, so depending on it
/// defers the dependent until it actually completes. A task with no
/// dependencies is always ready.
pub fn deps_satisfied(depends_on: &[TaskId], store: &StatusStore) -> bool {
    depends_on.iter().all(|id| {
        store
            .get(*id)
            .is_some_and(|meta| meta.status == TaskStatus::Completed)
    })
}
