//! Task lifecycle state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a task.
///
/// State transitions:
/// - Pending -> Running -> Completed (terminal)
/// - Pending -> Running -> Retrying -> Pending -> ... (loop, bounded by the retry limit)
/// - Pending -> Running -> Failed (terminal, retries exhausted or disabled)
/// - Pending -> Cancelled (terminal, cooperative; a body that is already
///   running is never interrupted)
///
/// Design note: an enum keeps matching exhaustive and makes invalid states
/// unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Submitted, waiting for dispatch.
    Pending,

    /// An attempt is currently executing.
    Running,

    /// Failed, waiting out the retry backoff.
    Retrying,

    /// Finished successfully.
    Completed,

    /// Failed permanently (retries exhausted or retries disabled).
    Failed,

    /// Cancelled before its body ran.
    Cancelled,
}

impl TaskStatus {
    /// Is this a terminal status (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(!TaskStatus::Retrying.is_terminal());
    }
}
