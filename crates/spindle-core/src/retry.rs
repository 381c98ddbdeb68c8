//! Retry policy: retry-or-give-up decisions and jittered backoff delays.

use std::time::Duration;

use rand::Rng;

use crate::domain::{TaskError, TaskMeta, TaskStatus};

/// Policy limits for failed attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum retries beyond the first attempt.
    pub max_retries: u32,

    /// When false, the first failure is terminal.
    pub enabled: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            enabled: true,
        }
    }
}

/// What to do with a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-enqueue after `delay`, at the task's original priority.
    Retry { delay: Duration },

    /// Terminal failure: publish `Failed` and record to the sink.
    GiveUp,
}

impl RetryPolicy {
    /// Decide retry-vs-give-up for a failed attempt, updating the snapshot.
    ///
    /// On retry the backoff unit doubles and the actual delay is drawn
    /// uniformly from [backoff, 2*backoff] seconds, so a batch of tasks
    /// failing together does not retry in lockstep.
    pub fn on_failure(&self, meta: &mut TaskMeta, error: &TaskError) -> RetryDecision {
        meta.last_error = Some(error.to_string());
        if self.enabled && meta.retries < self.max_retries {
            meta.retries += 1;
            meta.status = TaskStatus::Retrying;
            meta.backoff = meta.backoff.saturating_mul(2);
            RetryDecision::Retry {
                delay: jittered_delay(meta.backoff),
            }
        } else {
            meta.status = TaskStatus::Failed;
            RetryDecision::GiveUp
        }
    }
}

fn jittered_delay(backoff: u64) -> Duration {
    let upper = backoff.saturating_mul(2);
    Duration::from_secs(rand::thread_rng().gen_range(backoff..=upper))
}
