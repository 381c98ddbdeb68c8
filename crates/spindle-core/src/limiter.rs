//! Resizable bounded-permit gate for admission control.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting gate bounding the number of simultaneously running tasks.
///
/// Design:
/// - `acquire` suspends the caller until a permit is free; it cannot fail.
/// - The ceiling can only grow (`resize`); held permits are never revoked,
///   so a grant stays valid for the full attempt.
/// - Permits are RAII guards: release happens exactly once per grant, on
///   every exit path.
#[derive(Debug)]
pub struct Limiter {
    semaphore: Arc<Semaphore>,
    ceiling: AtomicUsize,
}

impl Limiter {
    pub fn new(max: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max)),
            ceiling: AtomicUsize::new(max),
        }
    }

    /// Wait for a permit. Suspends only the calling task, never the loop.
    pub async fn acquire(&self) -> Permit {
        let inner = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            // the semaphore is never closed
            .expect("limiter semaphore closed");
        Permit { _inner: inner }
    }

    /// Current ceiling (maximum simultaneous grants).
    pub fn ceiling(&self) -> usize {
        self.ceiling.load(Ordering::SeqCst)
    }

    /// Permits free right now.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Raise the ceiling to `new_max`. Grow-only: a lower value is ignored,
    /// since shrinking would have to revoke permits already held.
    pub fn resize(&self, new_max: usize) {
        let current = self.ceiling.load(Ordering::SeqCst);
        if new_max > current {
            self.semaphore.add_permits(new_max - current);
            self.ceiling.store(new_max, Ordering::SeqCst);
        }
    }
}

/// A held concurrency permit; returned to the limiter on drop.
#[derive(Debug)]
pub struct Permit {
    _inner: OwnedSemaphorePermit,
}
