//! Queue structures for the dispatch loop: the priority-ordered ready queue
//! and the backoff-ordered retry queue.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tokio::time::Instant;

use crate::domain::TaskRecord;

/// Entry in the ready queue.
///
/// Max-heap ordering: higher priority first, ties broken by submission
/// sequence (earlier first), so extraction order is deterministic.
#[derive(Debug)]
struct QueuedTask {
    seq: u64,
    record: TaskRecord,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        self.record
            .meta
            .priority
            .cmp(&other.record.meta.priority)
            // Reverse: lower sequence numbers win ties.
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Tasks not yet admitted to execution, highest priority first.
///
/// Re-insertion (dependency deferral, retry) keeps the record's original
/// priority and takes a fresh sequence number.
#[derive(Debug, Default)]
pub struct ReadyQueue {
    heap: BinaryHeap<QueuedTask>,
    next_seq: u64,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: TaskRecord) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(QueuedTask { seq, record });
    }

    /// Extract the highest-priority record, if any.
    pub fn pop(&mut self) -> Option<TaskRecord> {
        self.heap.pop().map(|entry| entry.record)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// Entry in the retry queue.
///
/// Reverse ordering so the BinaryHeap acts as a min-heap (earliest due
/// first).
#[derive(Debug)]
struct ScheduledRetry {
    due: Instant,
    record: TaskRecord,
}

impl PartialEq for ScheduledRetry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due
    }
}

impl Eq for ScheduledRetry {}

impl PartialOrd for ScheduledRetry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledRetry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse: earlier due times have higher priority.
        other.due.cmp(&self.due)
    }
}

/// Tasks waiting out their retry backoff.
#[derive(Debug, Default)]
pub struct RetryQueue {
    heap: BinaryHeap<ScheduledRetry>,
}

impl RetryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, due: Instant, record: TaskRecord) {
        self.heap.push(ScheduledRetry { due, record });
    }

    /// Drain every record whose due time has passed.
    pub fn pop_due(&mut self, now: Instant) -> Vec<TaskRecord> {
        let mut due = Vec::new();
        // The heap is sorted by due time, so we can stop at the first
        // not-yet-due entry.
        while self.heap.peek().is_some_and(|entry| entry.due <= now) {
            if let Some(entry) = self.heap.pop() {
                due.push(entry.record);
            }
        }
        due
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
