//! The bounded, multi-producer single-consumer ring each model entry buffers
//! unconsumed training examples in.
//!
//! Built directly on `crossbeam::queue::ArrayQueue`, a lock-free bounded FIFO
//! — pushing and draining never block a caller on the trainer.

use crate::example::Example;
use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default capacity of a fresh buffer.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// How a full buffer handles an incoming push.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Evict the oldest buffered example to make room for the new one.
    /// Preserves recency; the default.
    DropOldest,
    /// Reject the incoming example, leaving the buffer unchanged.
    DropNewest,
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        OverflowPolicy::DropOldest
    }
}

/// Which side of a full buffer a drop came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropKind {
    /// An already-buffered example was evicted to make room.
    Oldest,
    /// The incoming example itself was rejected.
    Newest,
}

/// The result of a single [`TrainingBuffer::push`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    /// The example entered the buffer with no eviction necessary.
    Accepted,
    /// The buffer was full; something was dropped to resolve it.
    Dropped(DropKind),
}

/// A per-model bounded queue of not-yet-trained-on examples.
pub struct TrainingBuffer {
    queue: ArrayQueue<Example>,
    policy: OverflowPolicy,
    next_seq: AtomicU64,
    pushed_total: AtomicU64,
    accepted_total: AtomicU64,
    dropped_total: AtomicU64,
}

impl TrainingBuffer {
    /// A buffer with the default capacity and drop-oldest policy.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A buffer with a custom capacity and the default drop-oldest policy.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_policy(capacity, OverflowPolicy::default())
    }

    /// A buffer with a custom capacity and overflow policy.
    pub fn with_capacity_and_policy(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
            policy,
            next_seq: AtomicU64::new(1),
            pushed_total: AtomicU64::new(0),
            accepted_total: AtomicU64::new(0),
            dropped_total: AtomicU64::new(0),
        }
    }

    /// Push one example, assigning it the next `arrival_seq`.
    pub fn push(&self, mut example: Example) -> PushOutcome {
        example.arrival_seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.pushed_total.fetch_add(1, Ordering::Relaxed);

        match self.queue.push(example) {
            Ok(()) => {
                self.accepted_total.fetch_add(1, Ordering::Relaxed);
                PushOutcome::Accepted
            }
            Err(rejected) => match self.policy {
                OverflowPolicy::DropOldest => {
                    // Make room by evicting the head, then retry. Another
                    // consumer may have drained concurrently, in which case
                    // the retry succeeds without us having evicted anything
                    // ourselves — still correct, just not wasteful.
                    let _ = self.queue.pop();
                    let _ = self.queue.push(rejected);
                    self.dropped_total.fetch_add(1, Ordering::Relaxed);
                    PushOutcome::Dropped(DropKind::Oldest)
                }
                OverflowPolicy::DropNewest => {
                    self.dropped_total.fetch_add(1, Ordering::Relaxed);
                    PushOutcome::Dropped(DropKind::Newest)
                }
            },
        }
    }

    /// Remove and return up to `n` oldest examples, in arrival order.
    /// Non-blocking; may return fewer than `n`, including zero.
    pub fn drain_up_to(&self, n: usize) -> Vec<Example> {
        let mut out = Vec::with_capacity(n.min(self.queue.len()));
        while out.len() < n {
            match self.queue.pop() {
                Some(ex) => out.push(ex),
                None => break,
            }
        }
        out
    }

    /// Drain everything currently buffered, in arrival order.
    pub fn drain_all(&self) -> Vec<Example> {
        self.drain_up_to(self.queue.capacity())
    }

    /// Approximate current length.
    pub fn len(&self) -> u64 {
        self.queue.len() as u64
    }

    /// Whether the buffer currently holds no examples.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Total examples ever pushed, regardless of outcome.
    pub fn pushed_total(&self) -> u64 {
        self.pushed_total.load(Ordering::Relaxed)
    }

    /// Total examples whose push call returned [`PushOutcome::Accepted`].
    pub fn accepted_total(&self) -> u64 {
        self.accepted_total.load(Ordering::Relaxed)
    }

    /// Total examples whose push call returned [`PushOutcome::Dropped`].
    pub fn dropped_total(&self) -> u64 {
        self.dropped_total.load(Ordering::Relaxed)
    }
}

impl Default for TrainingBuffer {
    fn default() -> Self {
        Self::new()
    }
}
