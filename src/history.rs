//! Bounded record of recent launch times.

use std::collections::VecDeque;

use tokio::time::Instant;

/// Launch timestamps, oldest first, trimmed to the most recent `capacity`.
#[derive(Debug, Clone)]
pub struct LaunchHistory {
    capacity: usize,
    times: VecDeque<Instant>,
}

impl LaunchHistory {
    /// Keeps at least one entry so the last launch is always known.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            times: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    pub fn record(&mut self, at: Instant) {
        while self.times.len() >= self.capacity {
            self.times.pop_front();
        }
        self.times.push_back(at);
    }

    /// The `n`-th most recent launch, `1` being the last one.
    pub fn nth_back(&self, n: usize) -> Option<Instant> {
        if n == 0 || n > self.times.len() {
            return None;
        }
        self.times.get(self.times.len() - n).copied()
    }

    pub fn last(&self) -> Option<Instant> {
        self.times.back().copied()
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
