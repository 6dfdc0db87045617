// src/acquisition/window_buffer.rs
//! Bounded FIFO of the most recent samples

use crate::hal::types::ImuSample;
use std::collections::VecDeque;

/// Most recent samples in arrival order, never longer than its capacity
#[derive(Debug, Clone)]
pub struct WindowBuffer {
    samples: VecDeque<ImuSample>,
    capacity: usize,
}

impl WindowBuffer {
    /// A zero capacity is raised to one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append at the tail, evicting the oldest samples past capacity
    pub fn push(&mut self, sample: ImuSample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// The most recent `n` samples, oldest first; `None` if fewer are buffered
    pub fn last(&self, n: usize) -> Option<Vec<ImuSample>> {
        if n > self.samples.len() {
            return None;
        }
        let start = self.samples.len() - n;
        Some(self.samples.range(start..).copied().collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImuSample> {
        self.samples.iter()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
