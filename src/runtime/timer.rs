//! Timer heap for delayed jobs.
//!
//! A min-heap of `(deadline, job)` pairs. Jobs sharing a deadline fire in
//! insertion order, which keeps delayed posts FIFO just like immediate ones.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::Job;

struct TimerEntry<D> {
    deadline: D,
    generation: u64,
    job: Job,
}

impl<D: Ord> PartialEq for TimerEntry<D> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.generation == other.generation
    }
}

impl<D: Ord> Eq for TimerEntry<D> {}

impl<D: Ord> Ord for TimerEntry<D> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (earliest deadline first).
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.generation.cmp(&self.generation))
    }
}

impl<D: Ord> PartialOrd for TimerEntry<D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A min-heap of jobs ordered by deadline.
pub struct TimerHeap<D> {
    heap: BinaryHeap<TimerEntry<D>>,
    next_generation: u64,
}

impl<D: Ord + Copy> TimerHeap<D> {
    /// Creates a new empty timer heap.
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_generation: 0,
        }
    }

    /// Returns the number of timers in the heap.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns true if the heap is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Adds a job that becomes due at `deadline`.
    pub fn insert(&mut self, deadline: D, job: Job) {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.heap.push(TimerEntry {
            deadline,
            generation,
            job,
        });
    }

    /// Returns the earliest deadline, if any.
    #[must_use]
    pub fn peek_deadline(&self) -> Option<D> {
        self.heap.peek().map(|e| e.deadline)
    }

    /// Pops all jobs whose deadline is `<= now`, earliest first.
    pub fn pop_expired(&mut self, now: D) -> Vec<Job> {
        let mut expired = Vec::new();
        while self.heap.peek().is_some_and(|entry| entry.deadline <= now) {
            if let Some(entry) = self.heap.pop() {
                expired.push(entry.job);
            }
        }
        expired
    }

    /// Clears all timers.
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

impl<D: Ord + Copy> Default for TimerHeap<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: core::fmt::Debug + Ord + Copy> core::fmt::Debug for TimerHeap<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TimerHeap")
            .field("len", &self.heap.len())
            .field("next_deadline", &self.peek_deadline())
            .finish()
    }
}
