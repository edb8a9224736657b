//! Completion accounting shared by every combinator.
//!
//! Two pieces of per-invocation state decide when a combinator is done:
//!
//! - [`Latch`] owns the caller's final handler. The first terminal event
//!   takes it; every later event finds it gone and is discarded. The latch
//!   *is* the `done` flag: `is_done()` is true exactly when the handler has
//!   been taken.
//! - [`CompletionTracker`] adds the fan-out bookkeeping on top of a latch:
//!   a `remaining` countdown initialised to the fan-out width and, for
//!   order-preserving combinators, a result buffer pre-sized to the input
//!   length where each task writes only to its own reserved index.
//!
//! # Invariants
//!
//! - The final handler runs at most once; every combinator arranges for it
//!   to run exactly once.
//! - Once done, no further write reaches the result buffer.
//! - No lock is held while the final handler runs, so a handler may start
//!   another combinator (or post to the same scheduler) freely.

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::tracing_compat::trace;

/// The final handler of a combinator invocation.
pub type Handler<R> = Box<dyn FnOnce(Result<R>) + Send + 'static>;

/// Done latch holding the final handler until the first terminal event.
pub struct Latch<R> {
    handler: Mutex<Option<Handler<R>>>,
}

impl<R> Latch<R> {
    /// Creates an open latch around `handler`.
    pub fn new<H>(handler: H) -> Self
    where
        H: FnOnce(Result<R>) + Send + 'static,
    {
        Self {
            handler: Mutex::new(Some(Box::new(handler))),
        }
    }

    /// Returns true once a terminal event has been delivered.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.handler.lock().is_none()
    }

    /// Delivers `result` if the latch is still open.
    ///
    /// Returns false, and drops `result`, when the latch was already closed.
    pub fn deliver(&self, result: Result<R>) -> bool {
        let handler = self.handler.lock().take();
        match handler {
            Some(handler) => {
                handler(result);
                true
            }
            None => {
                trace!(ok = result.is_ok(), "late completion discarded");
                false
            }
        }
    }

    /// Delivers a success.
    pub fn succeed(&self, value: R) -> bool {
        self.deliver(Ok(value))
    }

    /// Delivers a failure.
    pub fn fail(&self, error: Error) -> bool {
        self.deliver(Err(error))
    }
}

impl<R> std::fmt::Debug for Latch<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Latch")
            .field("done", &self.is_done())
            .finish()
    }
}

#[derive(Debug)]
struct TrackerState<T> {
    remaining: usize,
    results: Vec<Option<T>>,
}

/// Per-invocation fan-out state: countdown, positional buffer, done latch.
///
/// `T` is the per-slot value, `R` the value handed to the final handler.
pub struct CompletionTracker<T, R> {
    state: Mutex<TrackerState<T>>,
    latch: Latch<R>,
}

impl<T, R> CompletionTracker<T, R> {
    /// Creates a tracker for `width` tasks with a positional buffer.
    pub fn ordered<H>(width: usize, handler: H) -> Self
    where
        H: FnOnce(Result<R>) + Send + 'static,
    {
        let mut results = Vec::with_capacity(width);
        results.resize_with(width, || None);
        Self {
            state: Mutex::new(TrackerState {
                remaining: width,
                results,
            }),
            latch: Latch::new(handler),
        }
    }

    /// Creates a tracker for `width` tasks that only counts completions.
    pub fn counting<H>(width: usize, handler: H) -> Self
    where
        H: FnOnce(Result<R>) + Send + 'static,
    {
        Self {
            state: Mutex::new(TrackerState {
                remaining: width,
                results: Vec::new(),
            }),
            latch: Latch::new(handler),
        }
    }

    /// Returns true once the outcome has been delivered.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.latch.is_done()
    }

    /// Returns the number of tasks that have not reported yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.state.lock().remaining
    }

    /// Records a success for the task at `index`.
    ///
    /// Returns the buffer, in index order, when this was the last
    /// outstanding task and the tracker is not done. The caller is expected
    /// to deliver it. Writes arriving after the tracker is done are dropped.
    pub fn store(&self, index: usize, value: T) -> Option<Vec<T>> {
        if self.is_done() {
            trace!(index, "store after done discarded");
            return None;
        }
        let mut state = self.state.lock();
        if let Some(slot) = state.results.get_mut(index) {
            *slot = Some(value);
        }
        state.remaining = state.remaining.saturating_sub(1);
        if state.remaining == 0 {
            Some(state.results.drain(..).flatten().collect())
        } else {
            None
        }
    }

    /// Counts one unordered success.
    ///
    /// Returns true when this was the last outstanding task and the tracker
    /// is not done.
    pub fn tick(&self) -> bool {
        if self.is_done() {
            return false;
        }
        let mut state = self.state.lock();
        state.remaining = state.remaining.saturating_sub(1);
        state.remaining == 0
    }

    /// Delivers a success if the tracker is not done.
    pub fn succeed(&self, value: R) -> bool {
        self.latch.succeed(value)
    }

    /// Delivers a failure if the tracker is not done; later events are discarded.
    pub fn fail(&self, error: Error) -> bool {
        self.latch.fail(error)
    }

    /// Delivers an arbitrary outcome if the tracker is not done.
    pub fn deliver(&self, result: Result<R>) -> bool {
        self.latch.deliver(result)
    }
}

impl<T, R> std::fmt::Debug for CompletionTracker<T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CompletionTracker")
            .field("remaining", &state.remaining)
            .field("width", &state.results.len())
            .field("done", &self.latch.is_done())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    type Seen<R> = Arc<Mutex<Vec<Result<R>>>>;

    fn recorder<R: Send + 'static>() -> (Seen<R>, impl FnOnce(Result<R>) + Send + 'static) {
        let seen: Seen<R> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |r| sink.lock().push(r))
    }

    #[test]
    fn latch_delivers_once() {
        let (seen, handler) = recorder::<u32>();
        let latch = Latch::new(handler);
        assert!(!latch.is_done());
        assert!(latch.succeed(1));
        assert!(latch.is_done());
        assert!(!latch.fail(Error::user("late")));
        assert_eq!(*seen.lock(), vec![Ok(1)]);
    }

    #[test]
    fn ordered_store_returns_buffer_in_index_order() {
        crate::test_utils::init_test_logging();
        crate::test_phase!("ordered_store_returns_buffer_in_index_order");

        let (seen, handler) = recorder::<Vec<&str>>();
        let tracker = CompletionTracker::ordered(3, handler);
        assert_eq!(tracker.store(2, "c"), None);
        assert_eq!(tracker.store(0, "a"), None);
        assert_eq!(tracker.remaining(), 1);
        let full = tracker.store(1, "b").expect("last slot completes");
        assert_eq!(full, vec!["a", "b", "c"]);
        assert!(tracker.succeed(full));
        assert_eq!(*seen.lock(), vec![Ok(vec!["a", "b", "c"])]);

        crate::test_complete!("ordered_store_returns_buffer_in_index_order");
    }

    #[test]
    fn failure_latches_and_discards_later_stores() {
        let (seen, handler) = recorder::<Vec<u8>>();
        let tracker = CompletionTracker::ordered(2, handler);
        assert!(tracker.fail(Error::user("first")));
        assert_eq!(tracker.store(0, 1), None);
        assert_eq!(tracker.store(1, 2), None);
        assert!(!tracker.fail(Error::user("second")));
        assert_eq!(*seen.lock(), vec![Err(Error::user("first"))]);
    }

    #[test]
    fn counting_tick_reports_last_completion() {
        let (seen, handler) = recorder::<()>();
        let tracker: CompletionTracker<(), ()> = CompletionTracker::counting(2, handler);
        assert!(!tracker.tick());
        assert!(tracker.tick());
        assert!(tracker.succeed(()));
        assert!(!tracker.tick());
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn early_success_closes_tracker() {
        let (seen, handler) = recorder::<bool>();
        let tracker: CompletionTracker<(), bool> = CompletionTracker::counting(3, handler);
        assert!(tracker.succeed(true));
        assert!(!tracker.tick());
        assert!(!tracker.succeed(false));
        assert_eq!(*seen.lock(), vec![Ok(true)]);
    }
}
