//! Test utilities for flowsync.
//!
//! This module provides shared helpers for unit and integration tests:
//! - Consistent tracing-based logging initialization
//! - Phase/section macros for readable test output
//! - Lab runtime constructors
//! - Fake tasks that succeed a fixed number of times, then fail or panic
//! - A recorder for final handler invocations
//!
//! # Example
//! ```
//! use flowsync::combinator::map;
//! use flowsync::test_utils::{init_test_logging, test_lab, Recorder};
//!
//! init_test_logging();
//! let lab = test_lab();
//! let recorder = Recorder::<Vec<i32>>::new();
//! map(&lab.cx(), vec![1, 2, 3], |n: i32, done| done(Ok(n * 10)), recorder.handler());
//! lab.run();
//! assert_eq!(recorder.single(), Ok(vec![10, 20, 30]));
//! ```

use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::error::{Error, Result};
use crate::lab::{LabConfig, LabRuntime};
use crate::types::{Callback, Task};

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// Create a deterministic lab runtime for testing.
#[must_use]
pub fn test_lab() -> LabRuntime {
    LabRuntime::new(LabConfig::default())
}

/// Builds a task that reports `result` after `delay` of virtual time.
pub fn delayed<T>(lab: &LabRuntime, delay: Duration, result: Result<T>) -> Task<T>
where
    T: Send + 'static,
{
    let lab = lab.clone();
    Box::new(move |done: Callback<T>| lab.post_after(delay, move || done(result)))
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log a section within a test phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Log test completion with summary.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
    ($name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            test = %$name,
            $($key = %$value,)*
            "test completed successfully: {}",
            $name
        );
    };
}

/// Log before assertions for context.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "Asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}

/// How a [`FakeTask`] behaves once its successes are used up.
#[derive(Debug, Clone)]
pub enum FakeFailure {
    /// Report this error through the callback.
    Error(Error),
    /// Panic with this message instead of reporting.
    Panic(String),
}

#[derive(Debug)]
struct FakeInner<T> {
    value: T,
    successes: Option<usize>,
    failure: FakeFailure,
    runs: AtomicUsize,
}

/// A scripted task: succeeds a fixed number of times, then fails or panics.
///
/// Clones share the run counter.
#[derive(Debug)]
pub struct FakeTask<T> {
    inner: Arc<FakeInner<T>>,
}

impl<T> Clone for FakeTask<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> FakeTask<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// A task that always succeeds with `value`.
    #[must_use]
    pub fn succeeding(value: T) -> Self {
        Self::build(value, None, FakeFailure::Error(Error::user("unreachable")))
    }

    /// A task that always fails with `error`.
    #[must_use]
    pub fn failing(value: T, error: Error) -> Self {
        Self::build(value, Some(0), FakeFailure::Error(error))
    }

    /// Succeeds `successes` times with `value`, then fails with `error`.
    #[must_use]
    pub fn succeed_then_fail(successes: usize, value: T, error: Error) -> Self {
        Self::build(value, Some(successes), FakeFailure::Error(error))
    }

    /// Succeeds `successes` times with `value`, then panics with `message`.
    #[must_use]
    pub fn succeed_then_panic(successes: usize, value: T, message: impl Into<String>) -> Self {
        Self::build(value, Some(successes), FakeFailure::Panic(message.into()))
    }

    fn build(value: T, successes: Option<usize>, failure: FakeFailure) -> Self {
        Self {
            inner: Arc::new(FakeInner {
                value,
                successes,
                failure,
                runs: AtomicUsize::new(0),
            }),
        }
    }

    /// Returns how many times the task has been invoked.
    #[must_use]
    pub fn runs(&self) -> usize {
        self.inner.runs.load(Ordering::SeqCst)
    }

    /// Invokes the task once, reporting synchronously.
    pub fn invoke(&self, done: Callback<T>) {
        let run = self.inner.runs.fetch_add(1, Ordering::SeqCst);
        let succeeds = self.inner.successes.is_none_or(|limit| run < limit);
        if succeeds {
            done(Ok(self.inner.value.clone()));
            return;
        }
        match &self.inner.failure {
            FakeFailure::Error(err) => done(Err(err.clone())),
            FakeFailure::Panic(message) => panic!("{message}"),
        }
    }

    /// Returns a one-shot [`Task`] that invokes this fake.
    #[must_use]
    pub fn task(&self) -> Task<T> {
        let fake = self.clone();
        Box::new(move |done| fake.invoke(done))
    }
}

/// Captures every invocation of a final handler.
#[derive(Debug)]
pub struct Recorder<T> {
    seen: Arc<Mutex<Vec<Result<T>>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            seen: Arc::clone(&self.seen),
        }
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self {
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Send + 'static> Recorder<T> {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handler that appends its result to the recorder.
    pub fn handler(&self) -> impl FnOnce(Result<T>) + Send + 'static {
        let seen = Arc::clone(&self.seen);
        move |result| seen.lock().push(result)
    }

    /// Returns the handler boxed as a [`Callback`].
    #[must_use]
    pub fn callback(&self) -> Callback<T> {
        Box::new(self.handler())
    }

    /// Number of recorded invocations.
    #[must_use]
    pub fn count(&self) -> usize {
        self.seen.lock().len()
    }

    /// Returns true if the handler has not run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }

    /// Takes the only recorded result.
    ///
    /// # Panics
    ///
    /// Panics unless the handler ran exactly once.
    #[must_use]
    pub fn single(&self) -> Result<T> {
        let mut seen = self.seen.lock();
        assert_eq!(seen.len(), 1, "handler must run exactly once");
        seen.remove(0)
    }

    /// Takes every recorded result.
    #[must_use]
    pub fn take(&self) -> Vec<Result<T>> {
        std::mem::take(&mut *self.seen.lock())
    }
}
