//! The lab runtime: a deterministic scheduler with virtual time.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::config::LabConfig;
use crate::cx::Cx;
use crate::runtime::{Job, Scheduler, TimerHeap, contain};
use crate::tracing_compat::{debug, trace};

/// Summary of one [`LabRuntime::run`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Jobs executed.
    pub steps: u64,
    /// Virtual time when the run stopped.
    pub now: Duration,
    /// Jobs that panicked (and were contained).
    pub panics: u64,
    /// True if the run stopped because the step budget ran out.
    pub exhausted: bool,
}

struct LabState {
    ready: VecDeque<Job>,
    timers: TimerHeap<Duration>,
    now: Duration,
}

impl std::fmt::Debug for LabState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabState")
            .field("ready", &self.ready.len())
            .field("timers", &self.timers)
            .field("now", &self.now)
            .finish()
    }
}

#[derive(Debug)]
struct LabInner {
    config: LabConfig,
    state: Mutex<LabState>,
}

/// Deterministic single-threaded runtime.
///
/// Cloning yields another handle to the same runtime, so simulated tasks can
/// capture one and schedule their own completions with [`post_after`].
///
/// [`post_after`]: LabRuntime::post_after
#[derive(Debug, Clone)]
pub struct LabRuntime {
    inner: Arc<LabInner>,
}

impl LabRuntime {
    /// Creates a new lab runtime.
    #[must_use]
    pub fn new(config: LabConfig) -> Self {
        Self {
            inner: Arc::new(LabInner {
                config,
                state: Mutex::new(LabState {
                    ready: VecDeque::new(),
                    timers: TimerHeap::new(),
                    now: Duration::ZERO,
                }),
            }),
        }
    }

    /// Returns a capability context posting to this runtime.
    #[must_use]
    pub fn cx(&self) -> Cx {
        Cx::new(Arc::new(self.clone()))
    }

    /// Returns the current virtual time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.inner.state.lock().now
    }

    /// Schedules `f` to run `delay` after the current virtual time.
    pub fn post_after<F>(&self, delay: Duration, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.inner.state.lock();
        let deadline = state.now + delay;
        state.timers.insert(deadline, Box::new(f));
    }

    /// Returns true if no job is ready and no timer is pending.
    #[must_use]
    pub fn is_quiescent(&self) -> bool {
        let state = self.inner.state.lock();
        state.ready.is_empty() && state.timers.is_empty()
    }

    /// Runs jobs until the runtime is quiescent or the step budget is spent.
    ///
    /// When the ready queue empties, virtual time jumps to the next timer
    /// deadline and every timer due at that instant becomes ready.
    pub fn run(&self) -> RunReport {
        let mut steps = 0_u64;
        let mut panics = 0_u64;
        loop {
            if self
                .inner
                .config
                .max_steps
                .is_some_and(|limit| steps >= limit)
            {
                let now = self.now();
                debug!(steps, ?now, "lab step budget exhausted");
                return RunReport {
                    steps,
                    now,
                    panics,
                    exhausted: true,
                };
            }
            let Some(job) = self.next_job() else {
                let now = self.now();
                trace!(steps, ?now, "lab runtime quiescent");
                return RunReport {
                    steps,
                    now,
                    panics,
                    exhausted: false,
                };
            };
            steps += 1;
            if contain(job).is_err() {
                panics += 1;
            }
        }
    }

    fn next_job(&self) -> Option<Job> {
        let mut state = self.inner.state.lock();
        if let Some(job) = state.ready.pop_front() {
            return Some(job);
        }
        let deadline = state.timers.peek_deadline()?;
        state.now = state.now.max(deadline);
        let now = state.now;
        let expired = state.timers.pop_expired(now);
        state.ready.extend(expired);
        state.ready.pop_front()
    }
}

impl Scheduler for LabRuntime {
    fn post(&self, job: Job) {
        self.inner.state.lock().ready.push_back(job);
    }
}
