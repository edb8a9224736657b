//! Capability context.
//!
//! A [`Cx`] is the only way combinators reach the outside world: every job
//! they schedule goes through [`Cx::post`]. It is a cheap cloneable handle
//! around a [`Scheduler`], so continuation closures can carry it from one
//! tick to the next.

use std::fmt;
use std::sync::Arc;

use crate::runtime::Scheduler;

/// Capability context handed to every combinator.
#[derive(Clone)]
pub struct Cx {
    scheduler: Arc<dyn Scheduler>,
}

impl Cx {
    /// Creates a context posting to `scheduler`.
    #[must_use]
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self { scheduler }
    }

    /// Creates a context that owns `scheduler`.
    #[must_use]
    pub fn from_scheduler<S: Scheduler + 'static>(scheduler: S) -> Self {
        Self::new(Arc::new(scheduler))
    }

    /// Schedules `f` on a later tick, after everything already posted.
    pub fn post<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.scheduler.post(Box::new(f));
    }

    /// Returns the underlying scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }
}

impl fmt::Debug for Cx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cx").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Job;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Collecting {
        jobs: Mutex<Vec<Job>>,
    }

    impl Scheduler for Collecting {
        fn post(&self, job: Job) {
            self.jobs.lock().push(job);
        }
    }

    #[test]
    fn post_defers_to_scheduler() {
        let scheduler = Arc::new(Collecting::default());
        let cx = Cx::new(scheduler.clone());
        let ran = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&ran);
        cx.post(move || *flag.lock() = true);

        assert!(!*ran.lock(), "post must not run inline");
        let jobs: Vec<Job> = scheduler.jobs.lock().drain(..).collect();
        assert_eq!(jobs.len(), 1);
        for job in jobs {
            job();
        }
        assert!(*ran.lock());
    }
}
