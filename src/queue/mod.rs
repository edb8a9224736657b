//! Bounded worker queues.
//!
//! A [`Queue`] feeds pushed items one at a time to a worker function, with at
//! most `concurrency` worker invocations running at once. A [`Cargo`] feeds
//! them in batches of up to `payload` items; every item of a batch receives
//! the batch outcome.
//!
//! Items are admitted in push order. Each item's callback fires exactly
//! once: with the worker's outcome, or with
//! [`ErrorKind::QueueKilled`](crate::error::ErrorKind::QueueKilled) if the
//! queue was killed while the item waited.
//!
//! ```
//! use flowsync::queue::Queue;
//! use flowsync::test_utils::{test_lab, Recorder};
//!
//! let lab = test_lab();
//! let queue = Queue::with_concurrency(&lab.cx(), 2, |n: u32, done| done(Ok(n * 10)))
//!     .expect("valid concurrency");
//! let recorder = Recorder::new();
//! queue.push(4, recorder.handler());
//! lab.run();
//! assert_eq!(recorder.single(), Ok(40));
//! assert!(queue.idle());
//! ```

mod engine;

use std::sync::Arc;

use engine::{BatchWorker, Engine, HookKind, fan_clone, fan_single};

use crate::config::QueueConfig;
use crate::cx::Cx;
use crate::error::{Error, Result};
use crate::types::Callback;

/// Coarse occupancy of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueState {
    /// Nothing waiting and no worker running.
    Idle,
    /// Workers running with spare capacity or an empty backlog.
    Draining,
    /// Every worker slot is busy and items are waiting.
    Saturated,
}

macro_rules! queue_api {
    ($ty:ident) => {
        impl<I, O> $ty<I, O>
        where
            I: Send + 'static,
            O: Send + 'static,
        {
            /// Appends an item; `done` receives its outcome.
            pub fn push<H>(&self, item: I, done: H)
            where
                H: FnOnce(Result<O>) + Send + 'static,
            {
                self.engine.push(item, Box::new(done));
            }

            /// Appends every item in order; `done` receives each item's outcome.
            pub fn push_all<H>(&self, items: impl IntoIterator<Item = I>, done: H)
            where
                H: Fn(Result<O>) + Send + Sync + 'static,
            {
                let done = Arc::new(done);
                let entries = items
                    .into_iter()
                    .map(|item| {
                        let done = Arc::clone(&done);
                        let callback: Callback<O> = Box::new(move |result| done(result));
                        (item, callback)
                    })
                    .collect();
                self.engine.push_many(entries);
            }

            /// Number of items waiting for a worker.
            #[must_use]
            pub fn length(&self) -> usize {
                self.engine.length()
            }

            /// Number of worker invocations in flight.
            #[must_use]
            pub fn running(&self) -> usize {
                self.engine.running()
            }

            /// Returns true when nothing is waiting and nothing is running.
            #[must_use]
            pub fn idle(&self) -> bool {
                self.engine.state() == QueueState::Idle
            }

            /// Current occupancy.
            #[must_use]
            pub fn state(&self) -> QueueState {
                self.engine.state()
            }

            /// Maximum number of concurrent worker invocations.
            #[must_use]
            pub fn concurrency(&self) -> usize {
                self.engine.concurrency()
            }

            /// Stops admitting items. Running workers are unaffected.
            pub fn pause(&self) {
                self.engine.pause();
            }

            /// Resumes admission after [`pause`](Self::pause).
            pub fn resume(&self) {
                self.engine.resume();
            }

            /// Returns true while paused.
            #[must_use]
            pub fn is_paused(&self) -> bool {
                self.engine.is_paused()
            }

            /// Discards the backlog and rejects further pushes.
            ///
            /// Every waiting item, and every item pushed afterwards, receives
            /// `ErrorKind::QueueKilled`. Running workers finish normally. Hooks
            /// are dropped.
            pub fn kill(&self) {
                self.engine.kill();
            }

            /// Returns true after [`kill`](Self::kill).
            #[must_use]
            pub fn is_killed(&self) -> bool {
                self.engine.is_killed()
            }

            /// Called when admission fills the last worker slot while items
            /// are still waiting.
            pub fn on_saturated(&self, hook: impl Fn() + Send + Sync + 'static) {
                self.engine.set_hook(HookKind::Saturated, Arc::new(hook));
            }

            /// Called when the last waiting item is handed to a worker.
            pub fn on_empty(&self, hook: impl Fn() + Send + Sync + 'static) {
                self.engine.set_hook(HookKind::Empty, Arc::new(hook));
            }

            /// Called when the last running worker finishes with nothing
            /// waiting.
            pub fn on_drain(&self, hook: impl Fn() + Send + Sync + 'static) {
                self.engine.set_hook(HookKind::Drain, Arc::new(hook));
            }
        }

        impl<I, O> Clone for $ty<I, O> {
            fn clone(&self) -> Self {
                Self {
                    engine: Arc::clone(&self.engine),
                }
            }
        }
    };
}

/// A queue handing items one at a time to a worker.
///
/// Clones share the same backlog and worker slots.
pub struct Queue<I, O> {
    engine: Arc<Engine<I, O>>,
}

impl<I, O> Queue<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Creates a queue from a config. Only `concurrency` applies; `payload`
    /// is ignored and not validated.
    ///
    /// # Errors
    ///
    /// `ErrorKind::InvalidArgument` if `concurrency` is zero.
    pub fn new<W>(cx: &Cx, config: QueueConfig, worker: W) -> Result<Self>
    where
        W: Fn(I, Callback<O>) + Send + Sync + 'static,
    {
        config.validate_concurrency()?;
        let worker: BatchWorker<I, O> = Arc::new(move |mut items: Vec<I>, done: Callback<O>| {
            match items.pop() {
                Some(item) => worker(item, done),
                None => done(Err(Error::internal("queue admitted an empty batch"))),
            }
        });
        Ok(Self {
            engine: Engine::new(cx, config.concurrency, 1, worker, fan_single::<O>),
        })
    }

    /// Creates a queue running at most `concurrency` workers.
    ///
    /// # Errors
    ///
    /// `ErrorKind::InvalidArgument` if `concurrency` is zero.
    pub fn with_concurrency<W>(cx: &Cx, concurrency: usize, worker: W) -> Result<Self>
    where
        W: Fn(I, Callback<O>) + Send + Sync + 'static,
    {
        Self::new(cx, QueueConfig::new(concurrency), worker)
    }
}

queue_api!(Queue);

impl<I, O> std::fmt::Debug for Queue<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("concurrency", &self.engine.concurrency())
            .field("length", &self.engine.length())
            .field("running", &self.engine.running())
            .finish()
    }
}

/// A queue handing items to a worker in batches.
///
/// Every item of a batch receives a clone of the batch outcome.
pub struct Cargo<I, O> {
    engine: Arc<Engine<I, O>>,
}

impl<I, O> Cargo<I, O>
where
    I: Send + 'static,
    O: Clone + Send + 'static,
{
    /// Creates a cargo from a config.
    ///
    /// # Errors
    ///
    /// `ErrorKind::InvalidArgument` if the config does not validate.
    pub fn new<W>(cx: &Cx, config: QueueConfig, worker: W) -> Result<Self>
    where
        W: Fn(Vec<I>, Callback<O>) + Send + Sync + 'static,
    {
        config.validate()?;
        Ok(Self {
            engine: Engine::new(
                cx,
                config.concurrency,
                config.payload,
                Arc::new(worker),
                fan_clone::<O>,
            ),
        })
    }

    /// Creates a single-worker cargo with batches of up to `payload` items.
    ///
    /// # Errors
    ///
    /// `ErrorKind::InvalidArgument` if `payload` is zero.
    pub fn with_payload<W>(cx: &Cx, payload: usize, worker: W) -> Result<Self>
    where
        W: Fn(Vec<I>, Callback<O>) + Send + Sync + 'static,
    {
        Self::new(cx, QueueConfig::new(1).payload(payload), worker)
    }

    /// Maximum number of items per batch.
    #[must_use]
    pub fn payload(&self) -> usize {
        self.engine.payload()
    }
}

queue_api!(Cargo);

impl<I, O> std::fmt::Debug for Cargo<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cargo")
            .field("concurrency", &self.engine.concurrency())
            .field("payload", &self.engine.payload())
            .field("length", &self.engine.length())
            .field("running", &self.engine.running())
            .finish()
    }
}
