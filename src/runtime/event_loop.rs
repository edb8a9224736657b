//! A single-threaded event loop on a dedicated OS thread.
//!
//! Jobs are executed one at a time in the order they were posted. Delayed
//! jobs wait in a [`TimerHeap`] until their deadline passes and then join
//! the back of the ready queue. A job that panics is contained and logged;
//! the loop keeps running.
//!
//! # Example
//!
//! ```
//! use flowsync::runtime::EventLoop;
//! use std::sync::mpsc;
//!
//! let event_loop = EventLoop::new().expect("spawn event loop");
//! let (tx, rx) = mpsc::channel();
//! event_loop.cx().post(move || tx.send(7).expect("receiver alive"));
//! assert_eq!(rx.recv().expect("job ran"), 7);
//! event_loop.shutdown();
//! ```

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::timer::TimerHeap;
use super::{Job, Scheduler, contain};
use crate::cx::Cx;
use crate::tracing_compat::{debug, trace};

/// Name given to the loop thread.
pub const DEFAULT_THREAD_NAME: &str = "flowsync-event-loop";

struct LoopState {
    ready: VecDeque<Job>,
    timers: TimerHeap<Instant>,
    shutdown: bool,
}

struct Shared {
    state: Mutex<LoopState>,
    wakeup: Condvar,
}

/// Cloneable handle for posting to an [`EventLoop`] from any thread.
#[derive(Clone)]
pub struct LoopHandle {
    shared: Arc<Shared>,
}

impl LoopHandle {
    /// Schedules `f` to run once `delay` has elapsed.
    pub fn post_after<F>(&self, delay: Duration, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.state.lock();
        if state.shutdown {
            trace!("event loop shut down, dropping delayed job");
            return;
        }
        state.timers.insert(Instant::now() + delay, Box::new(f));
        drop(state);
        self.shared.wakeup.notify_one();
    }

    /// Returns a capability context posting to this loop.
    #[must_use]
    pub fn cx(&self) -> Cx {
        Cx::new(Arc::new(self.clone()))
    }
}

impl Scheduler for LoopHandle {
    fn post(&self, job: Job) {
        let mut state = self.shared.state.lock();
        if state.shutdown {
            trace!("event loop shut down, dropping job");
            return;
        }
        state.ready.push_back(job);
        drop(state);
        self.shared.wakeup.notify_one();
    }
}

impl std::fmt::Debug for LoopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("LoopHandle")
            .field("ready", &state.ready.len())
            .field("timers", &state.timers.len())
            .field("shutdown", &state.shutdown)
            .finish()
    }
}

/// An event loop owning one OS thread.
///
/// Dropping the loop shuts it down; jobs already in the ready queue still
/// run, pending timers are discarded.
#[derive(Debug)]
pub struct EventLoop {
    handle: LoopHandle,
    thread: Option<JoinHandle<()>>,
}

impl EventLoop {
    /// Spawns a new event loop thread.
    pub fn new() -> io::Result<Self> {
        Self::with_name(DEFAULT_THREAD_NAME)
    }

    /// Spawns a new event loop thread with the given name.
    pub fn with_name(name: impl Into<String>) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(LoopState {
                ready: VecDeque::new(),
                timers: TimerHeap::new(),
                shutdown: false,
            }),
            wakeup: Condvar::new(),
        });
        let worker = Arc::clone(&shared);
        let thread = std::thread::Builder::new()
            .name(name.into())
            .spawn(move || run(&worker))?;
        Ok(Self {
            handle: LoopHandle { shared },
            thread: Some(thread),
        })
    }

    /// Returns a cloneable posting handle.
    #[must_use]
    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    /// Returns a capability context posting to this loop.
    #[must_use]
    pub fn cx(&self) -> Cx {
        self.handle.cx()
    }

    /// Schedules `f` to run once `delay` has elapsed.
    pub fn post_after<F>(&self, delay: Duration, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle.post_after(delay, f);
    }

    /// Stops accepting work, runs what is already ready and joins the thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        {
            let mut state = self.handle.shared.state.lock();
            state.shutdown = true;
            state.timers.clear();
        }
        self.handle.shared.wakeup.notify_all();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                debug!("event loop thread terminated abnormally");
            }
        }
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(shared: &Shared) {
    debug!("event loop started");
    loop {
        let job = {
            let mut state = shared.state.lock();
            loop {
                let now = Instant::now();
                let expired = state.timers.pop_expired(now);
                state.ready.extend(expired);
                if let Some(job) = state.ready.pop_front() {
                    break Some(job);
                }
                if state.shutdown {
                    break None;
                }
                match state.timers.peek_deadline() {
                    Some(deadline) => {
                        let _ = shared.wakeup.wait_until(&mut state, deadline);
                    }
                    None => shared.wakeup.wait(&mut state),
                }
            }
        };
        match job {
            Some(job) => {
                // Errors are already logged by `contain`.
                let _ = contain(job);
            }
            None => break,
        }
    }
    debug!("event loop stopped");
}
