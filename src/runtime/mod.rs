//! The scheduler port and the runtimes that implement it.
//!
//! Combinators never block and only touch the caller's stack frame to
//! complete an empty input: they hand [`Job`]s to a [`Scheduler`], which runs them
//! later, one at a time, in the order they were posted. That port is the
//! only environmental dependency of the crate.
//!
//! Two implementations ship with the crate:
//!
//! - [`EventLoop`]: a dedicated OS thread draining a FIFO queue, with timers
//! - [`LabRuntime`](crate::lab::LabRuntime): a deterministic single-threaded
//!   runtime with virtual time, used by tests
//!
//! [`contain`] is the panic firewall every combinator places around
//! application code.

pub mod event_loop;
pub mod timer;

pub use event_loop::EventLoop;
pub use timer::TimerHeap;

use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::error::{Error, Result};
use crate::tracing_compat::warn;
use crate::types::PanicPayload;

/// A unit of work posted to a scheduler.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// The scheduler port.
///
/// `post` must run `job` asynchronously (never inline on the caller's
/// stack) and must preserve the relative order of jobs posted from the same
/// context.
pub trait Scheduler: Send + Sync {
    /// Schedules `job` to run on a later tick.
    fn post(&self, job: Job);
}

/// Runs `f`, converting a panic into `ErrorKind::Panicked`.
///
/// This is where a synchronous failure inside application code turns into
/// the same failure value an explicit `Err` would have produced.
pub fn contain<R>(f: impl FnOnce() -> R) -> Result<R> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let payload = PanicPayload::from_any(payload.as_ref());
        warn!(panic = %payload.message(), "contained panic in application code");
        Error::panicked(&payload)
    })
}
