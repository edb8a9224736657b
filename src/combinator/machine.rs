//! Sequential step driver.
//!
//! Series-shaped combinators (`series`, `waterfall`, `retry`, `forever`, the
//! `whilst` family, `times`, `transform`, `reduce`, `seq`) are written as a
//! small [`Machine`]: the iterator position and the accumulator live in one
//! struct, and the machine answers "what next?" each time the previous task
//! reports. [`drive`] posts every step to the scheduler, so stack depth stays
//! flat no matter how many iterations run, and nothing ever captures a
//! reference to its own continuation.
//!
//! The driver owns all error containment for the machine:
//!
//! - a panic inside `start`/`resume` (where synchronous tests run) becomes
//!   the final failure;
//! - a panic inside a step's task is delivered to the machine as a failed
//!   step, unless the task had already reported;
//! - each step reports at most once, and the final handler runs once.

use std::sync::Arc;

use parking_lot::Mutex;

use super::tracker::Latch;
use crate::cx::Cx;
use crate::error::Result;
use crate::runtime::contain;
use crate::tracing_compat::trace;
use crate::types::Task;

/// What a [`Machine`] wants to happen next.
pub(crate) enum Step<I, O> {
    /// Run this task; its result is fed back through [`Machine::resume`].
    Run(Task<I>),
    /// Stop and deliver this outcome to the final handler.
    Finish(Result<O>),
}

/// A sequential combinator expressed as an explicit state machine.
pub(crate) trait Machine: Send + 'static {
    /// Result type of one step.
    type Item: Send + 'static;
    /// Result type delivered to the final handler.
    type Output: Send + 'static;

    /// Decides the first step.
    fn start(&mut self) -> Step<Self::Item, Self::Output>;

    /// Decides the step following a reported result.
    fn resume(&mut self, result: Result<Self::Item>) -> Step<Self::Item, Self::Output>;
}

struct Driver<M: Machine> {
    cx: Cx,
    machine: Mutex<M>,
    latch: Latch<M::Output>,
}

/// Runs `machine` to completion on `cx`, then calls `handler` exactly once.
///
/// The first step is posted, never run on the caller's stack.
pub(crate) fn drive<M, H>(cx: &Cx, machine: M, handler: H)
where
    M: Machine,
    H: FnOnce(Result<M::Output>) + Send + 'static,
{
    let driver = Arc::new(Driver {
        cx: cx.clone(),
        machine: Mutex::new(machine),
        latch: Latch::new(handler),
    });
    cx.post(move || driver.advance(None));
}

impl<M: Machine> Driver<M> {
    fn advance(self: Arc<Self>, input: Option<Result<M::Item>>) {
        if self.latch.is_done() {
            trace!("machine already finished, dropping step result");
            return;
        }
        let step = contain(|| {
            let mut machine = self.machine.lock();
            match input {
                None => machine.start(),
                Some(result) => machine.resume(result),
            }
        });
        match step {
            Ok(Step::Run(task)) => self.run(task),
            Ok(Step::Finish(result)) => {
                self.latch.deliver(result);
            }
            Err(err) => {
                self.latch.fail(err);
            }
        }
    }

    fn run(self: Arc<Self>, task: Task<M::Item>) {
        let next = Arc::clone(&self);
        let reported = Arc::new(Latch::new(move |result: Result<M::Item>| {
            let cx = next.cx.clone();
            cx.post(move || next.advance(Some(result)));
        }));
        let report = Arc::clone(&reported);
        if let Err(err) = contain(move || {
            task(Box::new(move |result| {
                report.deliver(result);
            }));
        }) {
            reported.fail(err);
        }
    }
}
