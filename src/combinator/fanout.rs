//! Parallel fan-out shared by the collection combinators and `parallel`.
//!
//! One job is posted per input element, all in the same tick and in input
//! order. Each job checks the tracker before invoking the per-item
//! function, so elements whose job runs after the combinator already
//! finished are never started. The per-item callback is guarded by its own
//! latch: a function that reports and then panics reports once.

use std::sync::Arc;

use super::tracker::{CompletionTracker, Latch};
use crate::cx::Cx;
use crate::error::Result;
use crate::runtime::contain;
use crate::tracing_compat::trace;
use crate::types::Callback;

/// Posts `f(item, callback)` once per item and routes every per-item outcome
/// to `on_result(tracker, index, result)`.
pub(crate) fn dispatch<I, O, T, R, F, C>(
    cx: &Cx,
    items: Vec<I>,
    tracker: &Arc<CompletionTracker<T, R>>,
    f: F,
    on_result: C,
) where
    I: Send + 'static,
    O: Send + 'static,
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(I, Callback<O>) + Send + Sync + 'static,
    C: Fn(&CompletionTracker<T, R>, usize, Result<O>) + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let on_result = Arc::new(on_result);
    for (index, item) in items.into_iter().enumerate() {
        let tracker = Arc::clone(tracker);
        let f = Arc::clone(&f);
        let on_result = Arc::clone(&on_result);
        cx.post(move || {
            if tracker.is_done() {
                trace!(index, "combinator finished, item not started");
                return;
            }
            let reported = Arc::new(Latch::new(move |result| {
                on_result(&tracker, index, result);
            }));
            let report = Arc::clone(&reported);
            if let Err(err) = contain(move || {
                f(
                    item,
                    Box::new(move |result| {
                        report.deliver(result);
                    }),
                );
            }) {
                reported.fail(err);
            }
        });
    }
}

/// The per-item routing used by order-preserving combinators.
///
/// A failure latches the tracker; a success fills slot `index` and, when it
/// was the last one, delivers the whole buffer mapped through `finish`.
pub(crate) fn store_or_fail<T, R>(
    tracker: &CompletionTracker<T, R>,
    index: usize,
    result: Result<T>,
    finish: impl FnOnce(Vec<T>) -> R,
) {
    match result {
        Ok(value) => {
            if let Some(values) = tracker.store(index, value) {
                tracker.succeed(finish(values));
            }
        }
        Err(err) => {
            tracker.fail(err);
        }
    }
}

/// Delivers an outcome that is known up front, on the caller's stack.
///
/// Used for empty inputs, which complete before the call returns. A panic
/// in the handler is contained.
pub(crate) fn deliver_now<R, H>(handler: H, result: Result<R>)
where
    H: FnOnce(Result<R>),
{
    // Errors are already logged by `contain`.
    let _ = contain(move || handler(result));
}
