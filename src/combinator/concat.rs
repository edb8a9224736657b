//! `concat`: parallel expansion of each item into a sub-sequence.

use std::sync::Arc;

use super::fanout::{deliver_now, dispatch, store_or_fail};
use super::tracker::CompletionTracker;
use crate::cx::Cx;
use crate::error::Result;
use crate::tracing_compat::debug;
use crate::types::Callback;

/// Runs `f` on every item in parallel and concatenates the sub-sequences.
///
/// Sub-sequences are joined in input order, so the output does not depend
/// on completion timing.
pub fn concat<I, O, F, H>(cx: &Cx, items: impl IntoIterator<Item = I>, f: F, handler: H)
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I, Callback<Vec<O>>) + Send + Sync + 'static,
    H: FnOnce(Result<Vec<O>>) + Send + 'static,
{
    let items: Vec<I> = items.into_iter().collect();
    if items.is_empty() {
        deliver_now(handler, Ok(Vec::new()));
        return;
    }
    let width = items.len();
    let tracker = Arc::new(CompletionTracker::<Vec<O>, Vec<O>>::ordered(width, handler));
    dispatch(cx, items, &tracker, f, |tracker, index, result| {
        store_or_fail(tracker, index, result, |parts| {
            parts.into_iter().flatten().collect()
        });
    });
    debug!(width, "concat dispatched");
}
