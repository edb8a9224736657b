//! `each`: run a function over every element in parallel, keeping no results.

use std::sync::Arc;

use super::fanout::{deliver_now, dispatch};
use super::tracker::CompletionTracker;
use crate::cx::Cx;
use crate::error::Result;
use crate::tracing_compat::debug;
use crate::types::{Callback, Pair};

/// Applies `f` to every item in parallel.
///
/// Succeeds once every item reported success; the first failure is
/// delivered immediately and later completions are discarded. An empty
/// input succeeds before `each` returns.
pub fn each<I, F, H>(cx: &Cx, items: impl IntoIterator<Item = I>, f: F, handler: H)
where
    I: Send + 'static,
    F: Fn(I, Callback<()>) + Send + Sync + 'static,
    H: FnOnce(Result<()>) + Send + 'static,
{
    let items: Vec<I> = items.into_iter().collect();
    if items.is_empty() {
        deliver_now(handler, Ok(()));
        return;
    }
    let width = items.len();
    let tracker = Arc::new(CompletionTracker::<(), ()>::counting(width, handler));
    dispatch(cx, items, &tracker, f, |tracker, _, result| match result {
        Ok(()) => {
            if tracker.tick() {
                tracker.succeed(());
            }
        }
        Err(err) => {
            tracker.fail(err);
        }
    });
    debug!(width, "each dispatched");
}

/// [`each`] over the entries of an associative collection.
pub fn each_pair<K, V, F, H>(cx: &Cx, entries: impl IntoIterator<Item = (K, V)>, f: F, handler: H)
where
    K: Send + 'static,
    V: Send + 'static,
    F: Fn(Pair<K, V>, Callback<()>) + Send + Sync + 'static,
    H: FnOnce(Result<()>) + Send + 'static,
{
    each(cx, entries.into_iter().map(Pair::from), f, handler);
}
