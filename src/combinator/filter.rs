//! `filter` and `reject`: parallel predicates selecting a subsequence.

use std::sync::Arc;

use super::fanout::{deliver_now, dispatch, store_or_fail};
use super::tracker::CompletionTracker;
use crate::cx::Cx;
use crate::error::Result;
use crate::tracing_compat::debug;
use crate::types::{Callback, Pair};

fn select<I, F, H>(cx: &Cx, items: Vec<I>, keep_when: bool, predicate: F, handler: H)
where
    I: Clone + Send + 'static,
    F: Fn(I, Callback<bool>) + Send + Sync + 'static,
    H: FnOnce(Result<Vec<I>>) + Send + 'static,
{
    if items.is_empty() {
        deliver_now(handler, Ok(Vec::new()));
        return;
    }
    let width = items.len();
    let tracker = Arc::new(CompletionTracker::<Option<I>, Vec<I>>::ordered(width, handler));
    let test = move |item: I, done: Callback<Option<I>>| {
        let candidate = item.clone();
        predicate(
            item,
            Box::new(move |verdict: Result<bool>| {
                done(verdict.map(|v| (v == keep_when).then_some(candidate)));
            }),
        );
    };
    dispatch(cx, items, &tracker, test, |tracker, index, result| {
        store_or_fail(tracker, index, result, |slots| {
            slots.into_iter().flatten().collect()
        });
    });
    debug!(width, keep_when, "filter dispatched");
}

/// Keeps the items whose predicate reports `true`, in input order.
pub fn filter<I, F, H>(cx: &Cx, items: impl IntoIterator<Item = I>, predicate: F, handler: H)
where
    I: Clone + Send + 'static,
    F: Fn(I, Callback<bool>) + Send + Sync + 'static,
    H: FnOnce(Result<Vec<I>>) + Send + 'static,
{
    select(cx, items.into_iter().collect(), true, predicate, handler);
}

/// [`filter`] over the entries of an associative collection.
pub fn filter_pairs<K, V, F, H>(
    cx: &Cx,
    entries: impl IntoIterator<Item = (K, V)>,
    predicate: F,
    handler: H,
) where
    K: Clone + Send + 'static,
    V: Clone + Send + 'static,
    F: Fn(Pair<K, V>, Callback<bool>) + Send + Sync + 'static,
    H: FnOnce(Result<Vec<Pair<K, V>>>) + Send + 'static,
{
    select(
        cx,
        entries.into_iter().map(Pair::from).collect(),
        true,
        predicate,
        handler,
    );
}

/// Keeps the items whose predicate reports `false`, in input order.
pub fn reject<I, F, H>(cx: &Cx, items: impl IntoIterator<Item = I>, predicate: F, handler: H)
where
    I: Clone + Send + 'static,
    F: Fn(I, Callback<bool>) + Send + Sync + 'static,
    H: FnOnce(Result<Vec<I>>) + Send + 'static,
{
    select(cx, items.into_iter().collect(), false, predicate, handler);
}
