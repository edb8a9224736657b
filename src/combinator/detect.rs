//! Short-circuiting predicates: `detect`, `some`, `every`.
//!
//! All three fan out like `map` but finish as soon as one verdict decides
//! the answer. Completions arriving after that are discarded.

use std::sync::Arc;

use super::fanout::{deliver_now, dispatch};
use super::tracker::CompletionTracker;
use crate::cx::Cx;
use crate::error::Result;
use crate::tracing_compat::debug;
use crate::types::Callback;

/// Finds an item whose predicate reports `true`.
///
/// The winner is the first match *to complete*, not the lowest index.
/// `Ok(None)` when nothing matches or the input is empty.
pub fn detect<I, F, H>(cx: &Cx, items: impl IntoIterator<Item = I>, predicate: F, handler: H)
where
    I: Clone + Send + 'static,
    F: Fn(I, Callback<bool>) + Send + Sync + 'static,
    H: FnOnce(Result<Option<I>>) + Send + 'static,
{
    let items: Vec<I> = items.into_iter().collect();
    if items.is_empty() {
        deliver_now(handler, Ok(None));
        return;
    }
    let width = items.len();
    let tracker = Arc::new(CompletionTracker::<(), Option<I>>::counting(width, handler));
    let test = move |item: I, done: Callback<Option<I>>| {
        let candidate = item.clone();
        predicate(
            item,
            Box::new(move |verdict: Result<bool>| {
                done(verdict.map(|hit| hit.then_some(candidate)));
            }),
        );
    };
    dispatch(cx, items, &tracker, test, |tracker, _, result| match result {
        Ok(Some(found)) => {
            tracker.succeed(Some(found));
        }
        Ok(None) => {
            if tracker.tick() {
                tracker.succeed(None);
            }
        }
        Err(err) => {
            tracker.fail(err);
        }
    });
    debug!(width, "detect dispatched");
}

/// Reports whether any predicate answered `decisive`.
fn quantify<I, F, H>(cx: &Cx, items: Vec<I>, decisive: bool, predicate: F, handler: H)
where
    I: Send + 'static,
    F: Fn(I, Callback<bool>) + Send + Sync + 'static,
    H: FnOnce(Result<bool>) + Send + 'static,
{
    let width = items.len();
    let tracker = Arc::new(CompletionTracker::<(), bool>::counting(width, handler));
    dispatch(cx, items, &tracker, predicate, move |tracker, _, result| match result {
        Ok(verdict) if verdict == decisive => {
            tracker.succeed(true);
        }
        Ok(_) => {
            if tracker.tick() {
                tracker.succeed(false);
            }
        }
        Err(err) => {
            tracker.fail(err);
        }
    });
    debug!(width, decisive, "quantifier dispatched");
}

/// `true` as soon as any predicate reports `true`; `false` if none does.
///
/// An empty input is `false`.
pub fn some<I, F, H>(cx: &Cx, items: impl IntoIterator<Item = I>, predicate: F, handler: H)
where
    I: Send + 'static,
    F: Fn(I, Callback<bool>) + Send + Sync + 'static,
    H: FnOnce(Result<bool>) + Send + 'static,
{
    let items: Vec<I> = items.into_iter().collect();
    if items.is_empty() {
        deliver_now(handler, Ok(false));
        return;
    }
    quantify(cx, items, true, predicate, handler);
}

/// `false` as soon as any predicate reports `false`; `true` if all pass.
///
/// An empty input is `false`, not the vacuous `true`. Callers relying on
/// the conventional answer must check for emptiness themselves.
pub fn every<I, F, H>(cx: &Cx, items: impl IntoIterator<Item = I>, predicate: F, handler: H)
where
    I: Send + 'static,
    F: Fn(I, Callback<bool>) + Send + Sync + 'static,
    H: FnOnce(Result<bool>) + Send + 'static,
{
    let items: Vec<I> = items.into_iter().collect();
    if items.is_empty() {
        deliver_now(handler, Ok(false));
        return;
    }
    quantify(cx, items, false, predicate, move |found_false: Result<bool>| {
        handler(found_false.map(|found| !found));
    });
}
