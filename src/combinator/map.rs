//! `map`: parallel transformation with positional results.

use std::sync::Arc;

use super::fanout::{deliver_now, dispatch, store_or_fail};
use super::tracker::CompletionTracker;
use crate::cx::Cx;
use crate::error::Result;
use crate::tracing_compat::debug;
use crate::types::{Callback, Pair};

/// Transforms every item in parallel.
///
/// Results are delivered in input order whatever order the per-item tasks
/// complete in. The first failure wins and nothing after it is reported.
///
/// ```
/// use flowsync::combinator::map;
/// use flowsync::test_utils::{test_lab, Recorder};
/// use std::time::Duration;
///
/// let lab = test_lab();
/// let clock = lab.clone();
/// let recorder = Recorder::new();
/// map(
///     &lab.cx(),
///     vec![("a", 30), ("b", 10), ("c", 20)],
///     move |(name, ms): (&'static str, u64), done| {
///         clock.post_after(Duration::from_millis(ms), move || done(Ok(name.to_uppercase())));
///     },
///     recorder.handler(),
/// );
/// lab.run();
/// assert_eq!(recorder.single(), Ok(vec!["A".to_string(), "B".into(), "C".into()]));
/// ```
pub fn map<I, O, F, H>(cx: &Cx, items: impl IntoIterator<Item = I>, f: F, handler: H)
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I, Callback<O>) + Send + Sync + 'static,
    H: FnOnce(Result<Vec<O>>) + Send + 'static,
{
    let items: Vec<I> = items.into_iter().collect();
    if items.is_empty() {
        deliver_now(handler, Ok(Vec::new()));
        return;
    }
    let width = items.len();
    let tracker = Arc::new(CompletionTracker::<O, Vec<O>>::ordered(width, handler));
    dispatch(cx, items, &tracker, f, |tracker, index, result| {
        store_or_fail(tracker, index, result, |values| values);
    });
    debug!(width, "map dispatched");
}

/// [`map`] over the entries of an associative collection.
///
/// Output order follows the collection's iteration order.
pub fn map_pairs<K, V, O, F, H>(
    cx: &Cx,
    entries: impl IntoIterator<Item = (K, V)>,
    f: F,
    handler: H,
) where
    K: Send + 'static,
    V: Send + 'static,
    O: Send + 'static,
    F: Fn(Pair<K, V>, Callback<O>) + Send + Sync + 'static,
    H: FnOnce(Result<Vec<O>>) + Send + 'static,
{
    map(cx, entries.into_iter().map(Pair::from), f, handler);
}
