//! `sort`: an in-memory sort executed on a later tick.

use std::cmp::Ordering;

use super::fanout::deliver_now;
use crate::cx::Cx;
use crate::error::Result;
use crate::runtime::contain;
use crate::tracing_compat::debug;

/// Sorts `items` by their natural order on one scheduler post.
pub fn sort<T, H>(cx: &Cx, items: impl IntoIterator<Item = T>, handler: H)
where
    T: Ord + Send + 'static,
    H: FnOnce(Result<Vec<T>>) + Send + 'static,
{
    sort_by(cx, items, T::cmp, handler);
}

/// Sorts `items` with a custom comparator on one scheduler post.
///
/// The sort is stable. A comparator that panics fails the sort.
pub fn sort_by<T, C, H>(cx: &Cx, items: impl IntoIterator<Item = T>, compare: C, handler: H)
where
    T: Send + 'static,
    C: Fn(&T, &T) -> Ordering + Send + 'static,
    H: FnOnce(Result<Vec<T>>) + Send + 'static,
{
    let mut items: Vec<T> = items.into_iter().collect();
    if items.is_empty() {
        deliver_now(handler, Ok(items));
        return;
    }
    cx.post(move || {
        let sorted = contain(move || {
            items.sort_by(compare);
            items
        });
        debug!(
            len = sorted.as_ref().map_or(0, Vec::len),
            ok = sorted.is_ok(),
            "sort finished"
        );
        handler(sorted);
    });
}

/// Sorts `items` by an extracted key on one scheduler post.
pub fn sort_by_key<T, K, F, H>(cx: &Cx, items: impl IntoIterator<Item = T>, key: F, handler: H)
where
    T: Send + 'static,
    K: Ord,
    F: Fn(&T) -> K + Send + 'static,
    H: FnOnce(Result<Vec<T>>) + Send + 'static,
{
    sort_by(cx, items, move |a, b| key(a).cmp(&key(b)), handler);
}
