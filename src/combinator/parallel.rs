//! `parallel`: run tasks concurrently, collecting results in order.

use std::sync::Arc;

use super::fanout::{deliver_now, dispatch, store_or_fail};
use super::tracker::CompletionTracker;
use crate::cx::Cx;
use crate::error::Result;
use crate::tracing_compat::debug;
use crate::types::{Callback, Task};

/// Starts every task on the same tick and collects their results
/// positionally.
///
/// Follows the same protocol as [`map`](super::map::map): the first failure
/// is delivered immediately, tasks not yet started when it happens are
/// skipped, and late completions are discarded.
pub fn parallel<T, H>(cx: &Cx, tasks: impl IntoIterator<Item = Task<T>>, handler: H)
where
    T: Send + 'static,
    H: FnOnce(Result<Vec<T>>) + Send + 'static,
{
    let tasks: Vec<Task<T>> = tasks.into_iter().collect();
    if tasks.is_empty() {
        deliver_now(handler, Ok(Vec::new()));
        return;
    }
    let width = tasks.len();
    let tracker = Arc::new(CompletionTracker::<T, Vec<T>>::ordered(width, handler));
    dispatch(
        cx,
        tasks,
        &tracker,
        |task: Task<T>, done: Callback<T>| task(done),
        |tracker, index, result| store_or_fail(tracker, index, result, |values| values),
    );
    debug!(width, "parallel dispatched");
}
