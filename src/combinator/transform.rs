//! Series collection combinators: `transform`, `transform_pairs`, `reduce`.
//!
//! Unlike `map`, these invoke the per-item function strictly one item at a
//! time, in iteration order.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use super::fanout::deliver_now;
use super::machine::{Machine, Step, drive};
use super::series::Collect;
use crate::cx::Cx;
use crate::error::{Error, Result};
use crate::tracing_compat::debug;
use crate::types::{Callback, Pair, Task};

/// Transforms each item in series, collecting results in input order.
pub fn transform<I, O, F, H>(cx: &Cx, items: impl IntoIterator<Item = I>, f: F, handler: H)
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
    let f = Arc::new(f);
    let tasks = items.into_iter().map(move |item| -> Task<O> {
        let f = Arc::clone(&f);
        Box::new(move |done| f(item, done))
    });
    drive(cx, Collect::new(tasks), handler);
}

/// Transforms each entry of an associative collection in series into a new
/// entry, collecting the results into a `HashMap`.
///
/// A later entry with a duplicate output key replaces the earlier one.
pub fn transform_pairs<K, V, T, R, F, H>(
    cx: &Cx,
    entries: impl IntoIterator<Item = (K, V)>,
    f: F,
    handler: H,
) where
    K: Send + 'static,
    V: Send + 'static,
    T: Eq + Hash + Send + 'static,
    R: Send + 'static,
    F: Fn(Pair<K, V>, Callback<Pair<T, R>>) + Send + Sync + 'static,
    H: FnOnce(Result<HashMap<T, R>>) + Send + 'static,
{
    transform(
        cx,
        entries.into_iter().map(Pair::from),
        f,
        move |pairs: Result<Vec<Pair<T, R>>>| {
            handler(pairs.map(|pairs| pairs.into_iter().map(Pair::into_parts).collect()));
        },
    );
}

struct Reduce<I, O, F> {
    items: std::vec::IntoIter<I>,
    memo: Option<O>,
    f: Arc<F>,
    steps: usize,
}

impl<I, O, F> Reduce<I, O, F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(O, I, Callback<O>) + Send + Sync + 'static,
{
    fn next(&mut self) -> Step<O, O> {
        let Some(memo) = self.memo.take() else {
            return Step::Finish(Err(Error::internal("reduce resumed without an accumulator")));
        };
        match self.items.next() {
            Some(item) => {
                self.steps += 1;
                let f = Arc::clone(&self.f);
                Step::Run(Box::new(move |done| f(memo, item, done)))
            }
            None => {
                debug!(steps = self.steps, "reduce complete");
                Step::Finish(Ok(memo))
            }
        }
    }
}

impl<I, O, F> Machine for Reduce<I, O, F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(O, I, Callback<O>) + Send + Sync + 'static,
{
    type Item = O;
    type Output = O;

    fn start(&mut self) -> Step<O, O> {
        self.next()
    }

    fn resume(&mut self, result: Result<O>) -> Step<O, O> {
        match result {
            Ok(memo) => {
                self.memo = Some(memo);
                self.next()
            }
            Err(err) => Step::Finish(Err(err)),
        }
    }
}

/// Folds `items` in series into a single value.
///
/// `f(accumulator, item, done)` reports the next accumulator. A failure
/// at any step ends the fold; the partial accumulator is dropped.
pub fn reduce<I, O, F, H>(cx: &Cx, items: impl IntoIterator<Item = I>, memo: O, f: F, handler: H)
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(O, I, Callback<O>) + Send + Sync + 'static,
    H: FnOnce(Result<O>) + Send + 'static,
{
    let items: Vec<I> = items.into_iter().collect();
    if items.is_empty() {
        deliver_now(handler, Ok(memo));
        return;
    }
    let machine = Reduce {
        items: items.into_iter(),
        memo: Some(memo),
        f: Arc::new(f),
        steps: 0,
    };
    drive(cx, machine, handler);
}
