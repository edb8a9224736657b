//! `times`: run an indexed task N times in series.

use std::sync::Arc;

use super::fanout::deliver_now;
use super::machine::drive;
use super::series::Collect;
use crate::cx::Cx;
use crate::error::Result;
use crate::types::{Callback, Task};

/// Invokes `f(index, done)` for `index` in `0..n`, one after another,
/// collecting the results in index order.
///
/// `n == 0` succeeds with an empty vector before `times` returns, without
/// calling `f`.
pub fn times<T, F, H>(cx: &Cx, n: usize, f: F, handler: H)
where
    T: Send + 'static,
    F: Fn(usize, Callback<T>) + Send + Sync + 'static,
    H: FnOnce(Result<Vec<T>>) + Send + 'static,
{
    if n == 0 {
        deliver_now(handler, Ok(Vec::new()));
        return;
    }
    let f = Arc::new(f);
    let tasks = (0..n).map(move |index| -> Task<T> {
        let f = Arc::clone(&f);
        Box::new(move |done| f(index, done))
    });
    drive(cx, Collect::new(tasks), handler);
}
