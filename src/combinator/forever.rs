//! `forever`: repeat a task until it fails.

use std::convert::Infallible;
use std::sync::Arc;

use super::machine::{Machine, Step, drive};
use crate::cx::Cx;
use crate::error::{Error, Result};
use crate::tracing_compat::debug;
use crate::types::Callback;

struct Forever<T, F> {
    task: Arc<F>,
    iterations: u64,
    _output: std::marker::PhantomData<fn() -> T>,
}

impl<T, F> Forever<T, F>
where
    T: Send + 'static,
    F: Fn(Callback<T>) + Send + Sync + 'static,
{
    fn again(&mut self) -> Step<T, Infallible> {
        self.iterations += 1;
        let task = Arc::clone(&self.task);
        Step::Run(Box::new(move |done| task(done)))
    }
}

impl<T, F> Machine for Forever<T, F>
where
    T: Send + 'static,
    F: Fn(Callback<T>) + Send + Sync + 'static,
{
    type Item = T;
    type Output = Infallible;

    fn start(&mut self) -> Step<T, Infallible> {
        self.again()
    }

    fn resume(&mut self, result: Result<T>) -> Step<T, Infallible> {
        match result {
            Ok(_) => self.again(),
            Err(err) => {
                debug!(iterations = self.iterations, error = %err, "forever stopped");
                Step::Finish(Err(err))
            }
        }
    }
}

/// Invokes `task` again after every success, with no success terminal.
///
/// `handler` only ever receives the failure that ended the loop. Each
/// iteration runs on its own scheduler tick.
pub fn forever<T, F, H>(cx: &Cx, task: F, handler: H)
where
    T: Send + 'static,
    F: Fn(Callback<T>) + Send + Sync + 'static,
    H: FnOnce(Error) + Send + 'static,
{
    let machine = Forever {
        task: Arc::new(task),
        iterations: 0,
        _output: std::marker::PhantomData,
    };
    drive(cx, machine, move |result: Result<Infallible>| match result {
        Err(err) => handler(err),
        Ok(never) => match never {},
    });
}
