//! `series`: run tasks one after another, collecting results in order.

use super::fanout::deliver_now;
use super::machine::{Machine, Step, drive};
use crate::cx::Cx;
use crate::error::Result;
use crate::tracing_compat::debug;
use crate::types::Task;

/// Runs a lazily produced sequence of tasks one at a time.
///
/// The next task is pulled from the iterator only after the previous one
/// succeeded. Shared by `series`, `transform` and `times`.
pub(crate) struct Collect<O> {
    tasks: Box<dyn Iterator<Item = Task<O>> + Send>,
    results: Vec<O>,
}

impl<O: Send + 'static> Collect<O> {
    pub(crate) fn new<It>(tasks: It) -> Self
    where
        It: Iterator<Item = Task<O>> + Send + 'static,
    {
        let (lower, _) = tasks.size_hint();
        Self {
            tasks: Box::new(tasks),
            results: Vec::with_capacity(lower),
        }
    }

    fn next(&mut self) -> Step<O, Vec<O>> {
        match self.tasks.next() {
            Some(task) => Step::Run(task),
            None => {
                debug!(steps = self.results.len(), "series complete");
                Step::Finish(Ok(std::mem::take(&mut self.results)))
            }
        }
    }
}

impl<O: Send + 'static> Machine for Collect<O> {
    type Item = O;
    type Output = Vec<O>;

    fn start(&mut self) -> Step<O, Vec<O>> {
        self.next()
    }

    fn resume(&mut self, result: Result<O>) -> Step<O, Vec<O>> {
        match result {
            Ok(value) => {
                self.results.push(value);
                self.next()
            }
            Err(err) => {
                debug!(step = self.results.len(), "series aborted");
                Step::Finish(Err(err))
            }
        }
    }
}

/// Runs `tasks` in order, each starting only after the previous succeeded.
///
/// The first failure aborts the remainder; the results of earlier tasks
/// are not exposed. An empty input succeeds with an empty vector before
/// `series` returns.
///
/// ```
/// use flowsync::combinator::series;
/// use flowsync::test_utils::{test_lab, Recorder};
/// use flowsync::types::{task, Task};
///
/// let lab = test_lab();
/// let recorder = Recorder::new();
/// let tasks: Vec<Task<&str>> = vec![task(|done| done(Ok("one"))), task(|done| done(Ok("two")))];
/// series(&lab.cx(), tasks, recorder.handler());
/// lab.run();
/// assert_eq!(recorder.single(), Ok(vec!["one", "two"]));
/// ```
pub fn series<T, H>(cx: &Cx, tasks: impl IntoIterator<Item = Task<T>>, handler: H)
where
    T: Send + 'static,
    H: FnOnce(Result<Vec<T>>) + Send + 'static,
{
    let tasks: Vec<Task<T>> = tasks.into_iter().collect();
    if tasks.is_empty() {
        deliver_now(handler, Ok(Vec::new()));
        return;
    }
    drive(cx, Collect::new(tasks.into_iter()), handler);
}
