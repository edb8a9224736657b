//! `retry`: re-invoke a failing task up to a fixed number of attempts.

use std::sync::Arc;

use super::machine::{Machine, Step, drive};
use crate::config::RetryConfig;
use crate::cx::Cx;
use crate::error::Result;
use crate::tracing_compat::debug;
use crate::types::Callback;

struct Retry<T, F> {
    task: Arc<F>,
    attempts: u32,
    made: u32,
    _output: std::marker::PhantomData<fn() -> T>,
}

impl<T, F> Retry<T, F>
where
    T: Send + 'static,
    F: Fn(Callback<T>) + Send + Sync + 'static,
{
    fn attempt(&mut self) -> Step<T, T> {
        self.made += 1;
        let task = Arc::clone(&self.task);
        Step::Run(Box::new(move |done| task(done)))
    }
}

impl<T, F> Machine for Retry<T, F>
where
    T: Send + 'static,
    F: Fn(Callback<T>) + Send + Sync + 'static,
{
    type Item = T;
    type Output = T;

    fn start(&mut self) -> Step<T, T> {
        self.attempt()
    }

    #[cfg_attr(not(feature = "tracing-integration"), allow(unused_variables))]
    fn resume(&mut self, result: Result<T>) -> Step<T, T> {
        match result {
            Ok(value) => {
                debug!(attempt = self.made, "retry succeeded");
                Step::Finish(Ok(value))
            }
            Err(err) if self.made < self.attempts => {
                debug!(
                    attempt = self.made,
                    attempts = self.attempts,
                    error = %err,
                    "attempt failed, retrying"
                );
                self.attempt()
            }
            Err(err) => {
                debug!(attempts = self.attempts, error = %err, "retry exhausted");
                Step::Finish(Err(err))
            }
        }
    }
}

/// Invokes `task` until it succeeds or `config.attempts` invocations failed.
///
/// Each attempt runs on its own scheduler tick. When every attempt fails,
/// the last failure is delivered.
///
/// A config allowing zero attempts is rejected with
/// `ErrorKind::InvalidArgument` before anything is scheduled; the task and
/// the handler are dropped without being called.
///
/// ```
/// use flowsync::combinator::retry;
/// use flowsync::config::RetryConfig;
/// use flowsync::error::Error;
/// use flowsync::test_utils::{test_lab, FakeTask, Recorder};
///
/// let lab = test_lab();
/// let flaky = FakeTask::succeed_then_fail(0, (), Error::user("down"));
/// let recorder = Recorder::new();
/// let config = RetryConfig::new(3).expect("positive attempts");
/// let fake = flaky.clone();
/// retry(&lab.cx(), config, move |done| fake.invoke(done), recorder.handler())?;
/// lab.run();
/// assert_eq!(recorder.single(), Err(Error::user("down")));
/// assert_eq!(flaky.runs(), 3);
/// # Ok::<(), flowsync::Error>(())
/// ```
pub fn retry<T, F, H>(cx: &Cx, config: RetryConfig, task: F, handler: H) -> Result<()>
where
    T: Send + 'static,
    F: Fn(Callback<T>) + Send + Sync + 'static,
    H: FnOnce(Result<T>) + Send + 'static,
{
    config.validate()?;
    let machine = Retry {
        task: Arc::new(task),
        attempts: config.attempts,
        made: 0,
        _output: std::marker::PhantomData,
    };
    drive(cx, machine, handler);
    Ok(())
}
