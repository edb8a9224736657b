//! `waterfall`: a pipeline threading each stage's output into the next.
//!
//! Stages change type from one step to the next, so the pipeline itself
//! carries [`Value`]s. The [`Waterfall`] builder keeps every stage typed and
//! erases only at the boundary; the untyped [`waterfall`] function accepts
//! pre-erased [`Stage`]s.

use std::any::Any;
use std::marker::PhantomData;

use super::fanout::deliver_now;
use super::machine::{Machine, Step, drive};
use crate::cx::Cx;
use crate::error::{Error, Result};
use crate::tracing_compat::debug;
use crate::types::{Callback, Stage, Value, downcast, stage};

/// Threads a value through a fixed list of stages.
///
/// Shared by [`waterfall`] and [`Seq`](super::seq::Seq).
pub(crate) struct Pipeline {
    stages: std::vec::IntoIter<Stage>,
    value: Option<Value>,
    position: usize,
}

impl Pipeline {
    pub(crate) fn new(stages: Vec<Stage>, input: Value) -> Self {
        Self {
            stages: stages.into_iter(),
            value: Some(input),
            position: 0,
        }
    }

    fn next(&mut self) -> Step<Value, Value> {
        let Some(value) = self.value.take() else {
            return Step::Finish(Err(Error::internal("pipeline resumed without a value")));
        };
        match self.stages.next() {
            Some(stage) => {
                self.position += 1;
                Step::Run(Box::new(move |done| stage(value, done)))
            }
            None => {
                debug!(stages = self.position, "pipeline complete");
                Step::Finish(Ok(value))
            }
        }
    }
}

impl Machine for Pipeline {
    type Item = Value;
    type Output = Value;

    fn start(&mut self) -> Step<Value, Value> {
        self.next()
    }

    fn resume(&mut self, result: Result<Value>) -> Step<Value, Value> {
        match result {
            Ok(value) => {
                self.value = Some(value);
                self.next()
            }
            Err(err) => {
                debug!(stage = self.position, "pipeline aborted");
                Step::Finish(Err(err))
            }
        }
    }
}

/// Runs type-erased stages in order, each receiving the previous output.
///
/// The first stage receives `()`. With no stages the result is `()`,
/// delivered before `waterfall` returns.
pub fn waterfall<H>(cx: &Cx, stages: impl IntoIterator<Item = Stage>, handler: H)
where
    H: FnOnce(Result<Value>) + Send + 'static,
{
    let stages: Vec<Stage> = stages.into_iter().collect();
    if stages.is_empty() {
        deliver_now(handler, Ok(Box::new(())));
        return;
    }
    drive(cx, Pipeline::new(stages, Box::new(())), handler);
}

/// Typed builder for a one-shot waterfall.
///
/// ```
/// use flowsync::combinator::Waterfall;
/// use flowsync::test_utils::{test_lab, Recorder};
///
/// let lab = test_lab();
/// let recorder = Recorder::new();
/// Waterfall::new()
///     .then(|(), done| done(Ok(20_u32)))
///     .then(|n: u32, done| done(Ok(format!("{}", n + 1))))
///     .run(&lab.cx(), recorder.handler());
/// lab.run();
/// assert_eq!(recorder.single(), Ok("21".to_string()));
/// ```
pub struct Waterfall<O> {
    stages: Vec<Stage>,
    output: PhantomData<fn() -> O>,
}

impl Waterfall<()> {
    /// Starts an empty pipeline whose first stage receives `()`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            output: PhantomData,
        }
    }
}

impl Default for Waterfall<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Any + Send> Waterfall<O> {
    /// Appends a stage consuming the current output.
    #[must_use]
    pub fn then<N, F>(mut self, f: F) -> Waterfall<N>
    where
        N: Any + Send,
        F: FnOnce(O, Callback<N>) + Send + 'static,
    {
        self.stages.push(stage(f));
        Waterfall {
            stages: self.stages,
            output: PhantomData,
        }
    }

    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if no stage was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs the pipeline, delivering the last stage's output.
    pub fn run<H>(self, cx: &Cx, handler: H)
    where
        H: FnOnce(Result<O>) + Send + 'static,
    {
        waterfall(cx, self.stages, move |result| {
            handler(result.and_then(downcast::<O>));
        });
    }
}

impl<O> std::fmt::Debug for Waterfall<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waterfall")
            .field("stages", &self.stages.len())
            .finish()
    }
}
