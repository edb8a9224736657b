//! `seq`: compose async functions into one reusable function.

use std::any::{Any, type_name};
use std::marker::PhantomData;
use std::sync::Arc;

use super::fanout::deliver_now;
use super::machine::drive;
use super::waterfall::Pipeline;
use crate::cx::Cx;
use crate::error::{Error, Result};
use crate::types::{Callback, Stage, Value, downcast, erase};

type SharedStage = Arc<dyn Fn(Value, Callback<Value>) + Send + Sync>;

fn share<A, B, F>(f: F) -> SharedStage
where
    A: Any + Send,
    B: Any + Send,
    F: Fn(A, Callback<B>) + Send + Sync + 'static,
{
    Arc::new(move |input: Value, done: Callback<Value>| match input.downcast::<A>() {
        Ok(input) => f(*input, erase(done)),
        Err(_) => done(Err(Error::type_mismatch(type_name::<A>()))),
    })
}

/// A composed function `I -> O` built from async stages.
///
/// Unlike [`Waterfall`](super::waterfall::Waterfall), a `Seq` is not
/// consumed by running it: [`call`](Seq::call) may be invoked any number of
/// times, and clones share the same stages. With no stages it is the
/// identity.
///
/// ```
/// use flowsync::combinator::Seq;
/// use flowsync::test_utils::{test_lab, Recorder};
///
/// let lab = test_lab();
/// let add_then_scale = Seq::<i32, i32>::new()
///     .then(|n: i32, done| done(Ok(n + 1)))
///     .then(|n: i32, done| done(Ok(n * 4)));
/// let recorder = Recorder::new();
/// add_then_scale.call(&lab.cx(), 3, recorder.handler());
/// lab.run();
/// assert_eq!(recorder.single(), Ok(16));
/// ```
pub struct Seq<I, O> {
    stages: Vec<SharedStage>,
    types: PhantomData<fn(I) -> O>,
}

impl<I: Any + Send> Seq<I, I> {
    /// Starts an identity function over `I`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            types: PhantomData,
        }
    }
}

impl<I: Any + Send> Default for Seq<I, I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, O> Clone for Seq<I, O> {
    fn clone(&self) -> Self {
        Self {
            stages: self.stages.clone(),
            types: PhantomData,
        }
    }
}

impl<I, O> Seq<I, O>
where
    I: Any + Send,
    O: Any + Send,
{
    /// Appends a stage consuming the current output.
    #[must_use]
    pub fn then<N, F>(mut self, f: F) -> Seq<I, N>
    where
        N: Any + Send,
        F: Fn(O, Callback<N>) + Send + Sync + 'static,
    {
        self.stages.push(share(f));
        Seq {
            stages: self.stages,
            types: PhantomData,
        }
    }

    /// Number of composed stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true for the identity function.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Threads `input` through every stage, delivering the final output.
    pub fn call<H>(&self, cx: &Cx, input: I, handler: H)
    where
        H: FnOnce(Result<O>) + Send + 'static,
    {
        if self.stages.is_empty() {
            deliver_now(handler, downcast::<O>(Box::new(input)));
            return;
        }
        let stages: Vec<Stage> = self
            .stages
            .iter()
            .map(|shared| {
                let shared = Arc::clone(shared);
                Box::new(move |value: Value, done: Callback<Value>| shared(value, done)) as Stage
            })
            .collect();
        drive(cx, Pipeline::new(stages, Box::new(input)), move |result| {
            handler(result.and_then(downcast::<O>));
        });
    }
}

impl<I, O> std::fmt::Debug for Seq<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Seq")
            .field("stages", &self.stages.len())
            .finish()
    }
}
