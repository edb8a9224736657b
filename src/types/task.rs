//! Shapes of the application-supplied units of work.
//!
//! A [`Task`] is handed a [`Callback`] and must invoke it exactly once,
//! possibly on a later scheduler tick. `Callback` is `FnOnce`, so a task can
//! never report twice; a task that panics instead of reporting is converted
//! into a failure by the combinator that runs it.
//!
//! [`Value`] and [`Stage`] are the dynamically typed boundary used by
//! pipelines whose stages change type from one step to the next.

use std::any::{Any, type_name};

use crate::error::{Error, Result};

/// Completion callback handed to a task.
pub type Callback<T> = Box<dyn FnOnce(Result<T>) + Send + 'static>;

/// A one-shot unit of asynchronous work producing a `T`.
pub type Task<T> = Box<dyn FnOnce(Callback<T>) + Send + 'static>;

/// A type-erased value threaded through a pipeline.
pub type Value = Box<dyn Any + Send>;

/// A type-erased pipeline stage.
pub type Stage = Box<dyn FnOnce(Value, Callback<Value>) + Send + 'static>;

/// Boxes a closure as a [`Task`].
///
/// ```
/// use flowsync::types::{task, Task};
///
/// let tasks: Vec<Task<u32>> = vec![task(|done| done(Ok(1))), task(|done| done(Ok(2)))];
/// assert_eq!(tasks.len(), 2);
/// ```
pub fn task<T, F>(f: F) -> Task<T>
where
    F: FnOnce(Callback<T>) + Send + 'static,
{
    Box::new(f)
}

/// Boxes a closure as a [`Callback`].
pub fn callback<T, F>(f: F) -> Callback<T>
where
    F: FnOnce(Result<T>) + Send + 'static,
{
    Box::new(f)
}

/// Erases a typed stage `I -> O` into a [`Stage`].
///
/// The input is downcast at the boundary; a value of the wrong type is
/// reported as `ErrorKind::TypeMismatch` without running `f`.
pub fn stage<I, O, F>(f: F) -> Stage
where
    I: Any + Send,
    O: Any + Send,
    F: FnOnce(I, Callback<O>) + Send + 'static,
{
    Box::new(move |input: Value, done: Callback<Value>| match input.downcast::<I>() {
        Ok(input) => f(*input, erase(done)),
        Err(_) => done(Err(Error::type_mismatch(type_name::<I>()))),
    })
}

/// Adapts an erased callback to accept a typed result.
pub(crate) fn erase<O: Any + Send>(done: Callback<Value>) -> Callback<O> {
    Box::new(move |result: Result<O>| done(result.map(|value| Box::new(value) as Value)))
}

/// Recovers a typed value from the end of a pipeline.
pub(crate) fn downcast<T: Any>(value: Value) -> Result<T> {
    value
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| Error::type_mismatch(type_name::<T>()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn stage_downcasts_input_and_erases_output() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let s = stage(|n: u32, done: Callback<String>| done(Ok(format!("#{n}"))));
        s(
            Box::new(7_u32),
            Box::new(move |r| *sink.lock() = Some(r.and_then(downcast::<String>))),
        );
        assert_eq!(seen.lock().take(), Some(Ok("#7".to_string())));
    }

    #[test]
    fn stage_rejects_wrong_input_type() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let s = stage(|n: u32, done: Callback<u32>| done(Ok(n)));
        s(
            Box::new("not a number"),
            Box::new(move |r| *sink.lock() = Some(r.map(|_| ()))),
        );
        let err = seen.lock().take().expect("callback ran").expect_err("mismatch");
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }
}
