//! Condition-driven loops: `whilst`, `until`, `during`, `do_during`.
//!
//! | Loop | Test | Order | Repeats while |
//! |---|---|---|---|
//! | [`whilst`] | synchronous | test, body, test, ... | test is `true` |
//! | [`until`] | synchronous | body, test, body, ... | test is `false` |
//! | [`during`] | asynchronous | test, body, test, ... | test is `true` |
//! | [`do_during`] | asynchronous | body, test, body, ... | test is `true` |
//!
//! A failure or panic from either the test or the body ends the loop with
//! that failure.

use std::sync::Arc;

use super::machine::{Machine, Step, drive};
use crate::cx::Cx;
use crate::error::Result;
use crate::tracing_compat::debug;
use crate::types::Callback;

type SyncTest = Box<dyn Fn() -> bool + Send + Sync>;
type AsyncTest = Arc<dyn Fn(Callback<bool>) + Send + Sync>;
type Body = Arc<dyn Fn(Callback<()>) + Send + Sync>;

enum Test {
    Sync(SyncTest),
    Async(AsyncTest),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Pending {
    Test,
    Body,
}

struct Loop {
    test: Test,
    body: Body,
    continue_when: bool,
    body_first: bool,
    pending: Pending,
    iterations: u64,
}

impl Loop {
    fn check(&mut self) -> Step<bool, ()> {
        match &self.test {
            Test::Sync(test) => {
                let verdict = test();
                self.decide(verdict)
            }
            Test::Async(test) => {
                self.pending = Pending::Test;
                let test = Arc::clone(test);
                Step::Run(Box::new(move |done| test(done)))
            }
        }
    }

    fn decide(&mut self, verdict: bool) -> Step<bool, ()> {
        if verdict == self.continue_when {
            self.run_body()
        } else {
            debug!(iterations = self.iterations, "loop condition released");
            Step::Finish(Ok(()))
        }
    }

    fn run_body(&mut self) -> Step<bool, ()> {
        self.pending = Pending::Body;
        self.iterations += 1;
        let body = Arc::clone(&self.body);
        Step::Run(Box::new(move |done: Callback<bool>| {
            body(Box::new(move |result: Result<()>| done(result.map(|()| true))));
        }))
    }
}

impl Machine for Loop {
    type Item = bool;
    type Output = ();

    fn start(&mut self) -> Step<bool, ()> {
        if self.body_first {
            self.run_body()
        } else {
            self.check()
        }
    }

    fn resume(&mut self, result: Result<bool>) -> Step<bool, ()> {
        match (result, self.pending) {
            (Err(err), _) => {
                debug!(iterations = self.iterations, error = %err, "loop failed");
                Step::Finish(Err(err))
            }
            (Ok(verdict), Pending::Test) => self.decide(verdict),
            (Ok(_), Pending::Body) => self.check(),
        }
    }
}

fn run_loop<H>(cx: &Cx, test: Test, body: Body, continue_when: bool, body_first: bool, handler: H)
where
    H: FnOnce(Result<()>) + Send + 'static,
{
    let machine = Loop {
        test,
        body,
        continue_when,
        body_first,
        pending: Pending::Test,
        iterations: 0,
    };
    drive(cx, machine, handler);
}

/// Runs `body` while the synchronous `test` returns `true`, testing first.
///
/// A test that is `true` for exactly N checks runs the body N times.
///
/// ```
/// use flowsync::combinator::whilst;
/// use flowsync::test_utils::{test_lab, Recorder};
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
///
/// let lab = test_lab();
/// let count = Arc::new(AtomicU32::new(0));
/// let (c1, c2) = (Arc::clone(&count), Arc::clone(&count));
/// let recorder = Recorder::new();
/// whilst(
///     &lab.cx(),
///     move || c1.load(Ordering::SeqCst) < 5,
///     move |done| {
///         c2.fetch_add(1, Ordering::SeqCst);
///         done(Ok(()));
///     },
///     recorder.handler(),
/// );
/// lab.run();
/// assert_eq!(recorder.single(), Ok(()));
/// assert_eq!(count.load(Ordering::SeqCst), 5);
/// ```
pub fn whilst<T, B, H>(cx: &Cx, test: T, body: B, handler: H)
where
    T: Fn() -> bool + Send + Sync + 'static,
    B: Fn(Callback<()>) + Send + Sync + 'static,
    H: FnOnce(Result<()>) + Send + 'static,
{
    run_loop(cx, Test::Sync(Box::new(test)), Arc::new(body), true, false, handler);
}

/// Runs `body`, then keeps running it until the synchronous `test` returns
/// `true`.
///
/// The body always runs at least once.
pub fn until<T, B, H>(cx: &Cx, test: T, body: B, handler: H)
where
    T: Fn() -> bool + Send + Sync + 'static,
    B: Fn(Callback<()>) + Send + Sync + 'static,
    H: FnOnce(Result<()>) + Send + 'static,
{
    run_loop(cx, Test::Sync(Box::new(test)), Arc::new(body), false, true, handler);
}

/// Like [`whilst`] with an asynchronous test.
pub fn during<T, B, H>(cx: &Cx, test: T, body: B, handler: H)
where
    T: Fn(Callback<bool>) + Send + Sync + 'static,
    B: Fn(Callback<()>) + Send + Sync + 'static,
    H: FnOnce(Result<()>) + Send + 'static,
{
    run_loop(cx, Test::Async(Arc::new(test)), Arc::new(body), true, false, handler);
}

/// Like [`during`], but the body runs before the first test.
pub fn do_during<T, B, H>(cx: &Cx, test: T, body: B, handler: H)
where
    T: Fn(Callback<bool>) + Send + Sync + 'static,
    B: Fn(Callback<()>) + Send + Sync + 'static,
    H: FnOnce(Result<()>) + Send + 'static,
{
    run_loop(cx, Test::Async(Arc::new(test)), Arc::new(body), true, true, handler);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorKind};
    use crate::test_utils::{Recorder, test_lab};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counters() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        (Arc::new(AtomicUsize::new(0)), Arc::new(AtomicUsize::new(0)))
    }

    #[test]
    fn whilst_counts_tests_and_bodies() {
        crate::test_utils::init_test_logging();
        crate::test_phase!("whilst_counts_tests_and_bodies");

        let lab = test_lab();
        let (tests, bodies) = counters();
        let (t, b) = (Arc::clone(&tests), Arc::clone(&bodies));
        let recorder = Recorder::new();
        whilst(
            &lab.cx(),
            move || t.fetch_add(1, Ordering::SeqCst) + 1 < 100,
            move |done| {
                b.fetch_add(1, Ordering::SeqCst);
                done(Ok(()));
            },
            recorder.handler(),
        );
        lab.run();
        assert_eq!(recorder.single(), Ok(()));
        assert_eq!(tests.load(Ordering::SeqCst), 100);
        assert_eq!(bodies.load(Ordering::SeqCst), 99);

        crate::test_complete!("whilst_counts_tests_and_bodies");
    }

    #[test]
    fn whilst_false_at_first_never_runs_body() {
        let lab = test_lab();
        let (_, bodies) = counters();
        let b = Arc::clone(&bodies);
        let recorder = Recorder::new();
        whilst(
            &lab.cx(),
            || false,
            move |done| {
                b.fetch_add(1, Ordering::SeqCst);
                done(Err(Error::user("unreachable")));
            },
            recorder.handler(),
        );
        lab.run();
        assert_eq!(recorder.single(), Ok(()));
        assert_eq!(bodies.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn whilst_panicking_test_fails_without_body() {
        let lab = test_lab();
        let (_, bodies) = counters();
        let b = Arc::clone(&bodies);
        let recorder = Recorder::new();
        whilst(
            &lab.cx(),
            || panic!("tester broke"),
            move |done| {
                b.fetch_add(1, Ordering::SeqCst);
                done(Ok(()));
            },
            recorder.handler(),
        );
        lab.run();
        assert_eq!(recorder.single().expect_err("failed").kind(), ErrorKind::Panicked);
        assert_eq!(bodies.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn until_runs_body_first() {
        let lab = test_lab();
        let (tests, bodies) = counters();
        let (t, b) = (Arc::clone(&tests), Arc::clone(&bodies));
        let recorder = Recorder::new();
        until(
            &lab.cx(),
            move || t.fetch_add(1, Ordering::SeqCst) + 1 >= 100,
            move |done| {
                b.fetch_add(1, Ordering::SeqCst);
                done(Ok(()));
            },
            recorder.handler(),
        );
        lab.run();
        assert_eq!(recorder.single(), Ok(()));
        assert_eq!(tests.load(Ordering::SeqCst), 100);
        assert_eq!(bodies.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn until_body_failure_skips_test() {
        let lab = test_lab();
        let (tests, _) = counters();
        let t = Arc::clone(&tests);
        let recorder = Recorder::new();
        until(
            &lab.cx(),
            move || t.fetch_add(1, Ordering::SeqCst) >= 1,
            |done| done(Err(Error::user("body"))),
            recorder.handler(),
        );
        lab.run();
        assert_eq!(recorder.single(), Err(Error::user("body")));
        assert_eq!(tests.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn during_uses_async_test() {
        let lab = test_lab();
        let (tests, bodies) = counters();
        let (t, b) = (Arc::clone(&tests), Arc::clone(&bodies));
        let recorder = Recorder::new();
        during(
            &lab.cx(),
            move |done| done(Ok(t.fetch_add(1, Ordering::SeqCst) < 3)),
            move |done| {
                b.fetch_add(1, Ordering::SeqCst);
                done(Ok(()));
            },
            recorder.handler(),
        );
        lab.run();
        assert_eq!(recorder.single(), Ok(()));
        assert_eq!(tests.load(Ordering::SeqCst), 4);
        assert_eq!(bodies.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn during_test_failure_ends_loop() {
        let lab = test_lab();
        let recorder = Recorder::new();
        during(
            &lab.cx(),
            |done| done(Err(Error::user("cannot decide"))),
            |done| done(Ok(())),
            recorder.handler(),
        );
        lab.run();
        assert_eq!(recorder.single(), Err(Error::user("cannot decide")));
    }

    #[test]
    fn do_during_runs_body_before_test() {
        let lab = test_lab();
        let (tests, bodies) = counters();
        let (t, b) = (Arc::clone(&tests), Arc::clone(&bodies));
        let recorder = Recorder::new();
        do_during(
            &lab.cx(),
            move |done| {
                t.fetch_add(1, Ordering::SeqCst);
                done(Ok(false));
            },
            move |done| {
                b.fetch_add(1, Ordering::SeqCst);
                done(Ok(()));
            },
            recorder.handler(),
        );
        lab.run();
        assert_eq!(recorder.single(), Ok(()));
        assert_eq!(tests.load(Ordering::SeqCst), 1);
        assert_eq!(bodies.load(Ordering::SeqCst), 1);
    }
}
