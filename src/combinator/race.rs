//! `race`: the first task to report decides the outcome.

use std::sync::Arc;

use super::fanout::deliver_now;
use super::tracker::Latch;
use crate::cx::Cx;
use crate::error::Result;
use crate::runtime::contain;
use crate::tracing_compat::{debug, trace};
use crate::types::Task;

/// Starts every task and delivers whichever outcome arrives first.
///
/// Success and failure compete equally. Every task is started even after a
/// winner is known; their later outcomes are discarded. An empty input
/// succeeds with `None`.
#[cfg_attr(not(feature = "tracing-integration"), allow(unused_variables))]
pub fn race<T, H>(cx: &Cx, tasks: impl IntoIterator<Item = Task<T>>, handler: H)
where
    T: Send + 'static,
    H: FnOnce(Result<Option<T>>) + Send + 'static,
{
    let tasks: Vec<Task<T>> = tasks.into_iter().collect();
    if tasks.is_empty() {
        deliver_now(handler, Ok(None));
        return;
    }
    debug!(width = tasks.len(), "race started");
    let finish = Arc::new(Latch::new(handler));
    for (index, task) in tasks.into_iter().enumerate() {
        let finish = Arc::clone(&finish);
        cx.post(move || {
            let report = Arc::clone(&finish);
            let outcome = contain(move || {
                task(Box::new(move |result: Result<T>| {
                    if report.deliver(result.map(Some)) {
                        debug!(index, "race decided");
                    }
                }));
            });
            if let Err(err) = outcome {
                trace!(index, "racer panicked");
                finish.fail(err);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorKind};
    use crate::lab::LabRuntime;
    use crate::test_utils::{Recorder, test_lab};
    use crate::types::task;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn timed<T: Send + 'static>(
        lab: &LabRuntime,
        runs: &Arc<AtomicUsize>,
        ms: u64,
        result: Result<T>,
    ) -> Task<T> {
        let lab = lab.clone();
        let runs = Arc::clone(runs);
        task(move |done| {
            lab.post_after(Duration::from_millis(ms), move || {
                runs.fetch_add(1, Ordering::SeqCst);
                done(result);
            });
        })
    }

    #[test]
    fn fastest_task_wins_and_slower_still_runs() {
        crate::test_utils::init_test_logging();
        crate::test_phase!("fastest_task_wins_and_slower_still_runs");

        let lab = test_lab();
        let runs = Arc::new(AtomicUsize::new(0));
        let recorder = Recorder::new();
        race(
            &lab.cx(),
            vec![
                timed(&lab, &runs, 200, Ok("Task 1")),
                timed(&lab, &runs, 100, Ok("Task 2")),
            ],
            recorder.handler(),
        );
        lab.run();
        assert_eq!(recorder.single(), Ok(Some("Task 2")));
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        crate::test_complete!("fastest_task_wins_and_slower_still_runs");
    }

    #[test]
    fn early_failure_wins_over_late_success() {
        let lab = test_lab();
        let runs = Arc::new(AtomicUsize::new(0));
        let recorder = Recorder::new();
        race(
            &lab.cx(),
            vec![
                timed(&lab, &runs, 200, Ok("Task 1")),
                timed(&lab, &runs, 100, Err(Error::user("Task 2 failed"))),
            ],
            recorder.handler(),
        );
        lab.run();
        assert_eq!(recorder.single(), Err(Error::user("Task 2 failed")));
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn late_failure_is_discarded() {
        let lab = test_lab();
        let runs = Arc::new(AtomicUsize::new(0));
        let recorder = Recorder::new();
        race(
            &lab.cx(),
            vec![
                timed(&lab, &runs, 100, Ok(1)),
                timed(&lab, &runs, 200, Err(Error::user("too late"))),
            ],
            recorder.handler(),
        );
        lab.run();
        assert_eq!(recorder.single(), Ok(Some(1)));
    }

    #[test]
    fn synchronous_panic_wins() {
        let lab = test_lab();
        let runs = Arc::new(AtomicUsize::new(0));
        let recorder = Recorder::new();
        race(
            &lab.cx(),
            vec![
                timed(&lab, &runs, 200, Ok("Task 1")),
                task(|_done| panic!("racer exploded")),
            ],
            recorder.handler(),
        );
        lab.run();
        assert_eq!(recorder.single().expect_err("failed").kind(), ErrorKind::Panicked);
        assert_eq!(runs.load(Ordering::SeqCst), 1, "slow racer still ran");
    }

    #[test]
    fn empty_race_has_no_value() {
        let lab = test_lab();
        let recorder = Recorder::<Option<u8>>::new();
        race(&lab.cx(), Vec::new(), recorder.handler());
        lab.run();
        assert_eq!(recorder.single(), Ok(None));
    }
}
