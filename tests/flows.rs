//! Flow combinators: sequencing, racing, retrying and looping.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use flowsync::combinator::{
    Seq, Waterfall, do_during, during, forever, map, parallel, race, retry, series, times, until,
    waterfall, whilst,
};
use flowsync::test_utils::{FakeTask, Recorder, delayed, init_test_logging, test_lab};
use flowsync::types::{Callback, stage, task};
use flowsync::{
    Error, ErrorKind, EventLoop, LabConfig, LabRuntime, RetryConfig, test_complete, test_phase,
    test_section,
};

#[test]
fn series_runs_in_order_and_stops_on_failure() {
    init_test_logging();
    test_phase!("series_runs_in_order_and_stops_on_failure");

    let lab = test_lab();
    let ok = Recorder::new();
    series(
        &lab.cx(),
        vec![
            delayed(&lab, Duration::from_millis(30), Ok("a")),
            delayed(&lab, Duration::from_millis(10), Ok("b")),
        ],
        ok.handler(),
    );
    let report = lab.run();
    assert_eq!(ok.single(), Ok(vec!["a", "b"]));
    assert_eq!(report.now, Duration::from_millis(40));

    test_section!("failure stops the series");
    let never = FakeTask::succeeding(3);
    let failed = Recorder::new();
    series(
        &lab.cx(),
        vec![
            FakeTask::succeeding(1).task(),
            FakeTask::failing(2, Error::user("second")).task(),
            never.task(),
        ],
        failed.handler(),
    );
    lab.run();
    assert_eq!(failed.single(), Err(Error::user("second")));
    assert_eq!(never.runs(), 0);

    test_complete!("series_runs_in_order_and_stops_on_failure");
}

#[test]
fn parallel_overlaps_and_keeps_order() {
    let lab = test_lab();
    let recorder = Recorder::new();
    parallel(
        &lab.cx(),
        vec![
            delayed(&lab, Duration::from_millis(30), Ok(1)),
            delayed(&lab, Duration::from_millis(10), Ok(2)),
            delayed(&lab, Duration::from_millis(20), Ok(3)),
        ],
        recorder.handler(),
    );
    let report = lab.run();
    assert_eq!(recorder.single(), Ok(vec![1, 2, 3]));
    assert_eq!(report.now, Duration::from_millis(30));
}

#[test]
fn race_takes_the_fastest() {
    let lab = test_lab();
    let recorder = Recorder::new();
    race(
        &lab.cx(),
        vec![
            delayed(&lab, Duration::from_millis(200), Ok("Task 1")),
            delayed(&lab, Duration::from_millis(100), Ok("Task 2")),
        ],
        recorder.handler(),
    );
    lab.run();
    assert_eq!(recorder.single(), Ok(Some("Task 2")));
}

#[test]
fn waterfall_threads_values() {
    let lab = test_lab();
    let erased = Recorder::new();
    waterfall(
        &lab.cx(),
        vec![
            stage(|(): (), done: Callback<i32>| done(Ok(3))),
            stage(|n: i32, done: Callback<String>| done(Ok(format!("n={n}")))),
        ],
        erased.handler(),
    );
    let typed = Recorder::new();
    Waterfall::new()
        .then(|(), done: Callback<u32>| done(Ok(7)))
        .then(|n: u32, done: Callback<u32>| done(Ok(n * 6)))
        .run(&lab.cx(), typed.handler());
    lab.run();

    let value = erased.single().expect("waterfall succeeded");
    assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("n=3"));
    assert_eq!(typed.single(), Ok(42));
}

#[test]
fn waterfall_rejects_mismatched_stage() {
    let lab = test_lab();
    let recorder = Recorder::new();
    waterfall(
        &lab.cx(),
        vec![
            stage(|(): (), done: Callback<i32>| done(Ok(3))),
            stage(|s: String, done: Callback<String>| done(Ok(s))),
        ],
        recorder.handler(),
    );
    lab.run();
    let err = recorder.single().expect_err("type mismatch");
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
}

#[test]
fn seq_composes_and_is_reusable() {
    let lab = test_lab();
    let f = Seq::<i32, i32>::new()
        .then(|n: i32, done| done(Ok(n + 1)))
        .then(|n: i32, done| done(Ok(n * 4)));
    let first = Recorder::new();
    let second = Recorder::new();
    f.call(&lab.cx(), 3, first.handler());
    f.call(&lab.cx(), 0, second.handler());
    lab.run();
    assert_eq!(first.single(), Ok(16));
    assert_eq!(second.single(), Ok(4));
}

#[test]
fn times_collects_index_strings() {
    let lab = test_lab();
    let recorder = Recorder::new();
    times(&lab.cx(), 3, |i, done| done(Ok(i.to_string())), recorder.handler());
    lab.run();
    assert_eq!(
        recorder.single(),
        Ok(vec!["0".to_string(), "1".to_string(), "2".to_string()])
    );
}

#[test]
fn retry_succeeds_on_a_later_attempt() {
    let lab = test_lab();
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let recorder = Recorder::new();
    retry(
        &lab.cx(),
        RetryConfig::new(5).expect("positive attempts"),
        move |done: Callback<&str>| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                done(Err(Error::user("not yet")));
            } else {
                done(Ok("done"));
            }
        },
        recorder.handler(),
    )
    .expect("valid config");
    lab.run();
    assert_eq!(recorder.single(), Ok("done"));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[test]
fn retry_exhaustion_reports_last_failure() {
    let lab = test_lab();
    let fake = FakeTask::failing(0u8, Error::user("always"));
    let invoke = fake.clone();
    let recorder = Recorder::new();
    retry(
        &lab.cx(),
        RetryConfig::default(),
        move |done| invoke.invoke(done),
        recorder.handler(),
    )
    .expect("valid config");
    lab.run();
    assert_eq!(recorder.single(), Err(Error::user("always")));
    assert_eq!(fake.runs(), 3);
}

#[test]
fn forever_ends_on_first_failure() {
    let lab = test_lab();
    let fake = FakeTask::succeed_then_fail(4, (), Error::user("enough"));
    let invoke = fake.clone();
    let seen = Arc::new(parking_lot::Mutex::new(None));
    let slot = Arc::clone(&seen);
    forever(&lab.cx(), move |done| invoke.invoke(done), move |err| {
        *slot.lock() = Some(err);
    });
    lab.run();
    assert_eq!(*seen.lock(), Some(Error::user("enough")));
    assert_eq!(fake.runs(), 5);
}

#[test]
fn whilst_tests_before_each_body() {
    let lab = test_lab();
    let tests = Arc::new(AtomicUsize::new(0));
    let bodies = Arc::new(AtomicUsize::new(0));
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
}

#[test]
fn until_runs_body_first() {
    let lab = test_lab();
    let counter = Arc::new(AtomicUsize::new(0));
    let tests = Arc::new(AtomicUsize::new(0));
    let (c, read, t) = (Arc::clone(&counter), Arc::clone(&counter), Arc::clone(&tests));
    let recorder = Recorder::new();
    until(
        &lab.cx(),
        move || {
            t.fetch_add(1, Ordering::SeqCst);
            read.load(Ordering::SeqCst) >= 100
        },
        move |done| {
            c.fetch_add(1, Ordering::SeqCst);
            done(Ok(()));
        },
        recorder.handler(),
    );
    lab.run();
    assert_eq!(recorder.single(), Ok(()));
    assert_eq!(counter.load(Ordering::SeqCst), 100);
    assert_eq!(tests.load(Ordering::SeqCst), 100);
}

#[test]
fn until_body_failure_skips_test() {
    let lab = test_lab();
    let tests = Arc::new(AtomicUsize::new(0));
    let t = Arc::clone(&tests);
    let recorder = Recorder::new();
    until(
        &lab.cx(),
        move || {
            t.fetch_add(1, Ordering::SeqCst);
            false
        },
        |done| done(Err(Error::user("body failed"))),
        recorder.handler(),
    );
    lab.run();
    assert_eq!(recorder.single(), Err(Error::user("body failed")));
    assert_eq!(tests.load(Ordering::SeqCst), 0);
}

/// Asynchronous test reporting `count < limit` after one millisecond.
fn async_below(
    lab: &LabRuntime,
    count: &Arc<AtomicUsize>,
    limit: usize,
) -> impl Fn(Callback<bool>) + Send + Sync + 'static {
    let lab = lab.clone();
    let count = Arc::clone(count);
    move |done| {
        let count = Arc::clone(&count);
        lab.post_after(Duration::from_millis(1), move || {
            done(Ok(count.load(Ordering::SeqCst) < limit));
        });
    }
}

#[test]
fn during_and_do_during_use_async_tests() {
    let lab = test_lab();
    let during_count = Arc::new(AtomicUsize::new(0));
    let body_count = Arc::clone(&during_count);
    let during_done = Recorder::new();
    during(
        &lab.cx(),
        async_below(&lab, &during_count, 5),
        move |done| {
            body_count.fetch_add(1, Ordering::SeqCst);
            done(Ok(()));
        },
        during_done.handler(),
    );

    let do_count = Arc::new(AtomicUsize::new(0));
    let do_body = Arc::clone(&do_count);
    let do_done = Recorder::new();
    do_during(
        &lab.cx(),
        async_below(&lab, &do_count, 0),
        move |done| {
            do_body.fetch_add(1, Ordering::SeqCst);
            done(Ok(()));
        },
        do_done.handler(),
    );
    lab.run();

    assert_eq!(during_done.single(), Ok(()));
    assert_eq!(during_count.load(Ordering::SeqCst), 5);
    assert_eq!(do_done.single(), Ok(()));
    assert_eq!(do_count.load(Ordering::SeqCst), 1, "body runs before the first test");
}

#[test]
fn synchronous_loop_does_not_grow_the_stack() {
    init_test_logging();
    test_phase!("synchronous_loop_does_not_grow_the_stack");

    let lab = LabRuntime::new(LabConfig::default().max_steps(1_000_000));
    let remaining = Arc::new(AtomicUsize::new(50_000));
    let (test_side, body_side) = (Arc::clone(&remaining), Arc::clone(&remaining));
    let recorder = Recorder::new();
    whilst(
        &lab.cx(),
        move || test_side.load(Ordering::SeqCst) > 0,
        move |done| {
            body_side.fetch_sub(1, Ordering::SeqCst);
            done(Ok(()));
        },
        recorder.handler(),
    );
    let report = lab.run();
    assert!(!report.exhausted);
    assert_eq!(recorder.single(), Ok(()));
    assert_eq!(remaining.load(Ordering::SeqCst), 0);

    test_complete!("synchronous_loop_does_not_grow_the_stack");
}

#[test]
fn event_loop_delivers_on_its_own_thread() {
    let event_loop = EventLoop::new().expect("spawn event loop");
    let handle = event_loop.handle();
    let (tx, rx) = mpsc::channel();
    map(
        &event_loop.cx(),
        vec![30u64, 10, 20],
        move |ms, done: Callback<u64>| {
            handle.post_after(Duration::from_millis(ms), move || done(Ok(ms)));
        },
        move |result| tx.send(result).expect("receiver alive"),
    );
    let result = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("map finished");
    assert_eq!(result, Ok(vec![30, 10, 20]));
    event_loop.shutdown();
}

#[test]
fn race_starts_every_task() {
    let lab = test_lab();
    let slow = FakeTask::succeeding("slow");
    let timer = lab.clone();
    let late = slow.clone();
    let recorder = Recorder::new();
    race(
        &lab.cx(),
        vec![
            task(move |done| {
                timer.post_after(Duration::from_millis(50), move || late.invoke(done));
            }),
            FakeTask::succeeding("fast").task(),
        ],
        recorder.handler(),
    );
    lab.run();
    assert_eq!(recorder.single(), Ok(Some("fast")));
    assert_eq!(slow.runs(), 1);
}
