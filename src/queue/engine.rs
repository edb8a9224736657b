//! The shared dispatch engine behind [`Queue`](super::Queue) and
//! [`Cargo`](super::Cargo).
//!
//! The engine keeps a backlog of `(item, callback)` entries and a count of
//! running worker invocations. Admission pulls up to `payload` entries per
//! invocation while fewer than `concurrency` invocations are running. A
//! worker invocation's outcome goes through a per-batch [`Latch`], so each
//! item callback fires exactly once even if the worker reports twice or
//! panics after reporting. Each item callback and hook is posted as its own
//! job, so a panicking callback cannot keep its batch siblings from being
//! called, and none of them runs while the state lock is held.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use super::QueueState;
use crate::combinator::Latch;
use crate::cx::Cx;
use crate::error::{Error, Result};
use crate::runtime::contain;
use crate::tracing_compat::{debug, trace};
use crate::types::Callback;

pub(crate) type BatchWorker<I, O> = Arc<dyn Fn(Vec<I>, Callback<O>) + Send + Sync>;
pub(crate) type Fan<O> = fn(&Cx, Result<O>, Vec<Callback<O>>);
type Hook = Arc<dyn Fn() + Send + Sync>;

struct Entry<I, O> {
    item: I,
    done: Callback<O>,
}

#[derive(Default)]
struct Hooks {
    saturated: Option<Hook>,
    empty: Option<Hook>,
    drain: Option<Hook>,
}

struct EngineState<I, O> {
    backlog: VecDeque<Entry<I, O>>,
    running: usize,
    concurrency: usize,
    paused: bool,
    killed: bool,
    hooks: Hooks,
}

pub(crate) struct Engine<I, O> {
    cx: Cx,
    worker: BatchWorker<I, O>,
    fan: Fan<O>,
    payload: usize,
    state: Mutex<EngineState<I, O>>,
}

/// Which hook an event should fire.
#[derive(Clone, Copy)]
pub(crate) enum HookKind {
    Saturated,
    Empty,
    Drain,
}

impl<I, O> Engine<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub(crate) fn new(
        cx: &Cx,
        concurrency: usize,
        payload: usize,
        worker: BatchWorker<I, O>,
        fan: Fan<O>,
    ) -> Arc<Self> {
        Arc::new(Self {
            cx: cx.clone(),
            worker,
            fan,
            payload,
            state: Mutex::new(EngineState {
                backlog: VecDeque::new(),
                running: 0,
                concurrency,
                paused: false,
                killed: false,
                hooks: Hooks::default(),
            }),
        })
    }

    pub(crate) fn push(self: &Arc<Self>, item: I, done: Callback<O>) {
        {
            let mut state = self.state.lock();
            if state.killed {
                drop(state);
                trace!("push to killed queue rejected");
                self.cx.post(move || done(Err(Error::queue_killed())));
                return;
            }
            state.backlog.push_back(Entry { item, done });
        }
        self.process();
    }

    pub(crate) fn push_many(self: &Arc<Self>, entries: Vec<(I, Callback<O>)>) {
        {
            let mut state = self.state.lock();
            if state.killed {
                drop(state);
                for (_, done) in entries {
                    self.cx.post(move || done(Err(Error::queue_killed())));
                }
                return;
            }
            state
                .backlog
                .extend(entries.into_iter().map(|(item, done)| Entry { item, done }));
        }
        self.process();
    }

    /// Admits backlog entries while capacity remains.
    #[cfg_attr(not(feature = "tracing-integration"), allow(unused_variables))]
    fn process(self: &Arc<Self>) {
        loop {
            let (batch, saturated, emptied, running) = {
                let mut state = self.state.lock();
                if state.paused
                    || state.killed
                    || state.backlog.is_empty()
                    || state.running >= state.concurrency
                {
                    return;
                }
                let take = self.payload.min(state.backlog.len());
                let batch: Vec<Entry<I, O>> = state.backlog.drain(..take).collect();
                state.running += 1;
                (
                    batch,
                    state.running == state.concurrency && !state.backlog.is_empty(),
                    state.backlog.is_empty(),
                    state.running,
                )
            };
            debug!(batch = batch.len(), running, "queue admitted work");
            if saturated {
                debug!(running, "queue saturated");
                self.fire(HookKind::Saturated);
            }
            if emptied {
                self.fire(HookKind::Empty);
            }
            self.start(batch);
        }
    }

    fn start(self: &Arc<Self>, batch: Vec<Entry<I, O>>) {
        let (items, callbacks): (Vec<I>, Vec<Callback<O>>) =
            batch.into_iter().map(|e| (e.item, e.done)).unzip();
        let engine = Arc::clone(self);
        self.cx.post(move || {
            let finisher = Arc::clone(&engine);
            let reported = Arc::new(Latch::new(move |result: Result<O>| {
                let cx = finisher.cx.clone();
                cx.post(move || finisher.finish(result, callbacks));
            }));
            let report = Arc::clone(&reported);
            let worker = Arc::clone(&engine.worker);
            if let Err(err) = contain(move || {
                worker(
                    items,
                    Box::new(move |result| {
                        report.deliver(result);
                    }),
                );
            }) {
                reported.fail(err);
            }
        });
    }

    fn finish(self: &Arc<Self>, result: Result<O>, callbacks: Vec<Callback<O>>) {
        (self.fan)(&self.cx, result, callbacks);
        let drained = {
            let mut state = self.state.lock();
            state.running = state.running.saturating_sub(1);
            state.running == 0 && state.backlog.is_empty() && !state.killed
        };
        if drained {
            debug!("queue drained");
            self.fire(HookKind::Drain);
        }
        self.process();
    }

    fn fire(&self, kind: HookKind) {
        let hook = {
            let state = self.state.lock();
            match kind {
                HookKind::Saturated => state.hooks.saturated.clone(),
                HookKind::Empty => state.hooks.empty.clone(),
                HookKind::Drain => state.hooks.drain.clone(),
            }
        };
        if let Some(hook) = hook {
            self.cx.post(move || hook());
        }
    }

    pub(crate) fn set_hook(&self, kind: HookKind, hook: Hook) {
        let mut state = self.state.lock();
        let slot = match kind {
            HookKind::Saturated => &mut state.hooks.saturated,
            HookKind::Empty => &mut state.hooks.empty,
            HookKind::Drain => &mut state.hooks.drain,
        };
        *slot = Some(hook);
    }

    pub(crate) fn length(&self) -> usize {
        self.state.lock().backlog.len()
    }

    pub(crate) fn running(&self) -> usize {
        self.state.lock().running
    }

    pub(crate) fn concurrency(&self) -> usize {
        self.state.lock().concurrency
    }

    pub(crate) fn payload(&self) -> usize {
        self.payload
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    pub(crate) fn is_killed(&self) -> bool {
        self.state.lock().killed
    }

    pub(crate) fn state(&self) -> QueueState {
        let state = self.state.lock();
        if state.backlog.is_empty() && state.running == 0 {
            QueueState::Idle
        } else if state.running >= state.concurrency && !state.backlog.is_empty() {
            QueueState::Saturated
        } else {
            QueueState::Draining
        }
    }

    pub(crate) fn pause(&self) {
        self.state.lock().paused = true;
        debug!("queue paused");
    }

    pub(crate) fn resume(self: &Arc<Self>) {
        self.state.lock().paused = false;
        debug!("queue resumed");
        self.process();
    }

    pub(crate) fn kill(&self) {
        let discarded: Vec<Entry<I, O>> = {
            let mut state = self.state.lock();
            state.killed = true;
            state.hooks = Hooks::default();
            state.backlog.drain(..).collect()
        };
        debug!(discarded = discarded.len(), "queue killed");
        for entry in discarded {
            let done = entry.done;
            self.cx.post(move || done(Err(Error::queue_killed())));
        }
    }
}

/// Posts a single-item outcome.
pub(crate) fn fan_single<O>(cx: &Cx, result: Result<O>, callbacks: Vec<Callback<O>>)
where
    O: Send + 'static,
{
    if let Some(done) = callbacks.into_iter().next() {
        cx.post(move || done(result));
    }
}

/// Posts a batch outcome to every item of the batch, one job per item.
pub(crate) fn fan_clone<O>(cx: &Cx, result: Result<O>, callbacks: Vec<Callback<O>>)
where
    O: Clone + Send + 'static,
{
    for done in callbacks {
        let result = result.clone();
        cx.post(move || done(result));
    }
}
