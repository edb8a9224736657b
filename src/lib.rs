//! Flowsync: callback-driven control-flow combinators with exactly-once
//! completion accounting.
//!
//! # Overview
//!
//! Flowsync coordinates work expressed as callbacks: a task is handed a
//! completion callback and reports success or failure through it, possibly
//! on a later tick. Combinators run collections of such tasks under a fixed
//! policy (all in parallel, one after another, first to finish, retry until
//! success) and deliver a single aggregated outcome to a final handler.
//!
//! # Core Guarantees
//!
//! - **Exactly once**: every final handler runs exactly once, whatever
//!   mixture of success, failure, late duplicates and panics the tasks produce
//! - **Fail fast**: the first failure is forwarded unchanged; later outcomes
//!   are discarded
//! - **Order preserving**: collection results are in input order, not
//!   completion order
//! - **Panics are failures**: a panic inside application code is contained
//!   and reported as `ErrorKind::Panicked`
//! - **Flat stacks**: iteration is posted step by step, so a synchronous task
//!   looping ten thousand times does not grow the call stack
//!
//! # Module Structure
//!
//! - [`types`]: Callback, task, pair and panic payload shapes
//! - [`error`](mod@error): Error types
//! - [`cx`]: Capability context every combinator schedules through
//! - [`runtime`]: Scheduler port, panic containment and the [`EventLoop`]
//! - [`lab`]: Deterministic lab runtime for testing
//! - [`combinator`]: Collection and flow combinators
//! - [`queue`]: Bounded worker [`Queue`] and batching [`Cargo`]
//! - [`config`]: Queue and retry settings
//! - [`tracing_compat`]: Optional tracing integration (requires `tracing-integration` feature)
//!
//! # Example
//!
//! ```
//! use flowsync::combinator::map;
//! use flowsync::test_utils::{test_lab, Recorder};
//!
//! let lab = test_lab();
//! let recorder = Recorder::new();
//! map(&lab.cx(), vec![1, 2, 3], |n: i32, done| done(Ok(n * n)), recorder.handler());
//! lab.run();
//! assert_eq!(recorder.single(), Ok(vec![1, 4, 9]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_inception)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::needless_pass_by_value)]

pub mod combinator;
pub mod config;
pub mod cx;
pub mod error;
pub mod lab;
pub mod queue;
pub mod runtime;
pub mod tracing_compat;
pub mod types;

#[cfg(any(test, feature = "test-internals"))]
pub mod test_utils;

pub use config::{FlowConfig, QueueConfig, RetryConfig};
pub use cx::Cx;
pub use error::{Error, ErrorCategory, ErrorKind, Result, ResultExt};
pub use lab::{LabConfig, LabRuntime};
pub use queue::{Cargo, Queue, QueueState};
pub use runtime::{EventLoop, Job, Scheduler};
pub use types::{Callback, Pair, PanicPayload, Stage, Task, Value};
