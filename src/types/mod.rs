//! Core types shared by every combinator.
//!
//! - [`outcome`]: Panic payloads captured from contained application code
//! - [`pair`]: Key/value pairs carried through map-shaped collections
//! - [`task`]: Callback, task and dynamically typed value shapes

pub mod outcome;
pub mod pair;
pub mod task;

pub use outcome::PanicPayload;
pub use pair::Pair;
pub use task::{Callback, Stage, Task, Value, callback, stage, task};
pub(crate) use task::{downcast, erase};
