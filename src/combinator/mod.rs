//! Control-flow combinators over callback-driven tasks.
//!
//! Collection combinators apply one function per element:
//!
//! - [`each`], [`map`], [`filter`], [`reject`], [`concat`]: parallel fan-out
//! - [`detect`], [`some`], [`every`]: parallel, finish on the deciding verdict
//! - [`sort`]: in-memory ordering on a later tick
//! - [`transform`], [`reduce`]: series counterparts
//!
//! Flow combinators sequence tasks under a fixed policy:
//!
//! - [`series`], [`parallel`], [`race`]
//! - [`waterfall`] and the typed [`Waterfall`] builder
//! - [`retry`], [`forever`], [`times`]
//! - [`whilst`], [`until`], [`during`], [`do_during`]
//! - [`Seq`]: a reusable composed function
//!
//! Every combinator takes the [`Cx`](crate::cx::Cx) it schedules on and a
//! final handler that runs exactly once. An empty input completes before the
//! call returns; any other work starts on a later tick.

pub mod concat;
pub mod detect;
pub mod each;
mod fanout;
pub mod filter;
pub mod forever;
pub(crate) mod machine;
pub mod map;
pub mod parallel;
pub mod race;
pub mod retry;
pub mod seq;
pub mod series;
pub mod sort;
pub mod times;
pub mod tracker;
pub mod transform;
pub mod waterfall;
pub mod whilst;

pub use concat::concat;
pub use detect::{detect, every, some};
pub use each::{each, each_pair};
pub use filter::{filter, filter_pairs, reject};
pub use forever::forever;
pub use map::{map, map_pairs};
pub use parallel::parallel;
pub use race::race;
pub use retry::retry;
pub use seq::Seq;
pub use series::series;
pub use sort::{sort, sort_by, sort_by_key};
pub use times::times;
pub use tracker::{CompletionTracker, Latch};
pub use transform::{reduce, transform, transform_pairs};
pub use waterfall::{Waterfall, waterfall};
pub use whilst::{do_during, during, until, whilst};
