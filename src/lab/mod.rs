//! Deterministic lab runtime for testing.
//!
//! The lab runtime provides:
//!
//! - A FIFO ready queue drained on the calling thread
//! - Virtual time: delayed jobs fire in deadline order without sleeping
//! - A step budget so runaway loops (`forever`, unbounded `whilst`) stop
//!
//! # Quick Start
//!
//! ```
//! use flowsync::lab::{LabConfig, LabRuntime};
//! use std::time::Duration;
//!
//! let lab = LabRuntime::new(LabConfig::default());
//! let timer = lab.clone();
//! lab.cx().post(move || timer.post_after(Duration::from_millis(30), || {}));
//! let report = lab.run();
//! assert_eq!(report.now, Duration::from_millis(30));
//! assert_eq!(report.steps, 2);
//! ```

pub mod config;
pub mod runtime;

pub use config::LabConfig;
pub use runtime::{LabRuntime, RunReport};
