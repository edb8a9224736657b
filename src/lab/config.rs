//! Configuration for the lab runtime.

/// Configuration for the lab runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabConfig {
    /// Maximum number of jobs executed by one `run` call.
    ///
    /// `None` runs until the ready queue and timer heap are both empty.
    pub max_steps: Option<u64>,
}

impl LabConfig {
    /// Creates a configuration with the default step budget.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_steps: Some(100_000),
        }
    }

    /// Sets the maximum number of steps per run.
    #[must_use]
    pub const fn max_steps(mut self, steps: u64) -> Self {
        self.max_steps = Some(steps);
        self
    }

    /// Removes the step budget.
    #[must_use]
    pub const fn unbounded(mut self) -> Self {
        self.max_steps = None;
        self
    }
}

impl Default for LabConfig {
    fn default() -> Self {
        Self::new()
    }
}
