//! Error types and error handling strategy for flowsync.
//!
//! Every task, test, per-item function and queue worker reports through the
//! same channel: a [`Result`] whose failure side is [`Error`]. Error handling
//! follows these principles:
//!
//! - An explicit failure and a panic inside application code are the same
//!   thing by the time they reach a combinator (`ErrorKind::Panicked`)
//! - A failure cause is forwarded unchanged to the final handler
//! - Programmer errors (zero attempts, zero concurrency) are rejected when
//!   the combinator or queue is constructed, never asynchronously
//!
//! # Error Categories
//!
//! - **Task**: failures reported or raised by application code
//! - **Usage**: invalid construction arguments and pipeline type mismatches
//! - **Queue**: work discarded by the bounded worker queue
//! - **Internal**: bugs in this crate

use core::fmt;
use std::sync::Arc;

use crate::types::PanicPayload;

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // === Task ===
    /// Failure reported explicitly by application code.
    User,
    /// Application code panicked while running inside a combinator.
    Panicked,

    // === Usage ===
    /// A combinator or queue was constructed with an invalid argument.
    InvalidArgument,
    /// A dynamically typed pipeline stage received the wrong value type.
    TypeMismatch,

    // === Queue ===
    /// The item was still pending when its queue was killed.
    QueueKilled,

    // === Internal ===
    /// Internal error (bug).
    Internal,
}

impl ErrorKind {
    /// Returns the error category for this kind.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::User | Self::Panicked => ErrorCategory::Task,
            Self::InvalidArgument | Self::TypeMismatch => ErrorCategory::Usage,
            Self::QueueKilled => ErrorCategory::Queue,
            Self::Internal => ErrorCategory::Internal,
        }
    }
}

/// High-level error category for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Failures originating in application code.
    Task,
    /// Misuse of the combinator API.
    Usage,
    /// Bounded worker queue failures.
    Queue,
    /// Internal errors.
    Internal,
}

/// The main error type for flowsync operations.
///
/// Cloning is cheap: the optional source is shared, so one cause can be
/// handed to every item of a cargo batch.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Creates a task failure with a message.
    #[must_use]
    pub fn user(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::User).with_message(msg)
    }

    /// Creates the failure reported when application code panics.
    #[must_use]
    pub fn panicked(payload: &PanicPayload) -> Self {
        Self::new(ErrorKind::Panicked).with_message(payload.message())
    }

    /// Creates a construction-time argument error.
    #[must_use]
    pub fn invalid_argument(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument).with_message(detail)
    }

    /// Creates a pipeline type mismatch error.
    #[must_use]
    pub fn type_mismatch(expected: &str) -> Self {
        Self::new(ErrorKind::TypeMismatch)
            .with_message(format!("stage expected a value of type {expected}"))
    }

    /// Creates the error handed to items discarded by a killed queue.
    #[must_use]
    pub fn queue_killed() -> Self {
        Self::new(ErrorKind::QueueKilled).with_message("queue killed before item was processed")
    }

    /// Creates an internal error (bug).
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal).with_message(detail)
    }

    /// Adds a message description to the error.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Prefixes the message with `context`, keeping the existing message.
    #[must_use]
    pub fn context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.message = Some(match self.message.take() {
            Some(message) => format!("{context}: {message}"),
            None => context,
        });
        self
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Returns true if this error was produced by a contained panic.
    #[must_use]
    pub const fn is_panic(&self) -> bool {
        matches!(self.kind, ErrorKind::Panicked)
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.message == other.message
    }
}

impl Eq for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<PanicPayload> for Error {
    fn from(payload: PanicPayload) -> Self {
        Self::panicked(&payload)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorKind::User)
            .with_message(e.to_string())
            .with_source(e)
    }
}

/// Extension trait for adding context to Results.
#[allow(clippy::result_large_err)]
pub trait ResultExt<T> {
    /// Prefix the error message with `msg`, keeping the original message.
    fn context(self, msg: impl Into<String>) -> Result<T>;
    /// Like [`context`](Self::context), with the message computed lazily.
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for core::result::Result<T, E> {
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().context(msg))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| e.into().context(f()))
    }
}

/// A specialized Result type for flowsync operations.
#[allow(clippy::result_large_err)]
pub type Result<T> = core::result::Result<T, Error>;
