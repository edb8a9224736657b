//! Panic payloads captured from application code.
//!
//! A task body that panics is treated exactly like a task that reported a
//! failure. The payload is flattened to a message so it can cross thread
//! and callback boundaries.

use core::fmt;
use std::any::Any;

/// Payload from a caught panic.
///
/// This wraps the panic value for safe transport across callback boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicPayload {
    message: String,
}

impl PanicPayload {
    /// Creates a new panic payload with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Extracts a payload from the value returned by `catch_unwind`.
    #[must_use]
    pub fn from_any(payload: &(dyn Any + Send)) -> Self {
        let message = payload.downcast_ref::<&str>().map_or_else(
            || {
                payload
                    .downcast_ref::<String>()
                    .cloned()
                    .unwrap_or_else(|| "non-string panic payload".to_string())
            },
            |s| (*s).to_string(),
        );
        Self { message }
    }

    /// Returns the panic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for PanicPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panic: {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn str_payload() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(PanicPayload::from_any(boxed.as_ref()).message(), "boom");
    }

    #[test]
    fn string_payload() {
        let boxed: Box<dyn Any + Send> = Box::new(String::from("index 4 out of range"));
        assert_eq!(
            PanicPayload::from_any(boxed.as_ref()).message(),
            "index 4 out of range"
        );
    }

    #[test]
    fn opaque_payload() {
        let boxed: Box<dyn Any + Send> = Box::new(17_u32);
        assert_eq!(
            PanicPayload::from_any(boxed.as_ref()).message(),
            "non-string panic payload"
        );
    }

    #[test]
    fn display() {
        assert_eq!(PanicPayload::new("x").to_string(), "panic: x");
    }
}
