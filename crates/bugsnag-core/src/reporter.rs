//! Status channel for configuration and delivery problems.
//!
//! Reporters only ever see failures. Successful deliveries are never routed
//! through them.

use std::error::Error as StdError;
use std::sync::Mutex;

/// Target used by [`TracingReporter`] so hosts can route or silence it.
pub const STATUS_TARGET: &str = "bugsnag::status";

/// Sink for human readable error messages raised by this library.
pub trait ErrorReporter: Send + Sync {
    fn add_error(&self, message: &str);

    fn add_error_with_cause(&self, message: &str, cause: &(dyn StdError + 'static));
}

/// Reports through `tracing::error!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn add_error(&self, message: &str) {
        tracing::error!(target: STATUS_TARGET, "{}", message);
    }

    fn add_error_with_cause(&self, message: &str, cause: &(dyn StdError + 'static)) {
        tracing::error!(target: STATUS_TARGET, error = %cause, "{}", message);
    }
}

/// A single message captured by [`MemoryReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedError {
    pub message: String,
    pub cause: Option<String>,
}

/// Keeps every reported error in memory, mostly useful for tests and for
/// hosts that surface status on their own terms.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    errors: Mutex<Vec<ReportedError>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<ReportedError> {
        self.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().map(|e| e.message.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ReportedError>> {
        self.errors
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ErrorReporter for MemoryReporter {
    fn add_error(&self, message: &str) {
        self.lock().push(ReportedError {
            message: message.to_string(),
            cause: None,
        });
    }

    fn add_error_with_cause(&self, message: &str, cause: &(dyn StdError + 'static)) {
        self.lock().push(ReportedError {
            message: message.to_string(),
            cause: Some(cause.to_string()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_reporter_keeps_messages_in_order() {
        let reporter = MemoryReporter::new();
        reporter.add_error("first");
        let cause = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        reporter.add_error_with_cause("second", &cause);

        assert_eq!(reporter.messages(), vec!["first", "second"]);
        let errors = reporter.errors();
        assert_eq!(errors[0].cause, None);
        assert_eq!(errors[1].cause.as_deref(), Some("boom"));
    }

    #[test]
    fn test_memory_reporter_clear() {
        let reporter = MemoryReporter::new();
        reporter.add_error("something");
        assert!(!reporter.is_empty());

        reporter.clear();
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_tracing_reporter_does_not_panic() {
        let reporter = TracingReporter;
        reporter.add_error("configuration broken");
        let cause = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        reporter.add_error_with_cause("delivery broken", &cause);
    }
}
