//! The accessor contract for log events consumed by the payload builder.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

/// Longest `source()` chain followed when converting a Rust error.
const MAX_CAUSE_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// One frame of a thrown error's trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFrame {
    /// Fully qualified owner of the frame, a module path for Rust code.
    pub class_name: String,
    pub method: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl CallFrame {
    pub fn new(class_name: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method: method.into(),
            file: None,
            line: None,
        }
    }

    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }
}

/// A thrown error and its causes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrownError {
    pub class_name: String,
    pub message: Option<String>,
    pub frames: Vec<CallFrame>,
    pub cause: Option<Box<ThrownError>>,
}

impl ThrownError {
    pub fn new(class_name: impl Into<String>, message: Option<String>) -> Self {
        Self {
            class_name: class_name.into(),
            message,
            frames: Vec::new(),
            cause: None,
        }
    }

    pub fn with_frame(mut self, frame: CallFrame) -> Self {
        self.frames.push(frame);
        self
    }

    pub fn with_cause(mut self, cause: ThrownError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Walks the error and its causes, outermost first.
    pub fn chain(&self) -> Chain<'_> {
        Chain {
            next: Some(self),
        }
    }

    /// Builds a chain from a Rust error and its `source()`s.
    ///
    /// Rust errors carry no runtime type name, so the class is taken from the
    /// leading identifier of the `Debug` representation.
    pub fn from_error(error: &(dyn StdError + 'static)) -> Self {
        let mut links = Vec::new();
        let mut current = Some(error);
        while let Some(err) = current {
            if links.len() == MAX_CAUSE_DEPTH {
                break;
            }
            let debug = format!("{:?}", err);
            links.push(ThrownError::new(
                error_class_from_debug(&debug),
                Some(err.to_string()),
            ));
            current = err.source();
        }

        let mut chain: Option<ThrownError> = None;
        for mut link in links.into_iter().rev() {
            link.cause = chain.map(Box::new);
            chain = Some(link);
        }
        chain.unwrap_or_else(|| ThrownError::new("Error", None))
    }
}

pub struct Chain<'a> {
    next: Option<&'a ThrownError>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a ThrownError;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.cause.as_deref();
        Some(current)
    }
}

/// Leading type or variant name of a `Debug` rendering, e.g. `NotFound` for
/// `NotFound { path: "x" }`.
pub fn error_class_from_debug(debug: &str) -> &str {
    let name = debug
        .split(&[' ', '(', '{', '\r', '\n'][..])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() {
        "Error"
    } else {
        name
    }
}

/// What the payload builder needs from the host logging framework.
pub trait LogEvent {
    fn level(&self) -> Level;

    fn logger_name(&self) -> &str;

    /// The rendered message.
    fn message(&self) -> &str;

    /// Contextual key/value properties attached to the event.
    fn properties(&self) -> &BTreeMap<String, String>;

    fn thrown(&self) -> Option<&ThrownError>;

    /// Where the event was emitted, when the framework knows it.
    fn call_frame(&self) -> Option<&CallFrame> {
        None
    }
}

/// Owned [`LogEvent`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingEvent {
    pub level: Level,
    pub logger_name: String,
    pub message: String,
    pub properties: BTreeMap<String, String>,
    pub thrown: Option<ThrownError>,
    pub call_frame: Option<CallFrame>,
}

impl LoggingEvent {
    pub fn new(level: Level, logger_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            logger_name: logger_name.into(),
            message: message.into(),
            properties: BTreeMap::new(),
            thrown: None,
            call_frame: None,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_thrown(mut self, thrown: ThrownError) -> Self {
        self.thrown = Some(thrown);
        self
    }

    pub fn with_call_frame(mut self, frame: CallFrame) -> Self {
        self.call_frame = Some(frame);
        self
    }
}

impl LogEvent for LoggingEvent {
    fn level(&self) -> Level {
        self.level
    }

    fn logger_name(&self) -> &str {
        &self.logger_name
    }

    fn message(&self) -> &str {
        &self.message
    }

    fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    fn thrown(&self) -> Option<&ThrownError> {
        self.thrown.as_ref()
    }

    fn call_frame(&self) -> Option<&CallFrame> {
        self.call_frame.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Outer {
        inner: Inner,
    }

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("outer failed")
        }
    }

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("inner failed")
        }
    }

    impl StdError for Outer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.inner)
        }
    }

    impl StdError for Inner {}

    #[test]
    fn test_error_class_from_debug() {
        assert_eq!(error_class_from_debug("NotFound { path: \"x\" }"), "NotFound");
        assert_eq!(error_class_from_debug("Timeout(30)"), "Timeout");
        assert_eq!(error_class_from_debug("Inner"), "Inner");
        assert_eq!(error_class_from_debug(""), "Error");
    }

    #[test]
    fn test_from_error_walks_sources_outermost_first() {
        let error = Outer { inner: Inner };
        let thrown = ThrownError::from_error(&error);

        let chain: Vec<_> = thrown.chain().collect();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].class_name, "Outer");
        assert_eq!(chain[0].message.as_deref(), Some("outer failed"));
        assert_eq!(chain[1].class_name, "Inner");
        assert_eq!(chain[1].message.as_deref(), Some("inner failed"));
    }

    #[test]
    fn test_chain_of_manual_thrown_error() {
        let thrown = ThrownError::new("app::Outer", Some("top".to_string()))
            .with_frame(CallFrame::new("app::service", "run").at("src/service.rs", 10))
            .with_cause(ThrownError::new("app::Root", None));

        let names: Vec<_> = thrown.chain().map(|t| t.class_name.as_str()).collect();
        assert_eq!(names, vec!["app::Outer", "app::Root"]);
        assert_eq!(thrown.frames[0].line, Some(10));
    }

    #[test]
    fn test_logging_event_accessors() {
        let event = LoggingEvent::new(Level::Error, "app::db", "query failed")
            .with_property("request_id", "abc")
            .with_call_frame(CallFrame::new("app::db", "query"));

        assert_eq!(event.level(), Level::Error);
        assert_eq!(event.logger_name(), "app::db");
        assert_eq!(event.message(), "query failed");
        assert_eq!(event.properties().get("request_id").map(String::as_str), Some("abc"));
        assert!(event.thrown().is_none());
        assert_eq!(event.call_frame().map(|f| f.method.as_str()), Some("query"));
    }

    #[test]
    fn test_level_conversion_and_display() {
        assert_eq!(Level::from(tracing::Level::WARN), Level::Warn);
        assert_eq!(Level::Error.to_string(), "ERROR");
        assert!(Level::Error > Level::Warn);
    }
}
