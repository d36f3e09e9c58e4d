//! # Bugsnag Core
//!
//! Configuration, payload model, payload assembly and redaction for reporting
//! log events to Bugsnag. Nothing in this crate performs network I/O; see
//! `bugsnag-sender` for delivery.

pub mod builder;
pub mod config;
pub mod error;
pub mod event;
pub mod filter;
pub mod model;
pub mod provider;
pub mod reporter;

pub use builder::NotificationBuilder;
pub use config::Configuration;
pub use error::{Error, Result};
pub use event::{CallFrame, Level, LogEvent, LoggingEvent, ThrownError};
pub use filter::{filter_tree, KeyFilter, RedactionFilter};
pub use model::{Event, MetaData, Notification, Severity, Tab, User};
pub use provider::{MetaDataProvider, ProviderRegistry};
pub use reporter::{ErrorReporter, MemoryReporter, TracingReporter};
