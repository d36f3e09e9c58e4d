//! # Bugsnag Tracing
//!
//! A `tracing-subscriber` layer that reports error events to Bugsnag.
//!
//! ```no_run
//! use bugsnag_core::{Configuration, TracingReporter};
//! use bugsnag_tracing::BugsnagLayer;
//! use std::sync::Arc;
//! use tracing_subscriber::prelude::*;
//!
//! let configuration = Configuration::load(None).unwrap_or_default();
//! tracing_subscriber::registry()
//!     .with(tracing_subscriber::fmt::layer())
//!     .with(BugsnagLayer::new(Arc::new(configuration), Arc::new(TracingReporter)))
//!     .init();
//!
//! tracing::error!(order_id = 42, "order could not be placed");
//! ```

pub mod layer;
mod visitor;

pub use layer::BugsnagLayer;
