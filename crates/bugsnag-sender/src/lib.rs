//! # Bugsnag Sender
//!
//! Posts notifications built by `bugsnag-core` to the Bugsnag notify
//! endpoint. Delivery problems are handed to an
//! [`ErrorReporter`](bugsnag_core::ErrorReporter) and never surface as
//! errors or panics to the caller.

pub mod error;
pub mod payload;
pub mod sender;

pub use error::{DeliveryError, Result};
pub use sender::{Delivery, Sender, CLIENT_BUILD_FAILED, DELIVERY_FAILED};
