use crate::visitor::logging_event;
use bugsnag_core::{Configuration, ErrorReporter, NotificationBuilder};
use bugsnag_sender::Sender;
use std::cell::Cell;
use std::sync::Arc;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Crates whose events are never reported: this library's own status output
/// and the HTTP stack used for delivery. Matched on whole path segments.
const IGNORED_TARGETS: &[&str] = &[
    "bugsnag",
    "bugsnag_core",
    "bugsnag_sender",
    "bugsnag_tracing",
    "reqwest",
    "hyper",
    "hyper_util",
    "h2",
    "rustls",
    "tokio",
    "tokio_util",
    "want",
    "mio",
];

/// Most verbose level the layer reports. The delivery stack logs at debug and
/// trace level on threads the reentrancy guard does not cover.
const MAX_REPORTED_LEVEL: Level = Level::WARN;

thread_local! {
    static REPORTING: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as reporting for as long as it lives.
struct ReentrancyGuard;

impl ReentrancyGuard {
    fn enter() -> Option<Self> {
        REPORTING.with(|reporting| {
            if reporting.replace(true) {
                None
            } else {
                Some(ReentrancyGuard)
            }
        })
    }
}

impl Drop for ReentrancyGuard {
    fn drop(&mut self) {
        REPORTING.with(|reporting| reporting.set(false));
    }
}

fn is_ignored_target(target: &str) -> bool {
    IGNORED_TARGETS.iter().any(|krate| {
        target
            .strip_prefix(krate)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    })
}

/// A [`Layer`] that turns `tracing` events at or above a level into Bugsnag
/// notifications and delivers them synchronously.
pub struct BugsnagLayer {
    configuration: Arc<Configuration>,
    sender: Arc<Sender>,
    min_level: Level,
}

impl BugsnagLayer {
    /// Starts a sender for `configuration`. Configuration problems go to
    /// `reporter` and leave the layer inert.
    pub fn new(configuration: Arc<Configuration>, reporter: Arc<dyn ErrorReporter>) -> Self {
        let sender = Arc::new(Sender::new());
        sender.start(configuration.clone(), reporter);
        Self::with_sender(configuration, sender)
    }

    pub fn with_sender(configuration: Arc<Configuration>, sender: Arc<Sender>) -> Self {
        Self {
            configuration,
            sender,
            min_level: Level::ERROR,
        }
    }

    /// Lowest level that gets reported. Defaults to `ERROR`; anything more
    /// verbose than `WARN` is clamped to `WARN`.
    pub fn with_min_level(mut self, level: Level) -> Self {
        // More verbose levels compare greater in `tracing`.
        self.min_level = std::cmp::min(level, MAX_REPORTED_LEVEL);
        self
    }

    pub fn sender(&self) -> &Arc<Sender> {
        &self.sender
    }

    fn is_reported(&self, level: &Level, target: &str) -> bool {
        *level <= self.min_level && !is_ignored_target(target)
    }
}

impl<S> Layer<S> for BugsnagLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !self.is_reported(metadata.level(), metadata.target()) || self.sender.is_stopped() {
            return;
        }

        let Some(_guard) = ReentrancyGuard::enter() else {
            return;
        };

        let logging_event = logging_event(event);
        if let Some(notification) = NotificationBuilder::new(&self.configuration).build(&logging_event) {
            self.sender.send(&notification);
        }
    }
}
