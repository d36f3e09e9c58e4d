use bugsnag_core::{CallFrame, Level, LoggingEvent, ThrownError};
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;
use tracing::field::{Field, Visit};

/// Collects the fields of a `tracing` event.
#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    thrown: Option<ThrownError>,
    properties: BTreeMap<String, String>,
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.properties
                .insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn StdError + 'static)) {
        // First error field wins; later ones are kept as plain properties.
        if self.thrown.is_none() {
            self.thrown = Some(ThrownError::from_error(value));
        } else {
            self.properties
                .insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.properties
                .insert(field.name().to_string(), format!("{:?}", value));
        }
    }
}

/// Converts a `tracing` event into a [`LoggingEvent`]. The target is the
/// logger name; the module path, file and line form the call-site frame.
pub(crate) fn logging_event(event: &tracing::Event<'_>) -> LoggingEvent {
    let mut visitor = EventVisitor::default();
    event.record(&mut visitor);

    let metadata = event.metadata();
    let message = visitor
        .message
        .or_else(|| visitor.thrown.as_ref().and_then(|t| t.message.clone()))
        .unwrap_or_default();

    let mut frame = CallFrame::new(metadata.module_path().unwrap_or(metadata.target()), "");
    if let (Some(file), Some(line)) = (metadata.file(), metadata.line()) {
        frame = frame.at(file, line);
    }

    LoggingEvent {
        level: Level::from(*metadata.level()),
        logger_name: metadata.target().to_string(),
        message,
        properties: visitor.properties,
        thrown: visitor.thrown,
        call_frame: Some(frame),
    }
}
