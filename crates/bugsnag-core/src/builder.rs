use crate::config::Configuration;
use crate::event::{CallFrame, LogEvent, ThrownError};
use crate::model::{
    App, Event, Exception, MetaData, Notification, Severity, StackFrame, PAYLOAD_VERSION,
};
use serde_json::{Map, Value};
use tracing::debug;

pub const LOGGING_TAB: &str = "Logging";

/// Turns log events into notifications according to a [`Configuration`].
pub struct NotificationBuilder<'a> {
    configuration: &'a Configuration,
}

impl<'a> NotificationBuilder<'a> {
    pub fn new(configuration: &'a Configuration) -> Self {
        Self { configuration }
    }

    /// Returns `None` when the event must not be reported: the release stage
    /// is not notified for or the outermost error class is ignored.
    pub fn build(&self, event: &dyn LogEvent) -> Option<Notification> {
        if self.configuration.is_stage_ignored() {
            debug!(
                release_stage = ?self.configuration.release_stage,
                "Release stage is not notified for, skipping event"
            );
            return None;
        }

        let exceptions = self.exceptions(event);
        if let Some(outermost) = exceptions.first() {
            if !self.configuration.should_notify_for(&outermost.error_class) {
                debug!(error_class = %outermost.error_class, "Error class is ignored, skipping event");
                return None;
            }
        }

        let mut meta_data = Self::logging_tab(event);
        let mut user = None;
        let mut context = None;
        let mut grouping_hash = None;

        if let Some(provider) = self.configuration.meta_data_provider() {
            meta_data.merge(provider.provide(event));
            user = provider.provide_user(event);
            context = provider.provide_context(event);
            grouping_hash = provider.provide_grouping_hash(event);
        }

        let reported = Event {
            payload_version: PAYLOAD_VERSION.to_string(),
            exceptions,
            context: context.or_else(|| Some(event.logger_name().to_string())),
            grouping_hash,
            severity: Severity::from(event.level()),
            user,
            app: Some(App {
                version: self.configuration.app_version.clone(),
                release_stage: self.configuration.release_stage.clone(),
            }),
            meta_data,
        };

        Some(Notification::new(
            self.configuration.api_key.clone().unwrap_or_default(),
            reported,
        ))
    }

    fn exceptions(&self, event: &dyn LogEvent) -> Vec<Exception> {
        let mut exceptions: Vec<Exception> = match event.thrown() {
            Some(thrown) => thrown.chain().map(|t| self.exception(t)).collect(),
            None => vec![Exception {
                error_class: event.logger_name().to_string(),
                message: Some(event.message().to_string()),
                stacktrace: Vec::new(),
            }],
        };

        // The call site stands in for the trace of the outermost error.
        if let (Some(frame), Some(outermost)) = (event.call_frame(), exceptions.first_mut()) {
            if outermost.stacktrace.is_empty() {
                outermost.stacktrace.push(self.stack_frame(frame));
            }
        }

        exceptions
    }

    fn exception(&self, thrown: &ThrownError) -> Exception {
        Exception {
            error_class: thrown.class_name.clone(),
            message: thrown.message.clone(),
            stacktrace: thrown
                .frames
                .iter()
                .map(|frame| self.stack_frame(frame))
                .collect(),
        }
    }

    fn stack_frame(&self, frame: &CallFrame) -> StackFrame {
        StackFrame {
            file: frame.file.clone(),
            line_number: frame.line,
            method: qualified_method(frame),
            in_project: self.configuration.is_in_project(&frame.class_name),
        }
    }

    fn logging_tab(event: &dyn LogEvent) -> MetaData {
        let mut meta_data = MetaData::new();
        meta_data.add_to_tab(LOGGING_TAB, "level", event.level().as_str());
        meta_data.add_to_tab(LOGGING_TAB, "message", event.message());
        meta_data.add_to_tab(LOGGING_TAB, "logger", event.logger_name());

        let properties = event.properties();
        if !properties.is_empty() {
            let properties: Map<String, Value> = properties
                .iter()
                .map(|(key, value)| (key.clone(), Value::String(value.clone())))
                .collect();
            meta_data.add_to_tab(LOGGING_TAB, "properties", properties);
        }

        meta_data
    }
}

fn qualified_method(frame: &CallFrame) -> String {
    if frame.method.is_empty() {
        frame.class_name.clone()
    } else if frame.class_name.contains("::") {
        format!("{}::{}", frame.class_name, frame.method)
    } else {
        format!("{}.{}", frame.class_name, frame.method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Level, LoggingEvent};
    use crate::model::User;
    use crate::provider::MetaDataProvider;
    use serde_json::json;

    struct CustomMetaDataProvider;

    impl MetaDataProvider for CustomMetaDataProvider {
        fn provide(&self, event: &dyn LogEvent) -> MetaData {
            let mut meta_data = MetaData::new();
            meta_data.add_to_tab(
                "User",
                "password",
                event.properties().get("password").cloned().unwrap_or_default(),
            );
            meta_data
        }

        fn provide_user(&self, event: &dyn LogEvent) -> Option<User> {
            event
                .properties()
                .get("user_id")
                .map(|id| User::with_id(id.as_str()))
        }

        fn provide_grouping_hash(&self, _event: &dyn LogEvent) -> Option<String> {
            Some("fixed-group".to_string())
        }
    }

    fn configuration() -> Configuration {
        let mut config = Configuration::default();
        config.api_key = Some("someKey".to_string());
        config.project_packages = ["app::".to_string()].into_iter().collect();
        config
    }

    fn failing_event() -> LoggingEvent {
        LoggingEvent::new(Level::Error, "app::db", "query failed")
            .with_property("request_id", "r-1")
            .with_call_frame(CallFrame::new("app::db", "").at("src/db.rs", 42))
            .with_thrown(
                ThrownError::new("QueryFailed", Some("query failed".to_string())).with_cause(
                    ThrownError::new("ConnectionReset", None)
                        .with_frame(CallFrame::new("tokio::net", "read").at("tcp.rs", 7)),
                ),
            )
    }

    #[test]
    fn test_builds_notification_from_event() {
        let config = configuration();
        let notification = NotificationBuilder::new(&config)
            .build(&failing_event())
            .unwrap();

        assert_eq!(notification.api_key, "someKey");
        assert_eq!(notification.events.len(), 1);
        let event = &notification.events[0];
        assert_eq!(event.severity, Severity::Error);
        assert_eq!(event.context.as_deref(), Some("app::db"));
        assert_eq!(
            event.app.as_ref().unwrap().release_stage.as_deref(),
            Some("production")
        );

        let classes: Vec<_> = event.exceptions.iter().map(|e| e.error_class.as_str()).collect();
        assert_eq!(classes, vec!["QueryFailed", "ConnectionReset"]);

        let top_frame = &event.exceptions[0].stacktrace[0];
        assert_eq!(top_frame.method, "app::db");
        assert_eq!(top_frame.line_number, Some(42));
        assert!(top_frame.in_project);

        let cause_frame = &event.exceptions[1].stacktrace[0];
        assert_eq!(cause_frame.method, "tokio::net::read");
        assert!(!cause_frame.in_project);

        let logging = event.meta_data.tab(LOGGING_TAB).unwrap();
        assert_eq!(logging.get("level"), Some(&json!("ERROR")));
        assert_eq!(logging.get("message"), Some(&json!("query failed")));
        assert_eq!(logging.get("properties"), Some(&json!({"request_id": "r-1"})));
    }

    #[test]
    fn test_synthesizes_exception_without_thrown_error() {
        let config = configuration();
        let event = LoggingEvent::new(Level::Warn, "app::jobs", "job retried")
            .with_call_frame(CallFrame::new("app::jobs", "").at("src/jobs.rs", 3));

        let notification = NotificationBuilder::new(&config).build(&event).unwrap();

        let event = &notification.events[0];
        assert_eq!(event.severity, Severity::Warning);
        assert_eq!(event.exceptions.len(), 1);
        assert_eq!(event.exceptions[0].error_class, "app::jobs");
        assert_eq!(event.exceptions[0].message.as_deref(), Some("job retried"));
        assert_eq!(event.exceptions[0].stacktrace[0].file.as_deref(), Some("src/jobs.rs"));
    }

    #[test]
    fn test_skips_ignored_release_stage() {
        let mut config = configuration();
        config.notify_release_stages = ["live".to_string()].into_iter().collect();
        config.release_stage = Some("staging".to_string());

        assert!(NotificationBuilder::new(&config).build(&failing_event()).is_none());
    }

    #[test]
    fn test_skips_ignored_error_class() {
        let mut config = configuration();
        config.ignore_classes = ["QueryFailed".to_string()].into_iter().collect();

        assert!(NotificationBuilder::new(&config).build(&failing_event()).is_none());
    }

    #[test]
    fn test_only_outermost_class_is_checked_against_ignore_list() {
        let mut config = configuration();
        config.ignore_classes = ["ConnectionReset".to_string()].into_iter().collect();

        assert!(NotificationBuilder::new(&config).build(&failing_event()).is_some());
    }

    #[test]
    fn test_merges_provider_output() {
        let config = configuration().with_meta_data_provider("custom", CustomMetaDataProvider);
        let event = failing_event()
            .with_property("password", "hunter2")
            .with_property("user_id", "u-7");

        let notification = NotificationBuilder::new(&config).build(&event).unwrap();

        let event = &notification.events[0];
        assert_eq!(
            event.meta_data.tab("User").unwrap().get("password"),
            Some(&json!("hunter2"))
        );
        assert!(event.meta_data.tab(LOGGING_TAB).is_some());
        assert_eq!(event.user, Some(User::with_id("u-7")));
        assert_eq!(event.grouping_hash.as_deref(), Some("fixed-group"));
        assert_eq!(event.context.as_deref(), Some("app::db"));
    }

    #[test]
    fn test_qualified_method_formats() {
        assert_eq!(qualified_method(&CallFrame::new("a.B", "run")), "a.B.run");
        assert_eq!(qualified_method(&CallFrame::new("a::b", "run")), "a::b::run");
        assert_eq!(qualified_method(&CallFrame::new("a::b", "")), "a::b");
    }
}
