//! Wire encoding of notifications.
//!
//! Tabs are redacted here, on their serialized form, so the in-memory
//! notification keeps every value.

use crate::error::Result;
use bugsnag_core::{Configuration, Notification, RedactionFilter};
use serde_json::Value;

/// Serializes `notification` to the JSON body sent to the notify endpoint,
/// with every tab filtered by the configured keys.
pub fn encode(notification: &Notification, configuration: &Configuration) -> Result<Vec<u8>> {
    let mut body = serde_json::to_value(notification)?;
    redact_tabs(&mut body, configuration);
    Ok(serde_json::to_vec(&body)?)
}

/// Applies the redaction filter to each tab of each event. Tab names are
/// never filtered, only the data below them.
pub fn redact_tabs(body: &mut Value, configuration: &Configuration) {
    let filter = RedactionFilter::new(configuration).with_max_depth(configuration.max_filter_depth);

    let Some(events) = body.get_mut("events").and_then(Value::as_array_mut) else {
        return;
    };
    for event in events {
        if let Some(tabs) = event.get_mut("metaData").and_then(Value::as_object_mut) {
            for tab in tabs.values_mut() {
                filter.apply(tab);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bugsnag_core::{Level, LoggingEvent, MetaData, MetaDataProvider, NotificationBuilder};
    use serde_json::json;

    struct SecretsProvider;

    impl MetaDataProvider for SecretsProvider {
        fn provide(&self, _event: &dyn bugsnag_core::LogEvent) -> MetaData {
            let mut meta_data = MetaData::new();
            meta_data.add_to_tab("User", "password", "hunter2");
            meta_data.add_to_tab("User", "name", "alice");
            meta_data.add_to_tab(
                "Request",
                "attempts",
                json!([{"password": "a", "ok": false}, {"password": "b", "ok": true}]),
            );
            meta_data.add_to_tab("password", "kept", "tab names are not filtered");
            meta_data
        }
    }

    fn configuration() -> Configuration {
        let mut config = Configuration::default().with_meta_data_provider("secrets", SecretsProvider);
        config.api_key = Some("password".to_string());
        config.filter_keys = ["password".to_string()].into_iter().collect();
        config
    }

    #[test]
    fn test_encode_redacts_tabs_only() {
        let config = configuration();
        let event = LoggingEvent::new(Level::Error, "app", "boom");
        let notification = NotificationBuilder::new(&config).build(&event).unwrap();

        let body: Value = serde_json::from_slice(&encode(&notification, &config).unwrap()).unwrap();

        assert_eq!(body["apiKey"], "password");
        let meta_data = &body["events"][0]["metaData"];
        assert_eq!(meta_data["User"], json!({"name": "alice"}));
        assert_eq!(
            meta_data["Request"]["attempts"],
            json!([{"ok": false}, {"ok": true}])
        );
        assert_eq!(meta_data["password"]["kept"], "tab names are not filtered");
        assert_eq!(meta_data["Logging"]["message"], "boom");

        let user = notification.events[0].meta_data.tab("User").unwrap();
        assert_eq!(user.get("password"), Some(&json!("hunter2")));
    }

    struct OrderedProvider;

    impl MetaDataProvider for OrderedProvider {
        fn provide(&self, _event: &dyn bugsnag_core::LogEvent) -> MetaData {
            let mut meta_data = MetaData::new();
            meta_data.add_to_tab("Request", "zeta", 1);
            meta_data.add_to_tab("Request", "password", 2);
            meta_data.add_to_tab("Request", "alpha", 3);
            meta_data
        }
    }

    #[test]
    fn test_encode_keeps_tab_key_order() {
        let mut config = Configuration::default().with_meta_data_provider("ordered", OrderedProvider);
        config.api_key = Some("key".to_string());
        config.filter_keys = ["password".to_string()].into_iter().collect();
        let event = LoggingEvent::new(Level::Error, "app", "boom");
        let notification = NotificationBuilder::new(&config).build(&event).unwrap();

        let body = String::from_utf8(encode(&notification, &config).unwrap()).unwrap();

        assert!(body.contains(r#""Request":{"zeta":1,"alpha":3}"#));
    }

    #[test]
    fn test_redact_tabs_ignores_bodies_without_events() {
        let config = configuration();
        let mut body = json!({"apiKey": "x"});
        redact_tabs(&mut body, &config);
        assert_eq!(body, json!({"apiKey": "x"}));
    }
}
