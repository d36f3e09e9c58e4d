//! Notification payload model, shaped after the Bugsnag notify API.

use crate::event::Level;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const NOTIFIER_NAME: &str = "Bugsnag Logback Notifier";
pub const NOTIFIER_VERSION: &str = "1.0.0";
pub const NOTIFIER_URL: &str = "https://github.com/codereligion/bugsnag-logback";
pub const PAYLOAD_VERSION: &str = "2";

/// The full body sent to the notify endpoint for one reporting cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub api_key: String,
    /// This library is always the sole entry.
    pub notifiers: Vec<Notifier>,
    pub events: Vec<Event>,
}

impl Notification {
    pub fn new(api_key: impl Into<String>, event: Event) -> Self {
        Self {
            api_key: api_key.into(),
            notifiers: vec![Notifier::default()],
            events: vec![event],
        }
    }
}

/// Identity of this library towards the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notifier {
    pub name: String,
    pub version: String,
    pub url: String,
}

impl Default for Notifier {
    fn default() -> Self {
        Self {
            name: NOTIFIER_NAME.to_string(),
            version: NOTIFIER_VERSION.to_string(),
            url: NOTIFIER_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl From<Level> for Severity {
    fn from(level: Level) -> Self {
        match level {
            Level::Error => Severity::Error,
            Level::Warn => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    pub method: String,
    pub in_project: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exception {
    pub error_class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub stacktrace: Vec<StackFrame>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl User {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_stage: Option<String>,
}

/// One reported occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub payload_version: String,
    pub exceptions: Vec<Exception>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grouping_hash: Option<String>,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<App>,
    #[serde(default, skip_serializing_if = "MetaData::is_empty")]
    pub meta_data: MetaData,
}

/// A named group of custom key/value data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tab {
    values: Map<String, Value>,
}

impl Tab {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keys from `other` win on collision.
    pub fn merge(&mut self, other: Tab) {
        self.values.extend(other.values);
    }
}

impl From<Map<String, Value>> for Tab {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

/// All tabs of an event, keyed by tab name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetaData {
    tabs: BTreeMap<String, Tab>,
}

impl MetaData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_to_tab(&mut self, tab: &str, key: impl Into<String>, value: impl Into<Value>) {
        self.tabs.entry(tab.to_string()).or_default().insert(key, value);
    }

    /// Like [`MetaData::add_to_tab`] for any serializable value.
    pub fn try_add_to_tab<T: Serialize>(
        &mut self,
        tab: &str,
        key: impl Into<String>,
        value: &T,
    ) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.add_to_tab(tab, key, value);
        Ok(())
    }

    pub fn tab(&self, name: &str) -> Option<&Tab> {
        self.tabs.get(name)
    }

    pub fn tabs(&self) -> impl Iterator<Item = (&str, &Tab)> {
        self.tabs.iter().map(|(name, tab)| (name.as_str(), tab))
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Tabs present on both sides are merged key by key.
    pub fn merge(&mut self, other: MetaData) {
        for (name, tab) in other.tabs {
            self.tabs.entry(name).or_default().merge(tab);
        }
    }
}
