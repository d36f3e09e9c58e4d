//! Key based redaction of custom tab data.
//!
//! The filter walks a [`Value`] tree depth first. Map entries whose key is
//! ignored are removed together with everything below them, sequences are
//! descended into element by element and scalars are left alone. The key test
//! is applied to every map on its own, so a key that is redacted in one map is
//! still redacted when it shows up again at any other depth.

use crate::model::Tab;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};

/// Nesting depth that is walked by default. Containers below it are replaced
/// by `null` since their keys were never checked.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Decides whether a map key must be removed.
pub trait KeyFilter {
    fn is_ignored_by_filter(&self, key: &str) -> bool;
}

impl KeyFilter for BTreeSet<String> {
    fn is_ignored_by_filter(&self, key: &str) -> bool {
        self.contains(key)
    }
}

impl KeyFilter for HashSet<String> {
    fn is_ignored_by_filter(&self, key: &str) -> bool {
        self.contains(key)
    }
}

impl<F: KeyFilter + ?Sized> KeyFilter for &F {
    fn is_ignored_by_filter(&self, key: &str) -> bool {
        (**self).is_ignored_by_filter(key)
    }
}

pub struct RedactionFilter<'a> {
    keys: &'a dyn KeyFilter,
    max_depth: Option<usize>,
}

impl<'a> RedactionFilter<'a> {
    pub fn new(keys: &'a dyn KeyFilter) -> Self {
        Self {
            keys,
            max_depth: Some(DEFAULT_MAX_DEPTH),
        }
    }

    /// `None` walks trees of any depth.
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn apply(&self, value: &mut Value) {
        self.filter_element(value, 0);
    }

    /// Filtered copy of a tab. The tab itself keeps all of its data.
    pub fn filtered_tab(&self, tab: &Tab) -> Value {
        let mut value = Value::Object(tab.values().clone());
        self.apply(&mut value);
        value
    }

    fn filter_element(&self, value: &mut Value, depth: usize) {
        let is_container = matches!(value, Value::Array(_) | Value::Object(_));
        if is_container && self.max_depth.is_some_and(|max| depth > max) {
            *value = Value::Null;
            return;
        }

        match value {
            Value::Array(elements) => {
                for element in elements.iter_mut() {
                    self.filter_element(element, depth + 1);
                }
            }
            Value::Object(map) => {
                // `retain` keeps the insertion order of the surviving keys.
                map.retain(|key, _| !self.keys.is_ignored_by_filter(key));
                for child in map.values_mut() {
                    self.filter_element(child, depth + 1);
                }
            }
            _ => {}
        }
    }
}

/// Filters `value` in place with the default depth limit.
pub fn filter_tree(value: &mut Value, keys: &dyn KeyFilter) {
    RedactionFilter::new(keys).apply(value);
}
