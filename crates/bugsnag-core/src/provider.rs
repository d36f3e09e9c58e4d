use crate::event::LogEvent;
use crate::model::{MetaData, User};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Supplies extra tabs (and optionally user, context and grouping hash) for
/// every reported event.
pub trait MetaDataProvider: Send + Sync {
    fn provide(&self, event: &dyn LogEvent) -> MetaData;

    fn provide_user(&self, _event: &dyn LogEvent) -> Option<User> {
        None
    }

    fn provide_context(&self, _event: &dyn LogEvent) -> Option<String> {
        None
    }

    fn provide_grouping_hash(&self, _event: &dyn LogEvent) -> Option<String> {
        None
    }
}

/// Providers registered by the host, addressed by the identifier used in
/// configuration files.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn MetaDataProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any provider previously registered under `name`.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn MetaDataProvider>) {
        self.providers.insert(name.into(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn MetaDataProvider>> {
        self.providers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.providers.keys()).finish()
    }
}
