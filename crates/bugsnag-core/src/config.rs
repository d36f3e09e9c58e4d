use crate::filter::KeyFilter;
use crate::provider::{MetaDataProvider, ProviderRegistry};
use crate::reporter::ErrorReporter;
use crate::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_ENDPOINT: &str = "notify.bugsnag.com";
pub const DEFAULT_RELEASE_STAGE: &str = "production";
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

pub const INVALID_ENDPOINT: &str = "endpoint must not be null nor empty";
pub const INVALID_API_KEY: &str = "apiKey must not be null nor empty";
pub const INVALID_RELEASE_STAGE: &str = "releaseStage must not be null nor empty";

/// Settings for building and delivering notifications.
///
/// Built once at startup (defaults, then file, then environment), then shared
/// read-only behind an `Arc`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Host (and optional path) of the notify endpoint, without protocol.
    pub endpoint: Option<String>,

    pub ssl_enabled: bool,

    pub api_key: Option<String>,

    pub release_stage: Option<String>,

    /// Stages that are notified for. Empty means every stage.
    pub notify_release_stages: BTreeSet<String>,

    /// Prefixes marking a frame's owner as part of the monitored project.
    pub project_packages: BTreeSet<String>,

    /// Error classes that are never notified for.
    pub ignore_classes: BTreeSet<String>,

    /// Keys removed from tab data before it is sent.
    pub filter_keys: BTreeSet<String>,

    /// Identifier of a provider in the registry.
    pub meta_data_provider: Option<String>,

    pub app_version: Option<String>,

    pub connect_timeout_ms: u64,

    pub timeout_ms: u64,

    /// Deepest tab nesting walked by the redaction filter, `None` for no limit.
    pub max_filter_depth: Option<usize>,

    #[serde(skip)]
    providers: ProviderRegistry,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            endpoint: Some(DEFAULT_ENDPOINT.to_string()),
            ssl_enabled: false,
            api_key: None,
            release_stage: Some(DEFAULT_RELEASE_STAGE.to_string()),
            notify_release_stages: BTreeSet::new(),
            project_packages: BTreeSet::new(),
            ignore_classes: BTreeSet::new(),
            filter_keys: BTreeSet::new(),
            meta_data_provider: None,
            app_version: None,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_filter_depth: Some(crate::filter::DEFAULT_MAX_DEPTH),
            providers: ProviderRegistry::default(),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_invalid(&self) -> bool {
        !self.violations().is_empty()
    }

    /// Reports every violated rule, one message each.
    pub fn add_errors(&self, reporter: &dyn ErrorReporter) {
        for violation in self.violations() {
            reporter.add_error(&violation);
        }
    }

    fn violations(&self) -> Vec<String> {
        let mut violations = Vec::new();

        if is_blank(&self.endpoint) {
            violations.push(INVALID_ENDPOINT.to_string());
        }
        if is_blank(&self.api_key) {
            violations.push(INVALID_API_KEY.to_string());
        }
        if is_blank(&self.release_stage) {
            violations.push(INVALID_RELEASE_STAGE.to_string());
        }
        if let Some(name) = &self.meta_data_provider {
            if !self.providers.contains(name) {
                violations.push(format!(
                    "Could not resolve meta data provider: {}. Make sure that the provider \
                     is registered under this name before the sender is started.",
                    name
                ));
            }
        }

        violations
    }

    pub fn endpoint_with_protocol(&self) -> String {
        let protocol = if self.ssl_enabled { "https://" } else { "http://" };
        format!("{}{}", protocol, self.endpoint.as_deref().unwrap_or_default())
    }

    pub fn is_stage_ignored(&self) -> bool {
        if self.notify_release_stages.is_empty() {
            return false;
        }
        !self
            .release_stage
            .as_ref()
            .is_some_and(|stage| self.notify_release_stages.contains(stage))
    }

    pub fn is_in_project(&self, class_name: &str) -> bool {
        self.project_packages
            .iter()
            .any(|package| class_name.starts_with(package.as_str()))
    }

    pub fn should_notify_for(&self, class_name: &str) -> bool {
        !self.ignore_classes.contains(class_name)
    }

    pub fn is_ignored_by_filter(&self, key: &str) -> bool {
        self.filter_keys.contains(key)
    }

    pub fn has_meta_data_provider(&self) -> bool {
        self.meta_data_provider().is_some()
    }

    pub fn meta_data_provider(&self) -> Option<Arc<dyn MetaDataProvider>> {
        self.meta_data_provider
            .as_deref()
            .and_then(|name| self.providers.get(name))
    }

    pub fn register_meta_data_provider(
        &mut self,
        name: impl Into<String>,
        provider: Arc<dyn MetaDataProvider>,
    ) {
        self.providers.register(name, provider);
    }

    /// Registers `provider` and selects it.
    pub fn with_meta_data_provider(
        mut self,
        name: impl Into<String>,
        provider: impl MetaDataProvider + 'static,
    ) -> Self {
        let name = name.into();
        self.providers.register(name.clone(), Arc::new(provider));
        self.meta_data_provider = Some(name);
        self
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigLoadFailed {
            path: "<inline>".to_string(),
            source: Box::new(e),
        })
    }

    /// Loads the file at `config_path` (or the default location) and applies
    /// environment overrides. A missing file yields the defaults.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config_file = match config_path {
            Some(path) => path.to_path_buf(),
            None => Self::default_config_path()?,
        };

        let mut config = if config_file.exists() {
            info!("Loading Bugsnag configuration from: {}", config_file.display());
            let content =
                std::fs::read_to_string(&config_file).map_err(|e| Error::FileRead {
                    path: config_file.display().to_string(),
                    source: e,
                })?;
            toml::from_str(&content).map_err(|e| Error::ConfigLoadFailed {
                path: config_file.display().to_string(),
                source: Box::new(e),
            })?
        } else {
            info!("No Bugsnag configuration file found, using defaults");
            Self::default()
        };

        config.load_env_overrides();
        Ok(config)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let project_dirs =
            ProjectDirs::from("com", "bugsnag", "bugsnag-tracing").ok_or_else(|| {
                Error::ConfigInvalid {
                    issue: "Could not determine config directory".to_string(),
                }
            })?;

        Ok(project_dirs.config_dir().join("bugsnag.toml"))
    }

    pub fn load_env_overrides(&mut self) {
        if let Ok(api_key) = std::env::var("BUGSNAG_API_KEY") {
            self.api_key = Some(api_key);
        }
        if let Ok(endpoint) = std::env::var("BUGSNAG_ENDPOINT") {
            self.endpoint = Some(endpoint);
        }
        if let Ok(stage) = std::env::var("BUGSNAG_RELEASE_STAGE") {
            self.release_stage = Some(stage);
        }
        if let Ok(enabled) = std::env::var("BUGSNAG_SSL_ENABLED") {
            match parse_flag(&enabled) {
                Some(flag) => self.ssl_enabled = flag,
                None => warn!(
                    value = %enabled,
                    "Ignoring BUGSNAG_SSL_ENABLED, expected true/false, yes/no, on/off or 1/0"
                ),
            }
        }
        if let Ok(version) = std::env::var("BUGSNAG_APP_VERSION") {
            self.app_version = Some(version);
        }
    }
}

impl KeyFilter for Configuration {
    fn is_ignored_by_filter(&self, key: &str) -> bool {
        Configuration::is_ignored_by_filter(self, key)
    }
}
