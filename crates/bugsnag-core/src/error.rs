use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to read configuration file {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoadFailed {
        path: String,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("Invalid configuration: {issue}")]
    ConfigInvalid { issue: String },
}
