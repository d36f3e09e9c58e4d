use thiserror::Error;

pub type Result<T> = std::result::Result<T, DeliveryError>;

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Delivery thread panicked")]
    Interrupted,
}
