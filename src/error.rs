use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipupError {
    #[error("Project validation failed: {0}")]
    ProjectValidation(String),

    #[error("Invalid settings: {0}")]
    Settings(String),

    #[error("No release found for: {0}")]
    PackageNotFound(String),

    #[error("HTTP {status} from {url}")]
    Transport { url: String, status: u16 },

    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("Unexpected response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    #[error("Delivery aborted: {0}")]
    DeliveryPrecondition(String),

    #[error("Required checks did not conclude within {0:?}")]
    ChecksTimedOut(Duration),

    #[error("Lock file refresh failed: {0}")]
    LockRefresh(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipupError {
    pub fn request(url: &str, err: impl std::fmt::Display) -> Self {
        PipupError::Request {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    pub fn invalid_response(url: &str, err: impl std::fmt::Display) -> Self {
        PipupError::InvalidResponse {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipupError>;
