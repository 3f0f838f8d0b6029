use reqwest::StatusCode;
use thiserror::Error;

/// Failures of the two service calls
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Network(#[from] reqwest::Error),
    /// Non-success status; the message is what the user sees
    #[error("{message}")]
    Server { status: StatusCode, message: String },
    #[error("Invalid response: {0}")]
    MalformedBody(String),
    #[error("Could not save file: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// HTTP status for errors the server answered with
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            ApiError::Network(e) => e.status(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
