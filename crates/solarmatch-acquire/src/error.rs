//! Error types for data acquisition

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("Failed to reach {endpoint}: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    #[error("Image could not be decoded: {reason}")]
    Decode { reason: String },

    #[error("Image handle {id} is not live in this registry")]
    UnknownHandle { id: String },

    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

pub type Result<T> = std::result::Result<T, AcquireError>;
