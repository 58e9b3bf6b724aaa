//! Error handling and custom error types
//!
//! Provides unified error handling across the plugin using thiserror.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Midjourney API error (status {status}): {message}")]
    RemoteStatus { status: u16, message: String },

    #[error("Midjourney API rejected request (code {code}): {message}")]
    RemoteCode { code: i64, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Generic error: {0}")]
    Generic(String),
}

impl Error {
    /// HTTP status reported by the remote service, if the failure carried one.
    pub fn remote_status(&self) -> Option<u16> {
        match self {
            Error::RemoteStatus { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
