//! Error types for the sprout client.
//!
//! Network failures are split the same way the backend contract splits them:
//! either no response arrived ([`ClientError::Transport`]) or a response
//! arrived with a non-2xx status ([`ClientError::HttpStatus`]).

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

/// Failure reading or writing the local key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("storage data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure loading or saving the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("config I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response (DNS, connect, reset...).
    #[error("transport error: {cause}")]
    Transport { cause: String },

    /// The backend answered outside [200, 300).
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: Value },

    /// The request body could not be serialized; nothing was sent.
    #[error("could not encode request body: {0}")]
    Encode(String),

    /// A 2xx response whose body could not be decoded.
    #[error("could not decode response: {0}")]
    Decode(String),

    /// Required fields missing, checked before any network call.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation(_))
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
