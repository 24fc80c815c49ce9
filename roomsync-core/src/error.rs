//! Error types for roomsync-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ValidationError;

/// All errors that can arise while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, etc.).
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The config file did not exist at the expected path.
    #[error("config not found at {path}")]
    NotFound { path: PathBuf },

    /// `dirs::home_dir()` returned `None`, so we cannot locate `~/.roomsync/`.
    #[error("cannot determine home directory; set $HOME or pass --config")]
    HomeNotFound,

    /// The file parsed but failed semantic validation.
    #[error("invalid config at {path}: {}", join_errors(errors))]
    Invalid {
        path: PathBuf,
        errors: Vec<ValidationError>,
    },
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure reported by the chat-platform client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The homeserver answered with a non-success status.
    #[error("homeserver returned {status} {errcode}: {message}")]
    Status {
        status: u16,
        errcode: String,
        message: String,
    },

    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// A response arrived but its body could not be decoded.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

/// Failure reported by the directory client.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("cannot connect to {uri}: {message}")]
    Connect { uri: String, message: String },

    #[error("bind as {dn} rejected: {message}")]
    Bind { dn: String, message: String },

    #[error("search failed: {0}")]
    Search(String),

    #[error("directory protocol error: {0}")]
    Protocol(String),
}
