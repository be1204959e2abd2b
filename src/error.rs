use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SweepError>;

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse configuration {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("No configuration file found (looked for {file_name} in default locations)")]
    ConfigNotFound { file_name: String },

    #[error("Credentials of the target site '{name}' are not present in the configuration")]
    UnknownSite { name: String },

    #[error("Connection to {host} failed: {message}")]
    Connection { host: String, message: String },

    #[error("Remote directory '{path}' is not accessible: {message}")]
    RemotePath { path: String, message: String },

    #[error("Listing of '{path}' failed: {message}")]
    Listing { path: String, message: String },

    #[error("Extraction failed for {path}: {message}")]
    Extraction { path: PathBuf, message: String },

    #[error("Invalid purge pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Home directory not found")]
    HomeDirectoryNotFound,

    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },
}

impl SweepError {
    pub fn config_parse<S: Into<String>>(path: impl Into<PathBuf>, message: S) -> Self {
        SweepError::ConfigParse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn connection<S: Into<String>>(host: &str, message: S) -> Self {
        SweepError::Connection {
            host: host.to_string(),
            message: message.into(),
        }
    }

    pub fn remote_path<S: Into<String>>(path: &str, message: S) -> Self {
        SweepError::RemotePath {
            path: path.to_string(),
            message: message.into(),
        }
    }

    pub fn listing<S: Into<String>>(path: &str, message: S) -> Self {
        SweepError::Listing {
            path: path.to_string(),
            message: message.into(),
        }
    }

    pub fn extraction<S: Into<String>>(path: impl Into<PathBuf>, message: S) -> Self {
        SweepError::Extraction {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Errors confined to a single site. The pipeline records these and
    /// moves on to the next site instead of aborting the run.
    pub fn is_site_local(&self) -> bool {
        matches!(
            self,
            SweepError::Connection { .. }
                | SweepError::RemotePath { .. }
                | SweepError::Listing { .. }
        )
    }
}
