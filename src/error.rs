//! Error taxonomy for the generation pipeline.
//!
//! Every variant carries enough context (path, column names, parameter) for
//! an operator to act on it. Nothing in the library retries or swallows these.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cannot read {}: {reason}", .path.display())]
    DataSource { path: PathBuf, reason: String },

    #[error("Catalog {} is missing required columns: {}", .path.display(), .missing.join(", "))]
    Schema { path: PathBuf, missing: Vec<String> },

    #[error("Invalid row in {} at line {line}: {reason}", .path.display())]
    InvalidRow {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("Invalid simulation parameter `{parameter}`: {reason}")]
    Config {
        parameter: &'static str,
        reason: String,
    },

    #[error("Failed to write {}: {reason}", .path.display())]
    Write { path: PathBuf, reason: String },

    #[error("Remote store misconfigured: {0}")]
    RemoteConfig(String),

    #[error("Cannot reach remote store: {0}")]
    RemoteConnectivity(String),

    #[error("Remote store error ({code}): {message}")]
    RemoteService { code: String, message: String },
}

impl Error {
    /// Short category label used in operator-facing log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::DataSource { .. } => "data_source",
            Error::Schema { .. } | Error::InvalidRow { .. } => "schema",
            Error::Config { .. } => "config",
            Error::Write { .. } => "write",
            Error::RemoteConfig(_) => "remote_config",
            Error::RemoteConnectivity(_) => "remote_connectivity",
            Error::RemoteService { .. } => "remote_service",
        }
    }

    pub(crate) fn config(parameter: &'static str, reason: impl Into<String>) -> Self {
        Error::Config {
            parameter,
            reason: reason.into(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Error::Write {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_lists_all_columns() {
        let err = Error::Schema {
            path: PathBuf::from("tracks.csv"),
            missing: vec!["artists".to_string(), "popularity".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("artists, popularity"));
        assert!(msg.contains("tracks.csv"));
        assert_eq!(err.kind(), "schema");
    }

    #[test]
    fn test_config_error_names_parameter() {
        let err = Error::config("base_mult_min", "must be <= base_mult_max");
        assert!(err.to_string().contains("`base_mult_min`"));
        assert_eq!(err.kind(), "config");
    }
}
