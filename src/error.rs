//! Error taxonomy for archiving requests.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Message returned when the tool skipped every requested URL.
pub const ALREADY_EXISTS_MESSAGE: &str =
    "The requested target already exists. If you want to update it, please add the update parameter.";

/// Archiving operation errors.
///
/// `Invocation`, `Timeout`, `AlreadyExists` and `Configuration` abort a whole
/// request. The index and tagging variants only ever fail a single URL.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to execute command '{command}': {message}")]
    Invocation {
        command: String,
        message: String,
        stderr: String,
    },

    #[error("command '{command}' timed out after {after:?}")]
    Timeout { command: String, after: Duration },

    #[error("{}", ALREADY_EXISTS_MESSAGE)]
    AlreadyExists,

    #[error("malformed index file {}: {message}", .path.display())]
    MalformedIndex { path: PathBuf, message: String },

    #[error("index file not found: {}", .0.display())]
    IndexMissing(PathBuf),

    #[error("no target recorded for url: {0}")]
    TargetNotFound(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    Provision(String),
}

impl ArchiveError {
    /// Captured stderr of a failed invocation, if any.
    #[must_use]
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Invocation { stderr, .. } if !stderr.is_empty() => Some(stderr),
            _ => None,
        }
    }
}

/// Result type for archiving operations.
pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_exists_message() {
        assert_eq!(ArchiveError::AlreadyExists.to_string(), ALREADY_EXISTS_MESSAGE);
    }

    #[test]
    fn test_stderr_only_for_invocation() {
        let err = ArchiveError::Invocation {
            command: "docker compose run --rm archivebox add".to_string(),
            message: "exit status: 1".to_string(),
            stderr: "boom".to_string(),
        };
        assert_eq!(err.stderr(), Some("boom"));
        assert!(err.to_string().contains("exit status: 1"));
        assert_eq!(ArchiveError::AlreadyExists.stderr(), None);
    }

    #[test]
    fn test_timeout_message_keeps_sub_second_precision() {
        let err = ArchiveError::Timeout {
            command: "sleep 5".to_string(),
            after: Duration::from_millis(200),
        };
        assert_eq!(err.to_string(), "command 'sleep 5' timed out after 200ms");
    }
}
