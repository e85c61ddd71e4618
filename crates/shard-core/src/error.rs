//! Error types for the shard scheduler core.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while scheduling, extracting, or merging shard data.
///
/// `DeadlineExceeded` from the design notes is deliberately absent here: a
/// CKK search that runs out of time is not a failure, it is surfaced as
/// `AssignResult::is_optimal = false`.
#[derive(Error, Debug)]
pub enum ShardError {
    /// A required input file does not exist.
    #[error("required file not found: {path}")]
    InputMissing { path: PathBuf },

    /// A file exists but could not be parsed, or is missing required fields.
    #[error("malformed input ({context}): {message}")]
    Malformed { context: String, message: String },

    /// A path resolved outside of the directory it was supposed to be relative to.
    #[error("path '{path}' escapes root '{root}'")]
    PathEscape { path: String, root: String },

    /// An option or derived value is out of its valid range.
    #[error("inconsistent input: {message}")]
    Inconsistent { message: String },

    /// A write failed before the atomic rename could take place.
    #[error("write to '{path}' failed: {source}")]
    TransientIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ShardError {
    pub fn input_missing(path: impl Into<PathBuf>) -> Self {
        Self::InputMissing { path: path.into() }
    }

    pub fn malformed(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn path_escape(path: impl Into<String>, root: impl Into<String>) -> Self {
        Self::PathEscape {
            path: path.into(),
            root: root.into(),
        }
    }

    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::Inconsistent {
            message: message.into(),
        }
    }

    pub fn transient_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::TransientIo {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ShardError>;
