//! Error types for the rpack core.
//!
//! Each failure category surfaced at the library boundary gets its own
//! variant so callers can distinguish, for example, a sandbox path violation
//! from a lockfile integrity failure. Every variant carries the offending
//! path or name.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the rpack core.
///
/// `Clone` so a typed error can be recovered intact after crossing the
/// script interpreter boundary.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("invalid config {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("invalid lockfile {path}: {reason}")]
    Lockfile { path: PathBuf, reason: String },

    #[error("failed to fetch source {source_url}: {reason}")]
    Fetch { source_url: String, reason: String },

    #[error("invalid pack definition {path}: {reason}")]
    Definition { path: PathBuf, reason: String },

    #[error("cannot resolve input {name}: {reason}")]
    InputResolution { name: String, reason: String },

    #[error("invalid path {path:?}: {reason}")]
    Path { path: String, reason: String },

    #[error("not allowed to {op} {path}, {hint}")]
    AccessDenied {
        op: &'static str,
        path: String,
        hint: String,
    },

    #[error("{observed_op} of {observed} and write of {written} breaks pure execution")]
    Purity {
        observed_op: &'static str,
        observed: String,
        written: String,
    },

    #[error("script failed: {message}")]
    Script { message: String },

    #[error("{reason}: {paths}")]
    Integrity { reason: String, paths: String },

    #[error("commit failed for {path}: {reason}")]
    Commit { path: PathBuf, reason: String },

    #[error("run cancelled")]
    Cancelled,

    #[error("{message}")]
    Io { message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
        }
    }
}

impl Error {
    /// Attach an io error to a commit step, keeping the target path.
    pub fn commit(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Error::Commit {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}
