//! Lockfile integrity checking without running the pack.

use crate::config;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Verifies that every managed file is still present and unmodified.
#[derive(Debug, Default)]
pub struct Checker {
    /// Override for the execution path; defaults to the config directory.
    pub override_exec_path: Option<PathBuf>,
}

impl Checker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the lockfile of `config_path` against the on-disk state.
    ///
    /// Unlike a forced run, both modified and removed managed files are
    /// errors here; `check` never mutates anything.
    pub fn check(&self, config_path: &Path) -> Result<()> {
        let ci = config::load_config(config_path)?;
        let exec_path = self
            .override_exec_path
            .clone()
            .unwrap_or_else(|| ci.config_dir.clone());

        let integrity = ci.lockfile.check_integrity(&exec_path)?;
        if !integrity.modified.is_empty() {
            let joined = integrity.modified.join(",");
            tracing::warn!(files = %joined, "managed files were modified outside of rpack");
            return Err(Error::Integrity {
                reason: "managed files were modified outside of rpack".to_string(),
                paths: joined,
            });
        }
        if !integrity.removed.is_empty() {
            let joined = integrity.removed.join(",");
            tracing::warn!(files = %joined, "managed files were removed outside of rpack");
            return Err(Error::Integrity {
                reason: "managed files were removed outside of rpack".to_string(),
                paths: joined,
            });
        }
        tracing::info!(files = ci.lockfile.files.len(), "lockfile integrity holds");
        Ok(())
    }
}
