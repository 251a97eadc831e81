//! Lockfile tracking the files a config wrote in its previous run.
//!
//! The lockfile detects out-of-band modification of managed files and
//! drives removal of files the pack no longer produces. Paths are relative
//! to the config directory and compared byte-wise; case-insensitive
//! filesystems may alias entries that differ only in case.

use crate::error::{Error, Result};
use crate::util::{file_exists, sha256_file};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const LOCKFILE_SCHEMA_VERSION: &str = "v1";

/// Persisted manifest of the files written by one config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lockfile {
    #[serde(rename = "@schema_version")]
    pub schema_version: String,
    pub files: Vec<LockedFile>,
}

/// One managed file: path relative to the config directory plus the
/// SHA-256 of its content at the close of the previous successful run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockedFile {
    pub path: String,
    pub sha: String,
}

/// Lockfile entries whose on-disk state diverged.
#[derive(Debug, Default)]
pub struct Integrity {
    /// Entries whose on-disk checksum differs from the recorded one.
    pub modified: Vec<String>,
    /// Entries no longer present on disk.
    pub removed: Vec<String>,
}

/// Path-level diff between two lockfiles.
#[derive(Debug, Default)]
pub struct Changes {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl Default for Lockfile {
    fn default() -> Self {
        Self::new()
    }
}

impl Lockfile {
    pub fn new() -> Self {
        Lockfile {
            schema_version: LOCKFILE_SCHEMA_VERSION.to_string(),
            files: Vec::new(),
        }
    }

    pub fn add_file(&mut self, path: String, sha: String) {
        self.files.push(LockedFile { path, sha });
    }

    pub fn validate(&self, path: &Path) -> Result<()> {
        if self.schema_version != LOCKFILE_SCHEMA_VERSION {
            return Err(Error::Lockfile {
                path: path.to_path_buf(),
                reason: format!(
                    "unsupported schema version {:?}, supported {:?}",
                    self.schema_version, LOCKFILE_SCHEMA_VERSION
                ),
            });
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|err| Error::Lockfile {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        let lockfile: Lockfile =
            serde_yaml::from_slice(&bytes).map_err(|err| Error::Lockfile {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;
        Ok(lockfile)
    }

    /// Persist as YAML via a sibling temp file and rename.
    pub fn write(&self, path: &Path) -> Result<()> {
        let text = serde_yaml::to_string(self).map_err(|err| Error::Lockfile {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "lockfile".to_string());
        let tmp_path = path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(format!(".{file_name}.tmp"));
        fs::write(&tmp_path, text.as_bytes()).map_err(|err| Error::commit(&tmp_path, err))?;
        fs::rename(&tmp_path, path).map_err(|err| Error::commit(path, err))?;
        Ok(())
    }

    /// Check managed files against their recorded checksums under `base`.
    pub fn check_integrity(&self, base: &Path) -> Result<Integrity> {
        let mut integrity = Integrity::default();
        for file in &self.files {
            let on_disk = base.join(&file.path);
            let exists = file_exists(&on_disk).map_err(|err| Error::Lockfile {
                path: on_disk.clone(),
                reason: err.to_string(),
            })?;
            if !exists {
                integrity.removed.push(file.path.clone());
                continue;
            }
            let sha = sha256_file(&on_disk).map_err(|err| Error::Lockfile {
                path: on_disk.clone(),
                reason: format!("checksum computation failed: {err}"),
            })?;
            if sha != file.sha {
                integrity.modified.push(file.path.clone());
            }
        }
        Ok(integrity)
    }

    /// Diff this (new) lockfile against the previous one, by path.
    pub fn changes(&self, old: &Lockfile) -> Changes {
        let new_paths: HashSet<&str> = self.files.iter().map(|f| f.path.as_str()).collect();
        let old_paths: HashSet<&str> = old.files.iter().map(|f| f.path.as_str()).collect();
        Changes {
            added: self
                .files
                .iter()
                .filter(|f| !old_paths.contains(f.path.as_str()))
                .map(|f| f.path.clone())
                .collect(),
            removed: old
                .files
                .iter()
                .filter(|f| !new_paths.contains(f.path.as_str()))
                .map(|f| f.path.clone())
                .collect(),
        }
    }

    /// Absolute paths of managed files under `base`.
    pub fn paths_under(&self, base: &Path) -> Vec<PathBuf> {
        self.files.iter().map(|f| base.join(&f.path)).collect()
    }
}

#[cfg(test)]
#[path = "lockfile_tests.rs"]
mod tests;
