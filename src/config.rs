//! User-side config file (`NAME.rpack.yaml`) loading and validation.

use crate::error::{Error, Result};
use crate::lockfile::Lockfile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_SUFFIX: &str = ".rpack.yaml";
pub const LOCKFILE_SUFFIX: &str = ".rpack.lock.yaml";
pub const CONFIG_SCHEMA_VERSION: &str = "v1";

/// The parsed `NAME.rpack.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackConfig {
    #[serde(rename = "@schema_version")]
    pub schema_version: String,

    /// Bundle location handed to the fetcher.
    pub source: String,

    #[serde(default)]
    pub config: ConfigSection,
}

/// Values and input mappings supplied by the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigSection {
    /// Opaque value tree, validated against the pack's optional schema.
    #[serde(default)]
    pub values: serde_json::Value,

    /// Input name to relative local path.
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,
}

impl PackConfig {
    /// Structural validation against the internal config schema.
    pub fn validate(&self, path: &Path) -> Result<()> {
        if self.schema_version != CONFIG_SCHEMA_VERSION {
            return Err(Error::Config {
                path: path.to_path_buf(),
                reason: format!(
                    "unsupported schema version {:?}, supported {:?}",
                    self.schema_version, CONFIG_SCHEMA_VERSION
                ),
            });
        }
        if self.source.trim().is_empty() {
            return Err(Error::Config {
                path: path.to_path_buf(),
                reason: "source must be non-empty".to_string(),
            });
        }
        Ok(())
    }
}

/// A config loaded from disk together with its lockfile.
#[derive(Debug, Clone)]
pub struct ConfigInstance {
    /// Absolute path of the config file.
    pub config_path: PathBuf,
    /// Directory containing the config file; the default execution path.
    pub config_dir: PathBuf,
    pub config: PackConfig,
    /// Previous-run lockfile; empty when none exists yet.
    pub lockfile: Lockfile,
    pub lockfile_path: PathBuf,
}

/// Load `NAME.rpack.yaml` and its sibling lockfile.
///
/// The filename suffix is enforced here because the lockfile path is
/// derived from it.
pub fn load_config(name: &Path) -> Result<ConfigInstance> {
    let config_path = std::path::absolute(name).map_err(|err| Error::Config {
        path: name.to_path_buf(),
        reason: err.to_string(),
    })?;
    let file_name = config_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file_name
        .strip_suffix(CONFIG_SUFFIX)
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| Error::Config {
            path: config_path.clone(),
            reason: format!("config filename does not end in {CONFIG_SUFFIX}"),
        })?;
    let config_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let bytes = fs::read(&config_path).map_err(|err| Error::Config {
        path: config_path.clone(),
        reason: err.to_string(),
    })?;
    let config: PackConfig = serde_yaml::from_slice(&bytes).map_err(|err| Error::Config {
        path: config_path.clone(),
        reason: err.to_string(),
    })?;
    config.validate(&config_path)?;

    let lockfile_path = config_dir.join(format!("{stem}{LOCKFILE_SUFFIX}"));
    let lockfile = if lockfile_path.exists() {
        let lockfile = Lockfile::load(&lockfile_path)?;
        lockfile.validate(&lockfile_path)?;
        lockfile
    } else {
        tracing::info!(path = %lockfile_path.display(), "lockfile does not exist yet");
        Lockfile::new()
    };

    Ok(ConfigInstance {
        config_path,
        config_dir,
        config,
        lockfile,
        lockfile_path,
    })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
