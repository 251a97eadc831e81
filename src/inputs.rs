//! User-supplied input mappings resolved against the execution path.

use crate::error::{Error, Result};
use crate::paths::clean_local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Whether a mapped input is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    File,
    Dir,
}

impl InputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputKind::File => "file",
            InputKind::Dir => "dir",
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user input mapping resolved to a real path on disk.
///
/// Built once at run start and immutable afterwards.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    pub name: String,
    /// Cleaned user path, relative to the execution path.
    pub user_path: PathBuf,
    pub resolved_abs_path: PathBuf,
    pub kind: InputKind,
}

/// Resolve the `inputs` section of a config against the execution path.
///
/// Each user path must be relative and local, and must exist; the kind is
/// derived from what is found on disk.
pub fn resolve_inputs(
    config_inputs: &BTreeMap<String, String>,
    exec_path: &Path,
) -> Result<Vec<ResolvedInput>> {
    let mut resolved = Vec::with_capacity(config_inputs.len());
    for (name, user_path) in config_inputs {
        let cleaned = clean_local(user_path).map_err(|err| Error::InputResolution {
            name: name.clone(),
            reason: err.to_string(),
        })?;
        let abs_path = exec_path.join(&cleaned);
        let meta = std::fs::metadata(&abs_path).map_err(|err| Error::InputResolution {
            name: name.clone(),
            reason: format!("{}: {}", user_path, err),
        })?;
        let kind = if meta.is_dir() {
            InputKind::Dir
        } else {
            InputKind::File
        };
        resolved.push(ResolvedInput {
            name: name.clone(),
            user_path: cleaned,
            resolved_abs_path: abs_path,
            kind,
        });
    }
    Ok(resolved)
}
