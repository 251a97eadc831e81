//! Path hygiene and the on-disk run layout.
//!
//! Every path a script or a user hands to the core goes through
//! [`clean_local`] before it may touch a base directory. The run layout
//! under `.rpack.d` keys the cache on the source URL and the staging
//! directories on the config path, so distinct configs sharing a source
//! never collide.

use crate::error::{Error, Result};
use crate::util::sha256_hex;
use std::fs;
use std::path::{Component, Path, PathBuf};

pub const CACHE_DIR: &str = ".rpack.d";
pub const CACHE_SOURCE_DIR: &str = "source";
pub const CACHE_RUN_DIR: &str = "run";
pub const CACHE_TEMP_DIR: &str = "tmp";

/// Lexically clean a user-supplied relative path.
///
/// Rules: the path must be relative, and after resolving `.`/`..` segments
/// it must stay inside its (unnamed) base. `.` itself is permitted and
/// names the base.
pub fn clean_local(raw: &str) -> Result<PathBuf> {
    let path = Path::new(raw);
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                return Err(Error::Path {
                    path: raw.to_string(),
                    reason: "needs to be relative".to_string(),
                });
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() {
                    return Err(Error::Path {
                        path: raw.to_string(),
                        reason: "needs to be local".to_string(),
                    });
                }
            }
            Component::Normal(part) => cleaned.push(part),
        }
    }
    if cleaned.as_os_str().is_empty() {
        cleaned.push(".");
    }
    Ok(cleaned)
}

/// Join a cleaned relative path onto a parent, collapsing a bare `.`.
pub fn join_clean(base: &Path, rel: &Path) -> PathBuf {
    if rel == Path::new(".") {
        return base.to_path_buf();
    }
    if base == Path::new(".") {
        return rel.to_path_buf();
    }
    base.join(rel)
}

/// Absolute directories used by one run.
#[derive(Debug, Clone)]
pub struct RunPaths {
    /// Directory the pack materializes into.
    pub exec_path: PathBuf,
    /// Cache root for this source URL.
    pub cache_path: PathBuf,
    /// Fetched pack body.
    pub source_path: PathBuf,
    /// Staging directory for target writes.
    pub run_path: PathBuf,
    /// Script scratch directory.
    pub temp_path: PathBuf,
}

impl RunPaths {
    /// Derive the cache layout for a run of `config_path` against
    /// `exec_path`, without touching the disk.
    pub fn new(exec_path: &Path, source_url: &str, config_path: &Path) -> Self {
        let cache_path = exec_path.join(CACHE_DIR).join(sha256_hex(source_url.as_bytes()));
        let invocation = sha256_hex(config_path.to_string_lossy().as_bytes());
        RunPaths {
            exec_path: exec_path.to_path_buf(),
            source_path: cache_path.join(CACHE_SOURCE_DIR),
            run_path: cache_path.join(&invocation).join(CACHE_RUN_DIR),
            temp_path: cache_path.join(&invocation).join(CACHE_TEMP_DIR),
            cache_path,
        }
    }

    /// Create the cache tree and wipe the per-invocation staging
    /// directories so every run starts from empty `run/` and `tmp/`.
    pub fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.cache_path)?;
        for dir in [&self.run_path, &self.temp_path] {
            if dir.exists() {
                fs::remove_dir_all(dir)?;
            }
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
