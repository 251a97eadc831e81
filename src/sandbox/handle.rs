//! Handles wrap every concrete path the sandbox hands out.
//!
//! A handle is produced by exactly one resolver and carries, besides the
//! absolute path it is backed by, the friendly path the script used and the
//! indirect target path that drives purity matching and commit routing.

use crate::error::{Error, Result};
use crate::paths::join_clean;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Result of a handle `stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub exists: bool,
    pub is_dir: bool,
}

/// Capability object wrapping the IO operations for one resolved path.
pub trait Handle {
    /// Identifier of the resolver that produced this handle.
    fn resolver_id(&self) -> &'static str;
    /// The prefixed name as the script wrote it, e.g. `map:users.yaml`.
    fn friendly_path(&self) -> &str;
    /// The path a write would occupy in the final target directory.
    fn indirect_target_path(&self) -> &Path;

    fn read(&self) -> Result<Vec<u8>>;
    fn write(&self, bytes: &[u8]) -> Result<()>;
    fn stat(&self) -> Result<FileStat>;
    /// Child handles of a directory, split into files and subdirectories,
    /// sorted by name.
    #[allow(clippy::type_complexity)]
    fn read_dir(&self) -> Result<(Vec<Box<dyn Handle>>, Vec<Box<dyn Handle>>)>;
}

/// The identity of a handle, detached from its backing store.
///
/// Hooks and the recorder keep these instead of live handles, so recorded
/// state stays plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleMeta {
    pub resolver_id: &'static str,
    pub friendly_path: String,
    pub indirect_target_path: PathBuf,
}

impl HandleMeta {
    pub fn of(handle: &dyn Handle) -> Self {
        HandleMeta {
            resolver_id: handle.resolver_id(),
            friendly_path: handle.friendly_path().to_string(),
            indirect_target_path: handle.indirect_target_path().to_path_buf(),
        }
    }
}

/// File-backed [`Handle`], sufficient for all shipped resolvers.
#[derive(Debug, Clone)]
pub struct FileHandle {
    resolver_id: &'static str,
    friendly_path: String,
    abs_path: PathBuf,
    indirect_target_path: PathBuf,
}

impl FileHandle {
    pub fn new(
        resolver_id: &'static str,
        friendly_path: String,
        abs_path: PathBuf,
        indirect_target_path: PathBuf,
    ) -> Self {
        tracing::debug!(
            resolver = resolver_id,
            friendly = %friendly_path,
            abs = %abs_path.display(),
            indirect = %indirect_target_path.display(),
            "new file handle"
        );
        FileHandle {
            resolver_id,
            friendly_path,
            abs_path,
            indirect_target_path,
        }
    }

    fn io_err(&self, err: io::Error) -> Error {
        Error::Io {
            message: format!("{}: {}", self.friendly_path, err),
        }
    }
}

impl Handle for FileHandle {
    fn resolver_id(&self) -> &'static str {
        self.resolver_id
    }

    fn friendly_path(&self) -> &str {
        &self.friendly_path
    }

    fn indirect_target_path(&self) -> &Path {
        &self.indirect_target_path
    }

    fn read(&self) -> Result<Vec<u8>> {
        fs::read(&self.abs_path).map_err(|e| self.io_err(e))
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.abs_path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        fs::write(&self.abs_path, bytes).map_err(|e| self.io_err(e))
    }

    fn stat(&self) -> Result<FileStat> {
        match fs::metadata(&self.abs_path) {
            Ok(meta) => Ok(FileStat {
                exists: true,
                is_dir: meta.is_dir(),
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(FileStat {
                exists: false,
                is_dir: false,
            }),
            Err(err) => Err(self.io_err(err)),
        }
    }

    fn read_dir(&self) -> Result<(Vec<Box<dyn Handle>>, Vec<Box<dyn Handle>>)> {
        let mut entries = fs::read_dir(&self.abs_path)
            .map_err(|e| self.io_err(e))?
            .collect::<io::Result<Vec<_>>>()
            .map_err(|e| self.io_err(e))?;
        // Deterministic listing across platforms.
        entries.sort_by_key(|entry| entry.file_name());

        let mut files: Vec<Box<dyn Handle>> = Vec::new();
        let mut dirs: Vec<Box<dyn Handle>> = Vec::new();
        for entry in entries {
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            let child = FileHandle::new(
                self.resolver_id,
                format!("{}/{}", self.friendly_path, name_str),
                self.abs_path.join(&name),
                join_clean(&self.indirect_target_path, Path::new(&name)),
            );
            let is_dir = entry.file_type().map_err(|e| self.io_err(e))?.is_dir();
            if is_dir {
                dirs.push(Box::new(child));
            } else {
                files.push(Box::new(child));
            }
        }
        Ok((files, dirs))
    }
}
