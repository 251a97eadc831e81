//! Bundle acquisition.
//!
//! The executor only needs a pre-materialized source directory; how the
//! bytes arrive is the fetcher's concern. The shipped [`DirFetcher`]
//! handles local directory sources; remote transports (git, https, s3)
//! are supplied by embedders.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Materializes a `source` URL into a destination directory.
pub trait Fetcher {
    fn fetch(&self, source: &str, dest: &Path) -> Result<()>;
}

/// Fetcher for sources naming a local directory, absolute or relative to
/// the config directory. The destination is refreshed on every run.
pub struct DirFetcher {
    base_dir: PathBuf,
}

impl DirFetcher {
    pub fn new(base_dir: PathBuf) -> Self {
        DirFetcher { base_dir }
    }
}

impl Fetcher for DirFetcher {
    fn fetch(&self, source: &str, dest: &Path) -> Result<()> {
        let src = {
            let path = Path::new(source);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.base_dir.join(path)
            }
        };
        if !src.is_dir() {
            return Err(Error::Fetch {
                source_url: source.to_string(),
                reason: format!("{} is not a directory", src.display()),
            });
        }
        if dest.exists() {
            fs::remove_dir_all(dest).map_err(|err| fetch_err(source, err))?;
        }
        copy_dir(&src, dest).map_err(|err| fetch_err(source, err))?;
        tracing::debug!(source, dest = %dest.display(), "fetched local source");
        Ok(())
    }
}

fn fetch_err(source: &str, err: std::io::Error) -> Error {
    Error::Fetch {
        source_url: source.to_string(),
        reason: err.to_string(),
    }
}

fn copy_dir(src: &Path, dest: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dest)?;
    let mut entries = fs::read_dir(src)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());
    for entry in entries {
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
