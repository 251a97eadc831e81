//! Access-control and purity hooks.
//!
//! Every mediated operation runs the hook chain in registration order
//! before the handle is touched; the first failing hook aborts the
//! operation. Hooks only mutate in-memory state.

use crate::error::{Error, Result};
use crate::sandbox::handle::HandleMeta;
use crate::sandbox::resolver::{MAP_RESOLVER, RPACK_RESOLVER, TARGET_RESOLVER};
use std::path::Path;

/// Hook invoked around every handle operation.
pub trait AccessHook {
    fn on_read(&mut self, handle: &HandleMeta) -> Result<()>;
    fn on_write(&mut self, handle: &HandleMeta) -> Result<()>;
    fn on_stat(&mut self, handle: &HandleMeta) -> Result<()>;
    fn on_readdir(&mut self, handle: &HandleMeta) -> Result<()>;
}

/// Static location rules.
///
/// The target directory is write-only from the script's perspective:
/// previous-run state must never leak into the current computation. The
/// pack source and mapped inputs are read-only.
#[derive(Debug, Default)]
pub struct AccessControl;

impl AccessControl {
    fn deny_target_read(op: &'static str, handle: &HandleMeta) -> Result<()> {
        if handle.resolver_id == TARGET_RESOLVER {
            return Err(Error::AccessDenied {
                op,
                path: handle.friendly_path.clone(),
                hint: "no access to read from the target directory, use 'rpack:' instead"
                    .to_string(),
            });
        }
        Ok(())
    }
}

impl AccessHook for AccessControl {
    fn on_read(&mut self, handle: &HandleMeta) -> Result<()> {
        Self::deny_target_read("read", handle)
    }

    fn on_write(&mut self, handle: &HandleMeta) -> Result<()> {
        match handle.resolver_id {
            RPACK_RESOLVER => Err(Error::AccessDenied {
                op: "write",
                path: handle.friendly_path.clone(),
                hint: "use `temp:` instead".to_string(),
            }),
            MAP_RESOLVER => Err(Error::AccessDenied {
                op: "write",
                path: handle.friendly_path.clone(),
                hint: "use `target` instead".to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn on_stat(&mut self, handle: &HandleMeta) -> Result<()> {
        Self::deny_target_read("stat", handle)
    }

    fn on_readdir(&mut self, handle: &HandleMeta) -> Result<()> {
        Self::deny_target_read("readdir", handle)
    }
}

/// Tracks mapped-input observations and target writes, and detects
/// observe/produce overlaps after the script has finished.
///
/// A file that can be both observed and produced admits a run whose output
/// depends on the prior run's output, which breaks idempotency. The order
/// of the observation and the write does not matter: a first run may
/// execute the write while a second run takes the read path.
#[derive(Debug, Default)]
pub struct PurityTracker {
    reads: Vec<HandleMeta>,
    stats: Vec<HandleMeta>,
    readdirs: Vec<HandleMeta>,
    writes: Vec<HandleMeta>,
}

impl PurityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check all recorded observations against all recorded writes.
    pub fn check_conflicts(&self) -> Result<()> {
        for (observed_op, observed) in self
            .reads
            .iter()
            .map(|h| ("read", h))
            .chain(self.stats.iter().map(|h| ("stat", h)))
        {
            for written in &self.writes {
                if observed.indirect_target_path == written.indirect_target_path {
                    return Err(Error::Purity {
                        observed_op,
                        observed: observed.friendly_path.clone(),
                        written: written.friendly_path.clone(),
                    });
                }
            }
        }
        for listed in &self.readdirs {
            for written in &self.writes {
                if is_direct_child(&listed.indirect_target_path, &written.indirect_target_path) {
                    return Err(Error::Purity {
                        observed_op: "readdir",
                        observed: listed.friendly_path.clone(),
                        written: written.friendly_path.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Whether `target` sits one level below `dir`, i.e. matches the glob
/// `dir/*`. `dir` of `.` matches any single-component target.
fn is_direct_child(dir: &Path, target: &Path) -> bool {
    match target.parent() {
        Some(parent) if parent.as_os_str().is_empty() => dir == Path::new("."),
        Some(parent) => dir == parent,
        None => false,
    }
}

impl AccessHook for PurityTracker {
    fn on_read(&mut self, handle: &HandleMeta) -> Result<()> {
        if handle.resolver_id == MAP_RESOLVER {
            self.reads.push(handle.clone());
        }
        Ok(())
    }

    fn on_write(&mut self, handle: &HandleMeta) -> Result<()> {
        if handle.resolver_id == TARGET_RESOLVER {
            self.writes.push(handle.clone());
        }
        Ok(())
    }

    fn on_stat(&mut self, handle: &HandleMeta) -> Result<()> {
        if handle.resolver_id == MAP_RESOLVER {
            self.stats.push(handle.clone());
        }
        Ok(())
    }

    fn on_readdir(&mut self, handle: &HandleMeta) -> Result<()> {
        if handle.resolver_id == MAP_RESOLVER {
            self.readdirs.push(handle.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "hooks_tests.rs"]
mod tests;
