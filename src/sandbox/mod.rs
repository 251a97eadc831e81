//! The mediated filesystem a pack script runs against.
//!
//! [`SandboxFs`] is the single surface the script sees. Every operation
//! resolves a friendly name through the ordered resolver list, runs the
//! hook chain (access control, purity tracking, recording) and only then
//! delegates to the handle. The resolver list is owned by the filesystem;
//! handles carry only the resolver identifier, never a back-pointer.

pub mod handle;
pub mod hooks;
pub mod recorder;
pub mod resolver;

pub use handle::{FileStat, Handle, HandleMeta};
pub use hooks::{AccessControl, AccessHook, PurityTracker};
pub use recorder::{AccessKind, Record, Recorder};
pub use resolver::{Resolver, MAP_RESOLVER, RPACK_RESOLVER, TARGET_RESOLVER, TEMP_RESOLVER};

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::inputs::ResolvedInput;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;

type SharedHook = Rc<RefCell<dyn AccessHook>>;

/// Mediated filesystem for one run.
pub struct SandboxFs {
    resolvers: Vec<Box<dyn Resolver>>,
    hooks: Vec<SharedHook>,
    purity: Rc<RefCell<PurityTracker>>,
    recorder: Rc<RefCell<Recorder>>,
    cancel: CancelToken,
}

impl SandboxFs {
    /// Wire the built-in resolvers and hooks for a run.
    pub fn new(
        source_path: &Path,
        run_path: &Path,
        temp_path: &Path,
        inputs: &[ResolvedInput],
        cancel: CancelToken,
    ) -> Self {
        let purity = Rc::new(RefCell::new(PurityTracker::new()));
        let recorder = Rc::new(RefCell::new(Recorder::new(None)));
        let hooks: Vec<SharedHook> = vec![
            Rc::new(RefCell::new(AccessControl)),
            purity.clone(),
            recorder.clone(),
        ];
        SandboxFs {
            resolvers: resolver::builtin_resolvers(source_path, run_path, temp_path, inputs),
            hooks,
            purity,
            recorder,
            cancel,
        }
    }

    fn resolve(&self, name: &str) -> Result<Box<dyn Handle>> {
        for resolver in &self.resolvers {
            if let Some(result) = resolver.resolve(name) {
                return result;
            }
        }
        Err(Error::Path {
            path: name.to_string(),
            reason: "unknown prefix".to_string(),
        })
    }

    fn run_hooks(&self, access: AccessKind, meta: &HandleMeta) -> Result<()> {
        for hook in &self.hooks {
            let mut hook = hook.borrow_mut();
            match access {
                AccessKind::Read => hook.on_read(meta)?,
                AccessKind::Write => hook.on_write(meta)?,
                AccessKind::Stat => hook.on_stat(meta)?,
                AccessKind::ReadDir => hook.on_readdir(meta)?,
            }
        }
        Ok(())
    }

    /// Full-file read.
    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.cancel.check()?;
        let handle = self.resolve(name)?;
        self.run_hooks(AccessKind::Read, &HandleMeta::of(handle.as_ref()))?;
        handle.read()
    }

    /// Full-file write, creating parent directories as needed.
    pub fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.cancel.check()?;
        let handle = self.resolve(name)?;
        self.run_hooks(AccessKind::Write, &HandleMeta::of(handle.as_ref()))?;
        handle.write(bytes)
    }

    /// Existence and kind of a path.
    pub fn stat(&self, name: &str) -> Result<FileStat> {
        self.cancel.check()?;
        let handle = self.resolve(name)?;
        self.run_hooks(AccessKind::Stat, &HandleMeta::of(handle.as_ref()))?;
        handle.stat()
    }

    /// List a directory, returning friendly paths of files and
    /// subdirectories. The listed directory itself is not included.
    pub fn read_dir(&self, name: &str) -> Result<(Vec<String>, Vec<String>)> {
        self.cancel.check()?;
        let handle = self.resolve(name)?;
        let meta = HandleMeta::of(handle.as_ref());

        self.run_hooks(AccessKind::Stat, &meta)?;
        let stat = handle.stat()?;
        if !stat.exists {
            return Err(Error::Path {
                path: name.to_string(),
                reason: "does not exist".to_string(),
            });
        }
        if !stat.is_dir {
            return Err(Error::Path {
                path: name.to_string(),
                reason: "is not a directory".to_string(),
            });
        }

        self.run_hooks(AccessKind::ReadDir, &meta)?;
        let (files, dirs) = handle.read_dir()?;

        // Children count as stat observations; listing a directory reveals
        // their existence.
        let mut file_names = Vec::with_capacity(files.len());
        for child in &files {
            self.run_hooks(AccessKind::Stat, &HandleMeta::of(child.as_ref()))?;
            file_names.push(child.friendly_path().to_string());
        }
        let mut dir_names = Vec::with_capacity(dirs.len());
        for child in &dirs {
            self.run_hooks(AccessKind::Stat, &HandleMeta::of(child.as_ref()))?;
            dir_names.push(child.friendly_path().to_string());
        }
        Ok((file_names, dir_names))
    }

    /// Breadth-first recursive listing, re-entering the mediated surface at
    /// every level so hooks apply to each directory.
    pub fn read_dir_recursive(&self, name: &str) -> Result<(Vec<String>, Vec<String>)> {
        let mut files = Vec::new();
        let mut dirs = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(name.to_string());
        while let Some(current) = queue.pop_front() {
            let (new_files, new_dirs) = self.read_dir(&current)?;
            files.extend(new_files);
            queue.extend(new_dirs.iter().cloned());
            dirs.extend(new_dirs);
        }
        Ok((files, dirs))
    }

    /// Run the purity conflict check over everything observed so far.
    pub fn check_purity(&self) -> Result<()> {
        self.purity.borrow().check_conflicts()
    }

    /// All recorded operations, in program order.
    pub fn records(&self) -> Vec<Record> {
        self.recorder.borrow().records().to_vec()
    }

    /// Handles written through the target resolver, in program order,
    /// duplicates included.
    pub fn target_writes(&self) -> Vec<HandleMeta> {
        self.recorder
            .borrow()
            .records()
            .iter()
            .filter(|record| {
                record.access == AccessKind::Write
                    && record.handle.resolver_id == TARGET_RESOLVER
            })
            .map(|record| record.handle.clone())
            .collect()
    }
}

#[cfg(test)]
#[path = "fs_tests.rs"]
mod tests;
