//! Run driver: stage, execute, gate, and commit a pack run.

use crate::cancel::CancelToken;
use crate::config::{self, ConfigInstance};
use crate::definition::{self, SchemaValidatorFactory};
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::inputs;
use crate::lockfile::Lockfile;
use crate::paths::RunPaths;
use crate::sandbox::SandboxFs;
use crate::script::{ScriptApi, ScriptEngine};
use crate::util::{file_exists, sha256_file};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Drives a full pack run against one config file.
///
/// The executor owns the staging trees for the duration of the run; the
/// execution path is not touched until every gate has passed.
#[derive(Default)]
pub struct Executor {
    /// Override for the execution path; defaults to the config directory.
    pub override_exec_path: Option<PathBuf>,

    /// Stop after the gates; leave the staging tree as the result.
    pub dry_run: bool,

    /// Overwrite modified or unmanaged files instead of aborting.
    pub force: bool,

    /// Builds a values validator from `schema.cue` bytes when the embedder
    /// provides an evaluator.
    pub schema_factory: Option<SchemaValidatorFactory>,
}

/// What a run did, for callers and tests.
#[derive(Debug)]
pub struct RunReport {
    pub exec_path: PathBuf,
    /// Staging directory; the observable result of a dry run.
    pub staging_path: PathBuf,
    /// Target-relative paths written by the script, in first-seen order.
    pub written: Vec<String>,
    /// Paths newly managed compared to the previous lockfile.
    pub added: Vec<String>,
    /// Paths no longer produced and removed from the target.
    pub removed: Vec<String>,
    pub dry_run: bool,
}

/// One deduplicated target write with its staged location and checksum.
struct StagedWrite {
    rel_path: String,
    staged_path: PathBuf,
    sha: String,
}

impl Executor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute the config at `config_path` to completion.
    pub fn run(
        &self,
        config_path: &Path,
        fetcher: &dyn Fetcher,
        engine: &dyn ScriptEngine,
        cancel: &CancelToken,
    ) -> Result<RunReport> {
        let ci = config::load_config(config_path)?;
        let exec_path = self.exec_path(&ci);

        cancel.check()?;
        let paths = RunPaths::new(&exec_path, &ci.config.source, &ci.config_path);
        paths.prepare()?;
        fetcher.fetch(&ci.config.source, &paths.source_path)?;

        let resolved = inputs::resolve_inputs(&ci.config.config.inputs, &exec_path)?;

        let definst =
            definition::load_definition(&paths.source_path, self.schema_factory.as_ref())?;
        definst.validate_values(&ci.config.config.values)?;
        definition::validate_inputs(&definst.definition, &definst.def_path(), &resolved)?;

        let script_source =
            fs::read_to_string(&definst.script_path).map_err(|err| Error::Definition {
                path: definst.script_path.clone(),
                reason: err.to_string(),
            })?;

        cancel.check()?;
        let sandbox = SandboxFs::new(
            &paths.source_path,
            &paths.run_path,
            &paths.temp_path,
            &resolved,
            cancel.clone(),
        );
        let input_names: Vec<String> = ci.config.config.inputs.keys().cloned().collect();
        let api = ScriptApi::new(&sandbox, &ci.config.config.values, input_names);
        engine.execute(&script_source, &api)?;
        tracing::info!(pack = %definst.definition.name, "script execution successful");

        sandbox.check_purity()?;
        tracing::debug!(
            operations = sandbox.records().len(),
            "mediated filesystem interactions"
        );

        let writes = self.staged_writes(&sandbox, &paths)?;

        cancel.check()?;
        let old_integrity = ci.lockfile.check_integrity(&exec_path)?;
        if !old_integrity.modified.is_empty() {
            let joined = old_integrity.modified.join(",");
            tracing::warn!(files = %joined, "managed files were modified outside of rpack");
            if !self.force {
                return Err(Error::Integrity {
                    reason: "managed files were modified outside of rpack, use the force flag to ignore"
                        .to_string(),
                    paths: joined,
                });
            }
        }
        if !old_integrity.removed.is_empty() {
            tracing::warn!(
                files = %old_integrity.removed.join(","),
                "managed files were removed outside of rpack"
            );
        }

        let mut new_lockfile = Lockfile::new();
        for write in &writes {
            new_lockfile.add_file(write.rel_path.clone(), write.sha.clone());
        }

        let changes = new_lockfile.changes(&ci.lockfile);
        tracing::info!(added = ?changes.added, removed = ?changes.removed, "lockfile diff");

        let mut would_overwrite = Vec::new();
        for added in &changes.added {
            let target = exec_path.join(added);
            if file_exists(&target)? {
                tracing::warn!(file = %added, "unmanaged file exists at a new target path");
                would_overwrite.push(added.clone());
            }
        }
        if !would_overwrite.is_empty() && !self.force {
            return Err(Error::Integrity {
                reason: "existing files would be overwritten, use the force flag to ignore"
                    .to_string(),
                paths: would_overwrite.join(","),
            });
        }

        let report = RunReport {
            exec_path: exec_path.clone(),
            staging_path: paths.run_path.clone(),
            written: writes.iter().map(|w| w.rel_path.clone()).collect(),
            added: changes.added.clone(),
            removed: changes.removed.clone(),
            dry_run: self.dry_run,
        };

        if self.dry_run {
            tracing::info!(staging = %paths.run_path.display(), "dry run, skipping commit");
            return Ok(report);
        }

        // No two-phase commit: a failure from here on leaves partially
        // applied state which the next successful run reconciles.
        tracing::debug!(
            "materializing staged writes; a failure past this point leaves partial state"
        );
        cancel.check()?;
        for write in &writes {
            let target = exec_path.join(&write.rel_path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|err| Error::commit(parent, err))?;
            }
            move_or_copy(&write.staged_path, &target)?;
        }

        cancel.check()?;
        for removed in &changes.removed {
            let target = exec_path.join(removed);
            match file_exists(&target) {
                Ok(true) => {
                    fs::remove_file(&target).map_err(|err| Error::commit(&target, err))?
                }
                Ok(false) => {
                    tracing::warn!(file = %removed, "managed file marked for removal is already gone");
                }
                Err(err) => return Err(Error::commit(&target, err)),
            }
        }

        new_lockfile.write(&ci.lockfile_path)?;
        Ok(report)
    }

    fn exec_path(&self, ci: &ConfigInstance) -> PathBuf {
        self.override_exec_path
            .clone()
            .unwrap_or_else(|| ci.config_dir.clone())
    }

    /// Deduplicate target writes by indirect path (first seen wins for
    /// ordering; the staged file already holds the last content) and
    /// checksum the staged files.
    fn staged_writes(&self, sandbox: &SandboxFs, paths: &RunPaths) -> Result<Vec<StagedWrite>> {
        let mut seen = HashSet::new();
        let mut writes = Vec::new();
        for handle in sandbox.target_writes() {
            let rel_path = handle.indirect_target_path.to_string_lossy().into_owned();
            if !seen.insert(rel_path.clone()) {
                tracing::debug!(file = %rel_path, "written multiple times, staged once");
                continue;
            }
            let staged_path = paths.run_path.join(&handle.indirect_target_path);
            let sha = sha256_file(&staged_path).map_err(|err| Error::Lockfile {
                path: staged_path.clone(),
                reason: format!("checksum computation failed: {err}"),
            })?;
            writes.push(StagedWrite {
                rel_path,
                staged_path,
                sha,
            });
        }
        Ok(writes)
    }
}

/// Rename the staged file into place, falling back to a copy when the
/// rename fails (e.g. across devices).
fn move_or_copy(staged: &Path, target: &Path) -> Result<()> {
    if fs::rename(staged, target).is_ok() {
        return Ok(());
    }
    fs::copy(staged, target)
        .map(|_| ())
        .map_err(|err| Error::commit(target, err))
}
