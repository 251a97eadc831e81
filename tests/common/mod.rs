//! Shared fixture for end-to-end pack runs.

use rpack::cancel::CancelToken;
use rpack::error::Result;
use rpack::executor::{Executor, RunReport};
use rpack::fetch::DirFetcher;
use rpack::script::ScriptEngine;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A workspace holding a local pack source and a config file, mirroring a
/// user's working directory.
pub struct Workspace {
    _tempdir: TempDir,
    pub root: PathBuf,
    pub pack_dir: PathBuf,
    pub config_path: PathBuf,
}

impl Workspace {
    /// Create a workspace with a pack named `demo` fetched from `./pack`.
    pub fn new() -> Self {
        let tempdir = TempDir::new().expect("create workspace tempdir");
        let root = tempdir.path().to_path_buf();
        let pack_dir = root.join("pack");
        std::fs::create_dir_all(&pack_dir).expect("create pack dir");
        write_file(
            &pack_dir.join("rpack.yaml"),
            "\"@schema_version\": v1\nname: demo\n",
        );
        write_file(&pack_dir.join("script.lua"), "-- placeholder\n");
        let config_path = root.join("demo.rpack.yaml");
        write_file(
            &config_path,
            "\"@schema_version\": v1\nsource: ./pack\n",
        );
        Workspace {
            _tempdir: tempdir,
            root,
            pack_dir,
            config_path,
        }
    }

    /// Replace the pack definition, e.g. to declare inputs.
    pub fn set_definition(&self, yaml: &str) {
        write_file(&self.pack_dir.join("rpack.yaml"), yaml);
    }

    /// Replace the pack script.
    pub fn set_script(&self, lua: &str) {
        write_file(&self.pack_dir.join("script.lua"), lua);
    }

    /// Replace the user config.
    pub fn set_config(&self, yaml: &str) {
        write_file(&self.config_path, yaml);
    }

    /// Add a file to the pack source.
    pub fn add_pack_file(&self, rel: &str, content: &str) {
        write_file(&self.pack_dir.join(rel), content);
    }

    /// Add a file to the working directory (e.g. a mapped input).
    pub fn add_work_file(&self, rel: &str, content: &str) {
        write_file(&self.root.join(rel), content);
    }

    pub fn work_path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub fn read_work_file(&self, rel: &str) -> String {
        std::fs::read_to_string(self.root.join(rel))
            .unwrap_or_else(|err| panic!("read {rel}: {err}"))
    }

    pub fn lockfile_path(&self) -> PathBuf {
        self.root.join("demo.rpack.lock.yaml")
    }

    /// Run the pack with the given engine and flags.
    pub fn run_with(
        &self,
        engine: &dyn ScriptEngine,
        force: bool,
        dry_run: bool,
    ) -> Result<RunReport> {
        let executor = Executor {
            override_exec_path: None,
            dry_run,
            force,
            schema_factory: None,
        };
        let fetcher = DirFetcher::new(self.root.clone());
        executor.run(&self.config_path, &fetcher, engine, &CancelToken::new())
    }

    pub fn run(&self, engine: &dyn ScriptEngine) -> Result<RunReport> {
        self.run_with(engine, false, false)
    }
}

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent directory");
    }
    std::fs::write(path, content.as_bytes()).expect("write file");
}
