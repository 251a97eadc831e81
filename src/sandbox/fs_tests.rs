use super::{AccessKind, SandboxFs};
use crate::cancel::CancelToken;
use crate::error::Error;
use crate::inputs::{InputKind, ResolvedInput};
use std::path::{Path, PathBuf};

struct Fixture {
    root: PathBuf,
    source: PathBuf,
    run: PathBuf,
    temp: PathBuf,
    exec: PathBuf,
}

impl Fixture {
    fn new(tag: &str) -> Self {
        let root = std::env::temp_dir().join(format!("rpack-fs-{tag}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        let fixture = Fixture {
            source: root.join("source"),
            run: root.join("run"),
            temp: root.join("tmp"),
            exec: root.join("exec"),
            root,
        };
        for dir in [&fixture.source, &fixture.run, &fixture.temp, &fixture.exec] {
            std::fs::create_dir_all(dir).expect("create fixture dir");
        }
        fixture
    }

    fn fs(&self, inputs: &[ResolvedInput]) -> SandboxFs {
        SandboxFs::new(&self.source, &self.run, &self.temp, inputs, CancelToken::new())
    }

    fn file_input(&self, name: &str, user_path: &str, content: &[u8]) -> ResolvedInput {
        let abs = self.exec.join(user_path);
        if let Some(parent) = abs.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&abs, content).unwrap();
        ResolvedInput {
            name: name.to_string(),
            user_path: PathBuf::from(user_path),
            resolved_abs_path: abs,
            kind: InputKind::File,
        }
    }

    fn dir_input(&self, name: &str, user_path: &str) -> ResolvedInput {
        let abs = self.exec.join(user_path);
        std::fs::create_dir_all(&abs).unwrap();
        ResolvedInput {
            name: name.to_string(),
            user_path: PathBuf::from(user_path),
            resolved_abs_path: abs,
            kind: InputKind::Dir,
        }
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

#[test]
fn target_writes_land_in_the_run_directory() {
    let fx = Fixture::new("target-write");
    let fs = fx.fs(&[]);
    fs.write("./out/hello.txt", b"hi").expect("write target");
    assert_eq!(
        std::fs::read(fx.run.join("out/hello.txt")).unwrap(),
        b"hi"
    );
}

#[test]
fn target_reads_are_denied() {
    let fx = Fixture::new("target-read");
    let fs = fx.fs(&[]);
    fs.write("out.txt", b"x").unwrap();
    assert!(matches!(
        fs.read("out.txt"),
        Err(Error::AccessDenied { op: "read", .. })
    ));
    assert!(matches!(
        fs.stat("out.txt"),
        Err(Error::AccessDenied { op: "stat", .. })
    ));
}

#[test]
fn rpack_writes_are_denied_before_touching_disk() {
    let fx = Fixture::new("rpack-write");
    let fs = fx.fs(&[]);
    let err = fs.write("rpack:foo", b"x").unwrap_err();
    assert!(matches!(err, Error::AccessDenied { op: "write", .. }));
    assert!(!fx.source.join("foo").exists());
    // Denied operations are not recorded.
    assert!(fs.records().is_empty());
}

#[test]
fn temp_round_trips_and_never_enters_the_write_set() {
    let fx = Fixture::new("temp");
    let fs = fx.fs(&[]);
    fs.write("temp:scratch/w.txt", b"tmp").unwrap();
    assert_eq!(fs.read("temp:scratch/w.txt").unwrap(), b"tmp");
    fs.write("kept.txt", b"kept").unwrap();

    let writes = fs.target_writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].indirect_target_path, Path::new("kept.txt"));
}

#[test]
fn read_dir_lists_friendly_paths_sorted() {
    let fx = Fixture::new("readdir");
    std::fs::create_dir_all(fx.source.join("files/sub")).unwrap();
    std::fs::write(fx.source.join("files/b.txt"), b"b").unwrap();
    std::fs::write(fx.source.join("files/a.txt"), b"a").unwrap();
    let fs = fx.fs(&[]);

    let (files, dirs) = fs.read_dir("rpack:files").expect("read dir");
    assert_eq!(files, vec!["rpack:files/a.txt", "rpack:files/b.txt"]);
    assert_eq!(dirs, vec!["rpack:files/sub"]);
}

#[test]
fn read_dir_recursive_walks_breadth_first() {
    let fx = Fixture::new("recursive");
    std::fs::create_dir_all(fx.source.join("d/x")).unwrap();
    std::fs::create_dir_all(fx.source.join("d/y")).unwrap();
    std::fs::write(fx.source.join("d/top.txt"), b"1").unwrap();
    std::fs::write(fx.source.join("d/x/inner.txt"), b"2").unwrap();
    let fs = fx.fs(&[]);

    let (files, dirs) = fs.read_dir_recursive("rpack:d").expect("walk");
    assert_eq!(files, vec!["rpack:d/top.txt", "rpack:d/x/inner.txt"]);
    assert_eq!(dirs, vec!["rpack:d/x", "rpack:d/y"]);
}

#[test]
fn read_dir_on_files_and_missing_paths_fails() {
    let fx = Fixture::new("readdir-bad");
    std::fs::write(fx.source.join("plain.txt"), b"x").unwrap();
    let fs = fx.fs(&[]);
    assert!(matches!(
        fs.read_dir("rpack:plain.txt"),
        Err(Error::Path { reason, .. }) if reason.contains("not a directory")
    ));
    assert!(matches!(
        fs.read_dir("rpack:ghost"),
        Err(Error::Path { reason, .. }) if reason.contains("does not exist")
    ));
}

#[test]
fn mapped_reads_then_target_write_of_same_path_fail_purity() {
    let fx = Fixture::new("purity");
    let input = fx.file_input("x", "x.yaml", b"data: 1\n");
    let fs = fx.fs(&[input]);

    fs.read("map:x").expect("read mapped input");
    fs.write("x.yaml", b"data: 2\n").expect("write target");
    assert!(matches!(fs.check_purity(), Err(Error::Purity { .. })));
}

#[test]
fn listing_a_mapped_dir_then_writing_into_it_fails_purity() {
    let fx = Fixture::new("purity-dir");
    let input = fx.dir_input("docs", "docs");
    std::fs::write(fx.exec.join("docs/a.md"), b"a").unwrap();
    let fs = fx.fs(&[input]);

    fs.read_dir("map:docs").expect("list mapped dir");
    fs.write("docs/new.md", b"n").expect("write into listed dir");
    assert!(matches!(fs.check_purity(), Err(Error::Purity { .. })));
}

#[test]
fn records_preserve_program_order() {
    let fx = Fixture::new("records");
    std::fs::write(fx.source.join("in.txt"), b"1").unwrap();
    let fs = fx.fs(&[]);

    fs.read("rpack:in.txt").unwrap();
    fs.write("out.txt", b"1").unwrap();
    fs.write("out.txt", b"2").unwrap();

    let records = fs.records();
    let kinds: Vec<_> = records.iter().map(|r| r.access).collect();
    assert_eq!(
        kinds,
        vec![AccessKind::Read, AccessKind::Write, AccessKind::Write]
    );
    // Duplicate writes stay in the raw record; dedup happens at commit.
    assert_eq!(fs.target_writes().len(), 2);
}

#[test]
fn unknown_prefix_fails_any_operation() {
    let fx = Fixture::new("unknown-prefix");
    let fs = fx.fs(&[]);
    assert!(matches!(fs.read("s3:x"), Err(Error::Path { .. })));
    assert!(matches!(fs.write("s3:x", b"b"), Err(Error::Path { .. })));
    assert!(matches!(fs.stat("git::x"), Err(Error::Path { .. })));
}

#[test]
fn cancellation_interrupts_before_the_operation() {
    let fx = Fixture::new("cancel");
    let cancel = CancelToken::new();
    let fs = SandboxFs::new(&fx.source, &fx.run, &fx.temp, &[], cancel.clone());
    fs.write("ok.txt", b"1").unwrap();
    cancel.cancel();
    assert!(matches!(fs.write("no.txt", b"2"), Err(Error::Cancelled)));
    assert!(!fx.run.join("no.txt").exists());
}
