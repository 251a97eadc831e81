use super::{builtin_resolvers, Resolver};
use crate::error::Error;
use crate::inputs::{InputKind, ResolvedInput};
use crate::sandbox::handle::Handle;
use std::path::{Path, PathBuf};

fn inputs() -> Vec<ResolvedInput> {
    vec![
        ResolvedInput {
            name: "users".to_string(),
            user_path: PathBuf::from("users.yaml"),
            resolved_abs_path: PathBuf::from("/exec/users.yaml"),
            kind: InputKind::File,
        },
        ResolvedInput {
            name: "docs".to_string(),
            user_path: PathBuf::from("content/docs"),
            resolved_abs_path: PathBuf::from("/exec/content/docs"),
            kind: InputKind::Dir,
        },
    ]
}

fn resolve(name: &str) -> crate::error::Result<Box<dyn Handle>> {
    let resolvers = builtin_resolvers(
        Path::new("/cache/source"),
        Path::new("/cache/run"),
        Path::new("/cache/tmp"),
        &inputs(),
    );
    for resolver in &resolvers {
        if let Some(result) = resolver.resolve(name) {
            return result;
        }
    }
    panic!("no resolver matched {name:?}");
}

#[test]
fn rpack_names_resolve_into_the_source_tree() {
    let handle = resolve("rpack:files/intro.md").unwrap();
    assert_eq!(handle.resolver_id(), "rpack");
    assert_eq!(handle.friendly_path(), "rpack:files/intro.md");
    assert_eq!(
        handle.indirect_target_path(),
        Path::new("files/intro.md")
    );
}

#[test]
fn temp_names_resolve_into_the_scratch_tree() {
    let handle = resolve("temp:./notes.txt").unwrap();
    assert_eq!(handle.resolver_id(), "temp");
    assert_eq!(handle.friendly_path(), "temp:notes.txt");
}

#[test]
fn unprefixed_names_resolve_to_the_target() {
    let handle = resolve("./out/report.md").unwrap();
    assert_eq!(handle.resolver_id(), "target");
    assert_eq!(handle.friendly_path(), "out/report.md");
    assert_eq!(
        handle.indirect_target_path(),
        Path::new("out/report.md")
    );
}

#[test]
fn map_name_alone_resolves_to_the_mapped_input() {
    let handle = resolve("map:users").unwrap();
    assert_eq!(handle.resolver_id(), "map");
    assert_eq!(handle.friendly_path(), "map:users");
    // The indirect path is the user-relative location in the exec dir.
    assert_eq!(handle.indirect_target_path(), Path::new("users.yaml"));
}

#[test]
fn map_subpaths_require_a_directory_input() {
    let handle = resolve("map:docs/guide/intro.md").unwrap();
    assert_eq!(
        handle.indirect_target_path(),
        Path::new("content/docs/guide/intro.md")
    );

    assert!(matches!(
        resolve("map:users/extra"),
        Err(Error::Path { reason, .. }) if reason.contains("not a directory")
    ));
}

#[test]
fn unknown_mapped_inputs_fail() {
    assert!(matches!(
        resolve("map:ghost"),
        Err(Error::Path { reason, .. }) if reason.contains("unknown mapped input")
    ));
}

#[test]
fn unknown_prefixes_fail_instead_of_becoming_target_files() {
    assert!(matches!(
        resolve("s3:bucket/key"),
        Err(Error::Path { reason, .. }) if reason == "unknown prefix"
    ));
    // A colon later in the path is an ordinary file name.
    assert!(resolve("dir/we:ird").is_ok());
}

#[test]
fn escaping_and_absolute_tails_fail_for_every_namespace() {
    for name in [
        "rpack:../escape",
        "temp:/abs",
        "map:docs/../../escape",
        "../escape",
        "/abs",
    ] {
        assert!(
            matches!(resolve(name), Err(Error::Path { .. })),
            "expected {name:?} to be rejected"
        );
    }
}
