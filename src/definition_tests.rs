use super::{load_definition, validate_inputs, DefInput, PackDefinition};
use crate::error::Error;
use crate::inputs::{InputKind, ResolvedInput};
use std::path::{Path, PathBuf};

fn definition(name: &str, inputs: Vec<DefInput>) -> PackDefinition {
    PackDefinition {
        schema_version: "v1".to_string(),
        name: name.to_string(),
        inputs,
    }
}

fn def_input(kind: InputKind, name: &str) -> DefInput {
    DefInput {
        kind,
        name: name.to_string(),
    }
}

fn resolved(name: &str, kind: InputKind) -> ResolvedInput {
    ResolvedInput {
        name: name.to_string(),
        user_path: PathBuf::from(name),
        resolved_abs_path: PathBuf::from("/exec").join(name),
        kind,
    }
}

fn temp_source(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rpack-def-{tag}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create source dir");
    dir
}

#[test]
fn validates_names_against_identifier_patterns() {
    let def_path = Path::new("rpack.yaml");
    assert!(definition("my-pack_01", vec![]).validate(def_path).is_ok());
    assert!(definition("", vec![]).validate(def_path).is_err());
    assert!(definition("has space", vec![]).validate(def_path).is_err());
    assert!(definition("x".repeat(65).as_str(), vec![])
        .validate(def_path)
        .is_err());

    // Input names additionally allow dots.
    let ok = definition("p", vec![def_input(InputKind::File, "users.yaml")]);
    assert!(ok.validate(def_path).is_ok());
    let bad = definition("p", vec![def_input(InputKind::File, "a/b")]);
    assert!(bad.validate(def_path).is_err());
}

#[test]
fn duplicate_declared_inputs_are_a_definition_conflict() {
    let def = definition(
        "p",
        vec![
            def_input(InputKind::File, "x"),
            def_input(InputKind::Dir, "x"),
        ],
    );
    assert!(matches!(
        def.validate(Path::new("rpack.yaml")),
        Err(Error::Definition { reason, .. }) if reason.contains("twice")
    ));
}

#[test]
fn resolved_inputs_must_be_declared_with_matching_kind() {
    let def_path = Path::new("rpack.yaml");
    let def = definition("p", vec![def_input(InputKind::File, "users")]);

    validate_inputs(&def, def_path, &[resolved("users", InputKind::File)]).expect("kinds match");

    assert!(matches!(
        validate_inputs(&def, def_path, &[resolved("users", InputKind::Dir)]),
        Err(Error::InputResolution { reason, .. }) if reason.contains("type file")
    ));
    assert!(matches!(
        validate_inputs(&def, def_path, &[resolved("other", InputKind::File)]),
        Err(Error::InputResolution { reason, .. }) if reason.contains("not declared")
    ));
}

#[test]
fn load_requires_definition_and_script() {
    let dir = temp_source("load");
    // No rpack.yaml at all.
    assert!(matches!(
        load_definition(&dir, None),
        Err(Error::Definition { .. })
    ));

    std::fs::write(
        dir.join("rpack.yaml"),
        "\"@schema_version\": v1\nname: demo\ninputs:\n- type: file\n  name: users\n",
    )
    .unwrap();
    // Script still missing.
    assert!(matches!(
        load_definition(&dir, None),
        Err(Error::Definition { reason, .. }) if reason.contains("script.lua")
    ));

    std::fs::write(dir.join("script.lua"), "-- empty\n").unwrap();
    let instance = load_definition(&dir, None).expect("load definition");
    assert_eq!(instance.definition.name, "demo");
    assert_eq!(instance.definition.inputs.len(), 1);
    assert_eq!(instance.script_path, dir.join("script.lua"));
    instance
        .validate_values(&serde_json::json!({"any": "thing"}))
        .expect("empty validator accepts");

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn schema_bytes_reach_the_configured_factory() {
    let dir = temp_source("schema");
    std::fs::write(dir.join("rpack.yaml"), "\"@schema_version\": v1\nname: demo\n").unwrap();
    std::fs::write(dir.join("script.lua"), "-- empty\n").unwrap();
    std::fs::write(dir.join("schema.cue"), "#Schema: {author: string}\n").unwrap();

    struct RejectAll;
    impl super::SchemaValidator for RejectAll {
        fn validate(&self, _values: &serde_json::Value) -> crate::error::Result<()> {
            Err(Error::Definition {
                path: PathBuf::from("schema.cue"),
                reason: "rejected".to_string(),
            })
        }
    }

    let factory: super::SchemaValidatorFactory = Box::new(|bytes: &[u8]| {
        assert!(std::str::from_utf8(bytes).unwrap().contains("#Schema"));
        Ok(Box::new(RejectAll))
    });
    let instance = load_definition(&dir, Some(&factory)).expect("load with factory");
    assert!(instance
        .validate_values(&serde_json::json!({"author": 1}))
        .is_err());

    let _ = std::fs::remove_dir_all(dir);
}
