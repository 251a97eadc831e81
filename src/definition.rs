//! Pack definition (`rpack.yaml`) loading, validation, and the value-schema
//! seam.

use crate::error::{Error, Result};
use crate::inputs::{InputKind, ResolvedInput};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFINITION_FILENAME: &str = "rpack.yaml";
pub const SCHEMA_FILENAME: &str = "schema.cue";
pub const SCRIPT_FILENAME: &str = "script.lua";
pub const DEFINITION_SCHEMA_VERSION: &str = "v1";

const NAME_PATTERN: &str = r"^[A-Za-z0-9_\-]{1,64}$";
const INPUT_NAME_PATTERN: &str = r"^[A-Za-z0-9_\-.]{1,64}$";

/// The parsed `rpack.yaml` inside a pack source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackDefinition {
    #[serde(rename = "@schema_version")]
    pub schema_version: String,

    pub name: String,

    /// Inputs the pack expects the user to map.
    #[serde(default)]
    pub inputs: Vec<DefInput>,
}

/// One declared input: its kind and the name scripts reference it by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefInput {
    #[serde(rename = "type")]
    pub kind: InputKind,
    pub name: String,
}

/// Validates user values against a pack's optional schema.
///
/// CUE evaluation is delegated to the embedder; the shipped default accepts
/// everything.
pub trait SchemaValidator {
    fn validate(&self, values: &serde_json::Value) -> Result<()>;
}

/// No-op validator used when the pack carries no schema (or no evaluator
/// is configured).
pub struct EmptyValidator;

impl SchemaValidator for EmptyValidator {
    fn validate(&self, _values: &serde_json::Value) -> Result<()> {
        Ok(())
    }
}

/// Builds a [`SchemaValidator`] from the raw bytes of `schema.cue`.
pub type SchemaValidatorFactory = Box<dyn Fn(&[u8]) -> Result<Box<dyn SchemaValidator>>>;

/// A pack definition prepared for execution.
pub struct DefinitionInstance {
    /// Directory the definition was loaded from.
    pub source_path: PathBuf,
    pub definition: PackDefinition,
    pub script_path: PathBuf,
    validator: Box<dyn SchemaValidator>,
}

impl DefinitionInstance {
    pub fn validate_values(&self, values: &serde_json::Value) -> Result<()> {
        self.validator.validate(values)
    }

    pub fn def_path(&self) -> PathBuf {
        self.source_path.join(DEFINITION_FILENAME)
    }
}

fn ident_regex(pattern: &str, def_path: &Path) -> Result<Regex> {
    Regex::new(pattern).map_err(|err| Error::Definition {
        path: def_path.to_path_buf(),
        reason: format!("invalid identifier pattern: {err}"),
    })
}

impl PackDefinition {
    /// Structural validation of the definition itself.
    pub fn validate(&self, def_path: &Path) -> Result<()> {
        if self.schema_version != DEFINITION_SCHEMA_VERSION {
            return Err(Error::Definition {
                path: def_path.to_path_buf(),
                reason: format!(
                    "unsupported schema version {:?}, supported {:?}",
                    self.schema_version, DEFINITION_SCHEMA_VERSION
                ),
            });
        }
        let name_re = ident_regex(NAME_PATTERN, def_path)?;
        if !name_re.is_match(&self.name) {
            return Err(Error::Definition {
                path: def_path.to_path_buf(),
                reason: format!("pack name {:?} does not match {NAME_PATTERN}", self.name),
            });
        }
        let input_re = ident_regex(INPUT_NAME_PATTERN, def_path)?;
        let mut seen = HashSet::new();
        for input in &self.inputs {
            if !input_re.is_match(&input.name) {
                return Err(Error::Definition {
                    path: def_path.to_path_buf(),
                    reason: format!(
                        "input name {:?} does not match {INPUT_NAME_PATTERN}",
                        input.name
                    ),
                });
            }
            if !seen.insert(input.name.as_str()) {
                return Err(Error::Definition {
                    path: def_path.to_path_buf(),
                    reason: format!("input {:?} declared twice", input.name),
                });
            }
        }
        Ok(())
    }
}

/// Load and validate a pack definition from a fetched source directory.
///
/// Requires `rpack.yaml` and `script.lua`; wires the optional `schema.cue`
/// through `schema_factory` when one is configured.
pub fn load_definition(
    source_path: &Path,
    schema_factory: Option<&SchemaValidatorFactory>,
) -> Result<DefinitionInstance> {
    let def_path = source_path.join(DEFINITION_FILENAME);
    let bytes = fs::read(&def_path).map_err(|err| Error::Definition {
        path: def_path.clone(),
        reason: err.to_string(),
    })?;
    let definition: PackDefinition =
        serde_yaml::from_slice(&bytes).map_err(|err| Error::Definition {
            path: def_path.clone(),
            reason: err.to_string(),
        })?;
    definition.validate(&def_path)?;

    let schema_path = source_path.join(SCHEMA_FILENAME);
    let validator: Box<dyn SchemaValidator> = if schema_path.is_file() {
        let schema_bytes = fs::read(&schema_path).map_err(|err| Error::Definition {
            path: schema_path.clone(),
            reason: err.to_string(),
        })?;
        match schema_factory {
            Some(factory) => factory(&schema_bytes)?,
            None => {
                tracing::warn!(
                    path = %schema_path.display(),
                    "pack carries a values schema but no validator is configured; skipping"
                );
                Box::new(EmptyValidator)
            }
        }
    } else {
        Box::new(EmptyValidator)
    };

    let script_path = source_path.join(SCRIPT_FILENAME);
    if !script_path.is_file() {
        return Err(Error::Definition {
            path: script_path,
            reason: format!("missing {SCRIPT_FILENAME}"),
        });
    }

    Ok(DefinitionInstance {
        source_path: source_path.to_path_buf(),
        definition,
        script_path,
        validator,
    })
}

/// Cross-check resolved user inputs against the declared inputs.
///
/// Every resolved input must be declared with a matching kind; duplicate
/// declarations are a definition conflict.
pub fn validate_inputs(
    definition: &PackDefinition,
    def_path: &Path,
    resolved: &[ResolvedInput],
) -> Result<()> {
    let mut declared_names = HashSet::new();
    for declared in &definition.inputs {
        if !declared_names.insert(declared.name.as_str()) {
            return Err(Error::Definition {
                path: def_path.to_path_buf(),
                reason: format!("input {:?} declared twice", declared.name),
            });
        }
    }

    let mut resolved_names = HashSet::new();
    for input in resolved {
        if !resolved_names.insert(input.name.as_str()) {
            return Err(Error::InputResolution {
                name: input.name.clone(),
                reason: "supplied twice".to_string(),
            });
        }
        let declared = definition
            .inputs
            .iter()
            .find(|declared| declared.name == input.name)
            .ok_or_else(|| Error::InputResolution {
                name: input.name.clone(),
                reason: "not declared by the pack definition".to_string(),
            })?;
        if declared.kind != input.kind {
            return Err(Error::InputResolution {
                name: input.name.clone(),
                reason: format!(
                    "definition requires type {}, but found {}",
                    declared.kind, input.kind
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "definition_tests.rs"]
mod tests;
