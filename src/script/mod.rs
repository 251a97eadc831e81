//! The library a pack script programs against, and the engine seam.
//!
//! [`ScriptApi`] performs all of its IO through the mediated filesystem; a
//! [`ScriptEngine`] is the capability provider that binds those functions
//! into an interpreter. The shipped engine embeds Lua ([`lua::LuaEngine`]);
//! [`ScriptFn`] lets embedders and tests drive the API from plain Rust.

pub mod lua;
pub mod query;
pub mod template;

use crate::error::{Error, Result};
use crate::sandbox::SandboxFs;
use serde::Serialize;

/// Executes a pack script against the script-facing library.
pub trait ScriptEngine {
    fn execute(&self, source: &str, api: &ScriptApi<'_>) -> Result<()>;
}

/// Engine backed by a Rust closure instead of an interpreter.
pub struct ScriptFn<F>(pub F);

impl<F> ScriptEngine for ScriptFn<F>
where
    F: Fn(&ScriptApi<'_>) -> Result<()>,
{
    fn execute(&self, _source: &str, api: &ScriptApi<'_>) -> Result<()> {
        (self.0)(api)
    }
}

/// Result of [`ScriptApi::read_lines`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lines {
    pub lines: Vec<String>,
    pub separator: String,
    pub final_newline: bool,
}

/// The script-visible functions. Every IO path goes through the sandbox.
pub struct ScriptApi<'a> {
    fs: &'a SandboxFs,
    values: &'a serde_json::Value,
    inputs: Vec<String>,
}

impl<'a> ScriptApi<'a> {
    pub fn new(fs: &'a SandboxFs, values: &'a serde_json::Value, inputs: Vec<String>) -> Self {
        ScriptApi { fs, values, inputs }
    }

    /// Read bytes from `input` and write them to `output` unchanged.
    pub fn copy(&self, input: &str, output: &str) -> Result<()> {
        let bytes = self.fs.read(input)?;
        self.fs.write(output, &bytes)
    }

    /// Full-file read as text.
    pub fn read(&self, path: &str) -> Result<String> {
        let bytes = self.fs.read(path)?;
        String::from_utf8(bytes).map_err(|_| Error::Script {
            message: format!("{path} is not valid UTF-8"),
        })
    }

    /// Full-file write.
    pub fn write(&self, path: &str, content: &str) -> Result<()> {
        self.fs.write(path, content.as_bytes())
    }

    /// Split a text file into lines, detecting the separator and whether
    /// the file ends with it.
    pub fn read_lines(&self, path: &str) -> Result<Lines> {
        let content = self.read(path)?;
        let separator = if content.contains("\r\n") { "\r\n" } else { "\n" };
        let final_newline = content.ends_with(separator);
        let mut lines: Vec<String> = content.split(separator).map(str::to_string).collect();
        if final_newline && lines.last().is_some_and(String::is_empty) {
            lines.pop();
        }
        Ok(Lines {
            lines,
            separator: separator.to_string(),
            final_newline,
        })
    }

    /// Join lines with `separator` and write them out.
    pub fn write_lines(
        &self,
        path: &str,
        lines: &[String],
        separator: &str,
        final_newline: bool,
    ) -> Result<()> {
        let mut content = lines.join(separator);
        if final_newline {
            content.push_str(separator);
        }
        self.write(path, &content)
    }

    /// List a directory, optionally recursively; returns friendly paths.
    pub fn read_dir(&self, path: &str, recursive: bool) -> Result<(Vec<String>, Vec<String>)> {
        if recursive {
            self.fs.read_dir_recursive(path)
        } else {
            self.fs.read_dir(path)
        }
    }

    /// Names of the user-supplied input mappings.
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// The validated user values tree.
    pub fn values(&self) -> &serde_json::Value {
        self.values
    }

    /// Evaluate a text template against in-memory data.
    pub fn template(
        &self,
        tmpl: &str,
        data: &serde_json::Value,
        left: &str,
        right: &str,
    ) -> Result<String> {
        template::render(tmpl, data, left, right)
    }

    /// Run a jq-style query over in-memory data.
    pub fn jq(&self, query: &str, data: &serde_json::Value) -> Result<Vec<serde_json::Value>> {
        query::run(query, data)
    }
}

/// Parse YAML text into a data tree. No filesystem access.
pub fn from_yaml(text: &str) -> Result<serde_json::Value> {
    serde_yaml::from_str(text).map_err(|err| Error::Script {
        message: format!("failed to parse YAML: {err}"),
    })
}

/// Serialize a data tree as YAML.
pub fn to_yaml(value: &serde_json::Value) -> Result<String> {
    serde_yaml::to_string(value).map_err(|err| Error::Script {
        message: format!("failed to serialize YAML: {err}"),
    })
}

/// Parse JSON text into a data tree.
pub fn from_json(text: &str) -> Result<serde_json::Value> {
    serde_json::from_str(text).map_err(|err| Error::Script {
        message: format!("failed to parse JSON: {err}"),
    })
}

/// Serialize a data tree as pretty-printed JSON.
pub fn to_json(value: &serde_json::Value) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|err| Error::Script {
        message: format!("failed to serialize JSON: {err}"),
    })
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
