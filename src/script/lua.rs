//! Embedded Lua host for pack scripts.
//!
//! The interpreter runs with only the base, table, string and math
//! libraries. Scripts reach the host exclusively through
//! `require("rpack.v1")`; `print` is routed to the log sink and the file
//! loading primitives are removed. Host errors cross the interpreter as
//! external errors so the typed kind survives the round trip.

use super::{from_json, from_yaml, to_json, to_yaml, ScriptApi, ScriptEngine};
use crate::error::{Error, Result};
use mlua::{Lua, LuaOptions, LuaSerdeExt, StdLib, Value as LuaValue, Variadic};

pub const MODULE_NAME: &str = "rpack.v1";

const SERIALIZE_OPTIONS: mlua::SerializeOptions = mlua::SerializeOptions::new()
    .serialize_none_to_null(false)
    .serialize_unit_to_null(false);

/// [`ScriptEngine`] backed by an embedded Lua 5.4 interpreter.
#[derive(Debug, Default)]
pub struct LuaEngine;

impl LuaEngine {
    pub fn new() -> Self {
        LuaEngine
    }
}

impl ScriptEngine for LuaEngine {
    fn execute(&self, source: &str, api: &ScriptApi<'_>) -> Result<()> {
        let lua = Lua::new_with(
            StdLib::TABLE | StdLib::STRING | StdLib::MATH,
            LuaOptions::default(),
        )
        .map_err(from_lua_error)?;

        lua.scope(|scope| {
            let module = lua.create_table()?;

            module.set(
                "copy",
                scope.create_function(|_, (input, output): (String, String)| {
                    api.copy(&input, &output).map_err(mlua::Error::external)
                })?,
            )?;
            module.set(
                "read",
                scope.create_function(|_, path: String| {
                    api.read(&path).map_err(mlua::Error::external)
                })?,
            )?;
            module.set(
                "write",
                scope.create_function(|_, (path, content): (String, String)| {
                    api.write(&path, &content).map_err(mlua::Error::external)
                })?,
            )?;
            module.set(
                "read_lines",
                scope.create_function(|lua, path: String| {
                    let lines = api.read_lines(&path).map_err(mlua::Error::external)?;
                    lua.to_value_with(&lines, SERIALIZE_OPTIONS)
                })?,
            )?;
            module.set(
                "write_lines",
                scope.create_function(
                    |_,
                     (path, lines, separator, final_newline): (
                        String,
                        Vec<String>,
                        Option<String>,
                        Option<bool>,
                    )| {
                        api.write_lines(
                            &path,
                            &lines,
                            separator.as_deref().unwrap_or("\n"),
                            final_newline.unwrap_or(true),
                        )
                        .map_err(mlua::Error::external)
                    },
                )?,
            )?;
            module.set(
                "read_dir",
                scope.create_function(|_, (path, recursive): (String, Option<bool>)| {
                    api.read_dir(&path, recursive.unwrap_or(false))
                        .map_err(mlua::Error::external)
                })?,
            )?;
            module.set(
                "from_yaml",
                scope.create_function(|lua, text: String| {
                    let value = from_yaml(&text).map_err(mlua::Error::external)?;
                    lua.to_value_with(&value, SERIALIZE_OPTIONS)
                })?,
            )?;
            module.set(
                "to_yaml",
                scope.create_function(|lua, value: LuaValue| {
                    let value: serde_json::Value = lua.from_value(value)?;
                    to_yaml(&value).map_err(mlua::Error::external)
                })?,
            )?;
            module.set(
                "from_json",
                scope.create_function(|lua, text: String| {
                    let value = from_json(&text).map_err(mlua::Error::external)?;
                    lua.to_value_with(&value, SERIALIZE_OPTIONS)
                })?,
            )?;
            module.set(
                "to_json",
                scope.create_function(|lua, value: LuaValue| {
                    let value: serde_json::Value = lua.from_value(value)?;
                    to_json(&value).map_err(mlua::Error::external)
                })?,
            )?;
            module.set(
                "template",
                scope.create_function(
                    |lua,
                     (tmpl, data, left, right): (
                        String,
                        LuaValue,
                        Option<String>,
                        Option<String>,
                    )| {
                        let data: serde_json::Value = lua.from_value(data)?;
                        api.template(
                            &tmpl,
                            &data,
                            left.as_deref().unwrap_or(""),
                            right.as_deref().unwrap_or(""),
                        )
                        .map_err(mlua::Error::external)
                    },
                )?,
            )?;
            module.set(
                "jq",
                scope.create_function(|lua, (query, data): (String, LuaValue)| {
                    let data: serde_json::Value = lua.from_value(data)?;
                    let matches = api.jq(&query, &data).map_err(mlua::Error::external)?;
                    lua.to_value_with(&matches, SERIALIZE_OPTIONS)
                })?,
            )?;
            module.set(
                "inputs",
                scope.create_function(|_, ()| Ok(api.inputs().to_vec()))?,
            )?;
            module.set(
                "values",
                scope.create_function(|lua, ()| {
                    lua.to_value_with(api.values(), SERIALIZE_OPTIONS)
                })?,
            )?;

            let globals = lua.globals();
            globals.set(
                "print",
                scope.create_function(|_, args: Variadic<LuaValue>| {
                    let line: Vec<String> = args.iter().map(display_lua_value).collect();
                    tracing::info!(target: "rpack::script", "script: {}", line.join(" "));
                    Ok(())
                })?,
            )?;
            let host_module = module.clone();
            globals.set(
                "require",
                scope.create_function(move |_, name: String| {
                    if name == MODULE_NAME {
                        return Ok(host_module.clone());
                    }
                    Err(mlua::Error::RuntimeError(format!(
                        "module {name:?} is not available in the sandbox"
                    )))
                })?,
            )?;
            globals.set("loadfile", LuaValue::Nil)?;
            globals.set("dofile", LuaValue::Nil)?;

            lua.load(source).set_name("script.lua").exec()
        })
        .map_err(from_lua_error)
    }
}

fn display_lua_value(value: &LuaValue) -> String {
    match value {
        LuaValue::Nil => "nil".to_string(),
        LuaValue::Boolean(b) => b.to_string(),
        LuaValue::Integer(i) => i.to_string(),
        LuaValue::Number(n) => n.to_string(),
        LuaValue::String(s) => format!("{}", s.to_string_lossy()),
        other => format!("<{}>", other.type_name()),
    }
}

/// Recover the typed host error when one crossed the interpreter, else
/// surface the interpreter's own message as a script error.
fn from_lua_error(err: mlua::Error) -> Error {
    if let Some(host) = find_host_error(&err) {
        return host;
    }
    Error::Script {
        message: err.to_string(),
    }
}

fn find_host_error(err: &mlua::Error) -> Option<Error> {
    match err {
        mlua::Error::CallbackError { cause, .. } => find_host_error(cause),
        mlua::Error::ExternalError(external) => external.downcast_ref::<Error>().cloned(),
        _ => None,
    }
}

#[cfg(test)]
#[path = "lua_tests.rs"]
mod tests;
