//! Resolvers translate prefixed friendly names into handles.
//!
//! Resolvers are tried in order and the first whose prefix matches owns the
//! name, whether or not the rest of it is valid. The target resolver uses
//! the empty prefix and therefore must sit last in the list.

use crate::error::{Error, Result};
use crate::inputs::{InputKind, ResolvedInput};
use crate::paths::{clean_local, join_clean};
use crate::sandbox::handle::{FileHandle, Handle};
use std::path::{Path, PathBuf};

pub const RPACK_RESOLVER: &str = "rpack";
pub const TEMP_RESOLVER: &str = "temp";
pub const MAP_RESOLVER: &str = "map";
pub const TARGET_RESOLVER: &str = "target";

pub const RPACK_PREFIX: &str = "rpack:";
pub const TEMP_PREFIX: &str = "temp:";
pub const MAP_PREFIX: &str = "map:";

/// Translates a friendly name into a handle.
///
/// `None` means the prefix is not ours and the next resolver should be
/// tried; `Some(Err(_))` means the name is ours but invalid.
pub trait Resolver {
    fn resolve(&self, name: &str) -> Option<Result<Box<dyn Handle>>>;
}

/// Resolver mapping `prefix:rel` to `base_dir/rel`.
///
/// Used for the `rpack:`, `temp:` and (with an empty prefix) `target`
/// namespaces.
pub struct PrefixResolver {
    id: &'static str,
    prefix: &'static str,
    base_dir: PathBuf,
}

impl PrefixResolver {
    pub fn new(id: &'static str, prefix: &'static str, base_dir: PathBuf) -> Self {
        PrefixResolver {
            id,
            prefix,
            base_dir,
        }
    }
}

impl Resolver for PrefixResolver {
    fn resolve(&self, name: &str) -> Option<Result<Box<dyn Handle>>> {
        let tail = name.strip_prefix(self.prefix)?;
        // The empty-prefix (target) resolver owns unprefixed names only;
        // a colon in the first segment means an unknown prefix fell
        // through the rest of the list.
        if self.prefix.is_empty() {
            let first = tail.split('/').next().unwrap_or(tail);
            if first.contains(':') {
                return Some(Err(Error::Path {
                    path: name.to_string(),
                    reason: "unknown prefix".to_string(),
                }));
            }
        }
        let cleaned = match clean_local(tail) {
            Ok(cleaned) => cleaned,
            Err(err) => return Some(Err(err)),
        };
        let friendly = format!("{}{}", self.prefix, cleaned.display());
        let abs_path = join_clean(&self.base_dir, &cleaned);
        Some(Ok(Box::new(FileHandle::new(
            self.id, friendly, abs_path, cleaned,
        ))))
    }
}

/// Resolver for the `map:` namespace.
///
/// `map:NAME` resolves to the mapped input itself; `map:NAME/REL` is only
/// permitted when the input is a directory. The indirect target path is the
/// user-relative path of the input joined with `REL`, which is what makes a
/// mapped read collide with a target write of the same file.
pub struct MapResolver {
    id: &'static str,
    inputs: Vec<ResolvedInput>,
}

impl MapResolver {
    pub fn new(id: &'static str, inputs: Vec<ResolvedInput>) -> Self {
        MapResolver { id, inputs }
    }

    fn resolve_mapped(&self, name: &str, tail: &str) -> Result<Box<dyn Handle>> {
        let cleaned = clean_local(tail)?;
        let mut components = cleaned.components();
        let input_name = components
            .next()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .ok_or_else(|| Error::Path {
                path: name.to_string(),
                reason: "missing mapped input name".to_string(),
            })?;
        let rel: PathBuf = components.as_path().to_path_buf();

        let input = self
            .inputs
            .iter()
            .find(|input| input.name == input_name)
            .ok_or_else(|| Error::Path {
                path: name.to_string(),
                reason: format!("unknown mapped input {input_name:?}"),
            })?;

        let friendly = format!("{}{}", MAP_PREFIX, cleaned.display());
        if rel.as_os_str().is_empty() {
            return Ok(Box::new(FileHandle::new(
                self.id,
                friendly,
                input.resolved_abs_path.clone(),
                input.user_path.clone(),
            )));
        }
        if input.kind != InputKind::Dir {
            return Err(Error::Path {
                path: name.to_string(),
                reason: format!("mapped input {input_name:?} is not a directory"),
            });
        }
        Ok(Box::new(FileHandle::new(
            self.id,
            friendly,
            join_clean(&input.resolved_abs_path, &rel),
            join_clean(&input.user_path, &rel),
        )))
    }
}

impl Resolver for MapResolver {
    fn resolve(&self, name: &str) -> Option<Result<Box<dyn Handle>>> {
        let tail = name.strip_prefix(MAP_PREFIX)?;
        Some(self.resolve_mapped(name, tail))
    }
}

/// The built-in resolver list for one run, in match order.
pub fn builtin_resolvers(
    source_path: &Path,
    run_path: &Path,
    temp_path: &Path,
    inputs: &[ResolvedInput],
) -> Vec<Box<dyn Resolver>> {
    vec![
        Box::new(PrefixResolver::new(
            RPACK_RESOLVER,
            RPACK_PREFIX,
            source_path.to_path_buf(),
        )),
        Box::new(PrefixResolver::new(
            TEMP_RESOLVER,
            TEMP_PREFIX,
            temp_path.to_path_buf(),
        )),
        Box::new(MapResolver::new(MAP_RESOLVER, inputs.to_vec())),
        // Matches everything else; keep last.
        Box::new(PrefixResolver::new(
            TARGET_RESOLVER,
            "",
            run_path.to_path_buf(),
        )),
    ]
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
