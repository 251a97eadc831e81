//! Append-only record of every mediated filesystem operation.

use crate::error::Result;
use crate::sandbox::handle::HandleMeta;

/// The kind of handle operation a record captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
    Stat,
    ReadDir,
}

impl AccessKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessKind::Read => "read",
            AccessKind::Write => "write",
            AccessKind::Stat => "stat",
            AccessKind::ReadDir => "readdir",
        }
    }
}

/// One recorded operation, in program order.
#[derive(Debug, Clone)]
pub struct Record {
    pub access: AccessKind,
    pub handle: HandleMeta,
}

/// Filter deciding whether a record is kept.
pub type RecordFilter = fn(AccessKind, &HandleMeta) -> bool;

/// Append-only recorder; with no filter every operation is kept.
#[derive(Default)]
pub struct Recorder {
    filter: Option<RecordFilter>,
    records: Vec<Record>,
}

impl Recorder {
    pub fn new(filter: Option<RecordFilter>) -> Self {
        Recorder {
            filter,
            records: Vec::new(),
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    fn push(&mut self, access: AccessKind, handle: &HandleMeta) {
        if self.filter.map_or(true, |keep| keep(access, handle)) {
            self.records.push(Record {
                access,
                handle: handle.clone(),
            });
        }
    }
}

impl super::hooks::AccessHook for Recorder {
    fn on_read(&mut self, handle: &HandleMeta) -> Result<()> {
        self.push(AccessKind::Read, handle);
        Ok(())
    }

    fn on_write(&mut self, handle: &HandleMeta) -> Result<()> {
        self.push(AccessKind::Write, handle);
        Ok(())
    }

    fn on_stat(&mut self, handle: &HandleMeta) -> Result<()> {
        self.push(AccessKind::Stat, handle);
        Ok(())
    }

    fn on_readdir(&mut self, handle: &HandleMeta) -> Result<()> {
        self.push(AccessKind::ReadDir, handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::hooks::AccessHook;
    use crate::sandbox::resolver::{MAP_RESOLVER, TARGET_RESOLVER};
    use std::path::PathBuf;

    fn meta(resolver: &'static str, friendly: &str) -> HandleMeta {
        HandleMeta {
            resolver_id: resolver,
            friendly_path: friendly.to_string(),
            indirect_target_path: PathBuf::from(friendly.trim_start_matches("map:")),
        }
    }

    #[test]
    fn unfiltered_recorder_keeps_every_operation_in_order() {
        let mut recorder = Recorder::new(None);
        recorder.on_read(&meta(MAP_RESOLVER, "map:a")).unwrap();
        recorder.on_write(&meta(TARGET_RESOLVER, "b")).unwrap();
        recorder.on_stat(&meta(MAP_RESOLVER, "map:c")).unwrap();

        let kinds: Vec<_> = recorder.records().iter().map(|r| r.access).collect();
        assert_eq!(
            kinds,
            vec![AccessKind::Read, AccessKind::Write, AccessKind::Stat]
        );
    }

    #[test]
    fn filter_drops_non_matching_records() {
        fn writes_only(access: AccessKind, _: &HandleMeta) -> bool {
            access == AccessKind::Write
        }
        let mut recorder = Recorder::new(Some(writes_only));
        recorder.on_read(&meta(MAP_RESOLVER, "map:a")).unwrap();
        recorder.on_write(&meta(TARGET_RESOLVER, "b")).unwrap();
        assert_eq!(recorder.records().len(), 1);
        assert_eq!(recorder.records()[0].handle.friendly_path, "b");
    }
}
