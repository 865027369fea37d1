//! The forensic dumper.
//!
//! Writes records, item files, the project tree and the reconstructed
//! history to an abstract text sink under a set of verbosity flags.

use std::io::Write;

use crate::db::{Database, VssResult};
use crate::history::ChangesetHistory;
use crate::item::{self, VssItem, VssProject};
use crate::record::timestamp_to_datetime;

/// Verbosity selection bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VerboseFlags(pub u32);

impl VerboseFlags {
    /// for all records, print their headers and payload fields
    pub const RECORDS: u32 = 0x0000_0002;
    /// print delta record operations
    pub const DELTA_OPS: u32 = 0x0000_0010;
    /// print item file headers
    pub const FILE_HEADERS: u32 = 0x0000_0100;
    /// print all revisions of projects
    pub const PROJECT_REVISIONS: u32 = 0x0000_1000;
    /// print revisions of all files
    pub const FILE_REVISIONS: u32 = 0x0000_2000;
    /// print the project structure
    pub const PROJECT_TREE: u32 = 0x0020_0000;

    pub const REVISIONS: u32 = Self::PROJECT_REVISIONS | Self::FILE_REVISIONS;

    pub fn has(&self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    pub fn with(mut self, flag: u32) -> Self {
        self.0 |= flag;
        self
    }
}

/// Dump a database subtree according to the verbosity flags.
pub fn dump_database(
    db: &Database,
    root: &VssProject,
    w: &mut dyn Write,
    flags: VerboseFlags,
) -> VssResult<()> {
    writeln!(w, "Database: {}", db.config().path.display())?;
    if flags.has(VerboseFlags::PROJECT_TREE) {
        item::dump_tree(root, w, "")?;
    }
    if flags.0 != 0 {
        dump_project(db, root, w, "", flags)?;
    }
    Ok(())
}

fn dump_project(
    db: &Database,
    project: &VssProject,
    w: &mut dyn Write,
    base_path: &str,
    flags: VerboseFlags,
) -> VssResult<()> {
    let path = format!("{}{}/", base_path, project.logical_name);
    writeln!(w, "\nProject {path}")?;

    if let Some(item_file) = &project.item_file {
        if flags.has(VerboseFlags::FILE_HEADERS) || flags.has(VerboseFlags::RECORDS) {
            item_file.dump(w, flags.has(VerboseFlags::RECORDS))?;
        }
        if flags.has(VerboseFlags::PROJECT_REVISIONS) {
            let history = item_file.history(db)?;
            for revision in &history.revisions {
                writeln!(w)?;
                revision.record.dump(w)?;
                if let Some(comment) = &revision.comment {
                    writeln!(w, "  Comment: {comment}")?;
                }
                for error in &revision.errors {
                    writeln!(w, "  ERROR: {error}")?;
                }
            }
        }
    }

    for child in project.all_items() {
        match child {
            VssItem::Project(child) => dump_project(db, child, w, &path, flags)?,
            VssItem::File(file) => {
                let Some(item_file) = &file.item_file else {
                    writeln!(w, "\nFile {}{} [purged]", path, file.logical_name)?;
                    continue;
                };
                writeln!(w, "\nFile {}{}", path, file.logical_name)?;
                if flags.has(VerboseFlags::FILE_HEADERS) || flags.has(VerboseFlags::RECORDS) {
                    item_file.dump(w, flags.has(VerboseFlags::RECORDS))?;
                }
                if flags.has(VerboseFlags::FILE_REVISIONS) {
                    for revision in item_file.revisions(db)?.iter() {
                        writeln!(w)?;
                        revision.record.dump(w)?;
                        writeln!(
                            w,
                            "  At: {}",
                            timestamp_to_datetime(revision.record.timestamp)
                        )?;
                        if let Some(content) = &revision.content {
                            writeln!(w, "  Content: {} byte(s)", content.len())?;
                        }
                        for error in &revision.errors {
                            writeln!(w, "  ERROR: {error}")?;
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

/// Dump the reconstructed chronological history.
pub fn dump_history(
    db: &Database,
    root: &VssProject,
    w: &mut dyn Write,
) -> VssResult<()> {
    let history = ChangesetHistory::build(db, root)?;
    history.dump(w)?;
    Ok(())
}
