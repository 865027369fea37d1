//! Revision log-entry records ('LE').
//!
//! Every revision record starts with the same 88-byte base layout; the
//! action code selects which variant tail follows. Variant selection is an
//! exhaustive match on the action code instead of a class-per-action
//! hierarchy.

use std::fmt;
use std::io::Write;

use crate::record::error::{RecordError, RecordResult};
use crate::record::header::RecordHeader;
use crate::record::reader::RecordReader;
use crate::record::types::{timestamp_to_datetime, PhysicalName, VssName};

/// Action codes as stored in revision records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RevisionAction {
    Label = 0,
    CreateProject = 1,
    AddProject = 2,
    AddFile = 3,
    DestroyProject = 4,
    DestroyFile = 5,
    DeleteProject = 6,
    DeleteFile = 7,
    RecoverProject = 8,
    RecoverFile = 9,
    RenameProject = 10,
    RenameFile = 11,
    MoveFrom = 12,
    MoveTo = 13,
    /// also used to pin and unpin files
    ShareFile = 14,
    BranchFile = 15,
    CreateFile = 16,
    CheckinFile = 17,
    CreateBranch = 19,
    ArchiveFile = 22,
    ArchiveProject = 23,
    RestoreFile = 24,
    RestoreProject = 25,
}

impl RevisionAction {
    /// Codes 18, 20 and 21 exist in some databases but have no decodable
    /// variant; they return `None` and fail as unknown actions.
    pub fn from_wire(value: u16) -> Option<RevisionAction> {
        use RevisionAction::*;
        Some(match value {
            0 => Label,
            1 => CreateProject,
            2 => AddProject,
            3 => AddFile,
            4 => DestroyProject,
            5 => DestroyFile,
            6 => DeleteProject,
            7 => DeleteFile,
            8 => RecoverProject,
            9 => RecoverFile,
            10 => RenameProject,
            11 => RenameFile,
            12 => MoveFrom,
            13 => MoveTo,
            14 => ShareFile,
            15 => BranchFile,
            16 => CreateFile,
            17 => CheckinFile,
            19 => CreateBranch,
            22 => ArchiveFile,
            23 => ArchiveProject,
            24 => RestoreFile,
            25 => RestoreProject,
            _ => return None,
        })
    }
}

impl fmt::Display for RevisionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The action-specific tail of a revision record.
#[derive(Debug, Clone)]
pub enum RevisionKind {
    /// label text lives in the base record
    Label,
    /// create/add/delete/recover of a named child
    Common {
        name: VssName,
        physical: PhysicalName,
    },
    Destroy {
        name: VssName,
        /// non-zero when the item had been deleted before being purged
        was_deleted: bool,
        physical: PhysicalName,
    },
    Rename {
        name: VssName,
        old_name: VssName,
        physical: PhysicalName,
    },
    Move {
        project_path: Vec<u8>,
        name: VssName,
        physical: PhysicalName,
    },
    /// share, pin and unpin all arrive as ShareFile records
    Share {
        project_path: Vec<u8>,
        name: VssName,
        unpinned_revision: i16,
        pinned_revision: i16,
        /// index in the project's items array
        project_idx: i16,
        physical: PhysicalName,
    },
    Branch {
        name: VssName,
        physical: PhysicalName,
        branch_file: PhysicalName,
    },
    Checkin {
        prev_delta_offset: u32,
        project_path: Vec<u8>,
    },
    ArchiveRestore {
        name: VssName,
        physical: PhysicalName,
        archive_path: Vec<u8>,
    },
}

/// A parsed revision record: the common base plus its variant tail.
#[derive(Debug, Clone)]
pub struct RevisionRecord {
    pub header: RecordHeader,
    pub prev_rev_offset: u32,
    pub action: RevisionAction,
    pub revision_num: i32,
    pub timestamp: u32,
    /// raw author bytes in the database codepage
    pub user: Vec<u8>,
    /// raw label bytes; only meaningful for Label revisions
    pub label: Vec<u8>,
    pub comment_offset: u32,
    pub label_comment_offset: u32,
    pub comment_length: u16,
    pub label_comment_length: u16,
    pub kind: RevisionKind,
}

impl RevisionRecord {
    pub fn parse(header: RecordHeader, reader: &mut RecordReader) -> RecordResult<Self> {
        let prev_rev_offset = reader.read_u32()?;
        let action_code = reader.read_u16()?;
        let revision_num = i32::from(reader.read_u16()?);
        let timestamp = reader.read_u32()?;
        let user = reader.read_byte_string(32)?;
        let label = reader.read_byte_string(32)?;
        let comment_offset = reader.read_u32()?;
        let label_comment_offset = reader.read_u32()?;
        let comment_length = reader.read_u16()?;
        let label_comment_length = reader.read_u16()?;

        let action = RevisionAction::from_wire(action_code).ok_or(
            RecordError::UnknownRevisionAction {
                action: action_code,
                offset: header.offset,
            },
        )?;
        let kind = Self::parse_kind(action, reader)?;

        Ok(Self {
            header,
            prev_rev_offset,
            action,
            revision_num,
            timestamp,
            user,
            label,
            comment_offset,
            label_comment_offset,
            comment_length,
            label_comment_length,
            kind,
        })
    }

    fn parse_kind(action: RevisionAction, reader: &mut RecordReader) -> RecordResult<RevisionKind> {
        use RevisionAction::*;
        Ok(match action {
            Label => RevisionKind::Label,
            CreateProject | CreateFile | AddProject | AddFile | DeleteProject | DeleteFile
            | RecoverProject | RecoverFile => RevisionKind::Common {
                name: reader.read_name()?,
                physical: PhysicalName::from_wire(reader.read_bytes(10)?),
            },
            DestroyProject | DestroyFile => RevisionKind::Destroy {
                name: reader.read_name()?,
                was_deleted: reader.read_u16()? != 0,
                physical: PhysicalName::from_wire(reader.read_bytes(10)?),
            },
            RenameProject | RenameFile => RevisionKind::Rename {
                name: reader.read_name()?,
                old_name: reader.read_name()?,
                physical: PhysicalName::from_wire(reader.read_bytes(10)?),
            },
            MoveFrom | MoveTo => RevisionKind::Move {
                project_path: reader.read_byte_string(260)?,
                name: reader.read_name()?,
                physical: PhysicalName::from_wire(reader.read_bytes(10)?),
            },
            ShareFile => RevisionKind::Share {
                project_path: reader.read_byte_string(260)?,
                name: reader.read_name()?,
                unpinned_revision: reader.read_i16()?,
                pinned_revision: reader.read_i16()?,
                project_idx: reader.read_i16()?,
                physical: PhysicalName::from_wire(reader.read_bytes(10)?),
            },
            BranchFile | CreateBranch => RevisionKind::Branch {
                name: reader.read_name()?,
                physical: PhysicalName::from_wire(reader.read_bytes(10)?),
                branch_file: PhysicalName::from_wire(reader.read_bytes(10)?),
            },
            CheckinFile => {
                let prev_delta_offset = reader.read_u32()?;
                reader.skip(4)?; // filler
                RevisionKind::Checkin {
                    prev_delta_offset,
                    project_path: reader.read_byte_string(260)?,
                }
            }
            ArchiveFile | ArchiveProject | RestoreFile | RestoreProject => {
                let name = reader.read_name()?;
                let physical = PhysicalName::from_wire(reader.read_bytes(10)?);
                reader.skip(2)?; // filler
                let archive_path = reader.read_byte_string(260)?;
                RevisionKind::ArchiveRestore {
                    name,
                    physical,
                    archive_path,
                }
            }
        })
    }

    /// The named child this revision concerns, where the variant has one.
    pub fn name(&self) -> Option<&VssName> {
        match &self.kind {
            RevisionKind::Common { name, .. }
            | RevisionKind::Destroy { name, .. }
            | RevisionKind::Rename { name, .. }
            | RevisionKind::Move { name, .. }
            | RevisionKind::Share { name, .. }
            | RevisionKind::Branch { name, .. }
            | RevisionKind::ArchiveRestore { name, .. } => Some(name),
            RevisionKind::Label | RevisionKind::Checkin { .. } => None,
        }
    }

    pub fn physical(&self) -> Option<&PhysicalName> {
        match &self.kind {
            RevisionKind::Common { physical, .. }
            | RevisionKind::Destroy { physical, .. }
            | RevisionKind::Rename { physical, .. }
            | RevisionKind::Move { physical, .. }
            | RevisionKind::Share { physical, .. }
            | RevisionKind::Branch { physical, .. }
            | RevisionKind::ArchiveRestore { physical, .. } => Some(physical),
            RevisionKind::Label | RevisionKind::Checkin { .. } => None,
        }
    }

    pub fn dump(&self, w: &mut dyn Write) -> std::io::Result<()> {
        self.header.dump(w)?;
        writeln!(w, "Revision: {}", self.revision_num)?;
        writeln!(
            w,
            "  By: '{}', at: {} ({})",
            String::from_utf8_lossy(&self.user),
            timestamp_to_datetime(self.timestamp),
            self.timestamp
        )?;
        writeln!(w, "  {} ({})", self.action, self.action as u16)?;
        writeln!(w, "  Prev rev offset: {:06X}", self.prev_rev_offset)?;
        if self.comment_offset != 0 {
            writeln!(
                w,
                "  Comment offset: {:06X}, length: {:04X}",
                self.comment_offset, self.comment_length
            )?;
        }
        if self.label_comment_offset != 0 {
            writeln!(
                w,
                "  Label comment offset: {:06X}, length: {:04X}",
                self.label_comment_offset, self.label_comment_length
            )?;
        }
        match &self.kind {
            RevisionKind::Label => {
                if !self.label.is_empty() {
                    writeln!(w, "  Label: {}", String::from_utf8_lossy(&self.label))?;
                }
            }
            RevisionKind::Common { name, physical } => {
                writeln!(
                    w,
                    "  Name: {} ({})",
                    String::from_utf8_lossy(&name.short_name),
                    physical
                )?;
            }
            RevisionKind::Destroy {
                name,
                was_deleted,
                physical,
            } => {
                if *was_deleted {
                    writeln!(w, "  Previously deleted")?;
                }
                writeln!(
                    w,
                    "  Name: {} ({})",
                    String::from_utf8_lossy(&name.short_name),
                    physical
                )?;
            }
            RevisionKind::Rename {
                name,
                old_name,
                physical,
            } => {
                writeln!(
                    w,
                    "  Name: {} -> {} ({})",
                    String::from_utf8_lossy(&old_name.short_name),
                    String::from_utf8_lossy(&name.short_name),
                    physical
                )?;
            }
            RevisionKind::Move {
                project_path, name, ..
            } => {
                writeln!(w, "  Project path: {}", String::from_utf8_lossy(project_path))?;
                writeln!(w, "  Name: {}", String::from_utf8_lossy(&name.short_name))?;
            }
            RevisionKind::Share {
                project_path,
                name,
                unpinned_revision,
                pinned_revision,
                project_idx,
                ..
            } => {
                writeln!(w, "  Name: {}", String::from_utf8_lossy(&name.short_name))?;
                writeln!(
                    w,
                    "  Share from path: {}",
                    String::from_utf8_lossy(project_path)
                )?;
                writeln!(w, "  Index in items array: {project_idx}")?;
                if *unpinned_revision == 0 {
                    writeln!(w, "  Pinned at revision: {pinned_revision}")?;
                } else if *unpinned_revision > 0 {
                    writeln!(w, "  Unpinned at revision: {unpinned_revision}")?;
                }
            }
            RevisionKind::Branch {
                name, branch_file, ..
            } => {
                writeln!(w, "  Name: {}", String::from_utf8_lossy(&name.short_name))?;
                writeln!(w, "  Branched from file: {branch_file}")?;
            }
            RevisionKind::Checkin {
                prev_delta_offset,
                project_path,
            } => {
                writeln!(w, "  Prev delta offset: {prev_delta_offset:06X}")?;
                writeln!(w, "  Project path: {}", String::from_utf8_lossy(project_path))?;
            }
            RevisionKind::ArchiveRestore {
                name, archive_path, ..
            } => {
                writeln!(w, "  Name: {}", String::from_utf8_lossy(&name.short_name))?;
                writeln!(w, "  Archive path: {}", String::from_utf8_lossy(archive_path))?;
            }
        }
        Ok(())
    }
}
