//! Exportable actions.
//!
//! An action is the projection of one revision for migration purposes: a
//! timestamp, an author, a resolved pathname, an action-specific payload and
//! a stable description string. Reconstruction problems (dangling offsets,
//! missing branch parents) ride along as non-fatal error strings.

use std::fmt;
use std::sync::Arc;

use crate::db::{VssError, VssResult};
use crate::item::{FileRevision, ProjectRevision};
use crate::record::{
    PhysicalName, RecordError, RevisionAction, RevisionKind, RevisionRecord,
};

/// What an action does, with its action-specific payload.
#[derive(Debug, Clone)]
pub enum ActionKind {
    Label { label: String, project: bool },
    CreateProject,
    CreateFile,
    AddProject,
    AddFile,
    DeleteProject,
    DeleteFile,
    RecoverProject,
    RecoverFile,
    DestroyProject { was_deleted: bool },
    DestroyFile { was_deleted: bool },
    RenameProject { original_name: String },
    RenameFile { original_name: String },
    MoveFrom { original_path: String },
    MoveTo { new_path: String },
    Share { original_project: String },
    Pin { pinned_revision: i16 },
    Unpin { unpinned_revision: i16 },
    BranchFile { source_file: PhysicalName },
    CreateBranch { source_file: PhysicalName },
    Checkin,
    ArchiveProject { archive_path: String },
    ArchiveFile { archive_path: String },
    RestoreProject { archive_path: String },
    RestoreFile { archive_path: String },
}

impl ActionKind {
    pub fn is_project_action(&self) -> bool {
        use ActionKind::*;
        match self {
            Label { project, .. } => *project,
            CreateProject | AddProject | DeleteProject | RecoverProject
            | DestroyProject { .. } | RenameProject { .. } | MoveFrom { .. } | MoveTo { .. }
            | BranchFile { .. } | ArchiveProject { .. } | RestoreProject { .. } => true,
            CreateFile | AddFile | DeleteFile | RecoverFile | DestroyFile { .. }
            | RenameFile { .. } | Share { .. } | Pin { .. } | Unpin { .. }
            | CreateBranch { .. } | Checkin | ArchiveFile { .. } | RestoreFile { .. } => false,
        }
    }

    fn project_or_file(&self) -> &'static str {
        if self.is_project_action() {
            "project"
        } else {
            "file"
        }
    }
}

/// One exportable action.
#[derive(Debug, Clone)]
pub struct Action {
    pub timestamp: u32,
    pub user: String,
    pub base_path: String,
    pub logical_name: String,
    /// base path and logical name joined
    pub pathname: String,
    pub physical_name: Option<PhysicalName>,
    pub version: i32,
    pub comment: Option<String>,
    pub label_comment: Option<String>,
    /// index in the owning project's child array, where one was resolved
    pub item_index: Option<usize>,
    /// reconstructed content, for checkins and branch starts
    pub content: Option<Arc<[u8]>>,
    pub kind: ActionKind,
    /// non-fatal reconstruction problems
    pub errors: Vec<String>,
}

impl Action {
    fn base(
        record: &RevisionRecord,
        user: String,
        base_path: &str,
        logical_name: String,
        kind: ActionKind,
    ) -> Self {
        let pathname = format!("{base_path}{logical_name}");
        Self {
            timestamp: record.timestamp,
            user,
            base_path: base_path.to_string(),
            logical_name,
            pathname,
            physical_name: record.physical().cloned(),
            version: record.revision_num,
            comment: None,
            label_comment: None,
            item_index: None,
            content: None,
            kind,
            errors: Vec::new(),
        }
    }

    /// Lift a file revision into an action. The pathname of a file action is
    /// the file's own resolved path.
    pub fn from_file_revision(revision: &FileRevision, pathname: &str) -> VssResult<Action> {
        let record = &revision.record;
        let label = || String::from_utf8_lossy(&record.label).into_owned();
        let kind = match (&record.action, &record.kind) {
            (RevisionAction::Label, _) => ActionKind::Label {
                label: label(),
                project: false,
            },
            (_, RevisionKind::Common { .. }) if record.action == RevisionAction::CreateFile => {
                ActionKind::CreateFile
            }
            (RevisionAction::CreateBranch, RevisionKind::Branch { branch_file, .. }) => {
                ActionKind::CreateBranch {
                    source_file: branch_file.clone(),
                }
            }
            (RevisionAction::CheckinFile, RevisionKind::Checkin { .. }) => ActionKind::Checkin,
            (RevisionAction::ArchiveFile, RevisionKind::ArchiveRestore { archive_path, .. }) => {
                ActionKind::ArchiveFile {
                    archive_path: String::from_utf8_lossy(archive_path).into_owned(),
                }
            }
            (action, _) => {
                return Err(VssError::Record(RecordError::UnknownRevisionAction {
                    action: *action as u16,
                    offset: record.header.offset,
                }))
            }
        };

        let mut action = Self::base(
            record,
            String::from_utf8_lossy(&record.user).into_owned(),
            pathname,
            String::new(),
            kind,
        );
        action.comment = revision.comment.clone();
        action.label_comment = revision.label_comment.clone();
        action.content = revision.content.clone();
        action.errors = revision.errors.clone();
        Ok(action)
    }

    /// Lift a project revision into an action. The pathname is the project's
    /// path plus the named child.
    pub fn from_project_revision(revision: &ProjectRevision, base_path: &str) -> VssResult<Action> {
        use RevisionAction::*;
        let record = &revision.record;
        let decode_path = |bytes: &[u8]| String::from_utf8_lossy(bytes).into_owned();

        let kind = match (&record.action, &record.kind) {
            (Label, _) => ActionKind::Label {
                label: String::from_utf8_lossy(&record.label).into_owned(),
                project: true,
            },
            (CreateProject, _) => ActionKind::CreateProject,
            (CreateFile, _) => ActionKind::CreateFile,
            (AddProject, _) => ActionKind::AddProject,
            (AddFile, _) => ActionKind::AddFile,
            (DeleteProject, _) => ActionKind::DeleteProject,
            (DeleteFile, _) => ActionKind::DeleteFile,
            (RecoverProject, _) => ActionKind::RecoverProject,
            (RecoverFile, _) => ActionKind::RecoverFile,
            (DestroyProject, RevisionKind::Destroy { was_deleted, .. }) => {
                ActionKind::DestroyProject {
                    was_deleted: *was_deleted,
                }
            }
            (DestroyFile, RevisionKind::Destroy { was_deleted, .. }) => ActionKind::DestroyFile {
                was_deleted: *was_deleted,
            },
            (RenameProject, RevisionKind::Rename { .. }) => ActionKind::RenameProject {
                original_name: revision
                    .old_full_name
                    .as_ref()
                    .map(|n| n.logical_name.clone())
                    .unwrap_or_default(),
            },
            (RenameFile, RevisionKind::Rename { .. }) => ActionKind::RenameFile {
                original_name: revision
                    .old_full_name
                    .as_ref()
                    .map(|n| n.logical_name.clone())
                    .unwrap_or_default(),
            },
            (MoveFrom, RevisionKind::Move { project_path, .. }) => ActionKind::MoveFrom {
                original_path: decode_path(project_path),
            },
            (MoveTo, RevisionKind::Move { project_path, .. }) => ActionKind::MoveTo {
                new_path: decode_path(project_path),
            },
            (
                ShareFile,
                RevisionKind::Share {
                    project_path,
                    unpinned_revision,
                    pinned_revision,
                    ..
                },
            ) => {
                // pins and unpins arrive as share records
                if *unpinned_revision == 0 {
                    ActionKind::Pin {
                        pinned_revision: *pinned_revision,
                    }
                } else if *unpinned_revision > 0 {
                    ActionKind::Unpin {
                        unpinned_revision: *unpinned_revision,
                    }
                } else {
                    ActionKind::Share {
                        original_project: decode_path(project_path),
                    }
                }
            }
            (BranchFile, RevisionKind::Branch { branch_file, .. }) => ActionKind::BranchFile {
                source_file: branch_file.clone(),
            },
            (ArchiveProject, RevisionKind::ArchiveRestore { archive_path, .. }) => {
                ActionKind::ArchiveProject {
                    archive_path: decode_path(archive_path),
                }
            }
            (ArchiveFile, RevisionKind::ArchiveRestore { archive_path, .. }) => {
                ActionKind::ArchiveFile {
                    archive_path: decode_path(archive_path),
                }
            }
            (RestoreProject, RevisionKind::ArchiveRestore { archive_path, .. }) => {
                ActionKind::RestoreProject {
                    archive_path: decode_path(archive_path),
                }
            }
            (RestoreFile, RevisionKind::ArchiveRestore { archive_path, .. }) => {
                ActionKind::RestoreFile {
                    archive_path: decode_path(archive_path),
                }
            }
            (action, _) => {
                return Err(VssError::Record(RecordError::UnknownRevisionAction {
                    action: *action as u16,
                    offset: record.header.offset,
                }))
            }
        };

        // the project's own creation entry names the project, not a child
        let self_creation = matches!(kind, ActionKind::CreateProject | ActionKind::CreateFile)
            && record.revision_num == 1;
        let logical_name = if self_creation {
            String::new()
        } else {
            revision
                .full_name
                .as_ref()
                .map(|n| n.logical_name.clone())
                .unwrap_or_default()
        };
        let mut action = Self::base(
            record,
            String::from_utf8_lossy(&record.user).into_owned(),
            base_path,
            logical_name,
            kind,
        );
        action.comment = revision.comment.clone();
        action.label_comment = revision.label_comment.clone();
        action.item_index = revision.item_index;
        action.errors = revision.errors.clone();
        Ok(action)
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ActionKind::*;
        match &self.kind {
            Label { label, .. } => write!(
                f,
                "Label {} {} as:{}",
                self.kind.project_or_file(),
                self.pathname,
                label
            ),
            CreateProject => write!(f, "Create Project {}", self.pathname),
            CreateFile => write!(f, "Create File {}", self.pathname),
            AddProject => write!(f, "Add Project {}", self.pathname),
            AddFile => write!(f, "Add File {}", self.pathname),
            DeleteProject => write!(f, "Delete Project {}", self.pathname),
            DeleteFile => write!(f, "Delete File {}", self.pathname),
            RecoverProject => write!(f, "Recover Project {}", self.pathname),
            RecoverFile => write!(f, "Recover File {}", self.pathname),
            DestroyProject { .. } => write!(f, "Destroy Project {}", self.pathname),
            DestroyFile { .. } => write!(f, "Destroy File {}", self.pathname),
            RenameProject { original_name } | RenameFile { original_name } => write!(
                f,
                "Rename {} {}{} to {}",
                self.kind.project_or_file(),
                self.base_path,
                original_name,
                self.pathname
            ),
            MoveFrom { original_path } => {
                write!(f, "Move {} from {}", self.pathname, original_path)
            }
            MoveTo { new_path } => write!(f, "Move {} to {}", self.pathname, new_path),
            Share { original_project } => {
                write!(f, "Share {} from {}", self.pathname, original_project)
            }
            Pin { pinned_revision } => {
                write!(f, "Pin {} at revision {}", self.pathname, pinned_revision)
            }
            Unpin { unpinned_revision } => {
                write!(f, "Unpin {} at revision {}", self.pathname, unpinned_revision)
            }
            BranchFile { source_file } => {
                write!(f, "Branch File {} from {}", self.pathname, source_file)
            }
            CreateBranch { source_file } => {
                write!(f, "Create Branch {} from {}", self.pathname, source_file)
            }
            Checkin => write!(f, "Checkin {}", self.pathname),
            ArchiveProject { archive_path } | ArchiveFile { archive_path } => write!(
                f,
                "Archive {} {} to {}",
                self.kind.project_or_file(),
                self.pathname,
                archive_path
            ),
            RestoreProject { archive_path } | RestoreFile { archive_path } => write!(
                f,
                "Restore {} {} from archive {}",
                self.kind.project_or_file(),
                self.pathname,
                archive_path
            ),
        }
    }
}
