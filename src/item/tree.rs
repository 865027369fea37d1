//! The logical item tree.
//!
//! Projects contain child projects and files; files may be shared into
//! several projects and may be pinned to a version. A child whose item file
//! has been purged from the database still appears in the tree, just without
//! a backing file.

use std::io::Write;
use std::sync::Arc;

use tracing::debug;

use crate::db::{Database, VssError, VssResult};
use crate::item::file::FileItemFile;
use crate::item::project::{ProjectEntryFlags, ProjectItemFile};
use crate::record::PhysicalName;

/// A file in the logical tree (one instance per containing project).
pub struct VssFile {
    pub physical_name: PhysicalName,
    pub logical_name: String,
    pub entry_flags: ProjectEntryFlags,
    pub pinned_version: i16,
    /// `None` when the item file has been purged from the database
    pub item_file: Option<Arc<FileItemFile>>,
}

impl VssFile {
    pub fn open(
        db: &Database,
        physical_name: PhysicalName,
        logical_name: String,
        entry_flags: ProjectEntryFlags,
        pinned_version: i16,
    ) -> Self {
        let item_file = match db.open_file_item(&physical_name) {
            Ok(file) => Some(file),
            Err(VssError::FileNotFound { .. }) => {
                debug!(physical = %physical_name, "file item purged from database");
                None
            }
            Err(e) => {
                debug!(physical = %physical_name, "file item unreadable: {e}");
                None
            }
        };
        Self {
            physical_name,
            logical_name,
            entry_flags,
            pinned_version,
            item_file,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.entry_flags.has(ProjectEntryFlags::DELETED)
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned_version > 0
    }
}

/// A project (directory) in the logical tree.
pub struct VssProject {
    pub physical_name: PhysicalName,
    pub logical_name: String,
    pub entry_flags: ProjectEntryFlags,
    pub item_file: Option<Arc<ProjectItemFile>>,
    pub children: Vec<VssItem>,
}

impl VssProject {
    /// Open a project and, when `recursive`, its whole subtree from the
    /// child entries in its data file.
    pub fn open(
        db: &Database,
        physical_name: PhysicalName,
        logical_name: String,
        entry_flags: ProjectEntryFlags,
        recursive: bool,
    ) -> VssResult<Self> {
        let item_file = match db.open_project_item(&physical_name) {
            Ok(file) => Some(file),
            Err(VssError::FileNotFound { .. }) => {
                debug!(physical = %physical_name, "project item purged from database");
                None
            }
            Err(e) => return Err(e),
        };

        let mut children = Vec::new();
        if recursive {
            if let Some(item_file) = &item_file {
                for entry in item_file.entries(db)? {
                    let child_logical = db.long_name(&entry.name);
                    if entry.is_project_entry() {
                        children.push(VssItem::Project(VssProject::open(
                            db,
                            entry.physical.clone(),
                            child_logical,
                            entry.flags,
                            true,
                        )?));
                    } else {
                        children.push(VssItem::File(VssFile::open(
                            db,
                            entry.physical.clone(),
                            child_logical,
                            entry.flags,
                            entry.pinned_version,
                        )));
                    }
                }
            }
        }

        Ok(Self {
            physical_name,
            logical_name,
            entry_flags,
            item_file,
            children,
        })
    }

    pub fn is_deleted(&self) -> bool {
        self.entry_flags.has(ProjectEntryFlags::DELETED)
    }

    /// Child lookup by display name among live children.
    pub fn get_item_by_logical_name(&self, logical_name: &str) -> Option<&VssItem> {
        self.children
            .iter()
            .find(|item| !item.is_deleted() && item.logical_name() == logical_name)
    }

    pub fn all_items(&self) -> impl Iterator<Item = &VssItem> {
        self.children.iter()
    }
}

/// Either kind of tree node.
pub enum VssItem {
    Project(VssProject),
    File(VssFile),
}

impl VssItem {
    pub fn logical_name(&self) -> &str {
        match self {
            VssItem::Project(p) => &p.logical_name,
            VssItem::File(f) => &f.logical_name,
        }
    }

    pub fn physical_name(&self) -> &PhysicalName {
        match self {
            VssItem::Project(p) => &p.physical_name,
            VssItem::File(f) => &f.physical_name,
        }
    }

    pub fn is_project(&self) -> bool {
        matches!(self, VssItem::Project(_))
    }

    pub fn is_deleted(&self) -> bool {
        match self {
            VssItem::Project(p) => p.is_deleted(),
            VssItem::File(f) => f.is_deleted(),
        }
    }
}

/// Dump the project structure, indented per level.
pub fn dump_tree(project: &VssProject, w: &mut dyn Write, base_path: &str) -> std::io::Result<()> {
    let path = format!("{}{}/", base_path, project.logical_name);
    writeln!(w, "\nProject {} ({})", path, project.physical_name)?;
    for item in project.all_items() {
        match item {
            VssItem::Project(child) => dump_tree(child, w, &path)?,
            VssItem::File(file) => {
                write!(w, "  File {}{} ({})", path, file.logical_name, file.physical_name)?;
                if file.is_deleted() {
                    write!(w, " [deleted]")?;
                }
                if file.is_pinned() {
                    write!(w, " [pinned at {}]", file.pinned_version)?;
                }
                if file.item_file.is_none() {
                    write!(w, " [purged]")?;
                }
                writeln!(w)?;
            }
        }
    }
    Ok(())
}
