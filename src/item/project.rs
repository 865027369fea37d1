//! Project item files: per-directory history and directory-state
//! reconstruction.
//!
//! A project's data file lists its current children as entry records. The
//! item file's revision stream is folded forward over an ordered child array
//! to locate every child at every point in time. The array is sorted by
//! (indexing name, physical name); the indexing name is the logical name
//! lowercased in the database code page and compared byte-wise.

use std::cmp::Ordering;
use std::io::Write;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::db::{Database, VssError, VssResult};
use crate::item::header::{ItemFilePreamble, ItemFileType, ProjectHeaderRecord};
use crate::record::{
    ItemRecord, ParseRecord, PhysicalName, RecordFile, RecordHeader, RecordReader, RecordResult,
    RevisionAction, RevisionKind, RevisionRecord, Signature, VssName,
};

/// Child entry flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProjectEntryFlags(pub u16);

impl ProjectEntryFlags {
    pub const DELETED: u16 = 0x1;
    pub const BINARY: u16 = 0x2;
    pub const LATEST_ONLY: u16 = 0x4;
    pub const SHARED: u16 = 0x8;

    pub fn has(&self, flag: u16) -> bool {
        self.0 & flag != 0
    }
}

/// Project entry record ('PJ'): one current child in the project data file.
#[derive(Debug, Clone)]
pub struct ProjectEntryRecord {
    pub header: RecordHeader,
    pub item_type: ItemFileType,
    pub flags: ProjectEntryFlags,
    pub name: VssName,
    pub pinned_version: i16,
    pub physical: PhysicalName,
}

impl ProjectEntryRecord {
    pub fn is_project_entry(&self) -> bool {
        self.item_type == ItemFileType::Project
    }

    pub fn is_deleted(&self) -> bool {
        self.flags.has(ProjectEntryFlags::DELETED)
    }

    pub fn dump(&self, w: &mut dyn Write) -> std::io::Result<()> {
        self.header.dump(w)?;
        writeln!(
            w,
            "  Item Type: {} - Name: {} ({})",
            self.item_type as i16,
            String::from_utf8_lossy(&self.name.short_name),
            self.physical
        )?;
        writeln!(w, "  Flags: {:4X}", self.flags.0)?;
        writeln!(w, "  Pinned version: {}", self.pinned_version)?;
        Ok(())
    }
}

impl ParseRecord for ProjectEntryRecord {
    fn parse(header: RecordHeader, reader: &mut RecordReader) -> RecordResult<Option<Self>> {
        if header.signature != Signature::PROJECT_ENTRY {
            return Ok(None);
        }
        let item_type = ItemFileType::from_wire(reader.read_i16()?)?;
        let flags = ProjectEntryFlags(reader.read_u16()?);
        let name = reader.read_name()?;
        let pinned_version = reader.read_i16()?;
        let physical = PhysicalName::from_wire(reader.read_bytes(10)?);
        Ok(Some(Self {
            header,
            item_type,
            flags,
            name,
            pinned_version,
            physical,
        }))
    }

    fn header(&self) -> &RecordHeader {
        &self.header
    }

    fn class_name(&self) -> &'static str {
        "project entry"
    }
}

/// A child's resolved naming triple plus liveness.
#[derive(Debug, Clone)]
pub struct FullName {
    pub is_project: bool,
    /// authoritative display name (long name when the names file has one)
    pub logical_name: String,
    pub physical_name: PhysicalName,
    /// code page lowercase of the short logical name; the sort key
    pub indexing_name: Vec<u8>,
    /// deleted children stay in the array so a later recover finds them
    pub deleted: bool,
}

impl FullName {
    pub fn new(db: &Database, name: &VssName, physical: &PhysicalName) -> Self {
        Self {
            is_project: name.is_project(),
            logical_name: db.long_name(name),
            physical_name: physical.clone(),
            indexing_name: db.encoding().index_name(&name.short_name),
            deleted: false,
        }
    }
}

/// The ordered child array a project folds its revisions over.
///
/// Mutated only while the fold builds it; read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct DirectoryState {
    entries: Vec<FullName>,
}

impl DirectoryState {
    pub fn entries(&self) -> &[FullName] {
        &self.entries
    }

    pub fn live_entries(&self) -> impl Iterator<Item = &FullName> {
        self.entries.iter().filter(|e| !e.deleted)
    }

    /// First index whose key is >= (indexing_name, physical_name). With an
    /// empty physical name, ties on the indexing name resolve to the first
    /// entry carrying it.
    fn lower_bound(&self, indexing_name: &[u8], physical_name: &PhysicalName) -> usize {
        self.entries.partition_point(|e| {
            match e.indexing_name.as_slice().cmp(indexing_name) {
                Ordering::Less => true,
                Ordering::Greater => false,
                Ordering::Equal => {
                    !physical_name.is_empty()
                        && e.physical_name.as_str() < physical_name.as_str()
                }
            }
        })
    }

    /// Where a new entry belongs; also the lookup result on a miss, so an
    /// insert at the returned index is idempotent.
    pub fn find_insertion_index(&self, full_name: &FullName) -> usize {
        self.lower_bound(&full_name.indexing_name, &full_name.physical_name)
    }

    fn find_matching(
        &self,
        indexing_name: &[u8],
        physical_name: &PhysicalName,
        want_deleted: Option<bool>,
    ) -> Option<usize> {
        let mut index = self.lower_bound(indexing_name, physical_name);
        while let Some(entry) = self.entries.get(index) {
            if entry.indexing_name != indexing_name {
                return None;
            }
            if !physical_name.is_empty() && entry.physical_name != *physical_name {
                return None;
            }
            if want_deleted.map_or(true, |d| entry.deleted == d) {
                return Some(index);
            }
            index += 1;
        }
        None
    }

    /// Find a live child; `None` on miss.
    pub fn find_item(&self, indexing_name: &[u8], physical_name: &PhysicalName) -> Option<usize> {
        self.find_matching(indexing_name, physical_name, Some(false))
    }

    /// Find a child regardless of liveness.
    pub fn find_any(&self, indexing_name: &[u8], physical_name: &PhysicalName) -> Option<usize> {
        self.find_matching(indexing_name, physical_name, None)
    }

    /// Find a deleted child (for recover).
    pub fn find_deleted(&self, indexing_name: &[u8], physical_name: &PhysicalName) -> Option<usize> {
        self.find_matching(indexing_name, physical_name, Some(true))
    }

    pub fn insert(&mut self, index: usize, full_name: FullName) {
        self.entries.insert(index, full_name);
        debug_assert!(self.is_sorted());
    }

    pub fn remove(&mut self, index: usize) -> FullName {
        self.entries.remove(index)
    }

    pub fn get(&self, index: usize) -> Option<&FullName> {
        self.entries.get(index)
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut FullName> {
        self.entries.get_mut(index)
    }

    pub fn is_sorted(&self) -> bool {
        self.entries.windows(2).all(|pair| {
            (&pair[0].indexing_name, pair[0].physical_name.as_str())
                <= (&pair[1].indexing_name, pair[1].physical_name.as_str())
        })
    }
}

/// One project revision, annotated with the child index the fold resolved.
#[derive(Debug, Clone)]
pub struct ProjectRevision {
    pub record: Arc<RevisionRecord>,
    pub comment: Option<String>,
    pub label_comment: Option<String>,
    pub full_name: Option<FullName>,
    /// previous naming for renames
    pub old_full_name: Option<FullName>,
    /// index into the directory state where the child was found or inserted
    pub item_index: Option<usize>,
    pub errors: Vec<String>,
}

/// The fold's output: annotated revisions plus the final child array.
#[derive(Debug)]
pub struct ProjectHistory {
    pub revisions: Vec<ProjectRevision>,
    pub state: DirectoryState,
}

/// A project item file: header, revision records, and the child array fold.
#[derive(Debug)]
pub struct ProjectItemFile {
    file: RecordFile<ItemRecord>,
    pub preamble: ItemFilePreamble,
    pub header: ProjectHeaderRecord,
    revision_offsets: Vec<u32>,
    history: RwLock<Option<Arc<ProjectHistory>>>,
}

impl ProjectItemFile {
    /// Interpret an already-loaded item file as a project item.
    pub fn new(mut file: RecordFile<ItemRecord>, ignore_unknown: bool) -> VssResult<Self> {
        let (preamble, record_header, mut payload) = super::open_item_file(&mut file)?;
        if preamble.file_type != ItemFileType::Project {
            return Err(VssError::BadDatabase(format!(
                "{} is not a project item file",
                file.filename
            )));
        }
        let header = ProjectHeaderRecord::parse(record_header, &mut payload)?;
        if header.common.item_type != preamble.file_type {
            return Err(crate::record::RecordError::BadHeader(
                "header record type mismatch".into(),
            )
            .into());
        }
        file.read_all_records(None, Some(header.common.eof_offset as u32), ignore_unknown)?;

        let revision_offsets: Vec<u32> = file
            .records()
            .filter(|r| matches!(&***r, ItemRecord::Revision(_)))
            .map(|r| r.header().offset)
            .collect();

        Ok(Self {
            file,
            preamble,
            header,
            revision_offsets,
            history: RwLock::new(None),
        })
    }

    pub fn filename(&self) -> &str {
        &self.file.filename
    }

    pub fn record_file(&self) -> &RecordFile<ItemRecord> {
        &self.file
    }

    pub fn data_file_name(&self) -> String {
        format!("{}{}", self.file.filename, self.header.common.data_ext_str())
    }

    pub fn last_revision(&self) -> i32 {
        i32::from(self.header.common.num_revisions)
    }

    /// Current children from the project data file, in record order.
    pub fn entries(&self, db: &Database) -> VssResult<Vec<ProjectEntryRecord>> {
        let mut file: RecordFile<ProjectEntryRecord> =
            db.open_plain_record_file(&self.data_file_name(), true)?;
        file.read_all_records(Some(0), None, false)?;
        Ok(file.records().map(|r| (**r).clone()).collect())
    }

    fn comment_at(
        &self,
        offset: u32,
        length: u16,
        errors: &mut Vec<String>,
    ) -> Option<String> {
        if offset == 0 || length == 0 {
            return None;
        }
        match self.file.get_comment(offset) {
            Ok(record) => Some(record.comment),
            Err(e) => {
                errors.push(format!("comment lookup failed: {e}"));
                None
            }
        }
    }

    /// Build (or fetch) the project history: fold every revision forward over
    /// the ordered child array.
    pub fn history(&self, db: &Database) -> VssResult<Arc<ProjectHistory>> {
        if let Some(built) = self.history.read().as_ref() {
            return Ok(Arc::clone(built));
        }

        let mut state = DirectoryState::default();
        let mut revisions = Vec::with_capacity(self.revision_offsets.len());
        for offset in &self.revision_offsets {
            let record = self.file.get_revision(*offset)?;
            let mut revision = self.apply_revision(db, &mut state, record);
            let comment_errors = &mut revision.errors;
            revision.comment = self.comment_at(
                revision.record.comment_offset,
                revision.record.comment_length,
                comment_errors,
            );
            revision.label_comment = self.comment_at(
                revision.record.label_comment_offset,
                revision.record.label_comment_length,
                comment_errors,
            );
            revisions.push(revision);
        }

        let built = Arc::new(ProjectHistory { revisions, state });
        *self.history.write() = Some(Arc::clone(&built));
        Ok(built)
    }

    /// Apply one revision to the child array and annotate it with the index
    /// it resolved. Lookup misses are recorded as error strings, never
    /// aborts: the fold keeps going.
    fn apply_revision(
        &self,
        db: &Database,
        state: &mut DirectoryState,
        record: Arc<RevisionRecord>,
    ) -> ProjectRevision {
        let mut revision = ProjectRevision {
            record: Arc::clone(&record),
            comment: None,
            label_comment: None,
            full_name: None,
            old_full_name: None,
            item_index: None,
            errors: Vec::new(),
        };

        use RevisionAction::*;
        match (&record.action, &record.kind) {
            (_, RevisionKind::Label) => {}
            (action, RevisionKind::Common { name, physical }) => {
                let full_name = FullName::new(db, name, physical);
                match action {
                    CreateProject | CreateFile if record.revision_num == 1 => {
                        // the project's own creation entry, not a child
                    }
                    AddProject | AddFile | CreateProject | CreateFile => {
                        let index = state.find_insertion_index(&full_name);
                        state.insert(index, full_name.clone());
                        revision.item_index = Some(index);
                    }
                    DeleteProject | DeleteFile => {
                        match state.find_item(&full_name.indexing_name, &full_name.physical_name) {
                            Some(index) => {
                                if let Some(entry) = state.get_mut(index) {
                                    entry.deleted = true;
                                }
                                revision.item_index = Some(index);
                            }
                            None => revision.errors.push(format!(
                                "delete: no live child named '{}' ({})",
                                full_name.logical_name, full_name.physical_name
                            )),
                        }
                    }
                    RecoverProject | RecoverFile => {
                        match state
                            .find_deleted(&full_name.indexing_name, &full_name.physical_name)
                        {
                            Some(index) => {
                                if let Some(entry) = state.get_mut(index) {
                                    entry.deleted = false;
                                }
                                revision.item_index = Some(index);
                            }
                            None => revision.errors.push(format!(
                                "recover: no deleted child named '{}' ({})",
                                full_name.logical_name, full_name.physical_name
                            )),
                        }
                    }
                    _ => {}
                }
                revision.full_name = Some(full_name);
            }
            (_, RevisionKind::Destroy { name, physical, .. }) => {
                let full_name = FullName::new(db, name, physical);
                match state.find_any(&full_name.indexing_name, &full_name.physical_name) {
                    Some(index) => {
                        state.remove(index);
                        revision.item_index = Some(index);
                    }
                    None => revision.errors.push(format!(
                        "destroy: no child named '{}' ({})",
                        full_name.logical_name, full_name.physical_name
                    )),
                }
                revision.full_name = Some(full_name);
            }
            (_, RevisionKind::Rename { name, old_name, physical }) => {
                let new_full_name = FullName::new(db, name, physical);
                let old_full_name = FullName::new(db, old_name, physical);
                match state.find_any(&old_full_name.indexing_name, &old_full_name.physical_name) {
                    Some(index) => {
                        let removed = state.remove(index);
                        let mut renamed = new_full_name.clone();
                        renamed.deleted = removed.deleted;
                        let new_index = state.find_insertion_index(&renamed);
                        state.insert(new_index, renamed);
                        revision.item_index = Some(new_index);
                    }
                    None => revision.errors.push(format!(
                        "rename: no child named '{}' ({})",
                        old_full_name.logical_name, old_full_name.physical_name
                    )),
                }
                revision.full_name = Some(new_full_name);
                revision.old_full_name = Some(old_full_name);
            }
            (action, RevisionKind::Move { name, physical, .. }) => {
                let full_name = FullName::new(db, name, physical);
                match action {
                    MoveFrom => {
                        // the child arrives in this project
                        let index = state.find_insertion_index(&full_name);
                        state.insert(index, full_name.clone());
                        revision.item_index = Some(index);
                    }
                    MoveTo => {
                        // the child leaves this project
                        match state.find_any(&full_name.indexing_name, &full_name.physical_name) {
                            Some(index) => {
                                state.remove(index);
                                revision.item_index = Some(index);
                            }
                            None => revision.errors.push(format!(
                                "move: no child named '{}' ({})",
                                full_name.logical_name, full_name.physical_name
                            )),
                        }
                    }
                    _ => {}
                }
                revision.full_name = Some(full_name);
            }
            (_, RevisionKind::Share { name, physical, .. })
            | (_, RevisionKind::Branch { name, physical, .. })
            | (_, RevisionKind::ArchiveRestore { name, physical, .. }) => {
                // no structural change; just locate the child
                let full_name = FullName::new(db, name, physical);
                revision.item_index =
                    state.find_any(&full_name.indexing_name, &full_name.physical_name);
                revision.full_name = Some(full_name);
            }
            (_, RevisionKind::Checkin { .. }) => {}
        }

        revision
    }

    pub fn dump(&self, w: &mut dyn Write, with_records: bool) -> std::io::Result<()> {
        writeln!(
            w,
            "Item file {}, size: {:06X}",
            self.file.filename, self.file.file_size
        )?;
        self.header.dump(w)?;
        if with_records {
            for record in self.file.records() {
                writeln!(w)?;
                record.dump(w, true)?;
            }
        }
        Ok(())
    }
}
