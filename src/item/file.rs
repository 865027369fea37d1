//! File item files: per-file history and content reconstruction.
//!
//! The data file next to a file item holds only the latest content. Earlier
//! revisions are reconstructed by walking the revision records from last to
//! first and applying each checkin's delta record to the successor content,
//! hopping into the branch parent's item file when the chain crosses the
//! branch point.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::db::{Database, VssError, VssResult};
use crate::item::header::{FileHeaderFlags, FileHeaderRecord, ItemFilePreamble, ItemFileType};
use crate::record::{
    BranchBacklinkRecord, CheckoutRecord, ItemRecord, ProjectBacklinkRecord, RecordFile,
    RecordResult, RevisionKind, RevisionRecord,
};

/// One reconstructed file revision.
#[derive(Debug, Clone)]
pub struct FileRevision {
    pub record: Arc<RevisionRecord>,
    pub comment: Option<String>,
    pub label_comment: Option<String>,
    /// file content as of this revision
    pub content: Option<Arc<[u8]>>,
    /// non-fatal reconstruction problems (dangling offsets and the like)
    pub errors: Vec<String>,
}

/// A file item file: header plus its ordered revision records.
#[derive(Debug)]
pub struct FileItemFile {
    file: RecordFile<ItemRecord>,
    pub preamble: ItemFilePreamble,
    pub header: FileHeaderRecord,
    /// offsets of revision records, in file order
    revision_offsets: Vec<u32>,
    revisions: RwLock<Option<Arc<Vec<FileRevision>>>>,
}

impl FileItemFile {
    /// Interpret an already-loaded item file as a file item.
    pub fn new(mut file: RecordFile<ItemRecord>, ignore_unknown: bool) -> VssResult<Self> {
        let (preamble, record_header, mut payload) = super::open_item_file(&mut file)?;
        if preamble.file_type != ItemFileType::File {
            return Err(VssError::BadDatabase(format!(
                "{} is not a file item file",
                file.filename
            )));
        }
        let header = FileHeaderRecord::parse(record_header, &mut payload)?;
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
        Self::check_revision_numbering(&file, &header, &revision_offsets);

        Ok(Self {
            file,
            preamble,
            header,
            revision_offsets,
            revisions: RwLock::new(None),
        })
    }

    /// Revision numbers must run without gaps from the header's first
    /// revision up to its latest. A violation is logged, not fatal: the rest
    /// of the file is usually still readable.
    fn check_revision_numbering(
        file: &RecordFile<ItemRecord>,
        header: &FileHeaderRecord,
        offsets: &[u32],
    ) {
        let mut expected = i32::from(header.common.first_revision);
        for offset in offsets {
            if let Ok(ItemRecord::Revision(rev)) = file.get_record(*offset).as_deref() {
                if rev.revision_num != expected {
                    warn!(
                        file = %file.filename,
                        offset,
                        expected,
                        actual = rev.revision_num,
                        "revision numbering out of sequence"
                    );
                    return;
                }
                expected += 1;
            }
        }
        if expected != i32::from(header.common.num_revisions) + 1 {
            warn!(
                file = %file.filename,
                latest = header.common.num_revisions,
                "revision count does not match header"
            );
        }
    }

    pub fn filename(&self) -> &str {
        &self.file.filename
    }

    pub fn record_file(&self) -> &RecordFile<ItemRecord> {
        &self.file
    }

    /// Name of the sibling data file holding the latest content.
    pub fn data_file_name(&self) -> String {
        format!("{}{}", self.file.filename, self.header.common.data_ext_str())
    }

    pub fn is_locked(&self) -> bool {
        self.header.flags.has(FileHeaderFlags::LOCKED)
    }

    pub fn is_binary(&self) -> bool {
        self.header.flags.has(FileHeaderFlags::BINARY)
    }

    pub fn is_latest_only(&self) -> bool {
        self.header.flags.has(FileHeaderFlags::LATEST_ONLY)
    }

    pub fn is_shared(&self) -> bool {
        self.header.flags.has(FileHeaderFlags::SHARED)
    }

    pub fn is_checked_out(&self) -> bool {
        self.header.flags.has(FileHeaderFlags::CHECKED_OUT)
    }

    pub fn first_revision(&self) -> i32 {
        i32::from(self.header.common.first_revision)
    }

    pub fn last_revision(&self) -> i32 {
        i32::from(self.header.common.num_revisions)
    }

    /// The containing-project backlinks in link-list order.
    pub fn project_backlinks(&self) -> RecordResult<Vec<ProjectBacklinkRecord>> {
        let mut backlinks = Vec::new();
        let mut offset = self.header.project_offset as u32;
        while offset != 0 {
            let record = self.file.get_project_backlink(offset)?;
            offset = record.prev_project_offset;
            backlinks.push(record);
        }
        Ok(backlinks)
    }

    /// The branch backlinks in link-list order.
    pub fn branch_backlinks(&self) -> RecordResult<Vec<BranchBacklinkRecord>> {
        let mut backlinks = Vec::new();
        let mut offset = self.header.branch_offset as u32;
        while offset != 0 {
            let record = self.file.get_branch_backlink(offset)?;
            offset = record.prev_branch_offset;
            backlinks.push(record);
        }
        Ok(backlinks)
    }

    /// Active checkouts, newest first. The list walks back from the last
    /// checkout and stops at the first-checkout record.
    pub fn checkouts(&self) -> RecordResult<Vec<CheckoutRecord>> {
        let mut checkouts = Vec::new();
        let mut offset = self.header.last_checkout_offset as u32;
        while offset != 0 {
            let record = match self.file.get_record(offset)?.as_ref() {
                ItemRecord::Checkout(r) => r.clone(),
                _ => break,
            };
            let at_first = offset == self.header.first_checkout_offset as u32;
            offset = record.prev_checkout_offset;
            checkouts.push(record);
            if at_first {
                break;
            }
        }
        Ok(checkouts)
    }

    fn comment_at(&self, offset: u32, length: u16, errors: &mut Vec<String>) -> Option<String> {
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

    /// Build (or fetch) all revisions held by this file, threading the delta
    /// chain backward from the latest content.
    pub fn revisions(&self, db: &Database) -> VssResult<Arc<Vec<FileRevision>>> {
        if let Some(built) = self.revisions.read().as_ref() {
            return Ok(Arc::clone(built));
        }

        let latest = db.open_data_file(&self.data_file_name(), true);
        let mut content: Option<Arc<[u8]>> = match latest {
            Ok(bytes) => Some(Arc::from(bytes)),
            Err(e) => {
                // a purged or latest-only data file leaves history readable,
                // just without content
                warn!(file = %self.file.filename, "no data file for content reconstruction: {e}");
                None
            }
        };

        let mut revisions = Vec::with_capacity(self.revision_offsets.len());
        for offset in self.revision_offsets.iter().rev() {
            let record = self.file.get_revision(*offset)?;
            let mut errors = Vec::new();
            let comment = self.comment_at(record.comment_offset, record.comment_length, &mut errors);
            let label_comment = self.comment_at(
                record.label_comment_offset,
                record.label_comment_length,
                &mut errors,
            );

            let revision = FileRevision {
                record: Arc::clone(&record),
                comment,
                label_comment,
                content: content.clone(),
                errors,
            };

            // a checkin's delta turns this revision's content into its
            // predecessor's; every other action passes content through
            if let RevisionKind::Checkin {
                prev_delta_offset, ..
            } = &record.kind
            {
                if *prev_delta_offset != 0 {
                    if let Some(successor) = &content {
                        let delta = self.file.get_delta(*prev_delta_offset)?;
                        content = Some(Arc::from(delta.apply(successor)?));
                    }
                }
            }

            revisions.push(revision);
        }
        revisions.reverse();

        let built = Arc::new(revisions);
        *self.revisions.write() = Some(Arc::clone(&built));
        Ok(built)
    }

    /// One revision by version number. Versions below this file's first
    /// revision live in the branch parent's item file.
    pub fn revision(&self, db: &Database, version: i32) -> VssResult<FileRevision> {
        if version < 1 || version > self.last_revision() {
            return Err(VssError::VersionOutOfRange {
                version,
                first: 1,
                last: self.last_revision(),
            });
        }
        if version < self.first_revision() {
            if self.header.branch_file.is_empty() {
                return Err(VssError::BadDatabase(format!(
                    "{}: version {} predates the file and no branch parent is recorded",
                    self.file.filename, version
                )));
            }
            let parent = db.open_file_item(&self.header.branch_file)?;
            return parent.revision(db, version);
        }
        let revisions = self.revisions(db)?;
        let index = (version - self.first_revision()) as usize;
        revisions
            .get(index)
            .cloned()
            .ok_or_else(|| VssError::VersionOutOfRange {
                version,
                first: self.first_revision(),
                last: self.first_revision() + revisions.len() as i32 - 1,
            })
    }

    pub fn dump(&self, w: &mut dyn std::io::Write, with_records: bool) -> std::io::Result<()> {
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
