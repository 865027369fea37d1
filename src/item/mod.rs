//! item-file layer for the VSS database reader
//!
//! An item file is the per-project or per-file metadata file: a fixed
//! preamble, one header record, then the record stream (revisions, comments,
//! deltas, backlinks, checkouts). Project items reconstruct directory state
//! by folding revisions forward; file items reconstruct content by threading
//! delta records backward.

mod file;
mod header;
mod project;
mod tree;

pub use file::{FileItemFile, FileRevision};
pub use header::{
    FileHeaderFlags, FileHeaderRecord, ItemFilePreamble, ItemFileType, ItemHeader,
    ProjectHeaderRecord,
};
pub use project::{
    DirectoryState, FullName, ProjectEntryFlags, ProjectEntryRecord, ProjectHistory,
    ProjectItemFile, ProjectRevision,
};
pub use tree::{dump_tree, VssFile, VssItem, VssProject};

use crate::db::VssResult;
use crate::record::{ItemRecord, RecordFile, RecordHeader, RecordReader, Signature};

/// Read the shared head of an item file: the 52-byte preamble and the 'HD'
/// header record. Returns the header's payload reader for the caller's
/// type-specific tail parse, leaving the file cursor at the first stream
/// record.
fn open_item_file(
    file: &mut RecordFile<ItemRecord>,
) -> VssResult<(ItemFilePreamble, RecordHeader, RecordReader)> {
    let reader = file.reader();
    reader.seek(0)?;
    let preamble = ItemFilePreamble::read(reader)?;
    let (record_header, payload) = RecordHeader::read(reader)?;
    record_header.check_crc()?;
    record_header.check_signature(Signature::ITEM_HEADER)?;
    Ok((preamble, record_header, payload))
}
