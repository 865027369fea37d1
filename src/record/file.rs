//! A whole record file held in memory.
//!
//! Files are small by modern standards and records reference arbitrary
//! positions, so the file is read fully into an immutable buffer on open.
//! Records are parsed through a factory type and cached by offset; the cache
//! is the single source of truth, so asking for the same offset twice hands
//! back the same shared record.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;

use crate::encoding::Encoding;
use crate::record::error::{RecordError, RecordResult};
use crate::record::header::RecordHeader;
use crate::record::reader::RecordReader;
use crate::record::records::{
    BranchBacklinkRecord, CommentRecord, DeltaRecord, ItemRecord, ProjectBacklinkRecord,
};
use crate::record::revision::RevisionRecord;

/// A record factory: decodes one payload into a typed record, or `None` when
/// the signature belongs to no record this factory knows.
pub trait ParseRecord: Sized {
    fn parse(header: RecordHeader, reader: &mut RecordReader) -> RecordResult<Option<Self>>;
    fn header(&self) -> &RecordHeader;
    fn class_name(&self) -> &'static str;
}

impl ParseRecord for ItemRecord {
    fn parse(header: RecordHeader, reader: &mut RecordReader) -> RecordResult<Option<Self>> {
        ItemRecord::parse(header, reader)
    }

    fn header(&self) -> &RecordHeader {
        ItemRecord::header(self)
    }

    fn class_name(&self) -> &'static str {
        ItemRecord::class_name(self)
    }
}

/// One on-disk record file, loaded whole, with an offset-keyed record cache.
#[derive(Debug)]
pub struct RecordFile<R> {
    /// the physical name the file was opened under
    pub filename: String,
    pub path: PathBuf,
    pub file_size: usize,
    reader: RecordReader,
    /// accept a bad CRC with a warning instead of failing the file
    lenient_crc: bool,
    records: BTreeMap<u32, Arc<R>>,
}

impl<R: ParseRecord> RecordFile<R> {
    pub fn from_bytes(
        filename: impl Into<String>,
        path: PathBuf,
        data: Vec<u8>,
        encoding: Encoding,
        lenient_crc: bool,
    ) -> Self {
        let data: Arc<[u8]> = Arc::from(data);
        let file_size = data.len();
        Self {
            filename: filename.into(),
            path,
            file_size,
            reader: RecordReader::new(data, encoding),
            lenient_crc,
            records: BTreeMap::new(),
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.reader.encoding()
    }

    /// A reader positioned at the start of the file, for preamble parsing.
    pub fn reader(&mut self) -> &mut RecordReader {
        &mut self.reader
    }

    /// Parse one record at `offset` (or at the current cursor), validate its
    /// CRC, cache it, and leave the cursor at the next record.
    ///
    /// Returns `Ok(None)` when the record is unrecognized (unknown signature
    /// or unknown revision action) and `ignore_unknown` is set; the cursor
    /// still advances past the record so the caller can keep walking.
    pub fn read_record(
        &mut self,
        offset: Option<u32>,
        ignore_unknown: bool,
    ) -> RecordResult<Option<Arc<R>>> {
        if let Some(offset) = offset {
            self.reader.seek(offset as usize)?;
        }
        let record_offset = self.reader.offset() as u32;
        if let Some(record) = self.records.get(&record_offset) {
            self.reader
                .seek(record_offset as usize + RecordHeader::LENGTH + record.header().length as usize)?;
            return Ok(Some(Arc::clone(record)));
        }

        let (header, mut payload) =
            RecordHeader::read(&mut self.reader).map_err(|e| self.as_truncated(record_offset, e))?;

        match header.check_crc() {
            Ok(()) => {}
            Err(e) if self.lenient_crc => {
                warn!(file = %self.filename, offset = record_offset, "accepting record with bad CRC: {e}");
            }
            Err(e) => return Err(e),
        }

        let parsed = match R::parse(header.clone(), &mut payload) {
            Ok(Some(record)) => record,
            Ok(None) => {
                if ignore_unknown {
                    return Ok(None);
                }
                return Err(RecordError::UnrecognizedRecord {
                    signature: header.signature,
                    filename: self.filename.clone(),
                });
            }
            Err(RecordError::UnknownRevisionAction { action, offset }) if ignore_unknown => {
                warn!(file = %self.filename, offset, action, "skipping revision with unknown action");
                return Ok(None);
            }
            Err(e) => return Err(self.as_truncated(record_offset, e)),
        };

        let record = Arc::new(parsed);
        self.records.insert(record_offset, Arc::clone(&record));
        Ok(Some(record))
    }

    /// A payload read running off the end of its record means the record (or
    /// the file) is cut short.
    fn as_truncated(&self, offset: u32, error: RecordError) -> RecordError {
        match error {
            RecordError::EndOfBuffer { .. } => RecordError::Truncated {
                offset,
                reason: error.to_string(),
            },
            other => other,
        }
    }

    /// Walk records sequentially from `begin` (or the current cursor) up to
    /// `end` (or the file size), populating the offset cache.
    pub fn read_all_records(
        &mut self,
        begin: Option<u32>,
        end: Option<u32>,
        ignore_unknown: bool,
    ) -> RecordResult<()> {
        if let Some(begin) = begin {
            self.reader.seek(begin as usize)?;
        }
        let end = end.map_or(self.file_size, |e| e as usize);
        while self.reader.offset() + RecordHeader::LENGTH <= end {
            self.read_record(None, ignore_unknown)?;
        }
        Ok(())
    }

    /// All cached records in file order.
    pub fn records(&self) -> impl Iterator<Item = &Arc<R>> {
        self.records.values()
    }

    /// Cache lookup by offset.
    pub fn get_record(&self, offset: u32) -> RecordResult<Arc<R>> {
        self.records
            .get(&offset)
            .cloned()
            .ok_or_else(|| RecordError::RecordNotFound {
                offset,
                filename: self.filename.clone(),
            })
    }
}

impl RecordFile<ItemRecord> {
    fn get_expecting(&self, offset: u32, expected: &'static str) -> RecordResult<Arc<ItemRecord>> {
        let record = self.get_record(offset)?;
        if record.class_name() != expected {
            return Err(RecordError::WrongRecordClass {
                offset,
                filename: self.filename.clone(),
                expected,
                actual: record.class_name(),
            });
        }
        Ok(record)
    }

    pub fn get_comment(&self, offset: u32) -> RecordResult<CommentRecord> {
        match &*self.get_expecting(offset, "comment")? {
            ItemRecord::Comment(r) => Ok(r.clone()),
            _ => unreachable!(),
        }
    }

    pub fn get_delta(&self, offset: u32) -> RecordResult<Arc<DeltaRecord>> {
        match &*self.get_expecting(offset, "delta")? {
            ItemRecord::Delta(r) => Ok(Arc::new(r.clone())),
            _ => unreachable!(),
        }
    }

    pub fn get_revision(&self, offset: u32) -> RecordResult<Arc<RevisionRecord>> {
        match &*self.get_expecting(offset, "revision")? {
            ItemRecord::Revision(r) => Ok(Arc::new(r.clone())),
            _ => unreachable!(),
        }
    }

    pub fn get_project_backlink(&self, offset: u32) -> RecordResult<ProjectBacklinkRecord> {
        match &*self.get_expecting(offset, "project backlink")? {
            ItemRecord::Project(r) => Ok(r.clone()),
            _ => unreachable!(),
        }
    }

    pub fn get_branch_backlink(&self, offset: u32) -> RecordResult<BranchBacklinkRecord> {
        match &*self.get_expecting(offset, "branch backlink")? {
            ItemRecord::Branch(r) => Ok(r.clone()),
            _ => unreachable!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::reader::crc16_fold;

    fn record_bytes(signature: [u8; 2], payload: &[u8]) -> Vec<u8> {
        let crc = if signature == *b"MC" {
            0
        } else {
            crc16_fold(payload)
        };
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&signature);
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    fn file(data: Vec<u8>) -> RecordFile<ItemRecord> {
        RecordFile::from_bytes("TESTFILE", PathBuf::new(), data, Encoding::Utf8, false)
    }

    fn backlink_payload(prev: u32, name: &[u8]) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&prev.to_le_bytes());
        let mut field = [0u8; 12];
        field[..name.len()].copy_from_slice(name);
        payload.extend_from_slice(&field);
        payload
    }

    #[test]
    fn test_read_all_and_cache_coherence() {
        let mut data = Vec::new();
        data.extend_from_slice(&record_bytes(*b"MC", b"first comment\x00"));
        let second_offset = data.len() as u32;
        data.extend_from_slice(&record_bytes(*b"RP", &backlink_payload(0, b"BAAAAAAA")));

        let mut f = file(data);
        f.read_all_records(Some(0), None, false).unwrap();
        assert_eq!(f.records().count(), 2);

        // get_record returns the identical instance the sequential walk produced
        let from_walk = f.records().nth(1).unwrap().clone();
        let from_cache = f.get_record(second_offset).unwrap();
        assert!(Arc::ptr_eq(&from_walk, &from_cache));
    }

    #[test]
    fn test_wrong_record_class() {
        let data = record_bytes(*b"MC", b"a comment\x00");
        let mut f = file(data);
        f.read_all_records(Some(0), None, false).unwrap();

        assert!(f.get_comment(0).is_ok());
        assert!(matches!(
            f.get_delta(0),
            Err(RecordError::WrongRecordClass { .. })
        ));
    }

    #[test]
    fn test_unknown_signature_skip_or_fail() {
        let mut data = Vec::new();
        data.extend_from_slice(&record_bytes(*b"ZZ", b"\x00\x00\x00\x00"));
        data.extend_from_slice(&record_bytes(*b"MC", b"after unknown\x00"));

        let mut f = file(data.clone());
        assert!(matches!(
            f.read_all_records(Some(0), None, false),
            Err(RecordError::UnrecognizedRecord { .. })
        ));

        let mut f = file(data);
        f.read_all_records(Some(0), None, true).unwrap();
        // only the known record lands in the cache
        assert_eq!(f.records().count(), 1);
        assert_eq!(f.records().next().unwrap().class_name(), "comment");
    }

    #[test]
    fn test_crc_failure_and_lenient_mode() {
        let mut data = record_bytes(*b"RP", &backlink_payload(0, b"CAAAAAAA"));
        // corrupt one payload byte
        let last = data.len() - 1;
        data[last] ^= 0xFF;

        let mut f = file(data.clone());
        assert!(matches!(
            f.read_record(Some(0), false),
            Err(RecordError::CrcMismatch { .. })
        ));

        let mut f =
            RecordFile::<ItemRecord>::from_bytes("TESTFILE", PathBuf::new(), data, Encoding::Utf8, true);
        assert!(f.read_record(Some(0), false).unwrap().is_some());
    }

    #[test]
    fn test_missing_offset() {
        let f = file(Vec::new());
        assert!(matches!(
            f.get_record(0x10),
            Err(RecordError::RecordNotFound { .. })
        ));
    }

    #[test]
    fn test_truncated_mid_payload() {
        let mut data = record_bytes(*b"MC", b"comment\x00");
        data.truncate(data.len() - 3);
        let mut f = file(data);
        assert!(matches!(
            f.read_record(Some(0), false),
            Err(RecordError::Truncated { .. })
        ));
    }
}
