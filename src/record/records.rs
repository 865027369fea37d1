//! Typed payload decoders for the non-revision item-file records.
//!
//! Each record is a plain struct parsed from its payload reader; records
//! reference each other only by file offset, never by in-memory pointers.

use std::io::Write;

use crate::record::error::{RecordError, RecordResult};
use crate::record::header::RecordHeader;
use crate::record::reader::RecordReader;
use crate::record::types::{timestamp_to_datetime, PhysicalName, Signature};

/// Comment record ('CM'): a zero-terminated byte string filling the payload.
/// The header CRC of a comment record is zero and is not verified.
#[derive(Debug, Clone)]
pub struct CommentRecord {
    pub header: RecordHeader,
    pub comment: String,
}

impl CommentRecord {
    pub fn parse(header: RecordHeader, reader: &mut RecordReader) -> RecordResult<Self> {
        let bytes = reader.read_byte_string_rest()?;
        let comment = reader.decode(&bytes);
        Ok(Self { header, comment })
    }

    pub fn dump(&self, w: &mut dyn Write) -> std::io::Result<()> {
        self.header.dump(w)?;
        writeln!(w, "Comment: {}", self.comment)
    }
}

/// Checkout record ('CF'): who has the file checked out, where, and since
/// when. Checkouts form a linked list through `prev_checkout_offset`.
#[derive(Debug, Clone)]
pub struct CheckoutRecord {
    pub header: RecordHeader,
    pub user: String,
    pub timestamp: u32,
    pub working_dir: String,
    pub machine: String,
    pub project_path: String,
    pub comment: String,
    pub revision: u16,
    pub flags: u16,
    pub prev_checkout_offset: u32,
}

impl CheckoutRecord {
    pub fn parse(header: RecordHeader, reader: &mut RecordReader) -> RecordResult<Self> {
        let user = reader.read_string(32)?;
        let timestamp = reader.read_u32()?;
        let working_dir = reader.read_string(260)?;
        let machine = reader.read_string(32)?;
        let project_path = reader.read_string(260)?;
        let comment = reader.read_string(64)?;
        let revision = reader.read_u16()?;
        let flags = reader.read_u16()?;
        let prev_checkout_offset = reader.read_u32()?;
        Ok(Self {
            header,
            user,
            timestamp,
            working_dir,
            machine,
            project_path,
            comment,
            revision,
            flags,
            prev_checkout_offset,
        })
    }

    pub fn dump(&self, w: &mut dyn Write) -> std::io::Result<()> {
        self.header.dump(w)?;
        writeln!(
            w,
            "Checked out by: '{}' at {} on machine '{}'",
            self.user,
            timestamp_to_datetime(self.timestamp),
            self.machine
        )?;
        writeln!(w, "  Project: {} (revision {})", self.project_path, self.revision)?;
        writeln!(w, "  Working dir: {}", self.working_dir)?;
        if !self.comment.is_empty() {
            writeln!(w, "  Comment: {}", self.comment)?;
        }
        if self.prev_checkout_offset != 0 {
            writeln!(w, "  Prev checkout offset: {:06X}", self.prev_checkout_offset)?;
        }
        Ok(())
    }
}

/// Containing-project backlink record ('PR'): one per project a shared file
/// belongs to, linked through `prev_project_offset` and terminated by zero.
#[derive(Debug, Clone)]
pub struct ProjectBacklinkRecord {
    pub header: RecordHeader,
    pub prev_project_offset: u32,
    pub project_file: PhysicalName,
}

impl ProjectBacklinkRecord {
    pub fn parse(header: RecordHeader, reader: &mut RecordReader) -> RecordResult<Self> {
        let prev_project_offset = reader.read_u32()?;
        let project_file = PhysicalName::from_wire(reader.read_bytes(12)?);
        Ok(Self {
            header,
            prev_project_offset,
            project_file,
        })
    }

    pub fn dump(&self, w: &mut dyn Write) -> std::io::Result<()> {
        self.header.dump(w)?;
        writeln!(w, "Included in project file: {}", self.project_file)?;
        if self.prev_project_offset != 0 {
            writeln!(w, "  Prev project offset: {:06X}", self.prev_project_offset)?;
        }
        Ok(())
    }
}

/// Branch backlink record ('BF'): one per file branched off this file,
/// linked through `prev_branch_offset`.
#[derive(Debug, Clone)]
pub struct BranchBacklinkRecord {
    pub header: RecordHeader,
    pub prev_branch_offset: u32,
    pub branch_file: PhysicalName,
}

impl BranchBacklinkRecord {
    pub fn parse(header: RecordHeader, reader: &mut RecordReader) -> RecordResult<Self> {
        let prev_branch_offset = reader.read_u32()?;
        let branch_file = PhysicalName::from_wire(reader.read_bytes(12)?);
        Ok(Self {
            header,
            prev_branch_offset,
            branch_file,
        })
    }

    pub fn dump(&self, w: &mut dyn Write) -> std::io::Result<()> {
        self.header.dump(w)?;
        writeln!(w, "Branched to file: {}", self.branch_file)?;
        if self.prev_branch_offset != 0 {
            writeln!(w, "  Prev branch offset: {:06X}", self.prev_branch_offset)?;
        }
        Ok(())
    }
}

/// Delta operation codes. This crate pins the `{0, 1, 2}` mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOpCode {
    /// copy bytes from the delta record's own inline log region
    WriteLog = 0,
    /// copy bytes from the successor (later revision) content
    WriteSuccessor = 1,
    /// end of the operation sequence
    Stop = 2,
}

impl DeltaOpCode {
    fn from_wire(value: u16) -> RecordResult<Self> {
        match value {
            0 => Ok(DeltaOpCode::WriteLog),
            1 => Ok(DeltaOpCode::WriteSuccessor),
            2 => Ok(DeltaOpCode::Stop),
            other => Err(RecordError::BadHeader(format!(
                "unknown delta operation code {other}"
            ))),
        }
    }
}

/// One delta operation: `u16 op | u32 size | u32 offset`, packed.
#[derive(Debug, Clone, Copy)]
pub struct DeltaOp {
    pub op: DeltaOpCode,
    pub size: u32,
    pub offset: u32,
}

/// Delta record ('DF'): the reverse transformation from a revision's content
/// to its predecessor's. Operations run until `Stop`; the inline log data
/// region follows the stop operation and is indexed by `WriteLog` offsets.
#[derive(Debug, Clone)]
pub struct DeltaRecord {
    pub header: RecordHeader,
    pub ops: Vec<DeltaOp>,
    pub log_data: Vec<u8>,
}

impl DeltaRecord {
    pub fn parse(header: RecordHeader, reader: &mut RecordReader) -> RecordResult<Self> {
        let mut ops = Vec::new();
        loop {
            let op = DeltaOpCode::from_wire(reader.read_u16_unaligned()?)?;
            let size = reader.read_u32_unaligned()?;
            let offset = reader.read_u32_unaligned()?;
            ops.push(DeltaOp { op, size, offset });
            if op == DeltaOpCode::Stop {
                break;
            }
        }
        let log_data = reader.read_bytes(reader.remaining())?.to_vec();
        Ok(Self {
            header,
            ops,
            log_data,
        })
    }

    /// Reconstruct the predecessor content from the successor content.
    ///
    /// Output length isn't known up front; the buffer grows as operations
    /// append and the sequence ends exactly at `Stop`.
    pub fn apply(&self, successor: &[u8]) -> RecordResult<Vec<u8>> {
        let mut output = Vec::new();
        for op in &self.ops {
            let offset = op.offset as usize;
            let size = op.size as usize;
            match op.op {
                DeltaOpCode::Stop => break,
                DeltaOpCode::WriteLog => {
                    if offset > self.log_data.len() || size > self.log_data.len() - offset {
                        return Err(RecordError::EndOfBuffer {
                            requested: size,
                            remaining: self.log_data.len().saturating_sub(offset),
                        });
                    }
                    output.extend_from_slice(&self.log_data[offset..offset + size]);
                }
                DeltaOpCode::WriteSuccessor => {
                    if offset > successor.len() || size > successor.len() - offset {
                        return Err(RecordError::EndOfBuffer {
                            requested: size,
                            remaining: successor.len().saturating_sub(offset),
                        });
                    }
                    output.extend_from_slice(&successor[offset..offset + size]);
                }
            }
        }
        Ok(output)
    }

    pub fn dump(&self, w: &mut dyn Write, with_ops: bool) -> std::io::Result<()> {
        self.header.dump(w)?;
        writeln!(
            w,
            "Delta: {} operation(s), {} log byte(s)",
            self.ops.len(),
            self.log_data.len()
        )?;
        if with_ops {
            for op in &self.ops {
                writeln!(
                    w,
                    "  {:?} size={:#x} offset={:#x}",
                    op.op, op.size, op.offset
                )?;
            }
        }
        Ok(())
    }
}

/// All record kinds that appear inside an item file, tagged by signature.
///
/// The deep record-class hierarchy of historical readers becomes one tagged
/// variant: the factory is a pure function from (header, payload) to this.
#[derive(Debug, Clone)]
pub enum ItemRecord {
    Comment(CommentRecord),
    Checkout(CheckoutRecord),
    Project(ProjectBacklinkRecord),
    Branch(BranchBacklinkRecord),
    Revision(super::revision::RevisionRecord),
    Delta(DeltaRecord),
}

impl ItemRecord {
    /// Decode one item-file record. Returns `Ok(None)` for signatures this
    /// factory doesn't know, so callers can skip them when asked to.
    pub fn parse(
        header: RecordHeader,
        reader: &mut RecordReader,
    ) -> RecordResult<Option<ItemRecord>> {
        let record = match header.signature {
            Signature::COMMENT => ItemRecord::Comment(CommentRecord::parse(header, reader)?),
            Signature::CHECKOUT => ItemRecord::Checkout(CheckoutRecord::parse(header, reader)?),
            Signature::PROJECT => ItemRecord::Project(ProjectBacklinkRecord::parse(header, reader)?),
            Signature::BRANCH => ItemRecord::Branch(BranchBacklinkRecord::parse(header, reader)?),
            Signature::REVISION => {
                ItemRecord::Revision(super::revision::RevisionRecord::parse(header, reader)?)
            }
            Signature::DELTA => ItemRecord::Delta(DeltaRecord::parse(header, reader)?),
            _ => return Ok(None),
        };
        Ok(Some(record))
    }

    pub fn header(&self) -> &RecordHeader {
        match self {
            ItemRecord::Comment(r) => &r.header,
            ItemRecord::Checkout(r) => &r.header,
            ItemRecord::Project(r) => &r.header,
            ItemRecord::Branch(r) => &r.header,
            ItemRecord::Revision(r) => &r.header,
            ItemRecord::Delta(r) => &r.header,
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            ItemRecord::Comment(_) => "comment",
            ItemRecord::Checkout(_) => "checkout",
            ItemRecord::Project(_) => "project backlink",
            ItemRecord::Branch(_) => "branch backlink",
            ItemRecord::Revision(_) => "revision",
            ItemRecord::Delta(_) => "delta",
        }
    }

    pub fn dump(&self, w: &mut dyn Write, with_delta_ops: bool) -> std::io::Result<()> {
        match self {
            ItemRecord::Comment(r) => r.dump(w),
            ItemRecord::Checkout(r) => r.dump(w),
            ItemRecord::Project(r) => r.dump(w),
            ItemRecord::Branch(r) => r.dump(w),
            ItemRecord::Revision(r) => r.dump(w),
            ItemRecord::Delta(r) => r.dump(w, with_delta_ops),
        }
    }
}
