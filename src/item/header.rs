//! Item file preamble and header records.
//!
//! Every item file opens with a fixed 52-byte preamble, followed by one
//! 'HD' header record whose tail differs between file items and project
//! items, followed by the record stream proper.

use std::io::Write;

use crate::record::{
    timestamp_to_datetime, PhysicalName, RecordError, RecordHeader, RecordReader, RecordResult,
    VssName,
};

/// What an item file describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemFileType {
    Project = 1,
    File = 2,
}

impl ItemFileType {
    pub fn from_wire(value: i16) -> RecordResult<Self> {
        match value {
            1 => Ok(ItemFileType::Project),
            2 => Ok(ItemFileType::File),
            other => Err(RecordError::BadHeader(format!(
                "unknown item file type {other}"
            ))),
        }
    }
}

/// The fixed file preamble (52 bytes).
#[derive(Debug, Clone)]
pub struct ItemFilePreamble {
    pub file_type: ItemFileType,
    pub file_version: i16,
}

impl ItemFilePreamble {
    pub const SIGNATURE: &'static [u8] = b"SourceSafe@Microsoft\x00";
    pub const ITEM_FILE_VERSION: i16 = 6;

    pub fn read(reader: &mut RecordReader) -> RecordResult<Self> {
        let map_truncated = |e: RecordError| match e {
            RecordError::EndOfBuffer { .. } => RecordError::BadHeader("truncated preamble".into()),
            other => other,
        };

        let signature = reader.read_bytes(0x20).map_err(map_truncated)?;
        if &signature[..Self::SIGNATURE.len()] != Self::SIGNATURE {
            return Err(RecordError::BadHeader("incorrect file signature".into()));
        }
        let file_type = ItemFileType::from_wire(reader.read_i16().map_err(map_truncated)?)?;
        let file_version = reader.read_i16().map_err(map_truncated)?;
        if file_version != Self::ITEM_FILE_VERSION {
            return Err(RecordError::BadHeader(format!(
                "incorrect file version {file_version}"
            )));
        }
        reader.skip(16).map_err(map_truncated)?; // filler words
        Ok(Self {
            file_type,
            file_version,
        })
    }
}

/// The part of the 'HD' header record both item kinds share.
#[derive(Debug, Clone)]
pub struct ItemHeader {
    pub record_header: RecordHeader,
    pub item_type: ItemFileType,
    /// includes revisions of the branch parent(s)
    pub num_revisions: u16,
    pub name: VssName,
    /// first revision stored in this file (> 1 for branched files)
    pub first_revision: u16,
    /// data-file extension letter; alternates on each content update
    pub data_ext: [u8; 2],
    pub first_revision_offset: i32,
    pub last_revision_offset: i32,
    pub eof_offset: i32,
    pub rights_offset: i32,
}

impl ItemHeader {
    fn parse(record_header: RecordHeader, reader: &mut RecordReader) -> RecordResult<Self> {
        let item_type = ItemFileType::from_wire(reader.read_i16()?)?;
        let num_revisions = reader.read_u16()?;
        let name = reader.read_name()?;
        let first_revision = reader.read_u16()?;
        let ext = reader.read_bytes(2)?;
        let data_ext = [ext[0], ext[1]];
        let first_revision_offset = reader.read_i32()?;
        let last_revision_offset = reader.read_i32()?;
        let eof_offset = reader.read_i32()?;
        let rights_offset = reader.read_i32()?;
        reader.skip(16)?; // filler words
        Ok(Self {
            record_header,
            item_type,
            num_revisions,
            name,
            first_revision,
            data_ext,
            first_revision_offset,
            last_revision_offset,
            eof_offset,
            rights_offset,
        })
    }

    /// The data-file suffix letter as text.
    pub fn data_ext_str(&self) -> String {
        String::from_utf8_lossy(crate::record::zero_terminated(&self.data_ext)).into_owned()
    }

    pub fn dump(&self, w: &mut dyn Write) -> std::io::Result<()> {
        self.record_header.dump(w)?;
        writeln!(
            w,
            "  Item Type: {} - Revisions: {} - Name: {}",
            if self.item_type == ItemFileType::Project {
                "Project"
            } else {
                "File"
            },
            self.num_revisions,
            String::from_utf8_lossy(&self.name.short_name)
        )?;
        if self.name.name_file_offset != 0 {
            writeln!(w, "  Name offset: {:06X}", self.name.name_file_offset)?;
        }
        writeln!(w, "  First revision: #{:3}", self.first_revision)?;
        if !self.data_ext_str().is_empty() {
            writeln!(w, "  Data extension: {}", self.data_ext_str())?;
        }
        writeln!(
            w,
            "  First/last rev offset: {:06X}/{:06X}",
            self.first_revision_offset, self.last_revision_offset
        )?;
        writeln!(w, "  EOF offset: {:06X}", self.eof_offset)?;
        if self.rights_offset != 0 {
            writeln!(w, "  Rights offset: {:06X}", self.rights_offset)?;
        }
        Ok(())
    }
}

/// File item flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileHeaderFlags(pub u16);

impl FileHeaderFlags {
    pub const LOCKED: u16 = 0x01;
    pub const BINARY: u16 = 0x02;
    /// store the latest version only
    pub const LATEST_ONLY: u16 = 0x04;
    pub const SHARED: u16 = 0x20;
    pub const CHECKED_OUT: u16 = 0x40;

    pub fn has(&self, flag: u16) -> bool {
        self.0 & flag != 0
    }
}

impl std::fmt::Display for FileHeaderFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = Vec::new();
        for (bit, name) in [
            (Self::LOCKED, "Locked"),
            (Self::BINARY, "Binary"),
            (Self::LATEST_ONLY, "LatestOnly"),
            (Self::SHARED, "Shared"),
            (Self::CHECKED_OUT, "CheckedOut"),
        ] {
            if self.has(bit) {
                names.push(name.to_string());
            }
        }
        let rest = self.0
            & !(Self::LOCKED | Self::BINARY | Self::LATEST_ONLY | Self::SHARED | Self::CHECKED_OUT);
        if rest != 0 || names.is_empty() {
            names.push(format!("{rest:#06x}"));
        }
        write!(f, "{}", names.join("|"))
    }
}

/// Header record of a file item file.
#[derive(Debug, Clone)]
pub struct FileHeaderRecord {
    pub common: ItemHeader,
    pub flags: FileHeaderFlags,
    /// parent this file was branched from, empty when not a branch
    pub branch_file: PhysicalName,
    /// head of the branch backlink chain
    pub branch_offset: i32,
    /// head of the containing-project backlink chain
    pub project_offset: i32,
    pub branch_count: u16,
    pub project_count: u16,
    pub first_checkout_offset: i32,
    pub last_checkout_offset: i32,
    /// CRC of the latest data file content
    pub data_crc: u32,
    pub last_rev_timestamp: u32,
    pub modification_timestamp: u32,
    pub creation_timestamp: u32,
}

impl FileHeaderRecord {
    pub fn parse(record_header: RecordHeader, reader: &mut RecordReader) -> RecordResult<Self> {
        let common = ItemHeader::parse(record_header, reader)?;
        let flags = FileHeaderFlags(reader.read_u16()?);
        let branch_file = PhysicalName::from_wire(reader.read_bytes(10)?);
        let branch_offset = reader.read_i32()?;
        let project_offset = reader.read_i32()?;
        let branch_count = reader.read_u16()?;
        let project_count = reader.read_u16()?;
        let first_checkout_offset = reader.read_i32()?;
        let last_checkout_offset = reader.read_i32()?;
        let data_crc = reader.read_u32()?;
        reader.skip(8)?; // filler words
        let last_rev_timestamp = reader.read_u32()?;
        let modification_timestamp = reader.read_u32()?;
        let creation_timestamp = reader.read_u32()?;
        Ok(Self {
            common,
            flags,
            branch_file,
            branch_offset,
            project_offset,
            branch_count,
            project_count,
            first_checkout_offset,
            last_checkout_offset,
            data_crc,
            last_rev_timestamp,
            modification_timestamp,
            creation_timestamp,
        })
    }

    pub fn dump(&self, w: &mut dyn Write) -> std::io::Result<()> {
        self.common.dump(w)?;
        writeln!(w, "  Flags: {:4X} ({})", self.flags.0, self.flags)?;
        if !self.branch_file.is_empty() {
            writeln!(w, "  Branched from file: {}", self.branch_file)?;
        }
        if self.branch_offset != 0 {
            writeln!(w, "  Branch offset: {:06X}", self.branch_offset)?;
        }
        writeln!(w, "  Branch count: {}", self.branch_count)?;
        writeln!(w, "  Project offset: {:06X}", self.project_offset)?;
        writeln!(w, "  Project count: {}", self.project_count)?;
        writeln!(
            w,
            "  First/last checkout offset: {:06X}/{:06X}",
            self.first_checkout_offset, self.last_checkout_offset
        )?;
        writeln!(w, "  Data CRC: {:8X}", self.data_crc)?;
        writeln!(
            w,
            "  Last revision time: {}",
            timestamp_to_datetime(self.last_rev_timestamp)
        )?;
        writeln!(
            w,
            "  Modification time: {}",
            timestamp_to_datetime(self.modification_timestamp)
        )?;
        writeln!(
            w,
            "  Creation time: {}",
            timestamp_to_datetime(self.creation_timestamp)
        )?;
        Ok(())
    }
}

/// Header record of a project item file.
#[derive(Debug, Clone)]
pub struct ProjectHeaderRecord {
    pub common: ItemHeader,
    pub parent_project: String,
    pub parent_file: PhysicalName,
    pub total_items: i16,
    pub subprojects: i16,
}

impl ProjectHeaderRecord {
    pub fn parse(record_header: RecordHeader, reader: &mut RecordReader) -> RecordResult<Self> {
        let common = ItemHeader::parse(record_header, reader)?;
        let parent_project = reader.read_string(260)?;
        let parent_file = PhysicalName::from_wire(reader.read_bytes(12)?);
        let total_items = reader.read_i16()?;
        let subprojects = reader.read_i16()?;
        Ok(Self {
            common,
            parent_project,
            parent_file,
            total_items,
            subprojects,
        })
    }

    pub fn dump(&self, w: &mut dyn Write) -> std::io::Result<()> {
        self.common.dump(w)?;
        writeln!(w, "  Parent project: {}", self.parent_project)?;
        writeln!(w, "  Parent file: {}", self.parent_file)?;
        writeln!(w, "  Total items: {}", self.total_items)?;
        writeln!(w, "  Subprojects: {}", self.subprojects)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::encoding::Encoding;

    #[test]
    fn test_preamble_round_trip() {
        let mut bytes = vec![0u8; 52];
        bytes[..ItemFilePreamble::SIGNATURE.len()].copy_from_slice(ItemFilePreamble::SIGNATURE);
        bytes[32..34].copy_from_slice(&2i16.to_le_bytes());
        bytes[34..36].copy_from_slice(&6i16.to_le_bytes());

        let mut reader = RecordReader::new(Arc::from(bytes), Encoding::Utf8);
        let preamble = ItemFilePreamble::read(&mut reader).unwrap();
        assert_eq!(preamble.file_type, ItemFileType::File);
        assert_eq!(reader.offset(), 52);
    }

    #[test]
    fn test_preamble_rejects_bad_signature_and_version() {
        let mut bytes = vec![0u8; 52];
        bytes[..7].copy_from_slice(b"NotVss\x00");
        let mut reader = RecordReader::new(Arc::from(bytes.clone()), Encoding::Utf8);
        assert!(matches!(
            ItemFilePreamble::read(&mut reader),
            Err(RecordError::BadHeader(_))
        ));

        bytes[..ItemFilePreamble::SIGNATURE.len()].copy_from_slice(ItemFilePreamble::SIGNATURE);
        bytes[32..34].copy_from_slice(&1i16.to_le_bytes());
        bytes[34..36].copy_from_slice(&5i16.to_le_bytes()); // wrong version
        let mut reader = RecordReader::new(Arc::from(bytes), Encoding::Utf8);
        assert!(matches!(
            ItemFilePreamble::read(&mut reader),
            Err(RecordError::BadHeader(_))
        ));
    }

    #[test]
    fn test_flags_display() {
        let flags = FileHeaderFlags(FileHeaderFlags::BINARY | FileHeaderFlags::SHARED);
        assert_eq!(flags.to_string(), "Binary|Shared");
        assert_eq!(FileHeaderFlags(0).to_string(), "0x0000");
    }
}
