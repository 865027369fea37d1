//! The overflow-names file (`names.dat`).
//!
//! Logical names longer than the 34-byte embedded short-name field live
//! here. Each name record is self-describing: a table of (kind, offset)
//! entries pointing into an inline string blob in the same record.

use std::io::Write;
use std::sync::Arc;

use crate::record::{
    ParseRecord, RecordFile, RecordHeader, RecordReader, RecordResult, Signature, VssName,
};

/// The kinds of variant names a name record can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Dos = 1,
    Long = 2,
    MacOs = 3,
    Project = 10,
}

/// Names file header record ('NH').
#[derive(Debug, Clone)]
pub struct NameHeaderRecord {
    pub header: RecordHeader,
    pub eof_offset: u32,
}

impl NameHeaderRecord {
    fn parse(header: RecordHeader, reader: &mut RecordReader) -> RecordResult<Self> {
        reader.skip(16)?; // filler words
        let eof_offset = reader.read_u32()?;
        Ok(Self { header, eof_offset })
    }

    pub fn dump(&self, w: &mut dyn Write) -> std::io::Result<()> {
        self.header.dump(w)?;
        writeln!(w, "EOF offset: {:06X}", self.eof_offset)
    }
}

/// Name record ('SN'): the variant names of one item.
#[derive(Debug, Clone)]
pub struct NameRecord {
    pub header: RecordHeader,
    /// (kind, raw name bytes) in table order; kinds outside `NameKind` are
    /// kept as-is so unknown variants survive a dump round
    pub names: Vec<(i16, Vec<u8>)>,
}

impl NameRecord {
    fn parse(header: RecordHeader, reader: &mut RecordReader) -> RecordResult<Self> {
        let entry_count = reader.read_i16()?.max(0) as usize;
        reader.skip(2)?;
        // the string blob starts right after the entry table
        let blob = reader.clone_at(entry_count * 4, None)?;
        let mut names = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            let kind = reader.read_i16()?;
            let offset = reader.read_i16()?.max(0) as usize;
            names.push((kind, blob.read_byte_string_at_rest(offset)?));
        }
        Ok(Self { header, names })
    }

    pub fn get(&self, kind: NameKind) -> Option<&[u8]> {
        let kind = kind as i16;
        self.names
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, name)| name.as_slice())
    }

    pub fn dump(&self, w: &mut dyn Write) -> std::io::Result<()> {
        self.header.dump(w)?;
        writeln!(w, "Num names: {}", self.names.len())?;
        for (kind, name) in &self.names {
            writeln!(w, "  {}: {}", kind, String::from_utf8_lossy(name))?;
        }
        Ok(())
    }
}

/// The two record kinds that appear in the names file.
#[derive(Debug, Clone)]
pub enum NameFileRecord {
    Header(NameHeaderRecord),
    Name(NameRecord),
}

impl ParseRecord for NameFileRecord {
    fn parse(header: RecordHeader, reader: &mut RecordReader) -> RecordResult<Option<Self>> {
        match header.signature {
            Signature::NAME_HEADER => Ok(Some(NameFileRecord::Header(NameHeaderRecord::parse(
                header, reader,
            )?))),
            Signature::NAME => Ok(Some(NameFileRecord::Name(NameRecord::parse(header, reader)?))),
            _ => Ok(None),
        }
    }

    fn header(&self) -> &RecordHeader {
        match self {
            NameFileRecord::Header(r) => &r.header,
            NameFileRecord::Name(r) => &r.header,
        }
    }

    fn class_name(&self) -> &'static str {
        match self {
            NameFileRecord::Header(_) => "name header",
            NameFileRecord::Name(_) => "name",
        }
    }
}

/// The opened names file with its record index.
#[derive(Debug)]
pub struct NameFile {
    file: RecordFile<NameFileRecord>,
    pub header: NameHeaderRecord,
}

impl NameFile {
    /// Interpret an already-loaded `names.dat` record file.
    pub fn new(mut file: RecordFile<NameFileRecord>) -> RecordResult<Self> {
        let header = match file.read_record(Some(0), false)? {
            Some(record) => match &*record {
                NameFileRecord::Header(h) => h.clone(),
                NameFileRecord::Name(r) => {
                    return Err(crate::record::RecordError::UnexpectedSignature {
                        offset: 0,
                        expected: Signature::NAME_HEADER,
                        actual: r.header.signature,
                    })
                }
            },
            None => {
                return Err(crate::record::RecordError::BadHeader(
                    "names file has no header record".into(),
                ))
            }
        };
        file.read_all_records(None, Some(header.eof_offset), false)?;
        Ok(Self { file, header })
    }

    pub fn get_name_record(&self, name_offset: u32) -> RecordResult<Arc<NameFileRecord>> {
        self.file.get_record(name_offset)
    }

    /// The authoritative long name for an embedded name: the referenced
    /// record's long (or, for projects, project) variant, falling back to the
    /// short name when the record lacks that kind or the offset is zero.
    pub fn get_long_name(&self, name: &VssName) -> Vec<u8> {
        if name.name_file_offset == 0 {
            return name.short_name.clone();
        }
        let record = match self.get_name_record(name.name_file_offset) {
            Ok(record) => record,
            Err(_) => return name.short_name.clone(),
        };
        let record = match &*record {
            NameFileRecord::Name(r) => r,
            NameFileRecord::Header(_) => return name.short_name.clone(),
        };
        let kind = if name.is_project() {
            NameKind::Project
        } else {
            NameKind::Long
        };
        record
            .get(kind)
            .or_else(|| record.get(NameKind::Long))
            .map(<[u8]>::to_vec)
            .unwrap_or_else(|| name.short_name.clone())
    }

    pub fn dump(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "Name file {}", self.file.filename)?;
        for record in self.file.records() {
            match &**record {
                NameFileRecord::Header(r) => r.dump(w)?,
                NameFileRecord::Name(r) => r.dump(w)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::encoding::Encoding;
    use crate::record::crc16_fold;

    fn record_bytes(signature: [u8; 2], payload: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&signature);
        bytes.extend_from_slice(&crc16_fold(payload).to_le_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    fn name_record_payload(entries: &[(i16, &[u8])]) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&(entries.len() as i16).to_le_bytes());
        payload.extend_from_slice(&0u16.to_le_bytes());
        let mut blob = Vec::new();
        for (kind, name) in entries {
            payload.extend_from_slice(&kind.to_le_bytes());
            payload.extend_from_slice(&(blob.len() as i16).to_le_bytes());
            blob.extend_from_slice(name);
            blob.push(0);
        }
        payload.extend_from_slice(&blob);
        payload
    }

    fn build_names_file(records: &[Vec<u8>]) -> (NameFile, Vec<u32>) {
        let mut header_payload = vec![0u8; 16];
        let mut offsets = Vec::new();

        // header record first; eof patched after layout is known
        let mut body = Vec::new();
        for payload in records {
            body.push(record_bytes(*b"SN", payload));
        }
        let header_len = 8 + 20;
        let mut offset = header_len as u32;
        for record in &body {
            offsets.push(offset);
            offset += record.len() as u32;
        }
        header_payload.extend_from_slice(&offset.to_le_bytes());

        let mut data = record_bytes(*b"HN", &header_payload);
        for record in body {
            data.extend_from_slice(&record);
        }

        let file = RecordFile::from_bytes(
            "names.dat",
            PathBuf::new(),
            data,
            Encoding::Utf8,
            false,
        );
        (NameFile::new(file).unwrap(), offsets)
    }

    #[test]
    fn test_name_record_lookup() {
        let (names, offsets) = build_names_file(&[name_record_payload(&[
            (1, b"LONGNA~1.TXT"),
            (2, b"a rather long file name.txt"),
        ])]);

        let record = names.get_name_record(offsets[0]).unwrap();
        let record = match &*record {
            NameFileRecord::Name(r) => r.clone(),
            _ => panic!("expected a name record"),
        };
        assert_eq!(record.get(NameKind::Dos), Some(&b"LONGNA~1.TXT"[..]));
        assert_eq!(
            record.get(NameKind::Long),
            Some(&b"a rather long file name.txt"[..])
        );
        assert_eq!(record.get(NameKind::Project), None);
    }

    #[test]
    fn test_long_name_resolution() {
        let (names, offsets) =
            build_names_file(&[name_record_payload(&[(2, b"a rather long file name.txt")])]);

        let name = VssName {
            flags: 0,
            short_name: b"ARATHE~1.TXT".to_vec(),
            name_file_offset: offsets[0],
        };
        assert_eq!(names.get_long_name(&name), b"a rather long file name.txt");
    }

    #[test]
    fn test_inline_short_name_is_authoritative() {
        let (names, _) = build_names_file(&[]);
        let name = VssName {
            flags: 0,
            short_name: b"short.txt".to_vec(),
            name_file_offset: 0,
        };
        // zero offset: the short name comes back unchanged
        assert_eq!(names.get_long_name(&name), b"short.txt");
    }

    #[test]
    fn test_missing_kind_falls_back_to_short() {
        let (names, offsets) = build_names_file(&[name_record_payload(&[(1, b"DOSNAME.TXT")])]);
        let name = VssName {
            flags: 0,
            short_name: b"fallback.txt".to_vec(),
            name_file_offset: offsets[0],
        };
        assert_eq!(names.get_long_name(&name), b"fallback.txt");
    }
}
