//! Record header parsing and framing.
//!
//! Every on-disk record starts with the same 8 bytes:
//! `u32 payload length | 2-byte signature | u16 CRC fold of the payload`.
//! Reading a header yields the header plus an independent payload reader
//! sliced to exactly `length` bytes, and leaves the file cursor at the next
//! record.

use crate::record::error::{RecordError, RecordResult};
use crate::record::reader::RecordReader;
use crate::record::types::Signature;

/// Parsed 8-byte record header.
#[derive(Debug, Clone)]
pub struct RecordHeader {
    /// absolute offset of the header within its file
    pub offset: u32,
    /// payload length (excluding these 8 bytes)
    pub length: u32,
    pub signature: Signature,
    /// CRC fold stored in the file
    pub file_crc: u16,
    /// CRC fold computed over the payload
    pub actual_crc: u16,
}

impl RecordHeader {
    pub const LENGTH: usize = 8;

    /// Read a header at the cursor of `reader`, returning the header and a
    /// reader over the payload. The passed reader is advanced past the whole
    /// record; a payload running past the end of the file fails with
    /// `Truncated`.
    pub fn read(reader: &mut RecordReader) -> RecordResult<(RecordHeader, RecordReader)> {
        let offset = reader.offset() as u32;
        let length = reader.read_u32_unaligned()?;
        let sig = reader.read_bytes(2)?;
        let signature = Signature([sig[0], sig[1]]);
        let file_crc = reader.read_u16_unaligned()?;

        let payload = reader
            .clone_at(0, Some(length as usize))
            .map_err(|_| RecordError::Truncated {
                offset,
                reason: format!(
                    "{} record of {:#x} payload bytes with only {:#x} remaining",
                    signature,
                    length,
                    reader.remaining()
                ),
            })?;
        let actual_crc = payload.crc16_remaining();

        reader.skip(length as usize)?;

        Ok((
            RecordHeader {
                offset,
                length,
                signature,
                file_crc,
                actual_crc,
            },
            payload,
        ))
    }

    pub fn is_crc_valid(&self) -> bool {
        self.file_crc == self.actual_crc
    }

    /// Validate the payload CRC. Comment records are never verified, and a
    /// stored CRC of zero means "not recorded" on any record.
    pub fn check_crc(&self) -> RecordResult<()> {
        if self.signature == Signature::COMMENT || self.file_crc == 0 {
            return Ok(());
        }
        if !self.is_crc_valid() {
            return Err(RecordError::CrcMismatch {
                signature: self.signature,
                offset: self.offset,
                expected: self.file_crc,
                actual: self.actual_crc,
            });
        }
        Ok(())
    }

    pub fn check_signature(&self, expected: Signature) -> RecordResult<()> {
        if self.signature != expected {
            return Err(RecordError::UnexpectedSignature {
                offset: self.offset,
                expected,
                actual: self.signature,
            });
        }
        Ok(())
    }

    /// Dump the header line the way the forensic dumper prints records.
    pub fn dump(&self, w: &mut dyn std::io::Write) -> std::io::Result<()> {
        writeln!(
            w,
            "RECORD: {} - Length: 0x{:X} ({}) - Offset: {:06X} - CRC: {:04X} ({}: {:04X})",
            self.signature,
            self.length as usize + Self::LENGTH,
            self.length as usize + Self::LENGTH,
            self.offset,
            self.file_crc,
            if self.is_crc_valid() { "valid" } else { "INVALID" },
            self.actual_crc,
        )
    }
}
