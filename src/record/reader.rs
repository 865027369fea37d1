//! Bounds-checked cursor over an immutable byte buffer.
//!
//! All multi-byte reads are little-endian. The advancing typed reads police
//! natural alignment relative to the start of the reader's slice; the
//! `_unaligned` forms read packed fields (the delta operation array is the
//! one on-disk structure that needs them). The `_at` forms peek without
//! moving the cursor. A failed bounds or alignment check never moves the
//! cursor.
//!
//! Cloning is the canonical way to spawn an independent cursor over a
//! subrange; record framing hands each payload decoder its own slice reader.

use std::sync::Arc;

use crc32fast::Hasher;

use crate::encoding::Encoding;
use crate::record::error::{RecordError, RecordResult};
use crate::record::types::{zero_terminated, VssName};

/// CRC-32 as VSS computes it: the reflected register seeded with zero and no
/// final inversion. Seeding crc32fast with `u32::MAX` zeroes the internal
/// register, and negating the finalized value undoes its output inversion.
pub fn crc32_vss(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new_with_initial(u32::MAX);
    hasher.update(data);
    !hasher.finalize()
}

/// The 16-bit fold stored in record headers: XOR of the CRC-32 halves.
pub fn crc16_fold(data: &[u8]) -> u16 {
    let crc = crc32_vss(data);
    (crc ^ (crc >> 16)) as u16
}

/// A cursor over a slice of a shared immutable buffer.
#[derive(Debug, Clone)]
pub struct RecordReader {
    data: Arc<[u8]>,
    slice_begin: usize,
    slice_len: usize,
    /// current read position, relative to `slice_begin`
    offset: usize,
    encoding: Encoding,
}

impl RecordReader {
    /// Reader over a whole buffer.
    pub fn new(data: Arc<[u8]>, encoding: Encoding) -> Self {
        let slice_len = data.len();
        Self {
            data,
            slice_begin: 0,
            slice_len,
            offset: 0,
            encoding,
        }
    }

    /// Independent cursor over a subrange starting `additional_offset` past
    /// the current position. `length` of `None` means "to the end of this
    /// reader's slice". The subrange must lie within this reader's slice.
    pub fn clone_at(&self, additional_offset: usize, length: Option<usize>) -> RecordResult<Self> {
        let offset = self
            .offset
            .checked_add(additional_offset)
            .ok_or(RecordError::EndOfBuffer {
                requested: additional_offset,
                remaining: self.slice_len - self.offset,
            })?;
        if offset > self.slice_len {
            return Err(RecordError::EndOfBuffer {
                requested: additional_offset,
                remaining: self.slice_len - self.offset,
            });
        }
        let length = match length {
            None => self.slice_len - offset,
            Some(length) => {
                if length > self.slice_len - offset {
                    return Err(RecordError::EndOfBuffer {
                        requested: length,
                        remaining: self.slice_len - offset,
                    });
                }
                length
            }
        };
        Ok(Self {
            data: Arc::clone(&self.data),
            slice_begin: self.slice_begin + offset,
            slice_len: length,
            offset: 0,
            encoding: self.encoding,
        })
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Current position relative to the slice begin.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.slice_len
    }

    pub fn is_empty(&self) -> bool {
        self.slice_len == 0
    }

    pub fn remaining(&self) -> usize {
        self.slice_len - self.offset
    }

    /// Reposition the cursor to an absolute offset within the slice.
    pub fn seek(&mut self, offset: usize) -> RecordResult<()> {
        if offset > self.slice_len {
            return Err(RecordError::EndOfBuffer {
                requested: offset,
                remaining: self.slice_len,
            });
        }
        self.offset = offset;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> RecordResult<()> {
        self.check_read(count)?;
        self.offset += count;
        Ok(())
    }

    fn check_read(&self, length: usize) -> RecordResult<()> {
        self.check_read_at(self.offset, length)
    }

    fn check_read_at(&self, offset: usize, length: usize) -> RecordResult<()> {
        if offset > self.slice_len || length > self.slice_len - offset {
            return Err(RecordError::EndOfBuffer {
                requested: length,
                remaining: self.slice_len.saturating_sub(offset),
            });
        }
        Ok(())
    }

    fn check_aligned(&self, offset: usize, size: usize) -> RecordResult<()> {
        if offset % size != 0 {
            return Err(RecordError::UnalignedRead { offset, size });
        }
        Ok(())
    }

    pub fn read_bytes(&mut self, length: usize) -> RecordResult<&[u8]> {
        self.check_read(length)?;
        let begin = self.slice_begin + self.offset;
        self.offset += length;
        Ok(&self.data[begin..begin + length])
    }

    /// Read without advancing the cursor.
    pub fn read_bytes_at(&self, offset: usize, length: usize) -> RecordResult<&[u8]> {
        self.check_read_at(offset, length)?;
        let begin = self.slice_begin + offset;
        Ok(&self.data[begin..begin + length])
    }

    pub fn read_u16(&mut self) -> RecordResult<u16> {
        self.check_aligned(self.offset, 2)?;
        self.read_u16_unaligned()
    }

    pub fn read_i16(&mut self) -> RecordResult<i16> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> RecordResult<u32> {
        self.check_aligned(self.offset, 4)?;
        self.read_u32_unaligned()
    }

    pub fn read_i32(&mut self) -> RecordResult<i32> {
        Ok(self.read_u32()? as i32)
    }

    /// Packed (alignment-exempt) reads, for structures laid out without
    /// padding such as delta operations.
    pub fn read_u16_unaligned(&mut self) -> RecordResult<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32_unaligned(&mut self) -> RecordResult<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u16_at(&self, offset: usize) -> RecordResult<u16> {
        self.check_aligned(offset, 2)?;
        let bytes = self.read_bytes_at(offset, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_i16_at(&self, offset: usize) -> RecordResult<i16> {
        Ok(self.read_u16_at(offset)? as i16)
    }

    pub fn read_u32_at(&self, offset: usize) -> RecordResult<u32> {
        self.check_aligned(offset, 4)?;
        let bytes = self.read_bytes_at(offset, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a fixed-size zero-terminated field: the returned bytes stop at
    /// the first zero, the cursor advances by the full field size.
    pub fn read_byte_string(&mut self, length: usize) -> RecordResult<Vec<u8>> {
        let bytes = self.read_bytes(length)?;
        Ok(zero_terminated(bytes).to_vec())
    }

    /// Zero-terminated read of everything remaining in the slice.
    pub fn read_byte_string_rest(&mut self) -> RecordResult<Vec<u8>> {
        let remaining = self.remaining();
        self.read_byte_string(remaining)
    }

    pub fn read_byte_string_at(&self, offset: usize, length: usize) -> RecordResult<Vec<u8>> {
        let bytes = self.read_bytes_at(offset, length)?;
        Ok(zero_terminated(bytes).to_vec())
    }

    /// Zero-terminated read at an offset, out to the end of the slice.
    pub fn read_byte_string_at_rest(&self, offset: usize) -> RecordResult<Vec<u8>> {
        self.check_read_at(offset, 0)?;
        self.read_byte_string_at(offset, self.slice_len - offset)
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        self.encoding.decode(bytes)
    }

    /// Fixed-size zero-terminated field decoded via the database encoding.
    pub fn read_string(&mut self, length: usize) -> RecordResult<String> {
        let bytes = self.read_byte_string(length)?;
        Ok(self.encoding.decode(&bytes))
    }

    /// An embedded 40-byte vss_name field.
    pub fn read_name(&mut self) -> RecordResult<VssName> {
        let flags = self.read_u16()?;
        let short_name = self.read_byte_string(VssName::SHORT_NAME_SIZE)?;
        let name_file_offset = self.read_u32()?;
        Ok(VssName {
            flags,
            short_name,
            name_file_offset,
        })
    }

    /// 16-bit CRC fold of `length` bytes starting at the cursor, without
    /// advancing.
    pub fn crc16(&self, length: usize) -> RecordResult<u16> {
        let bytes = self.read_bytes_at(self.offset, length)?;
        Ok(crc16_fold(bytes))
    }

    /// 16-bit CRC fold of everything remaining.
    pub fn crc16_remaining(&self) -> u16 {
        let begin = self.slice_begin + self.offset;
        crc16_fold(&self.data[begin..self.slice_begin + self.slice_len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(bytes: &[u8]) -> RecordReader {
        RecordReader::new(Arc::from(bytes.to_vec()), Encoding::Utf8)
    }

    /// Bit-by-bit reference implementation of the VSS CRC register.
    fn crc32_reference(data: &[u8]) -> u32 {
        let mut crc: u32 = 0;
        for &byte in data {
            crc ^= u32::from(byte);
            for _ in 0..8 {
                if crc & 1 != 0 {
                    crc = 0xEDB8_8320 ^ (crc >> 1);
                } else {
                    crc >>= 1;
                }
            }
        }
        crc
    }

    #[test]
    fn test_crc_matches_bitwise_reference() {
        for data in [&b""[..], b"a", b"hello world", b"\x00\x01\x02\xff"] {
            assert_eq!(crc32_vss(data), crc32_reference(data), "data={data:?}");
        }
    }

    #[test]
    fn test_crc_empty_is_zero() {
        // zero seed + zero input leaves the register untouched
        assert_eq!(crc32_vss(b""), 0);
        assert_eq!(crc16_fold(b""), 0);
    }

    #[test]
    fn test_crc16_fold() {
        let crc = crc32_vss(b"payload");
        assert_eq!(
            u32::from(crc16_fold(b"payload")),
            (crc ^ (crc >> 16)) & 0xFFFF
        );
    }

    #[test]
    fn test_read_little_endian() {
        let mut r = reader(&[0x01, 0x02, 0x03, 0x04, 0xFF, 0xFF]);
        assert_eq!(r.read_u32().unwrap(), 0x0403_0201);
        assert_eq!(r.read_i16().unwrap(), -1);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_unaligned_read_rejected_and_cursor_unchanged() {
        let mut r = reader(&[0, 1, 2, 3, 4, 5]);
        r.skip(1).unwrap();
        let err = r.read_u16().unwrap_err();
        assert!(matches!(err, RecordError::UnalignedRead { offset: 1, size: 2 }));
        assert_eq!(r.offset(), 1);

        r.skip(1).unwrap();
        let err = r.read_u32().unwrap_err();
        assert!(matches!(err, RecordError::UnalignedRead { offset: 2, size: 4 }));
        assert_eq!(r.offset(), 2);

        // the packed form accepts the same position
        assert_eq!(r.read_u32_unaligned().unwrap(), 0x0504_0302);
    }

    #[test]
    fn test_out_of_bounds_leaves_cursor_unchanged() {
        let mut r = reader(&[1, 2]);
        assert!(r.read_u32().is_err());
        assert_eq!(r.offset(), 0);
        assert_eq!(r.read_u16().unwrap(), 0x0201);
    }

    #[test]
    fn test_byte_string_consumes_full_field() {
        // zero byte at position n-1: string of n-1 bytes, cursor advances by n
        let mut r = reader(b"abc\x00xyz");
        assert_eq!(r.read_byte_string(4).unwrap(), b"abc");
        assert_eq!(r.offset(), 4);
        assert_eq!(r.read_byte_string(3).unwrap(), b"xyz");
    }

    #[test]
    fn test_byte_string_zero_in_middle_still_advances() {
        let mut r = reader(b"a\x00cdef");
        assert_eq!(r.read_byte_string(5).unwrap(), b"a");
        assert_eq!(r.offset(), 5);
    }

    #[test]
    fn test_clone_at_subrange() {
        let r = reader(&[0, 1, 2, 3, 4, 5, 6, 7]);
        let mut sub = r.clone_at(2, Some(4)).unwrap();
        assert_eq!(sub.len(), 4);
        assert_eq!(sub.read_bytes(4).unwrap(), &[2, 3, 4, 5]);
        // parent cursor is untouched
        assert_eq!(r.offset(), 0);
    }

    #[test]
    fn test_clone_at_out_of_bounds() {
        let r = reader(&[0, 1, 2, 3]);
        assert!(r.clone_at(5, None).is_err());
        assert!(r.clone_at(2, Some(3)).is_err());
        assert!(r.clone_at(2, Some(2)).is_ok());
    }

    #[test]
    fn test_read_at_does_not_advance() {
        let r = reader(&[0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(r.read_u16_at(2).unwrap(), 0xDDCC);
        assert_eq!(r.offset(), 0);
    }

    #[test]
    fn test_read_name() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u16.to_le_bytes());
        let mut short = [0u8; 34];
        short[..5].copy_from_slice(b"hello");
        bytes.extend_from_slice(&short);
        bytes.extend_from_slice(&0x1234u32.to_le_bytes());

        let mut r = reader(&bytes);
        let name = r.read_name().unwrap();
        assert!(name.is_project());
        assert_eq!(name.short_name, b"hello");
        assert_eq!(name.name_file_offset, 0x1234);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_crc16_from_cursor() {
        let mut r = reader(b"xxpayload");
        r.skip(2).unwrap();
        assert_eq!(r.crc16(7).unwrap(), crc16_fold(b"payload"));
        assert_eq!(r.crc16_remaining(), crc16_fold(b"payload"));
        assert!(r.crc16(8).is_err());
    }
}
