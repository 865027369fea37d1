//! Record layer error types
//!
//! All errors that can occur while decoding on-disk records are defined here.
//! We use `thiserror` for ergonomic error definition and better error messages

use thiserror::Error;

use crate::record::types::Signature;

/// the main error type for record decoding
#[derive(Debug, Error)]
pub enum RecordError {
    /// a read would run past the end of the reader's slice
    #[error("end of buffer: attempted read of {requested:#x} bytes with only {remaining:#x} remaining")]
    EndOfBuffer { requested: usize, remaining: usize },

    /// a strict-aligned typed read landed off-alignment
    #[error("unaligned read of {size}-byte integer at offset {offset:#x}")]
    UnalignedRead { offset: usize, size: usize },

    /// the payload CRC fold doesn't match the header CRC
    #[error("CRC error in {signature} record at {offset:#06X}: expected={expected:04X}, actual={actual:04X}")]
    CrcMismatch {
        signature: Signature,
        offset: u32,
        expected: u16,
        actual: u16,
    },

    /// the header length field extends past the end of the file
    #[error("truncated record at {offset:#06X}: {reason}")]
    Truncated { offset: u32, reason: String },

    /// a record signature no decoder knows about
    #[error("unrecognized record signature {signature} in file {filename}")]
    UnrecognizedRecord {
        signature: Signature,
        filename: String,
    },

    /// a revision record with an action code no decoder knows about
    #[error("unrecognized revision action {action} at {offset:#06X}")]
    UnknownRevisionAction { action: u16, offset: u32 },

    /// a record's signature isn't the one its decoder expects
    #[error("unexpected record signature at {offset:#06X}: expected={expected}, actual={actual}")]
    UnexpectedSignature {
        offset: u32,
        expected: Signature,
        actual: Signature,
    },

    /// an offset resolved to a record of the wrong type
    #[error("mismatched record class at offset {offset:#06X} in file {filename}: expected {expected}, actual {actual}")]
    WrongRecordClass {
        offset: u32,
        filename: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// no record is cached at the given offset
    #[error("no record at offset {offset:#06X} in file {filename}")]
    RecordNotFound { offset: u32, filename: String },

    /// the fixed file preamble or header record is malformed
    #[error("bad file header: {0}")]
    BadHeader(String),
}

impl RecordError {
    /// check if this error indicates data past the end of the buffer
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(
            self,
            RecordError::EndOfBuffer { .. } | RecordError::Truncated { .. }
        )
    }

    /// check if this error indicates corrupt (rather than merely unknown) data
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            RecordError::CrcMismatch { .. }
                | RecordError::Truncated { .. }
                | RecordError::BadHeader(_)
        )
    }
}

/// result type alias for record decoding
pub type RecordResult<T> = Result<T, RecordError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let eob = RecordError::EndOfBuffer {
            requested: 4,
            remaining: 2,
        };
        assert!(eob.is_out_of_bounds());
        assert!(!eob.is_corruption());

        let crc = RecordError::CrcMismatch {
            signature: Signature(*b"MC"),
            offset: 0x40,
            expected: 0x1234,
            actual: 0x4321,
        };
        assert!(crc.is_corruption());
        assert!(!crc.is_out_of_bounds());
    }
}
