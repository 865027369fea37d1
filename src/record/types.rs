//! core type-safe wrappers for the on-disk record primitives.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};

/// A two-byte record signature.
///
/// Signatures are two-character codes stored on disk in reversed byte order
/// relative to their C-literal reading: the literal `'CM'` (comment) appears
/// on disk as bytes `M,C`. The wrapper holds the on-disk byte order; `Display`
/// prints the literal reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; 2]);

impl Signature {
    /// comment record ('CM')
    pub const COMMENT: Signature = Signature(*b"MC");
    /// checkout record ('CF')
    pub const CHECKOUT: Signature = Signature(*b"FC");
    /// containing-project backlink record ('PR')
    pub const PROJECT: Signature = Signature(*b"RP");
    /// branch backlink record ('BF')
    pub const BRANCH: Signature = Signature(*b"FB");
    /// delta record ('DF')
    pub const DELTA: Signature = Signature(*b"FD");
    /// revision log entry ('LE')
    pub const REVISION: Signature = Signature(*b"EL");
    /// item file header record ('HD')
    pub const ITEM_HEADER: Signature = Signature(*b"DH");
    /// names file header record ('NH')
    pub const NAME_HEADER: Signature = Signature(*b"HN");
    /// name record ('NS')
    pub const NAME: Signature = Signature(*b"SN");
    /// project entry record ('PJ')
    pub const PROJECT_ENTRY: Signature = Signature(*b"JP");

    pub fn as_bytes(&self) -> &[u8; 2] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Print as the two-character literal: characters reversed
        write!(f, "'{}{}'", self.0[1] as char, self.0[0] as char)
    }
}

/// The 8-uppercase-character identifier VSS assigns to every project and file.
///
/// It is the primary on-disk key: the item file is stored under
/// `<data>/<bucket>/<physical>` where the bucket is the lowercased first
/// character. On the wire it occupies a fixed zero-terminated field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhysicalName(String);

impl PhysicalName {
    /// build from a fixed-size wire field (zero-terminated, ASCII)
    pub fn from_wire(bytes: &[u8]) -> Self {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Self(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// the single-letter bucket subdirectory this item lives under
    pub fn bucket(&self) -> Option<char> {
        self.0.chars().next().map(|c| c.to_ascii_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhysicalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for PhysicalName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A compact embedded name (40 bytes on the wire).
///
/// The short name is authoritative when `name_file_offset` is zero; otherwise
/// the long name lives in the names file at that offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VssName {
    pub flags: u16,
    /// raw short-name bytes in the database codepage, already zero-trimmed
    pub short_name: Vec<u8>,
    pub name_file_offset: u32,
}

impl VssName {
    /// flag bit marking a project (directory) name
    pub const FLAG_PROJECT: u16 = 0x1;

    /// size of the embedded name field on the wire
    pub const WIRE_SIZE: usize = 40;
    /// size of the short-name portion
    pub const SHORT_NAME_SIZE: usize = 34;

    pub fn is_project(&self) -> bool {
        self.flags & Self::FLAG_PROJECT != 0
    }
}

/// VSS timestamps are 32-bit Unix times.
pub fn timestamp_to_datetime(timestamp: u32) -> DateTime<Utc> {
    Utc.timestamp_opt(i64::from(timestamp), 0)
        .single()
        .unwrap_or_default()
}

/// Truncate a byte string at its first zero byte.
pub fn zero_terminated(src: &[u8]) -> &[u8] {
    match src.iter().position(|&b| b == 0) {
        Some(pos) => &src[..pos],
        None => src,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_display_reverses_bytes() {
        assert_eq!(Signature::COMMENT.to_string(), "'CM'");
        assert_eq!(Signature::REVISION.to_string(), "'LE'");
        assert_eq!(Signature::ITEM_HEADER.to_string(), "'HD'");
    }

    #[test]
    fn test_physical_name_from_wire() {
        let name = PhysicalName::from_wire(b"KAAAAAAA\x00\x00");
        assert_eq!(name.as_str(), "KAAAAAAA");
        assert_eq!(name.bucket(), Some('k'));
    }

    #[test]
    fn test_physical_name_empty() {
        let name = PhysicalName::from_wire(&[0u8; 10]);
        assert!(name.is_empty());
        assert_eq!(name.bucket(), None);
    }

    #[test]
    fn test_zero_terminated() {
        assert_eq!(zero_terminated(b"abc\x00def"), b"abc");
        assert_eq!(zero_terminated(b"abc"), b"abc");
        assert_eq!(zero_terminated(b"\x00abc"), b"");
    }

    #[test]
    fn test_timestamp_conversion() {
        let dt = timestamp_to_datetime(0);
        assert_eq!(dt.timestamp(), 0);
        let dt = timestamp_to_datetime(1_000_000_000);
        assert_eq!(dt.timestamp(), 1_000_000_000);
    }
}
