//! Database text encoding.
//!
//! VSS stores all strings in the Windows ANSI code page of the machine that
//! owned the database. The default encoding name `mbcs` means "whatever the
//! host's ANSI page is"; off Windows that is unknowable, so it resolves to
//! Windows-1252. An explicit page can be given for determinism, and `utf-8`
//! is accepted for test fixtures.
//!
//! The indexing name used to sort directory entries is the logical name
//! lowercased *in the code page* and compared byte-wise. Running a
//! Unicode-aware lowercase over decoded text and re-encoding can change the
//! sort order for non-ASCII names, so the lowercase transform works directly
//! on code page bytes.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
#[error("unsupported encoding: {0}")]
pub struct UnsupportedEncoding(String);

/// A single-byte Windows ANSI code page (or UTF-8 for fixtures).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Windows1252,
    Utf8,
}

impl Default for Encoding {
    fn default() -> Self {
        Encoding::Windows1252
    }
}

/// Windows-1252 mappings for 0x80..0xA0. 0xA0..=0xFF maps 1:1 to Unicode.
/// Unassigned positions fall back to the replacement character.
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{FFFD}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{FFFD}', '\u{017D}', '\u{FFFD}',
    '\u{FFFD}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{FFFD}', '\u{017E}', '\u{0178}',
];

impl Encoding {
    /// Resolve an encoding name from the command line or configuration.
    pub fn resolve(name: &str) -> Result<Encoding, UnsupportedEncoding> {
        match name.to_ascii_lowercase().as_str() {
            "mbcs" | "ansi" | "windows-1252" | "cp1252" | "1252" => Ok(Encoding::Windows1252),
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            other => Err(UnsupportedEncoding(other.to_string())),
        }
    }

    /// Decode code page bytes to text. Never fails: undecodable input maps to
    /// the replacement character.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Encoding::Windows1252 => bytes
                .iter()
                .map(|&b| match b {
                    0x00..=0x7F => b as char,
                    0x80..=0x9F => CP1252_HIGH[(b - 0x80) as usize],
                    0xA0..=0xFF => char::from_u32(u32::from(b)).unwrap_or('\u{FFFD}'),
                })
                .collect(),
            Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    /// Lowercase one code page byte.
    fn lowercase_byte(b: u8) -> u8 {
        match b {
            b'A'..=b'Z' => b + 0x20,
            // Latin-1 uppercase block, minus the multiplication sign
            0xC0..=0xDE if b != 0xD7 => b + 0x20,
            // CP1252 specials with lowercase counterparts in the same page
            0x8A => 0x9A, // S-caron
            0x8C => 0x9C, // OE ligature
            0x8E => 0x9E, // Z-caron
            0x9F => 0xFF, // Y-diaeresis folds into the Latin-1 block
            other => other,
        }
    }

    /// The byte-wise sort key for a logical name: the name lowercased in the
    /// code page. This is the only comparison key the directory-state
    /// reconstruction may use.
    pub fn index_name(&self, logical_name: &[u8]) -> Vec<u8> {
        match self {
            Encoding::Windows1252 => logical_name
                .iter()
                .map(|&b| Self::lowercase_byte(b))
                .collect(),
            Encoding::Utf8 => {
                // Fixture encoding: simple ASCII lowercase keeps comparisons
                // byte-wise without re-encoding surprises.
                logical_name.to_ascii_lowercase()
            }
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Windows1252 => write!(f, "windows-1252"),
            Encoding::Utf8 => write!(f, "utf-8"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_aliases() {
        assert_eq!(Encoding::resolve("mbcs").unwrap(), Encoding::Windows1252);
        assert_eq!(Encoding::resolve("1252").unwrap(), Encoding::Windows1252);
        assert_eq!(Encoding::resolve("UTF-8").unwrap(), Encoding::Utf8);
        assert!(Encoding::resolve("shift-jis").is_err());
    }

    #[test]
    fn test_decode_ascii_roundtrip() {
        let enc = Encoding::Windows1252;
        assert_eq!(enc.decode(b"hello.c"), "hello.c");
    }

    #[test]
    fn test_decode_cp1252_specials() {
        let enc = Encoding::Windows1252;
        assert_eq!(enc.decode(&[0x80]), "\u{20AC}"); // euro sign
        assert_eq!(enc.decode(&[0xE9]), "\u{E9}"); // e-acute
    }

    #[test]
    fn test_index_name_ascii() {
        let enc = Encoding::Windows1252;
        assert_eq!(enc.index_name(b"ReadMe.TXT"), b"readme.txt".to_vec());
    }

    #[test]
    fn test_index_name_latin1() {
        let enc = Encoding::Windows1252;
        // E-acute (0xC9) lowercases to e-acute (0xE9) within the page
        assert_eq!(enc.index_name(&[0xC9, b'T', 0xD7]), vec![0xE9, b't', 0xD7]);
    }

    #[test]
    fn test_index_name_cp1252_specials() {
        let enc = Encoding::Windows1252;
        // each special uppercase letter folds to its in-page lowercase,
        // including Y-diaeresis whose pair straddles the 0x80 block
        assert_eq!(
            enc.index_name(&[0x8A, 0x8C, 0x8E, 0x9F]),
            vec![0x9A, 0x9C, 0x9E, 0xFF]
        );
        // names differing only by case compare equal under the fold
        assert_eq!(enc.index_name(&[0x9F, b'.', b'C']), enc.index_name(&[0xFF, b'.', b'c']));
    }
}
