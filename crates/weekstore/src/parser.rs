//! Settings file parser using nom
//!
//! File format:
//! ```text
//! WEEKKV1\n
//! [version: u32]
//! [entry_count: u32]
//! ...key=value lines (\n-terminated)...
//! ```
//!
//! Keys are `[A-Za-z0-9_.-]+`. Values run to the end of the line and may be
//! empty; they never contain `\n`.

use nom::{
    bytes::complete::{tag, take_until, take_while1},
    character::complete::char,
    combinator::map,
    multi::many0,
    number::complete::le_u32,
    sequence::{separated_pair, terminated, tuple},
    IResult,
};

use crate::error::{Error, Result};

/// Magic header for settings files
pub const SETTINGS_MAGIC: &[u8] = b"WEEKKV1\n";

/// Current settings file format version
pub const FORMAT_VERSION: u32 = 1;

/// Settings file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsHeader {
    /// File format version
    pub version: u32,
    /// Number of entries that follow
    pub entry_count: u32,
}

impl SettingsHeader {
    /// Header for a file written by this version
    pub fn new(entry_count: u32) -> Self {
        Self {
            version: FORMAT_VERSION,
            entry_count,
        }
    }

    /// Append the encoded header to `out`
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(SETTINGS_MAGIC);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.entry_count.to_le_bytes());
    }
}

/// Parse the magic, version and entry count
pub fn parse_header(input: &[u8]) -> IResult<&[u8], SettingsHeader> {
    map(
        tuple((tag(SETTINGS_MAGIC), le_u32, le_u32)),
        |(_, version, entry_count)| SettingsHeader {
            version,
            entry_count,
        },
    )(input)
}

/// Parse a whole settings file into its entries
///
/// Rejects a missing header, a newer format version and an entry count that
/// disagrees with the header.
pub fn parse_settings(input: &[u8]) -> Result<Vec<(String, String)>> {
    let (body, header) = parse_header(input)
        .map_err(|_| Error::Parse("Missing or invalid settings header".to_string()))?;

    if header.version > FORMAT_VERSION {
        return Err(Error::Parse(format!(
            "Unsupported settings version {} (max {})",
            header.version, FORMAT_VERSION
        )));
    }

    let entries = parse_entries(body)?;
    if entries.len() != header.entry_count as usize {
        return Err(Error::Parse(format!(
            "Header declares {} entries, found {}",
            header.entry_count,
            entries.len()
        )));
    }

    Ok(entries)
}

fn is_key_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-')
}

/// Check whether `key` can be stored
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(is_key_byte)
}

/// Parse a single `key=value\n` entry
pub fn parse_entry(input: &[u8]) -> IResult<&[u8], (&[u8], &[u8])> {
    terminated(
        separated_pair(take_while1(is_key_byte), char('='), take_until("\n")),
        char('\n'),
    )(input)
}

/// Parse the body of a settings file (everything after the header)
pub fn parse_entries(input: &[u8]) -> Result<Vec<(String, String)>> {
    let (rest, raw) = many0(parse_entry)(input)?;
    if !rest.is_empty() {
        return Err(Error::Parse(format!(
            "Malformed entry at byte {}",
            input.len() - rest.len()
        )));
    }

    raw.into_iter()
        .map(|(key, value)| {
            let key = String::from_utf8(key.to_vec())
                .map_err(|e| Error::Parse(format!("Key is not UTF-8: {}", e)))?;
            let value = String::from_utf8(value.to_vec())
                .map_err(|e| Error::Parse(format!("Value for {} is not UTF-8: {}", key, e)))?;
            Ok((key, value))
        })
        .collect()
}

/// Append an encoded entry to `out`
pub fn encode_entry(key: &str, value: &str, out: &mut Vec<u8>) {
    out.extend_from_slice(key.as_bytes());
    out.push(b'=');
    out.extend_from_slice(value.as_bytes());
    out.push(b'\n');
}
