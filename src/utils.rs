//! Utility functions for binary framing, UTF-16 text and escaping.

use crate::error::{RegistryError, Result};
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use encoding_rs::UTF_16LE;
use std::io::Cursor;

/// Replaces every occurrence of `pattern` in `text` with `replacement`.
///
/// Scanning resumes after each inserted replacement, so a replacement that
/// contains the pattern is never substituted again.
pub fn global_substitute(text: &str, pattern: &str, replacement: &str) -> String {
    if pattern.is_empty() {
        return text.to_string();
    }
    text.replace(pattern, replacement)
}

/// Escapes a name or string for a quoted .reg token.
///
/// Backslash and quote get a backslash prefix; a newline becomes CRLF.
pub fn escape_quoted(text: &str) -> String {
    let escaped = global_substitute(text, "\\", "\\\\");
    let escaped = global_substitute(&escaped, "\"", "\\\"");
    global_substitute(&escaped, "\n", "\r\n")
}

/// Encodes text as UTF-16LE bytes, without terminator.
pub fn encode_utf16_le(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for unit in text.encode_utf16() {
        let mut buf = [0u8; 2];
        LittleEndian::write_u16(&mut buf, unit);
        out.extend_from_slice(&buf);
    }
    out
}

/// Decodes UTF-16LE bytes strictly: odd lengths and unpaired surrogates fail.
///
/// No byte-order mark is stripped; a leading U+FEFF stays in the text.
pub fn decode_utf16_le(data: &[u8], context: &str) -> Result<String> {
    if data.len() % 2 != 0 {
        return Err(RegistryError::InvalidUtf16 {
            context: context.to_string(),
        });
    }
    UTF_16LE
        .decode_without_bom_handling_and_without_replacement(data)
        .map(|text| text.into_owned())
        .ok_or_else(|| RegistryError::InvalidUtf16 {
            context: context.to_string(),
        })
}

/// Decodes a slice of UTF-16 code units, `None` on unpaired surrogates.
pub fn decode_utf16_units(units: &[u16]) -> Option<String> {
    String::from_utf16(units).ok()
}

/// Width of a string in UTF-16 code units, the unit .reg line lengths are counted in.
pub fn utf16_width(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Renders bytes as comma-free lowercase hex digit pairs.
pub fn hex_lower(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Parses exactly `2 * N` hex digits into `N` bytes, in digit order.
///
/// The digits are re-encoded and compared case-insensitively against the
/// source text, so anything but a clean run of hex digits is rejected.
pub fn parse_hex_digits<const N: usize>(digits: &str) -> Option<[u8; N]> {
    let mut bytes = [0u8; N];
    hex::decode_to_slice(digits, &mut bytes).ok()?;
    hex::encode(bytes)
        .eq_ignore_ascii_case(digits)
        .then_some(bytes)
}

/// Reads an ASCII string from a byte slice, trimming null terminators.
///
/// Compressed key and value names in hives are stored this way; bytes above
/// 0x7F are taken as Latin-1.
pub fn read_ascii_string(data: &[u8]) -> String {
    data.iter()
        .map(|&b| b as char)
        .collect::<String>()
        .trim_end_matches('\0')
        .to_string()
}

/// Reads a u32 from a byte slice at the given offset.
pub fn read_u32_le(data: &[u8], offset: usize) -> Result<u32> {
    let bytes = slice_at(data, offset, 4)?;
    let mut cursor = Cursor::new(bytes);
    cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| truncated(data, offset, 4))
}

/// Reads a u16 from a byte slice at the given offset.
pub fn read_u16_le(data: &[u8], offset: usize) -> Result<u16> {
    let bytes = slice_at(data, offset, 2)?;
    let mut cursor = Cursor::new(bytes);
    cursor
        .read_u16::<LittleEndian>()
        .map_err(|_| truncated(data, offset, 2))
}

/// Reads an i32 from a byte slice at the given offset.
pub fn read_i32_le(data: &[u8], offset: usize) -> Result<i32> {
    let bytes = slice_at(data, offset, 4)?;
    let mut cursor = Cursor::new(bytes);
    cursor
        .read_i32::<LittleEndian>()
        .map_err(|_| truncated(data, offset, 4))
}

/// Appends a u32 in little-endian order.
pub fn write_u32_le(out: &mut Vec<u8>, value: u32) {
    let mut buf = [0u8; 4];
    LittleEndian::write_u32(&mut buf, value);
    out.extend_from_slice(&buf);
}

/// Appends a u16 in little-endian order.
pub fn write_u16_le(out: &mut Vec<u8>, value: u16) {
    let mut buf = [0u8; 2];
    LittleEndian::write_u16(&mut buf, value);
    out.extend_from_slice(&buf);
}

/// Calculates XOR checksum for the first 508 bytes of a hive base block.
///
/// The two reserved results 0 and 0xFFFFFFFF are stored as 1 and 0xFFFFFFFE.
pub fn calculate_checksum(data: &[u8]) -> u32 {
    let checksum = data
        .chunks_exact(4)
        .take(0x1FC / 4)
        .fold(0u32, |acc, dword| acc ^ LittleEndian::read_u32(dword));
    match checksum {
        0 => 1,
        0xFFFF_FFFF => 0xFFFF_FFFE,
        other => other,
    }
}

fn slice_at(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| truncated(data, offset, len))
}

fn truncated(data: &[u8], offset: usize, expected: usize) -> RegistryError {
    RegistryError::TruncatedData {
        offset: offset as u32,
        expected,
        actual: data.len().saturating_sub(offset),
    }
}
