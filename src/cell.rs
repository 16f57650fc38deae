//! Hive cell records: key nodes (`nk`), value keys (`vk`), subkey lists
//! (`li`, `lf`, `lh`, `ri`) and big-data headers (`db`).
//!
//! Each parser takes the cell payload (size field already stripped) and the
//! cell offset, which is only used for error reporting.

use crate::error::{RegistryError, Result};
use crate::utils::{decode_utf16_le, read_ascii_string, read_u16_le, read_u32_le};

/// Offset value meaning "no cell".
pub const NO_CELL: u32 = 0xFFFF_FFFF;

/// Key node flag: the name is stored as ASCII/Latin-1.
const KEY_COMP_NAME: u16 = 0x0020;

/// Value key flag: the name is stored as ASCII/Latin-1.
const VALUE_COMP_NAME: u16 = 0x0001;

/// Data length flag: the payload lives in the data-offset field itself.
const DATA_INLINE: u32 = 0x8000_0000;

const KEY_NODE_MIN_SIZE: usize = 0x4C;
const VALUE_KEY_MIN_SIZE: usize = 0x14;
const BIG_DATA_MIN_SIZE: usize = 8;

fn check_signature(data: &[u8], expected: &[u8; 2]) -> Result<()> {
    let found = data.get(..2).unwrap_or(data);
    if found != expected {
        return Err(RegistryError::invalid_signature(expected, found));
    }
    Ok(())
}

fn check_len(data: &[u8], expected: usize, offset: u32) -> Result<()> {
    if data.len() < expected {
        return Err(RegistryError::TruncatedData {
            offset,
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Reads a cell name that is either compressed (one byte per character) or UTF-16LE.
fn read_name(data: &[u8], start: usize, len: usize, compressed: bool, offset: u32) -> Result<String> {
    check_len(data, start + len, offset)?;
    let raw = &data[start..start + len];
    if compressed {
        Ok(read_ascii_string(raw))
    } else {
        decode_utf16_le(raw, &format!("cell name at {:#x}", offset))
    }
}

/// Key node (nk): the fields needed to rebuild the key tree.
#[derive(Debug, Clone)]
pub struct KeyNode {
    /// Raw flags.
    pub flags: u16,

    /// Number of stable subkeys.
    pub subkey_count: u32,

    /// Offset of the stable subkey list.
    pub subkey_list_offset: u32,

    /// Number of values.
    pub value_count: u32,

    /// Offset of the value list.
    pub value_list_offset: u32,

    /// Key name.
    pub name: String,
}

impl KeyNode {
    /// Parses a key node from cell data.
    pub fn parse(data: &[u8], offset: u32) -> Result<Self> {
        check_len(data, KEY_NODE_MIN_SIZE, offset)?;
        check_signature(data, b"nk")?;

        let flags = read_u16_le(data, 0x02)?;
        let name_length = read_u16_le(data, 0x48)? as usize;
        let name = read_name(
            data,
            KEY_NODE_MIN_SIZE,
            name_length,
            flags & KEY_COMP_NAME != 0,
            offset,
        )?;

        Ok(KeyNode {
            flags,
            subkey_count: read_u32_le(data, 0x14)?,
            subkey_list_offset: read_u32_le(data, 0x1C)?,
            value_count: read_u32_le(data, 0x24)?,
            value_list_offset: read_u32_le(data, 0x28)?,
            name,
        })
    }

    /// Returns true if the key has stable subkeys.
    pub fn has_subkeys(&self) -> bool {
        self.subkey_count > 0 && self.subkey_list_offset != NO_CELL
    }

    /// Returns true if the key has values.
    pub fn has_values(&self) -> bool {
        self.value_count > 0 && self.value_list_offset != NO_CELL
    }
}

/// Where a value's payload is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueStorage {
    /// Up to four bytes held in the value key itself.
    Inline(Vec<u8>),

    /// A data cell (or big-data header) at the given offset.
    Cell {
        /// Cell offset.
        offset: u32,
        /// Payload length in bytes.
        length: u32,
    },
}

/// Value key (vk).
#[derive(Debug, Clone)]
pub struct ValueKey {
    /// Value name; empty for the default value.
    pub name: String,

    /// Raw type code.
    pub type_code: u32,

    /// Payload location.
    pub storage: ValueStorage,
}

impl ValueKey {
    /// Parses a value key from cell data.
    pub fn parse(data: &[u8], offset: u32) -> Result<Self> {
        check_len(data, VALUE_KEY_MIN_SIZE, offset)?;
        check_signature(data, b"vk")?;

        let name_length = read_u16_le(data, 0x02)? as usize;
        let raw_length = read_u32_le(data, 0x04)?;
        let data_offset = read_u32_le(data, 0x08)?;
        let type_code = read_u32_le(data, 0x0C)?;
        let flags = read_u16_le(data, 0x10)?;

        let name = read_name(
            data,
            VALUE_KEY_MIN_SIZE,
            name_length,
            flags & VALUE_COMP_NAME != 0,
            offset,
        )?;

        let length = raw_length & !DATA_INLINE;
        let storage = if raw_length & DATA_INLINE != 0 {
            let inline = data_offset.to_le_bytes();
            ValueStorage::Inline(inline[..(length as usize).min(4)].to_vec())
        } else if length == 0 || data_offset == NO_CELL {
            ValueStorage::Inline(Vec::new())
        } else {
            ValueStorage::Cell {
                offset: data_offset,
                length,
            }
        };

        Ok(ValueKey {
            name,
            type_code,
            storage,
        })
    }
}

/// Parsed subkey list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubkeyList {
    /// `li`, `lf` or `lh`: offsets of key nodes.
    Leaf(Vec<u32>),

    /// `ri`: offsets of further leaf lists.
    IndexRoot(Vec<u32>),
}

impl SubkeyList {
    /// Parses a subkey list from cell data.
    pub fn parse(data: &[u8], offset: u32) -> Result<Self> {
        check_len(data, 4, offset)?;
        let signature = [data[0], data[1]];
        let count = read_u16_le(data, 0x02)? as usize;

        // lf/lh entries carry a 4-byte name hint after each offset.
        let stride = match &signature {
            b"li" | b"ri" => 4,
            b"lf" | b"lh" => 8,
            _ => {
                return Err(RegistryError::InvalidSubkeyList {
                    list_type: signature,
                })
            }
        };
        check_len(data, 4 + count * stride, offset)?;

        let offsets = (0..count)
            .map(|i| read_u32_le(data, 4 + i * stride))
            .collect::<Result<Vec<_>>>()?;

        Ok(if &signature == b"ri" {
            SubkeyList::IndexRoot(offsets)
        } else {
            SubkeyList::Leaf(offsets)
        })
    }
}

/// Big data header (db) for payloads split over several cells.
#[derive(Debug, Clone)]
pub struct BigDataBlock {
    /// Number of segments.
    pub segment_count: u16,

    /// Offset of the cell listing the segment offsets.
    pub segment_list_offset: u32,
}

impl BigDataBlock {
    /// Parses a big data header from cell data.
    pub fn parse(data: &[u8], offset: u32) -> Result<Self> {
        check_len(data, BIG_DATA_MIN_SIZE, offset)?;
        check_signature(data, b"db")?;
        Ok(BigDataBlock {
            segment_count: read_u16_le(data, 0x02)?,
            segment_list_offset: read_u32_le(data, 0x04)?,
        })
    }
}
