//! In-memory construction of small regf hives for tests.

#![allow(dead_code)]

use reg_convert::utils::calculate_checksum;

const NO_CELL: u32 = 0xFFFF_FFFF;
const HBIN_HEADER_SIZE: usize = 32;
const HBIN_ALIGNMENT: usize = 4096;
const BASE_BLOCK_SIZE: usize = 4096;

/// Payload bytes held by each big-data segment.
pub const SEGMENT_SIZE: usize = 16344;

/// Appends cells to a single hive bin; offsets returned are relative to
/// the first bin, as stored in the hive.
pub struct HiveBuilder {
    bins: Vec<u8>,
    minor_version: u32,
}

fn put_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn utf16(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

impl HiveBuilder {
    pub fn new() -> Self {
        let mut bins = vec![0u8; HBIN_HEADER_SIZE];
        bins[0..4].copy_from_slice(b"hbin");
        Self {
            bins,
            minor_version: 5,
        }
    }

    pub fn with_minor_version(mut self, minor_version: u32) -> Self {
        self.minor_version = minor_version;
        self
    }

    /// Appends an allocated cell, padded to 8 bytes.
    pub fn cell(&mut self, payload: &[u8]) -> u32 {
        let offset = self.bins.len();
        let size = (4 + payload.len() + 7) & !7;
        self.bins.extend_from_slice(&(-(size as i32)).to_le_bytes());
        self.bins.extend_from_slice(payload);
        self.bins.resize(offset + size, 0);
        offset as u32
    }

    /// Appends a key with an ASCII name and an `lf` subkey list.
    pub fn key(&mut self, name: &str, subkeys: &[u32], values: &[u32]) -> u32 {
        let list = self.subkey_list(b"lf", subkeys);
        self.key_with_list(name, list, subkeys.len() as u32, values)
    }

    /// Appends a key whose subkey list was built separately.
    pub fn key_with_list(&mut self, name: &str, list: u32, subkey_count: u32, values: &[u32]) -> u32 {
        let value_list = if values.is_empty() {
            NO_CELL
        } else {
            self.offsets(values)
        };

        let compressed = name.is_ascii();
        let name_bytes = if compressed {
            name.as_bytes().to_vec()
        } else {
            utf16(name)
        };

        let mut nk = vec![0u8; 0x4C];
        nk[0..2].copy_from_slice(b"nk");
        put_u16(&mut nk, 0x02, if compressed { 0x0020 } else { 0 });
        put_u32(&mut nk, 0x10, NO_CELL);
        put_u32(&mut nk, 0x14, subkey_count);
        put_u32(&mut nk, 0x1C, list);
        put_u32(&mut nk, 0x20, NO_CELL);
        put_u32(&mut nk, 0x24, values.len() as u32);
        put_u32(&mut nk, 0x28, value_list);
        put_u32(&mut nk, 0x2C, NO_CELL);
        put_u32(&mut nk, 0x30, NO_CELL);
        put_u16(&mut nk, 0x48, name_bytes.len() as u16);
        nk.extend_from_slice(&name_bytes);
        self.cell(&nk)
    }

    /// Appends an `li`, `lf`, `lh` or `ri` list; empty input yields no cell.
    pub fn subkey_list(&mut self, signature: &[u8; 2], offsets: &[u32]) -> u32 {
        if offsets.is_empty() {
            return NO_CELL;
        }
        let hinted = matches!(signature, b"lf" | b"lh");
        let mut list = signature.to_vec();
        list.extend_from_slice(&(offsets.len() as u16).to_le_bytes());
        for offset in offsets {
            list.extend_from_slice(&offset.to_le_bytes());
            if hinted {
                list.extend_from_slice(&[0u8; 4]);
            }
        }
        self.cell(&list)
    }

    /// Appends a bare array of cell offsets (value lists, segment lists).
    pub fn offsets(&mut self, offsets: &[u32]) -> u32 {
        let bytes: Vec<u8> = offsets.iter().flat_map(|o| o.to_le_bytes()).collect();
        self.cell(&bytes)
    }

    /// Appends a value; payloads of up to four bytes are stored inline.
    pub fn value(&mut self, name: &str, type_code: u32, data: &[u8]) -> u32 {
        let (raw_length, data_offset) = if data.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..data.len()].copy_from_slice(data);
            (0x8000_0000 | data.len() as u32, u32::from_le_bytes(inline))
        } else {
            (data.len() as u32, self.cell(data))
        };
        self.value_key(name, type_code, raw_length, data_offset)
    }

    /// Appends a value whose payload is split into `db` segments.
    pub fn big_value(&mut self, name: &str, type_code: u32, data: &[u8]) -> u32 {
        let segments: Vec<u32> = data.chunks(SEGMENT_SIZE).map(|chunk| self.cell(chunk)).collect();
        let segment_list = self.offsets(&segments);

        let mut db = b"db".to_vec();
        db.extend_from_slice(&(segments.len() as u16).to_le_bytes());
        db.extend_from_slice(&segment_list.to_le_bytes());
        let header = self.cell(&db);

        self.value_key(name, type_code, data.len() as u32, header)
    }

    fn value_key(&mut self, name: &str, type_code: u32, raw_length: u32, data_offset: u32) -> u32 {
        let compressed = name.is_ascii();
        let name_bytes = if compressed {
            name.as_bytes().to_vec()
        } else {
            utf16(name)
        };

        let mut vk = vec![0u8; 0x14];
        vk[0..2].copy_from_slice(b"vk");
        put_u16(&mut vk, 0x02, name_bytes.len() as u16);
        put_u32(&mut vk, 0x04, raw_length);
        put_u32(&mut vk, 0x08, data_offset);
        put_u32(&mut vk, 0x0C, type_code);
        put_u16(&mut vk, 0x10, if compressed { 0x0001 } else { 0 });
        vk.extend_from_slice(&name_bytes);
        self.cell(&vk)
    }

    /// Pads the bin, writes the base block and returns the hive image.
    pub fn finish(mut self, root: u32) -> Vec<u8> {
        let bins_len = (self.bins.len() + HBIN_ALIGNMENT - 1) / HBIN_ALIGNMENT * HBIN_ALIGNMENT;
        self.bins.resize(bins_len, 0);
        put_u32(&mut self.bins, 0x08, bins_len as u32);

        let mut hive = vec![0u8; BASE_BLOCK_SIZE];
        hive[0..4].copy_from_slice(b"regf");
        put_u32(&mut hive, 0x04, 1);
        put_u32(&mut hive, 0x08, 1);
        put_u32(&mut hive, 0x14, 1);
        put_u32(&mut hive, 0x18, self.minor_version);
        put_u32(&mut hive, 0x20, 1);
        put_u32(&mut hive, 0x24, root);
        put_u32(&mut hive, 0x28, bins_len as u32);
        put_u32(&mut hive, 0x2C, 1);
        let checksum = calculate_checksum(&hive);
        put_u32(&mut hive, 0x1FC, checksum);

        hive.extend_from_slice(&self.bins);
        hive
    }
}
