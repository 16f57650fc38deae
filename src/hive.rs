//! Read-only registry hive loader with memory-mapped file support.
//!
//! A [`Hive`] validates the base block up front and resolves cells on
//! demand; [`Hive::load_tree`] walks the whole key tree into an owned
//! [`RegistryKey`].

use crate::cell::{BigDataBlock, KeyNode, SubkeyList, ValueKey, ValueStorage};
use crate::error::{RegistryError, Result};
use crate::header::{BaseBlock, BASE_BLOCK_SIZE};
use crate::model::{RegistryKey, RegistryValue, ValueType, MAX_KEY_DEPTH};
use crate::utils::{read_i32_le, read_u32_le};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Largest payload stored in a single data cell; longer ones use `db` blocks.
const MAX_DIRECT_DATA_SIZE: u32 = 16344;

/// Loads a hive file as a tree whose root key is named `root_name`.
///
/// # Examples
///
/// ```no_run
/// let tree = reg_convert::hive::load_hive_as_tree("NTUSER.DAT", "(HiveRoot)")?;
/// println!("{} keys", tree.key_count());
/// # Ok::<(), reg_convert::RegistryError>(())
/// ```
pub fn load_hive_as_tree<P: AsRef<Path>>(path: P, root_name: &str) -> Result<RegistryKey> {
    Hive::open(path)?.load_tree(root_name)
}

/// Writing hives is not supported; always returns [`RegistryError::Unsupported`].
pub fn write_tree_as_hive<P: AsRef<Path>>(tree: &RegistryKey, path: P) -> Result<()> {
    Err(RegistryError::Unsupported(format!(
        "writing key {:?} as a hive to {}",
        tree.name,
        path.as_ref().display()
    )))
}

/// Registry hive opened for reading.
pub struct Hive {
    data: HiveData,
    base_block: BaseBlock,
}

/// Backing storage of a hive.
enum HiveData {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl HiveData {
    fn as_slice(&self) -> &[u8] {
        match self {
            HiveData::Mapped(mmap) => mmap,
            HiveData::Owned(data) => data,
        }
    }
}

/// A key whose subkeys are still being loaded.
struct PendingKey {
    key: RegistryKey,
    subkey_offsets: Vec<u32>,
    next: usize,
}

impl Hive {
    /// Opens a hive file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be opened
    /// - File is smaller than a base block
    /// - Base block is invalid
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| RegistryError::io(path, e))?;
        let file_size = file
            .metadata()
            .map_err(|e| RegistryError::io(path, e))?
            .len() as usize;

        if file_size < BASE_BLOCK_SIZE {
            return Err(RegistryError::HiveTooSmall {
                size: file_size,
                minimum: BASE_BLOCK_SIZE,
            });
        }

        // SAFETY: the file is opened read-only, the mapping is owned by the
        // returned Hive and every access goes through bounds-checked slicing.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| RegistryError::io(path, e))?;
        debug!(size = mmap.len(), "Memory mapped hive file");

        Self::from_data(HiveData::Mapped(mmap))
    }

    /// Creates a hive from bytes already in memory.
    pub fn from_vec(data: Vec<u8>) -> Result<Self> {
        Self::from_data(HiveData::Owned(data))
    }

    fn from_data(data: HiveData) -> Result<Self> {
        let base_block = BaseBlock::parse(data.as_slice())?;
        debug!(header = %base_block, "Parsed base block");
        Ok(Self { data, base_block })
    }

    /// Returns the base block header.
    pub fn base_block(&self) -> &BaseBlock {
        &self.base_block
    }

    /// Reads the cell at `offset` (relative to the first hbin), without its size field.
    pub fn read_cell(&self, offset: u32) -> Result<&[u8]> {
        let data = self.data.as_slice();
        let start = (offset as usize)
            .checked_add(BASE_BLOCK_SIZE)
            .filter(|&start| start < data.len())
            .ok_or_else(|| RegistryError::invalid_offset(offset, data.len()))?;

        let size = read_i32_le(data, start)?;
        let cell_size = size.unsigned_abs() as usize;
        if cell_size < 4 {
            return Err(RegistryError::invalid_cell_size(size, offset));
        }

        let end = start + cell_size;
        if end > data.len() {
            return Err(RegistryError::TruncatedData {
                offset,
                expected: cell_size,
                actual: data.len() - start,
            });
        }
        Ok(&data[start + 4..end])
    }

    /// Loads the complete key tree, renaming the root key to `root_name`.
    ///
    /// Subkeys keep hive order and values keep value-list order. Nesting
    /// deeper than [`MAX_KEY_DEPTH`] fails with
    /// [`RegistryError::NestingTooDeep`], which also stops reference cycles
    /// in corrupt hives.
    #[instrument(skip(self))]
    pub fn load_tree(&self, root_name: &str) -> Result<RegistryKey> {
        let mut current = self.load_key(self.base_block.root_cell_offset)?;
        current.key.name = root_name.to_string();
        let mut ancestors: Vec<PendingKey> = Vec::new();

        loop {
            if let Some(&offset) = current.subkey_offsets.get(current.next) {
                current.next += 1;
                if ancestors.len() + 1 >= MAX_KEY_DEPTH {
                    return Err(RegistryError::NestingTooDeep {
                        limit: MAX_KEY_DEPTH,
                        context: key_path(&ancestors, &current),
                    });
                }
                let child = self.load_key(offset)?;
                ancestors.push(std::mem::replace(&mut current, child));
                continue;
            }

            match ancestors.pop() {
                Some(mut parent) => {
                    parent.key.subkeys.push(current.key);
                    current = parent;
                }
                None => {
                    info!(
                        keys = current.key.key_count(),
                        values = current.key.value_count(),
                        "Loaded hive tree"
                    );
                    return Ok(current.key);
                }
            }
        }
    }

    /// Reads a key node with its values and the offsets of its subkeys.
    fn load_key(&self, offset: u32) -> Result<PendingKey> {
        let node = KeyNode::parse(self.read_cell(offset)?, offset)?;

        let subkey_offsets = if node.has_subkeys() {
            self.subkey_offsets(node.subkey_list_offset)?
        } else {
            Vec::new()
        };

        let mut key = RegistryKey::new(node.name.clone());
        if node.has_values() {
            key.values = self.load_values(&node)?;
        }

        Ok(PendingKey {
            key,
            subkey_offsets,
            next: 0,
        })
    }

    /// Flattens a subkey list, following one level of `ri` indirection.
    fn subkey_offsets(&self, list_offset: u32) -> Result<Vec<u32>> {
        match SubkeyList::parse(self.read_cell(list_offset)?, list_offset)? {
            SubkeyList::Leaf(offsets) => Ok(offsets),
            SubkeyList::IndexRoot(lists) => {
                let mut offsets = Vec::new();
                for leaf_offset in lists {
                    match SubkeyList::parse(self.read_cell(leaf_offset)?, leaf_offset)? {
                        SubkeyList::Leaf(leaf) => offsets.extend(leaf),
                        SubkeyList::IndexRoot(_) => {
                            return Err(RegistryError::InvalidSubkeyList {
                                list_type: *b"ri",
                            })
                        }
                    }
                }
                Ok(offsets)
            }
        }
    }

    fn load_values(&self, node: &KeyNode) -> Result<Vec<RegistryValue>> {
        let list = self.read_cell(node.value_list_offset)?;
        let count = node.value_count as usize;
        if list.len() < count * 4 {
            return Err(RegistryError::TruncatedData {
                offset: node.value_list_offset,
                expected: count * 4,
                actual: list.len(),
            });
        }

        (0..count)
            .map(|i| {
                let offset = read_u32_le(list, i * 4)?;
                let value_key = ValueKey::parse(self.read_cell(offset)?, offset)?;
                let data = match value_key.storage {
                    ValueStorage::Inline(bytes) => bytes,
                    ValueStorage::Cell { offset, length } => self.read_value_data(offset, length)?,
                };
                Ok(RegistryValue::new(
                    value_key.name,
                    ValueType::from(value_key.type_code),
                    data,
                ))
            })
            .collect()
    }

    /// Reads a payload from a data cell, or from big-data segments when it is too long
    /// for one cell.
    fn read_value_data(&self, offset: u32, length: u32) -> Result<Vec<u8>> {
        if length > MAX_DIRECT_DATA_SIZE && self.base_block.supports_big_data() {
            return self.read_big_data(offset, length);
        }

        let cell = self.read_cell(offset)?;
        let length = length as usize;
        if cell.len() < length {
            return Err(RegistryError::TruncatedData {
                offset,
                expected: length,
                actual: cell.len(),
            });
        }
        Ok(cell[..length].to_vec())
    }

    fn read_big_data(&self, offset: u32, length: u32) -> Result<Vec<u8>> {
        let header = BigDataBlock::parse(self.read_cell(offset)?, offset)?;
        debug!(offset, segments = header.segment_count, length, "Reading big data block");

        let list = self.read_cell(header.segment_list_offset)?;
        let length = length as usize;
        let mut data = Vec::with_capacity(length);
        for i in 0..header.segment_count as usize {
            if data.len() >= length {
                break;
            }
            let segment_offset = read_u32_le(list, i * 4)?;
            let segment = self.read_cell(segment_offset)?;
            // Segments carry at most one direct cell's worth of payload; the rest is padding.
            let take = (length - data.len())
                .min(MAX_DIRECT_DATA_SIZE as usize)
                .min(segment.len());
            data.extend_from_slice(&segment[..take]);
        }

        if data.len() < length {
            return Err(RegistryError::TruncatedData {
                offset,
                expected: length,
                actual: data.len(),
            });
        }
        Ok(data)
    }
}

fn key_path(ancestors: &[PendingKey], current: &PendingKey) -> String {
    ancestors
        .iter()
        .chain(std::iter::once(current))
        .map(|pending| pending.key.name.as_str())
        .collect::<Vec<_>>()
        .join("\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_rejects_short_buffer() {
        assert!(matches!(
            Hive::from_vec(vec![0u8; 16]),
            Err(RegistryError::HiveTooSmall { size: 16, .. })
        ));
    }

    #[test]
    fn test_open_missing_file_reports_path() {
        let err = Hive::open("/nonexistent/dir/SYSTEM").err().unwrap();
        match err {
            RegistryError::Io { path, .. } => assert!(path.ends_with("SYSTEM")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_write_is_unsupported() {
        let err = write_tree_as_hive(&RegistryKey::new("R"), "out.hiv").unwrap_err();
        assert!(matches!(err, RegistryError::Unsupported(_)));
    }
}
