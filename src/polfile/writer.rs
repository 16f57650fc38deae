//! Tree to .pol serialization.

use super::{
    ENTRY_CLOSING, ENTRY_OPENING, FIELD_SEPARATOR, MAGIC, PLACEHOLDER_TYPE, TEXT_TERMINATOR,
    VERSION,
};
use crate::error::{RegistryError, Result};
use crate::model::RegistryKey;
use crate::utils::{encode_utf16_le, write_u16_le, write_u32_le};
use tracing::{info, instrument};

/// Serializes every key below `root` as flat .pol entries.
///
/// The root itself only anchors the tree: its name and values are not
/// written, and paths start at its direct subkeys. A key without values is
/// written as a single placeholder entry with an empty name, type 0 and no
/// data.
///
/// # Errors
///
/// [`RegistryError::ValueTooLarge`] if a payload does not fit the 32-bit
/// size field.
#[instrument(skip(root), fields(root = %root.name))]
pub fn serialize(root: &RegistryKey) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);
    write_u32_le(&mut out, VERSION);

    let mut pending: Vec<(&RegistryKey, String)> = root
        .subkeys
        .iter()
        .rev()
        .map(|key| (key, String::new()))
        .collect();
    let mut entries = 0usize;

    while let Some((key, parent_path)) = pending.pop() {
        let path = if parent_path.is_empty() {
            key.name.clone()
        } else {
            format!("{}\\{}", parent_path, key.name)
        };

        if key.values.is_empty() {
            write_entry(&mut out, &path, "", PLACEHOLDER_TYPE, &[])?;
            entries += 1;
        }
        for value in &key.values {
            write_entry(&mut out, &path, &value.name, value.value_type.code(), &value.data)?;
            entries += 1;
        }

        for subkey in key.subkeys.iter().rev() {
            pending.push((subkey, path.clone()));
        }
    }

    info!(entries, bytes = out.len(), "Rendered .pol entries");
    Ok(out)
}

fn write_entry(
    out: &mut Vec<u8>,
    path: &str,
    name: &str,
    type_code: u32,
    data: &[u8],
) -> Result<()> {
    let size = u32::try_from(data.len()).map_err(|_| RegistryError::ValueTooLarge {
        size: data.len(),
        context: format!("{} -> {}", path, name),
    })?;

    write_u16_le(out, ENTRY_OPENING);
    write_text(out, path);
    write_u16_le(out, FIELD_SEPARATOR);
    write_text(out, name);
    write_u16_le(out, FIELD_SEPARATOR);
    write_u32_le(out, type_code);
    write_u16_le(out, FIELD_SEPARATOR);
    write_u32_le(out, size);
    write_u16_le(out, FIELD_SEPARATOR);
    out.extend_from_slice(data);
    write_u16_le(out, ENTRY_CLOSING);
    Ok(())
}

fn write_text(out: &mut Vec<u8>, text: &str) {
    out.extend(encode_utf16_le(text));
    write_u16_le(out, TEXT_TERMINATOR);
}
