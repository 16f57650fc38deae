//! .pol to tree parsing.

use super::{ENTRY_CLOSING, ENTRY_OPENING, FIELD_SEPARATOR, MAGIC, PLACEHOLDER_TYPE, VERSION};
use crate::cursor::ByteCursor;
use crate::error::{RegistryError, Result};
use crate::model::{RegistryKey, RegistryValue, ValueType};
use crate::utils::decode_utf16_le;
use tracing::{debug, info, instrument};

/// One decoded entry: the key path and, unless it is a placeholder, a value.
struct Entry {
    path: String,
    value: Option<RegistryValue>,
}

/// Parses .pol bytes into a tree rooted at a key named `root_name`.
///
/// Every run of adjacent entries with the same path becomes one subkey of
/// the root, named by that full path. Entries for the same path that are not
/// adjacent produce separate subkeys. Placeholder entries (empty name, type
/// 0, no data) mark a key without contributing a value.
///
/// # Examples
///
/// ```
/// use reg_convert::{polfile, RegistryKey, RegistryValue};
///
/// let tree = RegistryKey::new("(HiveRoot)").with_subkey(
///     RegistryKey::new("Software").with_subkey(
///         RegistryKey::new("Policies").with_value(RegistryValue::dword("Enabled", 1)),
///     ),
/// );
/// let flat = polfile::parse(&polfile::serialize(&tree)?, "(HiveRoot)")?;
/// assert_eq!(flat.subkeys[0].name, "Software");
/// assert_eq!(flat.subkeys[1].name, "Software\\Policies");
/// # Ok::<(), reg_convert::RegistryError>(())
/// ```
#[instrument(skip(data), fields(len = data.len()))]
pub fn parse(data: &[u8], root_name: &str) -> Result<RegistryKey> {
    let mut cursor = ByteCursor::new(data);
    if !cursor.eat(MAGIC) || cursor.read_u32() != Some(VERSION) {
        return Err(RegistryError::MalformedPreamble { format: "pol" });
    }

    let mut root = RegistryKey::new(root_name);
    let mut index = 0usize;
    let mut merged = 0usize;

    while !cursor.is_empty() {
        let entry = read_entry(&mut cursor, index)?;
        index += 1;

        let continues_run = root
            .subkeys
            .last()
            .is_some_and(|last| last.name == entry.path);
        if continues_run {
            merged += 1;
        } else {
            root.subkeys.push(RegistryKey::new(entry.path));
        }

        if let (Some(value), Some(key)) = (entry.value, root.subkeys.last_mut()) {
            key.values.push(value);
        }
    }

    info!(
        entries = index,
        keys = root.subkeys.len(),
        merged,
        "Parsed .pol entries"
    );
    Ok(root)
}

fn read_entry(cursor: &mut ByteCursor<'_>, index: usize) -> Result<Entry> {
    let context = format!("entry #{}", index);

    if !cursor.eat_u16(ENTRY_OPENING) {
        return Err(RegistryError::unexpected("'[' opening an entry", context));
    }
    let path = read_text(cursor, &context)?;
    let context = format!("{} ({})", context, path);
    let name = read_text(cursor, &context)?;
    let context = format!("{} -> {}", context, name);

    let type_code = read_u32(cursor, &context)?;
    expect_separator(cursor, &context)?;
    let size = read_u32(cursor, &context)? as usize;
    expect_separator(cursor, &context)?;

    let available = cursor.len();
    let data = cursor.take(size).ok_or_else(|| RegistryError::TruncatedPayload {
        expected: size,
        actual: available,
        context: context.clone(),
    })?;

    if !cursor.eat_u16(ENTRY_CLOSING) {
        return Err(if cursor.is_empty() {
            RegistryError::unterminated("']' closing an entry", context)
        } else {
            RegistryError::unexpected("']' closing an entry", context)
        });
    }

    let value = if name.is_empty() && type_code == PLACEHOLDER_TYPE && data.is_empty() {
        debug!(path = %path, "Placeholder entry");
        None
    } else {
        Some(RegistryValue::new(name, ValueType::from(type_code), data.to_vec()))
    };
    Ok(Entry { path, value })
}

/// Reads a null-terminated text field and the `;` that follows it.
fn read_text(cursor: &mut ByteCursor<'_>, context: &str) -> Result<String> {
    let field = cursor
        .take_until_u16(FIELD_SEPARATOR)
        .ok_or_else(|| RegistryError::unterminated("';' after text field", context))?;
    let text = field
        .strip_suffix(&[0u8, 0][..])
        .ok_or_else(|| RegistryError::unexpected("null terminator before ';'", context))?;
    decode_utf16_le(text, context)
}

fn read_u32(cursor: &mut ByteCursor<'_>, context: &str) -> Result<u32> {
    let available = cursor.len();
    cursor.read_u32().ok_or_else(|| RegistryError::TruncatedPayload {
        expected: 4,
        actual: available,
        context: context.to_string(),
    })
}

fn expect_separator(cursor: &mut ByteCursor<'_>, context: &str) -> Result<()> {
    if cursor.eat_u16(FIELD_SEPARATOR) {
        Ok(())
    } else {
        Err(RegistryError::unexpected("';' between entry fields", context))
    }
}
