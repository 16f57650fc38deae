//! .reg text to tree parsing.
//!
//! Nesting is recovered from path prefixes alone: a `[path]` line opens a
//! child of the innermost open key whose path plus separator is a strict
//! prefix of it, and closes every open key for which that is not true.
//! Open keys live on an explicit stack bounded by [`MAX_KEY_DEPTH`].

use super::{
    DEFAULT_VALUE, DWORD_PREFIX, ESCAPED_NEWLINE, EXPAND_SZ_PREFIX, HEX_PREFIX,
    HEX_TYPE_CLOSING, HEX_TYPE_OPENING, KEY_CLOSING_AT_EOL, KEY_OPENING, LEADING_SPACE,
    LIST_SEPARATOR, MULTI_SZ_PREFIX, NEWLINE, PATH_SEPARATOR, PREAMBLE, QWORD_PREFIX,
    STRING_DELIMITER, TYPE_DATA_SEPARATOR, VALUE_NAME_SEPARATOR,
};
use crate::cursor::TextCursor;
use crate::error::{RegistryError, Result};
use crate::model::{RegistryKey, RegistryValue, ValueType, MAX_KEY_DEPTH};
use crate::utils::{
    decode_utf16_le, encode_utf16_le, global_substitute, parse_hex_digits, utf16_width,
};
use tracing::{debug, info, instrument};

/// Parses UTF-16LE .reg bytes into a tree.
///
/// The input must start with the byte-order mark and banner, hold exactly
/// one root key and nothing after the last key's values. Extended value
/// keywords (`qword:`, `multi_sz:`, `expand_sz:`) are always accepted.
///
/// # Examples
///
/// ```
/// use reg_convert::{regfile, RegistryKey, RegistryValue};
///
/// let tree = RegistryKey::new("Root").with_value(RegistryValue::dword("Count", 42));
/// let parsed = regfile::parse(&regfile::serialize(&tree, false))?;
/// assert_eq!(parsed, tree);
/// # Ok::<(), reg_convert::RegistryError>(())
/// ```
#[instrument(skip(data), fields(len = data.len()))]
pub fn parse(data: &[u8]) -> Result<RegistryKey> {
    let preamble = encode_utf16_le(PREAMBLE);
    let body = data
        .strip_prefix(preamble.as_slice())
        .ok_or(RegistryError::MalformedPreamble { format: "reg" })?;
    let text = decode_utf16_le(body, "reg text")?;

    let mut cursor = TextCursor::new(&text);
    let mut roots = parse_keys(&mut cursor)?;

    if roots.len() != 1 {
        return Err(RegistryError::MultipleRootKeys { count: roots.len() });
    }
    if !cursor.is_empty() {
        return Err(RegistryError::TrailingData {
            remaining: utf16_width(cursor.rest()),
        });
    }

    let root = roots.remove(0);
    info!(
        keys = root.key_count(),
        values = root.value_count(),
        "Parsed .reg text"
    );
    Ok(root)
}

/// An open key together with the full path it was declared with.
struct Frame<'a> {
    path: &'a str,
    key: RegistryKey,
}

/// Reads `[path]` blocks until the input ends or a line that is not a key
/// header is met, returning the top-level keys.
fn parse_keys(cursor: &mut TextCursor<'_>) -> Result<Vec<RegistryKey>> {
    let mut roots = Vec::new();
    let mut open: Vec<Frame<'_>> = Vec::new();

    loop {
        cursor.skip_repeated(NEWLINE);
        if cursor.is_empty() {
            break;
        }
        if cursor.peek() != Some(KEY_OPENING) {
            if open.is_empty() && roots.is_empty() {
                return Err(RegistryError::unexpected("key path in brackets", "top level"));
            }
            break;
        }

        let rest = cursor.rest();
        let close = cursor.find_from(KEY_CLOSING_AT_EOL, 1).ok_or_else(|| {
            RegistryError::unterminated("closing bracket at end of line", first_line(rest))
        })?;
        let path = &rest[1..close];

        while let Some(top) = open.last() {
            if is_child_path(path, top.path) {
                break;
            }
            if let Some(frame) = open.pop() {
                attach(frame.key, &mut open, &mut roots);
            }
        }

        let prefix_len = open.last().map_or(0, |parent| parent.path.len() + 1);
        if path.len() <= prefix_len {
            // An empty path at the top level belongs to nobody.
            break;
        }
        if open.len() >= MAX_KEY_DEPTH {
            return Err(RegistryError::NestingTooDeep {
                limit: MAX_KEY_DEPTH,
                context: path.to_string(),
            });
        }

        cursor.advance(close + KEY_CLOSING_AT_EOL.len());
        let mut key = RegistryKey::new(global_substitute(&path[prefix_len..], NEWLINE, "\n"));
        key.values = parse_values(cursor, path)?;
        open.push(Frame { path, key });
    }

    while let Some(frame) = open.pop() {
        attach(frame.key, &mut open, &mut roots);
    }
    Ok(roots)
}

fn is_child_path(path: &str, parent: &str) -> bool {
    path.len() > parent.len() + 1
        && path.starts_with(parent)
        && path[parent.len()..].starts_with(PATH_SEPARATOR)
}

fn attach(key: RegistryKey, open: &mut [Frame<'_>], roots: &mut Vec<RegistryKey>) {
    match open.last_mut() {
        Some(parent) => parent.key.subkeys.push(key),
        None => roots.push(key),
    }
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or_default().to_string()
}

/// Reads value lines until a blank line or the end of input.
fn parse_values(cursor: &mut TextCursor<'_>, path: &str) -> Result<Vec<RegistryValue>> {
    let mut values = Vec::new();
    while !cursor.is_empty() && !cursor.starts_with(NEWLINE) {
        values.push(parse_value(cursor, path)?);
    }
    Ok(values)
}

fn parse_value(cursor: &mut TextCursor<'_>, path: &str) -> Result<RegistryValue> {
    let name = if cursor.eat_char(DEFAULT_VALUE) {
        String::new()
    } else if cursor.eat_char(STRING_DELIMITER) {
        cursor
            .read_quoted()
            .ok_or_else(|| RegistryError::unterminated("closing quotation mark", path))?
    } else {
        return Err(RegistryError::unexpected("value name", path));
    };

    let context = format!("{} -> {}", path, name);
    if !cursor.eat_char(VALUE_NAME_SEPARATOR) {
        return Err(RegistryError::unexpected("'=' after value name", context));
    }

    if cursor.eat_str(DWORD_PREFIX) {
        let [a, b, c, d] = read_fixed_digits::<4>(cursor, &context)?;
        expect_line_end(cursor, &context)?;
        Ok(RegistryValue::dword(name, u32::from_be_bytes([a, b, c, d])))
    } else if cursor.eat_str(QWORD_PREFIX) {
        let digits = read_fixed_digits::<8>(cursor, &context)?;
        expect_line_end(cursor, &context)?;
        Ok(RegistryValue::qword(name, u64::from_be_bytes(digits)))
    } else if cursor.eat_str(HEX_PREFIX) {
        let value_type = parse_hex_type(cursor, &context)?;
        let data = parse_hex_bytes(cursor, &context)?;
        Ok(RegistryValue::new(name, value_type, data))
    } else if cursor.eat_str(MULTI_SZ_PREFIX) {
        let data = parse_string_list(cursor, &context)?;
        Ok(RegistryValue::new(name, ValueType::MultiString, data))
    } else if cursor.eat_str(EXPAND_SZ_PREFIX) {
        let data = parse_string_list(cursor, &context)?;
        Ok(RegistryValue::new(name, ValueType::ExpandString, data))
    } else if cursor.eat_char(STRING_DELIMITER) {
        let text = cursor
            .read_quoted()
            .ok_or_else(|| RegistryError::unterminated("closing quotation mark", &*context))?;
        expect_line_end(cursor, &context)?;
        Ok(RegistryValue::string(name, &text))
    } else {
        Err(RegistryError::unexpected("value data", context))
    }
}

/// Reads exactly `2 * N` hex digits, most significant first.
fn read_fixed_digits<const N: usize>(cursor: &mut TextCursor<'_>, context: &str) -> Result<[u8; N]> {
    let rest = cursor.rest();
    let digits = cursor.take_chars(N * 2).ok_or_else(|| RegistryError::TruncatedPayload {
        expected: N * 2,
        actual: rest.chars().count(),
        context: context.to_string(),
    })?;
    parse_hex_digits::<N>(digits).ok_or_else(|| RegistryError::invalid_digits(digits, context))
}

/// Parses the optional `(type)` after `hex`, and the colon.
fn parse_hex_type(cursor: &mut TextCursor<'_>, context: &str) -> Result<ValueType> {
    let value_type = if cursor.eat_char(HEX_TYPE_OPENING) {
        let digits = cursor.take_while(|c| c.is_ascii_hexdigit());
        if digits.is_empty() || digits.len() > 8 {
            return Err(RegistryError::invalid_digits(digits, context));
        }
        if !cursor.eat_char(HEX_TYPE_CLOSING) {
            return Err(RegistryError::unterminated("closing parenthesis", context));
        }
        let code = u32::from_str_radix(digits, 16)
            .map_err(|_| RegistryError::invalid_digits(digits, context))?;
        ValueType::from(code)
    } else {
        ValueType::Binary
    };

    if !cursor.eat_char(TYPE_DATA_SEPARATOR) {
        return Err(RegistryError::unexpected("':' after hex type", context));
    }
    Ok(value_type)
}

/// Reads comma-separated byte pairs, tolerating line continuations, up to
/// the terminating line break.
fn parse_hex_bytes(cursor: &mut TextCursor<'_>, context: &str) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    loop {
        if cursor.eat_str(NEWLINE) {
            return Ok(data);
        }
        if cursor.is_empty() {
            return Err(RegistryError::unterminated("line terminator", context));
        }
        if cursor.eat_char(LIST_SEPARATOR) {
            continue;
        }
        if skip_continuations(cursor) {
            continue;
        }

        let digits = cursor
            .take_chars(2)
            .ok_or_else(|| RegistryError::unterminated("line terminator", context))?;
        let [byte] = parse_hex_digits::<1>(digits)
            .ok_or_else(|| RegistryError::invalid_digits(digits, context))?;
        data.push(byte);
    }
}

/// Reads one or more quoted strings separated by commas; every component
/// gets its own null terminator in the payload.
fn parse_string_list(cursor: &mut TextCursor<'_>, context: &str) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    loop {
        if !cursor.eat_char(STRING_DELIMITER) {
            return Err(RegistryError::unexpected("quoted string", context));
        }
        let part = cursor
            .read_quoted()
            .ok_or_else(|| RegistryError::unterminated("closing quotation mark", context))?;
        data.extend(encode_utf16_le(&part));
        data.extend_from_slice(&[0, 0]);

        skip_continuations(cursor);
        if cursor.eat_str(NEWLINE) {
            return Ok(data);
        }
        if !cursor.eat_char(LIST_SEPARATOR) {
            return Err(if cursor.is_empty() {
                RegistryError::unterminated("line terminator", context)
            } else {
                RegistryError::unexpected("',' or line terminator", context)
            });
        }
        skip_continuations(cursor);
    }
}

/// Consumes `\` line breaks and the indentation that follows them.
fn skip_continuations(cursor: &mut TextCursor<'_>) -> bool {
    let mut skipped = false;
    while cursor.eat_str(ESCAPED_NEWLINE) {
        cursor.take_while(|c| c == LEADING_SPACE);
        skipped = true;
    }
    skipped
}

fn expect_line_end(cursor: &mut TextCursor<'_>, context: &str) -> Result<()> {
    if cursor.eat_str(NEWLINE) {
        return Ok(());
    }
    if cursor.is_empty() {
        debug!(context, "Input ends inside a value line");
        return Err(RegistryError::unterminated("line terminator", context));
    }
    Err(RegistryError::unexpected("line terminator", context))
}
