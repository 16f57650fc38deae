//! Tree to .reg text serialization.

use super::{
    DEFAULT_VALUE, DWORD_PREFIX, ESCAPED_NEWLINE, EXPAND_SZ_PREFIX, HEX_CONTINUATION_INDENT,
    HEX_PREFIX, HEX_TYPE_CLOSING, HEX_TYPE_OPENING, KEY_CLOSING_AT_EOL, KEY_OPENING,
    LEADING_SPACE, LIST_SEPARATOR, MULTI_SZ_PREFIX, NEWLINE, PATH_SEPARATOR, PREAMBLE,
    QWORD_PREFIX, STRING_DELIMITER, TYPE_DATA_SEPARATOR, VALUE_NAME_SEPARATOR, WRAP_LIMIT,
};
use crate::model::{RegistryKey, RegistryValue, ValueType};
use crate::utils::{encode_utf16_le, escape_quoted, global_substitute, hex_lower, utf16_width};
use tracing::{debug, info, instrument};

/// Serializes a tree to UTF-16LE .reg bytes, preamble included.
///
/// Keys are written depth first: each key's `[path]` line, its values, a
/// blank line, then its subkeys before the next sibling. With `extensions`
/// set, `REG_QWORD`, `REG_MULTI_SZ` and `REG_EXPAND_SZ` values get their
/// dedicated renderings; otherwise they are written as `hex(..)`.
///
/// # Examples
///
/// ```
/// use reg_convert::{regfile, RegistryKey, RegistryValue};
///
/// let tree = RegistryKey::new("Software")
///     .with_subkey(RegistryKey::new("Foo").with_value(RegistryValue::string("Bar", "hello")));
/// let bytes = regfile::serialize(&tree, false);
/// let text = String::from_utf16(
///     &bytes.chunks_exact(2).map(|p| u16::from_le_bytes([p[0], p[1]])).collect::<Vec<_>>(),
/// )
/// .unwrap();
/// assert!(text.contains("[Software\\Foo]\r\n\"Bar\"=\"hello\"\r\n\r\n"));
/// ```
#[instrument(skip(root), fields(root = %root.name))]
pub fn serialize(root: &RegistryKey, extensions: bool) -> Vec<u8> {
    let mut writer = RegWriter::new(extensions);
    writer.out.push_str(PREAMBLE);

    let mut pending: Vec<(&RegistryKey, String)> = vec![(root, String::new())];
    let mut key_count = 0usize;
    while let Some((key, parent_path)) = pending.pop() {
        let path = if parent_path.is_empty() {
            key.name.clone()
        } else {
            format!("{}{}{}", parent_path, PATH_SEPARATOR, key.name)
        };
        writer.write_key(key, &path);
        key_count += 1;

        // Reversed so the first subkey is popped (and written) first.
        for subkey in key.subkeys.iter().rev() {
            pending.push((subkey, path.clone()));
        }
    }

    info!(keys = key_count, chars = writer.out.len(), "Rendered .reg text");
    encode_utf16_le(&writer.out)
}

struct RegWriter {
    out: String,
    extensions: bool,
}

impl RegWriter {
    fn new(extensions: bool) -> Self {
        Self {
            out: String::new(),
            extensions,
        }
    }

    fn write_key(&mut self, key: &RegistryKey, path: &str) {
        self.out.push(KEY_OPENING);
        self.out.push_str(&global_substitute(path, "\n", NEWLINE));
        self.out.push_str(KEY_CLOSING_AT_EOL);

        for value in &key.values {
            self.write_value(value);
        }

        self.out.push_str(NEWLINE);
    }

    fn write_value(&mut self, value: &RegistryValue) {
        let prefix = if value.is_default() {
            format!("{}{}", DEFAULT_VALUE, VALUE_NAME_SEPARATOR)
        } else {
            format!(
                "{}{}{}{}",
                STRING_DELIMITER,
                escape_quoted(&value.name),
                STRING_DELIMITER,
                VALUE_NAME_SEPARATOR
            )
        };
        let prefix_width = utf16_width(&prefix);
        self.out.push_str(&prefix);

        let rendered = match value.value_type {
            ValueType::Dword => value.dword_value().map(|dword| {
                self.out
                    .push_str(&format!("{}{:08x}{}", DWORD_PREFIX, dword, NEWLINE));
            }),
            ValueType::Qword if self.extensions => value.qword_value().map(|qword| {
                self.out
                    .push_str(&format!("{}{:016x}{}", QWORD_PREFIX, qword, NEWLINE));
            }),
            ValueType::String => value.sz_text().map(|text| {
                self.out.push_str(&quote(&text));
                self.out.push_str(NEWLINE);
            }),
            ValueType::MultiString if self.extensions => value
                .string_list()
                .map(|parts| self.write_string_list(MULTI_SZ_PREFIX, &parts, prefix_width)),
            ValueType::ExpandString if self.extensions => value
                .string_list()
                .map(|parts| self.write_string_list(EXPAND_SZ_PREFIX, &parts, prefix_width)),
            _ => {
                self.write_hex(value, prefix_width);
                return;
            }
        };

        if rendered.is_none() {
            debug!(
                name = %value.name,
                value_type = %value.value_type.name(),
                len = value.data.len(),
                "Payload does not fit its type, falling back to hex"
            );
            self.write_hex(value, prefix_width);
        }
    }

    /// `hex:` / `hex(t):` followed by comma-separated bytes, wrapped the way
    /// regedit wraps: once a separator leaves the column past 76, the line
    /// is continued with `\` and a two-space indent.
    fn write_hex(&mut self, value: &RegistryValue, prefix_width: usize) {
        let mut header = String::from(HEX_PREFIX);
        if value.value_type != ValueType::Binary {
            header.push(HEX_TYPE_OPENING);
            header.push_str(&format!("{:x}", value.value_type.code()));
            header.push(HEX_TYPE_CLOSING);
        }
        header.push(TYPE_DATA_SEPARATOR);
        self.out.push_str(&header);

        let mut column = prefix_width + header.len();
        let digits = hex_lower(&value.data);
        let count = value.data.len();
        for index in 0..count {
            self.out.push_str(&digits[index * 2..index * 2 + 2]);
            column += 2;
            if index + 1 == count {
                break;
            }
            self.out.push(LIST_SEPARATOR);
            column += 1;
            // "xx,\" must still fit in the line
            if column > WRAP_LIMIT - 4 {
                self.continue_line(HEX_CONTINUATION_INDENT);
                column = HEX_CONTINUATION_INDENT;
            }
        }

        self.out.push_str(NEWLINE);
    }

    /// Quoted components separated by commas; continuation lines are
    /// indented to line up with the data after the value name.
    fn write_string_list(&mut self, keyword: &str, parts: &[String], prefix_width: usize) {
        self.out.push_str(keyword);
        let mut column = prefix_width + utf16_width(keyword);
        for (index, part) in parts.iter().enumerate() {
            let quoted = quote(part);
            column += utf16_width(&quoted);
            self.out.push_str(&quoted);
            if index + 1 == parts.len() {
                break;
            }
            self.out.push(LIST_SEPARATOR);
            column += 1;
            // ",\" must still fit in the line
            if column > WRAP_LIMIT - 2 {
                self.continue_line(prefix_width);
                column = prefix_width;
            }
        }

        self.out.push_str(NEWLINE);
    }

    fn continue_line(&mut self, indent: usize) {
        self.out.push_str(ESCAPED_NEWLINE);
        self.out.extend(std::iter::repeat(LEADING_SPACE).take(indent));
    }
}

fn quote(text: &str) -> String {
    format!("{}{}{}", STRING_DELIMITER, escape_quoted(text), STRING_DELIMITER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::decode_utf16_le;

    fn render(root: &RegistryKey, extensions: bool) -> String {
        let bytes = serialize(root, extensions);
        decode_utf16_le(&bytes, "test output").unwrap()
    }

    fn body(root: &RegistryKey, extensions: bool) -> String {
        render(root, extensions)
            .strip_prefix(PREAMBLE)
            .expect("preamble")
            .to_string()
    }

    fn single_value(value: RegistryValue, extensions: bool) -> String {
        let text = body(&RegistryKey::new("K").with_value(value), extensions);
        text.strip_prefix("[K]\r\n")
            .and_then(|rest| rest.strip_suffix("\r\n"))
            .expect("single key framing")
            .to_string()
    }

    #[test]
    fn test_preamble_and_empty_key() {
        let text = render(&RegistryKey::new("(HiveRoot)"), false);
        assert_eq!(
            text,
            "\u{feff}Windows Registry Editor Version 5.00\r\n\r\n[(HiveRoot)]\r\n\r\n"
        );
    }

    #[test]
    fn test_string_value_literal() {
        let tree = RegistryKey::new("Software")
            .with_subkey(RegistryKey::new("Foo").with_value(RegistryValue::string("Bar", "hello")));
        assert_eq!(
            body(&tree, false),
            "[Software]\r\n\r\n[Software\\Foo]\r\n\"Bar\"=\"hello\"\r\n\r\n"
        );
    }

    #[test]
    fn test_preorder_sibling_order() {
        let tree = RegistryKey::new("R")
            .with_subkey(RegistryKey::new("A").with_subkey(RegistryKey::new("A1")))
            .with_subkey(RegistryKey::new("B"));
        assert_eq!(
            body(&tree, false),
            "[R]\r\n\r\n[R\\A]\r\n\r\n[R\\A\\A1]\r\n\r\n[R\\B]\r\n\r\n"
        );
    }

    #[test]
    fn test_default_value_and_escaping() {
        assert_eq!(single_value(RegistryValue::string("", "x"), false), "@=\"x\"\r\n");
        assert_eq!(
            single_value(RegistryValue::string("a\"b\\c", "1\n2"), false),
            "\"a\\\"b\\\\c\"=\"1\r\n2\"\r\n"
        );
    }

    #[test]
    fn test_key_name_newline_becomes_crlf() {
        let text = body(&RegistryKey::new("two\nlines"), false);
        assert_eq!(text, "[two\r\nlines]\r\n\r\n");
    }

    #[test]
    fn test_dword_and_fallback() {
        assert_eq!(
            single_value(RegistryValue::dword("n", 0x2a), false),
            "\"n\"=dword:0000002a\r\n"
        );
        let short = RegistryValue::new("n", ValueType::Dword, vec![1, 2, 3]);
        assert_eq!(single_value(short, false), "\"n\"=hex(4):01,02,03\r\n");
    }

    #[test]
    fn test_string_fallbacks_to_hex() {
        let odd = RegistryValue::new("s", ValueType::String, vec![b'a', 0, 0]);
        assert_eq!(single_value(odd, false), "\"s\"=hex(1):61,00,00\r\n");

        let unterminated = RegistryValue::new("s", ValueType::String, vec![b'a', 0]);
        assert_eq!(single_value(unterminated, false), "\"s\"=hex(1):61,00\r\n");

        let embedded = RegistryValue::new("s", ValueType::String, vec![b'a', 0, 0, 0, b'b', 0, 0, 0]);
        assert_eq!(
            single_value(embedded, false),
            "\"s\"=hex(1):61,00,00,00,62,00,00,00\r\n"
        );

        let empty = RegistryValue::new("s", ValueType::String, vec![]);
        assert_eq!(single_value(empty, false), "\"s\"=hex(1):\r\n");
    }

    #[test]
    fn test_extensions_toggle() {
        let qword = RegistryValue::qword("q", 0x0102_0304_0506_0708);
        assert_eq!(
            single_value(qword.clone(), true),
            "\"q\"=qword:0102030405060708\r\n"
        );
        assert_eq!(
            single_value(qword, false),
            "\"q\"=hex(b):08,07,06,05,04,03,02,01\r\n"
        );

        let multi = RegistryValue::multi_string("m", &["a", "b"]);
        assert_eq!(
            single_value(multi.clone(), true),
            "\"m\"=multi_sz:\"a\",\"b\",\"\"\r\n"
        );
        assert_eq!(
            single_value(multi, false),
            "\"m\"=hex(7):61,00,00,00,62,00,00,00,00,00\r\n"
        );

        let expand = RegistryValue::expand_string("e", "%TEMP%\\x");
        assert_eq!(
            single_value(expand, true),
            "\"e\"=expand_sz:\"%TEMP%\\\\x\"\r\n"
        );
    }

    #[test]
    fn test_unknown_type_uses_hex_type_code() {
        let value = RegistryValue::new("u", ValueType::Unknown(0x1234), vec![0xAB]);
        assert_eq!(single_value(value, true), "\"u\"=hex(1234):ab\r\n");
        let none = RegistryValue::new("", ValueType::None, vec![]);
        assert_eq!(single_value(none, true), "@=hex(0):\r\n");
    }

    #[test]
    fn test_hex_short_payloads() {
        assert_eq!(single_value(RegistryValue::binary("a", &[]), false), "\"a\"=hex:\r\n");
        assert_eq!(single_value(RegistryValue::binary("a", &[0]), false), "\"a\"=hex:00\r\n");
    }

    #[test]
    fn test_hex_wrap_boundary() {
        // `"a"=hex:` is 8 columns; each byte and comma adds 3. The 23rd
        // separator moves the column to 77, past the 76 threshold.
        let exactly_one_line = single_value(RegistryValue::binary("a", &[0; 23]), false);
        assert_eq!(
            exactly_one_line,
            format!("\"a\"=hex:{}00\r\n", "00,".repeat(22))
        );

        let wrapped = single_value(RegistryValue::binary("a", &[0; 24]), false);
        assert_eq!(
            wrapped,
            format!("\"a\"=hex:{}\\\r\n  00\r\n", "00,".repeat(23))
        );

        // Continuation lines start at column 2 and hold 25 bytes.
        let two_wraps = single_value(RegistryValue::binary("a", &[0; 49]), false);
        assert_eq!(
            two_wraps,
            format!(
                "\"a\"=hex:{}\\\r\n  {}\\\r\n  00\r\n",
                "00,".repeat(23),
                "00,".repeat(25)
            )
        );
    }

    #[test]
    fn test_string_list_wrap_indents_to_name_width() {
        let parts = vec!["xxxxxxxx"; 8];
        let value = RegistryValue::multi_string("m", &parts);
        let item = "\"xxxxxxxx\",";
        assert_eq!(
            single_value(value, true),
            format!(
                "\"m\"=multi_sz:{}\\\r\n    {}\"\"\r\n",
                item.repeat(6),
                item.repeat(2)
            )
        );
    }
}
