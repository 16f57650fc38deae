//! Unit tests for parsing specific structures through the public API.

mod common;

use common::HiveBuilder;
use reg_convert::cursor::{ByteCursor, TextCursor};
use reg_convert::*;

fn utf16(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

#[test]
fn test_base_block_constants() {
    assert_eq!(header::BASE_BLOCK_SIZE, 4096);
    assert_eq!(header::REGF_SIGNATURE, b"regf");
    assert_eq!(header::CHECKSUM_OFFSET, 0x1FC);
}

#[test]
fn test_base_block_summary() {
    let mut b = HiveBuilder::new().with_minor_version(6);
    let root = b.key("ROOT", &[], &[]);
    let hive = Hive::from_vec(b.finish(root)).unwrap();

    let block = hive.base_block();
    assert!(block.supports_big_data());
    assert!(block.is_consistent());
    assert_eq!(
        block.to_string(),
        format!("regf 1.6, root cell {:#x}, 4096 bytes of bins", block.root_cell_offset)
    );
}

#[test]
fn test_value_type_codes() {
    assert_eq!(ValueType::from(1), ValueType::String);
    assert_eq!(ValueType::from(7), ValueType::MultiString);
    assert_eq!(ValueType::from(11), ValueType::Qword);
    assert_eq!(ValueType::from(0x20), ValueType::Unknown(0x20));
    assert_eq!(u32::from(ValueType::Unknown(0x20)), 0x20);
    assert_eq!(ValueType::Dword.name(), "REG_DWORD");
}

#[test]
fn test_regedit_export() {
    let text = concat!(
        "\u{feff}Windows Registry Editor Version 5.00\r\n\r\n",
        "[HKEY_CURRENT_USER\\Software\\Sample]\r\n",
        "@=\"default\"\r\n",
        "\"Data\"=hex:01,02,\\\r\n  03,04\r\n",
        "\"Path\"=hex(2):25,00,41,00,25,00,00,00\r\n",
        "\r\n",
        "[HKEY_CURRENT_USER\\Software\\Sample\\Child]\r\n",
        "\"Count\"=dword:0000000a\r\n",
        "\r\n",
    );
    let tree = regfile::parse(&utf16(text)).unwrap();

    assert_eq!(tree.name, "HKEY_CURRENT_USER\\Software\\Sample");
    assert_eq!(
        tree.values,
        vec![
            RegistryValue::string("", "default"),
            RegistryValue::binary("Data", &[1, 2, 3, 4]),
            RegistryValue::expand_string("Path", "%A%"),
        ]
    );
    assert_eq!(tree.subkeys.len(), 1);
    assert_eq!(tree.subkeys[0].name, "Child");
    assert_eq!(tree.subkeys[0].value("Count").unwrap().dword_value(), Some(10));
}

#[test]
fn test_reg_error_context_names_value() {
    let text = "\u{feff}Windows Registry Editor Version 5.00\r\n\r\n[R]\r\n\"Broken\"=dword:0000zz01\r\n\r\n";
    let err = regfile::parse(&utf16(text)).unwrap_err();
    assert!(matches!(err, RegistryError::InvalidDigitSequence { .. }));
    assert_eq!(
        err.to_string(),
        "Invalid digit sequence \"0000zz01\" (R -> Broken)"
    );
}

#[test]
fn test_pol_entry_layout() {
    let mut data = b"PReg".to_vec();
    data.extend_from_slice(&1u32.to_le_bytes());
    data.extend(utf16("[Software\\Policies\0;Enabled\0;"));
    data.extend_from_slice(&4u32.to_le_bytes());
    data.extend(utf16(";"));
    data.extend_from_slice(&4u32.to_le_bytes());
    data.extend(utf16(";"));
    data.extend_from_slice(&1u32.to_le_bytes());
    data.extend(utf16("]"));

    let tree = polfile::parse(&data, "Machine").unwrap();
    assert_eq!(tree.name, "Machine");
    assert_eq!(tree.subkeys.len(), 1);
    assert_eq!(tree.subkeys[0].name, "Software\\Policies");
    assert_eq!(tree.subkeys[0].values, vec![RegistryValue::dword("Enabled", 1)]);

    assert_eq!(polfile::serialize(&tree).unwrap(), data);
}

#[test]
fn test_pol_error_context_names_entry() {
    let mut data = b"PReg".to_vec();
    data.extend_from_slice(&1u32.to_le_bytes());
    data.extend(utf16("[Key\0;Name\0;"));
    data.extend_from_slice(&3u32.to_le_bytes());
    data.extend(utf16(";"));
    data.extend_from_slice(&100u32.to_le_bytes());
    data.extend(utf16(";"));
    data.extend_from_slice(&[1, 2, 3]);

    match polfile::parse(&data, "R").unwrap_err() {
        RegistryError::TruncatedPayload {
            expected,
            actual,
            context,
        } => {
            assert_eq!(expected, 100);
            assert_eq!(actual, 3);
            assert_eq!(context, "entry #0 (Key) -> Name");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_cursors() {
    let mut text = TextCursor::new("\"a\\\"b\"=rest");
    assert!(text.eat_char('"'));
    assert_eq!(text.read_quoted().as_deref(), Some("a\"b"));
    assert_eq!(text.rest(), "=rest");

    let bytes = utf16("path\0;tail");
    let mut cursor = ByteCursor::new(&bytes);
    assert_eq!(cursor.take_until_u16(0), Some(&utf16("path")[..]));
    assert!(cursor.eat_u16(u16::from(b';')));
    assert_eq!(cursor.len(), 8);
}
