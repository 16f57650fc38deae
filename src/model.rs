//! In-memory registry tree exchanged by every parser and serializer.
//!
//! A tree is built once per conversion, handed to exactly one serializer and
//! then dropped. Values keep their payload as raw bytes so that any type,
//! known or not, survives a round trip unchanged.

use crate::utils::{decode_utf16_units, encode_utf16_le};
use byteorder::{ByteOrder, LittleEndian};

/// Keys nest at most this deep in a registry.
pub const MAX_KEY_DEPTH: usize = 512;

/// Name of the value that carries the target of a symbolic-link key.
pub const SYMBOLIC_LINK_VALUE: &str = "SymbolicLinkValue";

/// Registry value data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueType {
    /// No value type.
    None,

    /// String (null-terminated).
    String,

    /// String with environment variables.
    ExpandString,

    /// Binary data.
    Binary,

    /// 32-bit little-endian integer.
    Dword,

    /// 32-bit big-endian integer.
    DwordBigEndian,

    /// Symbolic link (Unicode).
    Link,

    /// Multiple strings.
    MultiString,

    /// Resource list.
    ResourceList,

    /// Full resource descriptor.
    FullResourceDescriptor,

    /// Resource requirements list.
    ResourceRequirementsList,

    /// 64-bit little-endian integer.
    Qword,

    /// Any other type code, kept verbatim.
    Unknown(u32),
}

impl ValueType {
    /// Returns the numeric type code stored on disk.
    pub fn code(self) -> u32 {
        match self {
            ValueType::None => 0,
            ValueType::String => 1,
            ValueType::ExpandString => 2,
            ValueType::Binary => 3,
            ValueType::Dword => 4,
            ValueType::DwordBigEndian => 5,
            ValueType::Link => 6,
            ValueType::MultiString => 7,
            ValueType::ResourceList => 8,
            ValueType::FullResourceDescriptor => 9,
            ValueType::ResourceRequirementsList => 10,
            ValueType::Qword => 11,
            ValueType::Unknown(code) => code,
        }
    }

    /// Returns the name of this value type.
    pub fn name(&self) -> String {
        match self {
            ValueType::None => "REG_NONE".to_string(),
            ValueType::String => "REG_SZ".to_string(),
            ValueType::ExpandString => "REG_EXPAND_SZ".to_string(),
            ValueType::Binary => "REG_BINARY".to_string(),
            ValueType::Dword => "REG_DWORD".to_string(),
            ValueType::DwordBigEndian => "REG_DWORD_BIG_ENDIAN".to_string(),
            ValueType::Link => "REG_LINK".to_string(),
            ValueType::MultiString => "REG_MULTI_SZ".to_string(),
            ValueType::ResourceList => "REG_RESOURCE_LIST".to_string(),
            ValueType::FullResourceDescriptor => "REG_FULL_RESOURCE_DESCRIPTOR".to_string(),
            ValueType::ResourceRequirementsList => "REG_RESOURCE_REQUIREMENTS_LIST".to_string(),
            ValueType::Qword => "REG_QWORD".to_string(),
            ValueType::Unknown(value) => format!("REG_UNKNOWN_{:#010x}", value),
        }
    }
}

impl From<u32> for ValueType {
    /// Type codes 0-11 are predefined; anything else is kept as `Unknown`.
    fn from(code: u32) -> Self {
        match code {
            0 => ValueType::None,
            1 => ValueType::String,
            2 => ValueType::ExpandString,
            3 => ValueType::Binary,
            4 => ValueType::Dword,
            5 => ValueType::DwordBigEndian,
            6 => ValueType::Link,
            7 => ValueType::MultiString,
            8 => ValueType::ResourceList,
            9 => ValueType::FullResourceDescriptor,
            10 => ValueType::ResourceRequirementsList,
            11 => ValueType::Qword,
            _ => ValueType::Unknown(code),
        }
    }
}

impl From<ValueType> for u32 {
    fn from(value_type: ValueType) -> Self {
        value_type.code()
    }
}

/// A registry value: name, type and exact payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegistryValue {
    /// Value name. Empty for the key's default value.
    pub name: String,

    /// Value data type.
    pub value_type: ValueType,

    /// Raw payload as stored on disk.
    pub data: Vec<u8>,
}

impl RegistryValue {
    /// Creates a value from its raw parts.
    pub fn new(name: impl Into<String>, value_type: ValueType, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            value_type,
            data,
        }
    }

    /// Creates a `REG_SZ` value; the payload gets its terminating null.
    pub fn string(name: impl Into<String>, text: &str) -> Self {
        Self::new(name, ValueType::String, null_terminated(text))
    }

    /// Creates a `REG_EXPAND_SZ` value.
    pub fn expand_string(name: impl Into<String>, text: &str) -> Self {
        Self::new(name, ValueType::ExpandString, null_terminated(text))
    }

    /// Creates a `REG_MULTI_SZ` value: each string null-terminated, then a final null.
    pub fn multi_string<S: AsRef<str>>(name: impl Into<String>, strings: &[S]) -> Self {
        let mut data = Vec::new();
        for s in strings {
            data.extend(null_terminated(s.as_ref()));
        }
        data.extend_from_slice(&[0, 0]);
        Self::new(name, ValueType::MultiString, data)
    }

    /// Creates a `REG_DWORD` value.
    pub fn dword(name: impl Into<String>, value: u32) -> Self {
        let mut data = vec![0u8; 4];
        LittleEndian::write_u32(&mut data, value);
        Self::new(name, ValueType::Dword, data)
    }

    /// Creates a `REG_QWORD` value.
    pub fn qword(name: impl Into<String>, value: u64) -> Self {
        let mut data = vec![0u8; 8];
        LittleEndian::write_u64(&mut data, value);
        Self::new(name, ValueType::Qword, data)
    }

    /// Creates a `REG_BINARY` value.
    pub fn binary(name: impl Into<String>, data: &[u8]) -> Self {
        Self::new(name, ValueType::Binary, data.to_vec())
    }

    /// Returns true for the key's default (unnamed) value.
    pub fn is_default(&self) -> bool {
        self.name.is_empty()
    }

    /// Returns the 32-bit integer if the payload is exactly four bytes.
    pub fn dword_value(&self) -> Option<u32> {
        (self.data.len() == 4).then(|| LittleEndian::read_u32(&self.data))
    }

    /// Returns the 64-bit integer if the payload is exactly eight bytes.
    pub fn qword_value(&self) -> Option<u64> {
        (self.data.len() == 8).then(|| LittleEndian::read_u64(&self.data))
    }

    /// Returns the text of a single null-terminated string payload.
    ///
    /// `None` unless the payload is non-empty, holds whole UTF-16 code units,
    /// ends with the only null code unit it contains and decodes cleanly.
    pub fn sz_text(&self) -> Option<String> {
        let units = self.code_units()?;
        let (last, body) = units.split_last()?;
        if *last != 0 || body.contains(&0) {
            return None;
        }
        decode_utf16_units(body)
    }

    /// Splits a null-separated string-list payload into its components.
    ///
    /// Every null code unit terminates one component, so a payload of
    /// `a\0b\0\0` yields `["a", "b", ""]`. `None` unless the payload is
    /// non-empty, holds whole code units, ends with a null and decodes cleanly.
    pub fn string_list(&self) -> Option<Vec<String>> {
        let units = self.code_units()?;
        if units.last() != Some(&0) {
            return None;
        }
        units[..units.len() - 1]
            .split(|&unit| unit == 0)
            .map(decode_utf16_units)
            .collect()
    }

    fn code_units(&self) -> Option<Vec<u16>> {
        if self.data.is_empty() || self.data.len() % 2 != 0 {
            return None;
        }
        let mut units = vec![0u16; self.data.len() / 2];
        LittleEndian::read_u16_into(&self.data, &mut units);
        Some(units)
    }
}

fn null_terminated(text: &str) -> Vec<u8> {
    let mut data = encode_utf16_le(text);
    data.extend_from_slice(&[0, 0]);
    data
}

/// A registry key with ordered subkeys and values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegistryKey {
    /// Key name; never contains the path separator when built from a hive.
    pub name: String,

    /// Child keys in file or hive order.
    pub subkeys: Vec<RegistryKey>,

    /// Values in file or hive order.
    pub values: Vec<RegistryValue>,
}

impl RegistryKey {
    /// Creates an empty key.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subkeys: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Adds a value, builder style.
    pub fn with_value(mut self, value: RegistryValue) -> Self {
        self.values.push(value);
        self
    }

    /// Adds a subkey, builder style.
    pub fn with_subkey(mut self, subkey: RegistryKey) -> Self {
        self.subkeys.push(subkey);
        self
    }

    /// Returns the first subkey with the given name.
    pub fn subkey(&self, name: &str) -> Option<&RegistryKey> {
        self.subkeys.iter().find(|k| k.name == name)
    }

    /// Returns the first value with the given name (empty for the default value).
    pub fn value(&self, name: &str) -> Option<&RegistryValue> {
        self.values.iter().find(|v| v.name == name)
    }

    /// Returns true if this key follows the symbolic-link convention:
    /// no subkeys and a single `REG_LINK` value named `SymbolicLinkValue`.
    pub fn is_symbolic_link(&self) -> bool {
        self.subkeys.is_empty()
            && self.values.len() == 1
            && self.values[0].value_type == ValueType::Link
            && self.values[0].name == SYMBOLIC_LINK_VALUE
    }

    /// Counts this key and all of its descendants.
    pub fn key_count(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(key) = pending.pop() {
            count += 1;
            pending.extend(key.subkeys.iter());
        }
        count
    }

    /// Counts the values held by this key and all of its descendants.
    pub fn value_count(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(key) = pending.pop() {
            count += key.values.len();
            pending.extend(key.subkeys.iter());
        }
        count
    }
}
