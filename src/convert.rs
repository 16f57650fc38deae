//! Conversion between the supported on-disk formats.
//!
//! Every conversion reads its whole input, builds one [`RegistryKey`] tree,
//! hands it to exactly one serializer and writes the whole output at once.

use crate::error::{RegistryError, Result};
use crate::fileio::{read_whole_file, write_whole_file};
use crate::hive::{load_hive_as_tree, write_tree_as_hive, Hive};
use crate::model::RegistryKey;
use crate::{polfile, regfile};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, instrument};

/// Name given to the root key of trees loaded from hives and .pol files.
pub const DEFAULT_ROOT_NAME: &str = "(HiveRoot)";

/// On-disk registry formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Format {
    /// Binary registry hive (`regf`). Read-only.
    Hive,

    /// Registry editor export text.
    Reg,

    /// Registry editor text with `qword:`, `multi_sz:` and `expand_sz:` renderings.
    RegExtended,

    /// Group Policy registry file (`PReg`).
    Pol,
}

impl Format {
    /// Every format, in command-line order.
    pub const ALL: [Format; 4] = [Format::Hive, Format::Reg, Format::RegExtended, Format::Pol];

    /// Returns the command-line name of this format.
    pub fn name(self) -> &'static str {
        match self {
            Format::Hive => "hive",
            Format::Reg => "reg",
            Format::RegExtended => "reg+",
            Format::Pol => "pol",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        Format::ALL
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| RegistryError::Unsupported(format!("unknown format {:?}", s)))
    }
}

/// Parses in-memory bytes of the given format.
///
/// `root_name` names the root of hive and .pol trees; a .reg file names
/// its own root.
pub fn parse_tree(format: Format, data: &[u8], root_name: &str) -> Result<RegistryKey> {
    match format {
        Format::Hive => Hive::from_vec(data.to_vec())?.load_tree(root_name),
        Format::Reg | Format::RegExtended => regfile::parse(data),
        Format::Pol => polfile::parse(data, root_name),
    }
}

/// Serializes a tree to in-memory bytes of the given format.
pub fn serialize_tree(format: Format, tree: &RegistryKey) -> Result<Vec<u8>> {
    match format {
        Format::Hive => Err(RegistryError::Unsupported(
            "serializing hives to memory".to_string(),
        )),
        Format::Reg => Ok(regfile::serialize(tree, false)),
        Format::RegExtended => Ok(regfile::serialize(tree, true)),
        Format::Pol => polfile::serialize(tree),
    }
}

/// Loads a tree from a file.
pub fn load_tree<P: AsRef<Path>>(format: Format, path: P, root_name: &str) -> Result<RegistryKey> {
    match format {
        Format::Hive => load_hive_as_tree(path, root_name),
        _ => parse_tree(format, &read_whole_file(path)?, root_name),
    }
}

/// Stores a tree to a file, replacing it atomically.
pub fn store_tree<P: AsRef<Path>>(format: Format, tree: &RegistryKey, path: P) -> Result<()> {
    match format {
        Format::Hive => write_tree_as_hive(tree, path),
        _ => write_whole_file(path, &serialize_tree(format, tree)?),
    }
}

/// Converts `input` in format `from` to `output` in format `to`.
///
/// Nothing is written unless the whole input parsed successfully.
///
/// # Examples
///
/// ```no_run
/// use reg_convert::convert::{convert, Format, DEFAULT_ROOT_NAME};
///
/// convert(Format::Hive, "NTUSER.DAT", Format::Reg, "ntuser.reg", DEFAULT_ROOT_NAME)?;
/// # Ok::<(), reg_convert::RegistryError>(())
/// ```
#[instrument(skip(input, output), fields(
    input = %input.as_ref().display(),
    output = %output.as_ref().display()
))]
pub fn convert<P: AsRef<Path>, Q: AsRef<Path>>(
    from: Format,
    input: P,
    to: Format,
    output: Q,
    root_name: &str,
) -> Result<()> {
    let tree = load_tree(from, &input, root_name)?;
    store_tree(to, &tree, &output)?;
    info!(%from, %to, keys = tree.key_count(), "Conversion complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RegistryValue;

    #[test]
    fn test_format_names() {
        for format in Format::ALL {
            assert_eq!(format.name().parse::<Format>().unwrap(), format);
        }
        assert_eq!("REG".parse::<Format>().unwrap(), Format::Reg);
        assert!(matches!(
            "xml".parse::<Format>(),
            Err(RegistryError::Unsupported(_))
        ));
    }

    #[test]
    fn test_reg_to_pol_in_memory() {
        let tree = RegistryKey::new(DEFAULT_ROOT_NAME).with_subkey(
            RegistryKey::new("Policies").with_value(RegistryValue::dword("Enabled", 1)),
        );
        let reg = serialize_tree(Format::RegExtended, &tree).unwrap();
        let parsed = parse_tree(Format::Reg, &reg, "ignored").unwrap();
        assert_eq!(parsed, tree);

        let pol = serialize_tree(Format::Pol, &parsed).unwrap();
        assert_eq!(parse_tree(Format::Pol, &pol, DEFAULT_ROOT_NAME).unwrap(), tree);
    }

    #[test]
    fn test_hive_output_unsupported() {
        let tree = RegistryKey::new(DEFAULT_ROOT_NAME);
        assert!(matches!(
            serialize_tree(Format::Hive, &tree),
            Err(RegistryError::Unsupported(_))
        ));
    }
}
