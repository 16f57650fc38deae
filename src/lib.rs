//! # Windows Registry Format Converter
//!
//! Converts registry data between three on-disk forms through one in-memory
//! tree of keys and values:
//!
//! - **Registry hives** (`regf`), read through a memory-mapped, read-only loader
//! - **Registry editor exports** (`.reg`), UTF-16LE text in the `REGEDIT5` dialect,
//!   optionally extended with `qword:`, `multi_sz:` and `expand_sz:` renderings
//! - **Group Policy registry files** (`.pol`), the flat `PReg` binary entry list
//!
//! ## Architecture
//!
//! 1. **Model**: [`RegistryKey`] / [`RegistryValue`], owned and ordered; payloads
//!    are kept as raw bytes so unknown types round-trip unchanged
//! 2. **Cursors**: forward-only text and byte cursors used by both parsers
//! 3. **Codecs**: [`regfile`] and [`polfile`], each a `parse` / `serialize` pair
//! 4. **Collaborators**: [`hive`] loading and [`fileio`] whole-file access
//! 5. **Front door**: [`convert`] ties formats to files
//!
//! ## Format Layouts
//!
//! ```text
//! .reg   BOM "Windows Registry Editor Version 5.00" CRLF CRLF
//!        [path] CRLF  value lines  CRLF   (once per key, depth first)
//!
//! .pol   "PReg" u32(1)
//!        [ path\0 ; name\0 ; u32 type ; u32 size ; data ]   (once per value)
//! ```
//!
//! ## Examples
//!
//! ### Building and exporting a tree
//!
//! ```
//! use reg_convert::{regfile, RegistryKey, RegistryValue};
//!
//! let tree = RegistryKey::new("(HiveRoot)").with_subkey(
//!     RegistryKey::new("Software")
//!         .with_value(RegistryValue::string("Owner", "admin"))
//!         .with_value(RegistryValue::dword("Build", 22631)),
//! );
//!
//! let bytes = regfile::serialize(&tree, false);
//! assert_eq!(regfile::parse(&bytes)?, tree);
//! # Ok::<(), reg_convert::RegistryError>(())
//! ```
//!
//! ### Converting files
//!
//! ```no_run
//! use reg_convert::convert::{convert, Format};
//!
//! convert(Format::Pol, "Registry.pol", Format::RegExtended, "policy.reg", "(HiveRoot)")?;
//! # Ok::<(), reg_convert::RegistryError>(())
//! ```
//!
//! ## Limitations
//!
//! - Hives are read-only; writing one returns [`RegistryError::Unsupported`]
//! - `.pol` files carry no nesting: parsed keys are named by full path under a
//!   synthetic root, and only adjacent entries for the same path are merged

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cell;
pub mod convert;
pub mod cursor;
pub mod error;
pub mod fileio;
pub mod header;
pub mod hive;
pub mod model;
pub mod polfile;
pub mod regfile;
pub mod utils;

// Re-export main types for convenience
pub use convert::Format;
pub use error::{RegistryError, Result};
pub use hive::{load_hive_as_tree, write_tree_as_hive, Hive};
pub use model::{RegistryKey, RegistryValue, ValueType, MAX_KEY_DEPTH};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
