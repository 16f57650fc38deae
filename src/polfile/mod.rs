//! Group Policy registry (.pol, `PReg`) binary format.
//!
//! A file is a fixed header followed by flat entries, one per value:
//!
//! ```text
//! "PReg" | version u32 = 1
//! [ key path \0 ; value name \0 ; type u32 ; size u32 ; data ]
//! ```
//!
//! Brackets and semicolons are single UTF-16LE code units, text is
//! UTF-16LE and integers are little-endian. There is no nesting: every entry
//! names its key by full path, so trees do not survive a round trip. Parsing
//! yields one key per run of adjacent entries that share a path, all under
//! a synthetic root.

mod parser;
mod writer;

pub use parser::parse;
pub use writer::serialize;

/// File signature.
pub(crate) const MAGIC: &[u8; 4] = b"PReg";

/// The only format version.
pub(crate) const VERSION: u32 = 1;

pub(crate) const ENTRY_OPENING: u16 = b'[' as u16;
pub(crate) const ENTRY_CLOSING: u16 = b']' as u16;
pub(crate) const FIELD_SEPARATOR: u16 = b';' as u16;

/// Null code unit ending the path and name fields.
pub(crate) const TEXT_TERMINATOR: u16 = 0;

/// Type code of the entry written for a key without values.
pub(crate) const PLACEHOLDER_TYPE: u32 = 0;
