//! Windows Registry Editor (.reg) text format.
//!
//! Files are UTF-16LE with a byte-order mark, CRLF line endings and the
//! `REGEDIT5` banner:
//!
//! ```text
//! Windows Registry Editor Version 5.00
//!
//! [(HiveRoot)\Software\Foo]
//! "Bar"="hello"
//! "Count"=dword:0000002a
//! @=hex:01,02,03
//!
//! ```
//!
//! The extended dialect adds `qword:`, `multi_sz:` and `expand_sz:` value
//! renderings. Writing them is opt-in; the parser always accepts them.

mod parser;
mod writer;

pub use parser::parse;
pub use writer::serialize;

/// Byte-order mark, banner line and blank line.
pub(crate) const PREAMBLE: &str = "\u{feff}Windows Registry Editor Version 5.00\r\n\r\n";

/// Line terminator.
pub(crate) const NEWLINE: &str = "\r\n";

/// Path component separator.
pub(crate) const PATH_SEPARATOR: char = '\\';

/// Opens a key path line.
pub(crate) const KEY_OPENING: char = '[';

/// Closes a key path line; only counts when followed by a line terminator.
pub(crate) const KEY_CLOSING_AT_EOL: &str = "]\r\n";

/// Stands in for the quoted name of the default value.
pub(crate) const DEFAULT_VALUE: char = '@';

/// Separates a value name from its data.
pub(crate) const VALUE_NAME_SEPARATOR: char = '=';

/// Delimits names and string data.
pub(crate) const STRING_DELIMITER: char = '"';

pub(crate) const DWORD_PREFIX: &str = "dword:";
pub(crate) const QWORD_PREFIX: &str = "qword:";
pub(crate) const HEX_PREFIX: &str = "hex";
pub(crate) const MULTI_SZ_PREFIX: &str = "multi_sz:";
pub(crate) const EXPAND_SZ_PREFIX: &str = "expand_sz:";

pub(crate) const HEX_TYPE_OPENING: char = '(';
pub(crate) const HEX_TYPE_CLOSING: char = ')';
pub(crate) const TYPE_DATA_SEPARATOR: char = ':';

/// Separates hex bytes and string-list components.
pub(crate) const LIST_SEPARATOR: char = ',';

/// Ends a physical line inside a wrapped value.
pub(crate) const ESCAPED_NEWLINE: &str = "\\\r\n";

pub(crate) const LEADING_SPACE: char = ' ';

/// Column budget for hex and string-list renditions.
pub(crate) const WRAP_LIMIT: usize = 80;

/// Indentation of hex continuation lines.
pub(crate) const HEX_CONTINUATION_INDENT: usize = 2;
