//! Error types for registry conversion operations.
//!
//! Every parse and serialize step returns a [`RegistryError`] on the first
//! failure; nothing is recovered locally. Codec variants carry a `context`
//! naming the key path (and value name, when one was being read) so the
//! outermost caller can report where the conversion stopped.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors that can occur while reading or writing registry data.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Opening, reading or writing an underlying file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The fixed preamble of a file (BOM and banner, or magic and version) is missing.
    #[error("Malformed {format} preamble")]
    MalformedPreamble {
        /// Format whose preamble was expected.
        format: &'static str,
    },

    /// A closing quote, bracket, colon or separator was never found.
    #[error("Unterminated token: missing {token} ({context})")]
    UnterminatedToken {
        /// The terminator that was looked for.
        token: &'static str,
        /// Key/value being processed.
        context: String,
    },

    /// The input contains something other than what the grammar allows here.
    #[error("Unexpected token: expected {expected} ({context})")]
    UnexpectedToken {
        /// What the grammar expected.
        expected: &'static str,
        /// Key/value being processed.
        context: String,
    },

    /// Hex, dword or qword digits failed validation.
    #[error("Invalid digit sequence {digits:?} ({context})")]
    InvalidDigitSequence {
        /// The offending digits.
        digits: String,
        /// Key/value being processed.
        context: String,
    },

    /// A declared payload length exceeds the remaining input.
    #[error("Truncated payload: expected {expected} bytes, {actual} available ({context})")]
    TruncatedPayload {
        /// Declared length.
        expected: usize,
        /// Bytes left in the input.
        actual: usize,
        /// Key/value being processed.
        context: String,
    },

    /// A .reg file must hold exactly one root key.
    #[error("Expected a single root key, found {count}")]
    MultipleRootKeys {
        /// Number of root-level keys found.
        count: usize,
    },

    /// Input remained after the last complete structure.
    #[error("{remaining} unparsed code units left at end of input")]
    TrailingData {
        /// Units (characters or bytes) left over.
        remaining: usize,
    },

    /// A payload is too large to be framed by the target format.
    #[error("Value too large: {size} bytes ({context})")]
    ValueTooLarge {
        /// Payload size in bytes.
        size: usize,
        /// Key/value being processed.
        context: String,
    },

    /// Text that should be UTF-16 is malformed.
    #[error("Invalid UTF-16 text ({context})")]
    InvalidUtf16 {
        /// Where the text was found.
        context: String,
    },

    /// Keys nest deeper than the registry allows.
    #[error("Key nesting exceeds {limit} levels ({context})")]
    NestingTooDeep {
        /// Maximum supported depth.
        limit: usize,
        /// Key being processed.
        context: String,
    },

    /// The requested operation is not implemented.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Invalid magic signature in a hive structure.
    #[error("Invalid signature: expected {expected:?}, found {found:?}")]
    InvalidSignature {
        /// Expected signature bytes.
        expected: Vec<u8>,
        /// Signature bytes found.
        found: Vec<u8>,
    },

    /// Hive is too small to hold a base block.
    #[error("Hive too small: {size} bytes (minimum: {minimum} bytes)")]
    HiveTooSmall {
        /// Actual size.
        size: usize,
        /// Required size.
        minimum: usize,
    },

    /// Checksum mismatch in the hive base block.
    #[error("Checksum mismatch: expected {expected:#x}, calculated {calculated:#x}")]
    ChecksumMismatch {
        /// Stored checksum.
        expected: u32,
        /// Computed checksum.
        calculated: u32,
    },

    /// Unsupported hive version.
    #[error("Unsupported hive version: {major}.{minor}")]
    UnsupportedVersion {
        /// Major version.
        major: u32,
        /// Minor version.
        minor: u32,
    },

    /// Cell offset is out of bounds.
    #[error("Invalid cell offset: {offset:#x} (hive size: {hive_size:#x})")]
    InvalidOffset {
        /// Offending offset.
        offset: u32,
        /// Hive size for reference.
        hive_size: usize,
    },

    /// Cell size is invalid or corrupted.
    #[error("Invalid cell size: {size} at offset {offset:#x}")]
    InvalidCellSize {
        /// Raw size field.
        size: i32,
        /// Cell offset.
        offset: u32,
    },

    /// Unknown subkey list signature.
    #[error("Invalid subkey list type: {list_type:?}")]
    InvalidSubkeyList {
        /// Signature bytes found.
        list_type: [u8; 2],
    },

    /// Hive structure truncated.
    #[error("Truncated data at offset {offset:#x}: expected {expected} bytes, got {actual} bytes")]
    TruncatedData {
        /// Structure offset.
        offset: u32,
        /// Bytes needed.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },
}

impl RegistryError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an unterminated-token error.
    pub fn unterminated(token: &'static str, context: impl Into<String>) -> Self {
        Self::UnterminatedToken {
            token,
            context: context.into(),
        }
    }

    /// Creates an unexpected-token error.
    pub fn unexpected(expected: &'static str, context: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            expected,
            context: context.into(),
        }
    }

    /// Creates an invalid digit sequence error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use reg_convert::error::RegistryError;
    /// let err = RegistryError::invalid_digits("0000zz00", r"Software\Foo -> Bar");
    /// assert!(err.to_string().contains("0000zz00"));
    /// ```
    pub fn invalid_digits(digits: &str, context: impl Into<String>) -> Self {
        Self::InvalidDigitSequence {
            digits: digits.to_string(),
            context: context.into(),
        }
    }

    /// Creates an invalid signature error with context.
    pub fn invalid_signature(expected: &[u8], found: &[u8]) -> Self {
        Self::InvalidSignature {
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }

    /// Creates an invalid offset error with context.
    pub fn invalid_offset(offset: u32, hive_size: usize) -> Self {
        Self::InvalidOffset { offset, hive_size }
    }

    /// Creates an invalid cell size error with context.
    pub fn invalid_cell_size(size: i32, offset: u32) -> Self {
        Self::InvalidCellSize { size, offset }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_in_message() {
        let err = RegistryError::unterminated("closing quotation mark", r"Root\Key -> Name");
        let message = err.to_string();
        assert!(message.contains("closing quotation mark"));
        assert!(message.contains(r"Root\Key -> Name"));
    }

    #[test]
    fn test_io_error_keeps_source() {
        use std::error::Error as _;

        let err = RegistryError::io("missing.reg", io::Error::from(io::ErrorKind::NotFound));
        assert!(err.to_string().contains("missing.reg"));
        assert!(err.source().is_some());
    }
}
