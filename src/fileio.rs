//! Whole-file reads and atomic whole-file writes.

use crate::error::{RegistryError, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

/// Reads an entire file into memory.
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn read_whole_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|e| RegistryError::io(path, e))?;
    debug!(bytes = data.len(), "Read input file");
    Ok(data)
}

/// Writes `bytes` to `path`, replacing any existing file.
///
/// The bytes go to a temporary file in the destination directory first,
/// which is renamed over `path` only once everything has been written.
#[instrument(skip(path, bytes), fields(path = %path.as_ref().display(), bytes = bytes.len()))]
pub fn write_whole_file<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).map_err(|e| RegistryError::io(dir, e))?;
    file.write_all(bytes)
        .and_then(|()| file.as_file().sync_all())
        .map_err(|e| RegistryError::io(file.path(), e))?;
    file.persist(path)
        .map_err(|e| RegistryError::io(path, e.error))?;

    debug!("Wrote output file");
    Ok(())
}
