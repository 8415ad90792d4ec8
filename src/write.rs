//! Crash-safe output writes for the CLI.

use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("output path {0} has no parent directory")]
    NoParent(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write `content` to `path` via tempfile + fsync + rename.
///
/// The tempfile lives in the destination directory so the rename never
/// crosses filesystems. Missing parent directories are created.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), WriteError> {
    let parent = match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => return Err(WriteError::NoParent(path.display().to_string())),
    };
    std::fs::create_dir_all(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Like [`atomic_write`], but leaves the file alone when it already holds `content`.
///
/// Returns whether the file was written.
pub fn write_if_changed(path: &Path, content: &str) -> Result<bool, WriteError> {
    match std::fs::read(path) {
        Ok(existing) if existing == content.as_bytes() => return Ok(false),
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    atomic_write(path, content.as_bytes())?;
    Ok(true)
}
