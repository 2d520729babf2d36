//! File system helpers for the store file

use crate::error::{Result, StoreError};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Create `dir` and every missing ancestor
///
/// Each level is created on its own so a concurrent creator (another
/// process, another store) racing us is tolerated: `AlreadyExists` is
/// success as long as the path really is a directory.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() || dir.is_dir() {
        return Ok(());
    }

    // Shallowest missing ancestor first
    let mut missing: Vec<&Path> = dir
        .ancestors()
        .take_while(|p| !p.as_os_str().is_empty() && !p.is_dir())
        .collect();
    missing.reverse();

    for level in missing {
        match create_one(level) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                if !level.is_dir() {
                    return Err(StoreError::DirectoryBlocked {
                        path: level.to_path_buf(),
                    });
                }
            }
            Err(e) => return Err(StoreError::from_io(level, e)),
        }
    }

    Ok(())
}

#[cfg(unix)]
fn create_one(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    // 0o777 filtered by the process umask
    fs::DirBuilder::new().mode(0o777).create(dir)
}

#[cfg(not(unix))]
fn create_one(dir: &Path) -> io::Result<()> {
    fs::DirBuilder::new().create(dir)
}

/// Replace `path` with `data`, readable only by the owner
///
/// Writes to a temporary file in the same directory, fsyncs it, then renames
/// it over the target so readers never observe a half-written file. The
/// parent directory must already exist.
pub fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    // NamedTempFile is created 0600 on Unix
    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| StoreError::from_io(parent, e))?;
    tmp.write_all(data)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| StoreError::from_io(tmp.path(), e))?;

    tmp.persist(path)
        .map_err(|e| StoreError::from_io(path, e.error))?;
    Ok(())
}
