//! Common file system operations: atomic writes and empty-directory cleanup

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::routing::FileMode;

/// Write `bytes` to `path` through a sibling temp file and a rename.
///
/// The rename is the commit point: a failure before it leaves no file at
/// `path` (or the previous file intact), and the temp file is unlinked when
/// the guard drops on every error path.
pub fn write_atomic(path: &Path, bytes: &[u8], mode: FileMode) -> io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no parent directory", path.display()),
        )
    })?;
    fs::create_dir_all(parent)?;

    let mut temp = tempfile::Builder::new()
        .prefix(".tmp-")
        .tempfile_in(parent)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    set_mode(temp.path(), mode)?;

    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: FileMode) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode.permissions()))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: FileMode) -> io::Result<()> {
    // Windows doesn't use Unix permissions
    Ok(())
}

/// Remove empty ancestor directories of `file`, walking up to but not
/// including `stop_at`. Stops at the first directory that cannot be removed
/// (normally because it is not empty). Returns how many were removed.
pub fn remove_empty_ancestors(file: &Path, stop_at: &Path) -> usize {
    let mut removed = 0;
    let mut current = file.parent();

    while let Some(dir) = current {
        if dir == stop_at || !dir.starts_with(stop_at) {
            break;
        }
        if fs::remove_dir(dir).is_err() {
            break;
        }
        removed += 1;
        current = dir.parent();
    }

    removed
}

/// Remove `dir` if it exists and is empty; any failure is ignored
pub fn remove_dir_if_empty(dir: &Path) -> bool {
    let is_empty = fs::read_dir(dir)
        .map(|mut d| d.next().is_none())
        .unwrap_or(false);
    is_empty && fs::remove_dir(dir).is_ok()
}
