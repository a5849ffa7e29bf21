//! Asset bundle laid out in a directory on disk

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::PathBuf;

use walkdir::WalkDir;

use super::AssetSource;
use crate::error::{Result, StartupError};
use crate::routing::LogicalPath;

/// A bundle read from a directory with the same layout as the embedded one
#[derive(Debug, Clone)]
pub struct DirAssets {
    root: PathBuf,
}

impl DirAssets {
    /// Open a bundle directory
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StartupError::AssetReadFailed {
                path: root.display().to_string(),
                reason: "not a directory".to_string(),
            });
        }
        Ok(Self { root })
    }

    fn physical(&self, path: &LogicalPath) -> PathBuf {
        path.segments()
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }
}

impl AssetSource for DirAssets {
    fn list(&self, root: &str) -> Result<Vec<LogicalPath>> {
        let base = self.root.join(root);
        if base.is_file() {
            return Ok(vec![LogicalPath::new(root)?]);
        }
        if !base.is_dir() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(&base) {
            let entry = entry.map_err(|e| StartupError::AssetReadFailed {
                path: base.display().to_string(),
                reason: e.to_string(),
            })?;
            // Same filter as the embedded bundle: skip dotfiles
            if !entry.file_type().is_file() || entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }

            let relative = entry.path().strip_prefix(&self.root).map_err(|e| {
                StartupError::AssetReadFailed {
                    path: entry.path().display().to_string(),
                    reason: e.to_string(),
                }
            })?;
            let logical = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            paths.push(LogicalPath::new(logical)?);
        }

        Ok(paths)
    }

    fn read(&self, path: &LogicalPath) -> Result<Cow<'_, [u8]>> {
        let physical = self.physical(path);
        match fs::read(&physical) {
            Ok(bytes) => Ok(Cow::Owned(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StartupError::AssetMissing {
                path: path.to_string(),
            }),
            Err(e) => Err(StartupError::AssetReadFailed {
                path: physical.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
