//! Status operation: compare the lock file with what is on disk

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::hash;
use crate::manifest::Manifest;
use crate::operations::uninstall::require_manifest;
use crate::routing::{Component, LogicalPath};
use crate::settings::{self, HookCommands};

/// State of one recorded file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Ok,
    Modified,
    Missing,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileStatus::Ok => "ok",
            FileStatus::Modified => "modified",
            FileStatus::Missing => "missing",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub logical_path: LogicalPath,
    pub physical: PathBuf,
    pub status: FileStatus,
}

#[derive(Debug, Clone)]
pub struct StatusReport {
    pub manifest: Manifest,
    pub entries: Vec<StatusEntry>,
    /// `None` when the hooks component is not installed
    pub hooks_registered: Option<bool>,
}

impl StatusReport {
    pub fn count(&self, status: FileStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }

    pub fn is_clean(&self) -> bool {
        self.entries.iter().all(|e| e.status == FileStatus::Ok)
            && self.hooks_registered != Some(false)
    }
}

/// Check every recorded file against its size and checksum
pub fn status(install_root: &Path) -> Result<StatusReport> {
    let manifest = require_manifest(install_root)?;
    let routing = manifest.routing();

    let entries = manifest
        .files
        .iter()
        .map(|(logical_path, record)| {
            let physical = routing.route(logical_path).map_or_else(
                || install_root.join(logical_path.as_str()),
                |route| route.physical,
            );
            let status = match hash::hash_file(&physical) {
                Err(_) if !physical.exists() => FileStatus::Missing,
                Err(_) => FileStatus::Modified,
                Ok((checksum, size)) => {
                    let checksum_ok = record
                        .checksum
                        .as_deref()
                        .is_none_or(|recorded| hash::verify_hash(recorded, &checksum));
                    if checksum_ok && size == record.size {
                        FileStatus::Ok
                    } else {
                        FileStatus::Modified
                    }
                }
            };
            StatusEntry {
                logical_path: logical_path.clone(),
                physical,
                status,
            }
        })
        .collect();

    let hooks_registered = manifest.components.contains(&Component::Hooks).then(|| {
        let path = settings::settings_path(&manifest.claude_root);
        settings::hooks_registered(&path, &HookCommands::for_claude_root(&manifest.claude_root))
            .unwrap_or_else(|e| {
                debug!(error = %e, "cannot read host settings");
                false
            })
    });

    Ok(StatusReport {
        manifest,
        entries,
        hooks_registered,
    })
}
