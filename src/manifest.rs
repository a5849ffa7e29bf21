//! Lock file (`the-startup.lock`) data structures and persistence
//!
//! The lock file is the authority on what this installer put on disk. It is
//! JSON with sorted keys so that consecutive installs produce identical
//! bytes, and it is replaced atomically (sibling temp file, then rename).

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::fs::write_atomic;
use crate::error::{Result, StartupError};
use crate::hash;
use crate::routing::{Component, FileMode, LogicalPath, PRODUCT, Routing};

/// Lock file schema version written by this release
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Host tool identifier recorded in the lock file
pub const HOST_TOOL: &str = "claude-code";

/// Lock file name inside the install root
pub fn manifest_file_name() -> String {
    format!("{PRODUCT}.lock")
}

/// Path of the lock file for an install root
pub fn manifest_path(install_root: &Path) -> PathBuf {
    install_root.join(manifest_file_name())
}

/// Metadata for one installed file.
///
/// Fields are declared in alphabetical order so serialization is key-sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    /// `blake3:<hex>`; absent in lock files written by older installers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,

    /// RFC 3339 modification time
    pub last_modified: String,

    pub size: u64,
}

/// The lock file.
///
/// Fields are declared in alphabetical order so serialization is key-sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "claude_path")]
    pub claude_root: PathBuf,

    pub components: Vec<Component>,

    pub files: BTreeMap<LogicalPath, ManifestRecord>,

    pub install_date: String,

    #[serde(rename = "install_path")]
    pub install_root: PathBuf,

    pub schema_version: String,

    pub tool: String,
}

impl Manifest {
    pub fn new(
        install_root: impl Into<PathBuf>,
        claude_root: impl Into<PathBuf>,
        components: Vec<Component>,
        files: BTreeMap<LogicalPath, ManifestRecord>,
        install_date: DateTime<Utc>,
    ) -> Self {
        Self {
            claude_root: claude_root.into(),
            components,
            files,
            install_date: format_timestamp(install_date),
            install_root: install_root.into(),
            schema_version: SCHEMA_VERSION.to_string(),
            tool: HOST_TOOL.to_string(),
        }
    }

    /// Routing against the roots this manifest was written for
    pub fn routing(&self) -> Routing {
        Routing::new(&self.install_root, &self.claude_root)
    }

    /// Parse a lock file from JSON
    pub fn from_json(json: &str, path: &Path) -> Result<Self> {
        let manifest: Self =
            serde_json::from_str(json).map_err(|e| StartupError::ManifestCorrupt {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        if manifest.schema_version != SCHEMA_VERSION {
            return Err(StartupError::ManifestCorrupt {
                path: path.display().to_string(),
                reason: format!(
                    "unsupported schema version '{}' (expected '{}')",
                    manifest.schema_version, SCHEMA_VERSION
                ),
            });
        }

        Ok(manifest)
    }

    /// Serialize to pretty-printed JSON with a trailing newline
    pub fn to_json(&self) -> Result<String> {
        let mut json =
            serde_json::to_string_pretty(self).map_err(|e| StartupError::ManifestWrite {
                path: manifest_file_name(),
                reason: e.to_string(),
            })?;
        json.push('\n');
        Ok(json)
    }

    /// Same installation content, ignoring the install date
    pub fn same_content(&self, other: &Manifest) -> bool {
        self.install_root == other.install_root
            && self.claude_root == other.claude_root
            && self.components == other.components
            && self.tool == other.tool
            && self.files == other.files
    }
}

/// Load the lock file for an install root.
///
/// `Ok(None)` when no lock file exists; a lock file that exists but cannot
/// be read or parsed is an error, never silently ignored.
pub fn load(install_root: &Path) -> Result<Option<Manifest>> {
    let path = manifest_path(install_root);

    let json = match fs::read_to_string(&path) {
        Ok(json) => json,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no lock file");
            return Ok(None);
        }
        Err(e) => {
            return Err(StartupError::ManifestCorrupt {
                path: path.display().to_string(),
                reason: e.to_string(),
            });
        }
    };

    let manifest = Manifest::from_json(&json, &path)?;
    debug!(path = %path.display(), files = manifest.files.len(), "loaded lock file");
    Ok(Some(manifest))
}

/// Replace the lock file for an install root in one step
pub fn write(install_root: &Path, manifest: &Manifest) -> Result<()> {
    let path = manifest_path(install_root);
    let json = manifest.to_json()?;

    write_atomic(&path, json.as_bytes(), FileMode::Regular).map_err(|e| {
        StartupError::ManifestWrite {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    })?;

    debug!(path = %path.display(), files = manifest.files.len(), "wrote lock file");
    Ok(())
}

/// Delete the lock file; a missing lock file is not an error
pub fn delete(install_root: &Path) -> Result<()> {
    let path = manifest_path(install_root);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StartupError::ManifestWrite {
            path: path.display().to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Build a record by reading a file once: size, mtime and checksum
pub fn record_from_file(physical: &Path) -> Result<ManifestRecord> {
    let metadata = fs::metadata(physical).map_err(|e| StartupError::ChecksumIo {
        path: physical.display().to_string(),
        reason: e.to_string(),
    })?;
    let (checksum, size) = hash::hash_file(physical)?;
    let modified = metadata.modified().unwrap_or_else(|_| SystemTime::now());

    Ok(ManifestRecord {
        checksum: Some(checksum),
        last_modified: format_timestamp(DateTime::<Utc>::from(modified)),
        size,
    })
}

/// RFC 3339 with second precision and a `Z` suffix
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}
