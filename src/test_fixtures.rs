//! Test fixtures and utilities for reducing test setup duplication.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_fixtures::{TestRoots, MemoryAssets};
//!
//! #[test]
//! fn my_test() {
//!     let roots = TestRoots::new();
//!     let assets = MemoryAssets::new(&[("agents/a.md", b"a")]);
//!     // roots.install_root / roots.claude_root live under a temp dir
//! }
//! ```

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::PathBuf;

use tempfile::TempDir;

use crate::assets::{AssetEntry, AssetSource, is_under};
use crate::error::{Result, StartupError};
use crate::hash;
use crate::manifest::ManifestRecord;
use crate::paths::Environment;
use crate::routing::{Destination, FileMode, LogicalPath, LogicalRoot};

/// Create a temp directory in the system temp location.
///
/// # Panics
///
/// Panics if the temp directory cannot be created.
#[must_use]
pub fn create_temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// An asset entry routed by its logical root
///
/// # Panics
///
/// Panics if `path` is not a valid logical path.
#[must_use]
pub fn asset(path: &str, bytes: &[u8]) -> AssetEntry {
    let logical_path = LogicalPath::new(path).expect("valid logical path");
    let root = logical_path.root();
    AssetEntry {
        destination: root.map_or(Destination::Install, LogicalRoot::destination),
        mode: root.map_or(FileMode::Regular, LogicalRoot::mode),
        logical_path,
        bytes: bytes.to_vec(),
    }
}

/// A lock file record for the given content
#[must_use]
pub fn record_for(bytes: &[u8]) -> ManifestRecord {
    ManifestRecord {
        checksum: Some(hash::checksum(bytes)),
        last_modified: "2026-01-01T00:00:00Z".to_string(),
        size: bytes.len() as u64,
    }
}

/// In-memory asset bundle
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryAssets {
    #[must_use]
    pub fn new(files: &[(&str, &[u8])]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(path, bytes)| ((*path).to_string(), bytes.to_vec()))
                .collect(),
        }
    }

    pub fn insert(&mut self, path: &str, bytes: &[u8]) {
        self.files.insert(path.to_string(), bytes.to_vec());
    }

    pub fn remove(&mut self, path: &str) {
        self.files.remove(path);
    }
}

impl AssetSource for MemoryAssets {
    fn list(&self, root: &str) -> Result<Vec<LogicalPath>> {
        // Reverse order, so nothing depends on enumeration order
        self.files
            .keys()
            .rev()
            .filter(|path| is_under(path, root))
            .map(|path| LogicalPath::new(path.clone()))
            .collect()
    }

    fn read(&self, path: &LogicalPath) -> Result<Cow<'_, [u8]>> {
        self.files
            .get(path.as_str())
            .map(|bytes| Cow::Borrowed(bytes.as_slice()))
            .ok_or_else(|| StartupError::AssetMissing {
                path: path.to_string(),
            })
    }
}

/// A home directory, a project directory and the two roots inside them
pub struct TestRoots {
    pub temp: TempDir,
    pub env: Environment,
    pub install_root: PathBuf,
    pub claude_root: PathBuf,
}

impl TestRoots {
    /// Project-local roots: `<project>/.the-startup` and `<project>/.claude`
    ///
    /// # Panics
    ///
    /// Panics if the directories cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let temp = create_temp_dir();
        let base = dunce::canonicalize(temp.path()).expect("canonical temp dir");
        let home = base.join("home");
        let cwd = base.join("project");
        std::fs::create_dir_all(&home).expect("create home");
        std::fs::create_dir_all(&cwd).expect("create project");

        Self {
            install_root: cwd.join(".the-startup"),
            claude_root: cwd.join(".claude"),
            env: Environment {
                home,
                config_home: None,
                cwd,
            },
            temp,
        }
    }
}

impl Default for TestRoots {
    fn default() -> Self {
        Self::new()
    }
}
