//! Install root and claude root resolution
//!
//! Turns user-supplied path strings into absolute, normalized roots:
//! `~/` expansion, cwd-relative resolution, and the rule that the install
//! root always ends in the product's own directory so that removing it can
//! never take an unrelated directory with it.

use std::path::{Component as PathComponent, Path, PathBuf};

use normpath::PathExt;

use crate::error::{Result, StartupError};
use crate::routing::PRODUCT;

/// Directory name used for project-local installs
pub const LOCAL_INSTALL_DIR: &str = ".the-startup";

/// Directory the host tool reads from
pub const CLAUDE_DIR: &str = ".claude";

/// Process environment captured once and passed explicitly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub home: PathBuf,
    /// `XDG_CONFIG_HOME`, when set
    pub config_home: Option<PathBuf>,
    pub cwd: PathBuf,
}

impl Environment {
    /// Capture home, config home and cwd from the running process
    pub fn from_process() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| StartupError::InvalidPath {
            path: "~".to_string(),
            reason: "could not determine home directory".to_string(),
        })?;
        let config_home = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let cwd = std::env::current_dir().map_err(|e| StartupError::IoError {
            message: format!("Failed to get current directory: {}", e),
            source: Some(e),
        })?;

        Ok(Self {
            home,
            config_home,
            cwd,
        })
    }

    /// Default global install root: `$XDG_CONFIG_HOME/the-startup` or `~/.config/the-startup`
    pub fn global_install_root(&self) -> PathBuf {
        self.config_home
            .clone()
            .unwrap_or_else(|| self.home.join(".config"))
            .join(PRODUCT)
    }

    pub fn local_install_root(&self) -> PathBuf {
        self.cwd.join(LOCAL_INSTALL_DIR)
    }

    pub fn global_claude_root(&self) -> PathBuf {
        self.home.join(CLAUDE_DIR)
    }

    pub fn local_claude_root(&self) -> PathBuf {
        self.cwd.join(CLAUDE_DIR)
    }

    /// Render a path in `~/…` form when it lives under the home directory
    pub fn tilde(&self, path: &Path) -> String {
        match path.strip_prefix(&self.home) {
            Ok(rest) if rest.as_os_str().is_empty() => "~".to_string(),
            Ok(rest) => format!("~/{}", rest.display()),
            Err(_) => path.display().to_string(),
        }
    }
}

/// The two resolved roots of an installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub install_root: PathBuf,
    pub claude_root: PathBuf,
    /// Advisory claude root next to a local install root
    pub local_claude_proposal: Option<PathBuf>,
}

/// Resolve both roots and check they are distinct
pub fn resolve(install: &str, claude: &str, env: &Environment) -> Result<ResolvedPaths> {
    let install_root = resolve_install_root(install, env)?;
    let claude_root = resolve_claude_root(claude, env)?;

    if install_root == claude_root {
        return Err(StartupError::InvalidPath {
            path: install_root.display().to_string(),
            reason: "install root and claude root resolve to the same directory".to_string(),
        });
    }

    let local_claude_proposal = propose_local_claude_root(&install_root);

    Ok(ResolvedPaths {
        install_root,
        claude_root,
        local_claude_proposal,
    })
}

/// Resolve the install root, appending the product directory when missing
pub fn resolve_install_root(input: &str, env: &Environment) -> Result<PathBuf> {
    let path = absolutize(input, env)?;

    let ends_with_product = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n == PRODUCT || n == LOCAL_INSTALL_DIR);

    if ends_with_product {
        Ok(path)
    } else {
        Ok(path.join(LOCAL_INSTALL_DIR))
    }
}

/// Resolve the claude root
pub fn resolve_claude_root(input: &str, env: &Environment) -> Result<PathBuf> {
    absolutize(input, env)
}

/// Propose `<parent>/.claude` for install roots that look project-local
pub fn propose_local_claude_root(install_root: &Path) -> Option<PathBuf> {
    let text = install_root.to_string_lossy();
    if !text.contains(PRODUCT) || text.contains(".config") {
        return None;
    }
    install_root.parent().map(|parent| parent.join(CLAUDE_DIR))
}

fn absolutize(input: &str, env: &Environment) -> Result<PathBuf> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(StartupError::InvalidPath {
            path: input.to_string(),
            reason: "path is empty".to_string(),
        });
    }

    let expanded = if trimmed == "~" {
        env.home.clone()
    } else if let Some(rest) = trimmed.strip_prefix("~/") {
        env.home.join(rest)
    } else {
        PathBuf::from(trimmed)
    };

    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        env.cwd.join(expanded)
    };

    let cleaned = clean(&absolute);
    if cleaned.as_os_str().is_empty() {
        return Err(StartupError::InvalidPath {
            path: input.to_string(),
            reason: "path is empty after normalization".to_string(),
        });
    }

    Ok(normalize_existing_prefix(&cleaned))
}

/// Lexically remove `.` and `..` components
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            PathComponent::CurDir => {}
            PathComponent::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Normalize the longest existing ancestor and re-append the rest, so the
/// same directory always resolves to the same path (e.g. `/var` vs
/// `/private/var` on macOS) whether or not it exists yet.
fn normalize_existing_prefix(path: &Path) -> PathBuf {
    if let Ok(norm) = path.normalize() {
        return dunce::simplified(norm.as_path()).to_path_buf();
    }

    let mut current = path;
    let mut tail = Vec::new();

    while !current.exists() {
        match (current.file_name(), current.parent()) {
            (Some(name), Some(parent)) => {
                tail.push(name);
                current = parent;
            }
            _ => return path.to_path_buf(),
        }
    }

    let mut result = current
        .normalize()
        .map(|norm| dunce::simplified(norm.as_path()).to_path_buf())
        .unwrap_or_else(|_| current.to_path_buf());

    for name in tail.iter().rev() {
        result.push(name);
    }

    result
}
