//! Logical paths, logical roots and the routing table
//!
//! A logical path such as `agents/the-analyst.md` is the only identifier the
//! lock file knows about. Routing turns it into a physical path under either
//! the install root or the claude root:
//!
//! | Logical root          | Destination  | Mode       | Owned |
//! |-----------------------|--------------|------------|-------|
//! | `agents/`             | claude root  | regular    | yes   |
//! | `commands/`           | claude root  | regular    | yes   |
//! | `hooks/`              | claude root  | executable | yes   |
//! | `rules/`              | claude root  | regular    | yes   |
//! | `output-styles/`      | claude root  | regular    | yes   |
//! | `templates/`          | install root | regular    | yes   |
//! | `settings.json`       | claude root  | regular    | no    |
//! | `settings.local.json` | claude root  | regular    | no    |

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StartupError};

/// Product identifier, also used as the hook marker value
pub const PRODUCT: &str = "the-startup";

/// Host settings document, patched rather than installed
pub const SETTINGS_FILE: &str = "settings.json";

/// Local host settings document, created when shipped in the bundle
pub const SETTINGS_LOCAL_FILE: &str = "settings.local.json";

/// Forward-slash path relative to one of the logical roots
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalPath(String);

impl LogicalPath {
    /// Parse and validate a logical path
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let invalid = |reason: &str| StartupError::InvalidLogicalPath {
            path: path.clone(),
            reason: reason.to_string(),
        };

        if path.is_empty() {
            return Err(invalid("path is empty"));
        }
        if path.contains('\\') {
            return Err(invalid("backslashes are not allowed"));
        }
        if path.starts_with('/') {
            return Err(invalid("path must be relative"));
        }
        for segment in path.split('/') {
            match segment {
                "" => return Err(invalid("empty path segment")),
                "." | ".." => return Err(invalid("relative segments are not allowed")),
                _ => {}
            }
        }

        Ok(Self(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments, in order
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// The logical root this path lives under, if it is a known one
    pub fn root(&self) -> Option<LogicalRoot> {
        LogicalRoot::of(self)
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LogicalPath {
    type Error = StartupError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<LogicalPath> for String {
    fn from(value: LogicalPath) -> Self {
        value.0
    }
}

/// Installable component; each one is a directory logical root
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Component {
    Agents,
    Commands,
    Hooks,
    Rules,
    OutputStyles,
    Templates,
}

impl Component {
    /// Every component, in canonical order
    pub const ALL: [Component; 6] = [
        Component::Agents,
        Component::Commands,
        Component::Hooks,
        Component::Rules,
        Component::OutputStyles,
        Component::Templates,
    ];

    /// Directory name of this component's logical root
    pub fn dir_name(self) -> &'static str {
        match self {
            Component::Agents => "agents",
            Component::Commands => "commands",
            Component::Hooks => "hooks",
            Component::Rules => "rules",
            Component::OutputStyles => "output-styles",
            Component::Templates => "templates",
        }
    }

    fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.dir_name() == name)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Normalize a component selection: canonical order, no duplicates.
/// An empty selection means every component.
pub fn normalize_components(selected: &[Component]) -> Vec<Component> {
    if selected.is_empty() {
        return Component::ALL.to_vec();
    }
    Component::ALL
        .into_iter()
        .filter(|c| selected.contains(c))
        .collect()
}

/// Which of the two roots a logical root is installed under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Install,
    Claude,
}

/// File mode applied when a file is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Regular,
    Executable,
}

impl FileMode {
    /// Unix permission bits for this mode
    pub fn permissions(self) -> u32 {
        match self {
            FileMode::Regular => 0o644,
            FileMode::Executable => 0o755,
        }
    }
}

/// A known logical root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalRoot {
    Dir(Component),
    Settings,
    SettingsLocal,
}

impl LogicalRoot {
    /// Classify a logical path by its root
    pub fn of(path: &LogicalPath) -> Option<Self> {
        match path.as_str() {
            SETTINGS_FILE => return Some(LogicalRoot::Settings),
            SETTINGS_LOCAL_FILE => return Some(LogicalRoot::SettingsLocal),
            _ => {}
        }

        let mut segments = path.segments();
        let first = segments.next()?;
        // A bare directory name is not a file under that root
        segments.next()?;
        Component::from_dir_name(first).map(LogicalRoot::Dir)
    }

    pub fn destination(self) -> Destination {
        match self {
            LogicalRoot::Dir(Component::Templates) => Destination::Install,
            _ => Destination::Claude,
        }
    }

    pub fn mode(self) -> FileMode {
        match self {
            LogicalRoot::Dir(Component::Hooks) => FileMode::Executable,
            _ => FileMode::Regular,
        }
    }

    /// Whether the installer may remove files it recorded under this root
    pub fn is_owned(self) -> bool {
        matches!(self, LogicalRoot::Dir(_))
    }

    pub fn component(self) -> Option<Component> {
        match self {
            LogicalRoot::Dir(component) => Some(component),
            _ => None,
        }
    }
}

/// Where a logical path lands on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub root: LogicalRoot,
    /// The install or claude root the file lives under
    pub base: PathBuf,
    pub physical: PathBuf,
    pub mode: FileMode,
}

/// Routing function from logical paths to physical paths for one pair of roots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routing {
    install_root: PathBuf,
    claude_root: PathBuf,
}

impl Routing {
    pub fn new(install_root: impl Into<PathBuf>, claude_root: impl Into<PathBuf>) -> Self {
        Self {
            install_root: install_root.into(),
            claude_root: claude_root.into(),
        }
    }

    pub fn base(&self, destination: Destination) -> &Path {
        match destination {
            Destination::Install => &self.install_root,
            Destination::Claude => &self.claude_root,
        }
    }

    /// Route a logical path; `None` when it is outside every known root
    pub fn route(&self, path: &LogicalPath) -> Option<Route> {
        let root = path.root()?;
        let base = self.base(root.destination()).to_path_buf();
        let physical = path
            .segments()
            .fold(base.clone(), |acc, segment| acc.join(segment));

        Some(Route {
            root,
            base,
            physical,
            mode: root.mode(),
        })
    }

    /// Route a logical path, failing for unknown roots
    pub fn route_asset(&self, path: &LogicalPath) -> Result<Route> {
        self.route(path)
            .ok_or_else(|| StartupError::UnroutableAsset {
                path: path.to_string(),
            })
    }
}
